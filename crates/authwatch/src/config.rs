//! Controller configuration.
//!
//! One struct gathers every knob; each layer's own config is embedded so a
//! host can load the whole thing from a single JSON document.

use std::time::Duration;

use authwatch_activity::InactivityConfig;
use authwatch_session::RefreshConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Full configuration for an auth controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Proactive refresh timing.
    pub refresh: RefreshConfig,
    /// Idle warning and logout timing.
    pub inactivity: InactivityConfig,
    /// How long startup may stay in `Loading` waiting for the initial
    /// session check. Default: 5 seconds.
    pub init_timeout: Duration,
    /// Capacity of the provider event channel.
    pub event_capacity: usize,
    /// Capacity of the handle → controller command channel.
    pub command_capacity: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh: RefreshConfig::default(),
            inactivity: InactivityConfig::default(),
            init_timeout: Duration::from_secs(5),
            event_capacity: 32,
            command_capacity: 64,
        }
    }
}

impl AuthConfig {
    /// Clamp values that would wedge the controller.
    ///
    /// Called automatically when the controller is spawned. Rules:
    /// - channel capacities raised to at least 1 (Tokio panics on 0).
    /// - inactivity timings fixed by [`InactivityConfig::validated`].
    pub fn validated(mut self) -> Self {
        if self.event_capacity == 0 {
            warn!("event_capacity is 0, using 1");
            self.event_capacity = 1;
        }
        if self.command_capacity == 0 {
            warn!("command_capacity is 0, using 1");
            self.command_capacity = 1;
        }
        self.inactivity = self.inactivity.validated();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_init_timeout_is_five_seconds() {
        assert_eq!(AuthConfig::default().init_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_validated_raises_zero_capacities() {
        let cfg = AuthConfig {
            event_capacity: 0,
            command_capacity: 0,
            ..AuthConfig::default()
        }
        .validated();
        assert_eq!(cfg.event_capacity, 1);
        assert_eq!(cfg.command_capacity, 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: AuthConfig = serde_json::from_str(r#"{"event_capacity": 8}"#).unwrap();
        assert_eq!(cfg.event_capacity, 8);
        assert_eq!(cfg.command_capacity, 64);
        assert_eq!(cfg.refresh, RefreshConfig::default());
    }
}
