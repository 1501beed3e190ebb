//! Inactivity timing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Timing for the idle → warning → logout sequence.
///
/// Defaults: warn after 10 minutes without activity, then count down
/// 30 one-second ticks before forcing sign-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InactivityConfig {
    /// Idle time before the warning is shown.
    pub idle_timeout: Duration,
    /// Countdown length, in ticks, once the warning is shown.
    pub warning_secs: u32,
    /// Interval between countdown ticks.
    pub tick: Duration,
}

impl Default for InactivityConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(10 * 60),
            warning_secs: 30,
            tick: Duration::from_secs(1),
        }
    }
}

impl InactivityConfig {
    /// Fixes out-of-range values so the machine can't spin or skip the
    /// warning. Called by [`InactivityMachine::new`](crate::InactivityMachine::new).
    ///
    /// - `warning_secs` raised to at least 1.
    /// - zero `idle_timeout` or `tick` replaced with the default.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.warning_secs == 0 {
            warn!("warning_secs is 0, using 1");
            self.warning_secs = 1;
        }
        if self.idle_timeout.is_zero() {
            warn!(default_secs = defaults.idle_timeout.as_secs(), "idle_timeout is 0, using default");
            self.idle_timeout = defaults.idle_timeout;
        }
        if self.tick.is_zero() {
            warn!("countdown tick is 0, using 1s");
            self.tick = defaults.tick;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_ten_minutes_and_thirty_ticks() {
        let cfg = InactivityConfig::default();
        assert_eq!(cfg.idle_timeout, Duration::from_secs(600));
        assert_eq!(cfg.warning_secs, 30);
        assert_eq!(cfg.tick, Duration::from_secs(1));
    }

    #[test]
    fn test_validated_fixes_zero_values() {
        let cfg = InactivityConfig {
            idle_timeout: Duration::ZERO,
            warning_secs: 0,
            tick: Duration::ZERO,
        }
        .validated();
        assert_eq!(cfg.warning_secs, 1);
        assert_eq!(cfg.idle_timeout, Duration::from_secs(600));
        assert_eq!(cfg.tick, Duration::from_secs(1));
    }

    #[test]
    fn test_validated_keeps_sane_values() {
        let cfg = InactivityConfig {
            idle_timeout: Duration::from_secs(5),
            warning_secs: 3,
            tick: Duration::from_millis(500),
        };
        assert_eq!(cfg.clone().validated(), cfg);
    }
}
