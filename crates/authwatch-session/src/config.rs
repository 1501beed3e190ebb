//! Refresh scheduling configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for proactive token refresh.
///
/// Serializable so a host can load it alongside the rest of its settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// How long before `expires_at` the refresh fires.
    ///
    /// Default: 5 minutes.
    pub lead: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            lead: Duration::from_secs(5 * 60),
        }
    }
}
