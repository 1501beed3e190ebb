//! The read-only view of auth state published to the UI.

use std::fmt;

use authwatch_activity::InactivityState;
use authwatch_provider::{Session, User};
use authwatch_session::SessionPhase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why the most recent logout happened.
///
/// Forced logouts are reported as state, not as errors: the UI watches
/// for this to decide between "you were signed out for inactivity" and a
/// plain return to the login screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogoutReason {
    /// The user pressed "log out".
    UserRequested,
    /// The inactivity countdown ran out.
    Inactivity,
    /// The provider rejected a token refresh.
    RefreshFailed,
    /// The provider pushed `SIGNED_OUT` (e.g. logout in another tab).
    ProviderSignedOut,
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UserRequested => "user-requested",
            Self::Inactivity => "inactivity",
            Self::RefreshFailed => "refresh-failed",
            Self::ProviderSignedOut => "provider-signed-out",
        };
        f.write_str(s)
    }
}

/// Everything the UI may read about the current login.
///
/// Built in one step from the controller's state, so `user` and `session`
/// are always both present or both absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub phase: SessionPhase,
    pub user: Option<User>,
    pub session: Option<Session>,
    /// `None` unless `phase` is `Authenticated`.
    pub inactivity: Option<InactivityState>,
    pub token_expires_at: Option<DateTime<Utc>>,
    /// Set when a session ends; cleared by the next sign-in.
    pub last_logout: Option<LogoutReason>,
}

impl AuthSnapshot {
    /// The state before the initial session check resolves.
    pub fn loading() -> Self {
        Self {
            phase: SessionPhase::Loading,
            user: None,
            session: None,
            inactivity: None,
            token_expires_at: None,
            last_logout: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase.is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.phase == SessionPhase::Loading
    }

    /// Seconds left on the inactivity warning, if it is showing.
    pub fn warning_remaining(&self) -> Option<u32> {
        match self.inactivity {
            Some(InactivityState::Warning { remaining_secs }) => Some(remaining_secs),
            _ => None,
        }
    }
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self::loading()
    }
}
