//! The session store: the single in-memory record of who is logged in.
//!
//! The store doesn't talk to the provider and doesn't own timers; it only
//! holds the current [`Grant`] and the [`SessionPhase`] derived from it. The controller is its only writer,
//! so there is no locking here.
//!
//! # Consistency
//!
//! Session and user are kept together as one `Option<Grant>`. A reader
//! gets the whole tuple from [`SessionStore::current`] at once, never
//! field by field, so a snapshot can't mix an old user with a new session.

use authwatch_provider::{Grant, Session, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Where the controller is in the login lifecycle.
///
/// ```text
///   Loading ──(initial check / watchdog)──→ Unauthenticated ⇄ Authenticated
///      └──────────(initial session)─────────────────────────────↗
/// ```
///
/// - **Loading**: the startup session check hasn't resolved yet. Left
///   exactly once and never re-entered for the life of the process.
/// - **Unauthenticated**: nobody is logged in.
/// - **Authenticated**: a session and its user are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Loading,
    Unauthenticated,
    Authenticated,
}

impl SessionPhase {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A consistent copy of the store's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub phase: SessionPhase,
    pub grant: Option<Grant>,
}

impl StoreSnapshot {
    pub fn session(&self) -> Option<&Session> {
        self.grant.as_ref().map(|g| &g.session)
    }

    pub fn user(&self) -> Option<&User> {
        self.grant.as_ref().map(|g| &g.user)
    }
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Holder of the current session, user and phase.
#[derive(Debug)]
pub struct SessionStore {
    phase: SessionPhase,
    grant: Option<Grant>,
}

impl SessionStore {
    /// Creates an empty store in the `Loading` phase.
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Loading,
            grant: None,
        }
    }

    /// Replaces session and user together and marks the store
    /// `Authenticated`.
    pub fn set(&mut self, session: Session, user: User) {
        if session.user_id() != &user.id {
            tracing::warn!(
                session_user = %session.user_id(),
                user = %user.id,
                "session and user ids differ"
            );
        }
        tracing::debug!(user_id = %user.id, "session stored");
        self.grant = Some(Grant::new(session, user));
        self.phase = SessionPhase::Authenticated;
    }

    /// Stores a grant received as one value from the provider.
    pub fn set_grant(&mut self, grant: Grant) {
        self.set(grant.session, grant.user);
    }

    /// Replaces only the user half, keeping the session.
    ///
    /// Returns `false` (and changes nothing) when nobody is logged in:
    /// a user without a session is not a representable state.
    pub fn set_user(&mut self, user: User) -> bool {
        match &mut self.grant {
            Some(grant) => {
                grant.user = user;
                true
            }
            None => false,
        }
    }

    /// Drops session and user and marks the store `Unauthenticated`.
    pub fn clear(&mut self) {
        self.grant = None;
        self.phase = SessionPhase::Unauthenticated;
    }

    /// Leaves `Loading` for whatever is currently known.
    ///
    /// No-op once loading has resolved. Returns `true` if this call did
    /// the resolving.
    pub fn resolve_loading(&mut self) -> bool {
        if self.phase != SessionPhase::Loading {
            return false;
        }
        self.phase = if self.grant.is_some() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Unauthenticated
        };
        true
    }

    /// Returns the whole state in one copy.
    pub fn current(&self) -> StoreSnapshot {
        StoreSnapshot {
            phase: self.phase,
            grant: self.grant.clone(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn grant(&self) -> Option<&Grant> {
        self.grant.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase.is_authenticated()
    }

    /// Expiry of the current access token, if known.
    pub fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.grant.as_ref().and_then(|g| g.session.expires_at())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionStore`, named `test_{function}_{scenario}`.

    use chrono::Duration;

    use super::*;

    fn grant(user: &str, token: &str) -> (Session, User) {
        let now = Utc::now();
        let session = Session::new(
            token,
            Some(format!("refresh-{token}")),
            user,
            now,
            Some(now + Duration::hours(1)),
        )
        .expect("valid window");
        (session, User::new(user, format!("{user}@example.com")))
    }

    #[test]
    fn test_new_store_is_loading_and_empty() {
        let store = SessionStore::new();
        let snap = store.current();
        assert_eq!(snap.phase, SessionPhase::Loading);
        assert_eq!(snap.grant, None);
    }

    #[test]
    fn test_set_then_current_round_trips() {
        let mut store = SessionStore::new();
        let (s, u) = grant("u1", "t1");

        store.set(s.clone(), u.clone());

        let snap = store.current();
        assert_eq!(snap.phase, SessionPhase::Authenticated);
        assert_eq!(snap.session(), Some(&s));
        assert_eq!(snap.user(), Some(&u));
    }

    #[test]
    fn test_clear_then_current_is_empty() {
        let mut store = SessionStore::new();
        let (s, u) = grant("u1", "t1");
        store.set(s, u);

        store.clear();

        let snap = store.current();
        assert_eq!(snap.phase, SessionPhase::Unauthenticated);
        assert_eq!(snap.session(), None);
        assert_eq!(snap.user(), None);
    }

    #[test]
    fn test_set_replaces_wholesale() {
        let mut store = SessionStore::new();
        let (s1, u1) = grant("u1", "t1");
        let (s2, u2) = grant("u2", "t2");
        store.set(s1, u1);

        store.set(s2.clone(), u2.clone());

        assert_eq!(store.grant(), Some(&Grant::new(s2, u2)));
    }

    #[test]
    fn test_set_user_keeps_session() {
        let mut store = SessionStore::new();
        let (s, u) = grant("u1", "t1");
        store.set(s.clone(), u.clone());

        let renamed = u.with_display_name("Ada");
        assert!(store.set_user(renamed.clone()));

        let snap = store.current();
        assert_eq!(snap.session(), Some(&s));
        assert_eq!(snap.user(), Some(&renamed));
    }

    #[test]
    fn test_set_user_when_empty_is_rejected() {
        let mut store = SessionStore::new();
        store.resolve_loading();

        assert!(!store.set_user(User::new("u1", "u1@example.com")));
        assert_eq!(store.current().user(), None);
    }

    #[test]
    fn test_resolve_loading_without_grant_is_unauthenticated() {
        let mut store = SessionStore::new();
        assert!(store.resolve_loading());
        assert_eq!(store.phase(), SessionPhase::Unauthenticated);
        // Only resolves once.
        assert!(!store.resolve_loading());
    }

    #[test]
    fn test_loading_never_returns() {
        let mut store = SessionStore::new();
        let (s, u) = grant("u1", "t1");
        store.set(s, u);
        store.clear();

        assert!(!store.resolve_loading());
        assert_ne!(store.phase(), SessionPhase::Loading);
    }

    #[test]
    fn test_token_expires_at_follows_session() {
        let mut store = SessionStore::new();
        assert_eq!(store.token_expires_at(), None);

        let (s, u) = grant("u1", "t1");
        let exp = s.expires_at();
        store.set(s, u);

        assert_eq!(store.token_expires_at(), exp);
        assert!(store.is_authenticated());
    }
}
