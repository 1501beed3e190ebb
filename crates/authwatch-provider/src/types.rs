//! Session data model shared by every authwatch layer.
//!
//! These are the values the identity provider hands us: who the user is,
//! and which credentials prove it for how long. They are plain immutable
//! values. When the provider issues new credentials we replace the whole
//! value instead of patching fields, so a reader can never see half of an
//! old session glued to half of a new one.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProviderError;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The provider's opaque identifier for a user.
///
/// Newtype over `String` so a user id can't be confused with an access
/// token or an email address in a function signature.
/// `#[serde(transparent)]` keeps it a bare string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The profile half of an authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Provider-assigned id. Matches [`Session::user_id`] of the paired session.
    pub id: UserId,
    /// Login email.
    pub email: String,
    /// Optional nickname chosen at sign-up or edited later.
    pub display_name: Option<String>,
}

impl User {
    /// Creates a user without a display name.
    pub fn new(id: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            display_name: None,
        }
    }

    /// Builder-style setter for the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The credentials for one authenticated user, plus their validity window.
///
/// Fields are private so the only way to build one is [`Session::new`],
/// which enforces `expires_at > issued_at`. `Debug` is written by hand so
/// tokens never end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    access_token: String,
    refresh_token: Option<String>,
    user_id: UserId,
    issued_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Builds a session, validating the expiry window.
    ///
    /// `expires_at` is optional: some providers issue sessions without
    /// expiry information, and those are simply never refreshed
    /// proactively.
    ///
    /// # Errors
    /// [`ProviderError::InvalidSession`] if `expires_at <= issued_at`.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        user_id: impl Into<UserId>,
        issued_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ProviderError> {
        if let Some(expires_at) = expires_at {
            if expires_at <= issued_at {
                return Err(ProviderError::InvalidSession(format!(
                    "expires_at {expires_at} is not after issued_at {issued_at}"
                )));
            }
        }
        Ok(Self {
            access_token: access_token.into(),
            refresh_token,
            user_id: user_id.into(),
            issued_at,
            expires_at,
        })
    }

    /// The short-lived bearer credential.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// The long-lived credential used to mint a new access token, if any.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// When the access token stops being accepted. `None` = unknown.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns `true` if the session has an expiry at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("user_id", &self.user_id)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A session together with the user it belongs to.
///
/// The pair travels as one value everywhere: the store keeps an
/// `Option<Grant>`, so "user set but session missing" can't be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grant {
    pub session: Session,
    pub user: User,
}

impl Grant {
    pub fn new(session: Session, user: User) -> Self {
        Self { session, user }
    }
}

/// Result of a sign-up call.
///
/// Providers that require email confirmation create the user but hand
/// back no session; the user logs in after confirming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUp {
    pub user: User,
    pub session: Option<Session>,
}

// ---------------------------------------------------------------------------
// Provider events
// ---------------------------------------------------------------------------

/// A state-change notification pushed by the identity provider.
///
/// Events arrive through a bounded channel and are applied strictly in
/// arrival order. They may originate from our own calls or from another
/// tab/process sharing the same provider session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// First event after subscribing: the session the provider already had.
    InitialSession(Option<Grant>),
    /// A user signed in (password, OAuth redirect completion, sign-up).
    SignedIn(Grant),
    /// The provider rotated the access token.
    TokenRefreshed(Grant),
    /// Profile data changed; the session itself is unchanged.
    UserUpdated(User),
    /// The provider session ended.
    SignedOut,
}

impl AuthEvent {
    /// The provider's wire name for this event, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitialSession(_) => "INITIAL_SESSION",
            Self::SignedIn(_) => "SIGNED_IN",
            Self::TokenRefreshed(_) => "TOKEN_REFRESHED",
            Self::UserUpdated(_) => "USER_UPDATED",
            Self::SignedOut => "SIGNED_OUT",
        }
    }
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// OAuth
// ---------------------------------------------------------------------------

/// Which external identity to redirect to for OAuth sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    GitHub,
    Apple,
    Discord,
    /// Any provider the identity service supports that isn't listed above.
    Other(String),
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Google => f.write_str("google"),
            Self::GitHub => f.write_str("github"),
            Self::Apple => f.write_str("apple"),
            Self::Discord => f.write_str("discord"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_session_new_rejects_expiry_before_issue() {
        let err = Session::new("a", None, "u1", t0(), Some(t0() - Duration::seconds(1)))
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidSession(_)));
    }

    #[test]
    fn test_session_new_rejects_equal_instants() {
        let result = Session::new("a", None, "u1", t0(), Some(t0()));
        assert!(result.is_err());
    }

    #[test]
    fn test_session_new_accepts_missing_expiry() {
        let s = Session::new("a", Some("r".into()), "u1", t0(), None).unwrap();
        assert_eq!(s.expires_at(), None);
        assert_eq!(s.refresh_token(), Some("r"));
        assert!(!s.is_expired_at(t0() + Duration::days(365)));
    }

    #[test]
    fn test_session_is_expired_at_boundary() {
        let exp = t0() + Duration::seconds(60);
        let s = Session::new("a", None, "u1", t0(), Some(exp)).unwrap();
        assert!(!s.is_expired_at(exp - Duration::seconds(1)));
        assert!(s.is_expired_at(exp));
    }

    #[test]
    fn test_session_debug_redacts_tokens() {
        let s = Session::new("secret-access", Some("secret-refresh".into()), "u1", t0(), None)
            .unwrap();
        let printed = format!("{s:?}");
        assert!(!printed.contains("secret-access"));
        assert!(!printed.contains("secret-refresh"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_user_id_display() {
        assert_eq!(UserId::new("abc").to_string(), "U-abc");
    }

    #[test]
    fn test_event_names_match_wire() {
        assert_eq!(AuthEvent::SignedOut.name(), "SIGNED_OUT");
        assert_eq!(AuthEvent::InitialSession(None).to_string(), "INITIAL_SESSION");
    }

    #[test]
    fn test_oauth_provider_display() {
        assert_eq!(OAuthProvider::GitHub.to_string(), "github");
        assert_eq!(OAuthProvider::Other("gitlab".into()).to_string(), "gitlab");
    }
}
