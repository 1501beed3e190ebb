//! Decoding the identity provider's push notifications.
//!
//! Provider SDKs deliver auth state changes as small JSON documents:
//!
//! ```json
//! {
//!   "event": "TOKEN_REFRESHED",
//!   "session": {
//!     "access_token": "...",
//!     "refresh_token": "...",
//!     "expires_at": 1700003600,
//!     "expires_in": 3600,
//!     "user": { "id": "...", "email": "...", "user_metadata": { "display_name": "..." } }
//!   }
//! }
//! ```
//!
//! An adapter that owns the provider's realtime connection runs each
//! payload through an [`EventCodec`] and forwards the resulting
//! [`AuthEvent`] into the subscription channel. Keeping the codec behind a
//! trait lets an adapter swap formats without touching the controller.

use crate::{AuthEvent, ProviderError};

/// Turns a raw push payload into an [`AuthEvent`].
pub trait EventCodec: Send + Sync + 'static {
    /// # Errors
    /// - [`ProviderError::UnsupportedEvent`] for event names authwatch
    ///   doesn't reconcile. Adapters should log and skip these.
    /// - [`ProviderError::InvalidSession`] when an event that needs a
    ///   session arrives without one, or with an invalid window.
    /// - [`ProviderError::Decode`] for malformed payloads.
    fn decode_event(&self, data: &[u8]) -> Result<AuthEvent, ProviderError>;
}

#[cfg(feature = "json")]
pub use json::JsonEventCodec;

#[cfg(feature = "json")]
mod json {
    use chrono::{DateTime, Duration, Utc};
    use serde::Deserialize;

    use super::EventCodec;
    use crate::{AuthEvent, Grant, ProviderError, Session, User, UserId};

    /// JSON [`EventCodec`] for Supabase-style payloads (see module docs).
    ///
    /// Timestamps are unix seconds. When the payload has no explicit
    /// `issued_at`, it is derived as `expires_at - expires_in`, falling
    /// back to the decode time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct JsonEventCodec;

    #[derive(Deserialize)]
    struct WireEvent {
        event: String,
        #[serde(default)]
        session: Option<WireSession>,
    }

    #[derive(Deserialize)]
    struct WireSession {
        access_token: String,
        #[serde(default)]
        refresh_token: Option<String>,
        #[serde(default)]
        issued_at: Option<i64>,
        #[serde(default)]
        expires_at: Option<i64>,
        #[serde(default)]
        expires_in: Option<i64>,
        user: WireUser,
    }

    #[derive(Deserialize)]
    struct WireUser {
        id: String,
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        user_metadata: Option<WireMetadata>,
    }

    #[derive(Deserialize)]
    struct WireMetadata {
        #[serde(default)]
        display_name: Option<String>,
    }

    fn timestamp(secs: i64) -> Result<DateTime<Utc>, ProviderError> {
        DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            ProviderError::InvalidSession(format!("timestamp {secs} out of range"))
        })
    }

    impl WireUser {
        fn into_user(self) -> User {
            User {
                id: UserId::new(self.id),
                email: self.email.unwrap_or_default(),
                display_name: self.user_metadata.and_then(|m| m.display_name),
            }
        }
    }

    impl WireSession {
        fn into_grant(self) -> Result<Grant, ProviderError> {
            let expires_at = self.expires_at.map(timestamp).transpose()?;
            let issued_at = match (self.issued_at, expires_at, self.expires_in) {
                (Some(secs), _, _) => timestamp(secs)?,
                (None, Some(exp), Some(ttl)) => Duration::try_seconds(ttl)
                    .and_then(|ttl| exp.checked_sub_signed(ttl))
                    .ok_or_else(|| {
                        ProviderError::InvalidSession(format!("expires_in {ttl} out of range"))
                    })?,
                _ => Utc::now(),
            };
            let user = self.user.into_user();
            let session = Session::new(
                self.access_token,
                self.refresh_token,
                user.id.clone(),
                issued_at,
                expires_at,
            )?;
            Ok(Grant::new(session, user))
        }
    }

    fn require(event: &str, session: Option<WireSession>) -> Result<Grant, ProviderError> {
        session
            .ok_or_else(|| ProviderError::InvalidSession(format!("{event} without a session")))?
            .into_grant()
    }

    impl EventCodec for JsonEventCodec {
        fn decode_event(&self, data: &[u8]) -> Result<AuthEvent, ProviderError> {
            let wire: WireEvent = serde_json::from_slice(data).map_err(ProviderError::Decode)?;
            match wire.event.as_str() {
                "INITIAL_SESSION" => Ok(AuthEvent::InitialSession(
                    wire.session.map(WireSession::into_grant).transpose()?,
                )),
                "SIGNED_IN" => Ok(AuthEvent::SignedIn(require(&wire.event, wire.session)?)),
                "TOKEN_REFRESHED" => Ok(AuthEvent::TokenRefreshed(require(
                    &wire.event,
                    wire.session,
                )?)),
                "USER_UPDATED" => Ok(AuthEvent::UserUpdated(
                    require(&wire.event, wire.session)?.user,
                )),
                "SIGNED_OUT" => Ok(AuthEvent::SignedOut),
                _ => Err(ProviderError::UnsupportedEvent(wire.event)),
            }
        }
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;

    const SESSION: &str = r#"{
        "access_token": "at-1",
        "refresh_token": "rt-1",
        "expires_at": 1700003600,
        "expires_in": 3600,
        "user": {
            "id": "user-1",
            "email": "ada@example.com",
            "user_metadata": { "display_name": "Ada" }
        }
    }"#;

    fn decode(json: &str) -> Result<AuthEvent, ProviderError> {
        JsonEventCodec.decode_event(json.as_bytes())
    }

    #[test]
    fn test_decode_signed_in_builds_grant() {
        let event = decode(&format!(r#"{{"event":"SIGNED_IN","session":{SESSION}}}"#)).unwrap();
        let AuthEvent::SignedIn(grant) = event else {
            panic!("expected SignedIn, got {event:?}");
        };
        assert_eq!(grant.user.id.as_str(), "user-1");
        assert_eq!(grant.user.display_name.as_deref(), Some("Ada"));
        assert_eq!(grant.session.access_token(), "at-1");
        assert_eq!(grant.session.user_id(), &grant.user.id);
        assert_eq!(grant.session.issued_at().timestamp(), 1_700_000_000);
        assert_eq!(
            grant.session.expires_at().map(|t| t.timestamp()),
            Some(1_700_003_600)
        );
    }

    #[test]
    fn test_decode_initial_session_without_session() {
        let event = decode(r#"{"event":"INITIAL_SESSION","session":null}"#).unwrap();
        assert_eq!(event, AuthEvent::InitialSession(None));
    }

    #[test]
    fn test_decode_user_updated_keeps_only_user() {
        let event = decode(&format!(r#"{{"event":"USER_UPDATED","session":{SESSION}}}"#)).unwrap();
        let AuthEvent::UserUpdated(user) = event else {
            panic!("expected UserUpdated");
        };
        assert_eq!(user.email, "ada@example.com");
    }

    #[test]
    fn test_decode_signed_out_ignores_missing_session() {
        assert_eq!(decode(r#"{"event":"SIGNED_OUT"}"#).unwrap(), AuthEvent::SignedOut);
    }

    #[test]
    fn test_decode_token_refreshed_requires_session() {
        let err = decode(r#"{"event":"TOKEN_REFRESHED"}"#).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidSession(_)));
    }

    #[test]
    fn test_decode_unknown_event_is_unsupported() {
        let err = decode(r#"{"event":"PASSWORD_RECOVERY"}"#).unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedEvent(name) if name == "PASSWORD_RECOVERY"));
    }

    #[test]
    fn test_decode_malformed_payload() {
        let err = decode("{not json").unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_inverted_window() {
        let json = r#"{"event":"SIGNED_IN","session":{
            "access_token":"a","issued_at":1700000000,"expires_at":1600000000,
            "user":{"id":"u"}}}"#;
        assert!(matches!(decode(json), Err(ProviderError::InvalidSession(_))));
    }

    #[test]
    fn test_decode_out_of_range_expires_in_is_invalid() {
        for ttl in [i64::MAX, i64::MIN] {
            let json = format!(
                r#"{{"event":"SIGNED_IN","session":{{
                    "access_token":"a","expires_at":1700003600,"expires_in":{ttl},
                    "user":{{"id":"u"}}}}}}"#
            );
            assert!(matches!(decode(&json), Err(ProviderError::InvalidSession(_))));
        }
    }

    #[test]
    fn test_decode_session_without_expiry() {
        let json = r#"{"event":"SIGNED_IN","session":{"access_token":"a","user":{"id":"u"}}}"#;
        let AuthEvent::SignedIn(grant) = decode(json).unwrap() else {
            panic!("expected SignedIn");
        };
        assert_eq!(grant.session.expires_at(), None);
        assert_eq!(grant.user.email, "");
    }
}
