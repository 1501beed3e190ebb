//! Error types for the provider boundary.

/// Errors reported by an [`IdentityProvider`](crate::IdentityProvider)
/// or by the push-event codec.
///
/// Message strings are meant for humans: the controller forwards them to
/// the UI as the reason a login or refresh failed.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider could not be reached (DNS, TLS, timeout, offline).
    #[error("network error: {0}")]
    Network(String),

    /// The provider answered and said no: wrong password, revoked or
    /// expired refresh token, email not confirmed, etc.
    #[error("rejected by identity provider: {0}")]
    Rejected(String),

    /// The provider returned session data that violates the model
    /// (e.g. `expires_at` not after `issued_at`, or a missing session on
    /// an event that requires one).
    #[error("invalid session: {0}")]
    InvalidSession(String),

    /// The provider client is not usable (misconfiguration, shut down,
    /// subscription could not be established).
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    /// A push notification we don't reconcile (e.g. `PASSWORD_RECOVERY`).
    #[error("unsupported provider event: {0}")]
    UnsupportedEvent(String),

    /// A push payload could not be parsed.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
