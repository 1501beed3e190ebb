//! Unified error type for the auth controller.

use authwatch_provider::ProviderError;

/// Errors returned by [`AuthHandle`](crate::AuthHandle) actions.
///
/// Provider errors convert automatically through `#[from]`, so the `?`
/// operator works across the layers. Every message is suitable for showing
/// to the user as the reason an action failed.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The identity provider refused or could not be reached.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The action needs a logged-in user.
    #[error("not signed in")]
    NotAuthenticated,

    /// The provider client could not be constructed; authentication is
    /// disabled for this run.
    #[error("sign-in is unavailable right now")]
    Unavailable,

    /// A refresh was rejected. The session has been ended.
    #[error("session refresh failed: {0}")]
    RefreshFailed(String),

    /// The session this request was made for ended before it completed.
    #[error("the session changed before the request completed")]
    Superseded,

    /// The controller task is gone (shut down, or every handle dropped).
    #[error("auth controller has shut down")]
    ControllerClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_provider_error() {
        let err: AuthError = ProviderError::Rejected("bad password".into()).into();
        assert!(matches!(err, AuthError::Provider(_)));
        assert!(err.to_string().contains("bad password"));
    }

    #[test]
    fn test_refresh_failed_message() {
        let err = AuthError::RefreshFailed("token revoked".into());
        assert_eq!(err.to_string(), "session refresh failed: token revoked");
    }
}
