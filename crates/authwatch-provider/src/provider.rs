//! The identity provider boundary.
//!
//! authwatch doesn't implement authentication itself. Password checks,
//! OAuth handshakes and token signing belong to your identity provider
//! (Supabase, Firebase, Auth0, a custom service). authwatch only consumes
//! the provider's public session operations through the
//! [`IdentityProvider`] trait, so production code, a local dev provider,
//! and test mocks are interchangeable.
//!
//! # Async methods
//!
//! Every call may take an unbounded amount of wall-clock time. The
//! controller never awaits them inline: it spawns each call on its own
//! task and applies the result when it arrives. That is why the returned
//! futures must be `Send`.

use std::future::Future;

use tokio::sync::mpsc;

use crate::{AuthEvent, Grant, OAuthProvider, ProviderError, Session, SignUp};

/// The operations authwatch needs from an identity provider client.
///
/// # Trait bounds
///
/// - `Send + Sync` → shared across the controller's spawned call tasks.
/// - `'static` → the provider lives as long as the controller that owns it.
///
/// # Example
///
/// ```rust
/// use authwatch_provider::{
///     AuthEvent, Grant, IdentityProvider, OAuthProvider, ProviderError, Session, SignUp,
/// };
/// use tokio::sync::mpsc;
///
/// /// A provider that is permanently offline.
/// struct Offline;
///
/// impl IdentityProvider for Offline {
///     async fn sign_in(&self, _: &str, _: &str) -> Result<Grant, ProviderError> {
///         Err(ProviderError::Network("offline".into()))
///     }
///     async fn sign_up(&self, _: &str, _: &str, _: Option<&str>) -> Result<SignUp, ProviderError> {
///         Err(ProviderError::Network("offline".into()))
///     }
///     async fn sign_out(&self) -> bool {
///         false
///     }
///     async fn get_session(&self) -> Result<Option<Grant>, ProviderError> {
///         Ok(None)
///     }
///     async fn refresh_session(&self) -> Result<Session, ProviderError> {
///         Err(ProviderError::Network("offline".into()))
///     }
///     async fn sign_in_with_oauth(&self, _: OAuthProvider) -> Result<(), ProviderError> {
///         Err(ProviderError::Network("offline".into()))
///     }
///     fn subscribe(&self, _: usize) -> Result<mpsc::Receiver<AuthEvent>, ProviderError> {
///         Err(ProviderError::Unavailable("no realtime connection".into()))
///     }
/// }
/// ```
pub trait IdentityProvider: Send + Sync + 'static {
    /// Email/password sign-in. On success the provider also pushes
    /// `SIGNED_IN` to subscribers.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Grant, ProviderError>> + Send;

    /// Creates an account. The returned session is `None` when the
    /// provider requires email confirmation first.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> impl Future<Output = Result<SignUp, ProviderError>> + Send;

    /// Ends the provider session.
    ///
    /// Never fails: returns `false` if the provider could not be told, and
    /// callers treat the local state as logged out either way.
    fn sign_out(&self) -> impl Future<Output = bool> + Send;

    /// Fetches the session the provider already holds (e.g. restored from
    /// its own storage). `Ok(None)` means nobody is logged in.
    fn get_session(
        &self,
    ) -> impl Future<Output = Result<Option<Grant>, ProviderError>> + Send;

    /// Forces a token refresh using the stored refresh token.
    fn refresh_session(
        &self,
    ) -> impl Future<Output = Result<Session, ProviderError>> + Send;

    /// Starts a redirect-based OAuth sign-in.
    ///
    /// Returns once the redirect is initiated. Completion is observed later
    /// as a `SIGNED_IN` event, not as this call's return value.
    fn sign_in_with_oauth(
        &self,
        kind: OAuthProvider,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Opens the provider's push-notification stream.
    ///
    /// Events are delivered through a bounded channel of `capacity`
    /// in the order the provider emits them. Dropping the receiver
    /// unsubscribes.
    fn subscribe(
        &self,
        capacity: usize,
    ) -> Result<mpsc::Receiver<AuthEvent>, ProviderError>;
}

/// Uploads a finished game's score for the signed-in user.
///
/// An external collaborator: authwatch doesn't validate the call, it only
/// refuses to make it while nobody is authenticated.
pub trait ScoreSync: Send + Sync {
    /// Returns `true` if the score was accepted.
    fn sync_score(
        &self,
        session: &Session,
        score: u64,
        stars: u8,
        nickname: &str,
    ) -> impl Future<Output = bool> + Send;
}
