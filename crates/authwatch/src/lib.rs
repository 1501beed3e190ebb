//! # authwatch
//!
//! Client-side session lifecycle controller.
//!
//! authwatch sits between an identity provider and an application UI. It
//! keeps a single consistent view of who is logged in, refreshes access
//! tokens before they expire, signs the user out after a period of
//! inactivity (with a visible countdown first), and reconciles the
//! provider's pushed auth events with the user's own actions.
//!
//! The host implements [`IdentityProvider`] for its provider client and
//! spawns a controller; everything else goes through the returned
//! [`AuthHandle`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use authwatch::prelude::*;
//!
//! async fn start<P: IdentityProvider>(provider: P) -> Result<(), AuthError> {
//!     let auth = AuthController::spawn(provider, AuthConfig::default());
//!     let state = auth.wait_until_loaded().await?;
//!     if !state.is_authenticated() {
//!         auth.login("ada@example.com", "hunter2").await?;
//!     }
//!     auth.record_activity(ActivitySignal::KeyDown);
//!     Ok(())
//! }
//! ```

mod config;
mod controller;
mod error;
mod handle;
mod snapshot;

pub use config::AuthConfig;
pub use controller::AuthController;
pub use error::AuthError;
pub use handle::AuthHandle;
pub use snapshot::{AuthSnapshot, LogoutReason};

pub use authwatch_activity::{ActivitySignal, InactivityConfig, InactivityState};
pub use authwatch_provider::{
    AuthEvent, EventCodec, Grant, IdentityProvider, OAuthProvider, ProviderError, ScoreSync,
    Session, SignUp, User, UserId,
};
#[cfg(feature = "json")]
pub use authwatch_provider::JsonEventCodec;
pub use authwatch_session::{RefreshConfig, SessionPhase};

/// Everything a host application usually needs.
pub mod prelude {
    pub use crate::{
        ActivitySignal, AuthConfig, AuthController, AuthError, AuthEvent, AuthHandle,
        AuthSnapshot, Grant, IdentityProvider, LogoutReason, OAuthProvider, ProviderError,
        Session, SessionPhase, SignUp, User,
    };
}
