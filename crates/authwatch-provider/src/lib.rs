//! Identity provider boundary for authwatch.
//!
//! This crate defines everything authwatch knows about the outside
//! identity service:
//!
//! - **Types** ([`Session`], [`User`], [`Grant`], [`AuthEvent`]): the
//!   immutable values the provider hands us.
//! - **Provider** ([`IdentityProvider`] trait): the session operations
//!   the controller consumes. Implemented by the host application.
//! - **Codec** ([`EventCodec`], [`JsonEventCodec`]): how raw push
//!   payloads become [`AuthEvent`]s.
//! - **Errors** ([`ProviderError`]).
//!
//! ```text
//! Identity service ──push──→ EventCodec ──AuthEvent──→ controller
//!        ↑                                                 │
//!        └──────────── IdentityProvider calls ─────────────┘
//! ```

mod codec;
mod error;
mod provider;
mod types;

pub use codec::EventCodec;
#[cfg(feature = "json")]
pub use codec::JsonEventCodec;
pub use error::ProviderError;
pub use provider::{IdentityProvider, ScoreSync};
pub use types::{AuthEvent, Grant, OAuthProvider, Session, SignUp, User, UserId};
