//! Session state and refresh scheduling for authwatch.
//!
//! This crate holds the two pieces of session bookkeeping that don't need
//! to know about users' activity:
//!
//! 1. **Session store**: the one place the current session, user and
//!    [`SessionPhase`] live ([`SessionStore`]).
//! 2. **Proactive refresh**: deciding when the access token should be
//!    renewed ([`RefreshScheduler`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Controller (above)  ← sole writer of the store, drives the scheduler
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Provider + Timer (below)  ← Session/User values, TimerSlot
//! ```

mod config;
mod refresh;
mod store;

pub use config::RefreshConfig;
pub use refresh::RefreshScheduler;
pub use store::{SessionPhase, SessionStore, StoreSnapshot};
