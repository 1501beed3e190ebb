//! Inactivity detection for authwatch.
//!
//! Two cooperating pieces:
//!
//! - [`ActivityMonitor`]: receives raw input signals and decides whether
//!   they count as presence.
//! - [`InactivityMachine`]: the `Active → Warning → LoggedOut` state
//!   machine with its idle timer and countdown.
//!
//! Both live inside the controller's loop and exist only while a session
//! is authenticated.

mod config;
mod machine;
mod monitor;

pub use config::InactivityConfig;
pub use machine::{InactivityMachine, InactivityState, Transition};
pub use monitor::{ActivityMonitor, ActivitySignal};
