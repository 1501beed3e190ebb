//! Activity monitoring: turning raw input events into "the user is here".
//!
//! The monitor doesn't look at what a signal contains. Any qualifying
//! input counts as a presence pulse, as long as the session is
//! authenticated and no warning is showing.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{InactivityMachine, InactivityState};

/// Input events that count as user presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivitySignal {
    PointerDown,
    TouchStart,
    KeyDown,
    Scroll,
    PointerMove,
}

impl fmt::Display for ActivitySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PointerDown => "pointerdown",
            Self::TouchStart => "touchstart",
            Self::KeyDown => "keydown",
            Self::Scroll => "scroll",
            Self::PointerMove => "pointermove",
        };
        f.write_str(name)
    }
}

/// Feeds presence pulses into an [`InactivityMachine`].
///
/// Installed when the session becomes authenticated and uninstalled when
/// it ends. While uninstalled every signal is dropped.
#[derive(Debug, Default)]
pub struct ActivityMonitor {
    installed: bool,
    observed: u64,
    ignored: u64,
}

impl ActivityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts observing and immediately counts as activity, which arms the
    /// machine's idle timer.
    pub fn install(&mut self, machine: &mut InactivityMachine) {
        self.installed = true;
        self.observed = 0;
        self.ignored = 0;
        machine.note_activity();
        debug!("activity monitor installed");
    }

    /// Stops observing. Later signals are ignored until the next install.
    pub fn uninstall(&mut self) {
        if self.installed {
            self.installed = false;
            debug!(
                observed = self.observed,
                ignored = self.ignored,
                "activity monitor uninstalled"
            );
        }
    }

    /// Handles one input signal. Returns `true` if it restarted the idle
    /// timer.
    ///
    /// While the warning is showing, signals are ignored. Only the explicit
    /// dismiss action ends a warning.
    pub fn observe(&mut self, signal: ActivitySignal, machine: &mut InactivityMachine) -> bool {
        if !self.installed {
            return false;
        }
        match machine.state() {
            InactivityState::Active => {
                self.observed += 1;
                machine.note_activity()
            }
            InactivityState::Warning { .. } | InactivityState::LoggedOut => {
                self.ignored += 1;
                trace!(%signal, state = %machine.state(), "activity ignored");
                false
            }
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Signals that counted as activity since install.
    pub fn observed(&self) -> u64 {
        self.observed
    }

    /// Signals dropped because a warning was showing.
    pub fn ignored(&self) -> u64 {
        self.ignored
    }
}
