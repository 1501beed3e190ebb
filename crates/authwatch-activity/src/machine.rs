//! The inactivity state machine.
//!
//! ```text
//!            note_activity (rearm idle timer)
//!              ┌──────┐
//!              ▼      │
//!   ──→ Active ───────┘
//!        │  ▲
//!   idle │  │ dismiss
//!  fires ▼  │
//!   Warning{r} ──(tick, r-1 > 0)──→ Warning{r-1}
//!        │
//!        └──(tick, r-1 <= 0)──→ LoggedOut
//! ```
//!
//! The machine owns two timer roles: the idle timer (`Active` only) and
//! the countdown tick (`Warning` only). They are separate slots so that
//! dismissing a warning can't leave a countdown tick alive, and at most one
//! of them is ever armed.
//!
//! The machine only exists while someone is authenticated. `LoggedOut` is
//! reported to the owner, which signs out and destroys the machine.

use std::fmt;

use authwatch_timer::{TimerFired, TimerRole, TimerSlot};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::InactivityConfig;

/// Where the user is in the idle → warning → logout sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InactivityState {
    /// The user is considered present.
    Active,
    /// The warning is showing; sign-out in `remaining_secs` ticks.
    Warning { remaining_secs: u32 },
    /// The countdown ran out.
    LoggedOut,
}

impl fmt::Display for InactivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Warning { remaining_secs } => write!(f, "warning({remaining_secs}s)"),
            Self::LoggedOut => f.write_str("logged-out"),
        }
    }
}

/// What a timer firing changed. Returned by [`InactivityMachine::on_timer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed (a firing that doesn't apply to the current state).
    None,
    /// `Active → Warning`.
    WarningShown { remaining_secs: u32 },
    /// `Warning{r} → Warning{r-1}`.
    Tick { remaining_secs: u32 },
    /// `Warning → LoggedOut`. The owner must sign out.
    LoggedOut,
}

/// Idle detection for one authenticated session.
#[derive(Debug)]
pub struct InactivityMachine {
    config: InactivityConfig,
    state: InactivityState,
    to_warning: TimerSlot,
    countdown: TimerSlot,
}

impl InactivityMachine {
    /// Creates a machine in `Active` with no timer armed yet; the first
    /// [`note_activity`](Self::note_activity) starts the idle timer.
    pub fn new(config: InactivityConfig) -> Self {
        Self {
            config: config.validated(),
            state: InactivityState::Active,
            to_warning: TimerSlot::new(TimerRole::InactivityToWarning),
            countdown: TimerSlot::new(TimerRole::WarningCountdown),
        }
    }

    /// Restarts the idle timer. Only applies in `Active`; returns `false`
    /// (and changes nothing) otherwise.
    pub fn note_activity(&mut self) -> bool {
        if self.state != InactivityState::Active {
            return false;
        }
        self.to_warning.rearm(self.config.idle_timeout);
        trace!("activity noted, idle timer restarted");
        true
    }

    /// The explicit "I'm still here" action from the warning dialog.
    ///
    /// `Warning → Active`: cancels the countdown and restarts the idle
    /// timer from zero. A no-op in any other state. Returns `true` if the
    /// warning was dismissed.
    pub fn dismiss(&mut self) -> bool {
        let InactivityState::Warning { remaining_secs } = self.state else {
            return false;
        };
        self.countdown.cancel();
        self.state = InactivityState::Active;
        self.to_warning.rearm(self.config.idle_timeout);
        info!(remaining_secs, "inactivity warning dismissed");
        true
    }

    /// Waits for whichever timer is armed. Pends forever when neither is.
    pub async fn wait(&mut self) -> TimerFired {
        if self.countdown.is_armed() {
            self.countdown.wait().await
        } else {
            self.to_warning.wait().await
        }
    }

    /// Applies a firing returned by [`wait`](Self::wait).
    pub fn on_timer(&mut self, fired: TimerFired) -> Transition {
        match (fired.role, self.state) {
            (TimerRole::InactivityToWarning, InactivityState::Active) => {
                let remaining_secs = self.config.warning_secs;
                self.state = InactivityState::Warning { remaining_secs };
                self.countdown.rearm(self.config.tick);
                info!(remaining_secs, "user idle, showing inactivity warning");
                Transition::WarningShown { remaining_secs }
            }
            (TimerRole::WarningCountdown, InactivityState::Warning { remaining_secs }) => {
                let next = remaining_secs.saturating_sub(1);
                if next > 0 {
                    self.state = InactivityState::Warning { remaining_secs: next };
                    self.countdown.rearm(self.config.tick);
                    trace!(remaining_secs = next, "inactivity countdown");
                    Transition::Tick { remaining_secs: next }
                } else {
                    self.state = InactivityState::LoggedOut;
                    self.cancel_all();
                    info!("inactivity countdown expired");
                    Transition::LoggedOut
                }
            }
            (role, state) => {
                debug!(%role, %state, "timer firing does not apply, ignoring");
                Transition::None
            }
        }
    }

    /// Cancels both timers. Called when the session ends.
    pub fn cancel_all(&mut self) {
        self.to_warning.cancel();
        self.countdown.cancel();
    }

    pub fn state(&self) -> InactivityState {
        self.state
    }

    pub fn is_warning(&self) -> bool {
        matches!(self.state, InactivityState::Warning { .. })
    }

    /// Number of armed timers (0 or 1).
    pub fn armed_timers(&self) -> usize {
        usize::from(self.to_warning.is_armed()) + usize::from(self.countdown.is_armed())
    }

    pub fn config(&self) -> &InactivityConfig {
        &self.config
    }
}

impl Drop for InactivityMachine {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn fired(role: TimerRole) -> TimerFired {
        TimerFired {
            role,
            generation: 0,
            late_by: Duration::ZERO,
        }
    }

    #[test]
    fn test_new_machine_is_active_without_timers() {
        let m = InactivityMachine::new(InactivityConfig::default());
        assert_eq!(m.state(), InactivityState::Active);
        assert_eq!(m.armed_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_fire_enters_warning() {
        let mut m = InactivityMachine::new(InactivityConfig::default());
        m.note_activity();

        let t = m.on_timer(fired(TimerRole::InactivityToWarning));

        assert_eq!(t, Transition::WarningShown { remaining_secs: 30 });
        assert_eq!(m.state(), InactivityState::Warning { remaining_secs: 30 });
        assert_eq!(m.armed_timers(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_reaches_logged_out() {
        let mut m = InactivityMachine::new(InactivityConfig {
            warning_secs: 2,
            ..InactivityConfig::default()
        });
        m.on_timer(fired(TimerRole::InactivityToWarning));

        assert_eq!(
            m.on_timer(fired(TimerRole::WarningCountdown)),
            Transition::Tick { remaining_secs: 1 }
        );
        assert_eq!(m.on_timer(fired(TimerRole::WarningCountdown)), Transition::LoggedOut);
        assert_eq!(m.state(), InactivityState::LoggedOut);
        assert_eq!(m.armed_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_note_activity_ignored_during_warning() {
        let mut m = InactivityMachine::new(InactivityConfig::default());
        m.on_timer(fired(TimerRole::InactivityToWarning));

        assert!(!m.note_activity());
        assert!(m.is_warning());
    }

    #[test]
    fn test_dismiss_while_active_is_noop() {
        let mut m = InactivityMachine::new(InactivityConfig::default());
        assert!(!m.dismiss());
        assert_eq!(m.armed_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_countdown_in_active_is_ignored() {
        let mut m = InactivityMachine::new(InactivityConfig::default());
        m.note_activity();
        assert_eq!(m.on_timer(fired(TimerRole::WarningCountdown)), Transition::None);
        assert_eq!(m.state(), InactivityState::Active);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(InactivityState::Warning { remaining_secs: 7 }.to_string(), "warning(7s)");
    }
}
