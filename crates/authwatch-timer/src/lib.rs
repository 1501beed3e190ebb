//! Role-scoped one-shot timers for authwatch.
//!
//! Every timer the controller runs belongs to a [`TimerRole`], and each
//! role is owned by exactly one [`TimerSlot`]. A slot holds at most one
//! pending deadline: [`TimerSlot::rearm`] replaces whatever was pending and
//! [`TimerSlot::cancel`] clears it. There is no separate handle to forget
//! about, so a stray timer for a finished session can't exist.
//!
//! # Integration
//!
//! A slot doesn't spawn anything. It sits inside the owner's
//! `tokio::select!` loop, and [`TimerSlot::wait`] pends forever while the
//! slot is disarmed:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* may rearm or cancel the slot */ }
//!         fired = refresh_slot.wait() => { /* deadline passed */ }
//!     }
//! }
//! ```
//!
//! Because arming, cancelling and firing all happen on the owner's task,
//! a cancel is final the moment it returns: the deadline is gone before
//! the loop polls `wait()` again.

use std::fmt;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// Deadline used when `now + delay` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// The logical purpose of a timer.
///
/// Used for logging and to tell apart which slot fired when several share
/// a `select!` loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerRole {
    /// Proactive access-token refresh.
    Refresh,
    /// Idle period before the inactivity warning is shown.
    InactivityToWarning,
    /// One-second ticks while the inactivity warning counts down.
    WarningCountdown,
    /// Bounded wait for the initial session check at startup.
    InitWatchdog,
}

impl TimerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::InactivityToWarning => "inactivity-to-warning",
            Self::WarningCountdown => "warning-countdown",
            Self::InitWatchdog => "init-watchdog",
        }
    }
}

impl fmt::Display for TimerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Fired
// ---------------------------------------------------------------------------

/// Returned by [`TimerSlot::wait`] when a deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    /// Which slot fired.
    pub role: TimerRole,
    /// The arming this firing belongs to (see [`TimerSlot::generation`]).
    pub generation: u64,
    /// How far past the deadline the owner got around to polling.
    pub late_by: Duration,
}

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// Owner of the single pending deadline for one [`TimerRole`].
#[derive(Debug)]
pub struct TimerSlot {
    role: TimerRole,
    /// `Some` while armed. Cleared on cancel and on fire.
    deadline: Option<Instant>,
    /// Bumped on every arm, so each pending deadline has a unique number.
    generation: u64,
    fired: u64,
}

impl TimerSlot {
    /// Creates a disarmed slot.
    pub fn new(role: TimerRole) -> Self {
        Self {
            role,
            deadline: None,
            generation: 0,
            fired: 0,
        }
    }

    /// Arms the slot to fire after `delay`, replacing any pending deadline.
    ///
    /// A zero delay fires on the next poll of [`wait`](Self::wait), never
    /// synchronously inside this call. A delay too large to represent is
    /// clamped to roughly thirty years. Returns the new generation.
    pub fn rearm(&mut self, delay: Duration) -> u64 {
        let now = Instant::now();
        let deadline = now.checked_add(delay).unwrap_or_else(|| {
            warn!(
                role = %self.role,
                delay_secs = delay.as_secs(),
                "timer delay out of range, clamped"
            );
            now + FAR_FUTURE
        });
        self.rearm_at(deadline)
    }

    /// Arms the slot to fire at `deadline`, replacing any pending deadline.
    pub fn rearm_at(&mut self, deadline: Instant) -> u64 {
        let replaced = self.deadline.replace(deadline).is_some();
        self.generation += 1;
        debug!(
            role = %self.role,
            generation = self.generation,
            delay_ms = deadline
                .saturating_duration_since(Instant::now())
                .as_millis() as u64,
            replaced,
            "timer armed"
        );
        self.generation
    }

    /// Cancels the pending deadline. Returns `true` if one was pending.
    ///
    /// Safe to call multiple times (idempotent).
    pub fn cancel(&mut self) -> bool {
        let was_armed = self.deadline.take().is_some();
        if was_armed {
            debug!(role = %self.role, generation = self.generation, "timer cancelled");
        }
        was_armed
    }

    /// Waits until the pending deadline passes, then disarms the slot.
    ///
    /// When the slot is disarmed this future pends forever; inside
    /// `tokio::select!` the other branches keep running. Dropping the
    /// future before it completes leaves the deadline in place, so the
    /// slot can be polled again on the next loop iteration.
    pub async fn wait(&mut self) -> TimerFired {
        let Some(deadline) = self.deadline else {
            std::future::pending::<()>().await;
            unreachable!()
        };

        time::sleep_until(deadline).await;

        self.deadline = None;
        self.fired += 1;
        let late_by = Instant::now().saturating_duration_since(deadline);
        trace!(role = %self.role, generation = self.generation, "timer fired");

        TimerFired {
            role: self.role,
            generation: self.generation,
            late_by,
        }
    }

    /// Whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The pending deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the pending deadline (zero if already due).
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// The role this slot owns.
    pub fn role(&self) -> TimerRole {
        self.role
    }

    /// Number of times this slot has been armed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of times a deadline actually fired.
    pub fn fire_count(&self) -> u64 {
        self.fired
    }
}
