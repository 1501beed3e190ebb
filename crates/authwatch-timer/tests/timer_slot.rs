//! Integration tests for role-scoped timer slots.
//!
//! Uses `start_paused = true` so Tokio's clock only moves when the test
//! advances it (or when every task is idle and the runtime auto-advances
//! to the next deadline).

use std::time::Duration;

use authwatch_timer::{TimerRole, TimerSlot};
use tokio::time::{self, Instant};

// =========================================================================
// Helpers
// =========================================================================

fn refresh_slot() -> TimerSlot {
    TimerSlot::new(TimerRole::Refresh)
}

/// The paused clock rounds deadlines to whole milliseconds, so allow a
/// millisecond of slack when checking when a slot fired.
fn assert_elapsed(start: Instant, expected: Duration) {
    let elapsed = Instant::now() - start;
    assert!(
        elapsed >= expected && elapsed <= expected + Duration::from_millis(1),
        "expected ~{expected:?}, got {elapsed:?}"
    );
}

// =========================================================================
// Creation
// =========================================================================

#[test]
fn test_new_slot_is_disarmed() {
    let slot = refresh_slot();
    assert!(!slot.is_armed());
    assert_eq!(slot.deadline(), None);
    assert_eq!(slot.generation(), 0);
    assert_eq!(slot.fire_count(), 0);
    assert_eq!(slot.role(), TimerRole::Refresh);
}

#[test]
fn test_role_names() {
    assert_eq!(TimerRole::Refresh.to_string(), "refresh");
    assert_eq!(TimerRole::InactivityToWarning.to_string(), "inactivity-to-warning");
    assert_eq!(TimerRole::WarningCountdown.to_string(), "warning-countdown");
    assert_eq!(TimerRole::InitWatchdog.to_string(), "init-watchdog");
}

// =========================================================================
// Arming
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_rearm_sets_deadline() {
    let mut slot = refresh_slot();
    let start = Instant::now();

    let generation = slot.rearm(Duration::from_secs(3300));

    assert_eq!(generation, 1);
    assert!(slot.is_armed());
    assert_eq!(slot.deadline(), Some(start + Duration::from_secs(3300)));
}

#[tokio::test(start_paused = true)]
async fn test_rearm_twice_leaves_one_pending_deadline() {
    let mut slot = refresh_slot();
    let start = Instant::now();

    slot.rearm(Duration::from_secs(10));
    slot.rearm(Duration::from_secs(20));

    // Only the second deadline survives.
    assert_eq!(slot.deadline(), Some(start + Duration::from_secs(20)));
    assert_eq!(slot.generation(), 2);

    let fired = slot.wait().await;
    assert_eq!(fired.generation, 2);
    assert_elapsed(start, Duration::from_secs(20));

    // Nothing left to fire: the first arming was replaced, not queued.
    let again = time::timeout(Duration::from_secs(60), slot.wait()).await;
    assert!(again.is_err());
    assert_eq!(slot.fire_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_delay_fires_on_next_poll() {
    let mut slot = refresh_slot();
    let start = Instant::now();

    slot.rearm(Duration::ZERO);
    // Still armed: rearm itself never fires.
    assert!(slot.is_armed());

    let fired = slot.wait().await;
    assert_eq!(fired.role, TimerRole::Refresh);
    assert_elapsed(start, Duration::ZERO);
    assert!(!slot.is_armed());
}

// =========================================================================
// Cancellation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_prevents_fire() {
    let mut slot = refresh_slot();
    slot.rearm(Duration::from_secs(1));

    assert!(slot.cancel());
    assert!(!slot.is_armed());

    let result = time::timeout(Duration::from_secs(5), slot.wait()).await;
    assert!(result.is_err(), "cancelled slot should pend forever");
    assert_eq!(slot.fire_count(), 0);
}

#[test]
fn test_cancel_idempotent() {
    let mut slot = refresh_slot();
    assert!(!slot.cancel());
    assert!(!slot.cancel());
}

#[tokio::test(start_paused = true)]
async fn test_rearm_with_unrepresentable_delay_clamps() {
    let mut slot = refresh_slot();
    let start = Instant::now();

    slot.rearm(Duration::MAX);

    assert!(slot.is_armed());
    assert!(slot.deadline().unwrap() > start + Duration::from_secs(86_400 * 365));
    let result = time::timeout(Duration::from_secs(3600), slot.wait()).await;
    assert!(result.is_err());
    assert_eq!(slot.fire_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_disarmed_slot_pends_forever() {
    let mut slot = TimerSlot::new(TimerRole::InitWatchdog);
    let result = time::timeout(Duration::from_secs(3600), slot.wait()).await;
    assert!(result.is_err());
}

// =========================================================================
// Cancel safety inside select!
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_dropped_wait_keeps_deadline() {
    let mut slot = refresh_slot();
    let start = Instant::now();
    slot.rearm(Duration::from_secs(10));

    // A shorter branch wins the race; the slot's future is dropped.
    tokio::select! {
        _ = slot.wait() => panic!("slot should not fire first"),
        _ = time::sleep(Duration::from_secs(1)) => {}
    }

    assert!(slot.is_armed());
    slot.wait().await;
    assert_elapsed(start, Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_fired_reports_lateness() {
    let mut slot = TimerSlot::new(TimerRole::WarningCountdown);
    slot.rearm(Duration::from_secs(1));

    // Owner was busy for 3s before polling.
    time::advance(Duration::from_secs(3)).await;

    let fired = slot.wait().await;
    assert_eq!(fired.late_by, Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_remaining_counts_down() {
    let mut slot = TimerSlot::new(TimerRole::InactivityToWarning);
    slot.rearm(Duration::from_secs(600));

    time::advance(Duration::from_secs(100)).await;

    assert_eq!(slot.remaining(), Some(Duration::from_secs(500)));
}
