//! Proactive refresh scheduling.
//!
//! Access tokens are short-lived. Rather than wait for an API call to fail,
//! the scheduler keeps one pending timer per live session that fires a
//! configurable lead time (5 minutes by default) before `expires_at`.
//!
//! The scheduler only decides *when*. Calling the provider, storing the
//! new session and re-arming are the controller's job, because the
//! refresh call must not block the loop that owns this scheduler.
//!
//! Refresh is best-effort: a session without expiry information never arms
//! a timer, and an expired-but-unrefreshed token simply makes the next
//! authenticated API call fail at its caller.

use std::time::Duration;

use authwatch_provider::Session;
use authwatch_timer::{TimerFired, TimerRole, TimerSlot};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::RefreshConfig;

/// Owns the `refresh` timer role.
#[derive(Debug)]
pub struct RefreshScheduler {
    config: RefreshConfig,
    slot: TimerSlot,
}

impl RefreshScheduler {
    pub fn new(config: RefreshConfig) -> Self {
        Self {
            config,
            slot: TimerSlot::new(TimerRole::Refresh),
        }
    }

    /// How long to wait before refreshing `session`, measured from `now`.
    ///
    /// `max(expires_at - now - lead, 0)`, or `None` when the session has no
    /// expiry.
    pub fn delay_for(&self, session: &Session, now: DateTime<Utc>) -> Option<Duration> {
        let expires_at = session.expires_at()?;
        // `to_std` fails for negative deltas: the refresh point has passed.
        let until_expiry = (expires_at - now).to_std().unwrap_or(Duration::ZERO);
        Some(until_expiry.saturating_sub(self.config.lead))
    }

    /// Arms the refresh timer for `session`, replacing any pending one.
    ///
    /// Returns the delay that was armed, or `None` if the session has no
    /// expiry (in which case the scheduler is left disarmed).
    pub fn arm(&mut self, session: &Session) -> Option<Duration> {
        self.arm_at(session, Utc::now())
    }

    /// Like [`arm`](Self::arm), with an explicit wall-clock `now`.
    pub fn arm_at(&mut self, session: &Session, now: DateTime<Utc>) -> Option<Duration> {
        self.slot.cancel();
        let Some(delay) = self.delay_for(session, now) else {
            debug!(user_id = %session.user_id(), "session has no expiry, refresh not scheduled");
            return None;
        };
        self.slot.rearm(delay);
        debug!(
            user_id = %session.user_id(),
            delay_secs = delay.as_secs(),
            immediate = delay.is_zero(),
            "refresh scheduled"
        );
        Some(delay)
    }

    /// Cancels the pending refresh. Returns `true` if one was pending.
    pub fn disarm(&mut self) -> bool {
        self.slot.cancel()
    }

    /// Resolves when the armed refresh point passes. Pends forever while
    /// disarmed.
    pub async fn wait(&mut self) -> TimerFired {
        self.slot.wait().await
    }

    pub fn is_armed(&self) -> bool {
        self.slot.is_armed()
    }

    /// Time left until the pending refresh.
    pub fn remaining(&self) -> Option<Duration> {
        self.slot.remaining()
    }

    /// Number of times the scheduler has been armed.
    pub fn generation(&self) -> u64 {
        self.slot.generation()
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(RefreshConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;

    fn session_expiring_in(now: DateTime<Utc>, secs: i64) -> Session {
        Session::new(
            "access",
            Some("refresh".into()),
            "u1",
            now - ChronoDuration::seconds(1),
            Some(now + ChronoDuration::seconds(secs)),
        )
        .expect("valid window")
    }

    #[test]
    fn test_delay_for_one_hour_session() {
        let now = Utc::now();
        let sched = RefreshScheduler::default();
        let delay = sched.delay_for(&session_expiring_in(now, 3600), now);
        assert_eq!(delay, Some(Duration::from_secs(3300)));
    }

    #[test]
    fn test_delay_for_inside_lead_is_zero() {
        let now = Utc::now();
        let sched = RefreshScheduler::default();
        let delay = sched.delay_for(&session_expiring_in(now, 120), now);
        assert_eq!(delay, Some(Duration::ZERO));
    }

    #[test]
    fn test_delay_for_already_expired_is_zero() {
        let now = Utc::now();
        let session = Session::new(
            "a",
            None,
            "u1",
            now - ChronoDuration::hours(2),
            Some(now - ChronoDuration::hours(1)),
        )
        .unwrap();
        let sched = RefreshScheduler::default();
        assert_eq!(sched.delay_for(&session, now), Some(Duration::ZERO));
    }

    #[test]
    fn test_delay_for_without_expiry_is_none() {
        let now = Utc::now();
        let session = Session::new("a", None, "u1", now, None).unwrap();
        assert_eq!(RefreshScheduler::default().delay_for(&session, now), None);
    }

    #[test]
    fn test_delay_for_respects_custom_lead() {
        let now = Utc::now();
        let sched = RefreshScheduler::new(RefreshConfig {
            lead: Duration::from_secs(60),
        });
        let delay = sched.delay_for(&session_expiring_in(now, 600), now);
        assert_eq!(delay, Some(Duration::from_secs(540)));
    }
}
