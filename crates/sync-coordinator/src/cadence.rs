//! Interval selection from drain outcomes.

use serde::Serialize;
use std::time::Duration;
use sync_queue_engine::SyncSummary;

/// Which interval the coordinator is sleeping on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Active,
    Idle,
}

/// Two-speed cadence state machine.
///
/// Every empty drain extends the idle streak; once the streak reaches
/// `idle_threshold` the cadence drops to idle. A drain that attempts any
/// operation resets the streak and returns to active.
#[derive(Debug, Clone)]
pub struct CadencePolicy {
    active_interval: Duration,
    idle_interval: Duration,
    idle_threshold: u32,
    empty_streak: u32,
    cadence: Cadence,
}

impl CadencePolicy {
    pub fn new(active_interval: Duration, idle_interval: Duration, idle_threshold: u32) -> Self {
        Self {
            active_interval,
            idle_interval,
            idle_threshold: idle_threshold.max(1),
            empty_streak: 0,
            cadence: Cadence::Active,
        }
    }

    /// Fold one drain into the state and return the next sleep.
    pub fn record(&mut self, summary: &SyncSummary) -> Duration {
        if summary.did_work() {
            self.empty_streak = 0;
            self.cadence = Cadence::Active;
        } else {
            self.empty_streak = self.empty_streak.saturating_add(1);
            if self.empty_streak >= self.idle_threshold {
                self.cadence = Cadence::Idle;
            }
        }
        self.interval()
    }

    pub fn interval(&self) -> Duration {
        match self.cadence {
            Cadence::Active => self.active_interval,
            Cadence::Idle => self.idle_interval,
        }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn empty_streak(&self) -> u32 {
        self.empty_streak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CadencePolicy {
        CadencePolicy::new(Duration::from_secs(60), Duration::from_secs(300), 3)
    }

    fn busy() -> SyncSummary {
        SyncSummary {
            attempted: 2,
            succeeded: 1,
            failed: 1,
            skipped: 0,
        }
    }

    #[test]
    fn starts_active() {
        let policy = policy();
        assert_eq!(policy.cadence(), Cadence::Active);
        assert_eq!(policy.interval(), Duration::from_secs(60));
    }

    #[test]
    fn goes_idle_after_threshold_empty_drains() {
        let mut policy = policy();
        assert_eq!(policy.record(&SyncSummary::default()), Duration::from_secs(60));
        assert_eq!(policy.record(&SyncSummary::default()), Duration::from_secs(60));
        assert_eq!(policy.record(&SyncSummary::default()), Duration::from_secs(300));
        assert_eq!(policy.cadence(), Cadence::Idle);
        assert_eq!(policy.empty_streak(), 3);
    }

    #[test]
    fn work_resets_streak_and_returns_to_active() {
        let mut policy = policy();
        for _ in 0..5 {
            policy.record(&SyncSummary::default());
        }
        assert_eq!(policy.cadence(), Cadence::Idle);

        assert_eq!(policy.record(&busy()), Duration::from_secs(60));
        assert_eq!(policy.cadence(), Cadence::Active);
        assert_eq!(policy.empty_streak(), 0);
    }

    #[test]
    fn work_interrupts_streak_before_threshold() {
        let mut policy = policy();
        policy.record(&SyncSummary::default());
        policy.record(&SyncSummary::default());
        policy.record(&busy());
        policy.record(&SyncSummary::default());
        policy.record(&SyncSummary::default());
        assert_eq!(policy.cadence(), Cadence::Active);
    }

    #[test]
    fn skipped_only_drain_counts_as_empty() {
        let mut policy = CadencePolicy::new(Duration::from_secs(1), Duration::from_secs(10), 1);
        let summary = SyncSummary {
            skipped: 4,
            ..SyncSummary::default()
        };
        assert_eq!(policy.record(&summary), Duration::from_secs(10));
    }

    #[test]
    fn zero_threshold_behaves_like_one() {
        let mut policy = CadencePolicy::new(Duration::from_secs(1), Duration::from_secs(10), 0);
        assert_eq!(policy.cadence(), Cadence::Active);
        policy.record(&SyncSummary::default());
        assert_eq!(policy.cadence(), Cadence::Idle);
    }
}
