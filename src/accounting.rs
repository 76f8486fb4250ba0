//! Point and streak accounting for task completions.
//!
//! The accountant runs once per false -> true completion transition. It
//! depends on storage only through [`StatsStore`], and the completed task
//! must already be visible to [`StatsStore::completion_timestamps`] when it
//! runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::streak::StreakCalculator;

/// Per-user aggregate, created lazily on the first completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_points: u64,
    pub current_streak: u32,
    pub best_streak: u32,
    pub tasks_completed: u64,
}

impl UserStats {
    /// Apply an update with increment semantics for the counters.
    pub fn apply(&mut self, update: &StatsUpdate) {
        self.total_points = self.total_points.saturating_add(update.increment_points);
        self.current_streak = update.set_current_streak;
        self.best_streak = update.set_best_streak;
        self.tasks_completed = self
            .tasks_completed
            .saturating_add(update.increment_tasks_completed);
    }
}

/// The only fields a completion may write, applied as one logical update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsUpdate {
    pub increment_points: u64,
    pub set_current_streak: u32,
    pub set_best_streak: u32,
    pub increment_tasks_completed: u64,
}

/// Storage contract consumed by the accountant.
pub trait StatsStore {
    /// Completion instants of every completed task owned by `user`.
    fn completion_timestamps(&self, user: &str) -> Result<Vec<DateTime<Utc>>>;

    /// Existing stats for `user`, or a freshly stored zero record.
    fn get_or_create_user_stats(&mut self, user: &str) -> Result<UserStats>;

    fn apply_stats_update(&mut self, user: &str, update: &StatsUpdate) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionAccountant {
    streaks: StreakCalculator,
}

impl CompletionAccountant {
    pub fn new(streaks: StreakCalculator) -> Self {
        Self { streaks }
    }

    pub fn streaks(&self) -> &StreakCalculator {
        &self.streaks
    }

    /// Account one completion worth `task_points` and return the stored stats.
    ///
    /// Store errors propagate unchanged; nothing is retried.
    pub fn on_task_completed<S>(
        &self,
        store: &mut S,
        user: &str,
        task_points: u32,
    ) -> Result<UserStats>
    where
        S: StatsStore + ?Sized,
    {
        let existing = store.get_or_create_user_stats(user)?;
        let timestamps = store.completion_timestamps(user)?;
        let current_streak = self.streaks.current_streak(&timestamps);
        let best_streak = current_streak.max(existing.best_streak);

        let update = StatsUpdate {
            increment_points: u64::from(task_points),
            set_current_streak: current_streak,
            set_best_streak: best_streak,
            increment_tasks_completed: 1,
        };
        store.apply_stats_update(user, &update)?;

        debug!(
            user,
            points = task_points,
            current_streak,
            best_streak,
            completions = timestamps.len(),
            "completion accounted"
        );

        store.get_or_create_user_stats(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::points::{points_for, Priority};
    use chrono::TimeZone;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryStore {
        completions: HashMap<String, Vec<DateTime<Utc>>>,
        stats: HashMap<String, UserStats>,
        creates: usize,
        fail_timestamps: bool,
    }

    impl MemoryStore {
        fn complete(&mut self, user: &str, at: DateTime<Utc>) {
            self.completions.entry(user.to_string()).or_default().push(at);
        }
    }

    impl StatsStore for MemoryStore {
        fn completion_timestamps(&self, user: &str) -> Result<Vec<DateTime<Utc>>> {
            if self.fail_timestamps {
                return Err(Error::OperationFailed("store offline".to_string()));
            }
            Ok(self.completions.get(user).cloned().unwrap_or_default())
        }

        fn get_or_create_user_stats(&mut self, user: &str) -> Result<UserStats> {
            if let Some(stats) = self.stats.get(user) {
                return Ok(*stats);
            }
            self.creates += 1;
            self.stats.insert(user.to_string(), UserStats::default());
            Ok(UserStats::default())
        }

        fn apply_stats_update(&mut self, user: &str, update: &StatsUpdate) -> Result<()> {
            self.stats.entry(user.to_string()).or_default().apply(update);
            Ok(())
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, d, 18, 0, 0).unwrap()
    }

    #[test]
    fn first_completion_creates_stats_once() {
        let mut store = MemoryStore::default();
        let accountant = CompletionAccountant::default();

        store.complete("alice", day(1));
        let stats = accountant.on_task_completed(&mut store, "alice", 10).expect("account");

        assert_eq!(store.creates, 1);
        assert_eq!(
            stats,
            UserStats {
                total_points: 10,
                current_streak: 1,
                best_streak: 1,
                tasks_completed: 1,
            }
        );
    }

    #[test]
    fn consecutive_days_accumulate() {
        let mut store = MemoryStore::default();
        let accountant = CompletionAccountant::default();

        let mut last = UserStats::default();
        for (d, priority) in [(1, Priority::Low), (2, Priority::High), (3, Priority::Urgent)] {
            store.complete("alice", day(d));
            last = accountant
                .on_task_completed(&mut store, "alice", points_for(priority))
                .expect("account");
        }

        assert_eq!(last.total_points, 45);
        assert_eq!(last.current_streak, 3);
        assert_eq!(last.best_streak, 3);
        assert_eq!(last.tasks_completed, 3);
        assert_eq!(store.creates, 1);
    }

    #[test]
    fn every_call_keeps_invariants() {
        let mut store = MemoryStore::default();
        let accountant = CompletionAccountant::default();

        let mut before = UserStats::default();
        for (d, points) in [(1, 5), (2, 10), (3, 15), (5, 25), (5, 10), (6, 5)] {
            store.complete("bob", day(d));
            let after = accountant.on_task_completed(&mut store, "bob", points).expect("account");
            assert!(after.best_streak >= after.current_streak);
            assert_eq!(after.tasks_completed, before.tasks_completed + 1);
            assert_eq!(after.total_points, before.total_points + u64::from(points));
            before = after;
        }

        assert_eq!(before.current_streak, 2);
        assert_eq!(before.best_streak, 3);
    }

    #[test]
    fn best_streak_survives_a_break() {
        let mut store = MemoryStore::default();
        let accountant = CompletionAccountant::default();

        for d in [1, 2, 3] {
            store.complete("carol", day(d));
            accountant.on_task_completed(&mut store, "carol", 10).expect("account");
        }
        store.complete("carol", day(10));
        let stats = accountant.on_task_completed(&mut store, "carol", 10).expect("account");

        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.best_streak, 3);
    }

    #[test]
    fn users_are_accounted_separately() {
        let mut store = MemoryStore::default();
        let accountant = CompletionAccountant::default();

        store.complete("alice", day(1));
        store.complete("alice", day(2));
        store.complete("bob", day(2));
        accountant.on_task_completed(&mut store, "alice", 10).expect("alice");
        let bob = accountant.on_task_completed(&mut store, "bob", 25).expect("bob");

        assert_eq!(bob.total_points, 25);
        assert_eq!(bob.current_streak, 1);
        assert_eq!(store.stats["alice"].current_streak, 2);
    }

    #[test]
    fn store_errors_propagate_without_update() {
        let mut store = MemoryStore {
            fail_timestamps: true,
            ..MemoryStore::default()
        };
        let accountant = CompletionAccountant::default();

        let err = accountant
            .on_task_completed(&mut store, "dave", 10)
            .expect_err("should fail");
        assert!(matches!(err, Error::OperationFailed(_)));
        assert_eq!(store.stats["dave"], UserStats::default());
    }
}
