//! Consecutive-day streak calculation.
//!
//! A streak counts strictly consecutive calendar days ending at the most
//! recent completion date, which is not necessarily today. Every timestamp
//! is converted to a calendar date using one fixed UTC offset.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakCalculator {
    offset: FixedOffset,
}

impl Default for StreakCalculator {
    fn default() -> Self {
        Self::utc()
    }
}

impl StreakCalculator {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Calendar date of an instant under this calculator's offset.
    pub fn calendar_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// Length of the run of consecutive dates ending at the latest completion.
    ///
    /// Several completions on one date count once. The scan stops at the first
    /// gap and never resumes past it.
    pub fn current_streak(&self, timestamps: &[DateTime<Utc>]) -> u32 {
        let mut dates: Vec<NaiveDate> = timestamps
            .iter()
            .map(|timestamp| self.calendar_date(*timestamp))
            .collect();
        dates.sort_unstable_by(|left, right| right.cmp(left));
        dates.dedup();

        let Some((&latest, earlier)) = dates.split_first() else {
            return 0;
        };

        let mut streak = 1;
        let mut anchor = latest;
        for &date in earlier {
            match anchor.pred_opt() {
                Some(previous) if previous == date => {
                    streak += 1;
                    anchor = date;
                }
                _ => break,
            }
        }
        streak
    }
}

/// Streak under the UTC calendar.
pub fn current_streak(timestamps: &[DateTime<Utc>]) -> u32 {
    StreakCalculator::utc().current_streak(timestamps)
}
