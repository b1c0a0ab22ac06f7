//! Per-hour play budget tracking for `maxPlaysPerHour` (§4.6 step 5).
//!
//! Owned by whatever holds `PlayerState` (the orchestrator); the resolver
//! only reads it.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    hour: i64,
    count: u32,
}

fn epoch_hour(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(3600)
}

/// Tracks how many times each `schedule_id` has played within the current
/// hour bucket. Counters reset automatically on the first observation
/// after an hour boundary crossing.
#[derive(Debug, Clone, Default)]
pub struct PlayCounter {
    buckets: HashMap<u64, Bucket>,
}

impl PlayCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plays still available for `schedule_id` in the bucket containing
    /// `now`. `max_plays_per_hour == 0` means unthrottled.
    pub fn remaining(&self, schedule_id: u64, now: DateTime<Utc>, max_plays_per_hour: u32) -> u32 {
        if max_plays_per_hour == 0 {
            return u32::MAX;
        }
        let hour = epoch_hour(now);
        let played = self
            .buckets
            .get(&schedule_id)
            .filter(|b| b.hour == hour)
            .map_or(0, |b| b.count);
        max_plays_per_hour.saturating_sub(played)
    }

    pub fn has_budget(&self, schedule_id: u64, now: DateTime<Utc>, max_plays_per_hour: u32) -> bool {
        self.remaining(schedule_id, now, max_plays_per_hour) > 0
    }

    /// Records one play of `schedule_id` at `now`, rolling the bucket over
    /// if `now` has crossed into a new hour since the last recorded play.
    pub fn record_play(&mut self, schedule_id: u64, now: DateTime<Utc>) {
        let hour = epoch_hour(now);
        let bucket = self.buckets.entry(schedule_id).or_insert(Bucket { hour, count: 0 });
        if bucket.hour != hour {
            bucket.hour = hour;
            bucket.count = 0;
        }
        bucket.count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn zero_max_is_unthrottled() {
        let counter = PlayCounter::new();
        assert!(counter.has_budget(1, at(10, 0), 0));
    }

    #[test]
    fn budget_exhausts_then_resets_on_new_hour() {
        let mut counter = PlayCounter::new();
        for _ in 0..3 {
            counter.record_play(1, at(10, 15));
        }
        assert!(!counter.has_budget(1, at(10, 45), 3));
        assert!(counter.has_budget(1, at(11, 0), 3));
    }
}
