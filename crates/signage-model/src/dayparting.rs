//! Recurring weekly windows ("dayparting"), including midnight-crossing spans.

use chrono::{DateTime, NaiveTime, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

fn weekday_index(w: Weekday) -> u8 {
    w.num_days_from_monday()
}

/// A recurrence rule: active on a set of ISO weekdays, within a daily
/// `[start, end)` window. `end <= start` is a midnight-crossing window
/// (e.g. 22:00-02:00), handled by splitting into two per-day intervals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPart {
    pub days: BTreeSet<chrono::Weekday>,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl DayPart {
    pub fn new(days: impl IntoIterator<Item = Weekday>, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            days: days.into_iter().collect(),
            start,
            end,
        }
    }

    fn crosses_midnight(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `now` falls inside one of this rule's active windows.
    pub fn is_active<Tz: TimeZone>(&self, now: DateTime<Tz>) -> bool {
        let today = now.weekday();
        let time = now.time();

        if !self.crosses_midnight() {
            return self.days.contains(&today) && time >= self.start && time < self.end;
        }

        // Midnight-crossing: split into [start, 24:00) on `today`, and
        // [00:00, end) on the day following a day in `days`.
        let yesterday = prev_weekday(today);
        let active_today_late = self.days.contains(&today) && time >= self.start;
        let active_today_early = self.days.contains(&yesterday) && time < self.end;
        active_today_late || active_today_early
    }

    pub fn midnight_crossing(&self) -> bool {
        self.crosses_midnight()
    }
}

fn prev_weekday(w: Weekday) -> Weekday {
    let idx = weekday_index(w);
    let prev_idx = (idx + 6) % 7;
    Weekday::try_from(prev_idx).unwrap_or(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).single().unwrap()
    }

    #[test]
    fn simple_window_is_active_within_bounds() {
        let dp = DayPart::new(
            [Weekday::Mon],
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        );
        // 2024-01-01 is a Monday.
        assert!(dp.is_active(dt(2024, 1, 1, 10, 0)));
        assert!(!dp.is_active(dt(2024, 1, 1, 8, 0)));
        assert!(!dp.is_active(dt(2024, 1, 2, 10, 0)));
    }

    #[test]
    fn midnight_crossing_window_spans_two_days() {
        let dp = DayPart::new(
            [Weekday::Fri],
            NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
        );
        assert!(dp.midnight_crossing());
        // Friday 23:00 — within [22:00, 24:00) of Friday.
        assert!(dp.is_active(dt(2024, 1, 5, 23, 0)));
        // Saturday 01:00 — within [00:00, 02:00) carried over from Friday.
        assert!(dp.is_active(dt(2024, 1, 6, 1, 0)));
        // Saturday 03:00 — outside both halves.
        assert!(!dp.is_active(dt(2024, 1, 6, 3, 0)));
    }
}
