//! `PlayerState` (§3): mutated only by the Orchestrator task.

use chrono::{DateTime, Utc};
use signage_model::FileId;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Process-wide player state. Every other task communicates changes to
/// this via events rather than writing to it directly (§5 "Shared state").
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub current_layout: Option<FileId>,
    /// Layout file to the still-missing dependencies blocking it.
    pub pending_layouts: HashMap<FileId, HashSet<FileId>>,
    /// Single-collection re-entrancy guard.
    pub collecting: bool,
    pub collection_interval: Duration,
    /// Per-hour tally for share-of-voice fairness, reset at each hour
    /// boundary. Keyed by the interrupt layout's `FileId`.
    pub committed_interrupt_seconds: HashMap<FileId, u32>,
    pub last_hour_bucket: i64,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            current_layout: None,
            pending_layouts: HashMap::new(),
            collecting: false,
            collection_interval: Duration::from_secs(900),
            committed_interrupt_seconds: HashMap::new(),
            last_hour_bucket: 0,
        }
    }
}

impl PlayerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rolls `committed_interrupt_seconds` over if `now` has crossed into a
    /// new hour bucket since the last observation.
    pub fn roll_hour_bucket(&mut self, now: DateTime<Utc>) {
        let hour = now.timestamp().div_euclid(3600);
        if hour != self.last_hour_bucket {
            self.last_hour_bucket = hour;
            self.committed_interrupt_seconds.clear();
        }
    }

    /// Records that `file_id`'s missing dependency `dep` has resolved.
    /// Returns `true` once the layout's missing set has become empty.
    pub fn resolve_dependency(&mut self, file_id: &FileId, dep: &FileId) -> bool {
        let Some(missing) = self.pending_layouts.get_mut(file_id) else {
            return false;
        };
        missing.remove(dep);
        missing.is_empty()
    }

    pub fn take_ready(&mut self, file_id: &FileId) {
        self.pending_layouts.remove(file_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn hour_bucket_rollover_clears_interrupt_tally() {
        let mut state = PlayerState::new();
        state.committed_interrupt_seconds.insert(FileId::layout(1), 30);
        state.last_hour_bucket = 100;

        let still_same_hour = Utc.timestamp_opt(100 * 3600 + 10, 0).unwrap();
        state.roll_hour_bucket(still_same_hour);
        assert_eq!(state.committed_interrupt_seconds.len(), 1);

        let next_hour = Utc.timestamp_opt(101 * 3600, 0).unwrap();
        state.roll_hour_bucket(next_hour);
        assert!(state.committed_interrupt_seconds.is_empty());
    }

    #[test]
    fn resolve_dependency_reports_when_missing_set_empties() {
        let mut state = PlayerState::new();
        let layout = FileId::layout(78);
        let media = FileId::media(9);
        state.pending_layouts.insert(layout.clone(), HashSet::from([media.clone()]));

        assert!(state.resolve_dependency(&layout, &media));
        assert!(!state.resolve_dependency(&layout, &media));
    }
}
