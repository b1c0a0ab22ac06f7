//! Entry point: `resolve(model, now, env, counter) -> ResolveOutput`, §4.6.

use crate::candidate::{candidates, overlay_candidates, Candidate};
use crate::env::ResolveEnv;
use crate::filterable::Filterable;
use crate::filters::{criteria_filter, geo_filter, max_plays_filter, priority_filter, recurrence_filter, time_filter};
use crate::interleave::interleave;
use crate::play_counter::PlayCounter;
use chrono::{DateTime, Utc};
use signage_model::{OverlayLayout, ScheduleModel, ScheduledLayout};
use std::cmp::Reverse;

#[derive(Debug, Clone)]
pub struct ResolveOutput {
    pub main_layouts: Vec<ScheduledLayout>,
    pub overlays: Vec<OverlayLayout>,
}

pub fn resolve(model: &ScheduleModel, now: DateTime<Utc>, env: &ResolveEnv, counter: &PlayCounter) -> ResolveOutput {
    ResolveOutput {
        main_layouts: resolve_main(model, now, env, counter),
        overlays: resolve_overlays(model, now, env),
    }
}

fn resolve_main(model: &ScheduleModel, now: DateTime<Utc>, env: &ResolveEnv, counter: &PlayCounter) -> Vec<ScheduledLayout> {
    let survivors = run_common_filters(candidates(model), now, env);
    let survivors = max_plays_filter(survivors, now, counter);
    let survivors = priority_filter(survivors);

    if survivors.is_empty() {
        return vec![default_layout(model)];
    }

    let ordered = group_sort(survivors);
    let (normals, interrupts): (Vec<Candidate>, Vec<Candidate>) =
        ordered.into_iter().partition(|c| !c.layout.is_interrupt());

    if interrupts.is_empty() {
        normals.into_iter().map(|c| c.layout).collect()
    } else {
        interleave(&normals, &interrupts)
    }
}

fn resolve_overlays(model: &ScheduleModel, now: DateTime<Utc>, env: &ResolveEnv) -> Vec<OverlayLayout> {
    let mut survivors = run_common_filters(overlay_candidates(model), now, env);
    survivors = priority_filter(survivors);
    survivors.sort_by_key(|o| Reverse(o.priority));
    survivors
}

fn run_common_filters<T: Filterable>(items: Vec<T>, now: DateTime<Utc>, env: &ResolveEnv) -> Vec<T> {
    let items = time_filter(items, now);
    let items = recurrence_filter(items, now);
    let items = geo_filter(items, env.location);
    criteria_filter(items, env)
}

/// §4.6 step 8: preserve document order within a group, stable-sort
/// groups by `(-priority, schedule_id)`.
fn group_sort(mut items: Vec<Candidate>) -> Vec<Candidate> {
    items.sort_by_key(|c| (Reverse(c.group_priority), c.group_schedule_id));
    items
}

fn default_layout(model: &ScheduleModel) -> ScheduledLayout {
    ScheduledLayout {
        file_id: model.default_layout_file.clone(),
        from: chrono::DateTime::<Utc>::MIN_UTC,
        to: chrono::DateTime::<Utc>::MAX_UTC,
        priority: 0,
        schedule_id: 0,
        campaign_id: None,
        criteria: Vec::new(),
        is_geo_aware: false,
        geo: None,
        sync_event: None,
        share_of_voice: 0,
        max_plays_per_hour: 0,
        recurrence: None,
        duration_secs: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use signage_model::{Campaign, FileId, ScheduleModel};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap()
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap(),
        )
    }

    fn standalone(id: u64, priority: i32, schedule_id: u64) -> ScheduledLayout {
        let (from, to) = window();
        ScheduledLayout {
            file_id: FileId::layout(id),
            from,
            to,
            priority,
            schedule_id,
            campaign_id: None,
            criteria: Vec::new(),
            is_geo_aware: false,
            geo: None,
            sync_event: None,
            share_of_voice: 0,
            max_plays_per_hour: 0,
            recurrence: None,
            duration_secs: 20,
        }
    }

    /// S3: a higher-priority campaign beats lower-priority standalone
    /// layouts; campaign members come out in document order.
    #[test]
    fn campaign_priority_beats_standalone_layouts() {
        let (from, to) = window();
        let campaign = Campaign {
            id: 1,
            priority: 5,
            from,
            to,
            schedule_id: 900,
            layouts: Vec::new(),
            criteria: Vec::new(),
            is_geo_aware: false,
            geo: None,
        };
        let members = vec![
            campaign.member(FileId::layout(100), 100, 0, 0, None, 20),
            campaign.member(FileId::layout(101), 101, 0, 0, None, 20),
            campaign.member(FileId::layout(102), 102, 0, 0, None, 20),
        ];
        let mut campaign = campaign;
        campaign.layouts = members;

        let mut model = ScheduleModel::empty(FileId::layout(1));
        model.layouts.push(standalone(200, 1, 200));
        model.campaigns.push(campaign);

        let env = ResolveEnv::new();
        let counter = PlayCounter::new();
        let out = resolve_main(&model, now(), &env, &counter);

        let ids: Vec<u64> = out.iter().map(|l| l.file_id.id).collect();
        assert_eq!(ids, vec![100, 101, 102]);
    }

    /// S4: one interrupt at 10% share-of-voice over 60s duration normals
    /// produces a 60-length sequence with exactly 6 interrupt occurrences.
    #[test]
    fn interrupt_scenario_produces_expected_sequence_length() {
        let mut model = ScheduleModel::empty(FileId::layout(1));
        model.layouts.push(standalone(20, 1, 20).tap_duration(60));

        let mut interrupt = standalone(10, 1, 10).tap_duration(60);
        interrupt.share_of_voice = 10;
        model.layouts.push(interrupt);

        let env = ResolveEnv::new();
        let counter = PlayCounter::new();
        let out = resolve_main(&model, now(), &env, &counter);

        assert_eq!(out.len(), 60);
        assert_eq!(out.iter().filter(|l| l.is_interrupt()).count(), 6);
    }

    trait TapDuration {
        fn tap_duration(self, duration_secs: u32) -> Self;
    }

    impl TapDuration for ScheduledLayout {
        fn tap_duration(mut self, duration_secs: u32) -> Self {
            self.duration_secs = duration_secs;
            self
        }
    }

    #[test]
    fn empty_survivors_fall_back_to_default_layout() {
        let model = ScheduleModel::empty(FileId::layout(42));
        let env = ResolveEnv::new();
        let counter = PlayCounter::new();
        let out = resolve_main(&model, now(), &env, &counter);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].file_id, FileId::layout(42));
    }
}
