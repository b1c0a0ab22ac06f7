//! Steps 1-6 of §4.6, generic over anything implementing [`Filterable`].

use crate::candidate::Candidate;
use crate::env::ResolveEnv;
use crate::filterable::Filterable;
use crate::play_counter::PlayCounter;
use chrono::{DateTime, Utc};
use signage_model::CriteriaEnv;

pub fn time_filter<T: Filterable>(items: Vec<T>, now: DateTime<Utc>) -> Vec<T> {
    items
        .into_iter()
        .filter(|item| {
            let (from, to) = item.window();
            from <= now && now <= to
        })
        .collect()
}

pub fn recurrence_filter<T: Filterable>(items: Vec<T>, now: DateTime<Utc>) -> Vec<T> {
    items
        .into_iter()
        .filter(|item| match item.recurrence() {
            Some(day_part) => day_part.is_active(now),
            None => true,
        })
        .collect()
}

pub fn geo_filter<T: Filterable>(items: Vec<T>, location: Option<(f64, f64)>) -> Vec<T> {
    items
        .into_iter()
        .filter(|item| {
            if !item.is_geo_aware() {
                return true;
            }
            match (item.geo(), location) {
                (Some(fence), Some((lat, lon))) => fence.contains(lat, lon),
                _ => false,
            }
        })
        .collect()
}

pub fn criteria_filter<T: Filterable>(items: Vec<T>, env: &ResolveEnv) -> Vec<T> {
    let criteria_env = CriteriaEnv {
        display_properties: &env.display_properties,
        measurements: &env.measurements,
    };
    items
        .into_iter()
        .filter(|item| item.criteria().iter().all(|c| c.evaluate(&criteria_env)))
        .collect()
}

/// Keeps only items whose priority equals the maximum over the input.
/// Empty input yields empty output (the caller decides what "no
/// survivors" means for its own pipeline).
pub fn priority_filter<T: Filterable>(items: Vec<T>) -> Vec<T> {
    let Some(max_priority) = items.iter().map(Filterable::priority).max() else {
        return items;
    };
    items.into_iter().filter(|item| item.priority() == max_priority).collect()
}

/// §4.6 step 5. Only main layouts throttle; overlays never call this
/// (§9's "overlays don't participate in maxPlaysPerHour" resolution).
pub fn max_plays_filter(items: Vec<Candidate>, now: DateTime<Utc>, counter: &PlayCounter) -> Vec<Candidate> {
    items
        .into_iter()
        .filter(|c| {
            let max = c.layout.max_plays_per_hour;
            max == 0 || counter.has_budget(c.layout.schedule_id, now, max)
        })
        .collect()
}
