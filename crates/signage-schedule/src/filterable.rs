//! Shared accessors so steps 1-6 of §4.6 can run identically over main
//! layouts and overlays, which differ only in the fields that matter past
//! step 6 (share-of-voice vs. duration).

use chrono::{DateTime, Utc};
use signage_model::{Criterion, DayPart, GeoFence, OverlayLayout, ScheduledLayout};

pub trait Filterable {
    fn window(&self) -> (DateTime<Utc>, DateTime<Utc>);
    fn recurrence(&self) -> Option<&DayPart>;
    fn is_geo_aware(&self) -> bool;
    fn geo(&self) -> Option<&GeoFence>;
    fn criteria(&self) -> &[Criterion];
    fn priority(&self) -> i32;
}

impl Filterable for ScheduledLayout {
    fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.from, self.to)
    }

    fn recurrence(&self) -> Option<&DayPart> {
        self.recurrence.as_ref()
    }

    fn is_geo_aware(&self) -> bool {
        self.is_geo_aware
    }

    fn geo(&self) -> Option<&GeoFence> {
        self.geo.as_ref()
    }

    fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

impl Filterable for OverlayLayout {
    fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.from, self.to)
    }

    fn recurrence(&self) -> Option<&DayPart> {
        self.recurrence.as_ref()
    }

    fn is_geo_aware(&self) -> bool {
        self.is_geo_aware
    }

    fn geo(&self) -> Option<&GeoFence> {
        self.geo.as_ref()
    }

    fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

impl Filterable for crate::candidate::Candidate {
    fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        self.layout.window()
    }

    fn recurrence(&self) -> Option<&DayPart> {
        self.layout.recurrence()
    }

    fn is_geo_aware(&self) -> bool {
        self.layout.is_geo_aware()
    }

    fn geo(&self) -> Option<&GeoFence> {
        self.layout.geo()
    }

    fn criteria(&self) -> &[Criterion] {
        self.layout.criteria()
    }

    fn priority(&self) -> i32 {
        self.group_priority
    }
}
