//! The typed schedule document: layouts, campaigns, overlays, actions, commands.

use crate::criteria::Criterion;
use crate::dayparting::DayPart;
use crate::file_id::FileId;
use crate::geo::GeoFence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A layout (standalone or campaign member) as scheduled by the CMS.
///
/// By the time this reaches [`crate::schedule::ScheduleModel`], a
/// campaign-member layout that didn't override `from`/`to`/`priority` has
/// already inherited its campaign's values — that inheritance is a
/// construction-time concern of whatever builds the model from the CMS
/// envelope, not of the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledLayout {
    pub file_id: FileId,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub priority: i32,
    pub schedule_id: u64,
    pub campaign_id: Option<u64>,
    pub criteria: Vec<Criterion>,
    pub is_geo_aware: bool,
    pub geo: Option<GeoFence>,
    pub sync_event: Option<String>,
    /// `0` for a normal layout; `1..=100` marks it an interrupt with that
    /// share-of-voice percentage.
    pub share_of_voice: u32,
    /// `0` means unthrottled.
    pub max_plays_per_hour: u32,
    pub recurrence: Option<DayPart>,
    /// Playout duration used by the interrupt/share-of-voice interleaving
    /// algorithm (§4.6 step 7), in seconds.
    pub duration_secs: u32,
}

impl ScheduledLayout {
    pub fn is_interrupt(&self) -> bool {
        self.share_of_voice > 0
    }
}

/// A campaign: a priority-ordered group of layouts sharing a play window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: u64,
    pub priority: i32,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub schedule_id: u64,
    pub layouts: Vec<ScheduledLayout>,
    pub criteria: Vec<Criterion>,
    pub is_geo_aware: bool,
    pub geo: Option<GeoFence>,
}

impl Campaign {
    /// Build a `ScheduledLayout` for `file_id` that inherits this
    /// campaign's `from`/`to`/`priority`/`criteria`/`geo` unless
    /// `overrides` supplies its own.
    #[allow(clippy::too_many_arguments)]
    pub fn member(
        &self,
        file_id: FileId,
        schedule_id: u64,
        share_of_voice: u32,
        max_plays_per_hour: u32,
        recurrence: Option<DayPart>,
        duration_secs: u32,
    ) -> ScheduledLayout {
        ScheduledLayout {
            file_id,
            from: self.from,
            to: self.to,
            priority: self.priority,
            schedule_id,
            campaign_id: Some(self.id),
            criteria: self.criteria.clone(),
            is_geo_aware: self.is_geo_aware,
            geo: self.geo,
            sync_event: None,
            share_of_voice,
            max_plays_per_hour,
            recurrence,
            duration_secs,
        }
    }
}

/// An overlay layout: rendered above the main layout on its own z-plane.
/// Filtered and ordered like a main layout (§4.6 steps 1-6) but excluded
/// from interrupt interleaving, `maxPlaysPerHour` throttling, and the
/// empty-output default fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayLayout {
    pub file_id: FileId,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub priority: i32,
    pub schedule_id: u64,
    pub criteria: Vec<Criterion>,
    pub is_geo_aware: bool,
    pub geo: Option<GeoFence>,
    pub recurrence: Option<DayPart>,
    /// Maximum duration this overlay may run, in seconds.
    pub duration_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionTarget {
    NavLayout(FileId),
    NavWidget(FileId),
    Command(String),
}

/// A trigger → navigation/command binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub trigger: String,
    pub target: ActionTarget,
}

/// A command pegged to a specific date (collect-now, reboot, etc.).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledCommand {
    pub code: String,
    pub run_at: DateTime<Utc>,
}

/// The full schedule document, as delivered by `Transport::schedule()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleModel {
    pub default_layout_file: FileId,
    pub layouts: Vec<ScheduledLayout>,
    pub campaigns: Vec<Campaign>,
    pub overlays: Vec<OverlayLayout>,
    pub actions: Vec<ActionEvent>,
    pub commands: Vec<ScheduledCommand>,
}

impl ScheduleModel {
    pub fn empty(default_layout_file: FileId) -> Self {
        Self {
            default_layout_file,
            layouts: Vec::new(),
            campaigns: Vec::new(),
            overlays: Vec::new(),
            actions: Vec::new(),
            commands: Vec::new(),
        }
    }
}
