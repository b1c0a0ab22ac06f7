//! Flattening `ScheduleModel` into a uniform candidate list that still
//! remembers which campaign (if any) a layout came from, for the final
//! "preserve document order within a campaign" ordering rule (§4.6 step 8).

use signage_model::{Campaign, OverlayLayout, ScheduleModel, ScheduledLayout};

/// A layout plus the group it sorts and groups with: its own campaign (if
/// a member) or itself (if standalone).
#[derive(Debug, Clone)]
pub struct Candidate {
    pub layout: ScheduledLayout,
    pub group_priority: i32,
    pub group_schedule_id: u64,
}

pub fn candidates(model: &ScheduleModel) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = model
        .layouts
        .iter()
        .map(|layout| Candidate {
            layout: layout.clone(),
            group_priority: layout.priority,
            group_schedule_id: layout.schedule_id,
        })
        .collect();

    for campaign in &model.campaigns {
        out.extend(campaign_candidates(campaign));
    }

    out
}

fn campaign_candidates(campaign: &Campaign) -> impl Iterator<Item = Candidate> + '_ {
    campaign.layouts.iter().map(move |layout| Candidate {
        layout: layout.clone(),
        group_priority: campaign.priority,
        group_schedule_id: campaign.schedule_id,
    })
}

/// Overlays have no campaign grouping concept; each sorts on its own.
pub fn overlay_candidates(model: &ScheduleModel) -> Vec<OverlayLayout> {
    model.overlays.clone()
}
