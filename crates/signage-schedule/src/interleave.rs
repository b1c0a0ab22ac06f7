//! Interrupt / share-of-voice interleaving (§4.6 step 7, tie-break rule
//! in §9).

use crate::candidate::Candidate;
use signage_model::ScheduledLayout;

const HOUR_SECONDS: u64 = 3600;

/// Builds the hour's play sequence from the max-priority survivors,
/// already partitioned into normals (`share_of_voice == 0`) and
/// interrupts (`share_of_voice > 0`), both in their step-8 document
/// order.
pub fn interleave(normals: &[Candidate], interrupts: &[Candidate]) -> Vec<ScheduledLayout> {
    let required: Vec<(ScheduledLayout, u32)> = interrupts
        .iter()
        .map(|c| (c.layout.clone(), required_plays(&c.layout)))
        .collect();

    let interrupt_seconds: u64 = required
        .iter()
        .map(|(layout, plays)| u64::from(*plays) * u64::from(layout.duration_secs))
        .sum();
    let remaining_budget = HOUR_SECONDS.saturating_sub(interrupt_seconds);

    let n_normals = normals.len() as u64;
    let normal_plays: Vec<(ScheduledLayout, u32)> = normals
        .iter()
        .map(|c| {
            let duration = u64::from(c.layout.duration_secs.max(1));
            let plays = if n_normals == 0 {
                0
            } else {
                remaining_budget / (duration * n_normals)
            };
            (c.layout.clone(), u32::try_from(plays).unwrap_or(u32::MAX))
        })
        .collect();

    let normals_flat = round_robin(&normal_plays);
    let interrupts_flat = round_robin(&required);
    weave(&normals_flat, &interrupts_flat)
}

/// `ceil((share_of_voice / 100) * 3600 / duration_secs)`.
fn required_plays(interrupt: &ScheduledLayout) -> u32 {
    let duration = f64::from(interrupt.duration_secs.max(1));
    let share = f64::from(interrupt.share_of_voice) / 100.0;
    ((share * HOUR_SECONDS as f64) / duration).ceil() as u32
}

/// Expands `(layout, count)` pairs into a flat sequence, taking one play
/// from each layout per round so multiple layouts of the same class are
/// spread across the sequence rather than run back to back.
fn round_robin(counts: &[(ScheduledLayout, u32)]) -> Vec<ScheduledLayout> {
    let max_count = counts.iter().map(|(_, c)| *c).max().unwrap_or(0);
    let mut out = Vec::new();
    for round in 0..max_count {
        for (layout, count) in counts {
            if round < *count {
                out.push(layout.clone());
            }
        }
    }
    out
}

/// Weaves interrupts into the normal sequence per the §9 tie-break rule:
/// advance the interrupt index whenever `step_index % stride ==
/// stride - 1`; normals fill every other position.
fn weave(normals: &[ScheduledLayout], interrupts: &[ScheduledLayout]) -> Vec<ScheduledLayout> {
    let total_len = normals.len() + interrupts.len();
    if total_len == 0 {
        return Vec::new();
    }
    if interrupts.is_empty() {
        return normals.to_vec();
    }

    let stride = (total_len / interrupts.len()).max(1);
    let mut out = Vec::with_capacity(total_len);
    let mut ni = 0;
    let mut ii = 0;

    for step_index in 0..total_len {
        let take_interrupt =
            ii < interrupts.len() && (step_index % stride == stride - 1 || ni >= normals.len());
        if take_interrupt {
            out.push(interrupts[ii].clone());
            ii += 1;
        } else if ni < normals.len() {
            out.push(normals[ni].clone());
            ni += 1;
        }
    }
    // Integer stride rounding can strand a trailing interrupt or two;
    // §4.6 step 7 says required counts are issued even if the hour
    // overruns, so they're appended rather than dropped.
    out.extend_from_slice(&interrupts[ii..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use signage_model::FileId;

    fn layout(id: u64, sov: u32, duration_secs: u32) -> Candidate {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let sl = ScheduledLayout {
            file_id: FileId::layout(id),
            from: now,
            to: now,
            priority: 1,
            schedule_id: id,
            campaign_id: None,
            criteria: Vec::new(),
            is_geo_aware: false,
            geo: None,
            sync_event: None,
            share_of_voice: sov,
            max_plays_per_hour: 0,
            recurrence: None,
            duration_secs,
        };
        Candidate {
            layout: sl,
            group_priority: 1,
            group_schedule_id: id,
        }
    }

    #[test]
    fn s4_interrupt_scenario_matches_expected_counts_and_spacing() {
        let normals = vec![layout(20, 0, 60)];
        let interrupts = vec![layout(10, 10, 60)];

        let sequence = interleave(&normals, &interrupts);
        assert_eq!(sequence.len(), 60);

        let interrupt_positions: Vec<usize> = sequence
            .iter()
            .enumerate()
            .filter(|(_, l)| l.file_id.id == 10)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(interrupt_positions.len(), 6);

        let gaps: Vec<usize> = interrupt_positions.windows(2).map(|w| w[1] - w[0]).collect();
        for gap in gaps {
            assert_eq!(gap, 10);
        }
    }

    #[test]
    fn no_interrupts_returns_normals_unchanged() {
        let normals = vec![layout(1, 0, 30), layout(2, 0, 30)];
        let sequence = interleave(&normals, &[]);
        assert!(sequence.iter().all(|l| l.share_of_voice == 0));
    }
}
