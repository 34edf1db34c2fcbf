//! Second pass for pairings the search left short.
//!
//! Deficits are retried one session at a time. A slot that keeps the same-day repeat rule is
//! preferred; only when none is left is the rule dropped. Teacher, division and room occupancy,
//! breaks and lab pairing always apply. Placements from the search are never moved.

use crate::data::{DivisionId, SubjectId, UnmetRequirement};
use crate::occupancy::{Occupancy, Placement};
use crate::requirements::Demand;
use crate::search::{RepeatRule, SlotRules};
use itertools::Itertools;
use log::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct RelaxedFill {
    pub placements: Vec<Placement>,
    /// Pairings still short after this pass.
    pub unmet: Vec<UnmetRequirement>,
}

pub fn fill_deficits(
    rules: &SlotRules<'_>,
    demands: &[Demand],
    placed: &[Placement],
    occupancy: &mut Occupancy,
) -> RelaxedFill {
    let mut counts = placed
        .iter()
        .map(|p| (p.division_id, p.subject_id))
        .counts();
    let mut fill = RelaxedFill::default();

    for demand in demands {
        let key: (DivisionId, SubjectId) = (demand.session.division_id, demand.session.subject_id);
        let mut got = counts.get(&key).copied().unwrap_or(0) as u32;

        while got < demand.required {
            let current: &Occupancy = occupancy;
            let first_fit = |repeat: RepeatRule| {
                rules
                    .config
                    .slots()
                    .find_map(|slot| rules.place(&demand.session, slot, current, repeat))
            };
            let next = first_fit(RepeatRule::Enforce).or_else(|| first_fit(RepeatRule::Ignore));
            let Some(placement) = next else {
                break;
            };
            debug!(
                "Relaxed placement: division {} subject {} at day {} period {}",
                key.0, key.1, placement.day, placement.period
            );
            occupancy.apply(&placement);
            fill.placements.push(placement);
            got += 1;
        }
        counts.insert(key, got as usize);

        if got < demand.required {
            let unmet = UnmetRequirement {
                division_id: key.0,
                subject_id: key.1,
                required: demand.required,
                placed: got,
            };
            warn!("Unresolved deficit: {}", unmet);
            fill.unmet.push(unmet);
        }
    }

    fill
}
