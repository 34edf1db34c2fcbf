use crate::calendar::TimeConfig;
use crate::data::{
    ClassId, DivisionId, DomainSnapshot, GenerateRequest, GenerationSummary, RoomId, SubjectId,
    Timetable, TimetableEntry, TimetableId,
};
use crate::error::GenerateError;
use crate::occupancy::Occupancy;
use crate::relaxed::fill_deficits;
use crate::requirements::build_requirements;
use crate::rooms::{RoomAllocator, RoomPolicy, resolve_fixed_room};
use crate::search::{BacktrackingSearch, SearchLimits, SearchStatus, SlotRules};
use itertools::Itertools;
use log::{info, trace, warn};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Everything one generation call produces, ready to be persisted in one write.
#[derive(Debug, Clone)]
pub struct Generation {
    pub timetables: Vec<Timetable>,
    pub entries: Vec<TimetableEntry>,
    /// A fixed room picked for the class during this call, to be written back onto it.
    pub fixed_room_assignment: Option<(ClassId, RoomId)>,
    pub summary: GenerationSummary,
}

/// Generates one timetable per division of `request.class_id`.
///
/// Timetable ids are handed out sequentially from `first_timetable_id` in division order.
/// Shortfalls are not errors: they are reported in [`GenerationSummary::unmet_requirements`].
pub fn generate(
    snapshot: &DomainSnapshot,
    request: &GenerateRequest,
    first_timetable_id: TimetableId,
    limits: SearchLimits,
) -> Result<Generation, GenerateError> {
    let start_time = Instant::now();
    let class = snapshot
        .class(request.class_id)
        .ok_or(GenerateError::ClassNotFound(request.class_id))?;

    // lookups
    let divisions: Vec<_> = snapshot
        .divisions
        .iter()
        .filter(|d| d.class_id == class.id)
        .sorted_by_key(|d| (d.index, d.id))
        .cloned()
        .collect();
    let subjects: Vec<_> = snapshot
        .subjects
        .iter()
        .filter(|s| s.class_id == class.id)
        .cloned()
        .collect();
    let division_ids: HashSet<DivisionId> = divisions.iter().map(|d| d.id).collect();
    let assignments: Vec<_> = snapshot
        .assignments
        .iter()
        .filter(|a| division_ids.contains(&a.division_id))
        .cloned()
        .collect();
    let config = TimeConfig::resolve(&snapshot.time_configs, class.id, request.department_id);
    trace!("Resolved time config for class {}: {:?}", class.id, config);

    let timetables: Vec<Timetable> = divisions
        .iter()
        .zip(first_timetable_id..)
        .map(|(d, id)| Timetable {
            id,
            name: format!("{} - {}", request.name, d.name),
            class_id: class.id,
            department_id: request.department_id,
            division_id: d.id,
            mode: request.mode,
            published: false,
        })
        .collect();
    let timetable_of: HashMap<DivisionId, TimetableId> =
        timetables.iter().map(|t| (t.division_id, t.id)).collect();

    let (fixed_room, newly_fixed) = resolve_fixed_room(request.mode, class, &snapshot.rooms);

    let plan = build_requirements(&divisions, &subjects, &assignments, &config);
    for skipped in &plan.skipped {
        info!("Skipping: {}", skipped);
    }

    info!(
        "Setting up search with {} divisions, {} required sessions and {} slots...",
        divisions.len(),
        plan.sessions.len(),
        config.working_days * config.periods_per_day
    );

    let repeatable: HashSet<SubjectId> = subjects
        .iter()
        .filter(|s| s.can_be_twice_in_day)
        .map(|s| s.id)
        .collect();
    let rules = SlotRules {
        config: &config,
        rooms: RoomAllocator::new(&snapshot.rooms, RoomPolicy::default()),
        fixed_room,
        repeatable,
    };

    let mut occupancy = Occupancy::new();
    let outcome = BacktrackingSearch::new(&rules, limits).run(&plan.sessions, &mut occupancy);
    match outcome.status {
        SearchStatus::Solved => info!(
            "Search solved in {:.2?} ({} steps, {} backtracks)",
            start_time.elapsed(),
            outcome.steps,
            outcome.backtracks
        ),
        SearchStatus::Exhausted => warn!(
            "Search exhausted after {} steps; placed {} of {} sessions, {} set aside",
            outcome.steps,
            outcome.placements.len(),
            plan.sessions.len(),
            outcome.unplaced.len()
        ),
        SearchStatus::BudgetExceeded => warn!(
            "Search stopped at the {} step budget; kept {} of {} sessions",
            limits.max_steps,
            outcome.placements.len(),
            plan.sessions.len()
        ),
    }

    let demands = plan.demands();
    let fill = fill_deficits(&rules, &demands, &outcome.placements, &mut occupancy);

    let mut entries = Vec::new();
    for placement in outcome.placements.iter().chain(&fill.placements) {
        if let Some(&timetable_id) = timetable_of.get(&placement.division_id) {
            entries.extend(placement.entries(timetable_id));
        }
    }
    let sessions_placed = outcome.placements.len() + fill.placements.len();

    info!(
        "Generated {} entries for {} timetables in {:.2?}",
        entries.len(),
        timetables.len(),
        start_time.elapsed()
    );

    let summary = GenerationSummary {
        success: true,
        timetable_ids: timetables.iter().map(|t| t.id).collect(),
        entries_placed: entries.len(),
        sessions_required: plan.sessions.len(),
        sessions_placed,
        search_solved: outcome.status == SearchStatus::Solved,
        unmet_requirements: fill.unmet,
        skipped_pairings: plan.skipped,
        fixed_room_id: fixed_room,
    };

    Ok(Generation {
        timetables,
        entries,
        fixed_room_assignment: fixed_room.filter(|_| newly_fixed).map(|r| (class.id, r)),
        summary,
    })
}
