//! Ordered backtracking over the weekly grid.
//!
//! The search walks the required sessions in order and tries every slot day-major,
//! period-minor. Instead of recursing, it keeps one [`Frame`] per session: the frame remembers
//! the next slot to try and the placement it currently holds, so backtracking is "pop the frame,
//! revert the parent's placement, advance the parent's cursor".
//!
//! A session that no extension of the deepest prefix can place is set aside and the search
//! resumes from the next session, same-day rule still enforced. Consecutive identical sessions
//! only take slots in increasing order, so interchangeable units are not permuted.

use crate::calendar::{Slot, TimeConfig};
use crate::data::{RoomId, SubjectId, SubjectType};
use crate::occupancy::{Occupancy, Placement};
use crate::requirements::RequiredSession;
use crate::rooms::RoomAllocator;
use log::{debug, trace};
use std::collections::HashSet;

pub const DEFAULT_MAX_STEPS: u64 = 2_000_000;

/// Upper bound on the work one search may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Candidate slots examined before the search gives up.
    pub max_steps: u64,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// Whether the same-day repeat rule is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatRule {
    Enforce,
    Ignore,
}

/// The hard constraints a candidate slot must satisfy, plus room resolution.
#[derive(Debug, Clone)]
pub struct SlotRules<'a> {
    pub config: &'a TimeConfig,
    pub rooms: RoomAllocator<'a>,
    /// Class room used for every lecture in school mode.
    pub fixed_room: Option<RoomId>,
    /// Subjects flagged as allowed twice in one day.
    pub repeatable: HashSet<SubjectId>,
}

impl<'a> SlotRules<'a> {
    fn repeat_allowed(&self, subject: SubjectId) -> bool {
        self.config.allow_subject_twice_in_day || self.repeatable.contains(&subject)
    }

    /// Returns the placement of `session` starting at `slot`, or `None` if the slot is invalid
    /// or no room can be resolved for it.
    pub fn place(
        &self,
        session: &RequiredSession,
        (day, period): Slot,
        occupancy: &Occupancy,
        repeat: RepeatRule,
    ) -> Option<Placement> {
        let span = session.subject_type.span();
        if !self.config.fits(period, span) {
            return None;
        }
        for p in period..period + span {
            let slot = (day, p);
            if occupancy.teacher_busy(slot, session.teacher_id)
                || occupancy.division_busy(slot, session.division_id)
            {
                return None;
            }
            if let Some(fixed) = self.fixed_room {
                if occupancy.room_busy(slot, fixed) {
                    return None;
                }
            }
        }
        if repeat == RepeatRule::Enforce
            && !self.repeat_allowed(session.subject_id)
            && occupancy.subject_count(session.division_id, session.subject_id, day) >= 1
        {
            return None;
        }

        let room_id = match self.fixed_room {
            Some(fixed) if session.subject_type == SubjectType::Lecture => fixed,
            _ => self
                .rooms
                .pick((day, period), session.subject_type, occupancy)?,
        };

        Some(Placement {
            division_id: session.division_id,
            subject_id: session.subject_id,
            teacher_id: session.teacher_id,
            subject_type: session.subject_type,
            room_id,
            day,
            period,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// Every required session was placed.
    Solved,
    /// At least one session could not be placed; the rest were searched without it.
    Exhausted,
    /// The step budget ran out first.
    BudgetExceeded,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub status: SearchStatus,
    /// Placed sessions in requirement order, set-aside sessions omitted.
    pub placements: Vec<Placement>,
    /// Indices of the sessions set aside as unplaceable.
    pub unplaced: Vec<usize>,
    pub steps: u64,
    pub backtracks: u64,
}

#[derive(Debug, Default)]
struct Frame {
    cursor: usize,
    placed: Option<Placement>,
}

#[derive(Debug, Default)]
struct Counters {
    steps: u64,
    backtracks: u64,
}

pub struct BacktrackingSearch<'r, 'a> {
    rules: &'r SlotRules<'a>,
    slots: Vec<Slot>,
    limits: SearchLimits,
}

impl<'r, 'a> BacktrackingSearch<'r, 'a> {
    pub fn new(rules: &'r SlotRules<'a>, limits: SearchLimits) -> Self {
        Self {
            rules,
            slots: rules.config.slots().collect(),
            limits,
        }
    }

    /// Runs the search. On return `occupancy` holds exactly the returned placements on top of
    /// its initial contents.
    pub fn run(&self, sessions: &[RequiredSession], occupancy: &mut Occupancy) -> SearchOutcome {
        let mut counters = Counters::default();
        let mut placements = Vec::with_capacity(sessions.len());
        let mut unplaced = Vec::new();
        let mut start = 0;

        let status = loop {
            let (status, placed) = self.run_segment(&sessions[start..], occupancy, &mut counters);
            let reached = start + placed.len();
            placements.extend(placed);
            if status != SearchStatus::Exhausted {
                break status;
            }
            debug!(
                "Session {} of {} cannot be placed, continuing without it",
                reached + 1,
                sessions.len()
            );
            unplaced.push(reached);
            start = reached + 1;
            if start >= sessions.len() {
                break SearchStatus::Exhausted;
            }
        };
        let status = match status {
            SearchStatus::Solved if !unplaced.is_empty() => SearchStatus::Exhausted,
            other => other,
        };

        SearchOutcome {
            status,
            placements,
            unplaced,
            steps: counters.steps,
            backtracks: counters.backtracks,
        }
    }

    /// Searches one contiguous run of sessions. Unless solved, only the deepest prefix reached
    /// stays applied to `occupancy` and is returned.
    fn run_segment(
        &self,
        sessions: &[RequiredSession],
        occupancy: &mut Occupancy,
        counters: &mut Counters,
    ) -> (SearchStatus, Vec<Placement>) {
        let mut frames: Vec<Frame> = Vec::with_capacity(sessions.len());
        let mut deepest: Vec<Placement> = Vec::new();

        if !sessions.is_empty() {
            frames.push(Frame::default());
        }

        let status = loop {
            let depth = frames.len();
            let Some(frame) = frames.last_mut() else {
                break if sessions.is_empty() {
                    SearchStatus::Solved
                } else {
                    SearchStatus::Exhausted
                };
            };
            // coming back to this frame means the deeper session failed
            if let Some(previous) = frame.placed.take() {
                occupancy.revert(&previous);
            }

            let session = &sessions[depth - 1];
            let mut found = None;
            let mut out_of_budget = false;
            while frame.cursor < self.slots.len() {
                if counters.steps >= self.limits.max_steps {
                    out_of_budget = true;
                    break;
                }
                let slot = self.slots[frame.cursor];
                frame.cursor += 1;
                counters.steps += 1;
                if let Some(placement) =
                    self.rules
                        .place(session, slot, occupancy, RepeatRule::Enforce)
                {
                    found = Some(placement);
                    break;
                }
            }
            if out_of_budget {
                break SearchStatus::BudgetExceeded;
            }

            match found {
                Some(placement) => {
                    occupancy.apply(&placement);
                    frame.placed = Some(placement);
                    let resume = frame.cursor;
                    if depth == sessions.len() {
                        break SearchStatus::Solved;
                    }
                    if depth > deepest.len() {
                        deepest = frames.iter().filter_map(|f| f.placed).collect();
                    }
                    let cursor = if sessions[depth] == *session { resume } else { 0 };
                    frames.push(Frame {
                        cursor,
                        placed: None,
                    });
                }
                None => {
                    trace!("Backtracking from session {} of {}", depth, sessions.len());
                    frames.pop();
                    counters.backtracks += 1;
                }
            }
        };

        let placements = match status {
            SearchStatus::Solved => frames.iter().filter_map(|f| f.placed).collect(),
            SearchStatus::Exhausted | SearchStatus::BudgetExceeded => {
                for placement in frames.iter().rev().filter_map(|f| f.placed.as_ref()) {
                    occupancy.revert(placement);
                }
                for placement in &deepest {
                    occupancy.apply(placement);
                }
                deepest
            }
        };
        (status, placements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Room, RoomType, TimeConfigRow};
    use crate::rooms::RoomPolicy;
    use itertools::Itertools;

    fn rooms() -> Vec<Room> {
        ["101", "102", "103", "104", "105"]
            .iter()
            .enumerate()
            .map(|(i, number)| Room {
                id: i as RoomId + 1,
                room_number: number.to_string(),
                floor: None,
                room_type: RoomType::Classroom,
            })
            .collect()
    }

    fn config(periods: u32) -> TimeConfig {
        TimeConfig::from_row(&TimeConfigRow {
            working_days: Some(5),
            periods_per_day: Some(periods),
            ..TimeConfigRow::default()
        })
    }

    fn rules<'a>(config: &'a TimeConfig, rooms: &'a [Room]) -> SlotRules<'a> {
        SlotRules {
            config,
            rooms: RoomAllocator::new(rooms, RoomPolicy::default()),
            fixed_room: None,
            repeatable: HashSet::new(),
        }
    }

    fn session(
        division_id: u32,
        subject_id: u32,
        teacher_id: u32,
        subject_type: SubjectType,
    ) -> RequiredSession {
        RequiredSession {
            division_id,
            subject_id,
            teacher_id,
            subject_type,
        }
    }

    fn replay(placements: &[Placement]) -> Occupancy {
        let mut occ = Occupancy::new();
        for p in placements {
            occ.apply(p);
        }
        occ
    }

    #[test]
    fn test_empty_requirements_are_solved() {
        let rooms = rooms();
        let cfg = config(8);
        let rules = rules(&cfg, &rooms);
        let mut occ = Occupancy::new();
        let outcome = BacktrackingSearch::new(&rules, SearchLimits::default()).run(&[], &mut occ);
        assert_eq!(outcome.status, SearchStatus::Solved);
        assert!(outcome.placements.is_empty());
        assert!(occ.is_empty());
    }

    #[test]
    fn test_lectures_land_on_distinct_days_in_slot_order() {
        let rooms = rooms();
        let cfg = config(8);
        let rules = rules(&cfg, &rooms);
        let sessions = vec![session(1, 10, 100, SubjectType::Lecture); 3];
        let mut occ = Occupancy::new();
        let outcome =
            BacktrackingSearch::new(&rules, SearchLimits::default()).run(&sessions, &mut occ);

        assert_eq!(outcome.status, SearchStatus::Solved);
        let slots: Vec<(u32, u32)> = outcome.placements.iter().map(|p| (p.day, p.period)).collect();
        assert_eq!(slots, vec![(0, 0), (1, 0), (2, 0)]);
        assert!(outcome.placements.iter().all(|p| p.room_id == 1));
        assert_eq!(occ, replay(&outcome.placements));
    }

    #[test]
    fn test_breaks_and_day_end_are_skipped_for_labs() {
        let rooms = rooms();
        let cfg = TimeConfig::from_row(&TimeConfigRow {
            working_days: Some(5),
            periods_per_day: Some(4),
            short_break_after_period: Some(0),
            lunch_break_after_period: Some(2),
            ..TimeConfigRow::default()
        });
        let rules = rules(&cfg, &rooms);
        // periods 0 and 2 are breaks, so no two consecutive teaching periods exist
        let mut occ = Occupancy::new();
        let outcome = BacktrackingSearch::new(&rules, SearchLimits::default())
            .run(&[session(1, 20, 200, SubjectType::Lab)], &mut occ);
        assert_eq!(outcome.status, SearchStatus::Exhausted);
        assert!(outcome.placements.is_empty());
        assert!(occ.is_empty());
    }

    #[test]
    fn test_backtracking_moves_earlier_choice() {
        let rooms = rooms();
        let cfg = config(2);
        let rules = rules(&cfg, &rooms);
        // teacher 100 already teaches another division in period 0 of days 1..4
        let mut occ = Occupancy::new();
        let preload: Vec<Placement> = (1..5)
            .map(|day| Placement {
                division_id: 9,
                subject_id: 99,
                teacher_id: 100,
                subject_type: SubjectType::Lecture,
                room_id: 2,
                day,
                period: 0,
            })
            .collect();
        for p in &preload {
            occ.apply(p);
        }
        // the lab only fits on day 0, so the lecture must give up (0, 0) and (0, 1)
        let sessions = vec![
            session(1, 10, 100, SubjectType::Lecture),
            session(2, 20, 100, SubjectType::Lab),
        ];
        let outcome =
            BacktrackingSearch::new(&rules, SearchLimits::default()).run(&sessions, &mut occ);

        assert_eq!(outcome.status, SearchStatus::Solved);
        assert!(outcome.backtracks >= 2);
        let lecture = outcome.placements[0];
        let lab = outcome.placements[1];
        assert_eq!((lecture.day, lecture.period), (1, 1));
        assert_eq!((lab.day, lab.period, lab.room_id), (0, 0, 3));

        let mut expected = preload;
        expected.extend(outcome.placements.iter().copied());
        assert_eq!(occ, replay(&expected));
    }

    #[test]
    fn test_exhaustion_keeps_deepest_prefix() {
        let rooms = rooms();
        let cfg = config(2);
        let rules = rules(&cfg, &rooms);
        // six lectures of one subject cannot avoid repeating across five days
        let sessions = vec![session(1, 10, 100, SubjectType::Lecture); 6];
        let mut occ = Occupancy::new();
        let outcome =
            BacktrackingSearch::new(&rules, SearchLimits::default()).run(&sessions, &mut occ);

        assert_eq!(outcome.status, SearchStatus::Exhausted);
        assert_eq!(outcome.placements.len(), 5);
        assert_eq!(outcome.unplaced, vec![5]);
        let days: Vec<u32> = outcome.placements.iter().map(|p| p.day).sorted().collect();
        assert_eq!(days, vec![0, 1, 2, 3, 4]);
        assert_eq!(occ, replay(&outcome.placements));
    }

    #[test]
    fn test_unplaceable_session_does_not_relax_later_ones() {
        let rooms = rooms();
        let cfg = config(4);
        let rules = rules(&cfg, &rooms);
        let mut sessions = vec![session(1, 10, 100, SubjectType::Lecture); 6];
        sessions.extend(vec![session(1, 11, 101, SubjectType::Lecture); 2]);
        let mut occ = Occupancy::new();
        let outcome =
            BacktrackingSearch::new(&rules, SearchLimits::default()).run(&sessions, &mut occ);

        assert_eq!(outcome.status, SearchStatus::Exhausted);
        assert_eq!(outcome.unplaced, vec![5]);
        assert_eq!(outcome.placements.len(), 7);
        let later: Vec<(u32, u32)> = outcome
            .placements
            .iter()
            .filter(|p| p.subject_id == 11)
            .map(|p| (p.day, p.period))
            .collect();
        assert_eq!(later, vec![(0, 1), (1, 1)]);
        assert_eq!(occ, replay(&outcome.placements));
    }

    #[test]
    fn test_identical_sessions_take_increasing_slots() {
        let rooms = rooms();
        let cfg = config(4);
        let rules = rules(&cfg, &rooms);
        let sessions = vec![session(1, 10, 100, SubjectType::Lecture); 4];
        let mut occ = Occupancy::new();
        let outcome =
            BacktrackingSearch::new(&rules, SearchLimits::default()).run(&sessions, &mut occ);

        assert_eq!(outcome.status, SearchStatus::Solved);
        let slots: Vec<(u32, u32)> = outcome.placements.iter().map(|p| (p.day, p.period)).collect();
        assert!(slots.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_budget_stops_search_with_consistent_state() {
        let rooms = rooms();
        let cfg = config(8);
        let rules = rules(&cfg, &rooms);
        let sessions = vec![session(1, 10, 100, SubjectType::Lecture); 7];
        let mut occ = Occupancy::new();
        let limits = SearchLimits { max_steps: 500 };
        let outcome = BacktrackingSearch::new(&rules, limits).run(&sessions, &mut occ);

        assert_eq!(outcome.status, SearchStatus::BudgetExceeded);
        assert_eq!(outcome.steps, 500);
        assert!(outcome.placements.len() < sessions.len());
        assert_eq!(occ, replay(&outcome.placements));
    }

    #[test]
    fn test_fixed_room_blocks_concurrent_sessions() {
        let rooms = rooms();
        let cfg = config(8);
        let mut rules = rules(&cfg, &rooms);
        rules.fixed_room = Some(5);
        let sessions = vec![
            session(1, 10, 100, SubjectType::Lecture),
            session(2, 11, 101, SubjectType::Lecture),
        ];
        let mut occ = Occupancy::new();
        let outcome =
            BacktrackingSearch::new(&rules, SearchLimits::default()).run(&sessions, &mut occ);

        assert_eq!(outcome.status, SearchStatus::Solved);
        assert!(outcome.placements.iter().all(|p| p.room_id == 5));
        assert_eq!((outcome.placements[1].day, outcome.placements[1].period), (0, 1));
    }

    #[test]
    fn test_repeat_rule() {
        let rooms = rooms();
        let cfg = config(8);
        let mut rules = rules(&cfg, &rooms);
        let lecture = session(1, 10, 100, SubjectType::Lecture);
        let mut occ = Occupancy::new();
        let first = rules
            .place(&lecture, (0, 0), &occ, RepeatRule::Enforce)
            .expect("empty grid");
        occ.apply(&first);

        assert!(rules.place(&lecture, (0, 1), &occ, RepeatRule::Enforce).is_none());
        assert!(rules.place(&lecture, (0, 1), &occ, RepeatRule::Ignore).is_some());

        rules.repeatable.insert(10);
        assert!(rules.place(&lecture, (0, 1), &occ, RepeatRule::Enforce).is_some());
    }

    #[test]
    fn test_global_repeat_flag_lifts_same_day_rule() {
        let rooms = rooms();
        let cfg = TimeConfig::from_row(&TimeConfigRow {
            working_days: Some(5),
            periods_per_day: Some(8),
            allow_subject_twice_in_day: Some(true),
            ..TimeConfigRow::default()
        });
        let rules = rules(&cfg, &rooms);
        let lecture = session(1, 10, 100, SubjectType::Lecture);
        let mut occ = Occupancy::new();
        let first = rules
            .place(&lecture, (0, 0), &occ, RepeatRule::Enforce)
            .expect("empty grid");
        occ.apply(&first);
        assert!(rules.place(&lecture, (0, 1), &occ, RepeatRule::Enforce).is_some());

        let mut occ = Occupancy::new();
        let outcome = BacktrackingSearch::new(&rules, SearchLimits::default())
            .run(&[lecture; 3], &mut occ);
        assert_eq!(outcome.status, SearchStatus::Solved);
        let slots: Vec<(u32, u32)> = outcome.placements.iter().map(|p| (p.day, p.period)).collect();
        assert_eq!(slots, vec![(0, 0), (0, 1), (0, 2)]);
    }
}
