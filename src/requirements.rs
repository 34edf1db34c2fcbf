//! Expands (division, subject, teacher) pairings into individual sessions.

use crate::calendar::TimeConfig;
use crate::data::{
    Division, DivisionId, SkippedPairing, Subject, SubjectId, SubjectTeacherAssignment,
    SubjectType, TeacherId,
};
use itertools::Itertools;
use std::collections::{HashMap, VecDeque};

/// One session still waiting for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequiredSession {
    pub division_id: DivisionId,
    pub subject_id: SubjectId,
    pub teacher_id: TeacherId,
    pub subject_type: SubjectType,
}

#[derive(Debug, Clone, Default)]
pub struct RequirementPlan {
    /// Labs first, then tutorials, then lectures; each group round-robin across divisions.
    pub sessions: Vec<RequiredSession>,
    pub skipped: Vec<SkippedPairing>,
}

/// The weekly demand of one (division, subject) pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Demand {
    pub session: RequiredSession,
    pub required: u32,
}

impl RequirementPlan {
    /// One demand per (division, subject), in first-appearance order.
    pub fn demands(&self) -> Vec<Demand> {
        let counts = self
            .sessions
            .iter()
            .map(|s| (s.division_id, s.subject_id))
            .counts();
        self.sessions
            .iter()
            .unique_by(|s| (s.division_id, s.subject_id))
            .map(|s| Demand {
                session: *s,
                required: counts[&(s.division_id, s.subject_id)] as u32,
            })
            .collect()
    }
}

/// Number of sessions a subject needs per week.
pub fn session_count(subject: &Subject, config: &TimeConfig) -> u32 {
    if subject.hours_per_week == 0 {
        return 0;
    }
    match subject.subject_type {
        SubjectType::Lab => (subject.hours_per_week / config.lab_session_length()).max(1),
        SubjectType::Lecture | SubjectType::Tutorial => subject.hours_per_week,
    }
}

/// Builds the ordered session list. Pairings without an assigned teacher produce no sessions
/// and are reported in [`RequirementPlan::skipped`].
pub fn build_requirements(
    divisions: &[Division],
    subjects: &[Subject],
    assignments: &[SubjectTeacherAssignment],
    config: &TimeConfig,
) -> RequirementPlan {
    let teacher_for: HashMap<(DivisionId, SubjectId), TeacherId> = assignments
        .iter()
        .map(|a| ((a.division_id, a.subject_id), a.teacher_id))
        .collect();

    let ordered: Vec<&Division> = divisions.iter().sorted_by_key(|d| (d.index, d.id)).collect();

    let mut labs: Vec<VecDeque<RequiredSession>> = Vec::with_capacity(ordered.len());
    let mut tutorials: Vec<VecDeque<RequiredSession>> = Vec::with_capacity(ordered.len());
    let mut lectures: Vec<VecDeque<RequiredSession>> = Vec::with_capacity(ordered.len());
    let mut skipped = Vec::new();

    for division in &ordered {
        let mut lab_queue = VecDeque::new();
        let mut tutorial_queue = VecDeque::new();
        let mut lecture_queue = VecDeque::new();

        for subject in subjects {
            let count = session_count(subject, config);
            if count == 0 {
                continue;
            }
            let Some(&teacher_id) = teacher_for.get(&(division.id, subject.id)) else {
                // no teacher is borrowed from another division
                skipped.push(SkippedPairing {
                    division_id: division.id,
                    subject_id: subject.id,
                });
                continue;
            };
            let session = RequiredSession {
                division_id: division.id,
                subject_id: subject.id,
                teacher_id,
                subject_type: subject.subject_type,
            };
            let queue = match subject.subject_type {
                SubjectType::Lab => &mut lab_queue,
                SubjectType::Tutorial => &mut tutorial_queue,
                SubjectType::Lecture => &mut lecture_queue,
            };
            queue.extend(std::iter::repeat(session).take(count as usize));
        }

        labs.push(lab_queue);
        tutorials.push(tutorial_queue);
        lectures.push(lecture_queue);
    }

    let mut sessions = round_robin(labs);
    sessions.extend(round_robin(tutorials));
    sessions.extend(round_robin(lectures));

    RequirementPlan { sessions, skipped }
}

/// Pops one item from each queue in turn until all are empty.
fn round_robin<T>(mut queues: Vec<VecDeque<T>>) -> Vec<T> {
    let mut order = Vec::with_capacity(queues.iter().map(VecDeque::len).sum());
    while queues.iter().any(|q| !q.is_empty()) {
        for queue in queues.iter_mut() {
            if let Some(item) = queue.pop_front() {
                order.push(item);
            }
        }
    }
    order
}
