//! Occupancy state shared by the search and the relaxed filler.
//!
//! Every mutation goes through [`Occupancy::apply`] and is undone by [`Occupancy::revert`]
//! with the same [`Placement`]. Empty sets and zero counters are removed so that a reverted
//! state compares equal to the state before the apply.

use crate::calendar::Slot;
use crate::data::{
    DayIndex, DivisionId, PeriodIndex, RoomId, SubjectId, SubjectType, TeacherId, TimetableEntry,
    TimetableId,
};
use std::collections::{HashMap, HashSet};

/// A session fixed to a start slot and a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    pub division_id: DivisionId,
    pub subject_id: SubjectId,
    pub teacher_id: TeacherId,
    pub subject_type: SubjectType,
    pub room_id: RoomId,
    pub day: DayIndex,
    pub period: PeriodIndex,
}

impl Placement {
    /// The slots this placement occupies: one, or two consecutive ones for a lab.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        (self.period..self.period + self.subject_type.span()).map(|p| (self.day, p))
    }

    /// One entry per occupied period, all sharing subject, teacher and room.
    pub fn entries(&self, timetable_id: TimetableId) -> Vec<TimetableEntry> {
        self.slots()
            .map(|(day, period)| TimetableEntry {
                timetable_id,
                day_index: day,
                period_index: period,
                division_id: self.division_id,
                subject_id: self.subject_id,
                teacher_id: self.teacher_id,
                room_id: Some(self.room_id),
                batch_number: None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Occupancy {
    teacher_busy: HashMap<Slot, HashSet<TeacherId>>,
    room_busy: HashMap<Slot, HashSet<RoomId>>,
    division_busy: HashMap<Slot, HashSet<DivisionId>>,
    subject_once: HashMap<(DivisionId, SubjectId, DayIndex), u32>,
}

fn insert<T: std::hash::Hash + Eq>(map: &mut HashMap<Slot, HashSet<T>>, slot: Slot, value: T) {
    map.entry(slot).or_default().insert(value);
}

fn remove<T: std::hash::Hash + Eq>(map: &mut HashMap<Slot, HashSet<T>>, slot: Slot, value: &T) {
    if let Some(set) = map.get_mut(&slot) {
        set.remove(value);
        if set.is_empty() {
            map.remove(&slot);
        }
    }
}

fn contains<T: std::hash::Hash + Eq>(
    map: &HashMap<Slot, HashSet<T>>,
    slot: Slot,
    value: &T,
) -> bool {
    map.get(&slot).is_some_and(|set| set.contains(value))
}

impl Occupancy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn teacher_busy(&self, slot: Slot, teacher: TeacherId) -> bool {
        contains(&self.teacher_busy, slot, &teacher)
    }

    pub fn room_busy(&self, slot: Slot, room: RoomId) -> bool {
        contains(&self.room_busy, slot, &room)
    }

    pub fn division_busy(&self, slot: Slot, division: DivisionId) -> bool {
        contains(&self.division_busy, slot, &division)
    }

    /// How many sessions of `subject` `division` already has on `day`.
    pub fn subject_count(&self, division: DivisionId, subject: SubjectId, day: DayIndex) -> u32 {
        self.subject_once
            .get(&(division, subject, day))
            .copied()
            .unwrap_or(0)
    }

    pub fn apply(&mut self, placement: &Placement) {
        for slot in placement.slots() {
            insert(&mut self.teacher_busy, slot, placement.teacher_id);
            insert(&mut self.room_busy, slot, placement.room_id);
            insert(&mut self.division_busy, slot, placement.division_id);
        }
        *self
            .subject_once
            .entry((placement.division_id, placement.subject_id, placement.day))
            .or_insert(0) += 1;
    }

    pub fn revert(&mut self, placement: &Placement) {
        for slot in placement.slots() {
            remove(&mut self.teacher_busy, slot, &placement.teacher_id);
            remove(&mut self.room_busy, slot, &placement.room_id);
            remove(&mut self.division_busy, slot, &placement.division_id);
        }
        let key = (placement.division_id, placement.subject_id, placement.day);
        if let Some(count) = self.subject_once.get_mut(&key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.subject_once.remove(&key);
            }
        }
    }
}

#[cfg(test)]
impl Occupancy {
    pub fn is_empty(&self) -> bool {
        self.teacher_busy.is_empty()
            && self.room_busy.is_empty()
            && self.division_busy.is_empty()
            && self.subject_once.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lab(day: DayIndex, period: PeriodIndex) -> Placement {
        Placement {
            division_id: 1,
            subject_id: 7,
            teacher_id: 3,
            subject_type: SubjectType::Lab,
            room_id: 103,
            day,
            period,
        }
    }

    fn lecture(day: DayIndex, period: PeriodIndex) -> Placement {
        Placement {
            subject_type: SubjectType::Lecture,
            room_id: 101,
            ..lab(day, period)
        }
    }

    #[test]
    fn test_lab_occupies_two_periods() {
        let mut occ = Occupancy::new();
        occ.apply(&lab(2, 4));
        assert!(occ.teacher_busy((2, 4), 3));
        assert!(occ.teacher_busy((2, 5), 3));
        assert!(!occ.teacher_busy((2, 6), 3));
        assert!(occ.room_busy((2, 5), 103));
        assert!(occ.division_busy((2, 4), 1));
        assert_eq!(occ.subject_count(1, 7, 2), 1);
    }

    #[test]
    fn test_revert_restores_identical_state() {
        let mut occ = Occupancy::new();
        occ.apply(&lecture(0, 0));
        let before = occ.clone();

        let trial = lab(0, 2);
        occ.apply(&trial);
        assert_ne!(occ, before);
        occ.revert(&trial);
        assert_eq!(occ, before);

        // a second session of the same subject on the same day shares the counter key
        let again = lecture(0, 1);
        occ.apply(&again);
        assert_eq!(occ.subject_count(1, 7, 0), 2);
        occ.revert(&again);
        assert_eq!(occ, before);

        occ.revert(&lecture(0, 0));
        assert!(occ.is_empty());
    }

    #[test]
    fn test_entries_share_subject_teacher_and_room() {
        let entries = lab(1, 3).entries(42);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].period_index, 3);
        assert_eq!(entries[1].period_index, 4);
        assert!(entries.iter().all(|e| e.timetable_id == 42
            && e.subject_id == 7
            && e.teacher_id == 3
            && e.room_id == Some(103)));
        assert_eq!(lecture(1, 3).entries(42).len(), 1);
    }
}
