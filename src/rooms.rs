//! Room selection.
//!
//! Rooms are chosen strictly by room number: each subject type has a closed allow-list and a
//! room outside it is never picked, whatever its stored type.

use crate::calendar::Slot;
use crate::data::{ClassGroup, Mode, Room, RoomId, RoomType, SubjectType};
use crate::occupancy::Occupancy;
use log::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomPolicy {
    pub lab: Vec<String>,
    pub tutorial: Vec<String>,
    pub lecture: Vec<String>,
}

impl Default for RoomPolicy {
    fn default() -> Self {
        Self {
            lab: vec!["103".into(), "104".into()],
            tutorial: vec!["105".into()],
            lecture: vec!["101".into(), "102".into()],
        }
    }
}

impl RoomPolicy {
    pub fn allowed_numbers(&self, subject_type: SubjectType) -> &[String] {
        match subject_type {
            SubjectType::Lab => &self.lab,
            SubjectType::Tutorial => &self.tutorial,
            SubjectType::Lecture => &self.lecture,
        }
    }

    pub fn allows(&self, subject_type: SubjectType, room_number: &str) -> bool {
        self.allowed_numbers(subject_type)
            .iter()
            .any(|n| n == room_number.trim())
    }
}

/// Picks the first free allowed room, in stable room-id order.
#[derive(Debug, Clone)]
pub struct RoomAllocator<'a> {
    rooms: Vec<&'a Room>,
    policy: RoomPolicy,
}

impl<'a> RoomAllocator<'a> {
    pub fn new(rooms: &'a [Room], policy: RoomPolicy) -> Self {
        let mut rooms: Vec<&Room> = rooms.iter().collect();
        rooms.sort_by_key(|r| r.id);
        Self { rooms, policy }
    }

    /// A lab room must be free for both periods of the pair.
    pub fn pick(
        &self,
        (day, period): Slot,
        subject_type: SubjectType,
        occupancy: &Occupancy,
    ) -> Option<RoomId> {
        let span = subject_type.span();
        self.rooms
            .iter()
            .filter(|r| self.policy.allows(subject_type, &r.room_number))
            .find(|r| (period..period + span).all(|p| !occupancy.room_busy((day, p), r.id)))
            .map(|r| r.id)
    }
}

/// The fixed room used for a class's lectures, if any.
///
/// Only `School` mode uses one. A class without a fixed room gets the first classroom-type
/// room; the second element of the result is `true` when that assignment is new and must be
/// written back onto the class.
pub fn resolve_fixed_room(
    mode: Mode,
    class: &ClassGroup,
    rooms: &[Room],
) -> (Option<RoomId>, bool) {
    if mode != Mode::School {
        return (None, false);
    }
    if let Some(id) = class.fixed_room_id {
        return (Some(id), false);
    }
    let first_classroom = rooms
        .iter()
        .filter(|r| r.room_type == RoomType::Classroom)
        .min_by_key(|r| r.id);
    match first_classroom {
        Some(room) => {
            info!(
                "Auto-assigning room {} (#{}) as fixed room of class {}",
                room.room_number, room.id, class.id
            );
            (Some(room.id), true)
        }
        None => (None, false),
    }
}
