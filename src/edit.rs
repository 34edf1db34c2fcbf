//! Validation of a manual single-cell timetable edit.
//!
//! An edit either clears a cell or overwrites it with a subject, teacher and optional room.
//! It is checked against the same room allow-list, lab pairing and teacher exclusivity rules
//! the generator uses, and turned into an [`EditAction`] only when every check passes.

use crate::calendar::{Slot, TimeConfig};
use crate::data::{
    DayIndex, DivisionId, DomainSnapshot, PeriodIndex, RoomId, SubjectId, TeacherId, Timetable,
    TimetableEntry, TimetableId,
};
use crate::error::EditError;
use crate::rooms::RoomPolicy;
use serde::{Deserialize, Serialize};

fn default_span() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotEdit {
    /// Defaults to the timetable's own division.
    #[serde(default)]
    pub division_id: Option<DivisionId>,
    pub day_index: DayIndex,
    pub period_index: PeriodIndex,
    /// `None` clears the cell.
    #[serde(default)]
    pub subject_id: Option<SubjectId>,
    #[serde(default)]
    pub teacher_id: Option<TeacherId>,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default = "default_span")]
    pub span: u32,
}

/// The mutation a validated edit performs on one timetable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditAction {
    pub timetable_id: TimetableId,
    pub division_id: DivisionId,
    /// Cells whose entries are removed first.
    pub clear: Vec<Slot>,
    /// Entries inserted afterwards.
    pub insert: Vec<TimetableEntry>,
}

impl EditAction {
    /// Whether `entry` sits in one of the cells this action clears.
    pub fn clears(&self, entry: &TimetableEntry) -> bool {
        entry.timetable_id == self.timetable_id
            && entry.division_id == self.division_id
            && self
                .clear
                .contains(&(entry.day_index, entry.period_index))
    }
}

pub fn plan_edit(
    timetable: &Timetable,
    edit: &SlotEdit,
    snapshot: &DomainSnapshot,
    config: &TimeConfig,
    policy: &RoomPolicy,
    existing: &[TimetableEntry],
) -> Result<EditAction, EditError> {
    let division_id = edit.division_id.unwrap_or(timetable.division_id);
    if division_id != timetable.division_id {
        return Err(EditError::DivisionMismatch(division_id));
    }
    let (day, period) = (edit.day_index, edit.period_index);
    if !config.contains((day, period)) {
        return Err(EditError::OutsideGrid { day, period });
    }

    let Some(subject_id) = edit.subject_id else {
        let mut clear = vec![(day, period)];
        if edit.span == 2 {
            clear.push((day, period + 1));
        }
        return Ok(EditAction {
            timetable_id: timetable.id,
            division_id,
            clear,
            insert: Vec::new(),
        });
    };

    let subject = snapshot
        .subject(subject_id)
        .ok_or(EditError::SubjectNotFound(subject_id))?;
    let teacher_id = edit.teacher_id.ok_or(EditError::TeacherRequired)?;

    if let Some(room_id) = edit.room_id {
        let room = snapshot
            .room(room_id)
            .ok_or(EditError::RoomNotFound(room_id))?;
        if !policy.allows(subject.subject_type, &room.room_number) {
            return Err(EditError::RoomNotAllowed(room.room_number.clone()));
        }
    }

    let span = subject.subject_type.span();
    if subject.subject_type.is_lab() {
        if edit.span != 2 {
            return Err(EditError::LabSpan);
        }
        if period + 1 >= config.periods_per_day {
            return Err(EditError::LabAtLastPeriod);
        }
        if config.is_break(period) || config.is_break(period + 1) {
            return Err(EditError::LabOnBreak);
        }
    }

    let cells: Vec<Slot> = (period..period + span).map(|p| (day, p)).collect();
    let mut action = EditAction {
        timetable_id: timetable.id,
        division_id,
        clear: cells.clone(),
        insert: Vec::new(),
    };

    // entries about to be overwritten do not count as conflicts
    let teacher_busy_at = |slot: Slot| {
        existing.iter().any(|e| {
            e.teacher_id == teacher_id
                && (e.day_index, e.period_index) == slot
                && !action.clears(e)
        })
    };
    if teacher_busy_at(cells[0]) {
        return Err(EditError::TeacherBusy);
    }
    if cells.len() > 1 && teacher_busy_at(cells[1]) {
        return Err(EditError::TeacherBusyNextSlot);
    }

    action.insert = cells
        .iter()
        .map(|&(day_index, period_index)| TimetableEntry {
            timetable_id: timetable.id,
            day_index,
            period_index,
            division_id,
            subject_id,
            teacher_id,
            room_id: edit.room_id,
            batch_number: None,
        })
        .collect();
    Ok(action)
}
