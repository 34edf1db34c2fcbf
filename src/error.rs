use crate::data::{ClassId, DivisionId, RoomId, SubjectId, TimetableId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Class {0} not found")]
    ClassNotFound(ClassId),
}

/// Reasons a manual slot edit is rejected. Nothing is mutated when one is returned.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EditError {
    #[error("Division {0} does not own this timetable")]
    DivisionMismatch(DivisionId),
    #[error("Subject {0} not found")]
    SubjectNotFound(SubjectId),
    #[error("Room {0} not found")]
    RoomNotFound(RoomId),
    #[error("Teacher is required when setting a subject")]
    TeacherRequired,
    #[error("Room number {0} not allowed for this subject type")]
    RoomNotAllowed(String),
    #[error("Slot (day {day}, period {period}) is outside the timetable grid")]
    OutsideGrid { day: u32, period: u32 },
    #[error("Lab must span 2 periods")]
    LabSpan,
    #[error("Lab cannot start at last period")]
    LabAtLastPeriod,
    #[error("Lab cannot be on a break period")]
    LabOnBreak,
    #[error("Teacher busy at slot")]
    TeacherBusy,
    #[error("Teacher busy at next slot")]
    TeacherBusyNextSlot,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Timetable {0} not found")]
    TimetableNotFound(TimetableId),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error("Failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}
