use serde::{Deserialize, Serialize};
use std::fmt;

// Type aliases for clarity
pub type ClassId = u32;
pub type DepartmentId = u32;
pub type DivisionId = u32;
pub type SubjectId = u32;
pub type TeacherId = u32;
pub type RoomId = u32;
pub type TimetableId = u32;
pub type DayIndex = u32;
pub type PeriodIndex = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    Lecture,
    Lab,
    Tutorial,
}

impl SubjectType {
    pub fn is_lab(self) -> bool {
        self == SubjectType::Lab
    }

    /// Number of consecutive periods one session occupies.
    pub fn span(self) -> u32 {
        if self.is_lab() { 2 } else { 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Classroom,
    Lab,
    Tutorial,
}

/// Scheduling mode. In `School` mode every lecture of a class goes to the class's fixed room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    School,
    College,
}

/// A class (e.g. "10th", "FY") which owns divisions and subjects.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassGroup {
    pub id: ClassId,
    pub name: String,
    pub mode: Mode,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(default)]
    pub fixed_room_id: Option<RoomId>,
}

/// A sub-group of a class scheduled as its own timetable.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Division {
    pub id: DivisionId,
    pub name: String,
    pub class_id: ClassId,
    /// 0-based ordering used for round-robin fairness (A=0, B=1, ...).
    #[serde(default)]
    pub index: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub class_id: ClassId,
    #[serde(rename = "type")]
    pub subject_type: SubjectType,
    #[serde(default)]
    pub hours_per_week: u32,
    #[serde(default)]
    pub can_be_twice_in_day: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
}

/// A physical room. Allocation goes by `room_number`, not by `room_type`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub room_number: String,
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(rename = "type")]
    pub room_type: RoomType,
}

/// Binds the teacher of a subject for one division.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectTeacherAssignment {
    pub division_id: DivisionId,
    pub subject_id: SubjectId,
    pub teacher_id: TeacherId,
}

/// A stored time configuration, scoped to a class or a department.
/// Unset fields fall back to built-in defaults when resolved.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeConfigRow {
    pub department_id: Option<DepartmentId>,
    pub class_id: Option<ClassId>,
    pub working_days: Option<u32>,
    pub periods_per_day: Option<u32>,
    pub lecture_minutes: Option<u32>,
    pub lab_minutes: Option<u32>,
    pub short_break_after_period: Option<PeriodIndex>,
    pub lunch_break_after_period: Option<PeriodIndex>,
    pub allow_subject_twice_in_day: Option<bool>,
}

/// Everything generation reads, loaded once per call.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomainSnapshot {
    pub classes: Vec<ClassGroup>,
    pub divisions: Vec<Division>,
    pub subjects: Vec<Subject>,
    pub teachers: Vec<Teacher>,
    pub rooms: Vec<Room>,
    pub assignments: Vec<SubjectTeacherAssignment>,
    pub time_configs: Vec<TimeConfigRow>,
}

impl DomainSnapshot {
    pub fn class(&self, id: ClassId) -> Option<&ClassGroup> {
        self.classes.iter().find(|c| c.id == id)
    }

    pub fn subject(&self, id: SubjectId) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == id)
    }

    pub fn teacher(&self, id: TeacherId) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.id == id)
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    pub fn division(&self, id: DivisionId) -> Option<&Division> {
        self.divisions.iter().find(|d| d.id == id)
    }
}

/// Input of one generation call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub class_id: ClassId,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    pub mode: Mode,
    pub name: String,
}

/// One timetable header; generation creates one per division.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    pub id: TimetableId,
    pub name: String,
    pub class_id: ClassId,
    pub department_id: Option<DepartmentId>,
    pub division_id: DivisionId,
    pub mode: Mode,
    pub published: bool,
}

/// Represents a single occupied (day, period) cell of a timetable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct TimetableEntry {
    pub timetable_id: TimetableId,
    pub day_index: DayIndex,
    pub period_index: PeriodIndex,
    pub division_id: DivisionId,
    pub subject_id: SubjectId,
    pub teacher_id: TeacherId,
    pub room_id: Option<RoomId>,
    pub batch_number: Option<u32>,
}

/// A (division, subject) pair left short of its weekly requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmetRequirement {
    pub division_id: DivisionId,
    pub subject_id: SubjectId,
    pub required: u32,
    pub placed: u32,
}

impl fmt::Display for UnmetRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Division {} subject {}: placed {} of {} sessions",
            self.division_id, self.subject_id, self.placed, self.required
        )
    }
}

/// A (division, subject) pair with weekly hours but no assigned teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedPairing {
    pub division_id: DivisionId,
    pub subject_id: SubjectId,
}

impl fmt::Display for SkippedPairing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Division {} subject {} has no assigned teacher",
            self.division_id, self.subject_id
        )
    }
}

/// The final output of a generation call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    pub success: bool,
    pub timetable_ids: Vec<TimetableId>,
    pub entries_placed: usize,
    pub sessions_required: usize,
    pub sessions_placed: usize,
    pub search_solved: bool,
    pub unmet_requirements: Vec<UnmetRequirement>,
    pub skipped_pairings: Vec<SkippedPairing>,
    pub fixed_room_id: Option<RoomId>,
}
