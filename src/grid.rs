//! Read-side projection of a timetable onto a day × period grid.

use crate::calendar::TimeConfig;
use crate::data::{
    DivisionId, DomainSnapshot, RoomId, RoomType, SubjectId, SubjectType, TeacherId, Timetable,
    TimetableEntry,
};
use log::warn;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRef {
    pub id: SubjectId,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub subject_type: Option<SubjectType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherRef {
    pub id: TeacherId,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRef {
    pub id: Option<RoomId>,
    pub room_number: String,
    pub floor: Option<String>,
    #[serde(rename = "type")]
    pub room_type: Option<RoomType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DivisionRef {
    pub id: DivisionId,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub subject: SubjectRef,
    pub teacher: TeacherRef,
    pub room: RoomRef,
    pub division: DivisionRef,
    pub batch: Option<u32>,
    /// 2 on the first period of a lab pair, 1 otherwise.
    pub span: u32,
    /// True on the second period of a lab pair.
    pub continued: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridDay {
    pub day: String,
    pub periods: Vec<Option<GridCell>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grid {
    pub timetable_id: u32,
    pub days: Vec<GridDay>,
}

#[cfg(test)]
impl Grid {
    pub fn cell(&self, day: usize, period: usize) -> Option<&GridCell> {
        self.days.get(day)?.periods.get(period)?.as_ref()
    }
}

fn same_session(a: &TimetableEntry, b: &TimetableEntry) -> bool {
    a.subject_id == b.subject_id && a.teacher_id == b.teacher_id && a.room_id == b.room_id
}

/// Builds the grid of `timetable`. Only entries of its owning division are shown; entries
/// outside the configured week are dropped with a warning.
pub fn project_grid(
    timetable: &Timetable,
    entries: &[TimetableEntry],
    snapshot: &DomainSnapshot,
    config: &TimeConfig,
) -> Grid {
    let own: Vec<&TimetableEntry> = entries
        .iter()
        .filter(|e| e.timetable_id == timetable.id && e.division_id == timetable.division_id)
        .collect();
    let at: HashMap<(u32, u32), &TimetableEntry> = own
        .iter()
        .map(|e| ((e.day_index, e.period_index), *e))
        .collect();

    let mut days: Vec<GridDay> = config
        .day_names()
        .into_iter()
        .map(|day| GridDay {
            day,
            periods: vec![None; config.periods_per_day as usize],
        })
        .collect();

    for entry in own {
        if !config.contains((entry.day_index, entry.period_index)) {
            warn!(
                "Entry at day {} period {} lies outside timetable {}",
                entry.day_index, entry.period_index, timetable.id
            );
            continue;
        }
        let subject = snapshot.subject(entry.subject_id);
        let teacher = snapshot.teacher(entry.teacher_id);
        let room = entry.room_id.and_then(|id| snapshot.room(id));
        let division = snapshot.division(entry.division_id);

        let mut span = 1;
        let mut continued = false;
        if subject.is_some_and(|s| s.subject_type.is_lab()) {
            let next = at.get(&(entry.day_index, entry.period_index + 1));
            let prev = entry
                .period_index
                .checked_sub(1)
                .and_then(|p| at.get(&(entry.day_index, p)));
            if next.is_some_and(|n| same_session(entry, n)) {
                span = 2;
            } else if prev.is_some_and(|p| same_session(entry, p)) {
                continued = true;
            }
        }

        let room = match room {
            Some(r) => RoomRef {
                id: Some(r.id),
                room_number: r.room_number.clone(),
                floor: r.floor.clone(),
                room_type: Some(r.room_type),
            },
            None => RoomRef {
                id: entry.room_id,
                room_number: "-".to_string(),
                floor: None,
                room_type: None,
            },
        };

        days[entry.day_index as usize].periods[entry.period_index as usize] = Some(GridCell {
            subject: SubjectRef {
                id: entry.subject_id,
                name: subject.map(|s| s.name.clone()),
                subject_type: subject.map(|s| s.subject_type),
            },
            teacher: TeacherRef {
                id: entry.teacher_id,
                name: teacher.map(|t| t.name.clone()),
            },
            room,
            division: DivisionRef {
                id: entry.division_id,
                name: division.map(|d| d.name.clone()),
            },
            batch: entry.batch_number,
            span,
            continued,
        });
    }

    Grid {
        timetable_id: timetable.id,
        days,
    }
}
