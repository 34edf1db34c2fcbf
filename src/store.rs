//! In-memory persistence for the domain snapshot and generated timetables.
//!
//! A generation's headers, entries and fixed-room write-back are committed together after the
//! whole computation finishes, so readers never see a partial schedule.

use crate::calendar::TimeConfig;
use crate::data::{
    DomainSnapshot, GenerateRequest, GenerationSummary, Timetable, TimetableEntry, TimetableId,
};
use crate::edit::{SlotEdit, plan_edit};
use crate::error::StoreError;
use crate::grid::{Grid, project_grid};
use crate::rooms::RoomPolicy;
use crate::search::SearchLimits;
use crate::solver;
use log::info;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Default)]
pub struct Store {
    domain: DomainSnapshot,
    timetables: BTreeMap<TimetableId, Timetable>,
    entries: Vec<TimetableEntry>,
    next_timetable_id: TimetableId,
    limits: SearchLimits,
}

impl Store {
    pub fn new(domain: DomainSnapshot, limits: SearchLimits) -> Self {
        Self {
            domain,
            timetables: BTreeMap::new(),
            entries: Vec::new(),
            next_timetable_id: 1,
            limits,
        }
    }

    pub fn load(path: &Path, limits: SearchLimits) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        let domain: DomainSnapshot = serde_json::from_str(&raw)?;
        info!(
            "Loaded snapshot from {}: {} classes, {} divisions, {} subjects, {} rooms",
            path.display(),
            domain.classes.len(),
            domain.divisions.len(),
            domain.subjects.len(),
            domain.rooms.len()
        );
        Ok(Self::new(domain, limits))
    }

    pub fn replace_domain(&mut self, domain: DomainSnapshot) {
        self.domain = domain;
    }

    pub fn timetables(&self) -> Vec<Timetable> {
        self.timetables.values().cloned().collect()
    }

    fn timetable(&self, id: TimetableId) -> Result<&Timetable, StoreError> {
        self.timetables
            .get(&id)
            .ok_or(StoreError::TimetableNotFound(id))
    }

    fn config_for(&self, timetable: &Timetable) -> TimeConfig {
        TimeConfig::resolve(
            &self.domain.time_configs,
            timetable.class_id,
            timetable.department_id,
        )
    }

    /// Runs one generation and commits its result. Earlier timetables are left in place.
    pub fn generate(&mut self, request: &GenerateRequest) -> Result<GenerationSummary, StoreError> {
        let generation =
            solver::generate(&self.domain, request, self.next_timetable_id, self.limits)?;

        if let Some((class_id, room_id)) = generation.fixed_room_assignment {
            if let Some(class) = self.domain.classes.iter_mut().find(|c| c.id == class_id) {
                class.fixed_room_id = Some(room_id);
            }
        }
        self.next_timetable_id += generation.timetables.len() as TimetableId;
        for timetable in generation.timetables {
            self.timetables.insert(timetable.id, timetable);
        }
        self.entries.extend(generation.entries);
        Ok(generation.summary)
    }

    pub fn grid(&self, id: TimetableId) -> Result<Grid, StoreError> {
        let timetable = self.timetable(id)?;
        let config = self.config_for(timetable);
        Ok(project_grid(timetable, &self.entries, &self.domain, &config))
    }

    pub fn edit_slot(&mut self, id: TimetableId, edit: &SlotEdit) -> Result<(), StoreError> {
        let timetable = self.timetable(id)?;
        let config = self.config_for(timetable);
        let action = plan_edit(
            timetable,
            edit,
            &self.domain,
            &config,
            &RoomPolicy::default(),
            &self.entries,
        )?;
        self.entries.retain(|e| !action.clears(e));
        self.entries.extend(action.insert);
        Ok(())
    }

    pub fn publish(&mut self, id: TimetableId) -> Result<(), StoreError> {
        let timetable = self
            .timetables
            .get_mut(&id)
            .ok_or(StoreError::TimetableNotFound(id))?;
        timetable.published = true;
        Ok(())
    }

    pub fn delete(&mut self, id: TimetableId) -> Result<(), StoreError> {
        self.timetables
            .remove(&id)
            .ok_or(StoreError::TimetableNotFound(id))?;
        self.entries.retain(|e| e.timetable_id != id);
        Ok(())
    }
}

#[cfg(test)]
impl Store {
    pub fn domain(&self) -> &DomainSnapshot {
        &self.domain
    }

    pub fn entries_of(&self, id: TimetableId) -> Vec<TimetableEntry> {
        self.entries
            .iter()
            .filter(|e| e.timetable_id == id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        ClassGroup, Division, Mode, Room, RoomType, Subject, SubjectTeacherAssignment,
        SubjectType,
    };

    fn sample_domain() -> DomainSnapshot {
        DomainSnapshot {
            classes: vec![ClassGroup {
                id: 1,
                name: "10th".into(),
                mode: Mode::School,
                department_id: None,
                fixed_room_id: None,
            }],
            divisions: vec![
                Division {
                    id: 1,
                    name: "10A".into(),
                    class_id: 1,
                    index: 0,
                },
                Division {
                    id: 2,
                    name: "10B".into(),
                    class_id: 1,
                    index: 1,
                },
            ],
            subjects: vec![Subject {
                id: 10,
                name: "Maths".into(),
                class_id: 1,
                subject_type: SubjectType::Lecture,
                hours_per_week: 2,
                can_be_twice_in_day: false,
            }],
            rooms: vec![Room {
                id: 1,
                room_number: "101".into(),
                floor: None,
                room_type: RoomType::Classroom,
            }],
            assignments: vec![
                SubjectTeacherAssignment {
                    division_id: 1,
                    subject_id: 10,
                    teacher_id: 100,
                },
                SubjectTeacherAssignment {
                    division_id: 2,
                    subject_id: 10,
                    teacher_id: 101,
                },
            ],
            ..DomainSnapshot::default()
        }
    }

    fn request() -> GenerateRequest {
        GenerateRequest {
            class_id: 1,
            department_id: None,
            mode: Mode::School,
            name: "Term 1".into(),
        }
    }

    #[test]
    fn test_generate_commits_headers_entries_and_fixed_room() {
        let mut store = Store::new(sample_domain(), SearchLimits::default());
        let summary = store.generate(&request()).expect("generation");

        assert_eq!(summary.timetable_ids, vec![1, 2]);
        assert_eq!(summary.entries_placed, 4);
        assert_eq!(store.domain().classes[0].fixed_room_id, Some(1));
        assert_eq!(store.entries_of(1).len(), 2);
        assert!(store.entries_of(2).iter().all(|e| e.division_id == 2));

        // ids keep increasing and old timetables stay
        let again = store.generate(&request()).expect("generation");
        assert_eq!(again.timetable_ids, vec![3, 4]);
        assert_eq!(store.timetables().len(), 4);
    }

    #[test]
    fn test_edit_then_grid() {
        let mut store = Store::new(sample_domain(), SearchLimits::default());
        store.generate(&request()).expect("generation");

        let edit = SlotEdit {
            division_id: None,
            day_index: 5,
            period_index: 7,
            subject_id: Some(10),
            teacher_id: Some(100),
            room_id: Some(1),
            span: 1,
        };
        store.edit_slot(1, &edit).expect("valid edit");
        let grid = store.grid(1).expect("grid");
        let cell = grid.cell(5, 7).expect("edited cell");
        assert_eq!(cell.subject.name.as_deref(), Some("Maths"));

        let clear = SlotEdit {
            subject_id: None,
            ..edit
        };
        store.edit_slot(1, &clear).expect("clear");
        assert!(store.grid(1).expect("grid").cell(5, 7).is_none());
    }

    #[test]
    fn test_rejected_edit_leaves_entries_untouched() {
        let mut store = Store::new(sample_domain(), SearchLimits::default());
        store.generate(&request()).expect("generation");
        let before = store.entries_of(2);
        let busy = store.entries_of(1)[0].clone();

        let edit = SlotEdit {
            division_id: None,
            day_index: busy.day_index,
            period_index: busy.period_index,
            subject_id: Some(10),
            teacher_id: Some(100),
            room_id: None,
            span: 1,
        };
        let err = store.edit_slot(2, &edit).unwrap_err();
        assert!(matches!(err, StoreError::Edit(crate::error::EditError::TeacherBusy)));
        assert_eq!(store.entries_of(2), before);
    }

    #[test]
    fn test_publish_and_delete() {
        let mut store = Store::new(sample_domain(), SearchLimits::default());
        store.generate(&request()).expect("generation");
        store.publish(1).expect("publish");
        assert!(store.timetables()[0].published);
        store.delete(1).expect("delete");
        assert!(store.entries_of(1).is_empty());
        assert!(matches!(store.delete(1), Err(StoreError::TimetableNotFound(1))));
        assert!(matches!(store.grid(1), Err(StoreError::TimetableNotFound(1))));
    }
}
