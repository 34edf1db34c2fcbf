//! Resolved weekly time grid.
//!
//! A class-scoped [`TimeConfigRow`] wins over a department-scoped one, which wins over the
//! built-in defaults. Working days are clamped to `5..=6` and periods per day to at most
//! [`MAX_PERIODS_PER_DAY`].

use crate::data::{ClassId, DayIndex, DepartmentId, PeriodIndex, TimeConfigRow};
use serde::Serialize;

pub const DEFAULT_WORKING_DAYS: u32 = 6;
pub const DEFAULT_PERIODS_PER_DAY: u32 = 8;
pub const MAX_PERIODS_PER_DAY: u32 = 16;
pub const DEFAULT_LECTURE_MINUTES: u32 = 60;
pub const DEFAULT_LAB_MINUTES: u32 = 120;

pub const DAY_NAMES: [&str; 6] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// A (day, period) coordinate in the weekly grid.
pub type Slot = (DayIndex, PeriodIndex);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeConfig {
    pub working_days: u32,
    pub periods_per_day: u32,
    pub lecture_minutes: u32,
    pub lab_minutes: u32,
    pub short_break: Option<PeriodIndex>,
    pub lunch_break: Option<PeriodIndex>,
    pub allow_subject_twice_in_day: bool,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self::from_row(&TimeConfigRow::default())
    }
}

// zero is treated as unset, as stored rows use it for "not configured"
fn positive(value: Option<u32>) -> Option<u32> {
    value.filter(|v| *v > 0)
}

impl TimeConfig {
    pub fn from_row(row: &TimeConfigRow) -> Self {
        Self {
            working_days: positive(row.working_days)
                .unwrap_or(DEFAULT_WORKING_DAYS)
                .clamp(5, 6),
            periods_per_day: positive(row.periods_per_day)
                .unwrap_or(DEFAULT_PERIODS_PER_DAY)
                .min(MAX_PERIODS_PER_DAY),
            lecture_minutes: positive(row.lecture_minutes).unwrap_or(DEFAULT_LECTURE_MINUTES),
            lab_minutes: positive(row.lab_minutes).unwrap_or(DEFAULT_LAB_MINUTES),
            short_break: row.short_break_after_period,
            lunch_break: row.lunch_break_after_period,
            allow_subject_twice_in_day: row.allow_subject_twice_in_day.unwrap_or(false),
        }
    }

    /// Picks the first row scoped to `class_id`, else the first row scoped to `department_id`,
    /// else the defaults.
    pub fn resolve(
        rows: &[TimeConfigRow],
        class_id: ClassId,
        department_id: Option<DepartmentId>,
    ) -> Self {
        let by_class = rows.iter().find(|r| r.class_id == Some(class_id));
        let by_department = || {
            department_id.and_then(|dept| rows.iter().find(|r| r.department_id == Some(dept)))
        };
        by_class
            .or_else(by_department)
            .map(Self::from_row)
            .unwrap_or_default()
    }

    pub fn is_break(&self, period: PeriodIndex) -> bool {
        self.short_break == Some(period) || self.lunch_break == Some(period)
    }

    /// Periods per lab session: lab minutes over lecture minutes, floored, at least 1.
    pub fn lab_session_length(&self) -> u32 {
        (self.lab_minutes / self.lecture_minutes.max(1)).max(1)
    }

    /// Whether a session of `span` periods may start at `period`: it must fit in the day and
    /// none of its periods may be a break.
    pub fn fits(&self, period: PeriodIndex, span: u32) -> bool {
        let end = period + span;
        end <= self.periods_per_day && (period..end).all(|p| !self.is_break(p))
    }

    pub fn contains(&self, (day, period): Slot) -> bool {
        day < self.working_days && period < self.periods_per_day
    }

    /// All slots of the week, day-major and period-minor.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        (0..self.working_days)
            .flat_map(move |day| (0..self.periods_per_day).map(move |period| (day, period)))
    }

    pub fn day_names(&self) -> Vec<String> {
        DAY_NAMES
            .iter()
            .take(self.working_days as usize)
            .map(|d| d.to_string())
            .collect()
    }
}
