//! Weekly grid resolution: for each (date, time) cell of one week, whether the
//! tutor is available and which session, if any, occupies it.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::Serialize;

use crate::model::{weekday_name, AvailabilitySlot, ScheduledSession, TimeOfDay};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekGrid {
    pub days: Vec<GridDay>,
    pub rows: Vec<GridRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridDay {
    pub date: NaiveDate,
    pub weekday: Weekday,
}

impl GridDay {
    /// `Monday` / `Oct 9`.
    pub fn label(&self) -> String {
        format!("{} {}", weekday_name(self.weekday), self.date.format("%b %-d"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridRow {
    pub time: TimeOfDay,
    pub cells: Vec<GridCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridCell {
    pub date: NaiveDate,
    pub time: TimeOfDay,
    pub available: bool,
    pub session: Option<ScheduledSession>,
    /// Set on the first row a session occupies in this column.
    pub session_starts: bool,
}

/// Resolve a week into rows of cells. Pure: same inputs, same grid.
pub fn resolve_week(
    week_start: NaiveDate,
    time_slots: &[TimeOfDay],
    sessions: &[ScheduledSession],
    availability: &[AvailabilitySlot],
) -> WeekGrid {
    let days: Vec<GridDay> = (0..7)
        .filter_map(|offset| week_start.checked_add_days(Days::new(offset)))
        .map(|date| GridDay {
            date,
            weekday: date.weekday(),
        })
        .collect();

    let mut rows: Vec<GridRow> = Vec::with_capacity(time_slots.len());
    for (row_index, &time) in time_slots.iter().enumerate() {
        let cells = days
            .iter()
            .enumerate()
            .map(|(col, day)| {
                let session = session_at(sessions, day.date, time).cloned();
                let session_starts = match &session {
                    Some(s) => row_index == 0 || {
                        let above = &rows[row_index - 1].cells[col].session;
                        above.as_ref().map(|a| &a.id) != Some(&s.id)
                    },
                    None => false,
                };
                GridCell {
                    date: day.date,
                    time,
                    available: is_available_at(availability, day.date, time),
                    session,
                    session_starts,
                }
            })
            .collect();
        rows.push(GridRow { time, cells });
    }

    WeekGrid { days, rows }
}

/// First session occupying `(date, time)`.
pub fn session_at(
    sessions: &[ScheduledSession],
    date: NaiveDate,
    time: TimeOfDay,
) -> Option<&ScheduledSession> {
    sessions.iter().find(|s| s.occupies(date, time))
}

pub fn is_available_at(slots: &[AvailabilitySlot], date: NaiveDate, time: TimeOfDay) -> bool {
    slots.iter().any(|s| s.day.matches(date) && s.covers(time))
}

/// Row times from `start` (inclusive) to `end` (exclusive) every `step_minutes`.
pub fn time_slots(start: TimeOfDay, end: TimeOfDay, step_minutes: u32) -> Vec<TimeOfDay> {
    if step_minutes == 0 {
        return Vec::new();
    }
    (start.minutes()..end.minutes())
        .step_by(step_minutes as usize)
        .filter_map(|m| TimeOfDay::from_hm(m / 60, m % 60))
        .collect()
}

/// Monday of the week containing `date`.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    let back = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(back)).unwrap_or(date)
}

pub fn previous_week(week_start: NaiveDate) -> NaiveDate {
    week_start
        .checked_sub_days(Days::new(7))
        .unwrap_or(week_start)
}

pub fn next_week(week_start: NaiveDate) -> NaiveDate {
    week_start
        .checked_add_days(Days::new(7))
        .unwrap_or(week_start)
}
