use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::grid::week_start_of;
use crate::model::Session;

/// Sessions on one day of the calendar view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub sessions: Vec<Session>,
}

/// The Monday-start week containing `anchor`, seven days, with each day's
/// sessions in their original order.
pub fn week_view(sessions: &[Session], anchor: NaiveDate) -> Vec<CalendarDay> {
    let monday = week_start_of(anchor);
    (0..7)
        .filter_map(|offset| monday.checked_add_days(Days::new(offset)))
        .map(|date| CalendarDay {
            date,
            sessions: sessions.iter().filter(|s| s.date == date).cloned().collect(),
        })
        .collect()
}
