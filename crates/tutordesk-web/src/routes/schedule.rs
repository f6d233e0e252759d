use std::sync::Arc;

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use tutordesk_core::grid::{self, WeekGrid};
use tutordesk_core::history::ActivityEvent;
use tutordesk_core::model::{weekday_name, AvailabilitySlot, DayKey, TimeOfDay, WEEKDAYS};

use super::{redirect_error, redirect_notice};
use crate::error::AppError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/schedule", get(show_schedule))
        .route("/schedule/slots", post(add_slot))
        .route("/schedule/slots/{index}/delete", post(remove_slot))
        .route("/schedule/create", get(create_form).post(create_slot))
}

// -- View models --

struct SlotView {
    index: usize,
    day: String,
    start: String,
    end: String,
    recurring: bool,
}

impl SlotView {
    fn new(index: usize, slot: &AvailabilitySlot) -> Self {
        Self {
            index,
            day: slot.day.label(),
            start: slot.start.to_string(),
            end: slot.end.to_string(),
            recurring: slot.day.is_recurring(),
        }
    }
}

struct CellView {
    available: bool,
    /// Student name, only on the first row a session covers.
    session_label: String,
    session_id: String,
    booked: bool,
}

struct RowView {
    time: String,
    cells: Vec<CellView>,
}

fn grid_rows(grid: &WeekGrid) -> Vec<RowView> {
    grid.rows
        .iter()
        .map(|row| RowView {
            time: row.time.to_string(),
            cells: row
                .cells
                .iter()
                .map(|cell| CellView {
                    available: cell.available,
                    booked: cell.session.is_some(),
                    session_id: cell
                        .session
                        .as_ref()
                        .map(|s| s.id.clone())
                        .unwrap_or_default(),
                    session_label: match (&cell.session, cell.session_starts) {
                        (Some(s), true) => format!("{} · {}", s.student_name, s.subject),
                        _ => String::new(),
                    },
                })
                .collect(),
        })
        .collect()
}

#[derive(Template)]
#[template(path = "schedule.html")]
struct ScheduleTemplate {
    week: String,
    week_label: String,
    prev_week: String,
    next_week: String,
    days: Vec<String>,
    rows: Vec<RowView>,
    slots: Vec<SlotView>,
    weekdays: Vec<&'static str>,
    notice: Option<String>,
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "create_schedule.html")]
struct CreateScheduleTemplate {
    date: String,
    times: Vec<String>,
    slots: Vec<SlotView>,
    error: Option<String>,
}

// -- Params --

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleParams {
    #[serde(default)]
    week: Option<String>,
    #[serde(default)]
    notice: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlotForm {
    day: String,
    start: String,
    end: String,
    #[serde(default)]
    week: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DraftForm {
    date: String,
    /// Checkbox: present as `on` when ticked.
    #[serde(default)]
    recurring: Option<String>,
    start: String,
    end: String,
}

#[derive(Debug, Default, Deserialize)]
struct CreateParams {
    #[serde(default)]
    error: Option<String>,
}

// -- Handlers --

async fn show_schedule(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScheduleParams>,
) -> Result<Html<String>, AppError> {
    let today = chrono::Local::now().date_naive();
    let anchor = params
        .week
        .as_deref()
        .and_then(|w| NaiveDate::parse_from_str(w, "%Y-%m-%d").ok())
        .unwrap_or(today);
    let week_start = grid::week_start_of(anchor);

    let sessions = state.sessions.scheduled().await;
    let availability = state
        .availability
        .lock()
        .map_err(|e| anyhow::anyhow!("availability lock poisoned: {e}"))?
        .slots()
        .to_vec();

    let week = grid::resolve_week(
        week_start,
        &state.config.schedule.time_slots(),
        &sessions,
        &availability,
    );

    let tmpl = ScheduleTemplate {
        week: week_start.to_string(),
        week_label: format!("Week of {}", week_start.format("%b %-d, %Y")),
        prev_week: grid::previous_week(week_start).to_string(),
        next_week: grid::next_week(week_start).to_string(),
        days: week.days.iter().map(|d| d.label()).collect(),
        rows: grid_rows(&week),
        slots: availability
            .iter()
            .enumerate()
            .map(|(i, s)| SlotView::new(i, s))
            .collect(),
        weekdays: WEEKDAYS.map(weekday_name).to_vec(),
        notice: params.notice,
        error: params.error,
    };
    Ok(Html(tmpl.render()?))
}

fn schedule_path(week: Option<&str>) -> String {
    match week.filter(|w| NaiveDate::parse_from_str(w, "%Y-%m-%d").is_ok()) {
        Some(w) => format!("/schedule?week={w}"),
        None => "/schedule".to_string(),
    }
}

async fn add_slot(State(state): State<Arc<AppState>>, Form(form): Form<SlotForm>) -> Response {
    let back = schedule_path(form.week.as_deref());

    let parsed = form.day.parse::<DayKey>().and_then(|day| {
        let start: TimeOfDay = form.start.parse()?;
        let end: TimeOfDay = form.end.parse()?;
        Ok(AvailabilitySlot::new(day, start, end))
    });
    let slot = match parsed {
        Ok(slot) => slot,
        Err(e) => return redirect_error(&back, &e.to_string()).into_response(),
    };

    let result = match state.availability.lock() {
        Ok(mut manager) => manager.add_slot(slot.clone()),
        Err(e) => return redirect_error(&back, &format!("availability unavailable: {e}")).into_response(),
    };

    match result {
        Ok(()) => {
            state.history.log(&ActivityEvent::slot_added(&slot));
            redirect_notice(&back, &format!("Availability added for {}", slot.day.label()))
                .into_response()
        }
        Err(e) => redirect_error(&back, &e.to_string()).into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct RemoveForm {
    #[serde(default)]
    week: Option<String>,
}

async fn remove_slot(
    State(state): State<Arc<AppState>>,
    Path(index): Path<i64>,
    Form(form): Form<RemoveForm>,
) -> Response {
    let back = schedule_path(form.week.as_deref());

    let result = match state.availability.lock() {
        Ok(mut manager) => manager.remove_slot(index),
        Err(e) => return redirect_error(&back, &format!("availability unavailable: {e}")).into_response(),
    };

    match result {
        Ok(slot) => {
            state.history.log(&ActivityEvent::slot_removed(&slot));
            redirect_notice(&back, "Availability slot removed").into_response()
        }
        Err(e) => redirect_error(&back, &e.to_string()).into_response(),
    }
}

/// Half-hour choices offered by the create-schedule editor.
fn editor_times() -> Vec<String> {
    match (TimeOfDay::from_hm(9, 0), TimeOfDay::from_hm(20, 30)) {
        (Some(start), Some(end)) => grid::time_slots(start, end, 30)
            .iter()
            .map(ToString::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

async fn create_form(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CreateParams>,
) -> Result<Html<String>, AppError> {
    let slots = state
        .availability
        .lock()
        .map_err(|e| anyhow::anyhow!("availability lock poisoned: {e}"))?
        .slots()
        .iter()
        .enumerate()
        .map(|(i, s)| SlotView::new(i, s))
        .collect();

    let tmpl = CreateScheduleTemplate {
        date: chrono::Local::now().date_naive().to_string(),
        times: editor_times(),
        slots,
        error: params.error,
    };
    Ok(Html(tmpl.render()?))
}

async fn create_slot(State(state): State<Arc<AppState>>, Form(form): Form<DraftForm>) -> Response {
    let recurring = form.recurring.is_some_and(|v| !v.is_empty() && v != "false");
    let parsed = NaiveDate::parse_from_str(form.date.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date: '{}'", form.date))
        .and_then(|date| {
            let start: TimeOfDay = form.start.parse().map_err(|e| format!("{e}"))?;
            let end: TimeOfDay = form.end.parse().map_err(|e| format!("{e}"))?;
            Ok((date, start, end))
        });
    let (date, start, end) = match parsed {
        Ok(v) => v,
        Err(msg) => return redirect_error("/schedule/create", &msg).into_response(),
    };

    let result = match state.availability.lock() {
        Ok(mut manager) => manager.add_draft(date, recurring, start, end),
        Err(e) => {
            return redirect_error("/schedule/create", &format!("availability unavailable: {e}"))
                .into_response()
        }
    };

    match result {
        Ok(slot) => {
            state.history.log(&ActivityEvent::slot_added(&slot));
            let back = format!("/schedule?week={}", grid::week_start_of(date));
            redirect_notice(&back, &format!("Availability added for {}", slot.day.label()))
                .into_response()
        }
        Err(e) => redirect_error("/schedule/create", &e.to_string()).into_response(),
    }
}
