use std::sync::Arc;

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;
use tutordesk_core::analytics::{self, SessionAnalytics};
use tutordesk_core::calendar;
use tutordesk_core::error::TutordeskError;
use tutordesk_core::grid;
use tutordesk_core::history::ActivityEvent;
use tutordesk_core::model::{Session, SessionFilter, StatusTab};

use super::{redirect_error, redirect_notice, Flash};
use crate::error::AppError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/{id}", get(show_session))
        .route("/sessions/{id}/accept", post(accept_session))
}

// -- View models --

/// Flattened session for templates.
pub(crate) struct SessionCard {
    pub id: String,
    pub student_name: String,
    pub subject: String,
    pub topic: String,
    pub date_label: String,
    pub time: String,
    pub status: String,
    pub mode: String,
    pub notes: String,
    pub is_pending: bool,
    pub rating: u8,
    pub feedback: String,
}

impl From<&Session> for SessionCard {
    fn from(s: &Session) -> Self {
        Self {
            id: s.id.clone(),
            student_name: s.student_name.clone(),
            subject: s.subject.clone(),
            topic: s.topic.clone(),
            date_label: s.date.format("%b %d, %Y").to_string(),
            time: s.time.clone(),
            status: s.status.to_string(),
            mode: s.communication_mode.to_string(),
            notes: s.notes.clone(),
            is_pending: s.is_pending(),
            rating: s.feedback.as_ref().map_or(0, |f| f.rating),
            feedback: s
                .feedback
                .as_ref()
                .map(|f| f.comment.clone())
                .unwrap_or_default(),
        }
    }
}

struct TabLink {
    name: String,
    label: String,
    count: usize,
    active: bool,
}

struct CalendarColumn {
    label: String,
    is_today: bool,
    sessions: Vec<SessionCard>,
}

struct StatRow {
    label: String,
    value: String,
}

#[derive(Template)]
#[template(path = "sessions/list.html")]
struct SessionListTemplate {
    query: String,
    /// `q=...`, already form-encoded for links.
    q_param: String,
    tab: String,
    view: String,
    tabs: Vec<TabLink>,
    sessions: Vec<SessionCard>,
    calendar: Vec<CalendarColumn>,
    week_label: String,
    prev_week: String,
    next_week: String,
    show_analytics: bool,
    analytics: AnalyticsView,
    notice: Option<String>,
    error: Option<String>,
}

struct AnalyticsView {
    completed: usize,
    overall_rating: String,
    unique_students: usize,
    per_subject: Vec<StatRow>,
    ratings: Vec<StatRow>,
    monthly_active: Vec<StatRow>,
}

impl From<SessionAnalytics> for AnalyticsView {
    fn from(a: SessionAnalytics) -> Self {
        Self {
            completed: a.completed,
            overall_rating: format!("{:.1}", a.overall_rating),
            unique_students: a.unique_students,
            per_subject: a
                .per_subject
                .into_iter()
                .map(|c| StatRow {
                    label: c.subject,
                    value: c.count.to_string(),
                })
                .collect(),
            ratings: a
                .ratings
                .into_iter()
                .map(|r| StatRow {
                    label: r.subject,
                    value: format!("{:.1}", r.rating),
                })
                .collect(),
            monthly_active: a
                .monthly_active
                .into_iter()
                .map(|m| StatRow {
                    label: m.month,
                    value: m.students.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "sessions/detail.html")]
struct SessionDetailTemplate {
    session: SessionCard,
    has_feedback: bool,
    /// Five glyphs, filled up to the rating.
    stars: String,
    notice: Option<String>,
    error: Option<String>,
}

// -- Query params --

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    tab: Option<String>,
    #[serde(default)]
    view: Option<String>,
    #[serde(default)]
    analytics: Option<bool>,
    #[serde(default)]
    week: Option<String>,
    #[serde(default)]
    notice: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

// -- Handlers --

async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Html<String>, AppError> {
    let query = params.q.unwrap_or_default();
    let tab: StatusTab = params
        .tab
        .as_deref()
        .unwrap_or("all")
        .parse()
        .unwrap_or_default();
    let view = match params.view.as_deref() {
        Some("calendar") => "calendar",
        _ => "list",
    };

    let all = state.sessions.snapshot().await;
    let filter = SessionFilter {
        query: query.clone(),
        tab,
    };
    let filtered: Vec<Session> = all.iter().filter(|s| filter.matches(s)).cloned().collect();

    let tabs = ["all", "upcoming", "pending", "completed"]
        .into_iter()
        .map(|name| {
            let tab_value: StatusTab = name.parse().unwrap_or_default();
            TabLink {
                name: name.to_string(),
                label: capitalize(name),
                count: all.iter().filter(|s| tab_value.admits(s.status)).count(),
                active: tab_value == tab,
            }
        })
        .collect();

    let today = chrono::Local::now().date_naive();
    let anchor = params
        .week
        .as_deref()
        .and_then(|w| NaiveDate::parse_from_str(w, "%Y-%m-%d").ok())
        .unwrap_or(today);
    let week_start = grid::week_start_of(anchor);
    let calendar = calendar::week_view(&filtered, anchor)
        .into_iter()
        .map(|day| CalendarColumn {
            label: day.date.format("%a %b %-d").to_string(),
            is_today: day.date == today,
            sessions: day.sessions.iter().map(SessionCard::from).collect(),
        })
        .collect();

    let tmpl = SessionListTemplate {
        q_param: serde_urlencoded::to_string([("q", query.as_str())]).unwrap_or_default(),
        query,
        tab: tab.to_string(),
        view: view.to_string(),
        tabs,
        sessions: filtered.iter().map(SessionCard::from).collect(),
        calendar,
        week_label: format!("Week of {}", week_start.format("%b %-d, %Y")),
        prev_week: grid::previous_week(week_start).to_string(),
        next_week: grid::next_week(week_start).to_string(),
        show_analytics: params.analytics.unwrap_or(false),
        analytics: analytics::analyze(&all, today).into(),
        notice: params.notice,
        error: params.error,
    };
    Ok(Html(tmpl.render()?))
}

async fn show_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(flash): Query<Flash>,
) -> Result<Html<String>, AppError> {
    let session = state.sessions.get(&id).await?;
    let rating = session.feedback.as_ref().map_or(0, |f| f.rating);
    let tmpl = SessionDetailTemplate {
        has_feedback: session.feedback.is_some(),
        stars: (1..=5).map(|i| if i <= rating { '★' } else { '☆' }).collect(),
        session: SessionCard::from(&session),
        notice: flash.notice,
        error: flash.error,
    };
    Ok(Html(tmpl.render()?))
}

#[derive(Debug, Default, Deserialize)]
struct AcceptForm {
    /// Where to send the user afterwards; defaults to the session page.
    #[serde(default)]
    back: Option<String>,
}

async fn accept_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    axum::Form(form): axum::Form<AcceptForm>,
) -> Response {
    let back = form
        .back
        .filter(|b| is_local_path(b))
        .unwrap_or_else(|| format!("/sessions/{id}"));

    match state.sessions.accept(&id).await {
        Ok(session) => {
            state.history.log(&ActivityEvent::session_accepted(&session));
            redirect_notice(&back, "Session accepted successfully!").into_response()
        }
        Err(TutordeskError::NotFound(msg)) => crate::error::not_found_page(&msg),
        Err(e) => redirect_error(&back, &e.to_string()).into_response(),
    }
}

/// Same-origin absolute path. `//host` and `/\host` are treated by browsers
/// as another origin.
fn is_local_path(target: &str) -> bool {
    target.starts_with('/')
        && !target.starts_with("//")
        && !target.starts_with("/\\")
        && !target.chars().any(char::is_control)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
