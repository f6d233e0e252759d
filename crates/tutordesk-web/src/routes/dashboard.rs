use std::sync::Arc;

use askama::Template;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tutordesk_core::analytics;

use super::sessions::SessionCard;
use super::Flash;
use crate::error::AppError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(landing))
        .route("/dashboard", get(dashboard))
}

#[derive(Template)]
#[template(path = "landing.html")]
struct LandingTemplate {
    tutor_name: String,
}

struct ActivityView {
    action: String,
    summary: String,
    when: String,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    tutor_name: String,
    completed: usize,
    pending: usize,
    overall_rating: String,
    next_sessions: Vec<SessionCard>,
    pending_requests: Vec<SessionCard>,
    recent_feedback: Vec<SessionCard>,
    activity: Vec<ActivityView>,
    remote_ok: bool,
    notice: Option<String>,
    error: Option<String>,
}

async fn landing(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let tmpl = LandingTemplate {
        tutor_name: state.profiles.load().name,
    };
    Ok(Html(tmpl.render()?))
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(flash): Query<Flash>,
) -> Result<Html<String>, AppError> {
    // A failed refresh still renders whatever was cached last.
    let remote_ok = match state.sessions.refresh().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("dashboard: session refresh failed: {e}");
            false
        }
    };

    let today = chrono::Local::now().date_naive();
    let sessions = state.sessions.snapshot().await;
    let summary = analytics::dashboard(&sessions, today);

    let activity = state
        .history
        .recent(5)
        .into_iter()
        .map(|e| ActivityView {
            action: e.action.to_string(),
            summary: e.summary,
            when: e
                .timestamp
                .with_timezone(&chrono::Local)
                .format("%b %-d, %H:%M")
                .to_string(),
        })
        .collect();

    let tmpl = DashboardTemplate {
        tutor_name: state.profiles.load().name,
        completed: summary.completed,
        pending: summary.pending,
        overall_rating: format!("{:.1}", summary.overall_rating),
        next_sessions: summary.next_sessions.iter().map(SessionCard::from).collect(),
        pending_requests: summary
            .pending_requests
            .iter()
            .map(SessionCard::from)
            .collect(),
        recent_feedback: summary
            .recent_feedback
            .iter()
            .map(SessionCard::from)
            .collect(),
        activity,
        remote_ok,
        notice: flash.notice,
        error: flash.error,
    };
    Ok(Html(tmpl.render()?))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use tutordesk_core::remote::Source;

    #[tokio::test]
    async fn test_landing() {
        let app = test_router(test_app_state());
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_string(resp.into_body()).await;
        assert!(html.contains("Emma Wilson"));
        assert!(html.contains("/dashboard"));
    }

    #[tokio::test]
    async fn test_dashboard_counts() {
        let app = test_router(test_app_state());
        let req = Request::builder()
            .uri("/dashboard")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_string(resp.into_body()).await;
        assert!(html.contains("Pending Requests"));
        assert!(html.contains("Emma Davis"));
        assert!(html.contains("4.7"));
    }

    #[tokio::test]
    async fn test_dashboard_renders_when_remote_down() {
        let state = loaded_state().await;
        if let Source::Memory(source) = state.sessions.source() {
            source.set_offline(true);
        }
        let app = test_router(state);
        let req = Request::builder()
            .uri("/dashboard")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_string(resp.into_body()).await;
        assert!(html.contains("could not be refreshed"));
        assert!(html.contains("Alex Johnson"));
    }
}
