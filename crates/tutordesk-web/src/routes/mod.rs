pub mod api;
pub mod dashboard;
pub mod profile;
pub mod schedule;
pub mod sessions;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tutordesk_core::remote::SessionSource;

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .merge(dashboard::routes())
        .merge(schedule::routes())
        .merge(sessions::routes())
        .merge(profile::routes())
        .merge(api::routes())
        .fallback(not_found)
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let remote_ok = state.sessions.source().fetch_all().await.is_ok();
    let slots = state.availability.lock().map(|m| m.len()).ok();

    let status = if remote_ok && slots.is_some() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({
            "status": if status == StatusCode::OK { "ok" } else { "degraded" },
            "remote": if remote_ok { "connected" } else { "unavailable" },
            "remote_backend": state.config.remote.backend,
            "storage_backend": state.config.storage.backend,
            "availability_slots": slots,
        })),
    )
}

async fn not_found() -> Response {
    crate::error::not_found_page("Oops! Page not found").into_response()
}

/// Transient banner carried across a redirect as `?notice=` or `?error=`.
#[derive(Debug, Default, Deserialize)]
pub struct Flash {
    #[serde(default)]
    pub notice: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

pub fn redirect_notice(path: &str, message: &str) -> Redirect {
    redirect_flash(path, "notice", message)
}

pub fn redirect_error(path: &str, message: &str) -> Redirect {
    redirect_flash(path, "error", message)
}

fn redirect_flash(path: &str, key: &str, message: &str) -> Redirect {
    let query = serde_urlencoded::to_string([(key, message)]).unwrap_or_default();
    let sep = if path.contains('?') { '&' } else { '?' };
    Redirect::to(&format!("{path}{sep}{query}"))
}
