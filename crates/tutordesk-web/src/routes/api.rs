use std::sync::{Arc, MutexGuard};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tutordesk_core::analytics::{self, DashboardSummary, SessionAnalytics};
use tutordesk_core::availability::AvailabilityManager;
use tutordesk_core::calendar::{self, CalendarDay};
use tutordesk_core::grid::{self, WeekGrid};
use tutordesk_core::history::{ActivityAction, ActivityEvent};
use tutordesk_core::model::*;
use tutordesk_core::storage::Storage;

use crate::error::ApiError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/slots", get(list_slots).post(add_slot))
        .route("/api/v1/slots/draft", post(add_draft))
        .route("/api/v1/slots/{index}", delete(remove_slot))
        .route("/api/v1/week", get(week))
        .route("/api/v1/sessions", get(list_sessions))
        .route("/api/v1/sessions/refresh", post(refresh_sessions))
        .route("/api/v1/sessions/{id}", get(get_session))
        .route("/api/v1/sessions/{id}/accept", post(accept_session))
        .route("/api/v1/calendar", get(calendar_week))
        .route("/api/v1/analytics", get(session_analytics))
        .route("/api/v1/dashboard", get(dashboard))
        .route("/api/v1/profile", get(get_profile).put(update_profile))
        .route("/api/v1/history", get(history))
}

// -- Request/Response types --

#[derive(Debug, Deserialize)]
pub struct SlotRequest {
    pub day: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub date: String,
    #[serde(default)]
    pub recurring: bool,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Serialize)]
pub struct IndexedSlot {
    pub index: usize,
    #[serde(flatten)]
    pub slot: AvailabilitySlot,
}

#[derive(Debug, Deserialize)]
pub struct WeekParams {
    pub start: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionListParams {
    pub q: Option<String>,
    pub tab: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarParams {
    pub week: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn parse_date(raw: Option<&str>) -> Result<NaiveDate, ApiError> {
    match raw {
        None => Ok(today()),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|_| ApiError::bad_request(format!("invalid date: '{s}'"))),
    }
}

fn availability(state: &AppState) -> Result<MutexGuard<'_, AvailabilityManager<Storage>>, ApiError> {
    state
        .availability
        .lock()
        .map_err(|e| ApiError::internal(format!("availability lock poisoned: {e}")))
}

// -- Availability --

async fn list_slots(State(state): State<Arc<AppState>>) -> Result<Json<Vec<IndexedSlot>>, ApiError> {
    let manager = availability(&state)?;
    let slots = manager
        .slots()
        .iter()
        .cloned()
        .enumerate()
        .map(|(index, slot)| IndexedSlot { index, slot })
        .collect();
    Ok(Json(slots))
}

async fn add_slot(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SlotRequest>,
) -> Result<Response, ApiError> {
    let slot = AvailabilitySlot::new(req.day.parse()?, req.start.parse()?, req.end.parse()?);
    availability(&state)?.add_slot(slot.clone())?;
    state.history.log(&ActivityEvent::slot_added(&slot));
    Ok((StatusCode::CREATED, Json(slot)).into_response())
}

async fn add_draft(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DraftRequest>,
) -> Result<Response, ApiError> {
    let date = parse_date(Some(&req.date))?;
    let (start, end): (TimeOfDay, TimeOfDay) = (req.start.parse()?, req.end.parse()?);
    let slot = availability(&state)?.add_draft(date, req.recurring, start, end)?;
    state.history.log(&ActivityEvent::slot_added(&slot));
    Ok((StatusCode::CREATED, Json(slot)).into_response())
}

async fn remove_slot(
    State(state): State<Arc<AppState>>,
    Path(index): Path<i64>,
) -> Result<Json<AvailabilitySlot>, ApiError> {
    let removed = availability(&state)?.remove_slot(index)?;
    state.history.log(&ActivityEvent::slot_removed(&removed));
    Ok(Json(removed))
}

async fn week(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WeekParams>,
) -> Result<Json<WeekGrid>, ApiError> {
    let week_start = grid::week_start_of(parse_date(params.start.as_deref())?);
    let sessions = state.sessions.scheduled().await;
    let slots = availability(&state)?.slots().to_vec();
    Ok(Json(grid::resolve_week(
        week_start,
        &state.config.schedule.time_slots(),
        &sessions,
        &slots,
    )))
}

// -- Sessions --

async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SessionListParams>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let tab: StatusTab = params
        .tab
        .as_deref()
        .unwrap_or("all")
        .parse()
        .map_err(ApiError::bad_request)?;
    let filter = SessionFilter {
        query: params.q.unwrap_or_default(),
        tab,
    };
    Ok(Json(state.sessions.filtered(&filter).await))
}

async fn refresh_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let count = state.sessions.refresh().await?;
    Ok(Json(serde_json::json!({ "sessions": count })))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.sessions.get(&id).await?))
}

async fn accept_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let session = state.sessions.accept(&id).await?;
    state.history.log(&ActivityEvent::session_accepted(&session));
    Ok(Json(session))
}

async fn calendar_week(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CalendarParams>,
) -> Result<Json<Vec<CalendarDay>>, ApiError> {
    let anchor = parse_date(params.week.as_deref())?;
    let sessions = state.sessions.snapshot().await;
    Ok(Json(calendar::week_view(&sessions, anchor)))
}

async fn session_analytics(State(state): State<Arc<AppState>>) -> Json<SessionAnalytics> {
    let sessions = state.sessions.snapshot().await;
    Json(analytics::analyze(&sessions, today()))
}

async fn dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardSummary> {
    let sessions = state.sessions.snapshot().await;
    Json(analytics::dashboard(&sessions, today()))
}

// -- Profile & history --

async fn get_profile(State(state): State<Arc<AppState>>) -> Json<TutorProfile> {
    Json(state.profiles.load())
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<TutorProfile>, ApiError> {
    let profile = state.profiles.update(update)?;
    state.history.log(&ActivityEvent::new(
        ActivityAction::ProfileUpdated,
        profile.name.clone(),
    ));
    Ok(Json(profile))
}

async fn history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Json<Vec<ActivityEvent>> {
    Json(state.history.recent(params.limit.unwrap_or(20)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;
    use tutordesk_core::remote::Source;
    use tutordesk_core::storage::KvStore;

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_slot_lifecycle() {
        let state = loaded_state().await;
        let slot = serde_json::json!({"day": "Monday", "start": "09:00", "end": "10:00"});
        let resp = test_router(state.clone())
            .oneshot(json_request("POST", "/api/v1/slots", slot))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        // adjacent is fine
        let next = serde_json::json!({"day": "Monday", "start": "10:00", "end": "11:00"});
        let resp = test_router(state.clone())
            .oneshot(json_request("POST", "/api/v1/slots", next))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = test_router(state.clone())
            .oneshot(get("/api/v1/slots"))
            .await
            .unwrap();
        let json = body_json(resp.into_body()).await;
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[1]["index"], 1);
        assert_eq!(json[1]["start"], "10:00");

        let resp = test_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/v1/slots/0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let removed = body_json(resp.into_body()).await;
        assert_eq!(removed["start"], "09:00");
        assert_eq!(state.availability.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_slot_validation_statuses() {
        let state = loaded_state().await;
        let inverted = serde_json::json!({"day": "Monday", "start": "10:00", "end": "09:00"});
        let resp = test_router(state.clone())
            .oneshot(json_request("POST", "/api/v1/slots", inverted))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let base = serde_json::json!({"day": "Monday", "start": "09:00", "end": "10:00"});
        test_router(state.clone())
            .oneshot(json_request("POST", "/api/v1/slots", base))
            .await
            .unwrap();
        let inner = serde_json::json!({"day": "Monday", "start": "09:30", "end": "09:45"});
        let resp = test_router(state.clone())
            .oneshot(json_request("POST", "/api/v1/slots", inner))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let unpadded = serde_json::json!({"day": "Monday", "start": "9:00", "end": "10:00"});
        let resp = test_router(state.clone())
            .oneshot(json_request("POST", "/api/v1/slots", unpadded))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        for index in ["-1", "1"] {
            let resp = test_router(state.clone())
                .oneshot(
                    Request::builder()
                        .method("DELETE")
                        .uri(format!("/api/v1/slots/{index}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn test_persisted_blob_matches_slots() {
        let (state, store) = test_state_with_store();
        let slot = serde_json::json!({"day": "2023-10-10", "start": "14:00", "end": "15:30"});
        test_router(state.clone())
            .oneshot(json_request("POST", "/api/v1/slots", slot))
            .await
            .unwrap();
        let blob = store.get("tutorAvailability").unwrap().unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&blob).unwrap(),
            serde_json::json!([{"day": "2023-10-10", "start": "14:00", "end": "15:30"}])
        );

        store.set_fail_writes(true);
        let resp = test_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/v1/slots/0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(state.availability.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_draft_recurring() {
        let state = loaded_state().await;
        let draft = serde_json::json!({
            "date": "2023-10-11", "recurring": true, "start": "09:00", "end": "10:00"
        });
        let resp = test_router(state)
            .oneshot(json_request("POST", "/api/v1/slots/draft", draft))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["day"], "Wednesday");
    }

    #[tokio::test]
    async fn test_week_grid() {
        let state = loaded_state().await;
        let slot = serde_json::json!({"day": "Tuesday", "start": "09:00", "end": "11:00"});
        test_router(state.clone())
            .oneshot(json_request("POST", "/api/v1/slots", slot))
            .await
            .unwrap();
        let resp = test_router(state)
            .oneshot(get("/api/v1/week?start=2023-10-12"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["days"][0]["date"], "2023-10-09");
        assert_eq!(json["rows"].as_array().unwrap().len(), 10);
        // Tuesday 09:00 and 10:00 available, 11:00 not
        assert_eq!(json["rows"][0]["cells"][1]["available"], true);
        assert_eq!(json["rows"][1]["cells"][1]["available"], true);
        assert_eq!(json["rows"][2]["cells"][1]["available"], false);
    }

    #[tokio::test]
    async fn test_week_bad_date() {
        let resp = test_router(loaded_state().await)
            .oneshot(get("/api/v1/week?start=10/12/2023"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sessions_filtering() {
        let app = test_router(loaded_state().await);
        let resp = app
            .oneshot(get("/api/v1/sessions?tab=completed&q=PHYS"))
            .await
            .unwrap();
        let json = body_json(resp.into_body()).await;
        let names: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["studentName"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Taylor Smith"]);
    }

    #[tokio::test]
    async fn test_sessions_unknown_tab() {
        let resp = test_router(loaded_state().await)
            .oneshot(get("/api/v1/sessions?tab=cancelled"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_accept_changes_only_status() {
        let state = loaded_state().await;
        let before = state.sessions.get("3").await.unwrap();
        let resp = test_router(state.clone())
            .oneshot(json_request("POST", "/api/v1/sessions/3/accept", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let after = state.sessions.get("3").await.unwrap();
        assert_eq!(after.status, tutordesk_core::model::SessionStatus::Upcoming);
        assert_eq!(
            tutordesk_core::model::Session {
                status: before.status,
                ..after
            },
            before
        );

        // second accept is an invalid transition
        let resp = test_router(state)
            .oneshot(json_request("POST", "/api/v1/sessions/3/accept", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_accept_remote_down_is_502() {
        let state = loaded_state().await;
        if let Source::Memory(source) = state.sessions.source() {
            source.set_offline(true);
        }
        let resp = test_router(state.clone())
            .oneshot(json_request("POST", "/api/v1/sessions/4/accept", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert!(state.sessions.get("4").await.unwrap().is_pending());
    }

    #[tokio::test]
    async fn test_unknown_session_404() {
        let resp = test_router(loaded_state().await)
            .oneshot(get("/api/v1/sessions/999"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp.into_body()).await;
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_refresh_counts_sessions() {
        let resp = test_router(test_app_state())
            .oneshot(json_request("POST", "/api/v1/sessions/refresh", serde_json::json!({})))
            .await
            .unwrap();
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["sessions"], 7);
    }

    #[tokio::test]
    async fn test_analytics_and_dashboard() {
        let state = loaded_state().await;
        let json = body_json(
            test_router(state.clone())
                .oneshot(get("/api/v1/analytics"))
                .await
                .unwrap()
                .into_body(),
        )
        .await;
        assert_eq!(json["completed"], 3);
        assert_eq!(json["unique_students"], 3);
        assert_eq!(json["monthly_active"].as_array().unwrap().len(), 5);

        let json = body_json(
            test_router(state)
                .oneshot(get("/api/v1/dashboard"))
                .await
                .unwrap()
                .into_body(),
        )
        .await;
        assert_eq!(json["pending"], 2);
        assert_eq!(json["next_sessions"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_calendar_has_seven_days() {
        let json = body_json(
            test_router(loaded_state().await)
                .oneshot(get("/api/v1/calendar?week=2023-10-11"))
                .await
                .unwrap()
                .into_body(),
        )
        .await;
        let days = json.as_array().unwrap();
        assert_eq!(days.len(), 7);
        assert_eq!(days[0]["date"], "2023-10-09");
    }

    #[tokio::test]
    async fn test_profile_put_validates() {
        let state = test_app_state();
        let bad = serde_json::json!({
            "name": "S", "email": "sam@example.com", "phone": "555-0100",
            "location": "Austin", "bio": "Physics tutor", "hourly_rate": "$60"
        });
        let resp = test_router(state.clone())
            .oneshot(json_request("PUT", "/api/v1/profile", bad))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let good = serde_json::json!({
            "name": "Sam Rivera", "email": "sam@example.com", "phone": "555-0100",
            "location": "Austin", "bio": "Physics tutor", "accepting_students": true,
            "hourly_rate": "$60"
        });
        let resp = test_router(state.clone())
            .oneshot(json_request("PUT", "/api/v1/profile", good))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(
            test_router(state)
                .oneshot(get("/api/v1/profile"))
                .await
                .unwrap()
                .into_body(),
        )
        .await;
        assert_eq!(json["name"], "Sam Rivera");
        assert_eq!(json["hourlyRate"], "$60");
    }

    #[tokio::test]
    async fn test_history_empty_when_disabled() {
        let json = body_json(
            test_router(test_app_state())
                .oneshot(get("/api/v1/history?limit=5"))
                .await
                .unwrap()
                .into_body(),
        )
        .await;
        assert_eq!(json, serde_json::json!([]));
    }
}
