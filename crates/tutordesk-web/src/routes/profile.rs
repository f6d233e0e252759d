use std::sync::Arc;

use askama::Template;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;
use tutordesk_core::history::{ActivityAction, ActivityEvent};
use tutordesk_core::model::{ProfileUpdate, TutorProfile};

use super::{redirect_error, redirect_notice, Flash};
use crate::error::AppError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/profile", get(show_profile).post(update_profile))
}

#[derive(Template)]
#[template(path = "profile.html")]
struct ProfileTemplate {
    profile: TutorProfile,
    notice: Option<String>,
    error: Option<String>,
}

/// HTML form body. Checkboxes arrive as `on` or not at all.
#[derive(Debug, Deserialize)]
struct ProfileForm {
    name: String,
    email: String,
    phone: String,
    location: String,
    bio: String,
    #[serde(default)]
    accepting_students: Option<String>,
    hourly_rate: String,
}

impl From<ProfileForm> for ProfileUpdate {
    fn from(form: ProfileForm) -> Self {
        Self {
            name: form.name,
            email: form.email,
            phone: form.phone,
            location: form.location,
            bio: form.bio,
            accepting_students: form.accepting_students.is_some_and(|v| v != "false"),
            hourly_rate: form.hourly_rate,
        }
    }
}

async fn show_profile(
    State(state): State<Arc<AppState>>,
    Query(flash): Query<Flash>,
) -> Result<Html<String>, AppError> {
    let tmpl = ProfileTemplate {
        profile: state.profiles.load(),
        notice: flash.notice,
        error: flash.error,
    };
    Ok(Html(tmpl.render()?))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ProfileForm>,
) -> Response {
    match state.profiles.update(form.into()) {
        Ok(profile) => {
            state
                .history
                .log(&ActivityEvent::new(ActivityAction::ProfileUpdated, profile.name));
            redirect_notice("/profile", "Profile updated successfully").into_response()
        }
        Err(e) => redirect_error("/profile", &e.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/profile")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_profile_shows_default() {
        let app = test_router(test_app_state());
        let req = Request::builder()
            .uri("/profile")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_string(resp.into_body()).await;
        assert!(html.contains("emma.wilson@tutormail.com"));
        assert!(html.contains("Stanford University"));
    }

    #[tokio::test]
    async fn test_profile_update_persists() {
        let state = test_app_state();
        let resp = test_router(state.clone())
            .oneshot(post(
                "name=Sam+Rivera&email=sam%40example.com&phone=555-0100&location=Austin&bio=Physics+tutor+for+ten+years&hourly_rate=%2460",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert!(resp.headers()["location"]
            .to_str()
            .unwrap()
            .starts_with("/profile?notice="));
        let profile = state.profiles.load();
        assert_eq!(profile.name, "Sam Rivera");
        assert_eq!(profile.hourly_rate, "$60");
        assert!(!profile.accepting_students);
    }

    #[tokio::test]
    async fn test_profile_invalid_email_rejected() {
        let state = test_app_state();
        let resp = test_router(state.clone())
            .oneshot(post(
                "name=Sam&email=not-an-email&phone=555-0100&location=Austin&bio=Physics+tutor+for+ten+years&accepting_students=on&hourly_rate=%2460",
            ))
            .await
            .unwrap();
        assert!(resp.headers()["location"]
            .to_str()
            .unwrap()
            .starts_with("/profile?error="));
        assert_eq!(state.profiles.load().name, "Emma Wilson");
    }
}
