use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use tutordesk_core::error::TutordeskError;

/// Application error type that renders as an HTML error page.
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn core(&self) -> Option<&TutordeskError> {
        self.0.downcast_ref::<TutordeskError>()
    }

    /// Remote session source unreachable or rejecting requests.
    fn is_remote_unavailable(&self) -> bool {
        matches!(
            self.core(),
            Some(
                TutordeskError::RemoteFetch(_)
                    | TutordeskError::RemoteUpdate(_)
                    | TutordeskError::HttpStatus { .. }
            )
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self.core(), Some(TutordeskError::NotFound(_))) {
            return not_found_page(&format!("{:#}", self.0));
        }

        tracing::error!("web error: {:#}", self.0);

        if self.is_remote_unavailable() {
            let body = format!(
                r#"<!doctype html>
<html><head><title>Sessions Unavailable · Tutordesk</title>
<style>body{{font-family:system-ui;background:#f7f7fb;color:#222;display:flex;justify-content:center;align-items:center;height:100vh;margin:0}}
.box{{text-align:center;max-width:500px}}
h1{{font-size:2.2rem;color:#d97706;margin:0}}
p{{color:#666;margin:0.5rem 0}}
.retry{{margin-top:1.5rem}}
a{{color:#7c3aed;text-decoration:none;padding:0.5rem 1rem;border:1px solid #ddd;border-radius:8px}}</style>
</head><body><div class="box"><h1>Sessions Unavailable</h1>
<p>The session database could not be reached.</p><p><small>{}</small></p>
<div class="retry"><a href="javascript:location.reload()">Retry</a></div>
</div></body></html>"#,
                html_escape(&format!("{:#}", self.0))
            );
            return (StatusCode::BAD_GATEWAY, Html(body)).into_response();
        }

        let body = format!(
            r#"<!doctype html>
<html><head><title>Error</title>
<style>body{{font-family:system-ui;background:#f7f7fb;color:#222;display:flex;justify-content:center;align-items:center;height:100vh;margin:0}}
.err{{background:#fff;padding:2rem;border-radius:8px;border-left:4px solid #dc2626;max-width:600px}}
h1{{color:#dc2626;margin-top:0}}pre{{white-space:pre-wrap;color:#555}}</style>
</head><body><div class="err"><h1>Something went wrong</h1><pre>{}</pre>
<p><a href="/dashboard" style="color:#7c3aed">Back to dashboard</a></p></div></body></html>"#,
            html_escape(&format!("{:#}", self.0))
        );
        (StatusCode::INTERNAL_SERVER_ERROR, Html(body)).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub fn not_found_page(detail: &str) -> Response {
    let body = format!(
        r#"<!doctype html>
<html><head><title>404 · Tutordesk</title>
<style>body{{font-family:system-ui;background:#f7f7fb;color:#222;display:flex;justify-content:center;align-items:center;height:100vh;margin:0}}
.box{{text-align:center}}
h1{{font-size:4rem;color:#7c3aed;margin:0}}
p{{color:#666;margin:0.5rem 0 1.5rem}}
a{{color:#7c3aed;text-decoration:none;padding:0.5rem 1rem;border:1px solid #ddd;border-radius:8px}}</style>
</head><body><div class="box"><h1>404</h1><p>{}</p><a href="/">Return to home</a></div></body></html>"#,
        html_escape(detail)
    );
    (StatusCode::NOT_FOUND, Html(body)).into_response()
}

/// JSON API error type for REST endpoints.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.into(),
        }
    }

    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("api error: {:#}", err);
        Self::internal(format!("{:#}", err))
    }
}

impl From<TutordeskError> for ApiError {
    fn from(err: TutordeskError) -> Self {
        match &err {
            TutordeskError::InvalidRange { .. } | TutordeskError::InvalidInput(_) => {
                Self::bad_request(err.to_string())
            }
            TutordeskError::OverlapConflict { .. } | TutordeskError::InvalidTransition { .. } => {
                Self::conflict(err.to_string())
            }
            TutordeskError::IndexOutOfRange { .. } | TutordeskError::NotFound(_) => {
                Self::not_found(err.to_string())
            }
            TutordeskError::RemoteFetch(_)
            | TutordeskError::RemoteUpdate(_)
            | TutordeskError::Http(_)
            | TutordeskError::HttpStatus { .. } => {
                tracing::warn!("api remote error: {}", err);
                Self::bad_gateway(err.to_string())
            }
            _ => {
                tracing::error!("api error: {}", err);
                Self::internal(err.to_string())
            }
        }
    }
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
