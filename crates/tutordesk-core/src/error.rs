use thiserror::Error;

use crate::model::{SessionStatus, TimeOfDay};

#[derive(Debug, Error)]
pub enum TutordeskError {
    #[error("end time {end} must be after start time {start}")]
    InvalidRange { start: TimeOfDay, end: TimeOfDay },

    #[error("slot {day} {start}-{end} overlaps with an existing availability")]
    OverlapConflict {
        day: String,
        start: TimeOfDay,
        end: TimeOfDay,
    },

    #[error("no availability slot at position {index} (have {len})")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("Failed to read persisted data: {0}")]
    PersistenceRead(String),

    #[error("Failed to fetch sessions: {0}")]
    RemoteFetch(String),

    #[error("Failed to update session: {0}")]
    RemoteUpdate(String),

    #[error("session {id} is {from} and cannot be accepted")]
    InvalidTransition { id: String, from: SessionStatus },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{context} returned {status}: {body}")]
    HttpStatus {
        context: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TutordeskError {
    /// Returns `true` when the error is likely transient and worth retrying
    /// (HTTP 429/5xx, network timeouts, connection refused).
    pub fn is_transient(&self) -> bool {
        match self {
            // no status means the request never completed (connect, timeout, body)
            Self::Http(e) => e.status().map_or(true, is_transient_status),
            Self::HttpStatus { status, .. } => is_transient_status(*status),
            Self::RemoteFetch(msg) | Self::RemoteUpdate(msg) | Self::Storage(msg) => {
                is_transient_message(msg)
            }
            _ => false,
        }
    }
}

fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS
}

/// Network-level failures that arrive as text. Status codes are never read
/// from messages, they come from `HttpStatus`.
fn is_transient_message(msg: &str) -> bool {
    let msg_lower = msg.to_lowercase();
    [
        "timed out",
        "connection refused",
        "connection reset",
        "broken pipe",
        "temporarily unavailable",
    ]
    .iter()
    .any(|p| msg_lower.contains(p))
}

pub type Result<T> = std::result::Result<T, TutordeskError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(code: u16, body: &str) -> TutordeskError {
        TutordeskError::HttpStatus {
            context: "sessions".into(),
            status: reqwest::StatusCode::from_u16(code).unwrap(),
            body: body.into(),
        }
    }

    #[test]
    fn test_transient_status_codes() {
        assert!(status_error(503, "service unavailable").is_transient());
        assert!(status_error(429, "slow down").is_transient());
        assert!(!status_error(401, "bad key").is_transient());
    }

    #[test]
    fn test_client_error_body_with_digits_is_not_transient() {
        let err = status_error(404, r#"{"message":"row a500 not found, tried 503 times"}"#);
        assert!(err.to_string().contains("a500"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_transient_timeout() {
        let err = TutordeskError::RemoteUpdate("connection timed out".into());
        assert!(err.is_transient());
    }

    #[test]
    fn test_status_text_in_message_is_not_transient() {
        let err = TutordeskError::RemoteFetch("sessions returned 503: row a500".into());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_validation_errors_are_not_transient() {
        let err = TutordeskError::IndexOutOfRange { index: -1, len: 0 };
        assert!(!err.is_transient());
    }

    #[test]
    fn test_overlap_message_names_the_slot() {
        let err = TutordeskError::OverlapConflict {
            day: "Monday".into(),
            start: "09:30".parse().unwrap(),
            end: "09:45".parse().unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "slot Monday 09:30-09:45 overlaps with an existing availability"
        );
    }
}
