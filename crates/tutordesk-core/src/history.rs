//! Append-only activity trail for tutor actions.
//!
//! Events are stored as JSONL at `~/.config/tutordesk/activity.jsonl`.
//! Each line is a self-contained [`ActivityEvent`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::model::{AvailabilitySlot, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    SlotAdded,
    SlotRemoved,
    SessionAccepted,
    ProfileUpdated,
}

impl std::fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SlotAdded => write!(f, "slot added"),
            Self::SlotRemoved => write!(f, "slot removed"),
            Self::SessionAccepted => write!(f, "session accepted"),
            Self::ProfileUpdated => write!(f, "profile updated"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: Uuid,
    pub action: ActivityAction,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(action: ActivityAction, summary: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            action,
            summary: summary.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn slot_added(slot: &AvailabilitySlot) -> Self {
        Self::new(
            ActivityAction::SlotAdded,
            format!("{} {}-{}", slot.day.label(), slot.start, slot.end),
        )
    }

    pub fn slot_removed(slot: &AvailabilitySlot) -> Self {
        Self::new(
            ActivityAction::SlotRemoved,
            format!("{} {}-{}", slot.day.label(), slot.start, slot.end),
        )
    }

    pub fn session_accepted(session: &Session) -> Self {
        Self::new(
            ActivityAction::SessionAccepted,
            format!(
                "{} with {} on {}",
                session.subject,
                session.student_name,
                session.date.format("%b %-d")
            ),
        )
    }
}

/// Append-only JSONL logger for activity events.
pub struct HistoryLogger {
    path: PathBuf,
    enabled: bool,
}

impl HistoryLogger {
    pub fn new(enabled: bool) -> Self {
        let path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tutordesk")
            .join("activity.jsonl");
        Self { path, enabled }
    }

    pub fn with_path(path: impl AsRef<Path>, enabled: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            enabled,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one JSON line. Failures are logged and swallowed.
    pub fn log(&self, event: &ActivityEvent) {
        if !self.enabled {
            return;
        }
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let line = match serde_json::to_string(event) {
            Ok(l) => l,
            Err(e) => {
                tracing::debug!("history: failed to serialize event: {e}");
                return;
            }
        };
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path);
        match file {
            Ok(mut f) => {
                let _ = writeln!(f, "{}", line);
            }
            Err(e) => {
                tracing::debug!("history: failed to open log: {e}");
            }
        }
    }

    /// The N most recent events, newest first.
    pub fn recent(&self, limit: usize) -> Vec<ActivityEvent> {
        let mut events = self.read_all();
        events.reverse();
        events.truncate(limit);
        events
    }

    /// Every readable event in file order. Corrupt lines are skipped.
    pub fn read_all(&self) -> Vec<ActivityEvent> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        contents
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}
