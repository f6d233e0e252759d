use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::slot::TimeOfDay;
use crate::error::{Result, TutordeskError};

/// A tutoring engagement as shown in the sessions list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub student_name: String,
    pub subject: String,
    pub topic: String,
    pub date: NaiveDate,
    /// Free-text range as entered, e.g. `15:30 - 16:30` or `3:30 PM - 4:30 PM`.
    pub time: String,
    pub status: SessionStatus,
    pub notes: String,
    pub communication_mode: CommunicationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<SessionFeedback>,
}

impl Session {
    /// `pending → upcoming`. Every other status is rejected.
    pub fn accept(&mut self) -> Result<()> {
        if self.status != SessionStatus::Pending {
            return Err(TutordeskError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
            });
        }
        self.status = SessionStatus::Upcoming;
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.status == SessionStatus::Pending
    }

    pub fn is_upcoming(&self) -> bool {
        self.status == SessionStatus::Upcoming
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// Case-insensitive substring match on student name, subject or topic.
    /// An empty query matches everything.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.student_name.to_lowercase().contains(&query)
            || self.subject.to_lowercase().contains(&query)
            || self.topic.to_lowercase().contains(&query)
    }

    pub fn time_range(&self) -> Option<(TimeOfDay, TimeOfDay)> {
        parse_time_range(&self.time)
    }

    /// Placement on the weekly grid, if the time text parses as a range.
    pub fn scheduled(&self) -> Option<ScheduledSession> {
        let (start, end) = self.time_range()?;
        Some(ScheduledSession {
            id: self.id.clone(),
            student_name: self.student_name.clone(),
            date: self.date,
            start,
            end,
            subject: self.subject.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Upcoming,
    Pending,
    Completed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upcoming => write!(f, "upcoming"),
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "upcoming" => Ok(Self::Upcoming),
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("unknown session status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationMode {
    Text,
    Voice,
    Video,
}

impl std::fmt::Display for CommunicationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Voice => write!(f, "voice"),
            Self::Video => write!(f, "video"),
        }
    }
}

impl std::str::FromStr for CommunicationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "voice" => Ok(Self::Voice),
            "video" => Ok(Self::Video),
            _ => Err(format!("unknown communication mode: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFeedback {
    pub rating: u8,
    pub comment: String,
}

/// Tab selector on the sessions page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusTab {
    #[default]
    All,
    Only(SessionStatus),
}

impl StatusTab {
    pub fn admits(&self, status: SessionStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(s) => *s == status,
        }
    }
}

impl std::fmt::Display for StatusTab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Only(status) => write!(f, "{status}"),
        }
    }
}

impl std::str::FromStr for StatusTab {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse().map(Self::Only)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub query: String,
    pub tab: StatusTab,
}

impl SessionFilter {
    pub fn matches(&self, session: &Session) -> bool {
        self.tab.admits(session.status) && session.matches_query(&self.query)
    }
}

/// A session placed on the weekly availability grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledSession {
    pub id: String,
    pub student_name: String,
    pub date: NaiveDate,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub subject: String,
}

impl ScheduledSession {
    /// `date` matches exactly and `time ∈ [start, end)`.
    pub fn occupies(&self, date: NaiveDate, time: TimeOfDay) -> bool {
        self.date == date && self.start <= time && time < self.end
    }
}

/// Parse `HH:MM - HH:MM` or `h:mm AM - h:mm PM` into a start/end pair.
pub fn parse_time_range(text: &str) -> Option<(TimeOfDay, TimeOfDay)> {
    let (start, end) = text.split_once('-')?;
    Some((parse_clock(start)?, parse_clock(end)?))
}

fn parse_clock(raw: &str) -> Option<TimeOfDay> {
    let raw = raw.trim();
    let upper = raw.to_uppercase();
    if upper.ends_with("AM") || upper.ends_with("PM") {
        NaiveTime::parse_from_str(&upper, "%I:%M %p")
            .or_else(|_| NaiveTime::parse_from_str(&upper, "%I:%M%p"))
            .ok()
            .map(TimeOfDay::from)
    } else {
        NaiveTime::parse_from_str(raw, "%H:%M")
            .ok()
            .map(TimeOfDay::from)
    }
}

// -- Remote rows --

/// A session row as stored in the hosted `sessions` table (snake_case columns).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: String,
    pub student_name: String,
    pub subject: String,
    #[serde(default)]
    pub topic: String,
    pub date: String,
    #[serde(default)]
    pub time: String,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub communication_mode: String,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl TryFrom<SessionRow> for Session {
    type Error = TutordeskError;

    fn try_from(row: SessionRow) -> Result<Self> {
        let status = row
            .status
            .parse::<SessionStatus>()
            .map_err(TutordeskError::InvalidInput)?;
        let communication_mode = row
            .communication_mode
            .parse::<CommunicationMode>()
            .map_err(TutordeskError::InvalidInput)?;
        let date = NaiveDate::parse_from_str(row.date.trim(), "%Y-%m-%d").map_err(|_| {
            TutordeskError::InvalidInput(format!("invalid session date: {}", row.date))
        })?;
        let feedback = match row.rating {
            Some(rating) if (1..=5).contains(&rating) => Some(SessionFeedback {
                rating,
                comment: row.feedback.unwrap_or_default(),
            }),
            Some(rating) => {
                return Err(TutordeskError::InvalidInput(format!(
                    "rating must be between 1 and 5, got {rating}"
                )))
            }
            None => None,
        };

        Ok(Session {
            id: row.id,
            student_name: row.student_name,
            subject: row.subject,
            topic: row.topic,
            date,
            time: row.time,
            status,
            notes: row.notes.unwrap_or_default(),
            communication_mode,
            feedback,
        })
    }
}
