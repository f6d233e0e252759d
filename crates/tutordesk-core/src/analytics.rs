//! Aggregates over sessions for the analytics panel and the dashboard.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::model::Session;

/// How many months the active-students series covers, ending at the reference month.
pub const ACTIVE_MONTHS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectCount {
    pub subject: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectRating {
    pub subject: String,
    /// Rounded to one decimal.
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyActive {
    /// Three-letter month name, e.g. `Oct`.
    pub month: String,
    pub year: i32,
    pub students: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionAnalytics {
    pub completed: usize,
    pub overall_rating: f64,
    pub unique_students: usize,
    pub per_subject: Vec<SubjectCount>,
    pub ratings: Vec<SubjectRating>,
    pub monthly_active: Vec<MonthlyActive>,
}

/// Analyze completed sessions. `reference` picks the last month of the
/// active-students series.
pub fn analyze(sessions: &[Session], reference: NaiveDate) -> SessionAnalytics {
    let completed: Vec<&Session> = sessions.iter().filter(|s| s.is_completed()).collect();

    let mut per_subject: Vec<SubjectCount> = Vec::new();
    let mut rating_totals: Vec<(String, u32, u32)> = Vec::new();
    for session in &completed {
        match per_subject.iter_mut().find(|c| c.subject == session.subject) {
            Some(entry) => entry.count += 1,
            None => per_subject.push(SubjectCount {
                subject: session.subject.clone(),
                count: 1,
            }),
        }
        if let Some(feedback) = &session.feedback {
            let rating = u32::from(feedback.rating);
            match rating_totals.iter_mut().find(|(s, _, _)| *s == session.subject) {
                Some((_, total, count)) => {
                    *total += rating;
                    *count += 1;
                }
                None => rating_totals.push((session.subject.clone(), rating, 1)),
            }
        }
    }

    let ratings = rating_totals
        .into_iter()
        .map(|(subject, total, count)| SubjectRating {
            subject,
            rating: round1(f64::from(total) / f64::from(count)),
        })
        .collect();

    let unique_students = completed
        .iter()
        .map(|s| s.student_name.as_str())
        .collect::<HashSet<_>>()
        .len();

    SessionAnalytics {
        completed: completed.len(),
        overall_rating: overall_rating(sessions),
        unique_students,
        per_subject,
        ratings,
        monthly_active: monthly_active(&completed, reference),
    }
}

/// Sum of ratings over rated completed sessions divided by how many are
/// rated; 0 when none are.
pub fn overall_rating(sessions: &[Session]) -> f64 {
    let rated: Vec<u8> = sessions
        .iter()
        .filter(|s| s.is_completed())
        .filter_map(|s| s.feedback.as_ref().map(|f| f.rating))
        .collect();
    if rated.is_empty() {
        return 0.0;
    }
    let total: u32 = rated.iter().map(|r| u32::from(*r)).sum();
    f64::from(total) / rated.len() as f64
}

fn monthly_active(completed: &[&Session], reference: NaiveDate) -> Vec<MonthlyActive> {
    let (mut year, mut month) = (reference.year(), reference.month());
    let mut months = Vec::with_capacity(ACTIVE_MONTHS);
    for _ in 0..ACTIVE_MONTHS {
        months.push((year, month));
        if month == 1 {
            year -= 1;
            month = 12;
        } else {
            month -= 1;
        }
    }
    months.reverse();

    months
        .into_iter()
        .map(|(year, month)| {
            let students = completed
                .iter()
                .filter(|s| s.date.year() == year && s.date.month() == month)
                .map(|s| s.student_name.as_str())
                .collect::<HashSet<_>>()
                .len();
            MonthlyActive {
                month: month_abbrev(month).to_string(),
                year,
                students,
            }
        })
        .collect()
}

fn month_abbrev(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    NAMES
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("")
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// -- Dashboard --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub completed: usize,
    pub pending: usize,
    pub overall_rating: f64,
    /// Next three upcoming sessions from `today`, soonest first.
    pub next_sessions: Vec<Session>,
    pub pending_requests: Vec<Session>,
    /// Most recent rated sessions, newest first.
    pub recent_feedback: Vec<Session>,
}

pub fn dashboard(sessions: &[Session], today: NaiveDate) -> DashboardSummary {
    let mut next_sessions: Vec<Session> = sessions
        .iter()
        .filter(|s| s.is_upcoming() && s.date >= today)
        .cloned()
        .collect();
    next_sessions.sort_by_key(|s| (s.date, s.time_range().map(|(start, _)| start)));
    next_sessions.truncate(3);

    let pending_requests: Vec<Session> = sessions.iter().filter(|s| s.is_pending()).cloned().collect();

    let mut recent_feedback: Vec<Session> = sessions
        .iter()
        .filter(|s| s.is_completed() && s.feedback.is_some())
        .cloned()
        .collect();
    recent_feedback.sort_by(|a, b| b.date.cmp(&a.date));
    recent_feedback.truncate(3);

    DashboardSummary {
        completed: sessions.iter().filter(|s| s.is_completed()).count(),
        pending: pending_requests.len(),
        overall_rating: overall_rating(sessions),
        next_sessions,
        pending_requests,
        recent_feedback,
    }
}
