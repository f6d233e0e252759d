use chrono::{Days, NaiveDate};

use crate::model::{CommunicationMode, Session, SessionFeedback, SessionStatus};

struct Fixture {
    student: &'static str,
    subject: &'static str,
    topic: &'static str,
    /// Days from today; negative is in the past.
    offset: i64,
    time: &'static str,
    status: SessionStatus,
    notes: &'static str,
    mode: CommunicationMode,
    feedback: Option<(u8, &'static str)>,
}

const FIXTURES: &[Fixture] = &[
    Fixture {
        student: "Alex Johnson",
        subject: "Mathematics",
        topic: "Calculus - Derivatives",
        offset: 1,
        time: "15:30 - 16:30",
        status: SessionStatus::Upcoming,
        notes: "Student needs help with chain rule and implicit differentiation.",
        mode: CommunicationMode::Video,
        feedback: None,
    },
    Fixture {
        student: "Sarah Williams",
        subject: "Physics",
        topic: "Kinematics",
        offset: 1,
        time: "17:00 - 18:00",
        status: SessionStatus::Upcoming,
        notes: "Review of velocity and acceleration concepts.",
        mode: CommunicationMode::Video,
        feedback: None,
    },
    Fixture {
        student: "Emma Davis",
        subject: "Biology",
        topic: "Cell Structure",
        offset: 3,
        time: "16:00 - 17:00",
        status: SessionStatus::Pending,
        notes: "Student is preparing for a quiz on organelles.",
        mode: CommunicationMode::Text,
        feedback: None,
    },
    Fixture {
        student: "James Wilson",
        subject: "English Literature",
        topic: "Shakespeare - Macbeth",
        offset: 4,
        time: "15:30 - 16:30",
        status: SessionStatus::Pending,
        notes: "Essay structure and character analysis.",
        mode: CommunicationMode::Voice,
        feedback: None,
    },
    Fixture {
        student: "Michael Brown",
        subject: "Chemistry",
        topic: "Periodic Table",
        offset: -1,
        time: "14:15 - 15:15",
        status: SessionStatus::Completed,
        notes: "Went over electron configurations and periodic trends.",
        mode: CommunicationMode::Video,
        feedback: Some((
            5,
            "Excellent session! Really helped clarify difficult concepts.",
        )),
    },
    Fixture {
        student: "Taylor Smith",
        subject: "Physics",
        topic: "Electromagnetism",
        offset: -2,
        time: "13:00 - 14:00",
        status: SessionStatus::Completed,
        notes: "Covered magnetic fields and electromagnetic induction.",
        mode: CommunicationMode::Video,
        feedback: Some((4, "Very good explanation. Would book again.")),
    },
    Fixture {
        student: "Jordan Lee",
        subject: "Mathematics",
        topic: "Linear Algebra",
        offset: -4,
        time: "16:30 - 17:30",
        status: SessionStatus::Completed,
        notes: "Vectors, matrices, and systems of equations.",
        mode: CommunicationMode::Voice,
        feedback: Some((5, "Amazing tutor! Explained everything clearly.")),
    },
];

fn shift(today: NaiveDate, offset: i64) -> NaiveDate {
    let days = Days::new(offset.unsigned_abs());
    let shifted = if offset >= 0 {
        today.checked_add_days(days)
    } else {
        today.checked_sub_days(days)
    };
    shifted.unwrap_or(today)
}

/// Demo sessions dated relative to `today`, ids `"1"` through `"7"`.
pub fn demo_sessions(today: NaiveDate) -> Vec<Session> {
    FIXTURES
        .iter()
        .enumerate()
        .map(|(i, f)| Session {
            id: (i + 1).to_string(),
            student_name: f.student.to_string(),
            subject: f.subject.to_string(),
            topic: f.topic.to_string(),
            date: shift(today, f.offset),
            time: f.time.to_string(),
            status: f.status,
            notes: f.notes.to_string(),
            communication_mode: f.mode,
            feedback: f.feedback.map(|(rating, comment)| SessionFeedback {
                rating,
                comment: comment.to_string(),
            }),
        })
        .collect()
}
