// src/models/session.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{
    config::{DEFAULT_SESSION_PAGE_LIMIT, MAX_PAGE_LIMIT},
    error::AppError,
    models::course::CourseSummary,
};

/// Represents the 'sessions' table in the database.
///
/// A session moves from active to ended exactly once and is never reopened.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: i64,

    /// Human-shareable identifier, e.g. `VV-4K9Q2Z`.
    pub session_id: String,

    pub course_id: i64,

    /// Copy of the instructor name given when the session was started.
    pub instructor: String,

    pub is_active: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,

    /// Counter maintained alongside question inserts and deletes.
    pub question_count: i64,
}

impl Session {
    /// Fails with `SessionInactive` once the session has ended.
    pub fn ensure_active(&self, message: &str) -> Result<(), AppError> {
        if self.is_active {
            Ok(())
        } else {
            Err(AppError::SessionInactive(message.to_string()))
        }
    }

    /// Milliseconds from start until the end, or until `now` while still running.
    pub fn duration_ms(&self, now: DateTime<Utc>) -> i64 {
        let until = self.end_time.unwrap_or(now);
        (until - self.start_time).num_milliseconds().max(0)
    }
}

/// Session as returned to clients: the record, its course and a derived duration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: Session,
    pub course: Option<CourseSummary>,
    pub duration_ms: i64,
}

impl SessionResponse {
    pub fn new(session: Session, course: Option<CourseSummary>, now: DateTime<Utc>) -> Self {
        let duration_ms = session.duration_ms(now);
        Self {
            session,
            course,
            duration_ms,
        }
    }
}

/// Minimal session view embedded in question listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBrief {
    pub session_id: String,
    pub is_active: bool,
    pub question_count: i64,
}

impl From<&Session> for SessionBrief {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.session_id.clone(),
            is_active: session.is_active,
            question_count: session.question_count,
        }
    }
}

/// DTO for starting a session.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[validate(range(min = 1, message = "Invalid course ID"))]
    pub course_id: i64,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Instructor name is required and cannot exceed 50 characters"
    ))]
    pub instructor: String,
}

/// Validated input for inserting a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub session_id: String,
    pub course_id: i64,
    pub instructor: String,
    pub start_time: DateTime<Utc>,
}

/// Lifecycle filter for session listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatusFilter {
    #[default]
    All,
    Active,
    Ended,
}

impl SessionStatusFilter {
    pub fn matches(&self, session: &Session) -> bool {
        match self {
            SessionStatusFilter::All => true,
            SessionStatusFilter::Active => session.is_active,
            SessionStatusFilter::Ended => !session.is_active,
        }
    }
}

/// Query parameters for listing a course's sessions.
#[derive(Debug, Deserialize, Validate)]
pub struct SessionListParams {
    #[validate(range(min = 1, message = "Page must be a positive integer"))]
    pub page: Option<u32>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u32>,

    pub status: Option<SessionStatusFilter>,
}

impl SessionListParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_SESSION_PAGE_LIMIT)
            .min(MAX_PAGE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(is_active: bool) -> Session {
        let start = Utc::now() - Duration::minutes(30);
        Session {
            id: 1,
            session_id: "VV-ABC123".to_string(),
            course_id: 1,
            instructor: "Dr. A".to_string(),
            is_active,
            start_time: start,
            end_time: (!is_active).then(|| start + Duration::minutes(10)),
            question_count: 0,
        }
    }

    #[test]
    fn ended_session_rejects_activity() {
        assert!(session(true).ensure_active("closed").is_ok());
        match session(false).ensure_active("closed") {
            Err(AppError::SessionInactive(msg)) => assert_eq!(msg, "closed"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn duration_stops_at_end_time() {
        let ended = session(false);
        assert_eq!(ended.duration_ms(Utc::now()), 10 * 60 * 1000);

        let running = session(true);
        assert!(running.duration_ms(Utc::now()) >= 30 * 60 * 1000);
    }

    #[test]
    fn list_params_default_and_cap() {
        let params = SessionListParams {
            page: None,
            limit: None,
            status: None,
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), DEFAULT_SESSION_PAGE_LIMIT);

        let bad = SessionListParams {
            page: Some(0),
            limit: Some(500),
            status: None,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn status_filter_matches_lifecycle() {
        assert!(SessionStatusFilter::Active.matches(&session(true)));
        assert!(!SessionStatusFilter::Active.matches(&session(false)));
        assert!(SessionStatusFilter::Ended.matches(&session(false)));
        assert!(SessionStatusFilter::All.matches(&session(false)));
    }
}
