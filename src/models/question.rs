// src/models/question.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{
    config::{DEFAULT_QUESTION_PAGE_LIMIT, MAX_PAGE_LIMIT},
    models::status::{QuestionStatus, StatusFilter, StatusFlags},
    utils::session_id::validate_session_id,
};

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,

    /// Primary key of the owning session.
    #[serde(rename = "session")]
    pub session_ref: i64,

    /// Human-readable id of the owning session, copied for lookups.
    pub session_id: String,

    pub student_name: String,
    pub content: String,
    pub is_answered: bool,
    pub is_important: bool,

    /// Always `QuestionStatus::derive(is_answered, is_important)`.
    #[sqlx(try_from = "String")]
    pub status: QuestionStatus,

    /// Creation time. Mapped from the column 'posted_at'.
    #[sqlx(rename = "posted_at")]
    pub timestamp: DateTime<Utc>,
    pub last_status_update: DateTime<Utc>,
}

impl Question {
    pub fn flags(&self) -> StatusFlags {
        StatusFlags {
            is_answered: self.is_answered,
            is_important: self.is_important,
            status: self.status,
            last_status_update: self.last_status_update,
        }
    }

    pub fn set_flags(&mut self, flags: StatusFlags) {
        self.is_answered = flags.is_answered;
        self.is_important = flags.is_important;
        self.status = flags.status;
        self.last_status_update = flags.last_status_update;
    }
}

/// DTO for posting a question.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[validate(custom(function = validate_session_id))]
    pub session_id: String,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Student name must be between 1 and 50 characters"
    ))]
    pub student_name: String,

    #[validate(length(
        min = 5,
        max = 1000,
        message = "Question must be between 5 and 1000 characters"
    ))]
    pub content: String,
}

impl CreateQuestionRequest {
    pub fn normalized(self) -> Self {
        Self {
            session_id: self.session_id.trim().to_string(),
            student_name: self.student_name.trim().to_string(),
            content: self.content.trim().to_string(),
        }
    }
}

/// DTO for `PUT /questions/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub action: String,
}

/// Validated input for inserting a question.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub session_ref: i64,
    pub session_id: String,
    pub student_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Store-level listing filter.
#[derive(Debug, Clone, Default)]
pub struct QuestionFilter {
    pub status: StatusFilter,

    /// Case-insensitive substring of the student name.
    pub student: Option<String>,
}

impl QuestionFilter {
    pub fn matches(&self, question: &Question) -> bool {
        if !self.status.matches(question.is_answered, question.is_important) {
            return false;
        }
        match &self.student {
            Some(needle) => question
                .student_name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            None => true,
        }
    }
}

/// Query parameters for listing a session's questions.
#[derive(Debug, Deserialize, Validate)]
pub struct QuestionListParams {
    #[validate(custom(function = validate_status_filter))]
    pub status: Option<String>,

    pub student: Option<String>,

    #[validate(range(min = 1, message = "Page must be a positive integer"))]
    pub page: Option<u32>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u32>,
}

impl QuestionListParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_QUESTION_PAGE_LIMIT)
            .min(MAX_PAGE_LIMIT)
    }

    pub fn filter(&self) -> QuestionFilter {
        QuestionFilter {
            status: StatusFilter::parse_lenient(self.status.as_deref()),
            student: self
                .student
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}

fn validate_status_filter(status: &str) -> Result<(), validator::ValidationError> {
    status.parse::<StatusFilter>().map(|_| ()).map_err(|_| {
        validator::ValidationError::new("invalid_status").with_message(
            "Status must be one of: all, answered, unanswered, important".into(),
        )
    })
}

/// Query parameters for the grouped view; unknown statuses mean "all".
#[derive(Debug, Deserialize)]
pub struct GroupedParams {
    pub status: Option<String>,
}

/// Per-student counters. Not exclusive: one question may count as both answered and important.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StudentStats {
    pub total: u32,
    pub answered: u32,
    pub unanswered: u32,
    pub important: u32,
}

impl StudentStats {
    fn record(&mut self, question: &Question) {
        self.total += 1;
        if question.is_answered {
            self.answered += 1;
        } else {
            self.unanswered += 1;
        }
        if question.is_important {
            self.important += 1;
        }
    }
}

/// Questions keyed by student name, each list keeping the input order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentGroups {
    pub questions_by_student: BTreeMap<String, Vec<Question>>,
    pub student_stats: BTreeMap<String, StudentStats>,
}

impl StudentGroups {
    pub fn student_count(&self) -> usize {
        self.questions_by_student.len()
    }
}

/// Groups questions by author and tallies per-student stats.
pub fn group_by_student(questions: &[Question]) -> StudentGroups {
    let mut groups = StudentGroups::default();
    for question in questions {
        groups
            .questions_by_student
            .entry(question.student_name.clone())
            .or_default()
            .push(question.clone());
        groups
            .student_stats
            .entry(question.student_name.clone())
            .or_default()
            .record(question);
    }
    groups
}
