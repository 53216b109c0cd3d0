// src/store/mod.rs

//! Persistence contract for courses, sessions and questions.
//!
//! Handlers and services only see `BoardStore`; `PgStore` backs production and
//! `MemoryStore` backs tests and database-less local runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        course::{Course, CourseChanges, NewCourse},
        question::{NewQuestion, Question, QuestionFilter},
        session::{NewSession, Session, SessionStatusFilter},
        status::StatusAction,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Course with this code already exists")]
    DuplicateCourseCode,

    #[error("session id is already taken")]
    SessionIdTaken,

    #[error("course already has an active session")]
    ActiveSessionExists,

    #[error("identical question already posted")]
    DuplicateQuestion,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(entity) => AppError::NotFound(format!("{} not found", entity)),
            StoreError::DuplicateCourseCode => AppError::Conflict(err.to_string()),
            StoreError::ActiveSessionExists => {
                AppError::Conflict("An active session already exists for this course".to_string())
            }
            StoreError::DuplicateQuestion => AppError::DuplicateContent,
            StoreError::SessionIdTaken => AppError::InternalServerError(err.to_string()),
            StoreError::Database(e) => AppError::InternalServerError(e.to_string()),
        }
    }
}

/// One page of a course's sessions plus the unpaginated match count.
#[derive(Debug, Clone)]
pub struct SessionPage {
    pub sessions: Vec<Session>,
    pub total: u64,
}

#[async_trait]
pub trait BoardStore: Send + Sync {
    // --- Courses ---

    /// All courses, newest first.
    async fn list_courses(&self) -> StoreResult<Vec<Course>>;

    async fn get_course(&self, id: i64) -> StoreResult<Option<Course>>;

    /// Fails with `DuplicateCourseCode` when the (normalized) code is taken.
    async fn insert_course(&self, course: NewCourse) -> StoreResult<Course>;

    /// Applies the present fields. Code uniqueness is checked against other courses only.
    async fn update_course(&self, id: i64, changes: CourseChanges) -> StoreResult<Course>;

    /// Removes the course together with its sessions and their questions.
    async fn delete_course(&self, id: i64) -> StoreResult<()>;

    // --- Sessions ---

    /// Fails with `SessionIdTaken` on an identifier clash and with
    /// `ActiveSessionExists` when the course already has a running session.
    async fn insert_session(&self, session: NewSession) -> StoreResult<Session>;

    async fn find_session(&self, session_id: &str) -> StoreResult<Option<Session>>;

    async fn find_active_session(&self, course_id: i64) -> StoreResult<Option<Session>>;

    /// Sessions of a course ordered by start time, newest first.
    async fn list_sessions(
        &self,
        course_id: i64,
        filter: SessionStatusFilter,
        limit: u32,
        offset: usize,
    ) -> StoreResult<SessionPage>;

    /// Marks an active session ended. Returns `None` if it was not active.
    async fn end_session(
        &self,
        session_id: &str,
        end_time: DateTime<Utc>,
    ) -> StoreResult<Option<Session>>;

    // --- Questions ---

    /// Inserts the question and bumps the session's `question_count` atomically.
    /// Fails with `DuplicateQuestion` for a repeated (session, student, content) triple.
    async fn insert_question(&self, question: NewQuestion) -> StoreResult<Question>;

    async fn get_question(&self, id: i64) -> StoreResult<Option<Question>>;

    /// Questions of a session matching `filter`, newest first.
    async fn list_questions(
        &self,
        session_id: &str,
        filter: &QuestionFilter,
    ) -> StoreResult<Vec<Question>>;

    /// Applies `action` to the question's current flags as one atomic step and
    /// reports whether anything changed. A no-op is not written back.
    async fn apply_status_action(
        &self,
        id: i64,
        action: StatusAction,
        now: DateTime<Utc>,
    ) -> StoreResult<(Question, bool)>;

    /// Deletes the question and decrements the session's `question_count` atomically.
    async fn delete_question(&self, id: i64) -> StoreResult<Question>;
}
