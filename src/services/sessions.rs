// src/services/sessions.rs

//! Session lifecycle: `Active -> Ended`, one active session per course.

use chrono::Utc;

use crate::{
    config::SESSION_ID_ATTEMPTS,
    error::AppError,
    models::{
        course::{Course, CourseSummary},
        session::{NewSession, Session, SessionResponse},
    },
    store::{BoardStore, StoreError},
    utils::session_id::{generate_session_id, generate_uuid_session_id},
};

/// Loads a session by its shareable id or fails with 404.
pub async fn require_session(store: &dyn BoardStore, session_id: &str) -> Result<Session, AppError> {
    store
        .find_session(session_id)
        .await?
        .ok_or(AppError::NotFound("Session not found".to_string()))
}

/// Wraps a session with its course summary and running duration.
pub async fn describe(store: &dyn BoardStore, session: Session) -> Result<SessionResponse, AppError> {
    let course = store.get_course(session.course_id).await?;
    Ok(SessionResponse::new(
        session,
        course.as_ref().map(CourseSummary::from),
        Utc::now(),
    ))
}

fn already_active(session: Session) -> AppError {
    AppError::SessionAlreadyActive {
        session_id: session.session_id,
        start_time: session.start_time,
    }
}

/// Starts a new session for `course_id`.
///
/// Rejects with `SessionAlreadyActive` (carrying the running session's id and
/// start time) if the course already has one, including when a concurrent
/// request wins the race between the check and the insert.
pub async fn start_session(
    store: &dyn BoardStore,
    course_id: i64,
    instructor: &str,
) -> Result<(Session, Course), AppError> {
    let course = store
        .get_course(course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    if let Some(active) = store.find_active_session(course_id).await? {
        return Err(already_active(active));
    }

    for attempt in 1..=SESSION_ID_ATTEMPTS {
        // last attempt switches to the wider uuid-derived id
        let session_id = if attempt < SESSION_ID_ATTEMPTS {
            generate_session_id()
        } else {
            generate_uuid_session_id()
        };
        let new_session = NewSession {
            session_id,
            course_id,
            instructor: instructor.to_string(),
            start_time: Utc::now(),
        };

        match store.insert_session(new_session).await {
            Ok(session) => {
                tracing::info!(
                    "Session {} started for course {}",
                    session.session_id,
                    course.code
                );
                return Ok((session, course));
            }
            Err(StoreError::SessionIdTaken) => {
                tracing::warn!("Session id collision, regenerating (attempt {})", attempt);
            }
            Err(StoreError::ActiveSessionExists) => {
                return match store.find_active_session(course_id).await? {
                    Some(active) => Err(already_active(active)),
                    None => Err(StoreError::ActiveSessionExists.into()),
                };
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::InternalServerError(format!(
        "Could not allocate a unique session id after {} attempts",
        SESSION_ID_ATTEMPTS
    )))
}

/// Ends an active session. Ending an ended session is rejected, not ignored.
pub async fn end_session(store: &dyn BoardStore, session_id: &str) -> Result<Session, AppError> {
    let session = require_session(store, session_id).await?;
    if !session.is_active {
        return Err(AppError::SessionAlreadyEnded);
    }

    let ended = store
        .end_session(session_id, Utc::now())
        .await?
        .ok_or(AppError::SessionAlreadyEnded)?;

    tracing::info!(
        "Session {} ended with {} questions",
        ended.session_id,
        ended.question_count
    );
    Ok(ended)
}
