// src/services/questions.rs

use chrono::Utc;

use crate::{
    error::AppError,
    models::{
        question::{NewQuestion, Question, QuestionFilter},
        session::Session,
        status::StatusAction,
    },
    services::sessions::require_session,
    store::BoardStore,
};

const SESSION_CLOSED: &str = "Session is no longer active";
const STATUS_LOCKED: &str = "Cannot update question status - session is not active";

async fn require_question(store: &dyn BoardStore, id: i64) -> Result<Question, AppError> {
    store
        .get_question(id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))
}

/// Posts a question to an active session.
///
/// Inputs are expected trimmed and validated. Fails with `DuplicateContent`
/// if the same student already posted the exact same text to this session.
pub async fn post_question(
    store: &dyn BoardStore,
    session_id: &str,
    student_name: &str,
    content: &str,
) -> Result<(Question, Session), AppError> {
    let session = require_session(store, session_id).await?;
    session.ensure_active(SESSION_CLOSED)?;

    let question = store
        .insert_question(NewQuestion {
            session_ref: session.id,
            session_id: session.session_id.clone(),
            student_name: student_name.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
        })
        .await?;

    tracing::info!(
        "Question {} posted to {} by {}",
        question.id,
        question.session_id,
        question.student_name
    );
    Ok((question, session))
}

/// Returns the session and its questions matching `filter`, newest first.
pub async fn find_by_session(
    store: &dyn BoardStore,
    session_id: &str,
    filter: &QuestionFilter,
) -> Result<(Session, Vec<Question>), AppError> {
    let session = require_session(store, session_id).await?;
    let questions = store.list_questions(session_id, filter).await?;
    Ok((session, questions))
}

/// Applies a status action to a question.
///
/// The owning session is re-read on every call; once it has ended the action
/// is rejected. The action itself runs against the stored flags in one store
/// step, so concurrent actions on the same question both take effect.
pub async fn update_status(
    store: &dyn BoardStore,
    id: i64,
    action: StatusAction,
) -> Result<Question, AppError> {
    let question = require_question(store, id).await?;

    let session = store.find_session(&question.session_id).await?;
    match session {
        Some(session) => session.ensure_active(STATUS_LOCKED)?,
        None => return Err(AppError::SessionInactive(STATUS_LOCKED.to_string())),
    }

    let (question, changed) = store.apply_status_action(id, action, Utc::now()).await?;
    if changed {
        tracing::info!(
            "Question {} -> {} ({})",
            question.id,
            question.status,
            action
        );
    } else {
        tracing::debug!("Action {} left question {} unchanged", action, id);
    }
    Ok(question)
}

/// Deletes a question whatever the state of its session.
pub async fn delete_question(store: &dyn BoardStore, id: i64) -> Result<Question, AppError> {
    let deleted = store.delete_question(id).await?;
    tracing::info!("Question {} deleted from {}", deleted.id, deleted.session_id);
    Ok(deleted)
}
