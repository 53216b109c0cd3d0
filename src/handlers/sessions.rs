// src/handlers/sessions.rs

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        ApiResponse, PageInfo,
        course::CourseSummary,
        session::{CreateSessionRequest, SessionListParams, SessionResponse},
    },
    services::sessions,
    store::BoardStore,
    utils::{
        extract::{AppJson, AppPath, AppQuery},
        session_id::parse_session_id,
    },
};

/// Starts a session for a course.
/// Rejected while the course already has an active session.
pub async fn create_session(
    State(store): State<Arc<dyn BoardStore>>,
    AppJson(payload): AppJson<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = CreateSessionRequest {
        instructor: payload.instructor.trim().to_string(),
        ..payload
    };
    payload.validate()?;

    let (session, course) =
        sessions::start_session(store.as_ref(), payload.course_id, &payload.instructor).await?;
    let body = SessionResponse::new(session, Some(CourseSummary::from(&course)), Utc::now());

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(body).with_message("Session started successfully")),
    ))
}

/// Gets a session by its shareable id.
pub async fn get_session(
    State(store): State<Arc<dyn BoardStore>>,
    AppPath(session_id): AppPath<String>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = parse_session_id(&session_id)?;
    let session = sessions::require_session(store.as_ref(), &session_id).await?;
    let body = sessions::describe(store.as_ref(), session).await?;

    Ok(Json(ApiResponse::data(body)))
}

/// Ends a session. A session can only be ended once.
pub async fn end_session(
    State(store): State<Arc<dyn BoardStore>>,
    AppPath(session_id): AppPath<String>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = parse_session_id(&session_id)?;
    let session = sessions::end_session(store.as_ref(), &session_id).await?;
    let body = sessions::describe(store.as_ref(), session).await?;

    Ok(Json(
        ApiResponse::data(body).with_message("Session ended successfully"),
    ))
}

/// Lists a course's sessions, newest first, paginated.
/// Supports `status` = all | active | ended.
pub async fn list_course_sessions(
    State(store): State<Arc<dyn BoardStore>>,
    AppPath(course_id): AppPath<i64>,
    AppQuery(params): AppQuery<SessionListParams>,
) -> Result<impl IntoResponse, AppError> {
    params.validate()?;

    let course = store
        .get_course(course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;
    let summary = CourseSummary::from(&course);

    let (page, limit) = (params.page(), params.limit());
    let offset = PageInfo::new(page, limit, 0).offset();
    let result = store
        .list_sessions(course_id, params.status.unwrap_or_default(), limit, offset)
        .await?;

    let now = Utc::now();
    let sessions: Vec<SessionResponse> = result
        .sessions
        .into_iter()
        .map(|s| SessionResponse::new(s, Some(summary.clone()), now))
        .collect();
    let count = sessions.len();

    Ok(Json(
        ApiResponse::data(sessions)
            .with_count(count)
            .with_page(&PageInfo::new(page, limit, result.total)),
    ))
}

/// Gets the running session of a course, if any.
pub async fn get_active_session(
    State(store): State<Arc<dyn BoardStore>>,
    AppPath(course_id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = store.find_active_session(course_id).await?.ok_or(AppError::NotFound(
        "No active session found for this course".to_string(),
    ))?;
    let body = sessions::describe(store.as_ref(), session).await?;

    Ok(Json(ApiResponse::data(body)))
}
