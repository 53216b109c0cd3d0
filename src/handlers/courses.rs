// src/handlers/courses.rs

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        ApiResponse,
        course::{CreateCourseRequest, UpdateCourseRequest},
    },
    store::BoardStore,
    utils::extract::{AppJson, AppPath},
};

/// Lists all courses, newest first.
pub async fn list_courses(
    State(store): State<Arc<dyn BoardStore>>,
) -> Result<impl IntoResponse, AppError> {
    let courses = store.list_courses().await?;
    let count = courses.len();

    Ok(Json(ApiResponse::data(courses).with_count(count)))
}

/// Retrieves a single course by ID.
pub async fn get_course(
    State(store): State<Arc<dyn BoardStore>>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = store
        .get_course(id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    Ok(Json(ApiResponse::data(course)))
}

/// Creates a course. The code is stored upper-cased and must be unique.
pub async fn create_course(
    State(store): State<Arc<dyn BoardStore>>,
    AppJson(payload): AppJson<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.normalized();
    payload.validate()?;

    let course = store.insert_course(payload.into()).await?;
    tracing::info!("Course {} created (id {})", course.code, course.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(course).with_message("Course created successfully")),
    ))
}

/// Updates any subset of a course's fields.
pub async fn update_course(
    State(store): State<Arc<dyn BoardStore>>,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.normalized();
    payload.validate()?;

    let course = if payload.is_empty() {
        store
            .get_course(id)
            .await?
            .ok_or(AppError::NotFound("Course not found".to_string()))?
    } else {
        store.update_course(id, payload.into()).await?
    };

    Ok(Json(
        ApiResponse::data(course).with_message("Course updated successfully"),
    ))
}

/// Deletes a course together with its sessions and their questions.
pub async fn delete_course(
    State(store): State<Arc<dyn BoardStore>>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    store.delete_course(id).await?;
    tracing::info!("Course {} deleted", id);

    Ok(Json(ApiResponse::message("Course deleted successfully")))
}
