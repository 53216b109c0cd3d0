// src/handlers/questions.rs

use std::{collections::BTreeMap, sync::Arc};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use validator::Validate;

use crate::{
    error::{AppError, FieldError},
    models::{
        ApiResponse, PageInfo,
        course::CourseSummary,
        question::{
            CreateQuestionRequest, GroupedParams, Question, QuestionFilter, QuestionListParams,
            StudentGroups, UpdateStatusRequest, group_by_student,
        },
        session::SessionBrief,
        status::{StatusAction, StatusFilter},
    },
    services::questions,
    store::BoardStore,
    utils::{
        extract::{AppJson, AppPath, AppQuery},
        session_id::parse_session_id,
    },
};

/// A freshly posted question with the course it was asked in.
#[derive(Debug, Serialize)]
pub struct PostedQuestion {
    #[serde(flatten)]
    pub question: Question,
    pub course: Option<CourseSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPage {
    pub questions: Vec<Question>,
    pub grouped_by_student: BTreeMap<String, Vec<Question>>,
    pub session: SessionBrief,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentView {
    #[serde(flatten)]
    pub groups: StudentGroups,
    pub session: SessionBrief,
}

/// Posts a question to an active session.
pub async fn create_question(
    State(store): State<Arc<dyn BoardStore>>,
    AppJson(payload): AppJson<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.normalized();
    payload.validate()?;

    let (question, session) = questions::post_question(
        store.as_ref(),
        &payload.session_id,
        &payload.student_name,
        &payload.content,
    )
    .await?;
    let course = store.get_course(session.course_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(
            ApiResponse::data(PostedQuestion {
                question,
                course: course.as_ref().map(CourseSummary::from),
            })
            .with_message("Question posted successfully"),
        ),
    ))
}

/// Lists a session's questions, newest first.
/// Filters: `status`, `student` (substring); paginated with `page` / `limit`.
/// The current page is also returned grouped by student.
pub async fn list_session_questions(
    State(store): State<Arc<dyn BoardStore>>,
    AppPath(session_id): AppPath<String>,
    AppQuery(params): AppQuery<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = parse_session_id(&session_id)?;
    params.validate()?;

    let (session, all) =
        questions::find_by_session(store.as_ref(), &session_id, &params.filter()).await?;

    let page = PageInfo::new(params.page(), params.limit(), all.len() as u64);
    let current = page.slice(&all).to_vec();
    let grouped = group_by_student(&current);
    let count = current.len();

    let body = QuestionPage {
        questions: current,
        grouped_by_student: grouped.questions_by_student,
        session: SessionBrief::from(&session),
    };

    Ok(Json(
        ApiResponse::data(body).with_count(count).with_page(&page),
    ))
}

/// Applies a status action (`toggle_*`, `mark_*`, `unmark_*`) to a question.
pub async fn update_question_status(
    State(store): State<Arc<dyn BoardStore>>,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let action: StatusAction = payload.action.trim().parse().map_err(|_| {
        AppError::Validation(vec![FieldError {
            field: "action".to_string(),
            message: "Invalid action specified".to_string(),
        }])
    })?;

    let question = questions::update_status(store.as_ref(), id, action).await?;

    Ok(Json(
        ApiResponse::data(question).with_message("Question status updated successfully"),
    ))
}

/// Deletes a question.
pub async fn delete_question(
    State(store): State<Arc<dyn BoardStore>>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = questions::delete_question(store.as_ref(), id).await?;

    Ok(Json(
        ApiResponse::data(serde_json::json!({ "id": deleted.id }))
            .with_message("Question deleted successfully"),
    ))
}

/// Questions of a session grouped by student, with per-student stats.
pub async fn questions_by_student(
    State(store): State<Arc<dyn BoardStore>>,
    AppPath(session_id): AppPath<String>,
    AppQuery(params): AppQuery<GroupedParams>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = parse_session_id(&session_id)?;
    let filter = QuestionFilter {
        status: StatusFilter::parse_lenient(params.status.as_deref()),
        student: None,
    };

    let (session, all) = questions::find_by_session(store.as_ref(), &session_id, &filter).await?;
    let groups = group_by_student(&all);

    let students = groups.student_count();
    let body = StudentView {
        groups,
        session: SessionBrief::from(&session),
    };

    Ok(Json(
        ApiResponse::data(body)
            .with_count(students)
            .with_total_questions(all.len()),
    ))
}
