// src/error.rs

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::any::Any;
use std::fmt;

/// A single failed field check, reported in the `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 400 Bad Request with per-field details
    Validation(Vec<FieldError>),

    // 401 / 403, reserved until instructor accounts exist
    Unauthorized(String),
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate course code)
    Conflict(String),

    // 400, the course already has a running session
    SessionAlreadyActive {
        session_id: String,
        start_time: DateTime<Utc>,
    },

    // 400, the session no longer accepts questions or status changes
    SessionInactive(String),

    // 400
    SessionAlreadyEnded,

    // 400, same student posted the same text to the same session
    DuplicateContent,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Error envelope: `{ success: false, message, errors?, data?, error? }`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ErrorBody {
    fn message(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: None,
            data: None,
            error: None,
        }
    }
}

/// Attached to 500 responses so the development-only middleware can reveal the cause.
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON envelope with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body, detail) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::message("Internal Server Error"),
                    Some(msg),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorBody::message(msg), None),
            AppError::Validation(errors) => {
                let mut body = ErrorBody::message("Validation errors");
                body.errors = Some(errors);
                (StatusCode::BAD_REQUEST, body, None)
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ErrorBody::message(msg), None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorBody::message(msg), None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorBody::message(msg), None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorBody::message(msg), None),
            AppError::SessionAlreadyActive {
                session_id,
                start_time,
            } => {
                let mut body =
                    ErrorBody::message("An active session already exists for this course");
                body.data = Some(json!({
                    "sessionId": session_id,
                    "startTime": start_time,
                }));
                (StatusCode::BAD_REQUEST, body, None)
            }
            AppError::SessionInactive(msg) => (StatusCode::BAD_REQUEST, ErrorBody::message(msg), None),
            AppError::SessionAlreadyEnded => (
                StatusCode::BAD_REQUEST,
                ErrorBody::message("Session is already ended"),
                None,
            ),
            AppError::DuplicateContent => (
                StatusCode::BAD_REQUEST,
                ErrorBody::message("You have already posted this exact question"),
                None,
            ),
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(detail) = detail {
            response.extensions_mut().insert(InternalErrorDetail(detail));
        }
        response
    }
}

/// Development-mode response mapper: re-renders 500s with the internal cause under `error`.
/// Status and headers of the original response are kept.
pub async fn expose_internal_errors(response: Response) -> Response {
    let Some(InternalErrorDetail(detail)) = response.extensions().get::<InternalErrorDetail>().cloned()
    else {
        return response;
    };

    let mut body = ErrorBody::message("Internal Server Error");
    body.error = Some(detail);

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Json(body).into_response().into_body())
}

/// Re-renders the rate limiter's plain-text 429 as the error envelope,
/// keeping its `retry-after` / `x-ratelimit-*` headers.
pub async fn rate_limit_envelope(response: Response) -> Response {
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return response;
    }

    let body = ErrorBody::message("Too many requests from this IP. Please try again later.");
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Response::from_parts(parts, Json(body).into_response().into_body())
}

/// Renders a handler panic as the 500 envelope (used by `CatchPanicLayer`).
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(msg) = err.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(msg) = err.downcast_ref::<&str>() {
        msg.to_string()
    } else {
        "handler panicked".to_string()
    };

    AppError::InternalServerError(format!("panic: {}", detail)).into_response()
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation(fields)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("Path rejected: {}", rejection.body_text());
        AppError::BadRequest("Invalid ID format".to_string())
    }
}
