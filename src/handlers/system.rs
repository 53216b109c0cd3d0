// src/handlers/system.rs

use axum::{Json, http::{StatusCode, Uri}, response::IntoResponse};
use serde_json::json;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "Q&A board API is running",
        "timestamp": chrono::Utc::now(),
        "version": VERSION,
    }))
}

/// Service description and endpoint map.
pub async fn welcome() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "Welcome to the classroom Q&A board API",
        "description": "Instructors open sessions per course, students post questions, instructors triage them.",
        "version": VERSION,
        "endpoints": {
            "health": "/health",
            "courses": "/api/courses",
            "sessions": "/api/sessions",
            "questions": "/api/questions",
        },
    }))
}

/// JSON 404 for unmatched routes.
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": format!("Route not found - {}", uri.path()),
        })),
    )
}
