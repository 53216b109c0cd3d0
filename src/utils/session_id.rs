// src/utils/session_id.rs

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

use crate::error::AppError;

const PREFIX: &str = "VV-";
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 6;

static SESSION_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^VV-[A-Z0-9]{6,8}$").expect("session id pattern is valid"));

/// Generates a shareable session id: `VV-` plus 6 characters from `[A-Z0-9]`.
///
/// No collision check happens here; the store's unique index rejects a clash and
/// the caller retries with a fresh id.
pub fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    let code: String = (0..CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}{}", PREFIX, code)
}

/// Alternate generator: the first 8 characters of a random UUID, upper-cased.
pub fn generate_uuid_session_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", PREFIX, uuid[..8].to_uppercase())
}

pub fn is_valid_session_id(session_id: &str) -> bool {
    SESSION_ID_RE.is_match(session_id)
}

/// Checks a session id taken from a path segment.
pub fn parse_session_id(raw: &str) -> Result<String, AppError> {
    let session_id = raw.trim();
    if is_valid_session_id(session_id) {
        Ok(session_id.to_string())
    } else {
        Err(AppError::BadRequest("Invalid session ID format".to_string()))
    }
}

/// `validator` hook for request DTOs carrying a session id.
pub fn validate_session_id(session_id: &str) -> Result<(), validator::ValidationError> {
    if is_valid_session_id(session_id.trim()) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_session_id")
            .with_message("Invalid session ID format".into()))
    }
}
