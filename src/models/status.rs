// src/models/status.rs

//! Question status engine.
//!
//! A question carries two independent flags, `is_answered` and `is_important`.
//! The `status` string shown to clients is derived from them; importance wins
//! over answered-ness.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derived display status of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    Unanswered,
    Answered,
    Important,
}

impl QuestionStatus {
    /// Derives the status from the two flags.
    pub fn derive(is_answered: bool, is_important: bool) -> Self {
        match (is_answered, is_important) {
            (true, true) => QuestionStatus::Important,
            (true, false) => QuestionStatus::Answered,
            (false, true) => QuestionStatus::Important,
            (false, false) => QuestionStatus::Unanswered,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionStatus::Unanswered => "unanswered",
            QuestionStatus::Answered => "answered",
            QuestionStatus::Important => "important",
        }
    }
}

impl fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for QuestionStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "unanswered" => Ok(QuestionStatus::Unanswered),
            "answered" => Ok(QuestionStatus::Answered),
            "important" => Ok(QuestionStatus::Important),
            other => Err(format!("unknown question status '{}'", other)),
        }
    }
}

/// Instructor action applied to a question's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusAction {
    ToggleAnswered,
    ToggleImportant,
    MarkAnswered,
    MarkImportant,
    UnmarkAnswered,
    UnmarkImportant,
}

impl StatusAction {
    pub const ALL: [StatusAction; 6] = [
        StatusAction::ToggleAnswered,
        StatusAction::ToggleImportant,
        StatusAction::MarkAnswered,
        StatusAction::MarkImportant,
        StatusAction::UnmarkAnswered,
        StatusAction::UnmarkImportant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusAction::ToggleAnswered => "toggle_answered",
            StatusAction::ToggleImportant => "toggle_important",
            StatusAction::MarkAnswered => "mark_answered",
            StatusAction::MarkImportant => "mark_important",
            StatusAction::UnmarkAnswered => "unmark_answered",
            StatusAction::UnmarkImportant => "unmark_important",
        }
    }
}

impl FromStr for StatusAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatusAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("Invalid action specified: '{}'", s))
    }
}

impl fmt::Display for StatusAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The mutable part of a question: both flags, the derived status and its timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFlags {
    pub is_answered: bool,
    pub is_important: bool,
    pub status: QuestionStatus,
    pub last_status_update: DateTime<Utc>,
}

impl StatusFlags {
    /// Fresh flags for a newly posted question.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            is_answered: false,
            is_important: false,
            status: QuestionStatus::Unanswered,
            last_status_update: now,
        }
    }

    /// Applies `action` and returns whether any flag changed.
    ///
    /// Only a real flag change recomputes `status` and moves `last_status_update`;
    /// a `mark_*`/`unmark_*` that finds the flag already in place leaves everything as is.
    pub fn apply(&mut self, action: StatusAction, now: DateTime<Utc>) -> bool {
        let (is_answered, is_important) = match action {
            StatusAction::ToggleAnswered => (!self.is_answered, self.is_important),
            StatusAction::ToggleImportant => (self.is_answered, !self.is_important),
            StatusAction::MarkAnswered => (true, self.is_important),
            StatusAction::MarkImportant => (self.is_answered, true),
            StatusAction::UnmarkAnswered => (false, self.is_important),
            StatusAction::UnmarkImportant => (self.is_answered, false),
        };

        if is_answered == self.is_answered && is_important == self.is_important {
            return false;
        }

        self.is_answered = is_answered;
        self.is_important = is_important;
        self.status = QuestionStatus::derive(is_answered, is_important);
        self.last_status_update = now;
        true
    }
}

/// Status filter for question listings.
///
/// Filters test the flags independently rather than the derived `status`, so a
/// question that is both answered and important matches `Answered` and `Important`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Answered,
    Unanswered,
    Important,
}

impl StatusFilter {
    /// Lenient parse used where unknown values mean "no filter".
    pub fn parse_lenient(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or(StatusFilter::All)
    }

    pub fn matches(&self, is_answered: bool, is_important: bool) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Answered => is_answered,
            StatusFilter::Unanswered => !is_answered,
            StatusFilter::Important => is_important,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            "answered" => Ok(StatusFilter::Answered),
            "unanswered" => Ok(StatusFilter::Unanswered),
            "important" => Ok(StatusFilter::Important),
            _ => Err("Status must be one of: all, answered, unanswered, important".to_string()),
        }
    }
}
