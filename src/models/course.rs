// src/models/course.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub title: String,

    /// Unique course code, always stored upper-cased.
    pub code: String,

    pub instructor: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The course fields embedded in session and question responses.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub id: i64,
    pub title: String,
    pub code: String,
    pub instructor: String,
    pub description: Option<String>,
}

impl From<&Course> for CourseSummary {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id,
            title: course.title.clone(),
            code: course.code.clone(),
            instructor: course.instructor.clone(),
            description: course.description.clone(),
        }
    }
}

/// Normalizes a course code: trimmed, upper-cased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// DTO for creating a new course.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Course title is required and cannot exceed 100 characters"
    ))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 20,
        message = "Course code is required and cannot exceed 20 characters"
    ))]
    pub code: String,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Instructor name is required and cannot exceed 50 characters"
    ))]
    pub instructor: String,

    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
}

impl CreateCourseRequest {
    /// Trims every field and upper-cases the code. Blank descriptions become `None`.
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            code: normalize_code(&self.code),
            instructor: self.instructor.trim().to_string(),
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        }
    }
}

/// DTO for updating a course. Fields are optional; present ones must be non-empty.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCourseRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Course title cannot be empty or exceed 100 characters"
    ))]
    pub title: Option<String>,

    #[validate(length(
        min = 1,
        max = 20,
        message = "Course code cannot be empty or exceed 20 characters"
    ))]
    pub code: Option<String>,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Instructor name cannot be empty or exceed 50 characters"
    ))]
    pub instructor: Option<String>,

    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
}

impl UpdateCourseRequest {
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.map(|t| t.trim().to_string()),
            code: self.code.map(|c| normalize_code(&c)),
            instructor: self.instructor.map(|i| i.trim().to_string()),
            description: self.description.map(|d| d.trim().to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.code.is_none()
            && self.instructor.is_none()
            && self.description.is_none()
    }
}

/// Validated input for inserting a course.
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub code: String,
    pub instructor: String,
    pub description: Option<String>,
}

impl From<CreateCourseRequest> for NewCourse {
    fn from(req: CreateCourseRequest) -> Self {
        Self {
            title: req.title,
            code: req.code,
            instructor: req.instructor,
            description: req.description,
        }
    }
}

/// Validated partial update.
#[derive(Debug, Clone, Default)]
pub struct CourseChanges {
    pub title: Option<String>,
    pub code: Option<String>,
    pub instructor: Option<String>,
    pub description: Option<String>,
}

impl From<UpdateCourseRequest> for CourseChanges {
    fn from(req: UpdateCourseRequest) -> Self {
        Self {
            title: req.title,
            code: req.code,
            instructor: req.instructor,
            description: req.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_upper_cased_and_trimmed() {
        let req = CreateCourseRequest {
            title: "  Systems ".to_string(),
            code: " cs301 ".to_string(),
            instructor: "Dr. A".to_string(),
            description: Some("   ".to_string()),
        }
        .normalized();

        assert_eq!(req.title, "Systems");
        assert_eq!(req.code, "CS301");
        assert_eq!(req.description, None);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn whitespace_only_title_fails_after_normalization() {
        let req = CreateCourseRequest {
            title: "   ".to_string(),
            code: "CS1".to_string(),
            instructor: "Dr. A".to_string(),
            description: None,
        }
        .normalized();

        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
    }

    #[test]
    fn overlong_code_is_rejected() {
        let req = CreateCourseRequest {
            title: "Systems".to_string(),
            code: "X".repeat(21),
            instructor: "Dr. A".to_string(),
            description: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_rejects_blank_present_fields() {
        let req = UpdateCourseRequest {
            instructor: Some("  ".to_string()),
            ..Default::default()
        }
        .normalized();
        assert!(req.validate().is_err());
        assert!(UpdateCourseRequest::default().is_empty());
    }
}
