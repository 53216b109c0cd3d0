// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{BoardStore, SessionPage, StoreError, StoreResult};
use crate::models::{
    course::{Course, CourseChanges, NewCourse},
    question::{NewQuestion, Question, QuestionFilter},
    session::{NewSession, Session, SessionStatusFilter},
    status::{StatusAction, StatusFilter, StatusFlags},
};

const COURSE_COLUMNS: &str = "id, title, code, instructor, description, created_at, updated_at";

const SESSION_COLUMNS: &str =
    "id, session_id, course_id, instructor, is_active, start_time, end_time, question_count";

const QUESTION_COLUMNS: &str = "id, session_ref, session_id, student_name, content, \
     is_answered, is_important, status, posted_at, last_status_update";

// Constraint names from migrations/0001_init.sql.
const COURSE_CODE_KEY: &str = "courses_code_key";
const SESSION_ID_KEY: &str = "sessions_session_id_key";
const ONE_ACTIVE_SESSION: &str = "sessions_one_active_per_course";
const NO_DUPLICATE_QUESTION: &str = "questions_no_duplicate";

/// Maps unique-violations on known constraints to their domain error.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some(COURSE_CODE_KEY) => return StoreError::DuplicateCourseCode,
                Some(SESSION_ID_KEY) => return StoreError::SessionIdTaken,
                Some(ONE_ACTIVE_SESSION) => return StoreError::ActiveSessionExists,
                Some(NO_DUPLICATE_QUESTION) => return StoreError::DuplicateQuestion,
                _ => {}
            }
        }
    }
    StoreError::Database(err)
}

/// `BoardStore` backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BoardStore for PgStore {
    async fn list_courses(&self) -> StoreResult<Vec<Course>> {
        let courses = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(courses)
    }

    async fn get_course(&self, id: i64) -> StoreResult<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(course)
    }

    async fn insert_course(&self, course: NewCourse) -> StoreResult<Course> {
        sqlx::query_as::<_, Course>(&format!(
            r#"
            INSERT INTO courses (title, code, instructor, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {COURSE_COLUMNS}
            "#
        ))
        .bind(&course.title)
        .bind(&course.code)
        .bind(&course.instructor)
        .bind(&course.description)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn update_course(&self, id: i64, changes: CourseChanges) -> StoreResult<Course> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE courses SET updated_at = NOW()");

        if let Some(title) = changes.title {
            builder.push(", title = ");
            builder.push_bind(title);
        }

        if let Some(code) = changes.code {
            builder.push(", code = ");
            builder.push_bind(code);
        }

        if let Some(instructor) = changes.instructor {
            builder.push(", instructor = ");
            builder.push_bind(instructor);
        }

        if let Some(description) = changes.description {
            builder.push(", description = NULLIF(");
            builder.push_bind(description);
            builder.push(", '')");
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {COURSE_COLUMNS}"));

        builder
            .build_query_as::<Course>()
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?
            .ok_or(StoreError::NotFound("Course"))
    }

    async fn delete_course(&self, id: i64) -> StoreResult<()> {
        // sessions and questions go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Course"));
        }
        Ok(())
    }

    async fn insert_session(&self, session: NewSession) -> StoreResult<Session> {
        sqlx::query_as::<_, Session>(&format!(
            r#"
            INSERT INTO sessions (session_id, course_id, instructor, is_active, start_time)
            VALUES ($1, $2, $3, TRUE, $4)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(&session.session_id)
        .bind(session.course_id)
        .bind(&session.instructor)
        .bind(session.start_time)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn find_session(&self, session_id: &str) -> StoreResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn find_active_session(&self, course_id: i64) -> StoreResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE course_id = $1 AND is_active LIMIT 1"
        ))
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn list_sessions(
        &self,
        course_id: i64,
        filter: SessionStatusFilter,
        limit: u32,
        offset: usize,
    ) -> StoreResult<SessionPage> {
        let is_active: Option<bool> = match filter {
            SessionStatusFilter::All => None,
            SessionStatusFilter::Active => Some(true),
            SessionStatusFilter::Ended => Some(false),
        };

        let sessions = sqlx::query_as::<_, Session>(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM sessions
            WHERE course_id = $1
              AND ($2::BOOLEAN IS NULL OR is_active = $2)
            ORDER BY start_time DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(course_id)
        .bind(is_active)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM sessions
            WHERE course_id = $1
              AND ($2::BOOLEAN IS NULL OR is_active = $2)
            "#,
        )
        .bind(course_id)
        .bind(is_active)
        .fetch_one(&self.pool)
        .await?;

        Ok(SessionPage {
            sessions,
            total: total.max(0) as u64,
        })
    }

    async fn end_session(
        &self,
        session_id: &str,
        end_time: DateTime<Utc>,
    ) -> StoreResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(&format!(
            r#"
            UPDATE sessions
            SET is_active = FALSE, end_time = $2
            WHERE session_id = $1 AND is_active
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(session_id)
        .bind(end_time)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn insert_question(&self, question: NewQuestion) -> StoreResult<Question> {
        let mut tx = self.pool.begin().await?;

        // 1. Spam guard; the unique index catches concurrent repeats
        let duplicate: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM questions
            WHERE session_ref = $1 AND student_name = $2 AND content = $3
            LIMIT 1
            "#,
        )
        .bind(question.session_ref)
        .bind(&question.student_name)
        .bind(&question.content)
        .fetch_optional(&mut *tx)
        .await?;

        if duplicate.is_some() {
            return Err(StoreError::DuplicateQuestion);
        }

        // 2. Insert Question
        let flags = StatusFlags::new(question.timestamp);
        let inserted = sqlx::query_as::<_, Question>(&format!(
            r#"
            INSERT INTO questions
                (session_ref, session_id, student_name, content,
                 is_answered, is_important, status, posted_at, last_status_update)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(question.session_ref)
        .bind(&question.session_id)
        .bind(&question.student_name)
        .bind(&question.content)
        .bind(flags.is_answered)
        .bind(flags.is_important)
        .bind(flags.status.as_str())
        .bind(question.timestamp)
        .bind(flags.last_status_update)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify)?;

        // 3. Update Session Count
        sqlx::query("UPDATE sessions SET question_count = question_count + 1 WHERE id = $1")
            .bind(question.session_ref)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(inserted)
    }

    async fn get_question(&self, id: i64) -> StoreResult<Option<Question>> {
        let question = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(question)
    }

    async fn list_questions(
        &self,
        session_id: &str,
        filter: &QuestionFilter,
    ) -> StoreResult<Vec<Question>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE session_id = "
        ));
        builder.push_bind(session_id.to_string());

        match filter.status {
            StatusFilter::All => {}
            StatusFilter::Answered => {
                builder.push(" AND is_answered");
            }
            StatusFilter::Unanswered => {
                builder.push(" AND NOT is_answered");
            }
            StatusFilter::Important => {
                builder.push(" AND is_important");
            }
        }

        if let Some(student) = &filter.student {
            builder.push(" AND student_name ILIKE ");
            builder.push_bind(format!("%{}%", escape_like(student)));
        }

        builder.push(" ORDER BY posted_at DESC, id DESC");

        let questions = builder
            .build_query_as::<Question>()
            .fetch_all(&self.pool)
            .await?;
        Ok(questions)
    }

    async fn apply_status_action(
        &self,
        id: i64,
        action: StatusAction,
        now: DateTime<Utc>,
    ) -> StoreResult<(Question, bool)> {
        let mut tx = self.pool.begin().await?;

        // 1. Lock the row so concurrent actions apply one after another
        let mut question = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound("Question"))?;

        // 2. Apply the action to the locked state
        let mut flags = question.flags();
        if !flags.apply(action, now) {
            tx.commit().await?;
            return Ok((question, false));
        }

        // 3. Write back
        question = sqlx::query_as::<_, Question>(&format!(
            r#"
            UPDATE questions
            SET is_answered = $2, is_important = $3, status = $4, last_status_update = $5
            WHERE id = $1
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(flags.is_answered)
        .bind(flags.is_important)
        .bind(flags.status.as_str())
        .bind(flags.last_status_update)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((question, true))
    }

    async fn delete_question(&self, id: i64) -> StoreResult<Question> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query_as::<_, Question>(&format!(
            "DELETE FROM questions WHERE id = $1 RETURNING {QUESTION_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound("Question"))?;

        sqlx::query(
            "UPDATE sessions SET question_count = GREATEST(0, question_count - 1) WHERE id = $1",
        )
        .bind(deleted.session_ref)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(deleted)
    }
}

/// Escapes `%`, `_` and `\` so a student filter is matched literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("bob"), "bob");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
