// src/store/memory.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{BoardStore, SessionPage, StoreError, StoreResult};
use crate::models::{
    course::{Course, CourseChanges, NewCourse},
    question::{NewQuestion, Question, QuestionFilter},
    session::{NewSession, Session, SessionStatusFilter},
    status::{StatusAction, StatusFlags},
};

#[derive(Debug, Default)]
struct Tables {
    courses: BTreeMap<i64, Course>,
    sessions: BTreeMap<i64, Session>,
    questions: BTreeMap<i64, Question>,
    next_course_id: i64,
    next_session_id: i64,
    next_question_id: i64,
}

impl Tables {
    fn next(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn session_by_public_id(&self, session_id: &str) -> Option<&Session> {
        self.sessions.values().find(|s| s.session_id == session_id)
    }

    fn code_taken(&self, code: &str, except: Option<i64>) -> bool {
        self.courses
            .values()
            .any(|c| c.code == code && Some(c.id) != except)
    }
}

/// `BoardStore` held entirely in memory behind one lock.
///
/// Every mutation runs under the write lock, so the multi-record steps
/// (question + counter, one active session per course) are atomic here.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BoardStore for MemoryStore {
    async fn list_courses(&self) -> StoreResult<Vec<Course>> {
        let tables = self.tables.read().await;
        let mut courses: Vec<Course> = tables.courses.values().cloned().collect();
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(courses)
    }

    async fn get_course(&self, id: i64) -> StoreResult<Option<Course>> {
        Ok(self.tables.read().await.courses.get(&id).cloned())
    }

    async fn insert_course(&self, course: NewCourse) -> StoreResult<Course> {
        let mut tables = self.tables.write().await;
        if tables.code_taken(&course.code, None) {
            return Err(StoreError::DuplicateCourseCode);
        }

        let now = Utc::now();
        let id = Tables::next(&mut tables.next_course_id);
        let course = Course {
            id,
            title: course.title,
            code: course.code,
            instructor: course.instructor,
            description: course.description,
            created_at: now,
            updated_at: now,
        };
        tables.courses.insert(id, course.clone());
        Ok(course)
    }

    async fn update_course(&self, id: i64, changes: CourseChanges) -> StoreResult<Course> {
        let mut tables = self.tables.write().await;
        if !tables.courses.contains_key(&id) {
            return Err(StoreError::NotFound("Course"));
        }
        if let Some(code) = &changes.code {
            if tables.code_taken(code, Some(id)) {
                return Err(StoreError::DuplicateCourseCode);
            }
        }

        let course = tables
            .courses
            .get_mut(&id)
            .ok_or(StoreError::NotFound("Course"))?;

        if let Some(title) = changes.title {
            course.title = title;
        }
        if let Some(code) = changes.code {
            course.code = code;
        }
        if let Some(instructor) = changes.instructor {
            course.instructor = instructor;
        }
        if let Some(description) = changes.description {
            course.description = Some(description).filter(|d| !d.is_empty());
        }
        course.updated_at = Utc::now();
        Ok(course.clone())
    }

    async fn delete_course(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.courses.remove(&id).is_none() {
            return Err(StoreError::NotFound("Course"));
        }

        let session_refs: Vec<i64> = tables
            .sessions
            .values()
            .filter(|s| s.course_id == id)
            .map(|s| s.id)
            .collect();
        tables
            .questions
            .retain(|_, q| !session_refs.contains(&q.session_ref));
        tables.sessions.retain(|_, s| s.course_id != id);
        Ok(())
    }

    async fn insert_session(&self, session: NewSession) -> StoreResult<Session> {
        let mut tables = self.tables.write().await;
        if tables.session_by_public_id(&session.session_id).is_some() {
            return Err(StoreError::SessionIdTaken);
        }
        if tables
            .sessions
            .values()
            .any(|s| s.course_id == session.course_id && s.is_active)
        {
            return Err(StoreError::ActiveSessionExists);
        }

        let id = Tables::next(&mut tables.next_session_id);
        let session = Session {
            id,
            session_id: session.session_id,
            course_id: session.course_id,
            instructor: session.instructor,
            is_active: true,
            start_time: session.start_time,
            end_time: None,
            question_count: 0,
        };
        tables.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, session_id: &str) -> StoreResult<Option<Session>> {
        Ok(self
            .tables
            .read()
            .await
            .session_by_public_id(session_id)
            .cloned())
    }

    async fn find_active_session(&self, course_id: i64) -> StoreResult<Option<Session>> {
        Ok(self
            .tables
            .read()
            .await
            .sessions
            .values()
            .find(|s| s.course_id == course_id && s.is_active)
            .cloned())
    }

    async fn list_sessions(
        &self,
        course_id: i64,
        filter: SessionStatusFilter,
        limit: u32,
        offset: usize,
    ) -> StoreResult<SessionPage> {
        let tables = self.tables.read().await;
        let mut matching: Vec<Session> = tables
            .sessions
            .values()
            .filter(|s| s.course_id == course_id && filter.matches(s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let sessions = matching
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect();
        Ok(SessionPage { sessions, total })
    }

    async fn end_session(
        &self,
        session_id: &str,
        end_time: DateTime<Utc>,
    ) -> StoreResult<Option<Session>> {
        let mut tables = self.tables.write().await;
        let Some(session) = tables
            .sessions
            .values_mut()
            .find(|s| s.session_id == session_id && s.is_active)
        else {
            return Ok(None);
        };

        session.is_active = false;
        session.end_time = Some(end_time);
        Ok(Some(session.clone()))
    }

    async fn insert_question(&self, question: NewQuestion) -> StoreResult<Question> {
        let mut tables = self.tables.write().await;
        let duplicate = tables.questions.values().any(|q| {
            q.session_ref == question.session_ref
                && q.student_name == question.student_name
                && q.content == question.content
        });
        if duplicate {
            return Err(StoreError::DuplicateQuestion);
        }

        let session = tables
            .sessions
            .get_mut(&question.session_ref)
            .ok_or(StoreError::NotFound("Session"))?;
        session.question_count += 1;

        let id = Tables::next(&mut tables.next_question_id);
        let flags = StatusFlags::new(question.timestamp);
        let question = Question {
            id,
            session_ref: question.session_ref,
            session_id: question.session_id,
            student_name: question.student_name,
            content: question.content,
            is_answered: flags.is_answered,
            is_important: flags.is_important,
            status: flags.status,
            timestamp: question.timestamp,
            last_status_update: flags.last_status_update,
        };
        tables.questions.insert(id, question.clone());
        Ok(question)
    }

    async fn get_question(&self, id: i64) -> StoreResult<Option<Question>> {
        Ok(self.tables.read().await.questions.get(&id).cloned())
    }

    async fn list_questions(
        &self,
        session_id: &str,
        filter: &QuestionFilter,
    ) -> StoreResult<Vec<Question>> {
        let tables = self.tables.read().await;
        let mut questions: Vec<Question> = tables
            .questions
            .values()
            .filter(|q| q.session_id == session_id && filter.matches(q))
            .cloned()
            .collect();
        questions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(questions)
    }

    async fn apply_status_action(
        &self,
        id: i64,
        action: StatusAction,
        now: DateTime<Utc>,
    ) -> StoreResult<(Question, bool)> {
        let mut tables = self.tables.write().await;
        let question = tables
            .questions
            .get_mut(&id)
            .ok_or(StoreError::NotFound("Question"))?;

        let mut flags = question.flags();
        let changed = flags.apply(action, now);
        if changed {
            question.set_flags(flags);
        }
        Ok((question.clone(), changed))
    }

    async fn delete_question(&self, id: i64) -> StoreResult<Question> {
        let mut tables = self.tables.write().await;
        let question = tables
            .questions
            .remove(&id)
            .ok_or(StoreError::NotFound("Question"))?;
        if let Some(session) = tables.sessions.get_mut(&question.session_ref) {
            session.question_count = (session.question_count - 1).max(0);
        }
        Ok(question)
    }
}
