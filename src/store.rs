//! Storage seam for feedback records and the course registry.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::FeedbackError;
use crate::models::{Course, FeedbackDraft, FeedbackRecord};

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Writes the record, assigning its id and timestamp.
    async fn save(&self, draft: FeedbackDraft) -> Result<FeedbackRecord, FeedbackError>;

    /// Appends `record_id` to the course's feedback list. Must be atomic with
    /// respect to concurrent appends for the same course.
    async fn link_to_course(&self, course_id: Uuid, record_id: Uuid) -> Result<(), FeedbackError>;

    async fn create_course(&self, course_name: &str) -> Result<Course, FeedbackError>;

    async fn list_courses(&self) -> Result<Vec<Course>, FeedbackError>;

    async fn find_course(&self, course_id: Uuid) -> Result<Option<Course>, FeedbackError>;

    /// Records linked to the course, in link order.
    async fn course_feedback(&self, course_id: Uuid) -> Result<Vec<FeedbackRecord>, FeedbackError>;

    async fn find_feedback(&self, record_id: Uuid) -> Result<Option<FeedbackRecord>, FeedbackError>;

    /// Persisted records that no course links to.
    async fn unlinked_feedback(&self) -> Result<Vec<FeedbackRecord>, FeedbackError>;
}

pub(crate) fn require_course_name(course_name: &str) -> Result<&str, FeedbackError> {
    let trimmed = course_name.trim();
    if trimmed.is_empty() {
        return Err(FeedbackError::Validation("courseName must not be empty".to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    #[derive(Default)]
    struct State {
        courses: Vec<Course>,
        records: HashMap<Uuid, FeedbackRecord>,
    }

    /// Mutex-guarded store used by tests. Appends happen under the lock.
    #[derive(Default)]
    pub struct MemoryStore {
        state: Mutex<State>,
        fail_saves: AtomicBool,
        fail_links: AtomicBool,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_saves(&self, fail: bool) {
            self.fail_saves.store(fail, Ordering::SeqCst);
        }

        pub fn fail_links(&self, fail: bool) {
            self.fail_links.store(fail, Ordering::SeqCst);
        }

        pub fn record_count(&self) -> usize {
            self.state.lock().unwrap().records.len()
        }
    }

    #[async_trait]
    impl FeedbackStore for MemoryStore {
        async fn save(&self, draft: FeedbackDraft) -> Result<FeedbackRecord, FeedbackError> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(FeedbackError::Persistence("store unavailable".to_string()));
            }
            let record = FeedbackRecord::from_draft(Uuid::new_v4(), Utc::now(), draft);
            self.state
                .lock()
                .unwrap()
                .records
                .insert(record.id, record.clone());
            Ok(record)
        }

        async fn link_to_course(&self, course_id: Uuid, record_id: Uuid) -> Result<(), FeedbackError> {
            let link_error = |reason: &str| FeedbackError::Link {
                record_id,
                course_id,
                reason: reason.to_string(),
            };
            if self.fail_links.load(Ordering::SeqCst) {
                return Err(link_error("store unavailable"));
            }
            let mut state = self.state.lock().unwrap();
            if !state.records.contains_key(&record_id) {
                return Err(link_error("feedback record does not exist"));
            }
            let course = state
                .courses
                .iter_mut()
                .find(|course| course.id == course_id)
                .ok_or_else(|| link_error("course not found"))?;
            course.feedback.push(record_id);
            Ok(())
        }

        async fn create_course(&self, course_name: &str) -> Result<Course, FeedbackError> {
            let course = Course {
                id: Uuid::new_v4(),
                course_name: require_course_name(course_name)?.to_string(),
                created_at: Utc::now(),
                feedback: Vec::new(),
            };
            self.state.lock().unwrap().courses.push(course.clone());
            Ok(course)
        }

        async fn list_courses(&self) -> Result<Vec<Course>, FeedbackError> {
            Ok(self.state.lock().unwrap().courses.clone())
        }

        async fn find_course(&self, course_id: Uuid) -> Result<Option<Course>, FeedbackError> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .courses
                .iter()
                .find(|course| course.id == course_id)
                .cloned())
        }

        async fn course_feedback(&self, course_id: Uuid) -> Result<Vec<FeedbackRecord>, FeedbackError> {
            let state = self.state.lock().unwrap();
            let course = state
                .courses
                .iter()
                .find(|course| course.id == course_id)
                .ok_or(FeedbackError::CourseNotFound(course_id))?;
            Ok(course
                .feedback
                .iter()
                .filter_map(|id| state.records.get(id).cloned())
                .collect())
        }

        async fn find_feedback(&self, record_id: Uuid) -> Result<Option<FeedbackRecord>, FeedbackError> {
            Ok(self.state.lock().unwrap().records.get(&record_id).cloned())
        }

        async fn unlinked_feedback(&self) -> Result<Vec<FeedbackRecord>, FeedbackError> {
            let state = self.state.lock().unwrap();
            let mut orphans: Vec<FeedbackRecord> = state
                .records
                .values()
                .filter(|record| {
                    !state
                        .courses
                        .iter()
                        .any(|course| course.feedback.contains(&record.id))
                })
                .cloned()
                .collect();
            orphans.sort_by_key(|record| record.timestamp);
            Ok(orphans)
        }
    }
}
