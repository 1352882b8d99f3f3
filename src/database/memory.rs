use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::repository::StudyRepository;
use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::flashcard::{FlashcardSet, NewFlashcardSet};
use crate::models::result::{HistoryEntry, TestResult};
use crate::models::school_context::{SchoolContext, SchoolContextInput};
use crate::models::test::{NewTest, StudyTest, TestStatus};
use crate::models::user::{NewUser, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    school_contexts: HashMap<Uuid, SchoolContext>,
    tests: HashMap<Uuid, StudyTest>,
    answers: HashMap<Uuid, BTreeMap<i32, Answer>>,
    results: HashMap<Uuid, TestResult>,
    flashcards: HashMap<Uuid, FlashcardSet>,
}

impl Tables {
    fn owned_test(&self, owner: Uuid, test_id: Uuid) -> Result<&StudyTest> {
        self.tests
            .get(&test_id)
            .filter(|t| t.user_id == owner)
            .ok_or_else(|| Error::NotFound(format!("Test {} not found", test_id)))
    }
}

/// Store kept entirely in process memory. Used by the test suite and when
/// the service runs without `DATABASE_URL`; nothing survives a restart.
///
/// All writes go through one lock, so writes to the same test never
/// interleave.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StudyRepository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(Error::BadRequest("Username is already taken".to_string()));
        }
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
            last_login: None,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn get_user(&self, user_id: Uuid) -> Result<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    async fn record_login(&self, user_id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        user.last_login = Some(Utc::now());
        Ok(())
    }

    async fn upsert_school_context(
        &self,
        owner: Uuid,
        input: SchoolContextInput,
    ) -> Result<SchoolContext> {
        let mut tables = self.tables.write().await;
        let context = SchoolContext {
            user_id: owner,
            grade: input.grade,
            school_type: input.school_type,
            state: input.state,
            subjects: input.subjects,
            curriculum_focus: input.curriculum_focus,
            updated_at: Utc::now(),
        };
        tables.school_contexts.insert(owner, context.clone());
        Ok(context)
    }

    async fn get_school_context(&self, owner: Uuid) -> Result<Option<SchoolContext>> {
        let tables = self.tables.read().await;
        Ok(tables.school_contexts.get(&owner).cloned())
    }

    async fn create_test(&self, test: NewTest) -> Result<StudyTest> {
        let mut tables = self.tables.write().await;
        let created = StudyTest {
            id: Uuid::new_v4(),
            user_id: test.user_id,
            subject: test.subject,
            topic: test.topic,
            questions: test.questions,
            time_limit_seconds: test.time_limit_seconds,
            status: TestStatus::InProgress,
            created_at: Utc::now(),
            grading_started_at: None,
            finished_at: None,
        };
        tables.tests.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_test(&self, owner: Uuid, test_id: Uuid) -> Result<StudyTest> {
        let tables = self.tables.read().await;
        tables.owned_test(owner, test_id).cloned()
    }

    async fn list_answers(&self, owner: Uuid, test_id: Uuid) -> Result<Vec<Answer>> {
        let tables = self.tables.read().await;
        tables.owned_test(owner, test_id)?;
        Ok(tables
            .answers
            .get(&test_id)
            .map(|by_index| by_index.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert_answer(
        &self,
        owner: Uuid,
        test_id: Uuid,
        question_index: i32,
        selected: Vec<String>,
    ) -> Result<Answer> {
        let mut tables = self.tables.write().await;
        tables.owned_test(owner, test_id)?.ensure_accepts_answers()?;
        let answer = Answer {
            test_id,
            question_index,
            selected,
            answered_at: Utc::now(),
        };
        tables
            .answers
            .entry(test_id)
            .or_default()
            .insert(question_index, answer.clone());
        Ok(answer)
    }

    async fn freeze_answers(
        &self,
        owner: Uuid,
        test_id: Uuid,
    ) -> Result<(StudyTest, Vec<Answer>)> {
        let mut tables = self.tables.write().await;
        tables.owned_test(owner, test_id)?;
        let test = match tables.tests.get_mut(&test_id) {
            Some(test) => {
                if !test.is_finished() && test.grading_started_at.is_none() {
                    test.grading_started_at = Some(Utc::now());
                }
                test.clone()
            }
            None => return Err(Error::NotFound(format!("Test {} not found", test_id))),
        };
        let answers = tables
            .answers
            .get(&test_id)
            .map(|by_index| by_index.values().cloned().collect())
            .unwrap_or_default();
        Ok((test, answers))
    }

    async fn finalize_test(&self, owner: Uuid, result: TestResult) -> Result<TestResult> {
        let mut tables = self.tables.write().await;
        let test_id = result.test_id;
        if tables.owned_test(owner, test_id)?.is_finished() {
            return tables
                .results
                .get(&test_id)
                .cloned()
                .ok_or_else(|| Error::Internal(format!("Result of test {} is missing", test_id)));
        }
        if let Some(test) = tables.tests.get_mut(&test_id) {
            test.status = TestStatus::Finished;
            test.finished_at = Some(result.finished_at);
        }
        tables.results.insert(test_id, result.clone());
        Ok(result)
    }

    async fn get_result(&self, owner: Uuid, test_id: Uuid) -> Result<TestResult> {
        let tables = self.tables.read().await;
        tables.owned_test(owner, test_id)?;
        tables
            .results
            .get(&test_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Test {} has no result yet", test_id)))
    }

    async fn list_history(&self, owner: Uuid, limit: i64) -> Result<Vec<HistoryEntry>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<HistoryEntry> = tables
            .results
            .values()
            .filter(|r| r.user_id == owner)
            .map(HistoryEntry::from)
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }

    async fn create_flashcard_set(&self, set: NewFlashcardSet) -> Result<FlashcardSet> {
        let mut tables = self.tables.write().await;
        let created = FlashcardSet {
            id: Uuid::new_v4(),
            user_id: set.user_id,
            subject: set.subject,
            topic: set.topic,
            cards: set.cards,
            created_at: Utc::now(),
        };
        tables.flashcards.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_flashcard_set(&self, owner: Uuid, set_id: Uuid) -> Result<FlashcardSet> {
        let tables = self.tables.read().await;
        tables
            .flashcards
            .get(&set_id)
            .filter(|s| s.user_id == owner)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Flashcard set {} not found", set_id)))
    }

    async fn list_flashcard_sets(&self, owner: Uuid) -> Result<Vec<FlashcardSet>> {
        let tables = self.tables.read().await;
        let mut sets: Vec<FlashcardSet> = tables
            .flashcards
            .values()
            .filter(|s| s.user_id == owner)
            .cloned()
            .collect();
        sets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::feedback::Feedback;
    use crate::models::question::sample_question;
    use crate::models::result::PerformanceTier;

    fn new_test(owner: Uuid) -> NewTest {
        NewTest {
            user_id: owner,
            subject: "Math".into(),
            topic: "Fractions".into(),
            questions: vec![sample_question(&["A"]), sample_question(&["B"])],
            time_limit_seconds: 120,
        }
    }

    fn result_for(test: &StudyTest, score: f64) -> TestResult {
        TestResult {
            test_id: test.id,
            user_id: test.user_id,
            subject: test.subject.clone(),
            topic: test.topic.clone(),
            score,
            correct_count: 1,
            incorrect_count: 1,
            total_questions: 2,
            performance_tier: PerformanceTier::from_score(score),
            time_spent_seconds: 30,
            outcomes: vec![],
            feedback: Feedback {
                overall_assessment: "ok".into(),
                key_strengths: vec![],
                main_weaknesses: vec![],
                learning_recommendations: vec![],
                conceptual_understanding: String::new(),
                next_steps: vec![],
                encouragement: String::new(),
            },
            feedback_generated: false,
            finished_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn answer_upsert_keeps_one_row_per_index() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let test = store.create_test(new_test(owner)).await.unwrap();

        store.upsert_answer(owner, test.id, 0, vec!["A".into()]).await.unwrap();
        store.upsert_answer(owner, test.id, 0, vec!["A".into()]).await.unwrap();
        store.upsert_answer(owner, test.id, 0, vec!["C".into()]).await.unwrap();

        let answers = store.list_answers(owner, test.id).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].selected, vec!["C".to_string()]);
    }

    #[tokio::test]
    async fn finalize_twice_keeps_first_result() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let test = store.create_test(new_test(owner)).await.unwrap();

        let first = store.finalize_test(owner, result_for(&test, 50.0)).await.unwrap();
        let second = store.finalize_test(owner, result_for(&test, 100.0)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.score, 50.0);

        let stored = store.get_test(owner, test.id).await.unwrap();
        assert_eq!(stored.status, TestStatus::Finished);

        let err = store
            .upsert_answer(owner, test.id, 1, vec!["B".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn frozen_answers_reject_late_writes() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let test = store.create_test(new_test(owner)).await.unwrap();
        store.upsert_answer(owner, test.id, 0, vec!["A".into()]).await.unwrap();

        let (frozen, answers) = store.freeze_answers(owner, test.id).await.unwrap();
        assert!(frozen.grading_started_at.is_some());
        assert_eq!(frozen.status, TestStatus::InProgress);
        assert_eq!(answers.len(), 1);

        let err = store
            .upsert_answer(owner, test.id, 1, vec!["B".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));

        let (again, answers) = store.freeze_answers(owner, test.id).await.unwrap();
        assert_eq!(again.grading_started_at, frozen.grading_started_at);
        assert_eq!(answers.len(), 1);
    }

    #[tokio::test]
    async fn other_users_cannot_see_records() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let test = store.create_test(new_test(owner)).await.unwrap();

        assert!(matches!(
            store.get_test(stranger, test.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.upsert_answer(stranger, test.id, 0, vec![]).await,
            Err(Error::NotFound(_))
        ));
        assert!(store.list_history(stranger, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = MemoryStore::new();
        let user = NewUser {
            username: "mia".into(),
            email: "mia@example.com".into(),
            password_hash: "hash".into(),
            role: "student".into(),
        };
        store.create_user(user.clone()).await.unwrap();
        let err = store
            .create_user(NewUser {
                username: "MIA".into(),
                ..user
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }
}
