use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::answer::Answer;
use crate::models::flashcard::{FlashcardSet, NewFlashcardSet};
use crate::models::result::{HistoryEntry, TestResult};
use crate::models::school_context::{SchoolContext, SchoolContextInput};
use crate::models::test::{NewTest, StudyTest};
use crate::models::user::{NewUser, User};

/// Persistence boundary for everything a student owns.
///
/// Every read and write that takes an `owner` is scoped to that user: a
/// record belonging to someone else is reported as `Error::NotFound`.
/// Writes touching one test are serialized against each other.
#[async_trait]
pub trait StudyRepository: Send + Sync {
    /// Fails with `Error::BadRequest` when the username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn get_user(&self, user_id: Uuid) -> Result<User>;
    async fn record_login(&self, user_id: Uuid) -> Result<()>;

    async fn upsert_school_context(
        &self,
        owner: Uuid,
        input: SchoolContextInput,
    ) -> Result<SchoolContext>;
    async fn get_school_context(&self, owner: Uuid) -> Result<Option<SchoolContext>>;

    async fn create_test(&self, test: NewTest) -> Result<StudyTest>;
    async fn get_test(&self, owner: Uuid, test_id: Uuid) -> Result<StudyTest>;
    async fn list_answers(&self, owner: Uuid, test_id: Uuid) -> Result<Vec<Answer>>;

    /// Insert or overwrite the answer for `question_index`. Fails with
    /// `Error::InvalidState` once the answers are frozen or the test is
    /// finished.
    async fn upsert_answer(
        &self,
        owner: Uuid,
        test_id: Uuid,
        question_index: i32,
        selected: Vec<String>,
    ) -> Result<Answer>;

    /// Freeze the answers of an unfinished test and return it with the
    /// answers as they stand. Calling it again returns the same snapshot.
    async fn freeze_answers(&self, owner: Uuid, test_id: Uuid) -> Result<(StudyTest, Vec<Answer>)>;

    /// Store the result and mark the test finished in one step. If the test
    /// was already finished the stored result is returned untouched.
    async fn finalize_test(&self, owner: Uuid, result: TestResult) -> Result<TestResult>;
    async fn get_result(&self, owner: Uuid, test_id: Uuid) -> Result<TestResult>;
    async fn list_history(&self, owner: Uuid, limit: i64) -> Result<Vec<HistoryEntry>>;

    async fn create_flashcard_set(&self, set: NewFlashcardSet) -> Result<FlashcardSet>;
    async fn get_flashcard_set(&self, owner: Uuid, set_id: Uuid) -> Result<FlashcardSet>;
    async fn list_flashcard_sets(&self, owner: Uuid) -> Result<Vec<FlashcardSet>>;
}
