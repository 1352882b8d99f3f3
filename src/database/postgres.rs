use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::repository::StudyRepository;
use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::feedback::Feedback;
use crate::models::flashcard::{Flashcard, FlashcardSet, NewFlashcardSet};
use crate::models::question::Question;
use crate::models::result::{HistoryEntry, PerformanceTier, QuestionOutcome, TestResult};
use crate::models::school_context::{SchoolContext, SchoolContextInput};
use crate::models::test::{NewTest, StudyTest, TestStatus};
use crate::models::user::{NewUser, User};

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role,
            created_at: row.created_at,
            last_login: row.last_login,
        }
    }
}

#[derive(FromRow)]
struct SchoolContextRow {
    user_id: Uuid,
    grade: String,
    school_type: String,
    state: String,
    subjects: Json<Vec<String>>,
    curriculum_focus: String,
    updated_at: DateTime<Utc>,
}

impl From<SchoolContextRow> for SchoolContext {
    fn from(row: SchoolContextRow) -> Self {
        Self {
            user_id: row.user_id,
            grade: row.grade,
            school_type: row.school_type,
            state: row.state,
            subjects: row.subjects.0,
            curriculum_focus: row.curriculum_focus,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct TestRow {
    id: Uuid,
    user_id: Uuid,
    subject: String,
    topic: String,
    questions: Json<Vec<Question>>,
    time_limit_seconds: i32,
    status: String,
    created_at: DateTime<Utc>,
    grading_started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl TryFrom<TestRow> for StudyTest {
    type Error = Error;

    fn try_from(row: TestRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            subject: row.subject,
            topic: row.topic,
            questions: row.questions.0,
            time_limit_seconds: row.time_limit_seconds,
            status: row.status.parse::<TestStatus>()?,
            created_at: row.created_at,
            grading_started_at: row.grading_started_at,
            finished_at: row.finished_at,
        })
    }
}

#[derive(FromRow)]
struct AnswerRow {
    test_id: Uuid,
    question_index: i32,
    selected: Json<Vec<String>>,
    answered_at: DateTime<Utc>,
}

impl From<AnswerRow> for Answer {
    fn from(row: AnswerRow) -> Self {
        Self {
            test_id: row.test_id,
            question_index: row.question_index,
            selected: row.selected.0,
            answered_at: row.answered_at,
        }
    }
}

#[derive(FromRow)]
struct ResultRow {
    test_id: Uuid,
    user_id: Uuid,
    subject: String,
    topic: String,
    score: f64,
    correct_count: i32,
    incorrect_count: i32,
    total_questions: i32,
    time_spent_seconds: i64,
    outcomes: Json<Vec<QuestionOutcome>>,
    feedback: Json<Feedback>,
    feedback_generated: bool,
    finished_at: DateTime<Utc>,
}

impl From<ResultRow> for TestResult {
    fn from(row: ResultRow) -> Self {
        Self {
            test_id: row.test_id,
            user_id: row.user_id,
            subject: row.subject,
            topic: row.topic,
            score: row.score,
            correct_count: row.correct_count,
            incorrect_count: row.incorrect_count,
            total_questions: row.total_questions,
            performance_tier: PerformanceTier::from_score(row.score),
            time_spent_seconds: row.time_spent_seconds,
            outcomes: row.outcomes.0,
            feedback: row.feedback.0,
            feedback_generated: row.feedback_generated,
            finished_at: row.finished_at,
        }
    }
}

#[derive(FromRow)]
struct HistoryRow {
    test_id: Uuid,
    subject: String,
    topic: String,
    score: f64,
    correct_count: i32,
    total_questions: i32,
    time_spent_seconds: i64,
    finished_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct FlashcardSetRow {
    id: Uuid,
    user_id: Uuid,
    subject: String,
    topic: String,
    cards: Json<Vec<Flashcard>>,
    created_at: DateTime<Utc>,
}

impl From<FlashcardSetRow> for FlashcardSet {
    fn from(row: FlashcardSetRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            subject: row.subject,
            topic: row.topic,
            cards: row.cards.0,
            created_at: row.created_at,
        }
    }
}

const TEST_COLUMNS: &str = "id, user_id, subject, topic, questions, time_limit_seconds, status, created_at, grading_started_at, finished_at";
const RESULT_COLUMNS: &str = "test_id, user_id, subject, topic, score, correct_count, incorrect_count, total_questions, time_spent_seconds, outcomes, feedback, feedback_generated, finished_at";

/// PostgreSQL-backed store. Writes that touch a test take a row lock on it
/// inside a transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Locks the test row for the rest of the transaction.
    async fn lock_test(
        tx: &mut Transaction<'_, Postgres>,
        owner: Uuid,
        test_id: Uuid,
    ) -> Result<StudyTest> {
        let sql = format!(
            "SELECT {} FROM study_tests WHERE id = $1 AND user_id = $2 FOR UPDATE",
            TEST_COLUMNS
        );
        sqlx::query_as::<_, TestRow>(&sql)
            .bind(test_id)
            .bind(owner)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Test {} not found", test_id)))?
            .try_into()
    }

    async fn answers_in(
        tx: &mut Transaction<'_, Postgres>,
        test_id: Uuid,
    ) -> Result<Vec<Answer>> {
        let rows = sqlx::query_as::<_, AnswerRow>(
            r#"
            SELECT test_id, question_index, selected, answered_at
            FROM test_answers
            WHERE test_id = $1
            ORDER BY question_index
            "#,
        )
        .bind(test_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.into_iter().map(Answer::from).collect())
    }
}

#[async_trait]
impl StudyRepository for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let inserted = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, username, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, email, password_hash, role, created_at, last_login
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.role)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(row) => Ok(row.into()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(Error::BadRequest("Username is already taken".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"SELECT id, username, email, password_hash, role, created_at, last_login
               FROM users WHERE LOWER(username) = LOWER($1)"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn get_user(&self, user_id: Uuid) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"SELECT id, username, email, password_hash, role, created_at, last_login
               FROM users WHERE id = $1"#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn record_login(&self, user_id: Uuid) -> Result<()> {
        sqlx::query(r#"UPDATE users SET last_login = NOW() WHERE id = $1"#)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_school_context(
        &self,
        owner: Uuid,
        input: SchoolContextInput,
    ) -> Result<SchoolContext> {
        let row = sqlx::query_as::<_, SchoolContextRow>(
            r#"
            INSERT INTO school_contexts (user_id, grade, school_type, state, subjects, curriculum_focus, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET grade = EXCLUDED.grade,
                school_type = EXCLUDED.school_type,
                state = EXCLUDED.state,
                subjects = EXCLUDED.subjects,
                curriculum_focus = EXCLUDED.curriculum_focus,
                updated_at = NOW()
            RETURNING user_id, grade, school_type, state, subjects, curriculum_focus, updated_at
            "#,
        )
        .bind(owner)
        .bind(&input.grade)
        .bind(&input.school_type)
        .bind(&input.state)
        .bind(Json(&input.subjects))
        .bind(&input.curriculum_focus)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_school_context(&self, owner: Uuid) -> Result<Option<SchoolContext>> {
        let row = sqlx::query_as::<_, SchoolContextRow>(
            r#"SELECT user_id, grade, school_type, state, subjects, curriculum_focus, updated_at
               FROM school_contexts WHERE user_id = $1"#,
        )
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SchoolContext::from))
    }

    async fn create_test(&self, test: NewTest) -> Result<StudyTest> {
        let sql = format!(
            r#"
            INSERT INTO study_tests (id, user_id, subject, topic, questions, time_limit_seconds, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'in_progress')
            RETURNING {}
            "#,
            TEST_COLUMNS
        );
        let row = sqlx::query_as::<_, TestRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(test.user_id)
            .bind(&test.subject)
            .bind(&test.topic)
            .bind(Json(&test.questions))
            .bind(test.time_limit_seconds)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn get_test(&self, owner: Uuid, test_id: Uuid) -> Result<StudyTest> {
        let sql = format!(
            "SELECT {} FROM study_tests WHERE id = $1 AND user_id = $2",
            TEST_COLUMNS
        );
        let row = sqlx::query_as::<_, TestRow>(&sql)
            .bind(test_id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Test {} not found", test_id)))?;
        row.try_into()
    }

    async fn list_answers(&self, owner: Uuid, test_id: Uuid) -> Result<Vec<Answer>> {
        let rows = sqlx::query_as::<_, AnswerRow>(
            r#"
            SELECT a.test_id, a.question_index, a.selected, a.answered_at
            FROM test_answers a
            JOIN study_tests t ON t.id = a.test_id
            WHERE a.test_id = $1 AND t.user_id = $2
            ORDER BY a.question_index
            "#,
        )
        .bind(test_id)
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Answer::from).collect())
    }

    async fn upsert_answer(
        &self,
        owner: Uuid,
        test_id: Uuid,
        question_index: i32,
        selected: Vec<String>,
    ) -> Result<Answer> {
        let mut tx = self.pool.begin().await?;

        Self::lock_test(&mut tx, owner, test_id)
            .await?
            .ensure_accepts_answers()?;

        let row = sqlx::query_as::<_, AnswerRow>(
            r#"
            INSERT INTO test_answers (test_id, question_index, selected, answered_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (test_id, question_index) DO UPDATE
            SET selected = EXCLUDED.selected, answered_at = EXCLUDED.answered_at
            RETURNING test_id, question_index, selected, answered_at
            "#,
        )
        .bind(test_id)
        .bind(question_index)
        .bind(Json(&selected))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn freeze_answers(
        &self,
        owner: Uuid,
        test_id: Uuid,
    ) -> Result<(StudyTest, Vec<Answer>)> {
        let mut tx = self.pool.begin().await?;

        let mut test = Self::lock_test(&mut tx, owner, test_id).await?;
        if !test.is_finished() && test.grading_started_at.is_none() {
            let frozen_at: DateTime<Utc> = sqlx::query_scalar(
                r#"UPDATE study_tests SET grading_started_at = NOW() WHERE id = $1 RETURNING grading_started_at"#,
            )
            .bind(test_id)
            .fetch_one(&mut *tx)
            .await?;
            test.grading_started_at = Some(frozen_at);
        }
        let answers = Self::answers_in(&mut tx, test_id).await?;

        tx.commit().await?;
        Ok((test, answers))
    }

    async fn finalize_test(&self, owner: Uuid, result: TestResult) -> Result<TestResult> {
        let mut tx = self.pool.begin().await?;
        let select_result = format!("SELECT {} FROM test_results WHERE test_id = $1", RESULT_COLUMNS);

        if Self::lock_test(&mut tx, owner, result.test_id).await?.is_finished() {
            let existing = sqlx::query_as::<_, ResultRow>(&select_result)
                .bind(result.test_id)
                .fetch_one(&mut *tx)
                .await?;
            tx.commit().await?;
            return Ok(existing.into());
        }

        sqlx::query(
            r#"
            INSERT INTO test_results (
                test_id, user_id, subject, topic, score, correct_count, incorrect_count,
                total_questions, performance_tier, time_spent_seconds, outcomes, feedback,
                feedback_generated, finished_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(result.test_id)
        .bind(result.user_id)
        .bind(&result.subject)
        .bind(&result.topic)
        .bind(result.score)
        .bind(result.correct_count)
        .bind(result.incorrect_count)
        .bind(result.total_questions)
        .bind(result.performance_tier.as_str())
        .bind(result.time_spent_seconds)
        .bind(Json(&result.outcomes))
        .bind(Json(&result.feedback))
        .bind(result.feedback_generated)
        .bind(result.finished_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"UPDATE study_tests SET status = 'finished', finished_at = $2 WHERE id = $1"#,
        )
        .bind(result.test_id)
        .bind(result.finished_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result)
    }

    async fn get_result(&self, owner: Uuid, test_id: Uuid) -> Result<TestResult> {
        let sql = format!(
            "SELECT {} FROM test_results WHERE test_id = $1 AND user_id = $2",
            RESULT_COLUMNS
        );
        let row = sqlx::query_as::<_, ResultRow>(&sql)
            .bind(test_id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Test {} has no result yet", test_id)))?;
        Ok(row.into())
    }

    async fn list_history(&self, owner: Uuid, limit: i64) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT test_id, subject, topic, score, correct_count, total_questions,
                   time_spent_seconds, finished_at
            FROM test_results
            WHERE user_id = $1
            ORDER BY finished_at DESC
            LIMIT $2
            "#,
        )
        .bind(owner)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| HistoryEntry {
                test_id: row.test_id,
                subject: row.subject,
                topic: row.topic,
                score: row.score,
                correct_answers: row.correct_count,
                total_questions: row.total_questions,
                time_spent_seconds: row.time_spent_seconds,
                date: row.finished_at,
                performance_tier: PerformanceTier::from_score(row.score),
            })
            .collect())
    }

    async fn create_flashcard_set(&self, set: NewFlashcardSet) -> Result<FlashcardSet> {
        let row = sqlx::query_as::<_, FlashcardSetRow>(
            r#"
            INSERT INTO flashcard_sets (id, user_id, subject, topic, cards)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, subject, topic, cards, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(set.user_id)
        .bind(&set.subject)
        .bind(&set.topic)
        .bind(Json(&set.cards))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_flashcard_set(&self, owner: Uuid, set_id: Uuid) -> Result<FlashcardSet> {
        let row = sqlx::query_as::<_, FlashcardSetRow>(
            r#"SELECT id, user_id, subject, topic, cards, created_at
               FROM flashcard_sets WHERE id = $1 AND user_id = $2"#,
        )
        .bind(set_id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Flashcard set {} not found", set_id)))?;
        Ok(row.into())
    }

    async fn list_flashcard_sets(&self, owner: Uuid) -> Result<Vec<FlashcardSet>> {
        let rows = sqlx::query_as::<_, FlashcardSetRow>(
            r#"SELECT id, user_id, subject, topic, cards, created_at
               FROM flashcard_sets WHERE user_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(FlashcardSet::from).collect())
    }
}
