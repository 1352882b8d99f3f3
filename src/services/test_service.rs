use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::repository::StudyRepository;
use crate::error::{Error, Result};
use crate::models::answer::{Answer, AnswerCheck};
use crate::models::question::normalize_selection;
use crate::models::result::{HistoryEntry, TestResult};
use crate::models::test::{NewTest, StudyTest, TestProgress};
use crate::services::ai_service::{ExerciseGenerator, GenerationRequest};
use crate::services::feedback_service::{FeedbackRequest, FeedbackService, FeedbackSynthesizer};
use crate::services::grading_service::GradingService;
use crate::utils::validation::{require_range, require_text};

pub const MAX_TEXT_LEN: usize = 100;
pub const DEFAULT_HISTORY_LIMIT: i64 = 10;
pub const MAX_HISTORY_LIMIT: i64 = 50;

/// Drives a test from start to result. Holds no per-test state itself;
/// everything lives in the store keyed by test id.
#[derive(Clone)]
pub struct TestLifecycleService {
    store: Arc<dyn StudyRepository>,
    generator: Arc<dyn ExerciseGenerator>,
    feedback: Arc<dyn FeedbackSynthesizer>,
    max_questions: u32,
    seconds_per_question: u32,
}

impl TestLifecycleService {
    pub fn new(
        store: Arc<dyn StudyRepository>,
        generator: Arc<dyn ExerciseGenerator>,
        feedback: Arc<dyn FeedbackSynthesizer>,
        max_questions: u32,
        seconds_per_question: u32,
    ) -> Self {
        Self {
            store,
            generator,
            feedback,
            max_questions,
            seconds_per_question,
        }
    }

    fn time_limit_for(&self, count: usize) -> Result<i32> {
        u32::try_from(count)
            .ok()
            .and_then(|count| count.checked_mul(self.seconds_per_question))
            .and_then(|seconds| i32::try_from(seconds).ok())
            .ok_or_else(|| {
                Error::Config(format!(
                    "Time limit for {} questions at {} seconds each is out of range",
                    count, self.seconds_per_question
                ))
            })
    }

    pub async fn start(
        &self,
        owner: Uuid,
        subject: &str,
        topic: &str,
        count: u32,
    ) -> Result<StudyTest> {
        let subject = require_text("subject", subject, MAX_TEXT_LEN)?;
        let topic = require_text("topic", topic, MAX_TEXT_LEN)?;
        let count = require_range("question_count", count, 1, self.max_questions)?;

        let school_context = self.store.get_school_context(owner).await?;
        let questions = self
            .generator
            .generate(&GenerationRequest {
                subject: subject.clone(),
                topic: topic.clone(),
                count: count as usize,
                school_context,
            })
            .await?;

        if questions.len() != count as usize {
            return Err(Error::Generation(format!(
                "Expected {} questions, generator returned {}",
                count,
                questions.len()
            )));
        }

        let test = self
            .store
            .create_test(NewTest {
                user_id: owner,
                subject,
                topic,
                questions,
                time_limit_seconds: self.time_limit_for(count as usize)?,
            })
            .await?;

        tracing::info!(test_id = %test.id, user_id = %owner, count, "test started");
        Ok(test)
    }

    /// Records the selection for one question. The time limit is advisory
    /// and does not reject late answers.
    pub async fn save_answer(
        &self,
        owner: Uuid,
        test_id: Uuid,
        question_index: usize,
        selected: &[String],
    ) -> Result<Answer> {
        let test = self.store.get_test(owner, test_id).await?;
        let keys = Self::checked_selection(&test, question_index, selected)?;

        let answer = self
            .store
            .upsert_answer(owner, test_id, question_index as i32, keys)
            .await?;
        tracing::debug!(test_id = %test_id, question_index, "answer saved");
        Ok(answer)
    }

    /// Saves the answer like `save_answer` and grades that one question
    /// right away.
    pub async fn submit_answer(
        &self,
        owner: Uuid,
        test_id: Uuid,
        question_index: usize,
        selected: &[String],
    ) -> Result<AnswerCheck> {
        let test = self.store.get_test(owner, test_id).await?;
        let keys = Self::checked_selection(&test, question_index, selected)?;
        let answer = self
            .store
            .upsert_answer(owner, test_id, question_index as i32, keys)
            .await?;

        let outcome = GradingService::grade_question(
            question_index,
            &test.questions[question_index],
            &answer.selected,
        );
        let hits = outcome
            .selected
            .iter()
            .filter(|k| outcome.correct_answers.contains(k))
            .count();
        tracing::debug!(test_id = %test_id, question_index, correct = outcome.is_correct, "answer submitted");

        Ok(AnswerCheck {
            question_index,
            feedback: AnswerCheck::feedback_line(
                outcome.is_correct,
                hits,
                outcome.correct_answers.len(),
            ),
            selected: outcome.selected,
            is_correct: outcome.is_correct,
            score: outcome.credit,
            correct_answers: outcome.correct_answers,
            explanation: outcome.explanation,
        })
    }

    /// Validates a selection against the test and returns the normalized keys.
    fn checked_selection(
        test: &StudyTest,
        question_index: usize,
        selected: &[String],
    ) -> Result<Vec<String>> {
        test.ensure_accepts_answers()?;

        let question = test.questions.get(question_index).ok_or_else(|| {
            Error::BadRequest(format!(
                "Question index {} is out of range (test has {} questions)",
                question_index,
                test.question_count()
            ))
        })?;

        let keys = normalize_selection(selected);
        if let Some(unknown) = keys.iter().find(|k| !question.has_option(k)) {
            return Err(Error::BadRequest(format!(
                "Option '{}' does not exist on question {}",
                unknown, question_index
            )));
        }
        Ok(keys)
    }

    /// Scores the test and stores the result. Calling it again returns the
    /// stored result unchanged.
    ///
    /// Answers are frozen before scoring, so a save racing with `finish` is
    /// either counted or rejected with `Error::InvalidState`.
    pub async fn finish(&self, owner: Uuid, test_id: Uuid) -> Result<TestResult> {
        let (test, answers) = self.store.freeze_answers(owner, test_id).await?;
        if test.is_finished() {
            return self.store.get_result(owner, test_id).await;
        }

        let card = GradingService::score(&test.questions, &answers);
        let school_context = self.store.get_school_context(owner).await?;

        let request = FeedbackRequest {
            subject: test.subject.clone(),
            topic: test.topic.clone(),
            score: card.score,
            correct_count: card.correct_count,
            total_questions: card.total_questions,
            tier: card.tier,
            outcomes: card.outcomes.clone(),
            school_context,
        };
        let (feedback, feedback_generated) = match self.feedback.synthesize(&request).await {
            Ok(feedback) => (feedback, true),
            Err(e) => {
                tracing::warn!(test_id = %test_id, error = %e, "feedback unavailable, using placeholder");
                (
                    FeedbackService::placeholder(card.score, card.correct_count, card.total_questions),
                    false,
                )
            }
        };

        let finished_at = Utc::now();
        let result = TestResult {
            test_id,
            user_id: owner,
            subject: test.subject,
            topic: test.topic,
            score: card.score,
            correct_count: card.correct_count,
            incorrect_count: card.incorrect_count,
            total_questions: card.total_questions,
            performance_tier: card.tier,
            time_spent_seconds: (finished_at - test.created_at).num_seconds().max(0),
            outcomes: card.outcomes,
            feedback,
            feedback_generated,
            finished_at,
        };

        let stored = self.store.finalize_test(owner, result).await?;
        tracing::info!(
            test_id = %test_id,
            score = stored.score,
            tier = stored.performance_tier.as_str(),
            "test finished"
        );
        Ok(stored)
    }

    /// Starts a new test over the same question set with a fresh time limit.
    pub async fn retake(&self, owner: Uuid, test_id: Uuid) -> Result<StudyTest> {
        let source = self.store.get_test(owner, test_id).await?;
        let time_limit_seconds = self.time_limit_for(source.question_count())?;

        let test = self
            .store
            .create_test(NewTest {
                user_id: owner,
                subject: source.subject,
                topic: source.topic,
                questions: source.questions,
                time_limit_seconds,
            })
            .await?;

        tracing::info!(test_id = %test.id, source_id = %test_id, "test retaken");
        Ok(test)
    }

    pub async fn status(&self, owner: Uuid, test_id: Uuid) -> Result<TestProgress> {
        let test = self.store.get_test(owner, test_id).await?;
        let answers = self.store.list_answers(owner, test_id).await?;
        let time_remaining_seconds = if test.is_finished() {
            0
        } else {
            test.time_remaining_seconds(Utc::now())
        };

        Ok(TestProgress {
            test: test.to_view(),
            answered_count: answers.iter().filter(|a| !a.selected.is_empty()).count(),
            answers,
            time_remaining_seconds,
        })
    }

    pub async fn result(&self, owner: Uuid, test_id: Uuid) -> Result<TestResult> {
        self.store.get_result(owner, test_id).await
    }

    pub async fn history(&self, owner: Uuid, limit: Option<i64>) -> Result<Vec<HistoryEntry>> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        self.store.list_history(owner, limit).await
    }
}
