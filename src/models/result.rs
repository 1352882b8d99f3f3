use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::feedback::Feedback;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    Excellent,
    Good,
    Average,
    Poor,
}

impl PerformanceTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            PerformanceTier::Excellent
        } else if score >= 75.0 {
            PerformanceTier::Good
        } else if score >= 60.0 {
            PerformanceTier::Average
        } else {
            PerformanceTier::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceTier::Excellent => "excellent",
            PerformanceTier::Good => "good",
            PerformanceTier::Average => "average",
            PerformanceTier::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_index: usize,
    pub question: String,
    pub options: BTreeMap<String, String>,
    pub selected: Vec<String>,
    pub correct_answers: Vec<String>,
    pub is_correct: bool,
    /// Share of the correct options that were picked, 0.0..=1.0.
    pub credit: f64,
    pub explanation: Option<String>,
}

/// Scored outcome of a finished test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub topic: String,
    pub score: f64,
    pub correct_count: i32,
    pub incorrect_count: i32,
    pub total_questions: i32,
    pub performance_tier: PerformanceTier,
    pub time_spent_seconds: i64,
    pub outcomes: Vec<QuestionOutcome>,
    pub feedback: Feedback,
    pub feedback_generated: bool,
    pub finished_at: DateTime<Utc>,
}

/// One row of the history list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub test_id: Uuid,
    pub subject: String,
    pub topic: String,
    pub score: f64,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub time_spent_seconds: i64,
    pub date: DateTime<Utc>,
    pub performance_tier: PerformanceTier,
}

impl From<&TestResult> for HistoryEntry {
    fn from(result: &TestResult) -> Self {
        Self {
            test_id: result.test_id,
            subject: result.subject.clone(),
            topic: result.topic.clone(),
            score: result.score,
            correct_answers: result.correct_count,
            total_questions: result.total_questions,
            time_spent_seconds: result.time_spent_seconds,
            date: result.finished_at,
            performance_tier: result.performance_tier,
        }
    }
}
