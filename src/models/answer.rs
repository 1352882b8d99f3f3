use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub test_id: Uuid,
    pub question_index: i32,
    pub selected: Vec<String>,
    pub answered_at: DateTime<Utc>,
}

/// Immediate check of one submitted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerCheck {
    pub question_index: usize,
    pub selected: Vec<String>,
    pub is_correct: bool,
    /// Share of the correct options that were picked.
    pub score: f64,
    pub correct_answers: Vec<String>,
    pub explanation: Option<String>,
    pub feedback: String,
}

impl AnswerCheck {
    pub fn feedback_line(is_correct: bool, hits: usize, expected: usize) -> String {
        if is_correct {
            "All correct answers selected!".to_string()
        } else {
            format!("{} of {} correct answers found.", hits, expected)
        }
    }
}
