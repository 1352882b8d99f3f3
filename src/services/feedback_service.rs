use async_trait::async_trait;

use crate::error::Result;
use crate::models::feedback::{Feedback, Recommendation};
use crate::models::result::{PerformanceTier, QuestionOutcome};
use crate::models::school_context::SchoolContext;

#[derive(Debug, Clone)]
pub struct FeedbackRequest {
    pub subject: String,
    pub topic: String,
    pub score: f64,
    pub correct_count: i32,
    pub total_questions: i32,
    pub tier: PerformanceTier,
    pub outcomes: Vec<QuestionOutcome>,
    pub school_context: Option<SchoolContext>,
}

/// Writes coaching feedback for a scored test.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedbackSynthesizer: Send + Sync {
    async fn synthesize(&self, request: &FeedbackRequest) -> Result<Feedback>;
}

pub struct FeedbackService;

impl FeedbackService {
    /// Deterministic feedback used when the synthesizer is unavailable.
    pub fn placeholder(score: f64, correct: i32, total: i32) -> Feedback {
        let tier = PerformanceTier::from_score(score);
        let (assessment, encouragement) = match tier {
            PerformanceTier::Excellent => (
                "Excellent work, you have a strong command of this topic.",
                "Keep challenging yourself with harder material.",
            ),
            PerformanceTier::Good => (
                "Good job, you understand most of this topic.",
                "A little more practice will take you to the top tier.",
            ),
            PerformanceTier::Average => (
                "A fair result with some gaps left to close.",
                "Steady practice will make a clear difference.",
            ),
            PerformanceTier::Poor => (
                "This topic needs more work before it sticks.",
                "Every attempt builds understanding, keep going.",
            ),
        };

        let missed = (total - correct).max(0);
        let mut main_weaknesses = Vec::new();
        if missed > 0 {
            main_weaknesses.push(format!("{} of {} questions were answered incorrectly", missed, total));
        }

        Feedback {
            overall_assessment: format!(
                "You answered {} of {} questions correctly ({:.1}%). {}",
                correct, total, score, assessment
            ),
            key_strengths: if correct > 0 {
                vec![format!("{} correct answers", correct)]
            } else {
                vec![]
            },
            main_weaknesses,
            learning_recommendations: vec![Recommendation {
                priority: if missed > 0 { "high" } else { "low" }.to_string(),
                area: "Review".to_string(),
                action: "Go through the explanations of the questions you missed".to_string(),
                reason: "Understanding each mistake prevents repeating it".to_string(),
            }],
            conceptual_understanding: format!("Performance tier: {}", tier.as_str()),
            next_steps: vec![
                "Review the explanations".to_string(),
                "Retake the test to check your progress".to_string(),
            ],
            encouragement: encouragement.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_mentions_score_and_is_stable() {
        let a = FeedbackService::placeholder(66.7, 2, 3);
        let b = FeedbackService::placeholder(66.7, 2, 3);
        assert_eq!(a, b);
        assert!(a.overall_assessment.contains("2 of 3"));
        assert!(a.overall_assessment.contains("66.7%"));
        assert_eq!(a.main_weaknesses.len(), 1);
        assert_eq!(a.learning_recommendations[0].priority, "high");
    }

    #[test]
    fn perfect_score_has_no_weaknesses() {
        let fb = FeedbackService::placeholder(100.0, 5, 5);
        assert!(fb.main_weaknesses.is_empty());
        assert_eq!(fb.learning_recommendations[0].priority, "low");
    }
}
