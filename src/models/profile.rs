use serde::{Deserialize, Serialize};

use crate::models::result::{HistoryEntry, PerformanceTier};
use crate::services::grading_service::round_one_decimal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSummary {
    pub subject: String,
    pub tests_taken: usize,
    pub average_score: f64,
}

/// Learning patterns derived from a student's finished tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningProfile {
    pub tests_taken: usize,
    pub average_score: f64,
    pub best_score: f64,
    pub latest_tier: Option<PerformanceTier>,
    pub strongest_subject: Option<String>,
    pub weakest_subject: Option<String>,
    pub subjects: Vec<SubjectSummary>,
}

impl LearningProfile {
    /// `history` is expected newest first.
    pub fn from_history(history: &[HistoryEntry]) -> Self {
        let mut subjects: Vec<SubjectSummary> = Vec::new();
        for entry in history {
            match subjects
                .iter_mut()
                .find(|s| s.subject.eq_ignore_ascii_case(&entry.subject))
            {
                Some(summary) => {
                    summary.average_score += entry.score;
                    summary.tests_taken += 1;
                }
                None => subjects.push(SubjectSummary {
                    subject: entry.subject.clone(),
                    tests_taken: 1,
                    average_score: entry.score,
                }),
            }
        }
        for summary in &mut subjects {
            summary.average_score = round_one_decimal(summary.average_score / summary.tests_taken as f64);
        }
        subjects.sort_by(|a, b| b.average_score.total_cmp(&a.average_score));

        let total: f64 = history.iter().map(|h| h.score).sum();
        let average_score = if history.is_empty() {
            0.0
        } else {
            round_one_decimal(total / history.len() as f64)
        };

        Self {
            tests_taken: history.len(),
            average_score,
            best_score: history.iter().map(|h| h.score).fold(0.0, f64::max),
            latest_tier: history.first().map(|h| h.performance_tier),
            strongest_subject: subjects.first().map(|s| s.subject.clone()),
            weakest_subject: (subjects.len() > 1)
                .then(|| subjects.last().map(|s| s.subject.clone()))
                .flatten(),
            subjects,
        }
    }
}
