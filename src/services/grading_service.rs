use std::collections::HashMap;

use crate::models::answer::Answer;
use crate::models::question::{normalize_selection, Question};
use crate::models::result::{PerformanceTier, QuestionOutcome};

#[derive(Debug, Clone, PartialEq)]
pub struct Scorecard {
    pub score: f64,
    pub correct_count: i32,
    pub incorrect_count: i32,
    pub total_questions: i32,
    pub tier: PerformanceTier,
    pub outcomes: Vec<QuestionOutcome>,
}

pub struct GradingService;

impl GradingService {
    /// Scores saved answers against the stored question set. A question
    /// counts as correct only when the selected keys equal the correct keys
    /// exactly; unanswered questions are incorrect.
    pub fn score(questions: &[Question], answers: &[Answer]) -> Scorecard {
        let by_index: HashMap<i32, &Answer> =
            answers.iter().map(|a| (a.question_index, a)).collect();

        let outcomes: Vec<QuestionOutcome> = questions
            .iter()
            .enumerate()
            .map(|(idx, q)| {
                let selected = by_index
                    .get(&(idx as i32))
                    .map(|a| a.selected.as_slice())
                    .unwrap_or_default();
                Self::grade_question(idx, q, selected)
            })
            .collect();

        let total = outcomes.len() as i32;
        let correct = outcomes.iter().filter(|o| o.is_correct).count() as i32;
        let ratio = raw_percentage(correct, total);

        Scorecard {
            score: round_one_decimal(ratio),
            correct_count: correct,
            incorrect_count: total - correct,
            total_questions: total,
            tier: PerformanceTier::from_score(ratio),
            outcomes,
        }
    }

    /// Grades one selection. `credit` is the share of correct keys picked.
    pub fn grade_question(index: usize, question: &Question, selected: &[String]) -> QuestionOutcome {
        let selected = normalize_selection(selected);
        let expected = normalize_selection(&question.correct_answers);
        let hits = selected.iter().filter(|k| expected.contains(k)).count();
        let credit = if expected.is_empty() {
            0.0
        } else {
            hits as f64 / expected.len() as f64
        };

        QuestionOutcome {
            question_index: index,
            question: question.question.clone(),
            options: question.options.clone(),
            is_correct: !selected.is_empty() && selected == expected,
            selected,
            correct_answers: expected,
            credit,
            explanation: question.explanation.clone(),
        }
    }
}

fn raw_percentage(correct: i32, total: i32) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    correct as f64 / total as f64 * 100.0
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
