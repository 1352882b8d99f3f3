use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A multiple-choice question. Options are keyed by letter and any number of
/// them may be correct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: BTreeMap<String, String>,
    pub correct_answers: Vec<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

impl Question {
    pub fn has_option(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn multiple_correct(&self) -> bool {
        self.correct_answers.len() > 1
    }

    /// Question as shown to a student mid-test.
    pub fn to_view(&self, index: usize) -> QuestionView {
        QuestionView {
            index,
            question: self.question.clone(),
            options: self.options.clone(),
            multiple_correct: self.multiple_correct(),
            difficulty: self.difficulty.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
    pub index: usize,
    pub question: String,
    pub options: BTreeMap<String, String>,
    pub multiple_correct: bool,
    pub difficulty: Option<String>,
}

/// Normalizes a selection to a sorted, de-duplicated list of keys.
pub fn normalize_selection(selected: &[String]) -> Vec<String> {
    let mut keys: Vec<String> = selected
        .iter()
        .map(|k| k.trim().to_uppercase())
        .filter(|k| !k.is_empty())
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

#[cfg(test)]
pub(crate) fn sample_question(correct: &[&str]) -> Question {
    let options = ["A", "B", "C", "D"]
        .iter()
        .map(|k| (k.to_string(), format!("Option {}", k)))
        .collect();
    Question {
        question: "Which ones?".into(),
        options,
        correct_answers: correct.iter().map(|s| s.to_string()).collect(),
        explanation: Some("Because.".into()),
        difficulty: Some("medium".into()),
    }
}
