use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

fn default_question_count() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StartTestRequest {
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[validate(length(min = 1, max = 100))]
    pub topic: String,
    #[serde(default = "default_question_count", alias = "count")]
    pub question_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveAnswerRequest {
    pub test_id: Uuid,
    pub question_index: usize,
    #[serde(alias = "answers", default)]
    pub user_answers: Vec<String>,
}

/// One option key or several.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    One(String),
    Many(Vec<String>),
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Many(Vec::new())
    }
}

impl Selection {
    pub fn into_keys(self) -> Vec<String> {
        match self {
            Selection::One(key) => vec![key],
            Selection::Many(keys) => keys,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnswerRequest {
    pub test_id: Uuid,
    pub question_index: usize,
    #[serde(alias = "user_answer", alias = "answers", default)]
    pub user_answers: Selection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestIdRequest {
    pub test_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveAnswerResponse {
    pub saved: bool,
    pub question_index: i32,
    pub selected: Vec<String>,
}
