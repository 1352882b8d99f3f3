use serde::{Deserialize, Serialize};

/// Coaching feedback for a finished test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub overall_assessment: String,
    #[serde(default)]
    pub key_strengths: Vec<String>,
    #[serde(default)]
    pub main_weaknesses: Vec<String>,
    #[serde(default)]
    pub learning_recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub conceptual_understanding: String,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default)]
    pub encouragement: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub area: String,
    pub action: String,
    #[serde(default)]
    pub reason: String,
}

fn default_priority() -> String {
    "medium".to_string()
}
