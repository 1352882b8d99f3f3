use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::question::Question;
use crate::models::school_context::SchoolContextInput;

fn default_state() -> String {
    "Bayern".to_string()
}

fn default_curriculum_focus() -> String {
    "allgemein".to_string()
}

fn default_exercise_count() -> u32 {
    3
}

fn default_flashcard_count() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SchoolContextRequest {
    #[validate(length(min = 1, max = 100))]
    pub grade: String,
    #[validate(length(min = 1, max = 100))]
    pub school_type: String,
    #[serde(default = "default_state")]
    #[validate(length(min = 1, max = 100))]
    pub state: String,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default = "default_curriculum_focus")]
    #[validate(length(min = 1, max = 100))]
    pub curriculum_focus: String,
}

impl From<SchoolContextRequest> for SchoolContextInput {
    fn from(req: SchoolContextRequest) -> Self {
        Self {
            grade: req.grade,
            school_type: req.school_type,
            state: req.state,
            subjects: req.subjects,
            curriculum_focus: req.curriculum_focus,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProfileUpdateRequest {
    #[validate(length(min = 1, max = 100))]
    pub grade: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub school_type: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExerciseRequest {
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[validate(length(min = 1, max = 100))]
    pub topic: String,
    #[serde(default = "default_exercise_count")]
    #[validate(range(min = 1, max = 10))]
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExerciseSet {
    pub subject: String,
    pub topic: String,
    pub exercises: Vec<Question>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FlashcardRequest {
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[validate(length(min = 1, max = 100))]
    pub topic: String,
    #[serde(default = "default_flashcard_count")]
    #[validate(range(min = 1, max = 30))]
    pub count: u32,
}
