use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolContext {
    pub user_id: Uuid,
    pub grade: String,
    pub school_type: String,
    pub state: String,
    pub subjects: Vec<String>,
    pub curriculum_focus: String,
    pub updated_at: DateTime<Utc>,
}

impl SchoolContext {
    /// Short description handed to the generator so exercises match the
    /// student's level.
    pub fn describe(&self) -> String {
        let mut text = format!(
            "Student in grade {} at a {} school ({}), curriculum focus: {}.",
            self.grade, self.school_type, self.state, self.curriculum_focus
        );
        if !self.subjects.is_empty() {
            text.push_str(&format!(" Subjects: {}.", self.subjects.join(", ")));
        }
        text
    }
}

#[derive(Debug, Clone)]
pub struct SchoolContextInput {
    pub grade: String,
    pub school_type: String,
    pub state: String,
    pub subjects: Vec<String>,
    pub curriculum_focus: String,
}
