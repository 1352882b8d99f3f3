use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

/// Saved collection of study cards. Never modified after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardSet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub topic: String,
    pub cards: Vec<Flashcard>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFlashcardSet {
    pub user_id: Uuid,
    pub subject: String,
    pub topic: String,
    pub cards: Vec<Flashcard>,
}
