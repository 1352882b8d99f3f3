use std::sync::Arc;
use uuid::Uuid;

use crate::database::repository::StudyRepository;
use crate::error::{Error, Result};
use crate::models::flashcard::{FlashcardSet, NewFlashcardSet};
use crate::models::profile::LearningProfile;
use crate::models::question::Question;
use crate::models::school_context::{SchoolContext, SchoolContextInput};
use crate::services::ai_service::{ExerciseGenerator, FlashcardRequest, GenerationRequest};
use crate::services::test_service::{MAX_HISTORY_LIMIT, MAX_TEXT_LEN};
use crate::utils::validation::{require_range, require_text};

pub const MAX_EXERCISES: u32 = 10;
pub const MAX_FLASHCARDS: u32 = 30;

/// Fields of the school context a student may change one at a time.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub grade: Option<String>,
    pub school_type: Option<String>,
    pub state: Option<String>,
}

/// School context, free practice and flashcards.
#[derive(Clone)]
pub struct StudyService {
    store: Arc<dyn StudyRepository>,
    generator: Arc<dyn ExerciseGenerator>,
}

impl StudyService {
    pub fn new(store: Arc<dyn StudyRepository>, generator: Arc<dyn ExerciseGenerator>) -> Self {
        Self { store, generator }
    }

    pub async fn set_school_context(
        &self,
        owner: Uuid,
        input: SchoolContextInput,
    ) -> Result<SchoolContext> {
        let input = SchoolContextInput {
            grade: require_text("grade", &input.grade, MAX_TEXT_LEN)?,
            school_type: require_text("school_type", &input.school_type, MAX_TEXT_LEN)?,
            state: require_text("state", &input.state, MAX_TEXT_LEN)?,
            subjects: input
                .subjects
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            curriculum_focus: require_text("curriculum_focus", &input.curriculum_focus, MAX_TEXT_LEN)?,
        };
        let context = self.store.upsert_school_context(owner, input).await?;
        tracing::info!(user_id = %owner, grade = %context.grade, "school context saved");
        Ok(context)
    }

    pub async fn get_school_context(&self, owner: Uuid) -> Result<Option<SchoolContext>> {
        self.store.get_school_context(owner).await
    }

    /// Applies the given fields to an existing school context.
    pub async fn update_profile(&self, owner: Uuid, update: ProfileUpdate) -> Result<SchoolContext> {
        let current = self
            .store
            .get_school_context(owner)
            .await?
            .ok_or_else(|| Error::NotFound("No school context has been set yet".to_string()))?;

        let pick = |field: &str, new: Option<String>, old: String| -> Result<String> {
            match new {
                Some(value) => require_text(field, &value, MAX_TEXT_LEN),
                None => Ok(old),
            }
        };

        let input = SchoolContextInput {
            grade: pick("grade", update.grade, current.grade)?,
            school_type: pick("school_type", update.school_type, current.school_type)?,
            state: pick("state", update.state, current.state)?,
            subjects: current.subjects,
            curriculum_focus: current.curriculum_focus,
        };
        self.store.upsert_school_context(owner, input).await
    }

    /// Practice questions with answers and explanations. Nothing is stored.
    pub async fn generate_exercises(
        &self,
        owner: Uuid,
        subject: &str,
        topic: &str,
        count: u32,
    ) -> Result<Vec<Question>> {
        let subject = require_text("subject", subject, MAX_TEXT_LEN)?;
        let topic = require_text("topic", topic, MAX_TEXT_LEN)?;
        let count = require_range("count", count, 1, MAX_EXERCISES)?;
        let school_context = self.store.get_school_context(owner).await?;

        self.generator
            .generate(&GenerationRequest {
                subject,
                topic,
                count: count as usize,
                school_context,
            })
            .await
    }

    pub async fn create_flashcards(
        &self,
        owner: Uuid,
        subject: &str,
        topic: &str,
        count: u32,
    ) -> Result<FlashcardSet> {
        let subject = require_text("subject", subject, MAX_TEXT_LEN)?;
        let topic = require_text("topic", topic, MAX_TEXT_LEN)?;
        let count = require_range("count", count, 1, MAX_FLASHCARDS)?;
        let school_context = self.store.get_school_context(owner).await?;

        let cards = self
            .generator
            .generate_flashcards(&FlashcardRequest {
                subject: subject.clone(),
                topic: topic.clone(),
                count: count as usize,
                school_context,
            })
            .await?;

        let set = self
            .store
            .create_flashcard_set(NewFlashcardSet {
                user_id: owner,
                subject,
                topic,
                cards,
            })
            .await?;
        tracing::info!(set_id = %set.id, cards = set.cards.len(), "flashcard set created");
        Ok(set)
    }

    pub async fn get_flashcards(&self, owner: Uuid, set_id: Uuid) -> Result<FlashcardSet> {
        self.store.get_flashcard_set(owner, set_id).await
    }

    pub async fn list_flashcards(&self, owner: Uuid) -> Result<Vec<FlashcardSet>> {
        self.store.list_flashcard_sets(owner).await
    }

    pub async fn learning_profile(&self, owner: Uuid) -> Result<LearningProfile> {
        let history = self.store.list_history(owner, MAX_HISTORY_LIMIT).await?;
        Ok(LearningProfile::from_history(&history))
    }
}
