pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::database::repository::StudyRepository;
use crate::error::Result;
use crate::services::{
    ai_service::{AIService, ExerciseGenerator},
    feedback_service::FeedbackSynthesizer,
    study_service::StudyService,
    test_service::TestLifecycleService,
    user_service::UserService,
};
use reqwest::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub test_service: TestLifecycleService,
    pub study_service: StudyService,
    pub user_service: UserService,
}

impl AppState {
    /// Wires the services against the configured LLM endpoint.
    pub fn new(config: Config, store: Arc<dyn StudyRepository>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(
                config.llm_timeout_secs.max(config.feedback_timeout_secs) + 5,
            ))
            .build()?;
        let ai_service = Arc::new(AIService::from_config(&config, http_client));
        Ok(Self::with_collaborators(
            config,
            store,
            ai_service.clone(),
            ai_service,
        ))
    }

    pub fn with_collaborators(
        config: Config,
        store: Arc<dyn StudyRepository>,
        generator: Arc<dyn ExerciseGenerator>,
        feedback: Arc<dyn FeedbackSynthesizer>,
    ) -> Self {
        let test_service = TestLifecycleService::new(
            store.clone(),
            generator.clone(),
            feedback,
            config.max_test_questions,
            config.seconds_per_question,
        );
        let study_service = StudyService::new(store.clone(), generator);
        let user_service = UserService::new(
            store,
            config.jwt_secret.clone(),
            config.token_ttl_minutes,
        );

        Self {
            config: Arc::new(config),
            test_service,
            study_service,
            user_service,
        }
    }
}
