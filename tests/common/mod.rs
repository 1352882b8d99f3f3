#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

use study_buddy_backend::{
    config::Config,
    database::memory::MemoryStore,
    error::{Error, Result},
    models::{feedback::Feedback, flashcard::Flashcard, question::Question},
    routes,
    services::{
        ai_service::{ExerciseGenerator, FlashcardRequest, GenerationRequest},
        feedback_service::{FeedbackRequest, FeedbackSynthesizer},
    },
    AppState,
};

/// Question `i` has correct keys ["B", "C"] when `i % 3 == 1`, otherwise ["A"].
pub struct StubGenerator;

#[async_trait]
impl ExerciseGenerator for StubGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>> {
        Ok((0..request.count)
            .map(|i| {
                let options: BTreeMap<String, String> = ["A", "B", "C", "D"]
                    .iter()
                    .map(|k| (k.to_string(), format!("{} option {}", request.topic, k)))
                    .collect();
                let correct = if i % 3 == 1 { vec!["B", "C"] } else { vec!["A"] };
                Question {
                    question: format!("{} question {}", request.topic, i + 1),
                    options,
                    correct_answers: correct.into_iter().map(String::from).collect(),
                    explanation: Some("Worked solution".into()),
                    difficulty: Some("medium".into()),
                }
            })
            .collect())
    }

    async fn generate_flashcards(&self, request: &FlashcardRequest) -> Result<Vec<Flashcard>> {
        Ok((0..request.count)
            .map(|i| Flashcard {
                front: format!("Term {}", i + 1),
                back: format!("Definition {}", i + 1),
            })
            .collect())
    }
}

pub struct StubFeedback {
    pub available: bool,
}

#[async_trait]
impl FeedbackSynthesizer for StubFeedback {
    async fn synthesize(&self, request: &FeedbackRequest) -> Result<Feedback> {
        if !self.available {
            return Err(Error::Generation("feedback service timed out".into()));
        }
        Ok(Feedback {
            overall_assessment: format!("You scored {}%", request.score),
            key_strengths: vec!["Consistency".into()],
            main_weaknesses: vec![],
            learning_recommendations: vec![],
            conceptual_understanding: "Solid".into(),
            next_steps: vec!["Practice more".into()],
            encouragement: "Well done".into(),
        })
    }
}

pub fn test_config() -> Config {
    Config {
        server_address: "127.0.0.1:0".into(),
        database_url: None,
        jwt_secret: "test_secret_key".into(),
        token_ttl_minutes: 60,
        llm_api_key: "sk-test".into(),
        llm_base_url: "http://localhost:9".into(),
        llm_model: "test-model".into(),
        llm_timeout_secs: 1,
        feedback_timeout_secs: 1,
        max_test_questions: 20,
        seconds_per_question: 60,
        generation_rps: 100,
        json_logs: false,
    }
}

pub fn setup_app(feedback_available: bool) -> Router {
    setup_app_with(test_config(), feedback_available)
}

pub fn setup_app_with(config: Config, feedback_available: bool) -> Router {
    let state = AppState::with_collaborators(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(StubGenerator),
        Arc::new(StubFeedback {
            available: feedback_available,
        }),
    );
    routes::app_router(state)
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn register_and_login(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "secret123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, body) = send(
        app,
        "POST",
        "/api/login",
        None,
        Some(json!({"username": username, "password": "secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["token_type"], "bearer");
    body["data"]["access_token"].as_str().unwrap().to_string()
}

