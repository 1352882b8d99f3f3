use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::feedback::Feedback;
use crate::models::flashcard::Flashcard;
use crate::models::question::{normalize_selection, Question};
use crate::models::school_context::SchoolContext;
use crate::services::feedback_service::{FeedbackRequest, FeedbackSynthesizer};

/// One retry after the first failure.
const MAX_ATTEMPTS: u32 = 2;
const OPTION_KEYS: [&str; 8] = ["A", "B", "C", "D", "E", "F", "G", "H"];

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub subject: String,
    pub topic: String,
    pub count: usize,
    pub school_context: Option<SchoolContext>,
}

#[derive(Debug, Clone)]
pub struct FlashcardRequest {
    pub subject: String,
    pub topic: String,
    pub count: usize,
    pub school_context: Option<SchoolContext>,
}

/// Source of question sets and flashcards.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExerciseGenerator: Send + Sync {
    /// Returns exactly `request.count` questions or fails with
    /// `Error::Generation`.
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>>;
    async fn generate_flashcards(&self, request: &FlashcardRequest) -> Result<Vec<Flashcard>>;
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct AIService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    generation_timeout: Duration,
    feedback_timeout: Duration,
    retry_pause: Duration,
}

impl AIService {
    pub fn new(client: Client, api_key: String, base_url: String, model: String) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            generation_timeout: Duration::from_secs(30),
            feedback_timeout: Duration::from_secs(20),
            retry_pause: Duration::from_millis(500),
        }
    }

    pub fn from_config(config: &Config, client: Client) -> Self {
        Self::new(
            client,
            config.llm_api_key.clone(),
            config.llm_base_url.clone(),
            config.llm_model.clone(),
        )
        .with_timeouts(
            Duration::from_secs(config.llm_timeout_secs),
            Duration::from_secs(config.feedback_timeout_secs),
        )
    }

    pub fn with_timeouts(mut self, generation: Duration, feedback: Duration) -> Self {
        self.generation_timeout = generation;
        self.feedback_timeout = feedback;
        self
    }

    pub fn with_retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause = pause;
        self
    }

    async fn chat_json(&self, payload: &JsonValue, timeout: Duration) -> Result<JsonValue> {
        let mut attempt = 1;
        loop {
            match self.chat_once(payload, timeout).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < MAX_ATTEMPTS => {
                    tracing::warn!(attempt, error = %e, "LLM call failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(self.retry_pause).await;
                }
                Err(e) => {
                    tracing::error!(attempt, error = %e, "LLM call failed");
                    return Err(e);
                }
            }
        }
    }

    async fn chat_once(&self, payload: &JsonValue, timeout: Duration) -> Result<JsonValue> {
        let res = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(payload)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Generation(format!("LLM request timed out after {:?}", timeout))
                } else {
                    Error::Generation(format!("LLM request failed: {}", e))
                }
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("LLM API error {}: {}", status, text)));
        }

        let body: JsonValue = res
            .json()
            .await
            .map_err(|e| Error::Generation(format!("LLM response is not JSON: {}", e)))?;

        let content = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| Error::Generation("LLM response has no message content".to_string()))?;

        parse_content(content)
    }

    fn payload(&self, system_prompt: &str, user_content: JsonValue, temperature: f64) -> JsonValue {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_content.to_string()}
            ],
            "response_format": { "type": "json_object" },
            "temperature": temperature
        })
    }
}

#[async_trait]
impl ExerciseGenerator for AIService {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>> {
        let system_prompt = r#"You are an experienced teacher writing multiple-choice practice questions.
Return a JSON object with an "exercises" array. Every item has:
"question" (string), "options" (object keyed "A", "B", "C", "D"),
"correct_answers" (array of option keys, one or more),
"explanation" (string) and "difficulty" ("easy", "medium" or "hard").
Generate exactly the requested number of questions. Vary which options are correct."#;

        let user_content = json!({
            "subject": request.subject,
            "topic": request.topic,
            "required_count": request.count,
            "student": request.school_context.as_ref().map(SchoolContext::describe),
        });

        tracing::info!(
            subject = %request.subject,
            topic = %request.topic,
            count = request.count,
            "requesting question set"
        );
        let raw = self
            .chat_json(&self.payload(system_prompt, user_content, 0.7), self.generation_timeout)
            .await?;

        let mut questions = sanitize_questions(&raw);
        if questions.len() < request.count {
            return Err(Error::Generation(format!(
                "Generator returned {} usable questions, {} requested",
                questions.len(),
                request.count
            )));
        }
        questions.truncate(request.count);
        Ok(questions)
    }

    async fn generate_flashcards(&self, request: &FlashcardRequest) -> Result<Vec<Flashcard>> {
        let system_prompt = r#"You are an experienced teacher writing study flashcards.
Return a JSON object with a "flashcards" array. Every item has "front"
(a term or question) and "back" (a short definition or answer).
Generate exactly the requested number of cards."#;

        let user_content = json!({
            "subject": request.subject,
            "topic": request.topic,
            "required_count": request.count,
            "student": request.school_context.as_ref().map(SchoolContext::describe),
        });

        let raw = self
            .chat_json(&self.payload(system_prompt, user_content, 0.5), self.generation_timeout)
            .await?;

        let mut cards = sanitize_flashcards(&raw);
        if cards.is_empty() {
            return Err(Error::Generation("Generator returned no usable flashcards".to_string()));
        }
        cards.truncate(request.count);
        Ok(cards)
    }
}

#[async_trait]
impl FeedbackSynthesizer for AIService {
    async fn synthesize(&self, request: &FeedbackRequest) -> Result<Feedback> {
        let system_prompt = r#"You are a supportive learning coach reviewing a student's finished test.
Return a JSON object with: "overall_assessment" (string), "key_strengths" (array of strings),
"main_weaknesses" (array of strings), "learning_recommendations" (array of objects with
"priority" ("high", "medium" or "low"), "area", "action", "reason"),
"conceptual_understanding" (string), "next_steps" (array of strings) and "encouragement" (string)."#;

        let questions: Vec<JsonValue> = request
            .outcomes
            .iter()
            .map(|o| {
                json!({
                    "question": o.question,
                    "selected": o.selected,
                    "correct_answers": o.correct_answers,
                    "is_correct": o.is_correct,
                })
            })
            .collect();

        let user_content = json!({
            "subject": request.subject,
            "topic": request.topic,
            "score_percent": request.score,
            "correct": request.correct_count,
            "total": request.total_questions,
            "performance_tier": request.tier.as_str(),
            "student": request.school_context.as_ref().map(SchoolContext::describe),
            "questions": questions,
        });

        let raw = self
            .chat_json(&self.payload(system_prompt, user_content, 0.4), self.feedback_timeout)
            .await?;
        let body = raw.get("feedback").cloned().unwrap_or(raw);
        serde_json::from_value::<Feedback>(body)
            .map_err(|e| Error::Generation(format!("Malformed feedback: {}", e)))
    }
}

/// Parses message content as JSON, tolerating code fences and text around
/// the object.
fn parse_content(content: &str) -> Result<JsonValue> {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Ok(value) = serde_json::from_str::<JsonValue>(trimmed) {
        return Ok(value);
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&trimmed[start..=end])
            .map_err(|e| Error::Generation(format!("Malformed JSON from LLM: {}", e))),
        _ => Err(Error::Generation("LLM content is not JSON".to_string())),
    }
}

fn items<'a>(raw: &'a JsonValue, keys: &[&str]) -> &'a [JsonValue] {
    keys.iter()
        .find_map(|k| raw.get(*k).and_then(|v| v.as_array()))
        .or_else(|| raw.as_array())
        .map(|v| v.as_slice())
        .unwrap_or(&[])
}

/// Keeps only well-formed questions: at least two options and a non-empty
/// set of correct keys that all name an option.
pub fn sanitize_questions(raw: &JsonValue) -> Vec<Question> {
    items(raw, &["exercises", "questions"])
        .iter()
        .filter_map(coerce_question)
        .collect()
}

fn coerce_question(v: &JsonValue) -> Option<Question> {
    let text = v.get("question").and_then(|q| q.as_str())?.trim().to_string();
    if text.is_empty() {
        return None;
    }

    let options: BTreeMap<String, String> = match v.get("options")? {
        JsonValue::Object(map) => map
            .iter()
            .filter_map(|(k, val)| {
                let label = val.as_str()?.trim();
                (!label.is_empty()).then(|| (k.trim().to_uppercase(), label.to_string()))
            })
            .collect(),
        JsonValue::Array(list) => OPTION_KEYS
            .iter()
            .zip(list.iter())
            .filter_map(|(k, val)| val.as_str().map(|s| (k.to_string(), s.trim().to_string())))
            .collect(),
        _ => return None,
    };
    if options.len() < 2 {
        return None;
    }

    let raw_correct: Vec<String> = match v.get("correct_answers").or_else(|| v.get("correct_answer")) {
        Some(JsonValue::Array(list)) => list
            .iter()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect(),
        Some(JsonValue::String(key)) => vec![key.clone()],
        _ => return None,
    };
    let correct_answers = normalize_selection(&raw_correct);
    if correct_answers.is_empty() || !correct_answers.iter().all(|k| options.contains_key(k)) {
        return None;
    }

    let text_field = |name: &str| {
        v.get(name)
            .and_then(|s| s.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    Some(Question {
        question: text,
        options,
        correct_answers,
        explanation: text_field("explanation"),
        difficulty: text_field("difficulty").map(|d| d.to_lowercase()),
    })
}

pub fn sanitize_flashcards(raw: &JsonValue) -> Vec<Flashcard> {
    items(raw, &["flashcards", "cards"])
        .iter()
        .filter_map(|v| {
            let front = v.get("front")?.as_str()?.trim();
            let back = v.get("back")?.as_str()?.trim();
            (!front.is_empty() && !back.is_empty()).then(|| Flashcard {
                front: front.to_string(),
                back: back.to_string(),
            })
        })
        .collect()
}
