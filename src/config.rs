use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    /// When unset the service runs on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub feedback_timeout_secs: u64,
    pub max_test_questions: u32,
    pub seconds_per_question: u32,
    /// Requests per second allowed on the endpoints that call the LLM.
    pub generation_rps: u32,
    pub json_logs: bool,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api";
pub const DEFAULT_LLM_MODEL: &str = "tngtech/deepseek-r1t2-chimera:free";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:8000"),
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            jwt_secret: get_env("JWT_SECRET")?,
            token_ttl_minutes: get_env_parse_or("TOKEN_TTL_MINUTES", 60 * 24 * 7)?,
            llm_api_key: get_env("LLM_API_KEY")?,
            llm_base_url: get_env_or("LLM_BASE_URL", DEFAULT_LLM_BASE_URL),
            llm_model: get_env_or("LLM_MODEL", DEFAULT_LLM_MODEL),
            llm_timeout_secs: get_env_parse_or("LLM_TIMEOUT_SECS", 30)?,
            feedback_timeout_secs: get_env_parse_or("FEEDBACK_TIMEOUT_SECS", 20)?,
            max_test_questions: get_env_parse_or("MAX_TEST_QUESTIONS", 20)?,
            seconds_per_question: get_env_parse_or("SECONDS_PER_QUESTION", 60)?,
            generation_rps: get_env_parse_or("GENERATION_RPS", 5)?,
            json_logs: get_env_or("LOG_FORMAT", "text").eq_ignore_ascii_case("json"),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
