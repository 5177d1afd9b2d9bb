use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::LlmConfig;

const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:5173,https://ai-powered-job-application-assistant.netlify.app";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub llm_timeout_secs: u64,
    pub llm_max_retries: u32,
    /// Whole-request deadline for the analysis pipeline. `None` disables it.
    pub pipeline_deadline: Option<Duration>,
    pub ocr_dpi: u32,
    pub ocr_lang: String,
    pub max_upload_bytes: usize,
    pub cors_allowed_origins: Vec<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let deadline_secs: u64 = parse_env("PIPELINE_DEADLINE_SECS", 300)?;
        let max_upload_mb: usize = parse_env("MAX_UPLOAD_MB", 10)?;

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_model: env_or("GEMINI_MODEL", "gemini-2.5-flash"),
            gemini_api_base: env_or(
                "GEMINI_API_BASE",
                "https://generativelanguage.googleapis.com",
            ),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 120)?,
            llm_max_retries: parse_env("LLM_MAX_RETRIES", 3)?,
            pipeline_deadline: (deadline_secs > 0).then(|| Duration::from_secs(deadline_secs)),
            ocr_dpi: parse_env("OCR_DPI", 300)?,
            ocr_lang: env_or("OCR_LANG", "eng"),
            max_upload_bytes: upload_limit_bytes(max_upload_mb)?,
            cors_allowed_origins: split_origins(&env_or(
                "CORS_ALLOWED_ORIGINS",
                DEFAULT_CORS_ORIGINS,
            )),
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    /// Credentials and model selection for the generation client.
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            api_key: self.gemini_api_key.clone(),
            model: self.gemini_model.clone(),
            api_base: self.gemini_api_base.clone(),
            timeout: Duration::from_secs(self.llm_timeout_secs),
            max_retries: self.llm_max_retries,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

fn upload_limit_bytes(megabytes: usize) -> Result<usize> {
    megabytes
        .checked_mul(1024 * 1024)
        .with_context(|| format!("MAX_UPLOAD_MB is too large: {megabytes}"))
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}
