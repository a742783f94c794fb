use std::str::FromStr;

use anyhow::{bail, Context, Result};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or unparsable.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub port: u16,
    /// Upper bound on inbound request bodies, uploads included.
    pub max_upload_bytes: usize,
    /// Maximum number of simultaneous upstream generateContent calls.
    pub llm_max_concurrency: usize,
    pub llm_timeout_secs: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_model: optional_env("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            gemini_base_url: optional_env("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            port: parse_env("PORT", 5000).context("PORT must be a valid port number")?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 5 * 1024 * 1024)
                .context("MAX_UPLOAD_BYTES must be a byte count")?,
            llm_max_concurrency: parse_env("LLM_MAX_CONCURRENCY", 8)
                .context("LLM_MAX_CONCURRENCY must be a positive integer")?,
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 120)
                .context("LLM_TIMEOUT_SECS must be a number of seconds")?,
            rust_log: optional_env("RUST_LOG", "info"),
        };

        if config.llm_max_concurrency == 0 {
            bail!("LLM_MAX_CONCURRENCY must be at least 1");
        }

        Ok(config)
    }
}

#[cfg(test)]
impl Config {
    /// Defaults with a dummy key, for tests that never leave the process.
    pub fn test_default() -> Self {
        Config {
            gemini_api_key: "test-key".to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            port: 5000,
            max_upload_bytes: 5 * 1024 * 1024,
            llm_max_concurrency: 2,
            llm_timeout_secs: 5,
            rust_log: "debug".to_string(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid value '{raw}' for {key}")),
        Err(_) => Ok(default),
    }
}
