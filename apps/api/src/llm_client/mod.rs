/// LLM Client — the single point of entry for all Gemini API calls.
///
/// No other module may call the generative-language API directly; the orchestrator
/// only sees the `LlmBackend` trait, so it can be driven by a stub in tests.
///
/// One call per analysis, no retries. Simultaneous upstream calls are capped by a
/// semaphore sized from `LLM_MAX_CONCURRENCY`. Dropping the returned future (client
/// disconnect) cancels the in-flight HTTP request and releases the permit.
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport failure. Always built through `transport`, so the request URL
    /// (which carries the API key) is never part of the error text.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl LlmError {
    fn transport(err: reqwest::Error) -> Self {
        LlmError::Http(err.without_url())
    }
}

/// Anything that can turn a prompt into the model's raw text reply.
///
/// Carried in `AppState` as `Arc<dyn LlmBackend>`.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Model identifier, for logs.
    fn model(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    permits: Arc<Semaphore>,
}

impl GeminiClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            base_url: config.gemini_base_url.clone(),
            permits: Arc::new(Semaphore::new(config.llm_max_concurrency)),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl LlmBackend for GeminiClient {
    /// Sends the prompt as a single user message and returns the first candidate's text.
    /// Non-2xx responses become `LlmError::Api` carrying the status and body verbatim.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request_body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        // The semaphore is never closed, so acquire cannot fail.
        let _permit = self.permits.acquire().await.ok();
        debug!(
            "Calling Gemini model {} ({} permits left)",
            self.model,
            self.permits.available_permits()
        );

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", &self.api_key)])
            .json(&request_body)
            .send()
            .await
            .map_err(LlmError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(LlmError::transport)?;
        let body: Value = serde_json::from_slice(&bytes)?;

        if let Some(usage) = body.get("usageMetadata") {
            debug!(
                "Gemini call succeeded: prompt_tokens={}, candidate_tokens={}",
                usage["promptTokenCount"], usage["candidatesTokenCount"]
            );
        }

        Ok(reply_text(&body))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Pulls `candidates[0].content.parts[0].text` out of a generateContent body.
/// If the body does not have that shape (or the text is empty) the whole body,
/// re-serialized, stands in for the reply so the caller can still inspect it.
fn reply_text(body: &Value) -> String {
    body.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| body.to_string())
}
