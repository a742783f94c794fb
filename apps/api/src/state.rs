use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LlmBackend;

/// Shared application state injected into all route handlers via Axum extractors.
/// Immutable after startup; nothing here is mutated per request.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable LLM backend. Default: `GeminiClient`; tests inject a stub.
    pub llm: Arc<dyn LlmBackend>,
    pub config: Config,
}
