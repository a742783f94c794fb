// Skill-match analysis: prompt composition, reply extraction, orchestration, HTTP handlers.
// All LLM calls go through llm_client — nothing here talks to Gemini directly.

pub mod handlers;
pub mod prompts;
pub mod response;
pub mod service;
