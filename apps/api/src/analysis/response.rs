//! Response Extractor — finds the JSON payload inside the model's free-form reply.
//!
//! 1. A fenced block (```` ``` ```` or ```` ```json ````, any case) wins: its inner text is
//!    the candidate.
//! 2. Otherwise the whole reply with every `\n`/`\r` removed is the candidate.
//! 3. The candidate is parsed once. No repair, no relaxed second pass.
//!
//! The parsed value is then checked against the `AnalysisResult` shape.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use thiserror::Error;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```(?:json)?\s*(.*?)\s*```").expect("fence pattern is valid")
});

/// The reply could not be read as JSON. Carries the untouched reply for display.
#[derive(Debug, Error)]
#[error("model reply is not valid JSON: {source}")]
pub struct ResponseParseError {
    pub raw: String,
    #[source]
    pub source: serde_json::Error,
}

/// The reply was valid JSON but not a usable analysis.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct InvalidResultError {
    pub reason: String,
    pub raw: String,
}

/// Structured skill-match analysis returned to the UI.
///
/// `match_percentage` keeps the model's numeric representation (`70` stays `70`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(alias = "matchPercentage")]
    pub match_percentage: Number,
    #[serde(default, deserialize_with = "null_as_default")]
    pub matched_skills: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub missing_skills: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub suggestions: Vec<String>,
}

/// An explicit `null` is treated the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Picks the JSON candidate out of a raw reply.
pub fn json_candidate(raw: &str) -> String {
    match FENCED_BLOCK.captures(raw).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().to_string(),
        None => raw.chars().filter(|c| *c != '\n' && *c != '\r').collect(),
    }
}

/// Parses the JSON payload embedded in `raw`.
pub fn extract_json(raw: &str) -> Result<Value, ResponseParseError> {
    let candidate = json_candidate(raw);
    serde_json::from_str(&candidate).map_err(|source| ResponseParseError {
        raw: raw.to_string(),
        source,
    })
}

/// Checks a parsed reply against the `AnalysisResult` shape.
pub fn validate_result(value: Value, raw: &str) -> Result<AnalysisResult, InvalidResultError> {
    let invalid = |reason: String| InvalidResultError {
        reason,
        raw: raw.to_string(),
    };

    if !value.is_object() {
        return Err(invalid("expected a JSON object".to_string()));
    }

    let result: AnalysisResult =
        serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;

    let pct = result
        .match_percentage
        .as_f64()
        .ok_or_else(|| invalid("match_percentage is not a finite number".to_string()))?;
    if !(0.0..=100.0).contains(&pct) {
        return Err(invalid(format!(
            "match_percentage {pct} is outside 0-100"
        )));
    }

    Ok(result)
}
