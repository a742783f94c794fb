//! Skill-match analysis — orchestrates one request end to end.
//!
//! Flow: validate → extract resume text → compose prompt → call LLM →
//!       extract JSON → validate result shape.
//!
//! Every failure short-circuits with an `AppError`; nothing is retried and nothing is
//! stored, so there is no partial state to unwind.

use bytes::Bytes;
use tracing::{debug, info};

use crate::analysis::prompts::compose_prompt;
use crate::analysis::response::{extract_json, validate_result, AnalysisResult};
use crate::errors::AppError;
use crate::extract::extract_text;
use crate::llm_client::LlmBackend;

/// Where the resume comes from.
#[derive(Debug, Clone)]
pub enum ResumeSource {
    File { bytes: Bytes, filename: String },
    Text(String),
}

/// Inbound fields as decoded from the HTTP body. `analyze` enforces that a resume
/// source is present and the job description is non-blank.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub resume: Option<ResumeSource>,
    pub job_description: Option<String>,
}

/// Runs the analysis pipeline. At most one LLM call is made, and none if validation
/// or extraction fails.
pub async fn analyze(
    llm: &dyn LlmBackend,
    request: AnalysisRequest,
) -> Result<AnalysisResult, AppError> {
    // Step 1: Validate
    let job_description = request
        .job_description
        .filter(|jd| !jd.trim().is_empty())
        .ok_or_else(|| AppError::Validation("No job description provided".to_string()))?;

    // Step 2: Extract
    let resume_text = match request.resume {
        Some(ResumeSource::File { bytes, filename }) => {
            info!("Extracting resume text from '{filename}' ({} bytes)", bytes.len());
            extract_text(bytes, &filename).await?
        }
        Some(ResumeSource::Text(text)) => text,
        None => return Err(AppError::Validation("No resume provided".to_string())),
    };

    if resume_text.trim().is_empty() {
        return Err(AppError::Validation("Resume content is empty".to_string()));
    }

    // Step 3: Compose
    let prompt = compose_prompt(&resume_text, &job_description);
    debug!(
        "Composed prompt: {} chars (resume {}, job description {})",
        prompt.len(),
        resume_text.len(),
        job_description.len()
    );

    // Step 4: Call
    info!("Requesting analysis from model {}", llm.model());
    let raw = llm.generate(&prompt).await?;

    // Step 5: Parse
    let value = extract_json(&raw)?;

    // Step 6: Validate result shape
    let result = validate_result(value, &raw)?;
    info!("Analysis complete: match_percentage={}", result.match_percentage);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::fixtures::minimal_docx;
    use crate::llm_client::testing::StubLlm;

    const E2E_REPLY: &str = r#"{"match_percentage":70,"matched_skills":["Java"],"missing_skills":["Kubernetes experience"],"summary":"Good partial match","suggestions":["Highlight Kubernetes projects"]}"#;

    fn text_request(resume: &str, jd: &str) -> AnalysisRequest {
        AnalysisRequest {
            resume: Some(ResumeSource::Text(resume.to_string())),
            job_description: Some(jd.to_string()),
        }
    }

    #[tokio::test]
    async fn test_end_to_end_returns_model_object() {
        let llm = StubLlm::replying(E2E_REPLY);
        let request = text_request(
            "Experienced in Java and Kubernetes",
            "Looking for a Java developer",
        );

        let result = analyze(&llm, request).await.unwrap();

        let expected: serde_json::Value = serde_json::from_str(E2E_REPLY).unwrap();
        assert_eq!(serde_json::to_value(&result).unwrap(), expected);
        assert_eq!(llm.calls(), 1);

        let prompt = llm.last_prompt().unwrap();
        assert!(prompt.contains("Experienced in Java and Kubernetes"));
        assert!(prompt.contains("Looking for a Java developer"));
    }

    #[tokio::test]
    async fn test_missing_job_description_makes_no_llm_call() {
        let llm = StubLlm::replying(E2E_REPLY);
        let request = AnalysisRequest {
            resume: Some(ResumeSource::Text("Rust".to_string())),
            job_description: None,
        };

        let err = analyze(&llm, request).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(ref m) if m == "No job description provided"));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_job_description_is_rejected() {
        let llm = StubLlm::replying(E2E_REPLY);
        let err = analyze(&llm, text_request("Rust", "  \n\t ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_resume_is_rejected() {
        let llm = StubLlm::replying(E2E_REPLY);
        let request = AnalysisRequest {
            resume: None,
            job_description: Some("Java developer".to_string()),
        };
        let err = analyze(&llm, request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "No resume provided"));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_extracted_text_is_rejected() {
        let llm = StubLlm::replying(E2E_REPLY);
        let request = AnalysisRequest {
            resume: Some(ResumeSource::File {
                bytes: Bytes::from_static(b"   \n  "),
                filename: "resume.txt".to_string(),
            }),
            job_description: Some("Java developer".to_string()),
        };
        let err = analyze(&llm, request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Resume content is empty"));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_extraction_failure_makes_no_llm_call() {
        let llm = StubLlm::replying(E2E_REPLY);
        let request = AnalysisRequest {
            resume: Some(ResumeSource::File {
                bytes: Bytes::from_static(b"garbage"),
                filename: "resume.docx".to_string(),
            }),
            job_description: Some("Java developer".to_string()),
        };
        let err = analyze(&llm, request).await.unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_uploaded_docx_text_reaches_prompt() {
        let llm = StubLlm::replying(E2E_REPLY);
        let request = AnalysisRequest {
            resume: Some(ResumeSource::File {
                bytes: Bytes::from(minimal_docx(&["Staff Engineer", "Kafka, Flink"])),
                filename: "cv.docx".to_string(),
            }),
            job_description: Some("Streaming engineer".to_string()),
        };
        analyze(&llm, request).await.unwrap();
        assert!(llm.last_prompt().unwrap().contains("Kafka, Flink"));
    }

    #[tokio::test]
    async fn test_upstream_503_is_not_parsed() {
        let llm = StubLlm::failing(503, "Service Unavailable");
        let err = analyze(&llm, text_request("Rust", "Rust role")).await.unwrap_err();
        match err {
            AppError::Upstream { status, message } => {
                assert_eq!(status, Some(503));
                assert!(message.contains("Service Unavailable"));
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_reply_surfaces_raw_text() {
        let llm = StubLlm::replying("not json at all");
        let err = analyze(&llm, text_request("Rust", "Rust role")).await.unwrap_err();
        assert!(matches!(err, AppError::ResponseParse { ref raw } if raw == "not json at all"));
    }

    #[tokio::test]
    async fn test_fenced_reply_is_accepted() {
        let llm = StubLlm::replying(&format!("```json\n{E2E_REPLY}\n```"));
        let result = analyze(&llm, text_request("Java", "Java")).await.unwrap();
        assert_eq!(result.matched_skills, vec!["Java"]);
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_invalid_result() {
        let llm = StubLlm::replying(r#"{"match_percentage": 250}"#);
        let err = analyze(&llm, text_request("Rust", "Rust role")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidResult { .. }));
    }
}
