//! Axum route handlers for the Analysis API.

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::analysis::response::AnalysisResult;
use crate::analysis::service::{analyze, AnalysisRequest, ResumeSource};
use crate::errors::AppError;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Text-only encodings (JSON or urlencoded form) of the analyze request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeFields {
    pub resume_text: Option<String>,
    pub job_description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub ok: bool,
    pub result: AnalysisResult,
}

/// Decodes the analyze body from multipart, JSON, or urlencoded form, by `Content-Type`.
///
/// Multipart parts: `resume` (file), `resumeText`, `jobDescription`. An empty file
/// part or empty text field counts as absent. A file takes precedence over `resumeText`.
pub struct AnalyzeForm(pub AnalysisRequest);

#[async_trait]
impl<S> FromRequest<S> for AnalyzeForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| body_error(e.status(), e.body_text()))?;
            return read_multipart(multipart).await.map(AnalyzeForm);
        }

        let fields = if content_type.starts_with("application/json") {
            let Json(fields) = Json::<AnalyzeFields>::from_request(req, state)
                .await
                .map_err(|e| body_error(e.status(), e.body_text()))?;
            fields
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<AnalyzeFields>::from_request(req, state)
                .await
                .map_err(|e| body_error(e.status(), e.body_text()))?;
            fields
        } else {
            return Err(AppError::UnsupportedMediaType(if content_type.is_empty() {
                "missing Content-Type".to_string()
            } else {
                content_type
            }));
        };

        Ok(AnalyzeForm(AnalysisRequest {
            resume: non_empty(fields.resume_text).map(ResumeSource::Text),
            job_description: non_empty(fields.job_description),
        }))
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<AnalysisRequest, AppError> {
    let mut file = None;
    let mut resume_text = None;
    let mut job_description = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| body_error(e.status(), e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("resume") => {
                let filename = field.file_name().unwrap_or("resume").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| body_error(e.status(), e.body_text()))?;
                if !bytes.is_empty() {
                    file = Some(ResumeSource::File { bytes, filename });
                }
            }
            Some("resumeText") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| body_error(e.status(), e.body_text()))?;
                resume_text = non_empty(Some(text));
            }
            Some("jobDescription") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| body_error(e.status(), e.body_text()))?;
                job_description = non_empty(Some(text));
            }
            _ => {}
        }
    }

    Ok(AnalysisRequest {
        resume: file.or(resume_text.map(ResumeSource::Text)),
        job_description,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Maps an axum body rejection onto the application error taxonomy.
/// Oversized bodies are 413; any other unreadable body is a 400 client error.
fn body_error(status: StatusCode, detail: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::Validation(format!("File upload error: {detail}"))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/analyze
///
/// Compares a resume (file or pasted text) against a job description via the LLM.
pub async fn handle_analyze(
    State(state): State<AppState>,
    AnalyzeForm(request): AnalyzeForm,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let request_id = Uuid::new_v4();
    let result = analyze(state.llm.as_ref(), request)
        .instrument(info_span!("analyze", %request_id))
        .await?;

    Ok(Json(AnalyzeResponse { ok: true, result }))
}
