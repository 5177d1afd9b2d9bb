//! Axum route handlers for the Analysis API.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::analysis::models::{MatchResult, PipelineResult};
use crate::errors::AppError;
use crate::extraction::RawDocument;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub cover_letter: String,
    pub jd: JdAnalysisBody,
    #[serde(rename = "match")]
    pub match_result: MatchResult,
    pub resume: ParsedResumeBody,
}

#[derive(Debug, Serialize)]
pub struct JdAnalysisBody {
    pub jd_analysis: String,
}

#[derive(Debug, Serialize)]
pub struct ParsedResumeBody {
    pub parsed_resume: String,
}

impl From<PipelineResult> for AnalyzeResponse {
    fn from(result: PipelineResult) -> Self {
        Self {
            cover_letter: result.cover_letter.text,
            jd: JdAnalysisBody {
                jd_analysis: result.jd_analysis.text,
            },
            match_result: result.match_result,
            resume: ParsedResumeBody {
                parsed_resume: result.parsed_resume.text,
            },
        }
    }
}

struct AnalyzeUpload {
    resume: RawDocument,
    job_description: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /analyze
///
/// Multipart form: `resume` (file) and `job_description` (text).
/// Extracts the resume text, then runs the analysis pipeline over it.
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let span = info_span!("analyze", request_id = %Uuid::new_v4());

    async move {
        let upload = read_upload(multipart).await?;
        info!(
            "Received resume ({} bytes, content type {:?}, pdf signature: {}), job description ({} chars)",
            upload.resume.bytes().len(),
            upload.resume.content_type(),
            upload.resume.has_pdf_signature(),
            upload.job_description.chars().count()
        );

        let extracted = state.extractor.extract(&upload.resume).await?;
        let result = state
            .pipeline
            .run(&extracted.text, &upload.job_description)
            .await?;

        Ok(Json(AnalyzeResponse::from(result)))
    }
    .instrument(span)
    .await
}

async fn read_upload(mut multipart: Multipart) -> Result<AnalyzeUpload, AppError> {
    let mut resume = None;
    let mut job_description = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        // Some clients send the file part as "resume " with a trailing space.
        match name.trim() {
            "resume" => {
                let content_type = field.content_type().map(String::from);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read resume: {e}")))?;
                resume = Some(RawDocument::new(bytes, content_type)?);
            }
            "job_description" => {
                let text = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Could not read job_description: {e}"))
                })?;
                job_description = Some(text);
            }
            other => debug!("Ignoring multipart field '{other}'"),
        }
    }

    let resume =
        resume.ok_or_else(|| AppError::Validation("A resume file is required".to_string()))?;

    Ok(AnalyzeUpload {
        resume,
        job_description: job_description.unwrap_or_default(),
    })
}
