//! Analysis pipeline: runs the four generation stages as a two-level fan-out/fan-in.
//!
//! Level 1: resume parsing ‖ JD analysis (independent)
//! Level 2: matching ‖ cover letter (each needs both Level-1 outputs)
//!
//! Any stage failure aborts the run; there is no partial `PipelineResult`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::analysis::models::{AnalysisResult, MatchResult, PipelineResult, Stage};
use crate::analysis::prompts::{
    COVER_LETTER_PROMPT_TEMPLATE, JD_ANALYSIS_PROMPT_TEMPLATE, MATCH_PROMPT_TEMPLATE,
    RESUME_PARSE_PROMPT_TEMPLATE,
};
use crate::analysis::sanitizer::sanitize_and_parse;
use crate::errors::AppError;
use crate::llm_client::prompts::{fill_template, JSON_ONLY_INSTRUCTION};
use crate::llm_client::GenerativeText;

/// Orchestrates the analysis stages against a shared generation client.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    llm: Arc<dyn GenerativeText>,
    deadline: Option<Duration>,
}

impl PipelineOrchestrator {
    pub fn new(llm: Arc<dyn GenerativeText>, deadline: Option<Duration>) -> Self {
        Self { llm, deadline }
    }

    /// Runs the full pipeline, bounded by the configured deadline if any.
    pub async fn run(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<PipelineResult, AppError> {
        let stages = self.run_stages(resume_text, job_description);
        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, stages).await.map_err(|_| {
                AppError::Timeout(format!(
                    "analysis did not finish within {}s",
                    deadline.as_secs()
                ))
            })?,
            None => stages.await,
        }
    }

    async fn run_stages(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<PipelineResult, AppError> {
        // Level 1
        let (parsed_resume, jd_analysis) = tokio::try_join!(
            self.parse_resume(resume_text),
            self.analyze_job_description(job_description),
        )?;
        debug!(
            "Level 1 complete: {}={} chars, {}={} chars",
            parsed_resume.stage,
            parsed_resume.text.len(),
            jd_analysis.stage,
            jd_analysis.text.len()
        );

        // Level 2
        let (match_result, cover_letter) = tokio::try_join!(
            self.match_profiles(&parsed_resume, &jd_analysis),
            self.generate_cover_letter(&parsed_resume, &jd_analysis),
        )?;
        info!(
            "Analysis complete: match_score={}, missing_skills={}",
            match_result.match_score,
            match_result.missing_skills.len()
        );

        Ok(PipelineResult {
            parsed_resume,
            jd_analysis,
            match_result,
            cover_letter,
        })
    }

    pub async fn parse_resume(&self, resume_text: &str) -> Result<AnalysisResult, AppError> {
        let prompt = fill_template(RESUME_PARSE_PROMPT_TEMPLATE, &[("resume_text", resume_text)]);
        self.run_text_stage(Stage::ParsedResume, &prompt).await
    }

    pub async fn analyze_job_description(
        &self,
        job_description: &str,
    ) -> Result<AnalysisResult, AppError> {
        let prompt = fill_template(JD_ANALYSIS_PROMPT_TEMPLATE, &[("jd_text", job_description)]);
        self.run_text_stage(Stage::JdAnalysis, &prompt).await
    }

    pub async fn match_profiles(
        &self,
        parsed_resume: &AnalysisResult,
        jd_analysis: &AnalysisResult,
    ) -> Result<MatchResult, AppError> {
        let prompt = fill_template(
            MATCH_PROMPT_TEMPLATE,
            &[
                ("parsed_resume", &parsed_resume.text),
                ("jd_analysis", &jd_analysis.text),
                ("json_only", JSON_ONLY_INSTRUCTION),
            ],
        );
        let raw = self.generate(Stage::Match, &prompt).await?;
        Ok(sanitize_and_parse(&raw))
    }

    pub async fn generate_cover_letter(
        &self,
        parsed_resume: &AnalysisResult,
        jd_analysis: &AnalysisResult,
    ) -> Result<AnalysisResult, AppError> {
        let prompt = fill_template(
            COVER_LETTER_PROMPT_TEMPLATE,
            &[
                ("parsed_resume", &parsed_resume.text),
                ("jd_analysis", &jd_analysis.text),
            ],
        );
        self.run_text_stage(Stage::CoverLetter, &prompt).await
    }

    async fn run_text_stage(&self, stage: Stage, prompt: &str) -> Result<AnalysisResult, AppError> {
        let text = self.generate(stage, prompt).await?;
        Ok(AnalysisResult::new(stage, text))
    }

    async fn generate(&self, stage: Stage, prompt: &str) -> Result<String, AppError> {
        debug!("Running stage {stage}");
        self.llm
            .generate(prompt)
            .await
            .map_err(|e| AppError::Llm(format!("{} failed: {e}", stage.description())))
    }
}
