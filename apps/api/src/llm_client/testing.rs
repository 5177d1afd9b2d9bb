//! Test doubles for `GenerativeText`.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Barrier;

use super::{GenerativeText, LlmError};
use crate::analysis::models::Stage;
use crate::analysis::prompts::{
    COVER_LETTER_PROMPT_TEMPLATE, JD_ANALYSIS_PROMPT_TEMPLATE, MATCH_PROMPT_TEMPLATE,
    RESUME_PARSE_PROMPT_TEMPLATE,
};

type Script = Box<dyn Fn(&str) -> Result<String, LlmError> + Send + Sync>;

/// Identifies which stage template produced a prompt.
pub fn stage_of(prompt: &str) -> Option<Stage> {
    [
        (RESUME_PARSE_PROMPT_TEMPLATE, Stage::ParsedResume),
        (JD_ANALYSIS_PROMPT_TEMPLATE, Stage::JdAnalysis),
        (MATCH_PROMPT_TEMPLATE, Stage::Match),
        (COVER_LETTER_PROMPT_TEMPLATE, Stage::CoverLetter),
    ]
    .into_iter()
    .find(|(template, _)| {
        let head = template.lines().next().unwrap_or(*template);
        prompt.starts_with(head)
    })
    .map(|(_, stage)| stage)
}

/// Answers prompts from a script and records every prompt it receives.
pub struct ScriptedLlm {
    script: Script,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
    barrier: Option<Barrier>,
}

impl ScriptedLlm {
    pub fn new(
        script: impl Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            prompts: Mutex::new(Vec::new()),
            delay: None,
            barrier: None,
        }
    }

    /// Fixed reply per stage.
    pub fn by_stage(
        parsed_resume: &str,
        jd_analysis: &str,
        match_raw: &str,
        cover_letter: &str,
    ) -> Self {
        let (r, j, m, c) = (
            parsed_resume.to_string(),
            jd_analysis.to_string(),
            match_raw.to_string(),
            cover_letter.to_string(),
        );
        Self::new(move |prompt| match stage_of(prompt) {
            Some(Stage::ParsedResume) => Ok(r.clone()),
            Some(Stage::JdAnalysis) => Ok(j.clone()),
            Some(Stage::Match) => Ok(m.clone()),
            Some(Stage::CoverLetter) => Ok(c.clone()),
            None => Err(LlmError::Api {
                status: 400,
                message: format!("unscripted prompt: {prompt}"),
            }),
        })
    }

    /// Sleeps before answering each prompt.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes every call wait until a second call is in flight.
    pub fn with_pairwise_barrier(mut self) -> Self {
        self.barrier = Some(Barrier::new(2));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeText for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.script)(prompt)
    }
}
