use std::fmt;

use serde::Serialize;

/// The four generation stages of the analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ParsedResume,
    JdAnalysis,
    Match,
    CoverLetter,
}

impl Stage {
    /// Wire label, also used as the key of the stage's text in API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ParsedResume => "parsed_resume",
            Stage::JdAnalysis => "jd_analysis",
            Stage::Match => "match",
            Stage::CoverLetter => "cover_letter",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Stage::ParsedResume => "Resume parsing",
            Stage::JdAnalysis => "JD analysis",
            Stage::Match => "Resume/JD matching",
            Stage::CoverLetter => "Cover letter generation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-text output of a generation stage. An empty `text` is a valid result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub stage: Stage,
    pub text: String,
}

impl AnalysisResult {
    pub fn new(stage: Stage, text: impl Into<String>) -> Self {
        Self {
            stage,
            text: text.into(),
        }
    }
}

/// Structured outcome of the matching stage.
///
/// `match_score` is always within 0..=100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub match_score: u32,
    pub missing_skills: Vec<String>,
}

impl MatchResult {
    pub const MAX_SCORE: u32 = 100;

    /// Substituted whenever a matching response cannot be parsed.
    pub fn fallback() -> Self {
        Self {
            match_score: 0,
            missing_skills: Vec::new(),
        }
    }
}

/// Final aggregate of one pipeline run. Every field is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    pub parsed_resume: AnalysisResult,
    pub jd_analysis: AnalysisResult,
    pub match_result: MatchResult,
    pub cover_letter: AnalysisResult,
}
