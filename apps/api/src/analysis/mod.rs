// Resume / job-description analysis.
// Stage prompts, the matcher response sanitizer, and the two-level pipeline that runs them.
// All LLM calls go through llm_client::GenerativeText.

pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod sanitizer;
