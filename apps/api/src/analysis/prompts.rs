// LLM prompt templates for the four analysis stages.
// Placeholders are filled with `llm_client::prompts::fill_template`.

/// Resume parsing. Replace `{resume_text}`.
pub const RESUME_PARSE_PROMPT_TEMPLATE: &str = "Extract skills, experience, education:

{resume_text}";

/// Job description analysis. Replace `{jd_text}`.
pub const JD_ANALYSIS_PROMPT_TEMPLATE: &str = "Extract job role and required skills:

{jd_text}";

/// Resume/JD matching. Replace `{parsed_resume}`, `{jd_analysis}`, `{json_only}`.
pub const MATCH_PROMPT_TEMPLATE: &str = r#"You are a resume-job matcher.

Compare the following Resume and Job Description.

Resume Text:
{parsed_resume}

Job Description Text:
{jd_analysis}

{json_only}
Required format:
{
    "match_score": <integer from 0 to 100>,
    "missing_skills": ["Skill1", "Skill2"]
}"#;

/// Cover letter generation. Replace `{parsed_resume}`, `{jd_analysis}`.
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = "Write a 250-word professional cover letter.

Resume: {parsed_resume}

Job Description: {jd_analysis}";
