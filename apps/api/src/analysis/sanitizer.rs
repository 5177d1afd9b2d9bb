//! Response Sanitizer: turns the matcher's free-text reply into a `MatchResult`.
//!
//! Models frequently wrap JSON in markdown fences even when told not to, and occasionally
//! answer in prose. Parsing never fails from the caller's point of view: anything that does
//! not fit the expected shape becomes `MatchResult::fallback()` and is logged at `warn`.

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::analysis::models::MatchResult;
use crate::extraction::text_preview;

/// Characters that may open a fenced block when repeated three or more times.
const FENCE_MARKERS: [char; 2] = ['`', '~'];
const FENCE_LEN: usize = 3;
const RAW_PREVIEW_CHARS: usize = 500;

/// Why a matcher response did not fit the expected shape.
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("response is empty")]
    Empty,

    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response JSON is not an object")]
    NotAnObject,

    #[error("match_score is not an integer: {0}")]
    NonIntegerScore(serde_json::Number),
}

#[derive(Debug, Deserialize)]
struct RawMatch {
    match_score: serde_json::Number,
    missing_skills: Vec<String>,
}

/// Parses a raw matcher response, substituting the fallback on any shape failure.
pub fn sanitize_and_parse(raw: &str) -> MatchResult {
    match parse_match(raw) {
        Ok(result) => result,
        Err(e) => {
            warn!(
                error = %e,
                raw = %text_preview(raw.trim(), RAW_PREVIEW_CHARS),
                "Matcher response could not be parsed; substituting fallback"
            );
            MatchResult::fallback()
        }
    }
}

/// Strict parse of a (possibly fenced) matcher response.
pub fn parse_match(raw: &str) -> Result<MatchResult, ShapeError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(ShapeError::Empty);
    }

    let value: serde_json::Value = serde_json::from_str(body)?;
    if !value.is_object() {
        return Err(ShapeError::NotAnObject);
    }
    let parsed: RawMatch = serde_json::from_value(value)?;

    Ok(MatchResult {
        match_score: clamp_score(&parsed.match_score)?,
        missing_skills: parsed.missing_skills,
    })
}

/// Strips a surrounding ```lang ... ``` (or ~~~) fence and its language tag.
/// Text without an opening fence is returned trimmed and otherwise untouched.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();

    let Some(marker) = text.chars().next().filter(|c| FENCE_MARKERS.contains(c)) else {
        return text;
    };
    if !text.chars().take(FENCE_LEN).all(|c| c == marker) {
        return text;
    }

    let inner = text
        .trim_start_matches(marker)
        .trim_end()
        .trim_end_matches(marker);

    strip_language_tag(inner).trim()
}

/// Drops a leading info-string word such as `json` when it is followed by whitespace
/// or glued directly to a JSON body (```` ```json{...}``` ````).
fn strip_language_tag(s: &str) -> &str {
    let tag_len = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.')))
        .unwrap_or(s.len());
    let rest = &s[tag_len..];

    let body_follows =
        rest.is_empty() || rest.starts_with(|c: char| c.is_whitespace() || c == '{' || c == '[');
    if tag_len > 0 && body_follows {
        rest
    } else {
        s
    }
}

/// Clamps any JSON integer into 0..=100. Integers beyond the `i64` range are
/// still integers and clamp like the rest; only fractional numbers are rejected.
fn clamp_score(score: &serde_json::Number) -> Result<u32, ShapeError> {
    let max = MatchResult::MAX_SCORE;
    let clamped = if let Some(n) = score.as_u64() {
        n.min(u64::from(max)) as u32
    } else if score.as_i64().is_some() {
        // as_u64 already covers every non-negative integer
        0
    } else {
        return Err(ShapeError::NonIntegerScore(score.clone()));
    };
    if score.as_u64() != Some(u64::from(clamped)) {
        warn!(score = %score, clamped, "Match score outside 0..=100; clamping");
    }
    Ok(clamped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docker_82() -> MatchResult {
        MatchResult {
            match_score: 82,
            missing_skills: vec!["Docker".to_string()],
        }
    }

    #[test]
    fn test_plain_json_parses_unmodified() {
        let raw = r#"{"match_score": 64, "missing_skills": ["Kubernetes", "Go", "gRPC"]}"#;
        let result = sanitize_and_parse(raw);
        assert_eq!(result.match_score, 64);
        assert_eq!(result.missing_skills, vec!["Kubernetes", "Go", "gRPC"]);
    }

    #[test]
    fn test_json_fence_with_language_tag() {
        let raw = "```json\n{\"match_score\": 82, \"missing_skills\": [\"Docker\"]}\n```";
        assert_eq!(sanitize_and_parse(raw), docker_82());
    }

    #[test]
    fn test_fence_variants_match_unwrapped_result() {
        let body = r#"{"match_score": 82, "missing_skills": ["Docker"]}"#;
        let wrapped = [
            format!("```json\n{body}\n```"),
            format!("```\n{body}\n```"),
            format!("```JSON\n{body}```"),
            format!("  ```json {body} ```  "),
            format!("~~~json\n{body}\n~~~"),
            format!("````\n{body}\n````"),
            format!("```json\n{body}"),
            format!("```json{body}```"),
            format!("```JSON{body}\n```"),
        ];
        let expected = sanitize_and_parse(body);
        for raw in &wrapped {
            assert_eq!(sanitize_and_parse(raw), expected, "input: {raw:?}");
        }
    }

    #[test]
    fn test_prose_response_falls_back() {
        assert_eq!(
            sanitize_and_parse("I cannot determine this."),
            MatchResult::fallback()
        );
    }

    #[test]
    fn test_malformed_inputs_fall_back() {
        let inputs = [
            "",
            "   ",
            "```json\n```",
            r#"{"match_score": 82, "missing_skills": ["Docker""#,
            r#"{"match_score": "82", "missing_skills": []}"#,
            r#"{"match_score": 82.5, "missing_skills": []}"#,
            r#"{"match_score": 82, "missing_skills": "Docker"}"#,
            r#"{"match_score": 82, "missing_skills": [1, 2]}"#,
            r#"{"match_score": 82}"#,
            r#"{"missing_skills": []}"#,
            r#"[82, ["Docker"]]"#,
            "null",
        ];
        for raw in inputs {
            assert_eq!(sanitize_and_parse(raw), MatchResult::fallback(), "input: {raw:?}");
        }
    }

    #[test]
    fn test_out_of_range_scores_are_clamped() {
        let high = sanitize_and_parse(r#"{"match_score": 140, "missing_skills": []}"#);
        assert_eq!(high.match_score, 100);

        let low = sanitize_and_parse(r#"{"match_score": -5, "missing_skills": ["Rust"]}"#);
        assert_eq!(low.match_score, 0);
        assert_eq!(low.missing_skills, vec!["Rust"]);
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let raw = r#"{"match_score": 82, "missing_skills": ["Docker"], "notes": "solid backend"}"#;
        assert_eq!(sanitize_and_parse(raw), docker_82());
    }

    #[test]
    fn test_score_always_within_bounds() {
        for score in [i64::MIN, -1, 0, 50, 100, 101, i64::MAX] {
            let raw = format!(r#"{{"match_score": {score}, "missing_skills": []}}"#);
            assert!(sanitize_and_parse(&raw).match_score <= MatchResult::MAX_SCORE);
        }
    }

    #[test]
    fn test_scores_beyond_i64_clamp_to_max() {
        let past_i64 = u64::try_from(i64::MAX).unwrap() + 1;
        for score in [past_i64, u64::MAX] {
            let raw = format!(r#"{{"match_score": {score}, "missing_skills": ["Docker"]}}"#);
            let result = sanitize_and_parse(&raw);
            assert_eq!(result.match_score, MatchResult::MAX_SCORE, "score: {score}");
            assert_eq!(result.missing_skills, vec!["Docker"]);
        }
    }

    #[test]
    fn test_parse_match_reports_shape_errors() {
        assert!(matches!(parse_match("```\n```"), Err(ShapeError::Empty)));
        assert!(matches!(parse_match("nope"), Err(ShapeError::Json(_))));
        assert!(matches!(parse_match("[82, []]"), Err(ShapeError::NotAnObject)));
        assert!(matches!(
            parse_match(r#"{"match_score": 82.5, "missing_skills": []}"#),
            Err(ShapeError::NonIntegerScore(_))
        ));
    }

    #[test]
    fn test_strip_code_fence_leaves_unfenced_text() {
        assert_eq!(strip_code_fence("  {\"a\": 1}\n"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("``not a fence``"), "``not a fence``");
    }

    #[test]
    fn test_strip_language_tag_needs_separator_or_json_body() {
        assert_eq!(strip_language_tag("json\n{}"), "\n{}");
        assert_eq!(strip_language_tag("json{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_language_tag("json[1]"), "[1]");
        assert_eq!(strip_language_tag("{}"), "{}");
        assert_eq!(strip_language_tag("json"), "");
        assert_eq!(strip_language_tag("null:x"), "null:x");
    }
}
