// Shared prompt fragments and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// Instruction appended to prompts whose answer is parsed as JSON.
pub const JSON_ONLY_INSTRUCTION: &str = "Return ONLY a valid JSON object \
    (no ```json fences, no explanation).";

/// Fills `{name}` placeholders in a single pass.
///
/// Substituted values are never re-scanned, so user text containing `{...}` is left intact.
/// Unknown placeholders are kept verbatim.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substituted = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });
        match substituted {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
