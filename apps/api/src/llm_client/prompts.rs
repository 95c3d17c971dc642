// Shared prompt constants and prompt-building utilities.
// Each pipeline stage defines its own prompts in pipeline/prompts.rs.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction appended to every prompt that reads resume content.
pub const NO_FABRICATION_INSTRUCTION: &str = "\
    CRITICAL: Use ONLY facts present in the resume text. Do NOT infer, interpolate, or invent \
    contact details, employers, dates, degrees, or skills. If a field is not in the source, \
    return null (or an empty list) for it. Downstream scoring treats your output as ground truth.";

/// Instruction for self-reported confidence values.
pub const CONFIDENCE_INSTRUCTION: &str = "\
    Report a confidence value between 0.0 and 1.0 reflecting how well the source material \
    supports your output. Lower it when the input is short, garbled, or ambiguous.";

/// Builds a stage system prompt: role framing followed by the JSON-only rule.
pub fn system_prompt(role: &str) -> String {
    format!("{role} {JSON_ONLY_SYSTEM}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_appends_json_rule() {
        let system = system_prompt("You are a recruiter.");
        assert!(system.starts_with("You are a recruiter."));
        assert!(system.ends_with(JSON_ONLY_SYSTEM));
    }
}
