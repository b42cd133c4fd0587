//! Final response assembly.

use crate::model::{GeneratedAnswer, RunState};

/// Render the final human-readable answer: the corrected claim when present,
/// else the original, followed by the full reasoning trace verbatim. Pure
/// function of the run state.
pub fn assemble(state: &RunState) -> String {
    let (answer, corrected) = match &state.corrected {
        Some(answer) => (answer, true),
        None => (&state.answer, false),
    };

    let mut lines: Vec<String> = vec!["=== Final Answer ===".to_string()];

    match answer {
        GeneratedAnswer::Parsed(claim) => {
            let diagnosis = claim.diagnosis.as_deref().unwrap_or("(none)");
            let treatments = if claim.recommended_treatments.is_empty() {
                "(none)".to_string()
            } else {
                claim.recommended_treatments.join(", ")
            };
            lines.push(format!("Diagnosis: {diagnosis}"));
            lines.push(format!("Recommended treatments: {treatments}"));
            lines.push(String::new());
            lines.push("Explanation:".to_string());
            lines.push(claim.explanation.clone().unwrap_or_default());
        }
        GeneratedAnswer::Unparsed(raw) => {
            lines.push("The generated answer could not be parsed as structured data.".to_string());
            lines.push(String::new());
            lines.push("Raw answer:".to_string());
            lines.push(raw.clone());
        }
    }

    lines.push(String::new());
    lines.push(format!("Corrected by KB/LLM: {corrected}"));
    lines.push(String::new());
    lines.push("=== Reasoning Trace ===".to_string());
    lines.extend(state.trace.entries().iter().cloned());

    lines.join("\n")
}
