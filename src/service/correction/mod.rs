//! One-shot claim repair through the generation back-end.
//!
//! Exactly one correction attempt per run: no retry loop, and the corrected
//! claim is not re-validated against the rule base; it is trusted as final.

use crate::model::{Claim, GeneratedAnswer};
use crate::service::backend::{BackendError, GenerationBackend};

pub mod prompts;

/// Ask the back-end to repair a claim that violated rule constraints.
///
/// Parse failure of the reply is not an error: the raw text is preserved as
/// [`GeneratedAnswer::Unparsed`] so downstream stages never crash on
/// malformed output.
pub async fn correct_claim(
    backend: &dyn GenerationBackend,
    claim: &Claim,
    violations: &[String],
    rule_descriptions: &[String],
) -> Result<GeneratedAnswer, BackendError> {
    let prompt = prompts::build_repair_prompt(claim, violations, rule_descriptions);

    tracing::debug!(
        violation_count = violations.len(),
        prompt_length = prompt.len(),
        "Requesting claim repair"
    );
    let text = backend.generate(&prompt).await?;

    let answer = GeneratedAnswer::parse(&text);
    if !answer.is_parsed() {
        tracing::warn!("Repair reply was not structured JSON, keeping raw text");
    }
    Ok(answer)
}
