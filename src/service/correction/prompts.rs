//! Prompts for claim repair

use crate::model::Claim;

/// Build the repair prompt from the rejected claim, the rendered violations,
/// and the rule base's own descriptions (so prompt and rule file cannot
/// drift apart).
pub fn build_repair_prompt(
    claim: &Claim,
    violations: &[String],
    rule_descriptions: &[String],
) -> String {
    let claim_json =
        serde_json::to_string_pretty(claim).unwrap_or_else(|_| "{}".to_string());

    let violation_list = violations
        .iter()
        .map(|violation| format!("- {violation}"))
        .collect::<Vec<_>>()
        .join("\n");

    let rule_list = rule_descriptions
        .iter()
        .map(|description| format!("- {description}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"The following proposed medical answer JSON violates logical constraints
from a knowledge base. This is a toy example, not real medical advice.

Original JSON:
{claim_json}

Logical violations (knowledge-base terms):
{violation_list}

Natural language rules:
{rule_list}

Please revise the JSON so that it no longer violates these rules while staying
as close as possible to the original intent. Respond ONLY with JSON in the
same format: diagnosis, explanation, recommended_treatments, evidence_symptoms."#
    )
}
