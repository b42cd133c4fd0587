//! Initial answer generation for a case description.

use crate::model::{GeneratedAnswer, RunState};
use crate::service::backend::{BackendError, GenerationBackend};

/// Ask the back-end for a structured answer to the case description and parse
/// it, keeping the raw text either way.
pub async fn generate_answer(
    backend: &dyn GenerationBackend,
    state: &mut RunState,
) -> Result<(), BackendError> {
    let prompt = build_answer_prompt(&state.question);

    tracing::debug!(
        run = %state.run_id,
        prompt_length = prompt.len(),
        "Requesting initial answer"
    );
    let text = backend.generate(&prompt).await?;
    let trimmed = text.trim().to_string();

    state.answer = GeneratedAnswer::parse(&trimmed);
    state.raw_answer = Some(trimmed);
    if state.answer.is_parsed() {
        state.trace.push("Back-end produced initial structured answer.");
    } else {
        state
            .trace
            .push("Back-end answer was not structured JSON; kept raw text.");
    }
    Ok(())
}

/// Build the answer prompt for a case description
fn build_answer_prompt(question: &str) -> String {
    format!(
        r#"You are a medical assistant working in a toy domain with a small set
of diseases and symptoms. This is ONLY for demonstration; do not give
real-world medical advice.

Given the following case description, respond ONLY with a JSON object
with keys:
- diagnosis (string)
- explanation (string)
- recommended_treatments (array of strings)
- evidence_symptoms (array of strings)

Case:
{question}

Example format:
{{
  "diagnosis": "influenza",
  "explanation": "Because the patient has fever and cough...",
  "recommended_treatments": ["paracetamol"],
  "evidence_symptoms": ["fever", "cough"]
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DEFAULT_CASE_ID;
    use crate::service::backend::ScriptedBackend;

    #[tokio::test]
    async fn parses_structured_reply_and_traces() {
        let backend = ScriptedBackend::new([
            r#"{"diagnosis": "influenza", "evidence_symptoms": ["fever"], "recommended_treatments": []}"#,
        ]);
        let mut state = RunState::new("Patient has fever.", DEFAULT_CASE_ID);

        generate_answer(&backend, &mut state).await.unwrap();

        let claim = state.answer.claim().expect("parsed");
        assert_eq!(claim.diagnosis.as_deref(), Some("influenza"));
        assert!(state.raw_answer.is_some());
        assert_eq!(state.trace.len(), 1);
    }

    #[tokio::test]
    async fn keeps_raw_text_on_parse_failure() {
        let backend = ScriptedBackend::new(["Sounds like a cold to me."]);
        let mut state = RunState::new("Patient sneezes.", DEFAULT_CASE_ID);

        generate_answer(&backend, &mut state).await.unwrap();

        assert!(!state.answer.is_parsed());
        assert_eq!(
            state.raw_answer.as_deref(),
            Some("Sounds like a cold to me.")
        );
    }

    #[test]
    fn prompt_embeds_the_case() {
        let prompt = build_answer_prompt("Cough for three days.");
        assert!(prompt.contains("Cough for three days."));
        assert!(prompt.contains("evidence_symptoms"));
    }
}
