//! Stage functions and the evaluation state machine.
//!
//! `START → build facts → CHECK → (no violations) → RESPOND → END`
//! `START → build facts → CHECK → (violations) → CORRECT → RESPOND → END`
//!
//! Each stage takes and returns [`RunState`]; the branch after the check is a
//! closed [`Route`] produced by the router predicate and consumed by
//! [`Evaluator::run`] / [`Evaluator::evaluate`]. External sequencers may call
//! the stages directly in the same order.

use std::sync::Arc;

use crate::kb::{EngineError, KnowledgeBase};
use crate::model::{Claim, Config, DEFAULT_CASE_ID, RunState};
use crate::service::backend::{BackendError, GenerationBackend};
use crate::service::{answer, consistency, correction, respond};

/// Branch taken after the consistency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    NeedsCorrection,
    NoCorrection,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EvalError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Owns one engine instance plus the generation back-end for one run at a
/// time. Give each concurrent run its own evaluator; the engine holds a
/// single case's facts and is not designed for interleaved cases.
pub struct Evaluator {
    kb: KnowledgeBase,
    backend: Arc<dyn GenerationBackend>,
    config: Config,
    case_id: String,
}

impl Evaluator {
    pub fn new(kb: KnowledgeBase, backend: Arc<dyn GenerationBackend>, config: Config) -> Self {
        Self {
            kb,
            backend,
            config,
            case_id: DEFAULT_CASE_ID.to_string(),
        }
    }

    /// Build the engine from configuration: a configured rule file when
    /// readable, else the bundled rules. A rule file that exists but fails to
    /// parse is a construction error, not a silent fallback.
    pub fn from_config(
        config: Config,
        backend: Arc<dyn GenerationBackend>,
    ) -> Result<Self, EngineError> {
        let kb = match config.rules_path.as_deref() {
            Some(path) => match std::fs::read_to_string(path) {
                Ok(text) => {
                    tracing::info!(path = %path, "Loaded rule base from file");
                    KnowledgeBase::new(&text)?
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Failed to read rule base, using bundled rules");
                    KnowledgeBase::with_default_rules()
                }
            },
            None => KnowledgeBase::with_default_rules(),
        };
        Ok(Self::new(kb, backend, config))
    }

    pub fn with_case_id(mut self, case_id: impl Into<String>) -> Self {
        self.case_id = case_id.into();
        self
    }

    pub fn case_id(&self) -> &str {
        &self.case_id
    }

    // --- stage functions ----------------------------------------------------

    /// Stage 1: generate the initial structured answer for the question.
    pub async fn answer(&self, mut state: RunState) -> Result<RunState, EvalError> {
        answer::generate_answer(self.backend.as_ref(), &mut state).await?;
        Ok(state)
    }

    /// Stage 2: reset the case and assert the claim's facts.
    pub fn build_facts(&mut self, mut state: RunState) -> Result<RunState, EvalError> {
        // An unparsed answer compiles like an empty claim: just the patient
        // fact, so the check runs and the trace explains itself.
        let claim = state.answer.claim().cloned().unwrap_or_default();
        let case_id = state.case_id.clone();
        state.facts =
            consistency::assert_claim_facts(&mut self.kb, &claim, &case_id, &mut state.trace)?;
        tracing::info!(
            run = %state.run_id,
            case = %case_id,
            facts = state.facts.len(),
            "Case facts asserted"
        );
        Ok(state)
    }

    /// Stage 3: query violations (and, when enabled, candidate diagnoses).
    pub fn check_consistency(&mut self, mut state: RunState) -> Result<RunState, EvalError> {
        state.violations = consistency::find_violations(&self.kb, &mut state.trace)?;
        tracing::info!(
            run = %state.run_id,
            case = %state.case_id,
            violations = state.violations.len(),
            "Consistency check complete"
        );

        if self.config.suggest_candidates {
            let candidates = self.kb.query_candidate_diagnoses(&state.case_id)?;
            if !candidates.is_empty() {
                state
                    .trace
                    .push(format!("Candidate diagnoses from KB: [{}]", candidates.join(", ")));
            }
        }
        Ok(state)
    }

    /// Router predicate deciding the branch after the check.
    pub fn route(&self, state: &RunState) -> Route {
        if state.violations.is_empty() {
            Route::NoCorrection
        } else {
            Route::NeedsCorrection
        }
    }

    /// Stage 4: one-shot claim repair through the back-end.
    pub async fn correct(&self, mut state: RunState) -> Result<RunState, EvalError> {
        let claim: Claim = state.answer.claim().cloned().unwrap_or_default();
        let corrected = correction::correct_claim(
            self.backend.as_ref(),
            &claim,
            &state.violations,
            self.kb.rule_descriptions(),
        )
        .await?;

        state.corrected = Some(corrected);
        state
            .trace
            .push("Applied back-end correction using rule constraints.");
        tracing::info!(run = %state.run_id, case = %state.case_id, "Correction applied");
        Ok(state)
    }

    /// Stage 5: assemble the final text.
    pub fn respond(&self, mut state: RunState) -> RunState {
        state.final_text = Some(respond::assemble(&state));
        state
    }

    // --- dispatcher ---------------------------------------------------------

    /// Run the full state machine for a case description, starting with
    /// answer generation.
    pub async fn run(&mut self, question: &str) -> Result<RunState, EvalError> {
        let state = RunState::new(question, self.case_id.clone());
        tracing::info!(run = %state.run_id, case = %state.case_id, "Evaluation started");
        let state = self.answer(state).await?;
        self.evaluate(state).await
    }

    /// Run the state machine from a claim produced upstream.
    pub async fn evaluate(&mut self, state: RunState) -> Result<RunState, EvalError> {
        let state = self.build_facts(state)?;
        let state = self.check_consistency(state)?;
        let state = match self.route(&state) {
            Route::NeedsCorrection => self.correct(state).await?,
            Route::NoCorrection => state,
        };
        let state = self.respond(state);
        tracing::info!(
            run = %state.run_id,
            case = %state.case_id,
            corrected = state.corrected.is_some(),
            "Evaluation finished"
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GeneratedAnswer;
    use crate::service::backend::ScriptedBackend;

    fn evaluator(replies: Vec<&str>) -> Evaluator {
        Evaluator::new(
            KnowledgeBase::with_default_rules(),
            Arc::new(ScriptedBackend::new(replies)),
            Config::default(),
        )
    }

    const INFLUENZA_REPLY: &str = r#"{
        "diagnosis": "influenza",
        "explanation": "Fever and cough point to influenza.",
        "recommended_treatments": ["paracetamol"],
        "evidence_symptoms": ["fever", "cough"]
    }"#;

    const ASTHMA_REPLY: &str = r#"{
        "diagnosis": "asthma",
        "explanation": "Wheezing suggests asthma.",
        "recommended_treatments": ["ibuprofen"],
        "evidence_symptoms": ["wheezing", "shortness of breath"]
    }"#;

    const ASTHMA_REPAIRED: &str = r#"{
        "diagnosis": "asthma",
        "explanation": "Wheezing suggests asthma; NSAIDs avoided.",
        "recommended_treatments": ["salbutamol"],
        "evidence_symptoms": ["wheezing", "shortness of breath"]
    }"#;

    #[tokio::test]
    async fn consistent_case_skips_correction() {
        let mut evaluator = evaluator(vec![INFLUENZA_REPLY]);
        let state = evaluator.run("Patient has fever and cough.").await.unwrap();

        assert!(state.violations.is_empty());
        assert!(state.corrected.is_none());

        let text = state.final_text.expect("final text");
        assert!(text.contains("Diagnosis: influenza"));
        assert!(text.contains("Corrected by KB/LLM: false"));

        let no_violation_lines = state
            .trace
            .entries()
            .iter()
            .filter(|line| line.contains("No violations"))
            .count();
        assert_eq!(no_violation_lines, 1);
    }

    #[tokio::test]
    async fn violations_route_through_exactly_one_correction() {
        // Two scripted replies: the initial answer and one repair. A second
        // repair attempt would exhaust the script and fail the run.
        let mut evaluator = evaluator(vec![ASTHMA_REPLY, ASTHMA_REPAIRED]);
        let state = evaluator.run("Patient wheezes after exercise.").await.unwrap();

        assert!(!state.violations.is_empty());
        assert!(
            state
                .violations
                .iter()
                .any(|v| v.contains("asthma") && v.contains("nsaid")),
            "{:?}",
            state.violations
        );

        let corrected = state.corrected.as_ref().expect("corrected claim");
        assert_eq!(
            corrected.claim().unwrap().recommended_treatments,
            vec!["salbutamol"]
        );

        let text = state.final_text.expect("final text");
        assert!(text.contains("Corrected by KB/LLM: true"));
        assert!(text.contains("salbutamol"));
    }

    #[tokio::test]
    async fn unparseable_repair_degrades_gracefully() {
        let mut evaluator = evaluator(vec![ASTHMA_REPLY, "I cannot produce JSON today."]);
        let state = evaluator.run("Patient wheezes.").await.unwrap();

        assert!(matches!(
            state.corrected,
            Some(GeneratedAnswer::Unparsed(_))
        ));
        let text = state.final_text.expect("final text");
        assert!(text.contains("could not be parsed"));
        assert!(text.contains("Corrected by KB/LLM: true"));
    }

    #[tokio::test]
    async fn evaluate_accepts_upstream_claims() {
        let mut evaluator = evaluator(vec![]);
        let state = RunState::with_answer(
            "upstream case",
            DEFAULT_CASE_ID,
            GeneratedAnswer::parse(INFLUENZA_REPLY),
        );

        let state = evaluator.evaluate(state).await.unwrap();
        assert!(state.violations.is_empty());
        assert!(state.final_text.is_some());
    }

    #[tokio::test]
    async fn backend_failure_aborts_the_run() {
        // Violations present but no scripted repair reply left.
        let mut evaluator = evaluator(vec![]);
        let state = RunState::with_answer(
            "upstream case",
            DEFAULT_CASE_ID,
            GeneratedAnswer::parse(ASTHMA_REPLY),
        );

        let err = evaluator.evaluate(state).await.unwrap_err();
        assert!(matches!(err, EvalError::Backend(_)));
    }

    #[tokio::test]
    async fn candidate_suggestions_can_be_disabled() {
        let config = Config {
            suggest_candidates: false,
            ..Config::default()
        };
        let mut evaluator = Evaluator::new(
            KnowledgeBase::with_default_rules(),
            Arc::new(ScriptedBackend::new([INFLUENZA_REPLY])),
            config,
        );

        let state = evaluator.run("Patient has fever and cough.").await.unwrap();
        assert!(
            !state
                .trace
                .entries()
                .iter()
                .any(|line| line.contains("Candidate diagnoses"))
        );
    }

    #[test]
    fn router_is_a_pure_predicate() {
        let evaluator = evaluator(vec![]);
        let mut state = RunState::new("case", DEFAULT_CASE_ID);
        assert_eq!(evaluator.route(&state), Route::NoCorrection);
        state.violations.push("missing_symptom(x, y)".to_string());
        assert_eq!(evaluator.route(&state), Route::NeedsCorrection);
    }

    #[tokio::test]
    async fn unparsed_initial_answer_flows_to_a_final_text() {
        let mut evaluator = evaluator(vec!["Probably just a cold, honestly."]);
        let state = evaluator.run("Patient sneezes.").await.unwrap();

        assert!(state.violations.is_empty());
        let text = state.final_text.expect("final text");
        assert!(text.contains("could not be parsed"));
        assert!(text.contains("Corrected by KB/LLM: false"));
    }
}
