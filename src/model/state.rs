//! Per-run evaluation state.

use uuid::Uuid;

use crate::kb::Fact;
use crate::model::claim::{Claim, GeneratedAnswer};

/// Case identifier used when the caller does not supply one.
pub const DEFAULT_CASE_ID: &str = "p1";

/// Ordered, append-only log of every step taken during one run. Discarded
/// with the run.
#[derive(Debug, Clone, Default)]
pub struct ReasoningTrace {
    entries: Vec<String>,
}

impl ReasoningTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything one evaluation run owns, threaded through every stage. Never
/// shared across concurrent runs.
#[derive(Debug, Clone)]
pub struct RunState {
    /// Correlates log lines across stages.
    pub run_id: Uuid,
    pub case_id: String,
    /// The case description the run is answering.
    pub question: String,
    /// Raw back-end reply text, kept for debugging even when parsed.
    pub raw_answer: Option<String>,
    /// Current claim. Starts empty until the answer stage (or the caller)
    /// supplies one.
    pub answer: GeneratedAnswer,
    pub facts: Vec<Fact>,
    pub violations: Vec<String>,
    /// Set by the correction stage; at most one per run.
    pub corrected: Option<GeneratedAnswer>,
    pub trace: ReasoningTrace,
    pub final_text: Option<String>,
}

impl RunState {
    pub fn new(question: impl Into<String>, case_id: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            case_id: case_id.into(),
            question: question.into(),
            raw_answer: None,
            answer: GeneratedAnswer::Parsed(Claim::default()),
            facts: Vec::new(),
            violations: Vec::new(),
            corrected: None,
            trace: ReasoningTrace::new(),
            final_text: None,
        }
    }

    /// Run state seeded with a claim produced upstream, skipping the answer
    /// stage.
    pub fn with_answer(
        question: impl Into<String>,
        case_id: impl Into<String>,
        answer: GeneratedAnswer,
    ) -> Self {
        let mut state = Self::new(question, case_id);
        state.answer = answer;
        state
    }

    /// Corrected claim when present, else the original.
    pub fn current_answer(&self) -> &GeneratedAnswer {
        self.corrected.as_ref().unwrap_or(&self.answer)
    }
}
