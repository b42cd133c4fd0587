//! Consistency checking of a claim against the knowledge base.
//!
//! Inconsistency is an expected outcome, not an error; only engine-level
//! failures propagate.

use crate::kb::{EngineError, Fact, KnowledgeBase, compile_facts};
use crate::model::{Claim, ReasoningTrace};

/// Outcome of one consistency check.
#[derive(Debug, Clone)]
pub struct ConsistencyReport {
    pub facts: Vec<Fact>,
    pub violations: Vec<String>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Reset the case, compile the claim, and assert the resulting facts. One
/// trace line records the whole batch.
pub fn assert_claim_facts(
    kb: &mut KnowledgeBase,
    claim: &Claim,
    case_id: &str,
    trace: &mut ReasoningTrace,
) -> Result<Vec<Fact>, EngineError> {
    kb.reset_case(case_id);

    let facts = compile_facts(claim, case_id);
    for fact in &facts {
        kb.assert_fact(fact)?;
    }

    let rendered: Vec<String> = facts.iter().map(|fact| fact.to_string()).collect();
    trace.push(format!("Asserted case facts: [{}]", rendered.join(", ")));
    Ok(facts)
}

/// Query the violation rules and trace the outcome: one line per violation,
/// or a single no-violations line.
pub fn find_violations(
    kb: &KnowledgeBase,
    trace: &mut ReasoningTrace,
) -> Result<Vec<String>, EngineError> {
    let violations = kb.query_violations()?;

    if violations.is_empty() {
        trace.push("No violations detected by the knowledge base.");
    } else {
        for violation in &violations {
            trace.push(format!("Detected violation: {violation}"));
        }
    }
    Ok(violations)
}

/// Full check for one claim: reset, compile, assert, query, trace.
pub fn check(
    kb: &mut KnowledgeBase,
    claim: &Claim,
    case_id: &str,
    trace: &mut ReasoningTrace,
) -> Result<ConsistencyReport, EngineError> {
    let facts = assert_claim_facts(kb, claim, case_id, trace)?;
    let violations = find_violations(kb, trace)?;
    Ok(ConsistencyReport { facts, violations })
}
