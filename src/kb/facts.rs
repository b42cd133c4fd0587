//! Ground case facts and the claim-to-fact compiler.

use std::fmt;

use crate::kb::sanitize::sanitize;
use crate::model::Claim;

/// The fixed predicate vocabulary for case facts, with arities. Everything the
/// compiler emits, and everything [`super::KnowledgeBase::assert_fact`]
/// accepts, lives here.
pub const TRACKED_PREDICATES: &[(&str, usize)] = &[
    ("patient", 1),
    ("diagnosis", 2),
    ("observed_symptom", 2),
    ("recommended_treatment", 2),
];

/// A ground logical statement about one case. The first argument is always
/// the case identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fact {
    predicate: String,
    args: Vec<String>,
}

impl Fact {
    /// Arbitrary predicate/argument fact. The engine validates it against the
    /// tracked vocabulary at assert time; prefer the named constructors.
    pub fn new(predicate: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            predicate: predicate.into(),
            args,
        }
    }

    pub fn patient(case_id: &str) -> Self {
        Self {
            predicate: "patient".to_string(),
            args: vec![case_id.to_string()],
        }
    }

    pub fn diagnosis(case_id: &str, diagnosis: &str) -> Self {
        Self {
            predicate: "diagnosis".to_string(),
            args: vec![case_id.to_string(), diagnosis.to_string()],
        }
    }

    pub fn observed_symptom(case_id: &str, symptom: &str) -> Self {
        Self {
            predicate: "observed_symptom".to_string(),
            args: vec![case_id.to_string(), symptom.to_string()],
        }
    }

    pub fn recommended_treatment(case_id: &str, treatment: &str) -> Self {
        Self {
            predicate: "recommended_treatment".to_string(),
            args: vec![case_id.to_string(), treatment.to_string()],
        }
    }

    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn case_id(&self) -> &str {
        &self.args[0]
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.predicate, self.args.join(", "))
    }
}

/// Compile a structured claim into the ground facts for one case.
///
/// Always emits `patient(case_id)`. The diagnosis fact is emitted only when a
/// non-empty diagnosis is present; missing optional fields simply yield fewer
/// facts. Output preserves input order for reproducible tracing, though the
/// engine treats the batch as unordered.
pub fn compile_facts(claim: &Claim, case_id: &str) -> Vec<Fact> {
    let mut facts = vec![Fact::patient(case_id)];

    if let Some(diagnosis) = claim.diagnosis.as_deref() {
        let atom = sanitize(diagnosis);
        if !atom.is_empty() {
            facts.push(Fact::diagnosis(case_id, &atom));
        }
    }

    for symptom in &claim.evidence_symptoms {
        facts.push(Fact::observed_symptom(case_id, &sanitize(symptom)));
    }

    for treatment in &claim.recommended_treatments {
        facts.push(Fact::recommended_treatment(case_id, &sanitize(treatment)));
    }

    facts
}

/// Whether a string can be embedded in a rendered term without corrupting it.
/// Deliberately more lenient than the rule-file atom syntax: the sanitizer is
/// total, so tokens like `covid-19` must remain assertable; they just never
/// unify with rule-file atoms.
pub(crate) fn is_renderable_atom(text: &str) -> bool {
    !text.is_empty()
        && !text
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | ',' | '.' | '\'' | '"'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn compiles_full_claim_to_expected_fact_set() {
        let claim = Claim {
            diagnosis: Some("Flu".to_string()),
            explanation: None,
            recommended_treatments: vec![],
            evidence_symptoms: vec!["Fever".to_string(), "Cough".to_string()],
        };

        let facts: HashSet<Fact> = compile_facts(&claim, "p1").into_iter().collect();
        let expected: HashSet<Fact> = [
            Fact::patient("p1"),
            Fact::diagnosis("p1", "flu"),
            Fact::observed_symptom("p1", "fever"),
            Fact::observed_symptom("p1", "cough"),
        ]
        .into_iter()
        .collect();

        assert_eq!(facts, expected);
    }

    #[test]
    fn missing_fields_yield_fewer_facts() {
        let claim = Claim::default();
        let facts = compile_facts(&claim, "p1");
        assert_eq!(facts, vec![Fact::patient("p1")]);
    }

    #[test]
    fn blank_diagnosis_is_skipped() {
        let claim = Claim {
            diagnosis: Some("   ".to_string()),
            ..Claim::default()
        };
        let facts = compile_facts(&claim, "p1");
        assert_eq!(facts, vec![Fact::patient("p1")]);
    }

    #[test]
    fn preserves_input_order() {
        let claim = Claim {
            diagnosis: Some("asthma".to_string()),
            explanation: None,
            recommended_treatments: vec!["Salbutamol".to_string()],
            evidence_symptoms: vec!["Wheezing".to_string()],
        };

        let rendered: Vec<String> = compile_facts(&claim, "p9")
            .iter()
            .map(|f| f.to_string())
            .collect();
        assert_eq!(
            rendered,
            vec![
                "patient(p9)",
                "diagnosis(p9, asthma)",
                "observed_symptom(p9, wheezing)",
                "recommended_treatment(p9, salbutamol)",
            ]
        );
    }

    #[test]
    fn renderable_atom_rejects_term_syntax() {
        assert!(is_renderable_atom("covid-19"));
        assert!(is_renderable_atom("fever"));
        assert!(!is_renderable_atom(""));
        assert!(!is_renderable_atom("bad(atom"));
        assert!(!is_renderable_atom("a,b"));
        assert!(!is_renderable_atom("two words"));
    }
}
