//! Knowledge-base engine: a static rule base plus a mutable per-case fact
//! store, queried by unification-based backward chaining.
//!
//! Construct one instance per concurrent run: all mutating operations touch
//! the instance's fact store, and the engine holds exactly one case's facts
//! at a time. `reset_case` must run before asserting a new case's facts;
//! skipping it silently merges stale state (caller discipline, not detected
//! at runtime).

mod error;
mod facts;
mod parser;
mod sanitize;
mod solve;
mod term;

use std::collections::{HashMap, HashSet};

pub use error::EngineError;
pub use facts::{Fact, TRACKED_PREDICATES, compile_facts};
pub use sanitize::sanitize;

use crate::kb::facts::is_renderable_atom;
use crate::kb::parser::{Clause, RuleSet, parse_rules};
use crate::kb::solve::{Flow, Solver};
use crate::kb::term::{Sym, SymbolTable, TermArena, TermId};

/// Rule base shipped with the crate; see `rules/clinical.pl`.
const DEFAULT_RULES: &str = include_str!("../../rules/clinical.pl");

const VIOLATION_FUNCTOR: &str = "violation";
const CANDIDATE_FUNCTOR: &str = "candidate_diagnosis";

#[derive(Debug, Clone)]
struct StoredFact {
    term: TermId,
    predicate: Sym,
    arity: usize,
    case: Sym,
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    symbols: SymbolTable,
    arena: TermArena,
    rules: RuleSet,
    clause_index: HashMap<(Sym, usize), Vec<usize>>,
    case_facts: Vec<StoredFact>,
}

impl KnowledgeBase {
    /// Parse a rule-base text into a ready engine. The rules are read-only
    /// for the lifetime of the instance.
    pub fn new(rules_text: &str) -> Result<Self, EngineError> {
        let mut symbols = SymbolTable::default();
        let mut arena = TermArena::default();
        let rules = parse_rules(rules_text, &mut symbols, &mut arena)?;

        let mut clause_index: HashMap<(Sym, usize), Vec<usize>> = HashMap::new();
        for (index, clause) in rules.clauses.iter().enumerate() {
            let key = match arena.get(clause.head) {
                term::Term::Atom(sym) => (*sym, 0),
                term::Term::App(sym, args) => (*sym, args.len()),
                // parse_rules rejects variable heads
                term::Term::Var(_) => continue,
            };
            clause_index.entry(key).or_default().push(index);
        }

        tracing::debug!(
            clauses = rules.clauses.len(),
            descriptions = rules.descriptions.len(),
            "Rule base loaded"
        );

        Ok(Self {
            symbols,
            arena,
            rules,
            clause_index,
            case_facts: Vec::new(),
        })
    }

    /// Engine with the bundled clinical rule base.
    pub fn with_default_rules() -> Self {
        Self::new(DEFAULT_RULES).expect("bundled rule base is valid")
    }

    /// Human-readable rule descriptions (`%%` lines), in file order. Embedded
    /// in repair prompts so prompt and rule file cannot drift apart.
    pub fn rule_descriptions(&self) -> &[String] {
        &self.rules.descriptions
    }

    /// Retract every fact for every tracked predicate matching `case_id`.
    /// Idempotent; a no-op when the case has no facts.
    pub fn reset_case(&mut self, case_id: &str) {
        let Some(case) = self.symbols.lookup(case_id) else {
            return;
        };
        let before = self.case_facts.len();
        self.case_facts.retain(|fact| fact.case != case);
        let removed = before - self.case_facts.len();
        if removed > 0 {
            tracing::debug!(case = %case_id, removed, "Retracted case facts");
        }
    }

    /// Add one ground fact to working memory.
    ///
    /// Fails with [`EngineError::MalformedFact`] when the predicate/arity is
    /// outside [`TRACKED_PREDICATES`] or an argument would not render as a
    /// valid term. This is the backstop for sanitizer or compiler defects.
    pub fn assert_fact(&mut self, fact: &Fact) -> Result<(), EngineError> {
        let arity = fact.args().len();
        let tracked = TRACKED_PREDICATES
            .iter()
            .any(|&(name, n)| name == fact.predicate() && n == arity);
        if !tracked {
            return Err(EngineError::MalformedFact(format!(
                "unknown predicate {}/{arity} in {fact}",
                fact.predicate()
            )));
        }
        for arg in fact.args() {
            if !is_renderable_atom(arg) {
                return Err(EngineError::MalformedFact(format!(
                    "argument '{arg}' in {fact} is not a valid term"
                )));
            }
        }

        let predicate = self.symbols.intern(fact.predicate());
        // arity was validated above, so the case argument exists
        let case = self.symbols.intern(fact.case_id());
        let args: Vec<TermId> = fact
            .args()
            .iter()
            .map(|arg| {
                let sym = self.symbols.intern(arg);
                self.arena.atom(sym)
            })
            .collect();
        let term = self.arena.app(predicate, args);

        tracing::debug!(fact = %fact, "Asserted case fact");
        self.case_facts.push(StoredFact {
            term,
            predicate,
            arity,
            case,
        });
        Ok(())
    }

    /// Evaluate all `violation/1` rules against the current facts. An empty
    /// result means the case is consistent. Enumeration order follows clause
    /// and fact declaration order, but callers must not rely on it.
    pub fn query_violations(&self) -> Result<Vec<String>, EngineError> {
        let Some(functor) = self.symbols.lookup(VIOLATION_FUNCTOR) else {
            return Ok(Vec::new());
        };
        let mut solver = Solver::new(self);
        let var = solver.fresh_var();
        let goal = solver.app(functor, vec![var]);

        let mut violations = Vec::new();
        solver.solve(&[(goal, false)], 0, &mut |s| {
            violations.push(s.render(var));
            Flow::Continue
        })?;

        tracing::debug!(count = violations.len(), "Violation query complete");
        Ok(violations)
    }

    /// Evaluate `candidate_diagnosis/2` for the case. Deduplicated, order
    /// unspecified; suggestions only, never gating correctness.
    pub fn query_candidate_diagnoses(&self, case_id: &str) -> Result<Vec<String>, EngineError> {
        let Some(functor) = self.symbols.lookup(CANDIDATE_FUNCTOR) else {
            return Ok(Vec::new());
        };
        let Some(case) = self.symbols.lookup(case_id) else {
            return Ok(Vec::new());
        };
        let mut solver = Solver::new(self);
        let var = solver.fresh_var();
        let case_atom = solver.atom(case);
        let goal = solver.app(functor, vec![case_atom, var]);

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        solver.solve(&[(goal, false)], 0, &mut |s| {
            let rendered = s.render(var);
            if seen.insert(rendered.clone()) {
                candidates.push(rendered);
            }
            Flow::Continue
        })?;

        tracing::debug!(case = %case_id, count = candidates.len(), "Candidate query complete");
        Ok(candidates)
    }

    // --- solver access ------------------------------------------------------

    pub(crate) fn arena_snapshot(&self) -> TermArena {
        self.arena.clone()
    }

    pub(crate) fn symbol_name(&self, sym: Sym) -> &str {
        self.symbols.name(sym)
    }

    pub(crate) fn clause(&self, index: usize) -> &Clause {
        &self.rules.clauses[index]
    }

    pub(crate) fn clauses_for(&self, functor: Sym, arity: usize) -> Vec<usize> {
        self.clause_index
            .get(&(functor, arity))
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn case_fact_terms(&self, predicate: Sym, arity: usize) -> Vec<TermId> {
        self.case_facts
            .iter()
            .filter(|fact| fact.predicate == predicate && fact.arity == arity)
            .map(|fact| fact.term)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asserted(kb: &mut KnowledgeBase, facts: &[Fact]) {
        for fact in facts {
            kb.assert_fact(fact).expect("fact asserts");
        }
    }

    #[test]
    fn empty_engine_reports_no_violations() {
        let mut kb = KnowledgeBase::with_default_rules();
        assert_eq!(kb.query_violations().unwrap(), Vec::<String>::new());
        kb.reset_case("p1");
        assert_eq!(kb.query_violations().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn consistent_influenza_case_has_no_violations() {
        let mut kb = KnowledgeBase::with_default_rules();
        asserted(
            &mut kb,
            &[
                Fact::patient("p1"),
                Fact::diagnosis("p1", "influenza"),
                Fact::observed_symptom("p1", "fever"),
                Fact::observed_symptom("p1", "cough"),
                Fact::recommended_treatment("p1", "paracetamol"),
            ],
        );
        assert_eq!(kb.query_violations().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn missing_usual_symptom_is_a_violation() {
        let mut kb = KnowledgeBase::with_default_rules();
        asserted(
            &mut kb,
            &[
                Fact::patient("p1"),
                Fact::diagnosis("p1", "influenza"),
                Fact::observed_symptom("p1", "fever"),
            ],
        );
        let violations = kb.query_violations().unwrap();
        assert!(
            violations.contains(&"missing_symptom(influenza, cough)".to_string()),
            "{violations:?}"
        );
        assert!(!violations.contains(&"missing_symptom(influenza, fever)".to_string()));
    }

    #[test]
    fn nsaid_with_asthma_is_contraindicated() {
        let mut kb = KnowledgeBase::with_default_rules();
        asserted(
            &mut kb,
            &[
                Fact::patient("p1"),
                Fact::diagnosis("p1", "asthma"),
                Fact::observed_symptom("p1", "wheezing"),
                Fact::observed_symptom("p1", "shortness_of_breath"),
                Fact::recommended_treatment("p1", "ibuprofen"),
            ],
        );
        let violations = kb.query_violations().unwrap();
        assert!(
            violations
                .contains(&"contraindicated_treatment(ibuprofen, nsaid, asthma)".to_string()),
            "{violations:?}"
        );
    }

    #[test]
    fn reset_case_clears_stale_facts() {
        let mut kb = KnowledgeBase::with_default_rules();
        asserted(
            &mut kb,
            &[
                Fact::patient("p1"),
                Fact::diagnosis("p1", "asthma"),
                Fact::recommended_treatment("p1", "ibuprofen"),
            ],
        );
        assert!(!kb.query_violations().unwrap().is_empty());

        kb.reset_case("p1");
        assert_eq!(kb.query_violations().unwrap(), Vec::<String>::new());

        asserted(
            &mut kb,
            &[
                Fact::patient("p1"),
                Fact::diagnosis("p1", "influenza"),
                Fact::observed_symptom("p1", "fever"),
                Fact::observed_symptom("p1", "cough"),
            ],
        );
        assert_eq!(kb.query_violations().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn facts_are_scoped_to_their_case() {
        let mut kb = KnowledgeBase::with_default_rules();
        asserted(
            &mut kb,
            &[
                Fact::patient("p1"),
                Fact::observed_symptom("p1", "fever"),
                Fact::patient("p2"),
                Fact::observed_symptom("p2", "wheezing"),
            ],
        );

        let p1 = kb.query_candidate_diagnoses("p1").unwrap();
        assert!(p1.contains(&"influenza".to_string()), "{p1:?}");
        assert!(!p1.contains(&"asthma".to_string()));

        kb.reset_case("p2");
        let p1_after = kb.query_candidate_diagnoses("p1").unwrap();
        assert_eq!(p1, p1_after);
        assert_eq!(
            kb.query_candidate_diagnoses("p2").unwrap(),
            Vec::<String>::new()
        );
    }

    #[test]
    fn candidates_are_deduplicated() {
        let mut kb = KnowledgeBase::with_default_rules();
        asserted(
            &mut kb,
            &[
                Fact::patient("p1"),
                Fact::observed_symptom("p1", "fever"),
                Fact::observed_symptom("p1", "cough"),
            ],
        );
        let candidates = kb.query_candidate_diagnoses("p1").unwrap();
        // influenza matches both fever and cough but appears once
        assert_eq!(
            candidates
                .iter()
                .filter(|c| c.as_str() == "influenza")
                .count(),
            1
        );
        assert!(candidates.contains(&"common_cold".to_string()));
    }

    #[test]
    fn vocabulary_violations_are_rejected() {
        let mut kb = KnowledgeBase::with_default_rules();

        let unknown = Fact::new("drug_class", vec!["x".into(), "y".into()]);
        assert!(matches!(
            kb.assert_fact(&unknown),
            Err(EngineError::MalformedFact(_))
        ));

        let wrong_arity = Fact::new("diagnosis", vec!["p1".into()]);
        assert!(matches!(
            kb.assert_fact(&wrong_arity),
            Err(EngineError::MalformedFact(_))
        ));
    }

    #[test]
    fn unparseable_atom_is_rejected_not_asserted() {
        let mut kb = KnowledgeBase::with_default_rules();
        let err = kb
            .assert_fact(&Fact::diagnosis("p1", "weird)term"))
            .unwrap_err();
        assert!(matches!(err, EngineError::MalformedFact(_)));
        assert_eq!(kb.query_violations().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn missing_violation_rules_mean_consistent() {
        let mut kb = KnowledgeBase::new("usual_symptom(flu, fever).\n").expect("parses");
        kb.assert_fact(&Fact::patient("p1")).unwrap();
        assert_eq!(kb.query_violations().unwrap(), Vec::<String>::new());
        assert_eq!(
            kb.query_candidate_diagnoses("p1").unwrap(),
            Vec::<String>::new()
        );
    }
}
