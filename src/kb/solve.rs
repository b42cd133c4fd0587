//! Unification and depth-first backtracking resolution.
//!
//! Closed-world semantics: a goal that cannot be derived from the clause
//! store and the current case facts fails, and `\+` succeeds exactly when its
//! argument fails (negation as failure). Bindings are undone through a trail,
//! so backtracking never leaks state between alternatives.

use std::collections::HashMap;

use crate::kb::KnowledgeBase;
use crate::kb::error::EngineError;
use crate::kb::term::{Sym, Term, TermArena, TermId};

/// Recursion guard for the goal stack.
const MAX_DEPTH: usize = 512;

/// Budget for total resolution attempts per query.
const STEP_LIMIT: usize = 100_000;

/// Search control returned by solution callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Stop,
}

pub(crate) struct Solver<'kb> {
    kb: &'kb KnowledgeBase,
    arena: TermArena,
    bindings: HashMap<u32, TermId>,
    trail: Vec<u32>,
    next_var: u32,
    steps: usize,
}

impl<'kb> Solver<'kb> {
    pub(crate) fn new(kb: &'kb KnowledgeBase) -> Self {
        Self {
            kb,
            arena: kb.arena_snapshot(),
            bindings: HashMap::new(),
            trail: Vec::new(),
            next_var: 0,
            steps: 0,
        }
    }

    pub(crate) fn fresh_var(&mut self) -> TermId {
        let slot = self.next_var;
        self.next_var += 1;
        self.arena.var(slot)
    }

    pub(crate) fn atom(&mut self, sym: Sym) -> TermId {
        self.arena.atom(sym)
    }

    pub(crate) fn app(&mut self, functor: Sym, args: Vec<TermId>) -> TermId {
        self.arena.app(functor, args)
    }

    /// Follow the binding chain to a representative term.
    fn walk(&self, mut id: TermId) -> TermId {
        loop {
            match self.arena.get(id) {
                Term::Var(slot) => match self.bindings.get(slot) {
                    Some(&bound) => id = bound,
                    None => return id,
                },
                _ => return id,
            }
        }
    }

    fn bind(&mut self, slot: u32, id: TermId) {
        self.bindings.insert(slot, id);
        self.trail.push(slot);
    }

    fn undo_to(&mut self, mark: usize) {
        while self.trail.len() > mark {
            if let Some(slot) = self.trail.pop() {
                self.bindings.remove(&slot);
            }
        }
    }

    fn unify(&mut self, a: TermId, b: TermId) -> bool {
        let a = self.walk(a);
        let b = self.walk(b);
        let (term_a, term_b) = (self.arena.get(a).clone(), self.arena.get(b).clone());
        match (term_a, term_b) {
            (Term::Var(x), Term::Var(y)) if x == y => true,
            (Term::Var(x), _) => {
                self.bind(x, b);
                true
            }
            (_, Term::Var(y)) => {
                self.bind(y, a);
                true
            }
            (Term::Atom(p), Term::Atom(q)) => p == q,
            (Term::App(f, f_args), Term::App(g, g_args)) => {
                f == g
                    && f_args.len() == g_args.len()
                    && f_args
                        .iter()
                        .zip(g_args.iter())
                        .all(|(&x, &y)| self.unify(x, y))
            }
            _ => false,
        }
    }

    /// Depth-first resolution over the goal list. `emit` runs once per
    /// solution; returning [`Flow::Stop`] aborts the remaining search.
    pub(crate) fn solve(
        &mut self,
        goals: &[(TermId, bool)],
        depth: usize,
        emit: &mut dyn FnMut(&mut Self) -> Flow,
    ) -> Result<Flow, EngineError> {
        let Some(&(goal, negated)) = goals.first() else {
            return Ok(emit(self));
        };
        let rest = &goals[1..];

        if depth > MAX_DEPTH {
            return Err(EngineError::DepthLimit(MAX_DEPTH));
        }
        self.steps += 1;
        if self.steps > STEP_LIMIT {
            return Err(EngineError::StepLimit(STEP_LIMIT));
        }

        if negated {
            let mark = self.trail.len();
            let mut found = false;
            self.solve(&[(goal, false)], depth + 1, &mut |_| {
                found = true;
                Flow::Stop
            })?;
            self.undo_to(mark);
            if found {
                return Ok(Flow::Continue);
            }
            return self.solve(rest, depth, emit);
        }

        let goal = self.walk(goal);
        let (functor, arity) = match self.arena.get(goal) {
            Term::Atom(sym) => (*sym, 0),
            Term::App(sym, args) => (*sym, args.len()),
            // Bare-variable goals are rejected at parse time; an unbound goal
            // means the query itself was malformed, so it simply fails.
            Term::Var(_) => return Ok(Flow::Continue),
        };

        let kb = self.kb;

        // Case facts are ground, so they unify without renaming.
        for fact in kb.case_fact_terms(functor, arity) {
            let mark = self.trail.len();
            if self.unify(goal, fact) && self.solve(rest, depth + 1, emit)? == Flow::Stop {
                self.undo_to(mark);
                return Ok(Flow::Stop);
            }
            self.undo_to(mark);
        }

        for index in kb.clauses_for(functor, arity) {
            let clause = kb.clause(index).clone();
            let mark = self.trail.len();
            let offset = self.next_var;
            self.next_var += clause.nvars;
            let head = self.arena.instantiate(clause.head, offset);
            if self.unify(goal, head) {
                let mut goals: Vec<(TermId, bool)> = clause
                    .body
                    .iter()
                    .map(|g| (self.arena.instantiate(g.term, offset), g.negated))
                    .collect();
                goals.extend_from_slice(rest);
                if self.solve(&goals, depth + 1, emit)? == Flow::Stop {
                    self.undo_to(mark);
                    return Ok(Flow::Stop);
                }
            }
            self.undo_to(mark);
        }

        Ok(Flow::Continue)
    }

    /// Render a term under the current bindings. Unbound variables render as
    /// `_G<slot>`.
    pub(crate) fn render(&self, id: TermId) -> String {
        let id = self.walk(id);
        match self.arena.get(id) {
            Term::Var(slot) => format!("_G{slot}"),
            Term::Atom(sym) => self.kb.symbol_name(*sym).to_string(),
            Term::App(functor, args) => {
                let rendered: Vec<String> = args.iter().map(|&arg| self.render(arg)).collect();
                format!("{}({})", self.kb.symbol_name(*functor), rendered.join(", "))
            }
        }
    }
}
