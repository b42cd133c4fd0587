//! Interned symbols and the term arena backing the resolution engine.
//!
//! Terms are stored in a flat arena and referenced by integer handles, so
//! unification compares handles and symbol ids instead of strings.

use std::collections::HashMap;

/// Interned symbol id. Two symbols are equal iff their ids are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sym(u32);

/// String interner for atoms and functors.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    names: Vec<String>,
    index: HashMap<String, Sym>,
}

impl SymbolTable {
    pub fn intern(&mut self, name: &str) -> Sym {
        if let Some(&sym) = self.index.get(name) {
            return sym;
        }
        let sym = Sym(self.names.len() as u32);
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), sym);
        sym
    }

    /// Look up a symbol without interning it.
    pub fn lookup(&self, name: &str) -> Option<Sym> {
        self.index.get(name).copied()
    }

    pub fn name(&self, sym: Sym) -> &str {
        &self.names[sym.0 as usize]
    }
}

/// Handle into a [`TermArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermId(u32);

#[derive(Debug, Clone)]
pub enum Term {
    /// Logic variable identified by a slot number. Slots stored in clauses are
    /// clause-local; the solver shifts them to fresh slots before use.
    Var(u32),
    Atom(Sym),
    /// Compound term: a functor applied to arguments.
    App(Sym, Vec<TermId>),
}

#[derive(Debug, Default, Clone)]
pub struct TermArena {
    terms: Vec<Term>,
}

impl TermArena {
    pub fn alloc(&mut self, term: Term) -> TermId {
        let id = TermId(self.terms.len() as u32);
        self.terms.push(term);
        id
    }

    pub fn get(&self, id: TermId) -> &Term {
        &self.terms[id.0 as usize]
    }

    pub fn atom(&mut self, sym: Sym) -> TermId {
        self.alloc(Term::Atom(sym))
    }

    pub fn var(&mut self, slot: u32) -> TermId {
        self.alloc(Term::Var(slot))
    }

    pub fn app(&mut self, functor: Sym, args: Vec<TermId>) -> TermId {
        self.alloc(Term::App(functor, args))
    }

    /// Copy a term, shifting every variable slot by `offset`. Used to rename a
    /// clause's variables apart from everything already on the solver's stack.
    /// Atoms are immutable and shared rather than copied.
    pub fn instantiate(&mut self, id: TermId, offset: u32) -> TermId {
        match self.get(id).clone() {
            Term::Var(slot) => self.var(slot + offset),
            Term::Atom(_) => id,
            Term::App(functor, args) => {
                let args = args
                    .iter()
                    .map(|&arg| self.instantiate(arg, offset))
                    .collect();
                self.app(functor, args)
            }
        }
    }
}
