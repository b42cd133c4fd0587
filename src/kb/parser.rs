//! Parser for the rule-base text resource.
//!
//! The syntax is a small Prolog subset: ground clauses (`drug_class(ibuprofen,
//! nsaid).`), rules (`head :- goal, \+ goal.`), `%` line comments. Lines
//! starting with `%%` are human-readable rule descriptions; they are collected
//! in order and surfaced to repair prompts.

use std::collections::HashMap;

use crate::kb::error::EngineError;
use crate::kb::term::{SymbolTable, Term, TermArena, TermId};

/// One goal in a clause body. `negated` marks negation-as-failure (`\+`).
#[derive(Debug, Clone)]
pub(crate) struct Goal {
    pub term: TermId,
    pub negated: bool,
}

/// A stored clause. Variable slots are clause-local, `0..nvars`; the solver
/// shifts them to fresh slots before resolution.
#[derive(Debug, Clone)]
pub(crate) struct Clause {
    pub head: TermId,
    pub body: Vec<Goal>,
    pub nvars: u32,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct RuleSet {
    pub clauses: Vec<Clause>,
    pub descriptions: Vec<String>,
}

pub(crate) fn parse_rules(
    text: &str,
    symbols: &mut SymbolTable,
    arena: &mut TermArena,
) -> Result<RuleSet, EngineError> {
    let (tokens, descriptions) = lex(text)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        symbols,
        arena,
        vars: HashMap::new(),
        nvars: 0,
        last_line: text.lines().count().max(1),
    };

    let mut clauses = Vec::new();
    while !parser.at_end() {
        clauses.push(parser.parse_clause()?);
    }

    Ok(RuleSet {
        clauses,
        descriptions,
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Atom(String),
    Var(String),
    LParen,
    RParen,
    Comma,
    Dot,
    Neck,
    Negate,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Atom(name) => format!("atom '{name}'"),
            Token::Var(name) => format!("variable '{name}'"),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::Neck => "':-'".to_string(),
            Token::Negate => "'\\+'".to_string(),
        }
    }
}

fn lex(text: &str) -> Result<(Vec<(Token, usize)>, Vec<String>), EngineError> {
    let mut tokens = Vec::new();
    let mut descriptions = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line = index + 1;
        let mut chars = raw_line.char_indices().peekable();

        while let Some(&(at, c)) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
                continue;
            }
            if c == '%' {
                if let Some(desc) = raw_line[at..].strip_prefix("%%") {
                    let desc = desc.trim();
                    if !desc.is_empty() {
                        descriptions.push(desc.to_string());
                    }
                }
                break;
            }

            match c {
                '(' => {
                    chars.next();
                    tokens.push((Token::LParen, line));
                }
                ')' => {
                    chars.next();
                    tokens.push((Token::RParen, line));
                }
                ',' => {
                    chars.next();
                    tokens.push((Token::Comma, line));
                }
                '.' => {
                    chars.next();
                    tokens.push((Token::Dot, line));
                }
                ':' => {
                    chars.next();
                    match chars.peek() {
                        Some(&(_, '-')) => {
                            chars.next();
                            tokens.push((Token::Neck, line));
                        }
                        _ => {
                            return Err(EngineError::RuleParse {
                                line,
                                message: "expected '-' after ':'".to_string(),
                            });
                        }
                    }
                }
                '\\' => {
                    chars.next();
                    match chars.peek() {
                        Some(&(_, '+')) => {
                            chars.next();
                            tokens.push((Token::Negate, line));
                        }
                        _ => {
                            return Err(EngineError::RuleParse {
                                line,
                                message: "expected '+' after '\\'".to_string(),
                            });
                        }
                    }
                }
                c if c.is_ascii_lowercase() => {
                    tokens.push((Token::Atom(take_word(&mut chars)), line));
                }
                c if c.is_ascii_uppercase() || c == '_' => {
                    tokens.push((Token::Var(take_word(&mut chars)), line));
                }
                other => {
                    return Err(EngineError::RuleParse {
                        line,
                        message: format!("unexpected character '{other}'"),
                    });
                }
            }
        }
    }

    Ok((tokens, descriptions))
}

fn take_word(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> String {
    let mut word = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
            chars.next();
        } else {
            break;
        }
    }
    word
}

struct Parser<'a> {
    tokens: &'a [(Token, usize)],
    pos: usize,
    symbols: &'a mut SymbolTable,
    arena: &'a mut TermArena,
    /// Variable name to clause-local slot, reset per clause.
    vars: HashMap<String, u32>,
    nvars: u32,
    last_line: usize,
}

impl Parser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current_line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, line)| *line)
            .unwrap_or(self.last_line)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn next(&mut self) -> Result<Token, EngineError> {
        match self.tokens.get(self.pos) {
            Some((token, _)) => {
                self.pos += 1;
                Ok(token.clone())
            }
            None => Err(EngineError::RuleParse {
                line: self.last_line,
                message: "unexpected end of rule base (unterminated clause?)".to_string(),
            }),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), EngineError> {
        let line = self.current_line();
        let token = self.next()?;
        if token == expected {
            Ok(())
        } else {
            Err(EngineError::RuleParse {
                line,
                message: format!("expected {}, found {}", expected.describe(), token.describe()),
            })
        }
    }

    fn parse_clause(&mut self) -> Result<Clause, EngineError> {
        self.vars.clear();
        self.nvars = 0;

        let head = self.parse_callable("clause head")?;
        let mut body = Vec::new();

        if self.peek() == Some(&Token::Neck) {
            self.next()?;
            loop {
                body.push(self.parse_goal()?);
                match self.peek() {
                    Some(Token::Comma) => {
                        self.next()?;
                    }
                    _ => break,
                }
            }
        }

        self.expect(Token::Dot)?;
        Ok(Clause {
            head,
            body,
            nvars: self.nvars,
        })
    }

    fn parse_goal(&mut self) -> Result<Goal, EngineError> {
        let negated = if self.peek() == Some(&Token::Negate) {
            self.next()?;
            true
        } else {
            false
        };
        let term = self.parse_callable("goal")?;
        Ok(Goal { term, negated })
    }

    /// Parse a term that must be callable: bare variables are rejected so the
    /// solver never sees an unbound goal.
    fn parse_callable(&mut self, what: &str) -> Result<TermId, EngineError> {
        let line = self.current_line();
        let term = self.parse_term()?;
        if matches!(self.arena.get(term), Term::Var(_)) {
            return Err(EngineError::RuleParse {
                line,
                message: format!("{what} must be an atom or compound term, not a variable"),
            });
        }
        Ok(term)
    }

    fn parse_term(&mut self) -> Result<TermId, EngineError> {
        let line = self.current_line();
        match self.next()? {
            Token::Var(name) => {
                // '_' is anonymous: every occurrence is a fresh variable.
                let slot = if name == "_" {
                    let slot = self.nvars;
                    self.nvars += 1;
                    slot
                } else if let Some(&slot) = self.vars.get(&name) {
                    slot
                } else {
                    let slot = self.nvars;
                    self.nvars += 1;
                    self.vars.insert(name, slot);
                    slot
                };
                Ok(self.arena.var(slot))
            }
            Token::Atom(name) => {
                let sym = self.symbols.intern(&name);
                if self.peek() != Some(&Token::LParen) {
                    return Ok(self.arena.atom(sym));
                }
                self.next()?;
                let mut args = vec![self.parse_term()?];
                loop {
                    match self.next()? {
                        Token::Comma => args.push(self.parse_term()?),
                        Token::RParen => break,
                        token => {
                            return Err(EngineError::RuleParse {
                                line,
                                message: format!(
                                    "expected ',' or ')' in argument list, found {}",
                                    token.describe()
                                ),
                            });
                        }
                    }
                }
                Ok(self.arena.app(sym, args))
            }
            token => Err(EngineError::RuleParse {
                line,
                message: format!("expected a term, found {}", token.describe()),
            }),
        }
    }
}
