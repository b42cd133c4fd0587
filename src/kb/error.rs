//! Error types for the knowledge-base engine.

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The fact is outside the fixed predicate vocabulary or one of its
    /// arguments would not render as a valid term. Indicates a compiler or
    /// sanitizer defect upstream, so it is surfaced rather than swallowed.
    #[error("malformed fact rejected: {0}")]
    MalformedFact(String),

    #[error("rule base parse error at line {line}: {message}")]
    RuleParse { line: usize, message: String },

    /// Resolution recursed past the depth guard. Only reachable with a
    /// recursive rule file; the bundled rules are non-recursive.
    #[error("resolution exceeded depth limit of {0}")]
    DepthLimit(usize),

    /// Resolution attempted more steps than the search budget allows.
    #[error("resolution exceeded step limit of {0}")]
    StepLimit(usize),
}
