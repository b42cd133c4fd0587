//! Validates and repairs LLM-generated clinical claims against a declarative
//! rule base.
//!
//! A generated claim (diagnosis, treatments, evidence symptoms) is compiled
//! into ground logic facts about one case, checked against a small rule base
//! by a unification-based engine, and, when violations are found, repaired
//! once through the generation back-end. Every run produces one final answer
//! plus an append-only reasoning trace.
//!
//! Entry point: build an [`Evaluator`] with a [`KnowledgeBase`] and a
//! [`GenerationBackend`], then call [`Evaluator::run`] (question in) or
//! [`Evaluator::evaluate`] (upstream claim in). One evaluator per concurrent
//! run; the engine holds a single case's facts at a time.

pub mod kb;
pub mod model;
pub mod pipeline;
pub mod service;

pub use kb::{EngineError, Fact, KnowledgeBase, compile_facts, sanitize};
pub use model::{Claim, Config, GeneratedAnswer, ReasoningTrace, RunState};
pub use pipeline::{EvalError, Evaluator, Route};
pub use service::backend::{BackendError, GenerationBackend, OpenAiBackend, ScriptedBackend};
