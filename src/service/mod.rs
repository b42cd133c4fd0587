pub mod answer;
pub mod backend;
pub mod consistency;
pub mod correction;
pub mod respond;

pub use backend::{BackendError, GenerationBackend, OpenAiBackend, ScriptedBackend};
pub use consistency::ConsistencyReport;
