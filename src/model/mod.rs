pub mod claim;
pub mod config;
pub mod state;

pub use claim::{Claim, GeneratedAnswer};
pub use config::Config;
pub use state::{DEFAULT_CASE_ID, ReasoningTrace, RunState};
