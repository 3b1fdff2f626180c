//! Application layer for callsheet
//!
//! Use cases and ports. The ports define what the orchestration loop needs
//! from the outside world — a reasoning backend, a tool executor, the
//! retrieval and cast-store collaborators, a run logger — and the
//! infrastructure layer supplies the adapters.

pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use ports::cast_store::{CastStorePort, LookupError, Row};
pub use ports::reasoning::{ReasoningError, ReasoningPort};
pub use ports::retrieval::{Passage, RetrievalError, RetrievalPort};
pub use ports::run_logger::{NoRunLogger, RunEvent, RunLogger};
pub use ports::tool_executor::ToolExecutorPort;
pub use use_cases::run_orchestration::{
    OrchestrationError, RunOrchestration, RunOutcome, Termination,
};
