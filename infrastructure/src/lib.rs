//! Infrastructure layer for callsheet
//!
//! Adapters for the application layer's ports: the subprocess tool channel,
//! the tool registry and its providers, the HTTP reasoning and retrieval
//! backends, the file-backed cast store, configuration loading, and the
//! JSONL run logger.

pub mod channel;
pub mod config;
pub mod logging;
pub mod reasoning;
pub mod retrieval;
pub mod store;
pub mod tools;

// Re-export commonly used types
pub use channel::{
    config::ChannelConfig,
    error::ChannelError,
    provider::ChannelToolProvider,
    session::{CallReply, ChannelSession},
};
pub use config::{ConfigError, ConfigLoader, FileConfig};
pub use logging::JsonlRunLogger;
pub use reasoning::HttpReasoningGateway;
pub use retrieval::HttpRetrievalBackend;
pub use store::JsonFileCastStore;
pub use tools::{
    CastLookupToolProvider, RegistryError, RetrievalToolProvider, ToolRegistry,
};
