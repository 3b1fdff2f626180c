//! Tool registry and in-process tool providers

pub mod cast_lookup;
pub mod registry;
pub mod retrieval;

pub use cast_lookup::CastLookupToolProvider;
pub use registry::{DiscoveryReport, RegistryError, SkippedProvider, ToolRegistry};
pub use retrieval::RetrievalToolProvider;
