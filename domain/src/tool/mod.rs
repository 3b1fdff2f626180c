//! Tool domain model
//!
//! Entities and value objects for the tool system: declared tool schemas,
//! tool-call requests produced by the reasoning backend, execution results,
//! and the provider abstraction that tool sources plug into.

pub mod entities;
pub mod provider;
pub mod validation;
pub mod value_objects;
