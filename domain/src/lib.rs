//! Domain layer for callsheet
//!
//! This crate contains the core entities and value objects of the tool
//! orchestration runtime. It has no dependencies on infrastructure or
//! process concerns.
//!
//! # Core Concepts
//!
//! ## Tools
//!
//! A *tool* is a named capability with a declared input schema that the
//! reasoning backend may invoke during an orchestration run. Tools come
//! from several provenances — in-process functions and out-of-process
//! tool servers — all exposed through the [`tool::provider::ToolProvider`]
//! abstraction.
//!
//! ## Conversation
//!
//! One orchestration run owns a single append-only [`Conversation`]: user
//! input, assistant turns (final answers or tool-call requests), and tool
//! results, in the order they happened.

pub mod conversation;
pub mod core;
pub mod tool;

// Re-export commonly used types
pub use conversation::entities::{Conversation, Directive, Turn};
pub use core::string::truncate;
pub use tool::{
    entities::{ParamType, ToolCall, ToolDefinition, ToolParameter},
    provider::{ProviderError, ToolProvider},
    validation::validate_arguments,
    value_objects::{ToolError, ToolErrorKind, ToolOutcome, ToolResult},
};
