//! Reasoning backend port
//!
//! Defines the boundary to the language-model backend. The backend is an
//! opaque collaborator: it consumes the conversation so far plus the
//! advertised tool schemas and returns either a final answer or a list of
//! tool-call requests — never both. Retries on transient failure are the
//! caller's responsibility.

use async_trait::async_trait;
use callsheet_domain::conversation::entities::{Conversation, Directive};
use callsheet_domain::tool::entities::ToolDefinition;
use thiserror::Error;

/// Errors that can occur when consulting the reasoning backend
#[derive(Error, Debug)]
pub enum ReasoningError {
    #[error("Request to reasoning backend failed: {0}")]
    RequestFailed(String),

    #[error("Reasoning backend returned a malformed reply: {0}")]
    Protocol(String),

    #[error("Reasoning backend unavailable: {0}")]
    Unavailable(String),
}

/// Port to the reasoning backend
#[async_trait]
pub trait ReasoningPort: Send + Sync {
    /// Advance the conversation by one reasoning step.
    ///
    /// `tools` is the full advertised tool set, in registration order.
    async fn advance(
        &self,
        conversation: &Conversation,
        tools: &[ToolDefinition],
    ) -> Result<Directive, ReasoningError>;
}
