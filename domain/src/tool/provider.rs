//! Tool provider abstraction
//!
//! This module defines the [`ToolProvider`] trait, which abstracts the
//! sources that tools come from so the registry can aggregate them behind
//! one dispatch surface:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     ToolRegistry                    │
//! │   (aggregates providers, routes calls by name)      │
//! └─────────────────────────────────────────────────────┘
//!         │                 │                  │
//!         ▼                 ▼                  ▼
//!  ┌────────────┐    ┌────────────┐    ┌──────────────┐
//!  │ Retrieval  │    │ CastLookup │    │   Channel    │
//!  │ (in-proc)  │    │ (in-proc)  │    │ (subprocess) │
//!  └────────────┘    └────────────┘    └──────────────┘
//! ```
//!
//! In-process providers wrap native functions; channel providers forward
//! calls to an out-of-process tool server over the stdio wire protocol.
//! Tool names must be unique across all registered providers — a collision
//! is a registration error, not a precedence contest.

use async_trait::async_trait;
use thiserror::Error;

use super::entities::{ToolCall, ToolDefinition};
use super::value_objects::ToolResult;

/// Error type for tool provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider is not available (e.g., its tool server failed to start)
    #[error("Provider not available: {0}")]
    NotAvailable(String),

    /// Failed to discover tools from the provider
    #[error("Discovery failed: {0}")]
    DiscoveryFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// A source of tools pluggable into the registry.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Unique identifier for this provider
    ///
    /// Examples: "retrieval", "cast_lookup", "channel:castd"
    fn id(&self) -> &str;

    /// Display name for user-facing output
    fn display_name(&self) -> &str;

    /// Check if the provider is available.
    ///
    /// Channel providers report unavailable once their session is shut
    /// down; in-process providers are always available.
    async fn is_available(&self) -> bool {
        true
    }

    /// Discover available tools from this provider
    ///
    /// Returns the list of tools this provider can execute, with their
    /// declared schemas.
    async fn discover_tools(&self) -> Result<Vec<ToolDefinition>, ProviderError>;

    /// Execute a tool call
    ///
    /// The tool name in the call must match one of the tools returned by
    /// `discover_tools()`. Never errors: all failure is encoded in the
    /// returned result.
    async fn execute(&self, call: &ToolCall) -> ToolResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::value_objects::ToolError;

    /// A mock provider for testing
    struct MockProvider {
        id: String,
        tools: Vec<ToolDefinition>,
        available: bool,
    }

    impl MockProvider {
        fn new(id: &str, available: bool) -> Self {
            Self {
                id: id.to_string(),
                tools: Vec::new(),
                available,
            }
        }

        fn with_tool(mut self, name: &str) -> Self {
            self.tools
                .push(ToolDefinition::new(name, format!("Mock tool: {}", name)));
            self
        }
    }

    #[async_trait]
    impl ToolProvider for MockProvider {
        fn id(&self) -> &str {
            &self.id
        }

        fn display_name(&self) -> &str {
            "Mock Provider"
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        async fn discover_tools(&self) -> Result<Vec<ToolDefinition>, ProviderError> {
            if self.available {
                Ok(self.tools.clone())
            } else {
                Err(ProviderError::NotAvailable("Mock not available".into()))
            }
        }

        async fn execute(&self, call: &ToolCall) -> ToolResult {
            if self.tools.iter().any(|t| t.name == call.tool_name) {
                ToolResult::success(&call.tool_name, serde_json::json!("mock output"))
            } else {
                ToolResult::failure(&call.tool_name, ToolError::unknown_tool(&call.tool_name))
            }
        }
    }

    #[tokio::test]
    async fn test_provider_discovery() {
        let provider = MockProvider::new("mock", true)
            .with_tool("tool_a")
            .with_tool("tool_b");

        assert!(provider.is_available().await);

        let tools = provider.discover_tools().await.unwrap();
        assert_eq!(tools.len(), 2);
        assert!(tools.iter().any(|t| t.name == "tool_a"));
    }

    #[tokio::test]
    async fn test_provider_not_available() {
        let provider = MockProvider::new("mock", false);

        assert!(!provider.is_available().await);
        assert!(provider.discover_tools().await.is_err());
    }

    #[tokio::test]
    async fn test_provider_execute() {
        let provider = MockProvider::new("mock", true).with_tool("tool_a");

        let call = ToolCall::new("tool_a");
        let result = provider.execute(&call).await;
        assert!(result.is_success());

        let call = ToolCall::new("unknown");
        let result = provider.execute(&call).await;
        assert!(!result.is_success());
    }
}
