//! Channel-backed tool provider
//!
//! Adapts a [`ChannelSession`] to the [`ToolProvider`] trait so tools
//! hosted by an out-of-process server plug into the registry next to
//! in-process ones. Channel faults never escape as errors — they are
//! mapped into `Failure` outcomes like every other tool failure.

use std::sync::Arc;

use async_trait::async_trait;

use callsheet_domain::tool::entities::{ToolCall, ToolDefinition};
use callsheet_domain::tool::provider::{ProviderError, ToolProvider};
use callsheet_domain::tool::value_objects::{ToolError, ToolErrorKind, ToolResult};

use super::config::ChannelConfig;
use super::error::ChannelError;
use super::session::{CallReply, ChannelSession};

/// Tool provider backed by one subprocess tool server.
pub struct ChannelToolProvider {
    id: String,
    session: Arc<ChannelSession>,
}

impl ChannelToolProvider {
    /// Spawn the configured tool server and wrap it as a provider.
    pub async fn connect(config: ChannelConfig) -> Result<Self, ChannelError> {
        let id = format!("channel:{}", config.name);
        let session = ChannelSession::connect(config).await?;
        Ok(Self {
            id,
            session: Arc::new(session),
        })
    }

    /// The underlying session, for lifecycle management (shutdown).
    pub fn session(&self) -> &Arc<ChannelSession> {
        &self.session
    }
}

#[async_trait]
impl ToolProvider for ChannelToolProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        self.session.name()
    }

    async fn is_available(&self) -> bool {
        !self.session.is_shut_down()
    }

    async fn discover_tools(&self) -> Result<Vec<ToolDefinition>, ProviderError> {
        // The catalog was captured at handshake; it is immutable for the
        // session's lifetime.
        Ok(self.session.catalog().to_vec())
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        match self.session.call(&call.tool_name, &call.arguments).await {
            Ok(CallReply::Value(value)) => ToolResult::success(&call.tool_name, value),
            Ok(CallReply::ToolFault { kind, message }) => {
                ToolResult::failure(&call.tool_name, map_fault(&kind, message))
            }
            Err(ChannelError::CallTimeout { tool, .. }) => {
                ToolResult::failure(&call.tool_name, ToolError::timeout(tool))
            }
            Err(ChannelError::Closed) => ToolResult::failure(
                &call.tool_name,
                ToolError::channel_closed(self.session.name()),
            ),
            Err(e) => ToolResult::failure(&call.tool_name, ToolError::execution_failed(e.to_string())),
        }
    }
}

/// Map a structured fault reported by the tool server onto the domain
/// error kinds. Unrecognized kinds degrade to `ExecutionFailed` with the
/// original kind preserved in the details.
fn map_fault(kind: &str, message: String) -> ToolError {
    let mapped = match kind {
        "unknown_tool" => ToolErrorKind::UnknownTool,
        "invalid_argument" => ToolErrorKind::InvalidArgument,
        "timeout" => ToolErrorKind::Timeout,
        _ => ToolErrorKind::ExecutionFailed,
    };
    let error = ToolError::new(mapped, message);
    if mapped == ToolErrorKind::ExecutionFailed && kind != "execution_failed" {
        error.with_details(format!("server error kind `{}`", kind))
    } else {
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_fault_known_kinds() {
        assert_eq!(
            map_fault("unknown_tool", "x".into()).kind,
            ToolErrorKind::UnknownTool
        );
        assert_eq!(
            map_fault("invalid_argument", "x".into()).kind,
            ToolErrorKind::InvalidArgument
        );
        assert_eq!(map_fault("timeout", "x".into()).kind, ToolErrorKind::Timeout);
    }

    #[test]
    fn test_map_fault_preserves_unknown_kind_in_details() {
        let error = map_fault("quota_exceeded", "too many requests".into());
        assert_eq!(error.kind, ToolErrorKind::ExecutionFailed);
        assert!(error.details.unwrap().contains("quota_exceeded"));
    }
}
