//! Tool domain value objects — immutable result and error types
//!
//! These types form the output side of the tool pipeline. Every dispatched
//! tool call produces exactly one [`ToolResult`] whose [`ToolOutcome`] is
//! either a success value or a structured [`ToolError`].
//!
//! Error kinds drive recovery in the orchestration loop: `UnknownTool` and
//! `InvalidArgument` are model mistakes the reasoning backend can correct
//! on its next turn; `ExecutionFailed`, `Timeout` and `ChannelClosed` wrap
//! collaborator faults. None of them crash the loop.

use serde::{Deserialize, Serialize};

/// Kind of failure a tool dispatch can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// The requested tool name is not registered.
    UnknownTool,
    /// Arguments did not validate against the tool's declared schema.
    InvalidArgument,
    /// The tool ran and failed, or an underlying collaborator failed.
    ExecutionFailed,
    /// The call exceeded its configured timeout.
    Timeout,
    /// The owning channel is shut down or its process died mid-call.
    ChannelClosed,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            ToolErrorKind::UnknownTool => "unknown_tool",
            ToolErrorKind::InvalidArgument => "invalid_argument",
            ToolErrorKind::ExecutionFailed => "execution_failed",
            ToolErrorKind::Timeout => "timeout",
            ToolErrorKind::ChannelClosed => "channel_closed",
        }
    }
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error that occurred during tool dispatch or execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolError {
    /// Failure kind
    pub kind: ToolErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Common error constructors
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::new(
            ToolErrorKind::UnknownTool,
            format!("Unknown tool: {}", name.into()),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidArgument, message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::ExecutionFailed, message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            ToolErrorKind::Timeout,
            format!("Operation timed out: {}", operation.into()),
        )
    }

    pub fn channel_closed(server: impl Into<String>) -> Self {
        Self::new(
            ToolErrorKind::ChannelClosed,
            format!("Tool server channel closed: {}", server.into()),
        )
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Outcome of a tool execution: a success value or a structured failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { value: serde_json::Value },
    Failure { error: ToolError },
}

/// Result of one tool dispatch.
///
/// Produced exactly once per [`ToolCall`](super::entities::ToolCall) and
/// appended to the conversation so the reasoning backend can react.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Correlation id copied from the originating call, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    /// Name of the tool that was dispatched
    pub tool_name: String,
    /// Success value or failure
    pub outcome: ToolOutcome,
    /// Wall-clock duration of the dispatch in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(tool_name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            call_id: None,
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Success { value },
            duration_ms: None,
        }
    }

    /// Create a failed result
    pub fn failure(tool_name: impl Into<String>, error: ToolError) -> Self {
        Self {
            call_id: None,
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Failure { error },
            duration_ms: None,
        }
    }

    pub fn with_call_id(mut self, call_id: Option<String>) -> Self {
        self.call_id = call_id;
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success { .. })
    }

    /// Get the success value
    pub fn value(&self) -> Option<&serde_json::Value> {
        match &self.outcome {
            ToolOutcome::Success { value } => Some(value),
            ToolOutcome::Failure { .. } => None,
        }
    }

    /// Get the error
    pub fn error(&self) -> Option<&ToolError> {
        match &self.outcome {
            ToolOutcome::Success { .. } => None,
            ToolOutcome::Failure { error } => Some(error),
        }
    }

    /// Short outcome label for logging ("success" or the error kind).
    pub fn outcome_kind(&self) -> &str {
        match &self.outcome {
            ToolOutcome::Success { .. } => "success",
            ToolOutcome::Failure { error } => error.kind.as_str(),
        }
    }

    /// Render this result as text for the reasoning backend.
    ///
    /// String values pass through unquoted; other values are serialized as
    /// JSON. Failures render as `[kind] message` so the model can react.
    pub fn render(&self) -> String {
        match &self.outcome {
            ToolOutcome::Success { value } => match value {
                serde_json::Value::String(s) => s.clone(),
                other => serde_json::to_string(other).unwrap_or_else(|_| other.to_string()),
            },
            ToolOutcome::Failure { error } => error.to_string(),
        }
    }
}
