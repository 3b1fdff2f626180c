//! Tool Executor port
//!
//! Defines the interface the orchestration loop uses to advertise and
//! dispatch tools.

use async_trait::async_trait;
use callsheet_domain::tool::entities::{ToolCall, ToolDefinition};
use callsheet_domain::tool::value_objects::ToolResult;

/// Port for tool dispatch
///
/// The contract: `dispatch` returns exactly one [`ToolResult`] per call and
/// **never errors** — unknown tools, invalid arguments, and execution
/// faults all come back as `Failure` outcomes, so the reasoning backend can
/// self-correct on its next turn instead of the run crashing.
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// The advertised tool set, in registration order.
    fn tools(&self) -> Vec<ToolDefinition>;

    /// Check if a tool is available
    fn has_tool(&self, name: &str) -> bool {
        self.tools().iter().any(|t| t.name == name)
    }

    /// Dispatch a tool call and return its result.
    async fn dispatch(&self, call: &ToolCall) -> ToolResult;
}
