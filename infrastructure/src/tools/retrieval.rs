//! Retrieval tool provider
//!
//! Exposes the retrieval backend as the in-process `search_passages` tool.

use std::sync::Arc;

use async_trait::async_trait;

use callsheet_application::ports::retrieval::RetrievalPort;
use callsheet_domain::tool::entities::{ParamType, ToolCall, ToolDefinition, ToolParameter};
use callsheet_domain::tool::provider::{ProviderError, ToolProvider};
use callsheet_domain::tool::value_objects::{ToolError, ToolResult};

pub const SEARCH_TOOL: &str = "search_passages";

/// In-process provider backed by the retrieval collaborator.
pub struct RetrievalToolProvider {
    backend: Arc<dyn RetrievalPort>,
    min_score: f64,
    max_results: usize,
}

impl RetrievalToolProvider {
    pub fn new(backend: Arc<dyn RetrievalPort>, min_score: f64, max_results: usize) -> Self {
        Self {
            backend,
            min_score,
            max_results,
        }
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            SEARCH_TOOL,
            "Search the knowledge base for passages relevant to a query. \
             Returns ranked excerpts with relevance scores.",
        )
        .with_parameter(ToolParameter::new("query", "The search query", true))
        .with_parameter(
            ToolParameter::new(
                "max_results",
                "Maximum number of passages to return",
                false,
            )
            .with_type(ParamType::Integer),
        )
    }
}

#[async_trait]
impl ToolProvider for RetrievalToolProvider {
    fn id(&self) -> &str {
        "retrieval"
    }

    fn display_name(&self) -> &str {
        "Knowledge base retrieval"
    }

    async fn discover_tools(&self) -> Result<Vec<ToolDefinition>, ProviderError> {
        Ok(vec![self.definition()])
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let query = match call.require_string("query") {
            Ok(query) => query,
            Err(message) => {
                return ToolResult::failure(&call.tool_name, ToolError::invalid_argument(message));
            }
        };
        let max_results = call
            .get_i64("max_results")
            .map(|n| n.max(1) as usize)
            .unwrap_or(self.max_results);

        match self.backend.search(query, self.min_score, max_results).await {
            Ok(passages) if passages.is_empty() => ToolResult::success(
                &call.tool_name,
                serde_json::json!("No relevant passages found."),
            ),
            Ok(passages) => {
                let formatted = passages
                    .iter()
                    .enumerate()
                    .map(|(i, p)| format!("{}. (score {:.2}) {}", i + 1, p.score, p.content))
                    .collect::<Vec<_>>()
                    .join("\n\n");
                ToolResult::success(&call.tool_name, serde_json::json!(formatted))
            }
            Err(e) => ToolResult::failure(&call.tool_name, ToolError::execution_failed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callsheet_application::ports::retrieval::{Passage, RetrievalError};

    struct StubRetrieval {
        passages: Vec<Passage>,
    }

    #[async_trait]
    impl RetrievalPort for StubRetrieval {
        async fn search(
            &self,
            _query: &str,
            min_score: f64,
            max_results: usize,
        ) -> Result<Vec<Passage>, RetrievalError> {
            Ok(self
                .passages
                .iter()
                .filter(|p| p.score >= min_score)
                .take(max_results)
                .cloned()
                .collect())
        }
    }

    fn provider_with(passages: Vec<Passage>) -> RetrievalToolProvider {
        RetrievalToolProvider::new(Arc::new(StubRetrieval { passages }), 0.4, 5)
    }

    #[tokio::test]
    async fn test_search_formats_ranked_passages() {
        let provider = provider_with(vec![Passage {
            content: "Meridian is a 1990 film directed by Curtis Clark.".into(),
            score: 0.92,
        }]);

        let call = ToolCall::new(SEARCH_TOOL).with_arg("query", "Curtis Clark");
        let result = provider.execute(&call).await;

        assert!(result.is_success());
        let text = result.render();
        assert!(text.contains("Meridian"));
        assert!(text.starts_with("1. (score 0.92)"));
    }

    #[tokio::test]
    async fn test_search_below_threshold_is_empty() {
        let provider = provider_with(vec![Passage {
            content: "Barely related".into(),
            score: 0.1,
        }]);

        let call = ToolCall::new(SEARCH_TOOL).with_arg("query", "anything");
        let result = provider.execute(&call).await;

        assert!(result.is_success());
        assert!(result.render().contains("No relevant passages"));
    }

    #[tokio::test]
    async fn test_missing_query_is_invalid_argument() {
        let provider = provider_with(vec![]);
        let result = provider.execute(&ToolCall::new(SEARCH_TOOL)).await;
        assert!(!result.is_success());
    }
}
