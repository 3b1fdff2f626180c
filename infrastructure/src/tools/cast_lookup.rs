//! Cast lookup tool provider
//!
//! Exposes the key-value cast store as the in-process `get_cast_info`
//! tool. Matching rows are returned to the model unmodified.

use std::sync::Arc;

use async_trait::async_trait;

use callsheet_application::ports::cast_store::CastStorePort;
use callsheet_domain::tool::entities::{ToolCall, ToolDefinition, ToolParameter};
use callsheet_domain::tool::provider::{ProviderError, ToolProvider};
use callsheet_domain::tool::value_objects::{ToolError, ToolResult};

pub const CAST_INFO_TOOL: &str = "get_cast_info";

/// In-process provider backed by the cast store collaborator.
pub struct CastLookupToolProvider {
    store: Arc<dyn CastStorePort>,
}

impl CastLookupToolProvider {
    pub fn new(store: Arc<dyn CastStorePort>) -> Self {
        Self { store }
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            CAST_INFO_TOOL,
            format!(
                "Look up cast member details by cast id in the `{}` table. \
                 Returns the matching rows, or an empty list.",
                self.store.table()
            ),
        )
        .with_parameter(ToolParameter::new(
            "cast_id",
            "The cast member's partition key",
            true,
        ))
    }
}

#[async_trait]
impl ToolProvider for CastLookupToolProvider {
    fn id(&self) -> &str {
        "cast_lookup"
    }

    fn display_name(&self) -> &str {
        "Cast store lookup"
    }

    async fn discover_tools(&self) -> Result<Vec<ToolDefinition>, ProviderError> {
        Ok(vec![self.definition()])
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let cast_id = match call.require_string("cast_id") {
            Ok(cast_id) => cast_id,
            Err(message) => {
                return ToolResult::failure(&call.tool_name, ToolError::invalid_argument(message));
            }
        };

        match self.store.query_by_key(cast_id).await {
            // Rows pass through unmodified.
            Ok(rows) => ToolResult::success(
                &call.tool_name,
                serde_json::Value::Array(rows.into_iter().map(serde_json::Value::Object).collect()),
            ),
            // LookupError's Display names the table.
            Err(e) => ToolResult::failure(&call.tool_name, ToolError::execution_failed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callsheet_application::ports::cast_store::{LookupError, Row};

    struct StubStore {
        table: String,
        rows: Vec<Row>,
        fail: bool,
    }

    #[async_trait]
    impl CastStorePort for StubStore {
        fn table(&self) -> &str {
            &self.table
        }

        async fn query_by_key(&self, key: &str) -> Result<Vec<Row>, LookupError> {
            if self.fail {
                return Err(LookupError::Backend {
                    table: self.table.clone(),
                    reason: "backend offline".into(),
                });
            }
            Ok(self
                .rows
                .iter()
                .filter(|row| row.get("cast_id").and_then(|v| v.as_str()) == Some(key))
                .cloned()
                .collect())
        }
    }

    fn kilner_row() -> Row {
        let serde_json::Value::Object(row) = serde_json::json!({
            "cast_id": "4kn3Xu8r",
            "name": "Kevin Kilner",
            "role": "Dr. Stahlman",
        }) else {
            unreachable!()
        };
        row
    }

    fn provider(fail: bool) -> CastLookupToolProvider {
        CastLookupToolProvider::new(Arc::new(StubStore {
            table: "cast-info".into(),
            rows: vec![kilner_row()],
            fail,
        }))
    }

    #[tokio::test]
    async fn test_lookup_exposes_row_unmodified() {
        let call = ToolCall::new(CAST_INFO_TOOL).with_arg("cast_id", "4kn3Xu8r");
        let result = provider(false).execute(&call).await;

        assert!(result.is_success());
        let rows = result.value().unwrap().as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["cast_id"], "4kn3Xu8r");
        assert_eq!(rows[0]["name"], "Kevin Kilner");
        assert_eq!(rows[0]["role"], "Dr. Stahlman");
    }

    #[tokio::test]
    async fn test_lookup_miss_is_empty_list() {
        let call = ToolCall::new(CAST_INFO_TOOL).with_arg("cast_id", "nobody");
        let result = provider(false).execute(&call).await;

        assert!(result.is_success());
        assert!(result.value().unwrap().as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_names_the_table() {
        let call = ToolCall::new(CAST_INFO_TOOL).with_arg("cast_id", "4kn3Xu8r");
        let result = provider(true).execute(&call).await;

        assert!(!result.is_success());
        assert!(result.error().unwrap().message.contains("cast-info"));
    }

    #[tokio::test]
    async fn test_definition_names_the_table() {
        let tools = provider(false).discover_tools().await.unwrap();
        assert_eq!(tools[0].name, CAST_INFO_TOOL);
        assert!(tools[0].description.contains("cast-info"));
    }
}
