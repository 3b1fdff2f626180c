//! Wire protocol for subprocess tool servers.
//!
//! Messages are newline-delimited JSON objects exchanged over the child's
//! stdin/stdout. Each message carries a `kind`, an optional correlation
//! `id`, and a kind-specific `payload`:
//!
//! | kind | direction | payload |
//! |------|-----------|---------|
//! | `list_tools` | parent → child (request, no id) | — |
//! | `list_tools` | child → parent (handshake reply) | `{tools: […]}` |
//! | `tool_call` | parent → child | `{name, arguments}` |
//! | `tool_result` | child → parent | `{value}` |
//! | `error` | child → parent | `{kind, message}` |
//!
//! The correlation id is present on everything except the initial
//! handshake exchange. The child's operating parameters (table names,
//! credentials, region) travel exclusively through environment variables
//! set at spawn time — never through this stream.

use callsheet_domain::tool::entities::ToolDefinition;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tool catalog payload of a handshake reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogPayload {
    pub tools: Vec<ToolDefinition>,
}

/// Payload of a `tool_call` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallPayload {
    pub name: String,
    #[serde(default)]
    pub arguments: HashMap<String, serde_json::Value>,
}

/// Payload of a `tool_result` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultPayload {
    pub value: serde_json::Value,
}

/// Payload of an `error` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: String,
    pub message: String,
}

/// Kind-specific body of a wire message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WireBody {
    ListTools {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<CatalogPayload>,
    },
    ToolCall {
        payload: CallPayload,
    },
    ToolResult {
        payload: ResultPayload,
    },
    Error {
        payload: ErrorPayload,
    },
}

impl WireBody {
    /// Kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            WireBody::ListTools { .. } => "list_tools",
            WireBody::ToolCall { .. } => "tool_call",
            WireBody::ToolResult { .. } => "tool_result",
            WireBody::Error { .. } => "error",
        }
    }
}

/// One framed protocol message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    /// Correlation id; absent only on the handshake exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub body: WireBody,
}

impl WireMessage {
    /// The parent's handshake request.
    pub fn list_tools_request() -> Self {
        Self {
            id: None,
            body: WireBody::ListTools { payload: None },
        }
    }

    /// The child's handshake reply carrying its catalog.
    pub fn catalog(id: Option<u64>, tools: Vec<ToolDefinition>) -> Self {
        Self {
            id,
            body: WireBody::ListTools {
                payload: Some(CatalogPayload { tools }),
            },
        }
    }

    /// A tool-call request.
    pub fn tool_call(
        id: u64,
        name: impl Into<String>,
        arguments: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: Some(id),
            body: WireBody::ToolCall {
                payload: CallPayload {
                    name: name.into(),
                    arguments,
                },
            },
        }
    }

    /// A successful tool response.
    pub fn tool_result(id: u64, value: serde_json::Value) -> Self {
        Self {
            id: Some(id),
            body: WireBody::ToolResult {
                payload: ResultPayload { value },
            },
        }
    }

    /// A structured error response.
    pub fn error(id: Option<u64>, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            body: WireBody::Error {
                payload: ErrorPayload {
                    kind: kind.into(),
                    message: message.into(),
                },
            },
        }
    }

    /// Encode as a single JSON line (without the trailing newline).
    ///
    /// `serde_json` never emits raw newlines, so the result is always one
    /// frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode one frame from a line.
    pub fn decode(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callsheet_domain::tool::entities::ToolParameter;

    #[test]
    fn handshake_request_has_no_id() {
        let frame = WireMessage::list_tools_request().encode().unwrap();
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["kind"], "list_tools");
        assert!(json.get("id").is_none());
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn catalog_round_trip() {
        let tools = vec![
            ToolDefinition::new("get_cast_info", "Look up cast details by id")
                .with_parameter(ToolParameter::new("cast_id", "Cast member id", true)),
        ];
        let frame = WireMessage::catalog(None, tools).encode().unwrap();
        let decoded = WireMessage::decode(&frame).unwrap();

        let WireBody::ListTools {
            payload: Some(catalog),
        } = decoded.body
        else {
            panic!("expected catalog body");
        };
        assert_eq!(catalog.tools.len(), 1);
        assert_eq!(catalog.tools[0].name, "get_cast_info");
        assert!(catalog.tools[0].parameters[0].required);
    }

    #[test]
    fn tool_call_carries_correlation_id() {
        let mut args = HashMap::new();
        args.insert("cast_id".to_string(), serde_json::json!("4kn3Xu8r"));
        let frame = WireMessage::tool_call(7, "get_cast_info", args)
            .encode()
            .unwrap();

        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["kind"], "tool_call");
        assert_eq!(json["payload"]["name"], "get_cast_info");
        assert_eq!(json["payload"]["arguments"]["cast_id"], "4kn3Xu8r");
    }

    #[test]
    fn result_and_error_round_trip() {
        let frame = WireMessage::tool_result(3, serde_json::json!({"rows": []}))
            .encode()
            .unwrap();
        let decoded = WireMessage::decode(&frame).unwrap();
        assert_eq!(decoded.id, Some(3));
        assert!(matches!(decoded.body, WireBody::ToolResult { .. }));

        let frame = WireMessage::error(Some(4), "unknown_tool", "no such tool")
            .encode()
            .unwrap();
        let decoded = WireMessage::decode(&frame).unwrap();
        let WireBody::Error { payload } = decoded.body else {
            panic!("expected error body");
        };
        assert_eq!(payload.kind, "unknown_tool");
        assert_eq!(payload.message, "no such tool");
    }

    #[test]
    fn decode_tolerates_surrounding_whitespace() {
        let decoded = WireMessage::decode("  {\"kind\":\"list_tools\"}\n").unwrap();
        assert!(matches!(
            decoded.body,
            WireBody::ListTools { payload: None }
        ));
    }

    #[test]
    fn encoded_frame_is_a_single_line() {
        let frame = WireMessage::tool_result(1, serde_json::json!("line one\nline two"))
            .encode()
            .unwrap();
        assert!(!frame.contains('\n'));
    }
}
