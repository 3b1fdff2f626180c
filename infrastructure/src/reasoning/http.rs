//! HTTP reasoning gateway
//!
//! Implements [`ReasoningPort`] against an OpenAI-style chat-completions
//! endpoint. The conversation maps onto chat messages, the advertised tool
//! set onto function declarations, and the reply decodes into a
//! [`Directive`]: assistant content is a final answer, `tool_calls` are
//! tool-call requests. Malformed tool-call payloads surface as protocol
//! errors — they never propagate loosely-typed data into the dispatcher.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use callsheet_application::ports::reasoning::{ReasoningError, ReasoningPort};
use callsheet_domain::conversation::entities::{Conversation, Directive, Turn};
use callsheet_domain::tool::entities::{ToolCall, ToolDefinition};
use callsheet_domain::tool::value_objects::ToolResult;

/// Reasoning gateway speaking the OpenAI chat-completions wire format.
pub struct HttpReasoningGateway {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    system_prompt: Option<String>,
}

impl HttpReasoningGateway {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
            system_prompt: None,
        }
    }

    /// Set the bearer token sent with each request.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Set a system prompt prepended to every conversation.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

#[async_trait]
impl ReasoningPort for HttpReasoningGateway {
    async fn advance(
        &self,
        conversation: &Conversation,
        tools: &[ToolDefinition],
    ) -> Result<Directive, ReasoningError> {
        let mut messages = Vec::new();
        if let Some(prompt) = &self.system_prompt {
            messages.push(serde_json::json!({"role": "system", "content": prompt}));
        }
        messages.extend(messages_from(conversation));

        let message_count = messages.len();
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });
        if !tools.is_empty() {
            body["tools"] = serde_json::Value::Array(tools_payload(tools));
        }

        debug!(model = %self.model, messages = message_count, "requesting completion");

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ReasoningError::RequestFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| ReasoningError::RequestFailed(e.to_string()))?;

        let reply: ChatCompletionReply = response
            .json()
            .await
            .map_err(|e| ReasoningError::Protocol(e.to_string()))?;

        decode_reply(reply)
    }
}

/// Map the transcript onto chat-completion messages.
fn messages_from(conversation: &Conversation) -> Vec<serde_json::Value> {
    let mut messages = Vec::new();
    for turn in conversation.turns() {
        match turn {
            Turn::User { content } => {
                messages.push(serde_json::json!({"role": "user", "content": content}));
            }
            Turn::Assistant {
                content,
                tool_calls,
            } if tool_calls.is_empty() => {
                messages.push(serde_json::json!({
                    "role": "assistant",
                    "content": content.clone().unwrap_or_default(),
                }));
            }
            Turn::Assistant {
                content,
                tool_calls,
            } => {
                let calls: Vec<serde_json::Value> = tool_calls
                    .iter()
                    .enumerate()
                    .map(|(index, call)| {
                        serde_json::json!({
                            "id": call_wire_id(call, index),
                            "type": "function",
                            "function": {
                                "name": call.tool_name,
                                "arguments": serde_json::to_string(&call.arguments)
                                    .unwrap_or_else(|_| "{}".to_string()),
                            }
                        })
                    })
                    .collect();
                let mut message = serde_json::json!({"role": "assistant", "tool_calls": calls});
                if let Some(text) = content {
                    message["content"] = serde_json::json!(text);
                }
                messages.push(message);
            }
            Turn::ToolResults { results } => {
                // One tool message per result, in issue order; ids line up
                // with the preceding assistant turn because the transcript
                // preserves that order.
                for (index, result) in results.iter().enumerate() {
                    messages.push(serde_json::json!({
                        "role": "tool",
                        "tool_call_id": result_wire_id(result, index),
                        "content": result.render(),
                    }));
                }
            }
        }
    }
    messages
}

fn call_wire_id(call: &ToolCall, index: usize) -> String {
    call.call_id
        .clone()
        .unwrap_or_else(|| format!("call-{index}"))
}

fn result_wire_id(result: &ToolResult, index: usize) -> String {
    result
        .call_id
        .clone()
        .unwrap_or_else(|| format!("call-{index}"))
}

/// Advertise the tool set as function declarations.
fn tools_payload(tools: &[ToolDefinition]) -> Vec<serde_json::Value> {
    tools
        .iter()
        .map(|tool| {
            let schema = tool.to_schema_value();
            serde_json::json!({
                "type": "function",
                "function": {
                    "name": schema["name"],
                    "description": schema["description"],
                    "parameters": schema["input_schema"],
                }
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ChatCompletionReply {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ReplyToolCall>,
}

#[derive(Debug, Deserialize)]
struct ReplyToolCall {
    id: String,
    function: ReplyFunction,
}

#[derive(Debug, Deserialize)]
struct ReplyFunction {
    name: String,
    arguments: String,
}

/// Decode a completion into the final-answer XOR tool-calls directive.
fn decode_reply(reply: ChatCompletionReply) -> Result<Directive, ReasoningError> {
    let choice = reply
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ReasoningError::Protocol("no choices in completion".into()))?;
    let message = choice.message;

    if message.tool_calls.is_empty() {
        return Ok(Directive::FinalAnswer(message.content.unwrap_or_default()));
    }

    let mut calls = Vec::new();
    for tool_call in message.tool_calls {
        let arguments: HashMap<String, serde_json::Value> =
            if tool_call.function.arguments.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&tool_call.function.arguments).map_err(|e| {
                    ReasoningError::Protocol(format!(
                        "malformed arguments for `{}`: {}",
                        tool_call.function.name, e
                    ))
                })?
            };
        calls.push(ToolCall {
            call_id: Some(tool_call.id),
            tool_name: tool_call.function.name,
            arguments,
        });
    }

    Ok(Directive::ToolCalls {
        content: message.content,
        calls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply_from(value: serde_json::Value) -> ChatCompletionReply {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_decode_final_answer() {
        let reply = reply_from(serde_json::json!({
            "choices": [{"message": {"content": "Meridian."}}]
        }));

        let Directive::FinalAnswer(answer) = decode_reply(reply).unwrap() else {
            panic!("expected final answer");
        };
        assert_eq!(answer, "Meridian.");
    }

    #[test]
    fn test_decode_tool_calls() {
        let reply = reply_from(serde_json::json!({
            "choices": [{"message": {
                "content": null,
                "tool_calls": [{
                    "id": "call_abc",
                    "type": "function",
                    "function": {
                        "name": "get_cast_info",
                        "arguments": "{\"cast_id\": \"4kn3Xu8r\"}"
                    }
                }]
            }}]
        }));

        let Directive::ToolCalls { calls, .. } = decode_reply(reply).unwrap() else {
            panic!("expected tool calls");
        };
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, "get_cast_info");
        assert_eq!(calls[0].call_id.as_deref(), Some("call_abc"));
        assert_eq!(calls[0].get_string("cast_id"), Some("4kn3Xu8r"));
    }

    #[test]
    fn test_decode_malformed_arguments_is_protocol_error() {
        let reply = reply_from(serde_json::json!({
            "choices": [{"message": {
                "tool_calls": [{
                    "id": "call_abc",
                    "function": {"name": "get_cast_info", "arguments": "{not json"}
                }]
            }}]
        }));

        let err = decode_reply(reply).unwrap_err();
        assert!(matches!(err, ReasoningError::Protocol(_)));
    }

    #[test]
    fn test_decode_empty_choices_is_protocol_error() {
        let reply = reply_from(serde_json::json!({"choices": []}));
        assert!(matches!(
            decode_reply(reply),
            Err(ReasoningError::Protocol(_))
        ));
    }

    #[test]
    fn test_messages_from_transcript() {
        let mut conversation = Conversation::new();
        conversation.push_user("which film is directed by Curtis Clark");
        conversation.push_tool_calls(
            None,
            vec![
                ToolCall::new("search_passages")
                    .with_call_id("call_1")
                    .with_arg("query", "Curtis Clark"),
            ],
        );
        conversation.push_tool_results(vec![
            ToolResult::success("search_passages", serde_json::json!("Meridian"))
                .with_call_id(Some("call_1".into())),
        ]);

        let messages = messages_from(&conversation);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["tool_calls"][0]["id"], "call_1");
        assert_eq!(
            messages[1]["tool_calls"][0]["function"]["name"],
            "search_passages"
        );
        assert_eq!(messages[2]["role"], "tool");
        assert_eq!(messages[2]["tool_call_id"], "call_1");
        assert_eq!(messages[2]["content"], "Meridian");
    }

    #[test]
    fn test_tools_payload_shape() {
        let tools = vec![ToolDefinition::new("ping", "Liveness probe")];
        let payload = tools_payload(&tools);
        assert_eq!(payload[0]["type"], "function");
        assert_eq!(payload[0]["function"]["name"], "ping");
        assert_eq!(payload[0]["function"]["parameters"]["type"], "object");
    }
}
