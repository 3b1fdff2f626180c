//! Conversation entities
//!
//! A [`Conversation`] is the ordered transcript of one orchestration run:
//! user input, assistant turns, and tool results. It is append-only and
//! owned exclusively by the orchestration loop — nothing else mutates it,
//! which is what makes the transcript deterministic even when tool calls
//! execute concurrently.

use serde::{Deserialize, Serialize};

use crate::tool::entities::ToolCall;
use crate::tool::value_objects::ToolResult;

/// One entry in the transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    /// A user message.
    User { content: String },
    /// An assistant turn: a final answer, or tool-call requests with an
    /// optional text preamble.
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// Results for the tool calls of the preceding assistant turn, in the
    /// order the calls were issued.
    ToolResults { results: Vec<ToolResult> },
}

/// What the reasoning backend decided: a final answer XOR tool calls.
#[derive(Debug, Clone)]
pub enum Directive {
    /// The backend is done; the text is the answer.
    FinalAnswer(String),
    /// The backend wants tools invoked before it can answer. `content`
    /// carries any text it emitted alongside the requests.
    ToolCalls {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
}

/// Append-only transcript of one orchestration run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::User {
            content: content.into(),
        });
    }

    /// Append an assistant turn carrying a final answer.
    pub fn push_answer(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        });
    }

    /// Append an assistant turn requesting tool calls.
    pub fn push_tool_calls(&mut self, content: Option<String>, calls: Vec<ToolCall>) {
        self.turns.push(Turn::Assistant {
            content,
            tool_calls: calls,
        });
    }

    /// Append the results for the preceding assistant turn's tool calls.
    ///
    /// Callers must pass results in the order the calls were issued.
    pub fn push_tool_results(&mut self, results: Vec<ToolResult>) {
        self.turns.push(Turn::ToolResults { results });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The most recent assistant text, if any — the best partial answer an
    /// aborted run can report.
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.turns.iter().rev().find_map(|turn| match turn {
            Turn::Assistant {
                content: Some(text),
                ..
            } if !text.is_empty() => Some(text.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::value_objects::{ToolError, ToolResult};

    #[test]
    fn test_transcript_ordering() {
        let mut conversation = Conversation::new();
        conversation.push_user("which film is directed by Curtis Clark");
        conversation.push_tool_calls(
            None,
            vec![ToolCall::new("search_passages").with_arg("query", "Curtis Clark")],
        );
        conversation.push_tool_results(vec![ToolResult::success(
            "search_passages",
            serde_json::json!("Meridian, directed by Curtis Clark"),
        )]);
        conversation.push_answer("Curtis Clark directed Meridian.");

        assert_eq!(conversation.len(), 4);
        assert!(matches!(conversation.turns()[0], Turn::User { .. }));
        assert!(matches!(conversation.turns()[2], Turn::ToolResults { .. }));
        assert_eq!(
            conversation.last_assistant_text(),
            Some("Curtis Clark directed Meridian.")
        );
    }

    #[test]
    fn test_last_assistant_text_skips_tool_call_turns() {
        let mut conversation = Conversation::new();
        conversation.push_user("hello");
        conversation.push_tool_calls(None, vec![ToolCall::new("search_passages")]);
        conversation.push_tool_results(vec![ToolResult::failure(
            "search_passages",
            ToolError::timeout("search_passages"),
        )]);

        assert_eq!(conversation.last_assistant_text(), None);
    }

    #[test]
    fn test_turn_serialization_roles() {
        let mut conversation = Conversation::new();
        conversation.push_user("hi");
        conversation.push_answer("hello");

        let json = serde_json::to_value(&conversation).unwrap();
        assert_eq!(json["turns"][0]["role"], "user");
        assert_eq!(json["turns"][1]["role"], "assistant");
    }
}
