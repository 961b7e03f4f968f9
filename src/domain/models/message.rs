//! Conversation messages exchanged with the model.

use serde::{Deserialize, Serialize};

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A tool invocation emitted by the model.
///
/// `input` is the raw JSON argument text exactly as the model produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input: input.into(),
        }
    }

    /// Parse the input text as JSON, treating an empty input as `{}`.
    pub fn input_json(&self) -> serde_json::Value {
        if self.input.trim().is_empty() {
            return serde_json::json!({});
        }
        serde_json::from_str(&self.input).unwrap_or_else(|_| serde_json::json!({}))
    }
}

/// One message in a session history.
///
/// A `role = tool` message must carry the `tool_call_id` of the assistant
/// tool call it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    /// Assistant message carrying tool calls alongside any content.
    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_calls,
        }
    }

    /// Tool result message answering a previous assistant tool call.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Validate the tool-message invariant.
    pub fn validate(&self) -> Result<(), String> {
        if self.role == Role::Tool && self.tool_call_id.is_none() {
            return Err("tool message missing tool_call_id".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_message_requires_call_id() {
        let msg = Message {
            role: Role::Tool,
            content: "result".to_string(),
            tool_call_id: None,
            tool_calls: Vec::new(),
        };
        assert!(msg.validate().is_err());
        assert!(Message::tool("call-1", "result").validate().is_ok());
    }

    #[test]
    fn test_tool_call_input_json() {
        let call = ToolCall::new("1", "weather", r#"{"city":"Oslo"}"#);
        assert_eq!(call.input_json()["city"], "Oslo");

        let empty = ToolCall::new("2", "weather", "");
        assert_eq!(empty.input_json(), serde_json::json!({}));
    }

    #[test]
    fn test_message_serde_round_trip() {
        let msg = Message::assistant_with_calls(
            "checking",
            vec![ToolCall::new("c1", "weather", "{}")],
        );
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }
}
