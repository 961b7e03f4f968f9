//! Actions, thoughts, and execution results.

use serde::{Deserialize, Serialize};

use super::message::ToolCall;

/// The thinker's decision for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Invoke one or more tools, in the order the model emitted them.
    ToolCalls { calls: Vec<ToolCall> },
    /// Produce the final answer and end the run.
    Answer { content: String },
}

impl Action {
    pub fn is_answer(&self) -> bool {
        matches!(self, Self::Answer { .. })
    }
}

/// The thinker's emitted reasoning plus the chosen action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thought {
    pub content: String,
    pub action: Action,
}

impl Thought {
    /// Whether this thought terminates the run.
    pub fn is_final_answer(&self) -> bool {
        self.action.is_answer()
    }
}

/// Output of one tool invocation within an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub call_id: String,
    pub name: String,
    pub output: String,
}

/// Result of executing an action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    /// Newline-joined per-call output lines.
    pub output: String,
    #[serde(default)]
    pub tool_outputs: Vec<ToolOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn answered(content: impl Into<String>) -> Self {
        Self {
            success: true,
            output: content.into(),
            tool_outputs: Vec::new(),
            error: None,
        }
    }
}
