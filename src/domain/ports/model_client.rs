//! Model client port - interface for LLM providers.

use async_trait::async_trait;

use crate::domain::errors::AgentResult;
use crate::domain::models::{Message, RunContext, ToolCall, ToolDef};

/// A tool-aware chat completion returned by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatCompletion {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

/// Uniform completion contract over model providers.
///
/// Provider adapters live outside the core; the engine only ever sees
/// this trait.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Plain text completion for a single prompt.
    async fn complete(&self, ctx: &RunContext, prompt: &str) -> AgentResult<String>;

    /// Chat completion over a message list with tool definitions offered.
    async fn chat_complete(
        &self,
        ctx: &RunContext,
        messages: &[Message],
        tools: &[ToolDef],
    ) -> AgentResult<ChatCompletion>;
}
