//! Tool executor port - consumed by the actor.

use async_trait::async_trait;

use crate::domain::errors::AgentResult;
use crate::domain::models::RunContext;

/// Dispatches a single tool invocation.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute `tool_name` with JSON `args` plus any free-form input text,
    /// returning the raw JSON result.
    async fn execute(
        &self,
        ctx: &RunContext,
        tool_name: &str,
        args: &serde_json::Value,
        input_text: &str,
    ) -> AgentResult<serde_json::Value>;
}
