//! Action execution.

use std::sync::Arc;

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{Action, ExecutionResult, RunContext, Thought, ToolOutput};
use crate::domain::ports::ToolExecutor;

/// Executes a thought's action through the tool executor.
///
/// Tool failures never abort the batch; the failure text becomes the
/// call's output so the reflector can observe it.
pub struct Actor {
    executor: Arc<dyn ToolExecutor>,
}

impl Actor {
    pub fn new(executor: Arc<dyn ToolExecutor>) -> Self {
        Self { executor }
    }

    pub async fn act(&self, ctx: &RunContext, thought: &Thought) -> AgentResult<ExecutionResult> {
        match &thought.action {
            Action::Answer { content } => Ok(ExecutionResult::answered(content.clone())),
            Action::ToolCalls { calls } => {
                if ctx.is_cancelled() {
                    return Err(AgentError::Cancelled);
                }
                let mut outputs = Vec::with_capacity(calls.len());
                let mut first_error = None;

                // Calls run sequentially, in the order the model emitted them.
                for call in calls {
                    let args = call.input_json();
                    let line = match self
                        .executor
                        .execute(ctx, &call.name, &args, &call.input)
                        .await
                    {
                        Ok(result) => render_result(&result),
                        Err(err) => {
                            let line = format!("Tool {} failed: {}", call.name, err);
                            if first_error.is_none() {
                                first_error = Some(err.to_string());
                            }
                            line
                        }
                    };
                    outputs.push(ToolOutput {
                        call_id: call.id.clone(),
                        name: call.name.clone(),
                        output: line,
                    });
                }

                let output = outputs
                    .iter()
                    .map(|o| o.output.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");

                Ok(ExecutionResult {
                    success: first_error.is_none(),
                    output,
                    tool_outputs: outputs,
                    error: first_error,
                })
            }
        }
    }
}

/// Render a tool's JSON result as a single output line.
fn render_result(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
