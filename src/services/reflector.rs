//! Outcome analysis and loop control.

use std::sync::Arc;

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{Action, ExecutionResult, Reflection, RunContext};
use crate::domain::ports::ModelClient;
use crate::services::parser::{self, ParseMode};

const SYSTEM_PROMPT: &str = "You are the reflection stage of an autonomous agent. \
Judge the last action's outcome against the goal.";

const GUIDELINES: &str = r#"Respond with a JSON object:
{"analysis": "...", "next_action": "continue|retry|replan|stop", "new_memories": ["..."]}
Use "stop" when the goal is achieved or unachievable, "replan" when the plan no
longer fits, "retry" for a transient failure. Output ONLY the JSON object."#;

/// Analyses an action outcome and emits a control signal plus memory deltas.
pub struct Reflector {
    model: Arc<dyn ModelClient>,
    retry_max: u32,
}

impl Reflector {
    pub fn new(model: Arc<dyn ModelClient>, retry_max: u32) -> Self {
        Self { model, retry_max }
    }

    pub async fn reflect(
        &self,
        ctx: &RunContext,
        goal: &str,
        action: &Action,
        result: &ExecutionResult,
    ) -> AgentResult<Reflection> {
        let prompt = build_reflection_prompt(goal, action, result);
        let mut last_err =
            AgentError::InvalidModelOutput("reflector produced no output".to_string());

        for attempt in 0..=self.retry_max {
            if ctx.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            let response = self.model.complete(ctx, &prompt).await?;
            match parser::parse_reflection(&response, ParseMode::Strict) {
                Ok(reflection) => return Ok(reflection),
                Err(err) => {
                    tracing::warn!(
                        trace_id = %ctx.trace_id,
                        attempt,
                        error = %err,
                        "reflection parse failed"
                    );
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }
}

fn build_reflection_prompt(goal: &str, action: &Action, result: &ExecutionResult) -> String {
    let action_kind = match action {
        Action::ToolCalls { .. } => "Tool Execution",
        Action::Answer { .. } => "Answer User",
    };
    format!(
        "{SYSTEM_PROMPT}\n\n## GOAL\n{goal}\n\n## ACTION\n{action_kind}\n\n## RESULT\n{}\n\n{GUIDELINES}",
        result.output
    )
}
