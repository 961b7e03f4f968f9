//! Goal planning via the model client.

use std::sync::Arc;

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{CognitiveContext, Plan, RunContext};
use crate::domain::ports::ModelClient;
use crate::services::parser::{self, ParseMode};

const SYSTEM_PROMPT: &str = "You are the planning stage of an autonomous agent. \
Break the goal into a short ordered list of concrete steps.";

const OUTPUT_FORMAT: &str = r#"Respond with a JSON array of steps:
[{"id": "step-1", "description": "..."}]
Output ONLY the JSON array, no other text."#;

/// Turns a goal plus context into an ordered plan.
pub struct Planner {
    model: Arc<dyn ModelClient>,
    retry_max: u32,
}

impl Planner {
    pub fn new(model: Arc<dyn ModelClient>, retry_max: u32) -> Self {
        Self { model, retry_max }
    }

    /// Produce a plan, retrying on parse failure up to the configured
    /// budget. Exhaustion surfaces `InvalidModelOutput`.
    pub async fn plan(
        &self,
        ctx: &RunContext,
        context: &CognitiveContext,
        goal: &str,
    ) -> AgentResult<Plan> {
        let prompt = build_plan_prompt(context, goal);
        let mut last_err = AgentError::InvalidModelOutput("planner produced no output".to_string());

        for attempt in 0..=self.retry_max {
            if ctx.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            let response = self.model.complete(ctx, &prompt).await?;
            match parser::parse_plan_steps(&response, ParseMode::Strict) {
                Ok(steps) if !steps.is_empty() => {
                    return Ok(Plan::new(response, steps));
                }
                Ok(_) => {
                    last_err =
                        AgentError::InvalidModelOutput("plan contained no steps".to_string());
                }
                Err(err) => {
                    tracing::warn!(
                        trace_id = %ctx.trace_id,
                        attempt,
                        error = %err,
                        "plan parse failed"
                    );
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }
}

/// Assemble the planning prompt from the context sections.
fn build_plan_prompt(context: &CognitiveContext, goal: &str) -> String {
    let mut prompt = String::from(SYSTEM_PROMPT);

    if !context.available_tools.is_empty() {
        prompt.push_str("\n\n## AVAILABLE TOOLS\n");
        for tool in &context.available_tools {
            prompt.push_str(&format!("- {}: {}\n", tool.def.name, tool.def.description));
        }
    }

    if !context.memories.is_empty() {
        prompt.push_str("\n## RELEVANT CONTEXT\n");
        for memory in &context.memories {
            prompt.push_str(&format!("- {memory}\n"));
        }
    }

    if !context.available_skills.is_empty() {
        prompt.push_str("\n## AVAILABLE SKILLS\n");
        prompt.push_str(&context.available_skills.join(", "));
        prompt.push('\n');
    }

    if let Some(skill_context) = &context.skill_context {
        prompt.push_str("\n## SKILL CONTEXT\n");
        prompt.push_str(skill_context);
        prompt.push('\n');
    }

    if !context.scratchpad.is_empty() {
        prompt.push_str("\n## PREVIOUS THOUGHTS\n");
        for entry in &context.scratchpad {
            prompt.push_str(&format!("- {entry}\n"));
        }
    }

    prompt.push_str(&format!("\n## GOAL\n{goal}\n\n{OUTPUT_FORMAT}"));
    prompt
}
