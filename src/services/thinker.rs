//! Next-action selection via tool-aware chat completion.

use std::sync::Arc;

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{Action, CognitiveContext, Message, RunContext, Thought, ToolDef};
use crate::domain::ports::ModelClient;

const INSTRUCTION: &str = "Decide the next action. Either call the tools you need, \
or reply with the final answer for the user.";

/// Decides the next action from the plan, context, and tool definitions.
pub struct Thinker {
    model: Arc<dyn ModelClient>,
}

impl Thinker {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    /// One deliberation step. Seeds the history with the goal when it is
    /// empty, then asks the model for content and tool calls.
    pub async fn think(
        &self,
        ctx: &RunContext,
        context: &mut CognitiveContext,
        goal: &str,
    ) -> AgentResult<Thought> {
        if ctx.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        if context.history.is_empty() {
            context.push_history(Message::user(goal));
        }

        let system = build_system_message(context);
        let mut messages = Vec::with_capacity(context.history.len() + 1);
        messages.push(Message::system(system));
        messages.extend(context.history.iter().cloned());

        let tools: Vec<ToolDef> = context
            .available_tools
            .iter()
            .map(|t| t.def.clone())
            .collect();

        let completion = self.model.chat_complete(ctx, &messages, &tools).await?;

        let action = if completion.tool_calls.is_empty() {
            Action::Answer {
                content: completion.content.clone(),
            }
        } else {
            Action::ToolCalls {
                calls: completion.tool_calls,
            }
        };

        Ok(Thought {
            content: completion.content,
            action,
        })
    }
}

fn build_system_message(context: &CognitiveContext) -> String {
    let mut system = String::from("You are an autonomous agent working toward a goal.\n");

    if let Some(plan) = &context.plan {
        system.push_str("\n## PLAN\n");
        system.push_str(&plan.summary());
        system.push('\n');
    }

    if !context.memories.is_empty() {
        system.push_str("\n## MEMORIES\n");
        for memory in &context.memories {
            system.push_str(&format!("- {memory}\n"));
        }
    }

    if !context.scratchpad.is_empty() {
        system.push_str("\n## NOTES SO FAR\n");
        for entry in &context.scratchpad {
            system.push_str(&format!("- {entry}\n"));
        }
    }

    if let Some(skill_context) = &context.skill_context {
        system.push_str("\n## SKILL CONTEXT\n");
        system.push_str(skill_context);
        system.push('\n');
    }

    system.push('\n');
    system.push_str(INSTRUCTION);
    system
}
