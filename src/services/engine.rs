//! The cognitive loop: plan, then think / act / reflect until an answer.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::errors::AgentError;
use crate::domain::models::{
    Action, CognitiveContext, ControlSignal, EngineConfig, Message, RunContext,
};
use crate::domain::ports::{MemoryManager, ModelClient, ToolExecutor};
use crate::services::actor::Actor;
use crate::services::planner::Planner;
use crate::services::reflector::Reflector;
use crate::services::thinker::Thinker;

/// Callers seed the run context through these hooks, typically copying in
/// session state and tool definitions.
pub type ContextInit = Box<dyn FnOnce(&mut CognitiveContext) + Send>;

/// Successful engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutcome {
    pub content: String,
    pub turns: u32,
}

/// Engine failure classes.
///
/// Fatal covers planning and acting; logic covers thinking. Reflection and
/// memory-persistence failures are absorbed and logged, never surfaced.
#[derive(Debug, Clone, Error)]
pub enum CognitiveError {
    #[error("fatal: {0}")]
    Fatal(#[source] AgentError),

    #[error("logic: {0}")]
    Logic(#[source] AgentError),

    #[error("max turns reached after {turns} turns")]
    MaxTurnsReached { turns: u32 },

    #[error("cancelled")]
    Cancelled,
}

impl From<CognitiveError> for AgentError {
    fn from(err: CognitiveError) -> Self {
        match err {
            CognitiveError::Fatal(cause) | CognitiveError::Logic(cause) => cause,
            CognitiveError::MaxTurnsReached { turns } => AgentError::MaxTurnsReached { turns },
            CognitiveError::Cancelled => AgentError::Cancelled,
        }
    }
}

impl CognitiveError {
    fn fatal(err: AgentError) -> Self {
        match err {
            AgentError::Cancelled => Self::Cancelled,
            other => Self::Fatal(other),
        }
    }

    fn logic(err: AgentError) -> Self {
        match err {
            AgentError::Cancelled => Self::Cancelled,
            other => Self::Logic(other),
        }
    }
}

/// Runs the deliberation loop for a single goal.
pub struct CognitiveEngine {
    planner: Planner,
    thinker: Thinker,
    actor: Actor,
    reflector: Reflector,
    memory: Arc<dyn MemoryManager>,
    config: EngineConfig,
}

impl CognitiveEngine {
    pub fn new(
        model: Arc<dyn ModelClient>,
        executor: Arc<dyn ToolExecutor>,
        memory: Arc<dyn MemoryManager>,
        config: EngineConfig,
    ) -> Self {
        Self {
            planner: Planner::new(model.clone(), config.structured_retry_max),
            thinker: Thinker::new(model.clone()),
            actor: Actor::new(executor),
            reflector: Reflector::new(model, config.structured_retry_max),
            memory,
            config,
        }
    }

    /// Run the loop to completion, an answer, a stop signal, or the turn
    /// budget.
    pub async fn run(
        &self,
        ctx: &RunContext,
        goal: &str,
        inits: Vec<ContextInit>,
    ) -> Result<EngineOutcome, CognitiveError> {
        let mut context = CognitiveContext::new(ctx.session_id.clone(), "default");
        for init in inits {
            init(&mut context);
        }
        // The budget is the engine's to enforce, whatever the seed set.
        context.token_budget = self.config.token_budget;
        context.prune();

        // Retrieval failures never block a run.
        match self.memory.retrieve(ctx, goal).await {
            Ok(facts) => context.extend_memories(facts),
            Err(err) => {
                tracing::warn!(trace_id = %ctx.trace_id, error = %err, "memory retrieval failed");
            }
        }

        let plan = self
            .planner
            .plan(ctx, &context, goal)
            .await
            .map_err(CognitiveError::fatal)?;
        context.set_plan(plan);

        for turn in 0..self.config.max_turns {
            if ctx.is_cancelled() {
                return Err(CognitiveError::Cancelled);
            }

            let thought = self
                .thinker
                .think(ctx, &mut context, goal)
                .await
                .map_err(CognitiveError::logic)?;

            let assistant = match &thought.action {
                Action::ToolCalls { calls } => {
                    Message::assistant_with_calls(thought.content.clone(), calls.clone())
                }
                Action::Answer { .. } => Message::assistant(thought.content.clone()),
            };
            context.push_history(assistant);

            if thought.is_final_answer() {
                return Ok(EngineOutcome {
                    content: thought.content,
                    turns: turn + 1,
                });
            }

            let result = self
                .actor
                .act(ctx, &thought)
                .await
                .map_err(CognitiveError::fatal)?;

            for output in &result.tool_outputs {
                context.push_history(Message::tool(output.call_id.clone(), output.output.clone()));
            }

            let reflection = match self
                .reflector
                .reflect(ctx, goal, &thought.action, &result)
                .await
            {
                Ok(reflection) => reflection,
                Err(err) => {
                    tracing::warn!(
                        trace_id = %ctx.trace_id,
                        turn,
                        error = %err,
                        "reflection failed, continuing"
                    );
                    continue;
                }
            };

            context.apply_reflection(&reflection);
            self.persist_memories(ctx, &reflection.new_memories);

            match reflection.signal {
                // Retry consumes a turn; the loop variable is never wound
                // back, so the run always terminates.
                ControlSignal::Continue | ControlSignal::Retry => {}
                ControlSignal::Replan => match self.planner.plan(ctx, &context, goal).await {
                    Ok(plan) => context.set_plan(plan),
                    Err(err) => {
                        tracing::warn!(
                            trace_id = %ctx.trace_id,
                            turn,
                            error = %err,
                            "replan failed, keeping current plan"
                        );
                    }
                },
                ControlSignal::Stop => {
                    return Ok(EngineOutcome {
                        content: format!("Stopped by reflector: {}", reflection.analysis),
                        turns: turn + 1,
                    });
                }
            }
        }

        Err(CognitiveError::MaxTurnsReached {
            turns: self.config.max_turns,
        })
    }

    /// Fire-and-forget memory persistence; failures are logged only.
    fn persist_memories(&self, ctx: &RunContext, facts: &[String]) {
        if facts.is_empty() {
            return;
        }
        let memory = self.memory.clone();
        let ctx = ctx.clone();
        let facts = facts.to_vec();
        tokio::spawn(async move {
            for fact in facts {
                if let Err(err) = memory.remember(&ctx, &fact).await {
                    tracing::warn!(
                        trace_id = %ctx.trace_id,
                        error = %err,
                        "memory persistence failed"
                    );
                }
            }
        });
    }
}
