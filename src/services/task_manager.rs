//! Top-level goal entrypoint: route simple goals to one engine run,
//! complex goals through decomposition and the coordinator.

use std::sync::Arc;

use crate::domain::errors::AgentResult;
use crate::domain::models::{Role, RunContext, SubTaskResult};
use crate::domain::ports::SessionManager;
use crate::services::broker::ToolBroker;
use crate::services::coordinator::Coordinator;
use crate::services::decomposer::Decomposer;
use crate::services::engine::{CognitiveEngine, ContextInit};
use crate::services::registry::ToolRegistry;

/// Handles user goals end to end.
pub struct TaskManager {
    engine: Arc<CognitiveEngine>,
    decomposer: Decomposer,
    coordinator: Coordinator,
    registry: Arc<ToolRegistry>,
    broker: ToolBroker,
    session: Arc<dyn SessionManager>,
}

impl TaskManager {
    pub fn new(
        engine: Arc<CognitiveEngine>,
        decomposer: Decomposer,
        coordinator: Coordinator,
        registry: Arc<ToolRegistry>,
        broker: ToolBroker,
        session: Arc<dyn SessionManager>,
    ) -> Self {
        Self {
            engine,
            decomposer,
            coordinator,
            registry,
            broker,
            session,
        }
    }

    /// Run one goal for a session and return the user-facing reply.
    pub async fn handle(
        &self,
        ctx: &RunContext,
        session_id: &str,
        goal: &str,
    ) -> AgentResult<String> {
        self.session
            .append_interaction(ctx, session_id, Role::User, goal)
            .await?;

        let mut seed = self.session.get_context(ctx, session_id).await?;
        seed.available_tools = self.broker.select(goal, &self.registry.descriptors());

        let reply = if self.decomposer.is_complex(goal) {
            tracing::info!(trace_id = %ctx.trace_id, "complex goal, decomposing");
            let sub_tasks = self.decomposer.decompose(ctx, goal).await;
            let results = self.coordinator.execute_dag(ctx, &seed, &sub_tasks).await?;
            render_report(&results)
        } else {
            let init: ContextInit = Box::new(move |c| *c = seed);
            match self.engine.run(ctx, goal, vec![init]).await {
                Ok(outcome) => outcome.content,
                Err(err) => {
                    let message = err.to_string();
                    let _ = self
                        .session
                        .append_interaction(ctx, session_id, Role::Assistant, &message)
                        .await;
                    return Err(err.into());
                }
            }
        };

        self.session
            .append_interaction(ctx, session_id, Role::Assistant, &reply)
            .await?;
        Ok(reply)
    }
}

/// Aggregate sub-task results into the user-facing report.
fn render_report(results: &[SubTaskResult]) -> String {
    let mut report = String::from("Sub-task results:");
    for result in results {
        if result.success {
            report.push_str(&format!("\n- {}: completed: {}", result.id, result.output));
        } else {
            report.push_str(&format!(
                "\n- {}: failed: {}",
                result.id,
                result.error.as_deref().unwrap_or("unknown error")
            ));
        }
    }
    report
}
