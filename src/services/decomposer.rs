//! Goal decomposition into a sub-task DAG.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::models::{RunContext, SubTask};
use crate::domain::ports::ModelClient;
use crate::services::parser::{self, ParseMode};

const SYSTEM_PROMPT: &str = "You are the decomposition stage of an autonomous agent. \
Split the goal into independent sub-tasks with explicit dependencies.";

const REQUIREMENTS: &str = r#"Respond with a JSON array of sub-tasks:
[{"id": "a", "description": "...", "priority": 1, "dependencies": []}]
Dependencies may only reference sibling ids and must form no cycles.
Output ONLY the JSON array, no other text."#;

/// Classifies goals and asks the model for a sub-task DAG.
pub struct Decomposer {
    model: Arc<dyn ModelClient>,
    word_threshold: usize,
    retry_max: u32,
}

impl Decomposer {
    pub fn new(model: Arc<dyn ModelClient>, word_threshold: usize, retry_max: u32) -> Self {
        Self {
            model,
            word_threshold,
            retry_max,
        }
    }

    /// A goal is complex when its word count exceeds the threshold.
    pub fn is_complex(&self, goal: &str) -> bool {
        goal.split_whitespace().count() > self.word_threshold
    }

    /// Decompose a complex goal. Never fails: after the retry budget is
    /// exhausted the goal itself becomes a single sub-task.
    pub async fn decompose(&self, ctx: &RunContext, goal: &str) -> Vec<SubTask> {
        let prompt = format!("{SYSTEM_PROMPT}\n\n## GOAL\n{goal}\n\n{REQUIREMENTS}");

        for attempt in 0..=self.retry_max {
            if ctx.is_cancelled() {
                break;
            }
            let response = match self.model.complete(ctx, &prompt).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(
                        trace_id = %ctx.trace_id,
                        attempt,
                        error = %err,
                        "decomposition completion failed"
                    );
                    continue;
                }
            };
            match parser::parse_sub_tasks(&response, ParseMode::Strict) {
                Ok(tasks) if !tasks.is_empty() => return sanitize(tasks),
                Ok(_) => {
                    tracing::warn!(trace_id = %ctx.trace_id, attempt, "empty decomposition");
                }
                Err(err) => {
                    tracing::warn!(
                        trace_id = %ctx.trace_id,
                        attempt,
                        error = %err,
                        "decomposition parse failed"
                    );
                }
            }
        }

        vec![SubTask::new("task-1", goal)]
    }
}

/// Drop dependency references that do not resolve to a sibling id.
fn sanitize(mut tasks: Vec<SubTask>) -> Vec<SubTask> {
    let ids: HashSet<String> = tasks.iter().map(|t| t.id.clone()).collect();
    for task in &mut tasks {
        task.dependencies.retain(|dep| {
            let known = ids.contains(dep);
            if !known {
                tracing::debug!(task = %task.id, dependency = %dep, "dropping unknown dependency");
            }
            known
        });
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::model::MockModelClient;

    #[test]
    fn test_complexity_threshold() {
        let model = Arc::new(MockModelClient::new());
        let decomposer = Decomposer::new(model, 5, 1);
        assert!(!decomposer.is_complex("short goal"));
        assert!(!decomposer.is_complex("one two three four five"));
        assert!(decomposer.is_complex("one two three four five six"));
    }

    #[tokio::test]
    async fn test_decompose_success() {
        let model = Arc::new(MockModelClient::completing(vec![r#"[
            {"id": "a", "description": "first"},
            {"id": "b", "description": "second"},
            {"id": "c", "description": "third", "dependencies": ["a", "b"]}
        ]"#
        .to_string()]));
        let decomposer = Decomposer::new(model, 5, 1);
        let tasks = decomposer.decompose(&RunContext::default(), "goal").await;
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[2].dependencies, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_decompose_fallback_after_retries() {
        let model = Arc::new(MockModelClient::completing(vec![
            "nonsense".to_string(),
            "more nonsense".to_string(),
        ]));
        let decomposer = Decomposer::new(model.clone(), 5, 1);
        let tasks = decomposer
            .decompose(&RunContext::default(), "the goal text")
            .await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "task-1");
        assert_eq!(tasks[0].description, "the goal text");
        assert_eq!(tasks[0].priority, 1);
        assert_eq!(model.complete_calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_dependencies_dropped() {
        let model = Arc::new(MockModelClient::completing(vec![
            r#"[{"id": "a", "description": "x", "dependencies": ["ghost"]}]"#.to_string(),
        ]));
        let decomposer = Decomposer::new(model, 5, 0);
        let tasks = decomposer.decompose(&RunContext::default(), "goal").await;
        assert!(tasks[0].dependencies.is_empty());
    }
}
