//! Bounded-parallel execution of sub-task DAGs.
//!
//! Sub-tasks are resolved into deterministic topological batches, then run
//! batch by batch. Within a batch, concurrency is bounded by a semaphore.
//! A failed dependency fails its dependents without running them; outputs
//! of completed dependencies are injected into the dependent's scratchpad.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{Mutex, Semaphore};

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{
    validate_sub_tasks, CognitiveContext, CoordinatorConfig, RunContext, SubTask, SubTaskResult,
};
use crate::services::engine::CognitiveEngine;

/// Resolve a sub-task set into execution batches.
///
/// Deterministic Kahn's algorithm: each batch is the set of nodes whose
/// in-degree reached zero, sorted lexicographically by id. A cycle is
/// rejected before any execution happens.
pub fn resolve_execution_batches(tasks: &[SubTask]) -> AgentResult<Vec<Vec<String>>> {
    validate_sub_tasks(tasks).map_err(AgentError::InvalidInput)?;

    let mut indegree: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for task in tasks {
        indegree.entry(task.id.as_str()).or_insert(0);
        for dep in &task.dependencies {
            *indegree.entry(task.id.as_str()).or_insert(0) += 1;
            dependents
                .entry(dep.as_str())
                .or_default()
                .push(task.id.as_str());
        }
    }

    let mut batches: Vec<Vec<String>> = Vec::new();
    let mut emitted = 0usize;
    let mut ready: Vec<&str> = indegree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&id, _)| id)
        .collect();

    while !ready.is_empty() {
        ready.sort_unstable();
        let batch = ready.clone();
        emitted += batch.len();

        let mut next: Vec<&str> = Vec::new();
        for id in &batch {
            if let Some(children) = dependents.get(id) {
                for &child in children {
                    let degree = indegree
                        .get_mut(child)
                        .ok_or_else(|| AgentError::Internal("indegree missing node".to_string()))?;
                    *degree -= 1;
                    if *degree == 0 {
                        next.push(child);
                    }
                }
            }
        }

        batches.push(batch.into_iter().map(ToString::to_string).collect());
        ready = next;
    }

    if emitted != tasks.len() {
        return Err(AgentError::InvalidInput(
            "cycle detected in sub-task dependencies".to_string(),
        ));
    }
    Ok(batches)
}

/// Runs sub-task DAGs, each sub-task on its own engine run.
pub struct Coordinator {
    engine: Arc<CognitiveEngine>,
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(engine: Arc<CognitiveEngine>, config: CoordinatorConfig) -> Self {
        Self { engine, config }
    }

    /// Execute a DAG of sub-tasks against a parent context.
    ///
    /// Returns one result per sub-task, sorted by id. Individual failures
    /// are recorded, never raised; only a malformed DAG is an error.
    pub async fn execute_dag(
        &self,
        ctx: &RunContext,
        parent: &CognitiveContext,
        tasks: &[SubTask],
    ) -> AgentResult<Vec<SubTaskResult>> {
        let batches = resolve_execution_batches(tasks)?;
        let by_id: HashMap<String, SubTask> =
            tasks.iter().map(|t| (t.id.clone(), t.clone())).collect();

        let results: Arc<Mutex<HashMap<String, SubTaskResult>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_sub_tasks.max(1)));

        for batch in batches {
            let mut handles = Vec::with_capacity(batch.len());

            for id in batch {
                let task = by_id
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| AgentError::Internal("batch references unknown id".to_string()))?;

                if ctx.is_cancelled() {
                    results.lock().await.insert(
                        id.clone(),
                        SubTaskResult::failed(id, AgentError::Cancelled.to_string()),
                    );
                    continue;
                }

                // Dependency-failure propagation: a failed upstream fails
                // this task without running it.
                let failed_dep = {
                    let results = results.lock().await;
                    task.dependencies
                        .iter()
                        .find(|dep| results.get(*dep).is_some_and(|r| !r.success))
                        .cloned()
                };
                if let Some(dep) = failed_dep {
                    results.lock().await.insert(
                        id.clone(),
                        SubTaskResult::failed(id, format!("dependency {dep} failed")),
                    );
                    continue;
                }

                let child_context = self.child_context(parent, &task, &*results.lock().await);
                let engine = self.engine.clone();
                let semaphore = semaphore.clone();
                let results = results.clone();
                let run_ctx = ctx.child();
                let retry_max = self.config.retry_max.max(1);
                let backoff = Duration::from_millis(self.config.retry_backoff_ms);

                handles.push(tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return;
                    };
                    let result =
                        run_sub_task(&engine, &run_ctx, &task, child_context, retry_max, backoff)
                            .await;
                    results.lock().await.insert(task.id.clone(), result);
                }));
            }

            // Batch barrier: every spawned sub-task finishes before the
            // next batch starts.
            for joined in join_all(handles).await {
                if let Err(err) = joined {
                    tracing::error!(error = %err, "sub-task join failed");
                }
            }
        }

        let results = Arc::try_unwrap(results)
            .map_err(|_| AgentError::Internal("sub-task results still shared".to_string()))?
            .into_inner();
        let mut ordered: Vec<SubTaskResult> = results.into_values().collect();
        ordered.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(ordered)
    }

    /// Build the child context for one sub-task: parent identity plus one
    /// scratchpad line per completed dependency.
    fn child_context(
        &self,
        parent: &CognitiveContext,
        task: &SubTask,
        results: &HashMap<String, SubTaskResult>,
    ) -> CognitiveContext {
        let mut child = parent.derive_child();
        for dep in &task.dependencies {
            if let Some(result) = results.get(dep) {
                if result.success {
                    child
                        .scratchpad
                        .push(format!("Dependency {} Output: {}", dep, result.output));
                }
            }
        }
        child.prune();
        child
    }
}

async fn run_sub_task(
    engine: &CognitiveEngine,
    ctx: &RunContext,
    task: &SubTask,
    child_context: CognitiveContext,
    retry_max: u32,
    backoff: Duration,
) -> SubTaskResult {
    let mut last_error = String::new();

    for attempt in 1..=retry_max {
        if ctx.is_cancelled() {
            return SubTaskResult::failed(task.id.clone(), AgentError::Cancelled.to_string());
        }
        if attempt > 1 {
            // Linear backoff between attempts.
            tokio::time::sleep(backoff * (attempt - 1)).await;
            tracing::info!(task = %task.id, attempt, "retrying sub-task");
        }

        let seed = child_context.clone();
        let init: crate::services::engine::ContextInit = Box::new(move |c| *c = seed);
        match engine.run(ctx, &task.description, vec![init]).await {
            Ok(outcome) => {
                return SubTaskResult::succeeded(task.id.clone(), outcome.content);
            }
            Err(err) => {
                tracing::warn!(task = %task.id, attempt, error = %err, "sub-task attempt failed");
                last_error = err.to_string();
            }
        }
    }

    SubTaskResult::failed(task.id.clone(), last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::model::MockModelClient;
    use crate::domain::errors::AgentResult;
    use crate::domain::models::EngineConfig;
    use crate::domain::ports::{ChatCompletion, NullMemoryManager, ToolExecutor};
    use async_trait::async_trait;

    struct NoopExecutor;

    #[async_trait]
    impl ToolExecutor for NoopExecutor {
        async fn execute(
            &self,
            _ctx: &RunContext,
            _tool_name: &str,
            _args: &serde_json::Value,
            _input_text: &str,
        ) -> AgentResult<serde_json::Value> {
            Ok(serde_json::json!({}))
        }
    }

    fn task(id: &str, deps: &[&str]) -> SubTask {
        SubTask::new(id, format!("describe {id}"))
            .with_dependencies(deps.iter().map(ToString::to_string).collect())
    }

    fn coordinator_with(model: Arc<MockModelClient>, max_parallel: usize) -> Coordinator {
        let engine = Arc::new(CognitiveEngine::new(
            model,
            Arc::new(NoopExecutor),
            Arc::new(NullMemoryManager),
            EngineConfig {
                max_turns: 3,
                token_budget: 0,
                structured_retry_max: 0,
            },
        ));
        Coordinator::new(
            engine,
            CoordinatorConfig {
                max_parallel_sub_tasks: max_parallel,
                retry_max: 1,
                retry_backoff_ms: 1,
                complexity_word_threshold: 25,
            },
        )
    }

    fn answering_model() -> Arc<MockModelClient> {
        Arc::new(MockModelClient::uniform(
            r#"[{"id":"1","description":"do it"}]"#,
            ChatCompletion {
                content: "done".to_string(),
                tool_calls: vec![],
            },
        ))
    }

    #[test]
    fn test_batches_deterministic() {
        let tasks = vec![
            task("c", &["a", "b"]),
            task("a", &[]),
            task("b", &[]),
            task("d", &["c"]),
        ];
        let first = resolve_execution_batches(&tasks).unwrap();
        let second = resolve_execution_batches(&tasks).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["c".to_string()],
                vec!["d".to_string()],
            ]
        );
    }

    #[test]
    fn test_cycle_rejected() {
        let tasks = vec![task("a", &["b"]), task("b", &["a"])];
        let err = resolve_execution_batches(&tasks).unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_execute_dag_runs_all() {
        let model = answering_model();
        let coordinator = coordinator_with(model, 2);
        let parent = CognitiveContext::new("s", "w");
        let tasks = vec![task("a", &[]), task("b", &[]), task("c", &["a", "b"])];

        let results = coordinator
            .execute_dag(&RunContext::default(), &parent, &tasks)
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.success));
        // Sorted by id.
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_dependency_outputs_injected() {
        let model = answering_model();
        let coordinator = coordinator_with(model.clone(), 1);
        let parent = CognitiveContext::new("s", "w");
        let tasks = vec![task("a", &[]), task("b", &[]), task("c", &["a", "b"])];

        coordinator
            .execute_dag(&RunContext::default(), &parent, &tasks)
            .await
            .unwrap();

        // c's planning prompt carries both dependency outputs.
        let prompts = model.complete_prompts();
        let c_prompt = prompts
            .iter()
            .find(|p| p.contains("describe c"))
            .expect("c was planned");
        assert!(c_prompt.contains("Dependency a Output: done"));
        assert!(c_prompt.contains("Dependency b Output: done"));
    }

    #[tokio::test]
    async fn test_dependency_failure_propagates() {
        // Planner output is never valid JSON, so every run fails fatally.
        let model = Arc::new(MockModelClient::uniform(
            "not a plan",
            ChatCompletion::default(),
        ));
        let coordinator = coordinator_with(model, 2);
        let parent = CognitiveContext::new("s", "w");
        let tasks = vec![task("a", &[]), task("b", &["a"])];

        let results = coordinator
            .execute_dag(&RunContext::default(), &parent, &tasks)
            .await
            .unwrap();
        let a = results.iter().find(|r| r.id == "a").unwrap();
        let b = results.iter().find(|r| r.id == "b").unwrap();
        assert!(!a.success);
        assert!(!b.success);
        assert_eq!(b.error.as_deref(), Some("dependency a failed"));
    }

    #[tokio::test]
    async fn test_cancelled_tasks_skipped() {
        let model = answering_model();
        let coordinator = coordinator_with(model, 2);
        let parent = CognitiveContext::new("s", "w");
        let ctx = RunContext::default();
        ctx.cancel();

        let results = coordinator
            .execute_dag(&ctx, &parent, &[task("a", &[])])
            .await
            .unwrap();
        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("Cancelled"));
    }
}
