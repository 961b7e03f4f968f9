//! Sub-tasks produced by goal decomposition.
//!
//! Sub-tasks form a DAG over sibling ids; the coordinator resolves the
//! graph into execution batches.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// One node of a decomposed goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// Sibling ids this sub-task depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

const fn default_priority() -> u32 {
    1
}

impl SubTask {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            priority: 1,
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependencies(mut self, deps: Vec<String>) -> Self {
        self.dependencies = deps;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

/// Validate a sub-task set: unique ids, dependencies resolve within the
/// set, no self-loops. Cycle detection is the coordinator's job.
pub fn validate_sub_tasks(tasks: &[SubTask]) -> Result<(), String> {
    let mut ids = HashSet::new();
    for task in tasks {
        if !ids.insert(task.id.as_str()) {
            return Err(format!("duplicate sub-task id: {}", task.id));
        }
    }
    for task in tasks {
        for dep in &task.dependencies {
            if dep == &task.id {
                return Err(format!("sub-task {} depends on itself", task.id));
            }
            if !ids.contains(dep.as_str()) {
                return Err(format!(
                    "sub-task {} depends on unknown id: {}",
                    task.id, dep
                ));
            }
        }
    }
    Ok(())
}

/// Outcome of one sub-task run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubTaskResult {
    pub id: String,
    pub success: bool,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubTaskResult {
    pub fn succeeded(id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn failed(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            output: String::new(),
            error: Some(error.into()),
        }
    }
}
