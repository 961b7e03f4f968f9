//! Plans produced by the planner.

use serde::{Deserialize, Serialize};

/// Status of a single plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Completed,
    Failed,
}

impl Default for StepStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// One high-level intended action. Descriptive only; steps are not
/// mechanically executed one by one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub status: StepStatus,
}

impl PlanStep {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            status: StepStatus::Pending,
        }
    }
}

/// A plan: the raw model text plus the normalised step list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub raw: String,
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new(raw: impl Into<String>, steps: Vec<PlanStep>) -> Self {
        Self {
            raw: raw.into(),
            steps,
        }
    }

    /// One-line-per-step summary used when assembling prompts.
    pub fn summary(&self) -> String {
        self.steps
            .iter()
            .map(|s| format!("{}. {}", s.id, s.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_summary() {
        let plan = Plan::new(
            "raw",
            vec![
                PlanStep::new("step-1", "Look up the weather"),
                PlanStep::new("step-2", "Answer the user"),
            ],
        );
        let summary = plan.summary();
        assert!(summary.contains("step-1. Look up the weather"));
        assert!(summary.contains("step-2. Answer the user"));
    }

    #[test]
    fn test_step_status_default() {
        let step: PlanStep = serde_json::from_str(r#"{"id":"1","description":"x"}"#).unwrap();
        assert_eq!(step.status, StepStatus::Pending);
    }
}
