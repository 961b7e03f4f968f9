//! Tool dispatch: validate, gate on policy, invoke, record.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{canonical_name, RunContext};
use crate::domain::ports::ToolExecutor;
use crate::services::policy::PolicyEngine;
use crate::services::registry::ToolRegistry;
use crate::services::validator;

/// Policy-gated tool dispatcher.
///
/// Every invocation passes input validation and the policy engine before
/// reaching the tool. Successful executions count against daily quotas.
pub struct ToolRunner {
    registry: Arc<ToolRegistry>,
    policy: Arc<PolicyEngine>,
}

impl ToolRunner {
    pub fn new(registry: Arc<ToolRegistry>, policy: Arc<PolicyEngine>) -> Self {
        Self { registry, policy }
    }

    /// The policy engine gating this runner; approvals are resolved here.
    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    /// Execute a tool, optionally presenting a granted approval token.
    pub async fn execute(
        &self,
        ctx: &RunContext,
        tool_name: &str,
        input: &serde_json::Value,
        input_text: &str,
        approval_id: Option<Uuid>,
    ) -> AgentResult<serde_json::Value> {
        let start = Instant::now();
        let name = canonical_name(tool_name);

        let tool = self
            .registry
            .get(&name)
            .ok_or_else(|| AgentError::NotFound(format!("tool {name}")))?
            .clone();

        validator::validate_input(input, &tool.descriptor.def.parameters)?;

        // Quota applies on both the checked and the approved path.
        self.policy.check_quota(&name)?;
        if let Some(approval_id) = approval_id {
            if !self.policy.is_granted(approval_id) {
                return Err(AgentError::PermissionDenied(format!(
                    "approval {approval_id} is not granted"
                )));
            }
        } else {
            self.policy.check(&name, input)?;
        }

        let result = tool
            .handler
            .invoke(ctx, input, input_text)
            .await
            .map_err(|err| match err {
                AgentError::Cancelled => AgentError::Cancelled,
                other => AgentError::Transient(format!("tool {name} execution failed: {other}")),
            })?;

        if let Some(approval_id) = approval_id {
            self.policy.consume(approval_id)?;
        }
        self.policy.record_usage(&name);

        tracing::info!(
            trace_id = %ctx.trace_id,
            tool = %name,
            duration_ms = start.elapsed().as_millis() as u64,
            "tool executed"
        );
        Ok(result)
    }
}

#[async_trait]
impl ToolExecutor for ToolRunner {
    async fn execute(
        &self,
        ctx: &RunContext,
        tool_name: &str,
        args: &serde_json::Value,
        input_text: &str,
    ) -> AgentResult<serde_json::Value> {
        ToolRunner::execute(self, ctx, tool_name, args, input_text, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::domain::models::{PolicyConfig, ToolDef, ToolDescriptor};
    use crate::services::registry::FnToolHandler;

    fn runner(policy_config: PolicyConfig) -> ToolRunner {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDescriptor::builtin(ToolDef::new(
                    "echo",
                    "echoes input",
                    json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]}),
                )),
                Arc::new(FnToolHandler::new(|args: &serde_json::Value| {
                    Ok(args["text"].clone())
                })),
            )
            .unwrap();
        registry
            .register(
                ToolDescriptor::builtin(ToolDef::new("exec_command", "runs a command", json!({}))),
                Arc::new(FnToolHandler::new(|_: &serde_json::Value| Ok(json!("ran")))),
            )
            .unwrap();
        registry
            .register(
                ToolDescriptor::builtin(ToolDef::new("broken", "always fails", json!({}))),
                Arc::new(FnToolHandler::new(|_: &serde_json::Value| {
                    Err(AgentError::Internal("kaput".to_string()))
                })),
            )
            .unwrap();
        ToolRunner::new(
            Arc::new(registry),
            Arc::new(PolicyEngine::new(policy_config).unwrap()),
        )
    }

    fn allow_all() -> PolicyConfig {
        PolicyConfig {
            default_allow: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_not_found() {
        let runner = runner(allow_all());
        let err = runner
            .execute(&RunContext::default(), "ghost", &json!({}), "", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let runner = runner(allow_all());
        let err = runner
            .execute(&RunContext::default(), "echo", &json!({}), "", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_successful_dispatch() {
        let runner = runner(allow_all());
        let result = runner
            .execute(
                &RunContext::default(),
                "Echo",
                &json!({"text": "hi"}),
                "",
                None,
            )
            .await
            .unwrap();
        assert_eq!(result, json!("hi"));
    }

    #[tokio::test]
    async fn test_execution_error_wrapped_transient() {
        let runner = runner(allow_all());
        let err = runner
            .execute(&RunContext::default(), "broken", &json!({}), "", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Transient(_)));
        assert!(err.to_string().contains("kaput"));
    }

    #[tokio::test]
    async fn test_approval_flow_with_quota() {
        let mut limits = std::collections::HashMap::new();
        limits.insert("exec_command".to_string(), 1u32);
        let runner = runner(PolicyConfig {
            require_approval: vec!["exec_command".to_string()],
            daily_tool_limits: limits,
            ..Default::default()
        });
        let ctx = RunContext::default();

        // First execute: approval required, id carried on the error.
        let err = runner
            .execute(&ctx, "exec_command", &json!({}), "", None)
            .await
            .unwrap_err();
        let approval_id = err.approval_id().expect("approval id");

        // Not yet granted: same call with the id is denied.
        let err = runner
            .execute(&ctx, "exec_command", &json!({}), "", Some(approval_id))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::PermissionDenied(_)));

        // Grant, execute once: succeeds and consumes quota + approval.
        runner.policy.resolve(approval_id, true).unwrap();
        let result = runner
            .execute(&ctx, "exec_command", &json!({}), "", Some(approval_id))
            .await
            .unwrap();
        assert_eq!(result, json!("ran"));

        // Second execute with the same id: quota is exhausted.
        let err = runner
            .execute(&ctx, "exec_command", &json!({}), "", Some(approval_id))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_default_deny_without_policy_match() {
        let runner = runner(PolicyConfig::default());
        let err = runner
            .execute(
                &RunContext::default(),
                "echo",
                &json!({"text": "hi"}),
                "",
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::PermissionDenied(_)));
    }
}
