//! Tool execution policy: allow/deny, approvals, and daily quotas.
//!
//! The engine is opt-in strict: a tool matching no rule is denied unless
//! `default_allow` is set. Granted approvals are single-use and count
//! against the daily quota once consumed.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use regex::Regex;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{canonical_name, PolicyConfig};

/// Status of an approval record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalStatus {
    Pending,
    Granted,
    Denied,
    Expired,
}

/// A single-use token lifting a policy denial for one execution.
#[derive(Debug, Clone)]
pub struct Approval {
    pub id: Uuid,
    pub tool_name: String,
    pub input: Value,
    pub status: ApprovalStatus,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Default)]
struct UsageCounter {
    day: Option<NaiveDate>,
    count: u32,
}

#[derive(Debug, Default)]
struct PolicyState {
    approvals: HashMap<Uuid, Approval>,
    usage: HashMap<String, UsageCounter>,
}

/// Allow/deny, approval-required, and daily quota decisions.
pub struct PolicyEngine {
    config: PolicyConfig,
    deny: Vec<Regex>,
    state: Mutex<PolicyState>,
}

impl PolicyEngine {
    /// Build and validate. Deny patterns must compile, allowed paths must
    /// be absolute.
    pub fn new(config: PolicyConfig) -> AgentResult<Self> {
        let mut deny = Vec::with_capacity(config.deny_patterns.len());
        for pattern in &config.deny_patterns {
            let regex = Regex::new(pattern).map_err(|e| {
                AgentError::InvalidInput(format!("invalid deny pattern {pattern:?}: {e}"))
            })?;
            deny.push(regex);
        }
        for path in &config.allowed_paths {
            if !Path::new(path).is_absolute() {
                return Err(AgentError::InvalidInput(format!(
                    "allowed path must be absolute: {path}"
                )));
            }
        }
        Ok(Self {
            config,
            deny,
            state: Mutex::new(PolicyState::default()),
        })
    }

    /// Full policy gate for a tool invocation without an approval token.
    ///
    /// Order: quota, deny patterns, approval requirement, auto-allow,
    /// configured default.
    pub fn check(&self, tool_name: &str, input: &Value) -> AgentResult<()> {
        let name = canonical_name(tool_name);

        self.check_quota(&name)?;

        if self.deny.iter().any(|re| re.is_match(&name)) {
            return Err(AgentError::PermissionDenied(format!(
                "tool {name} is denied by policy"
            )));
        }

        if self.requires_approval(&name, input) {
            let approval_id = self.create_approval(&name, input);
            return Err(AgentError::ApprovalRequired { approval_id });
        }

        if self.matches(&self.config.auto_allow, &name) || self.config.default_allow {
            return Ok(());
        }

        Err(AgentError::PermissionDenied(format!(
            "tool {name} is not allowed by policy"
        )))
    }

    /// Quota-only gate, also applied on the approval-token path.
    pub fn check_quota(&self, tool_name: &str) -> AgentResult<()> {
        let name = canonical_name(tool_name);
        let Some(&limit) = self.config.daily_tool_limits.get(&name) else {
            return Ok(());
        };
        let today = Utc::now().date_naive();
        let state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let used = state
            .usage
            .get(&name)
            .filter(|c| c.day == Some(today))
            .map_or(0, |c| c.count);
        if used >= limit {
            return Err(AgentError::PermissionDenied(format!(
                "quota exceeded for {name}: {used}/{limit} today"
            )));
        }
        Ok(())
    }

    /// Transition a pending approval to granted or denied.
    pub fn resolve(&self, approval_id: Uuid, granted: bool) -> AgentResult<()> {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let approval = state.approvals.get_mut(&approval_id).ok_or_else(|| {
            AgentError::NotFound(format!("approval {approval_id}"))
        })?;
        if approval.status != ApprovalStatus::Pending {
            return Err(AgentError::InvalidInput(format!(
                "approval {approval_id} is not pending"
            )));
        }
        approval.status = if granted {
            ApprovalStatus::Granted
        } else {
            ApprovalStatus::Denied
        };
        Ok(())
    }

    /// Whether an approval is granted and not yet consumed.
    pub fn is_granted(&self, approval_id: Uuid) -> bool {
        let state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        state
            .approvals
            .get(&approval_id)
            .is_some_and(|a| a.status == ApprovalStatus::Granted)
    }

    /// Consume a granted approval; it cannot be used again.
    pub fn consume(&self, approval_id: Uuid) -> AgentResult<()> {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let approval = state.approvals.get_mut(&approval_id).ok_or_else(|| {
            AgentError::NotFound(format!("approval {approval_id}"))
        })?;
        if approval.status != ApprovalStatus::Granted {
            return Err(AgentError::PermissionDenied(format!(
                "approval {approval_id} is not granted"
            )));
        }
        approval.status = ApprovalStatus::Expired;
        Ok(())
    }

    /// Count one successful execution against the daily quota.
    pub fn record_usage(&self, tool_name: &str) {
        let name = canonical_name(tool_name);
        let today = Utc::now().date_naive();
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let counter = state.usage.entry(name).or_default();
        if counter.day != Some(today) {
            counter.day = Some(today);
            counter.count = 0;
        }
        counter.count += 1;
    }

    /// Reject declared timeouts above the configured ceiling.
    pub fn validate_timeout(&self, declared_secs: u64) -> AgentResult<()> {
        if declared_secs > self.config.max_execution_timeout_secs {
            return Err(AgentError::PermissionDenied(format!(
                "declared timeout {declared_secs}s exceeds policy limit {}s",
                self.config.max_execution_timeout_secs
            )));
        }
        Ok(())
    }

    /// Inspect an approval record.
    pub fn approval(&self, approval_id: Uuid) -> Option<Approval> {
        let state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.approvals.get(&approval_id).cloned()
    }

    fn requires_approval(&self, name: &str, input: &Value) -> bool {
        if self.matches(&self.config.require_approval, name) {
            return true;
        }
        input
            .get("sandbox_permissions")
            .and_then(Value::as_str)
            .is_some_and(|v| v == "require_escalated")
    }

    fn matches(&self, names: &[String], name: &str) -> bool {
        names.iter().any(|n| canonical_name(n) == name)
    }

    fn create_approval(&self, name: &str, input: &Value) -> Uuid {
        let approval = Approval {
            id: Uuid::new_v4(),
            tool_name: name.to_string(),
            input: input.clone(),
            status: ApprovalStatus::Pending,
            created_at: Utc::now(),
        };
        let id = approval.id;
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .approvals
            .insert(id, approval);
        tracing::info!(tool = name, approval_id = %id, "approval requested");
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine(config: PolicyConfig) -> PolicyEngine {
        PolicyEngine::new(config).unwrap()
    }

    #[test]
    fn test_invalid_deny_pattern_rejected() {
        let config = PolicyConfig {
            deny_patterns: vec!["[unclosed".to_string()],
            ..Default::default()
        };
        assert!(PolicyEngine::new(config).is_err());
    }

    #[test]
    fn test_relative_allowed_path_rejected() {
        let config = PolicyConfig {
            allowed_paths: vec!["relative/path".to_string()],
            ..Default::default()
        };
        assert!(PolicyEngine::new(config).is_err());
    }

    #[test]
    fn test_deny_pattern_wins() {
        let policy = engine(PolicyConfig {
            deny_patterns: vec!["^rm".to_string()],
            default_allow: true,
            ..Default::default()
        });
        assert!(matches!(
            policy.check("rm_rf", &json!({})),
            Err(AgentError::PermissionDenied(_))
        ));
        assert!(policy.check("ls", &json!({})).is_ok());
    }

    #[test]
    fn test_default_deny() {
        let policy = engine(PolicyConfig::default());
        assert!(matches!(
            policy.check("anything", &json!({})),
            Err(AgentError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_auto_allow() {
        let policy = engine(PolicyConfig {
            auto_allow: vec!["Weather".to_string()],
            ..Default::default()
        });
        assert!(policy.check("weather", &json!({})).is_ok());
    }

    #[test]
    fn test_approval_round_trip() {
        let policy = engine(PolicyConfig {
            require_approval: vec!["exec_command".to_string()],
            ..Default::default()
        });

        let err = policy.check("exec_command", &json!({})).unwrap_err();
        let id = err.approval_id().expect("approval id");
        assert!(!policy.is_granted(id));

        policy.resolve(id, true).unwrap();
        assert!(policy.is_granted(id));

        policy.consume(id).unwrap();
        assert!(!policy.is_granted(id));
        // Second consumption fails: single use.
        assert!(policy.consume(id).is_err());
    }

    #[test]
    fn test_escalated_input_hint_requires_approval() {
        let policy = engine(PolicyConfig {
            default_allow: true,
            ..Default::default()
        });
        let input = json!({"sandbox_permissions": "require_escalated"});
        assert!(matches!(
            policy.check("anything", &input),
            Err(AgentError::ApprovalRequired { .. })
        ));
    }

    #[test]
    fn test_quota_exhaustion() {
        let mut limits = HashMap::new();
        limits.insert("exec_command".to_string(), 1u32);
        let policy = engine(PolicyConfig {
            daily_tool_limits: limits,
            default_allow: true,
            ..Default::default()
        });

        assert!(policy.check_quota("exec_command").is_ok());
        policy.record_usage("exec_command");
        let err = policy.check_quota("exec_command").unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        // Other tools are unaffected.
        assert!(policy.check_quota("weather").is_ok());
    }

    #[test]
    fn test_resolve_denied() {
        let policy = engine(PolicyConfig {
            require_approval: vec!["exec_command".to_string()],
            ..Default::default()
        });
        let id = policy
            .check("exec_command", &json!({}))
            .unwrap_err()
            .approval_id()
            .unwrap();
        policy.resolve(id, false).unwrap();
        assert!(!policy.is_granted(id));
        // A denied approval cannot be re-resolved.
        assert!(policy.resolve(id, true).is_err());
    }

    #[test]
    fn test_validate_timeout() {
        let policy = engine(PolicyConfig {
            max_execution_timeout_secs: 10,
            ..Default::default()
        });
        assert!(policy.validate_timeout(10).is_ok());
        assert!(policy.validate_timeout(11).is_err());
    }
}
