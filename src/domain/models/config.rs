//! Runtime configuration model.
//!
//! Loaded hierarchically by `infrastructure::config::ConfigLoader` and
//! validated before use.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Main configuration structure for Heike.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Cognitive engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Sub-task coordinator settings
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// Tool policy settings
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Tool broker settings
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Script runtime settings
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Sandbox settings
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// External model command settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Cognitive engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Maximum think/act/reflect turns per run
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Context token budget; 0 disables pruning
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// Extra completions attempted when structured parsing fails
    #[serde(default = "default_structured_retry_max")]
    pub structured_retry_max: u32,
}

const fn default_max_turns() -> u32 {
    10
}

const fn default_token_budget() -> usize {
    32_000
}

const fn default_structured_retry_max() -> u32 {
    2
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            token_budget: default_token_budget(),
            structured_retry_max: default_structured_retry_max(),
        }
    }
}

/// Sub-task coordinator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CoordinatorConfig {
    /// Maximum sub-tasks running concurrently within a batch
    #[serde(default = "default_max_parallel")]
    pub max_parallel_sub_tasks: usize,

    /// Attempts per sub-task before it is recorded as failed
    #[serde(default = "default_retry_max")]
    pub retry_max: u32,

    /// Linear backoff unit between attempts (milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Word count above which a goal is decomposed
    #[serde(default = "default_complexity_word_threshold")]
    pub complexity_word_threshold: usize,
}

const fn default_max_parallel() -> usize {
    4
}

const fn default_retry_max() -> u32 {
    2
}

const fn default_retry_backoff_ms() -> u64 {
    500
}

const fn default_complexity_word_threshold() -> usize {
    25
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_parallel_sub_tasks: default_max_parallel(),
            retry_max: default_retry_max(),
            retry_backoff_ms: default_retry_backoff_ms(),
            complexity_word_threshold: default_complexity_word_threshold(),
        }
    }
}

/// Tool policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PolicyConfig {
    /// Tool names executed without approval
    #[serde(default)]
    pub auto_allow: Vec<String>,

    /// Regex patterns; a matching tool name is denied outright
    #[serde(default)]
    pub deny_patterns: Vec<String>,

    /// Tool names requiring a granted approval before execution
    #[serde(default)]
    pub require_approval: Vec<String>,

    /// Per-tool daily execution limits
    #[serde(default)]
    pub daily_tool_limits: HashMap<String, u32>,

    /// Absolute filesystem paths tools may touch
    #[serde(default)]
    pub allowed_paths: Vec<String>,

    /// Upper bound on a tool's declared execution timeout (seconds)
    #[serde(default = "default_max_execution_timeout")]
    pub max_execution_timeout_secs: u64,

    /// Whether tools matching no rule are allowed
    #[serde(default)]
    pub default_allow: bool,
}

const fn default_max_execution_timeout() -> u64 {
    300
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            auto_allow: Vec::new(),
            deny_patterns: Vec::new(),
            require_approval: Vec::new(),
            daily_tool_limits: HashMap::new(),
            allowed_paths: Vec::new(),
            max_execution_timeout_secs: default_max_execution_timeout(),
            default_allow: false,
        }
    }
}

/// Tool broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BrokerConfig {
    /// Maximum tools offered to the model per goal; 0 disables selection
    #[serde(default = "default_max_tools")]
    pub max_tools: usize,
}

const fn default_max_tools() -> usize {
    12
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            max_tools: default_max_tools(),
        }
    }
}

/// Script runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RuntimeConfig {
    /// Per-script execution deadline (seconds)
    #[serde(default = "default_script_timeout")]
    pub script_timeout_secs: u64,
}

const fn default_script_timeout() -> u64 {
    60
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            script_timeout_secs: default_script_timeout(),
        }
    }
}

/// Sandbox configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SandboxConfig {
    /// Base directory for sandbox working directories
    #[serde(default = "default_sandbox_base")]
    pub base_dir: String,

    /// Reject arguments containing `..`, leading `/`, or `~`
    #[serde(default = "default_true")]
    pub traversal_check: bool,

    /// Permit absolute path arguments despite traversal checking
    #[serde(default)]
    pub allow_absolute_paths: bool,
}

fn default_sandbox_base() -> String {
    ".heike/sandboxes".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            base_dir: default_sandbox_base(),
            traversal_check: default_true(),
            allow_absolute_paths: false,
        }
    }
}

/// External model command configuration.
///
/// The command receives the prompt on stdin and prints the completion on
/// stdout. Chat completions are exchanged as JSON envelopes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelConfig {
    /// Command to spawn for completions; unset disables the CLI `run` path
    #[serde(default)]
    pub command: Option<String>,

    /// Extra arguments passed to the command
    #[serde(default)]
    pub args: Vec<String>,

    /// Per-call deadline (seconds)
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
}

const fn default_model_timeout() -> u64 {
    120
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional log file path; unset logs to stderr only
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.engine.max_turns, 10);
        assert_eq!(config.coordinator.max_parallel_sub_tasks, 4);
        assert_eq!(config.coordinator.complexity_word_threshold, 25);
        assert!(config.sandbox.traversal_check);
        assert!(!config.sandbox.allow_absolute_paths);
        assert!(!config.policy.default_allow);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "engine:\n  max_turns: 3\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.engine.max_turns, 3);
        assert_eq!(config.engine.structured_retry_max, 2);
        assert_eq!(config.broker.max_tools, 12);
    }
}
