//! Domain models
//!
//! Pure domain entities with validation rules. These models are
//! framework-agnostic and contain no infrastructure concerns.

pub mod action;
pub mod config;
pub mod context;
pub mod message;
pub mod plan;
pub mod reflection;
pub mod run_context;
pub mod sandbox;
pub mod subtask;
pub mod tool;

pub use action::{Action, ExecutionResult, Thought, ToolOutput};
pub use config::{
    BrokerConfig, Config, CoordinatorConfig, EngineConfig, LoggingConfig, ModelConfig,
    PolicyConfig, RuntimeConfig, SandboxConfig,
};
pub use context::{estimate_tokens, CognitiveContext};
pub use message::{Message, Role, ToolCall};
pub use plan::{Plan, PlanStep, StepStatus};
pub use reflection::{ControlSignal, Reflection};
pub use run_context::RunContext;
pub use sandbox::{Sandbox, SandboxState};
pub use subtask::{validate_sub_tasks, SubTask, SubTaskResult};
pub use tool::{
    canonical_name, CustomTool, RiskLevel, SandboxLevel, ScriptLanguage, ToolDef, ToolDescriptor,
    ToolMetadata, ToolSource,
};
