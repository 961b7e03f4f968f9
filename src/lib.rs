//! Heike - autonomous agent runtime
//!
//! The cognitive core that turns a user goal into tool invocations guided
//! by a language model:
//! - Plan / think / act / reflect deliberation loop
//! - Goal decomposition into a sub-task DAG with bounded-parallel execution
//! - Policy-gated tool dispatch with approvals and daily quotas
//! - Multi-language script runtimes with sandboxed filesystem isolation

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod runtime;
pub mod services;

// Re-export key types for convenience
pub use domain::errors::{AgentError, AgentResult};
pub use domain::models::{CognitiveContext, RunContext};
pub use services::{CognitiveEngine, TaskManager};
