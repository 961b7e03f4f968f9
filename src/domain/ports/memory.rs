//! Memory manager port plus a null implementation.

use async_trait::async_trait;

use crate::domain::errors::AgentResult;
use crate::domain::models::RunContext;

/// Long-lived fact storage consulted and fed by engine runs.
#[async_trait]
pub trait MemoryManager: Send + Sync {
    /// Facts relevant to a query, best first.
    async fn retrieve(&self, ctx: &RunContext, query: &str) -> AgentResult<Vec<String>>;

    /// Persist a fact. Failures are logged by callers, never fatal.
    async fn remember(&self, ctx: &RunContext, fact: &str) -> AgentResult<()>;
}

/// Memory manager that stores nothing and retrieves nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMemoryManager;

#[async_trait]
impl MemoryManager for NullMemoryManager {
    async fn retrieve(&self, _ctx: &RunContext, _query: &str) -> AgentResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn remember(&self, _ctx: &RunContext, _fact: &str) -> AgentResult<()> {
        Ok(())
    }
}
