//! Session manager port - consumed by the task manager.

use async_trait::async_trait;

use crate::domain::errors::AgentResult;
use crate::domain::models::{CognitiveContext, Role, RunContext};

/// Session state access. Persistence lives behind this port; the core
/// keeps nothing across process restarts.
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Seed context for a session: history, memories, metadata.
    async fn get_context(&self, ctx: &RunContext, session_id: &str)
        -> AgentResult<CognitiveContext>;

    /// Record one interaction turn against the session.
    async fn append_interaction(
        &self,
        ctx: &RunContext,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> AgentResult<()>;

    /// Record a tool result against the session.
    async fn persist_tool(
        &self,
        ctx: &RunContext,
        session_id: &str,
        tool_call_id: &str,
        content: &str,
    ) -> AgentResult<()>;
}

/// Session manager backed by nothing; every session starts empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct EphemeralSessionManager;

#[async_trait]
impl SessionManager for EphemeralSessionManager {
    async fn get_context(
        &self,
        _ctx: &RunContext,
        session_id: &str,
    ) -> AgentResult<CognitiveContext> {
        Ok(CognitiveContext::new(session_id, "default"))
    }

    async fn append_interaction(
        &self,
        _ctx: &RunContext,
        _session_id: &str,
        _role: Role,
        _content: &str,
    ) -> AgentResult<()> {
        Ok(())
    }

    async fn persist_tool(
        &self,
        _ctx: &RunContext,
        _session_id: &str,
        _tool_call_id: &str,
        _content: &str,
    ) -> AgentResult<()> {
        Ok(())
    }
}
