//! Domain errors for the Heike agent runtime.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the runtime core.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Approval required: {approval_id}")]
    ApprovalRequired { approval_id: Uuid },

    #[error("Model output could not be parsed: {0}")]
    InvalidModelOutput(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Max turns reached after {turns} turns")]
    MaxTurnsReached { turns: u32 },

    #[error("Cancelled")]
    Cancelled,
}

pub type AgentResult<T> = Result<T, AgentError>;

impl AgentError {
    /// The approval id carried by an `ApprovalRequired` error, if any.
    pub fn approval_id(&self) -> Option<Uuid> {
        match self {
            Self::ApprovalRequired { approval_id } => Some(*approval_id),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::InvalidInput(err.to_string())
    }
}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        AgentError::Transient(err.to_string())
    }
}
