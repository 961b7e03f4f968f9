//! Per-run correlation and cancellation context.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Carried through every blocking call: cancellation plus correlation ids.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub session_id: String,
    pub trace_id: Uuid,
    cancel: CancellationToken,
}

impl RunContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            trace_id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
        }
    }

    /// A child context sharing the session id; cancelling the parent
    /// cancels the child, not the reverse.
    pub fn child(&self) -> Self {
        Self {
            session_id: self.session_id.clone(),
            trace_id: Uuid::new_v4(),
            cancel: self.cancel.child_token(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Resolves when the context is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new("default")
    }
}
