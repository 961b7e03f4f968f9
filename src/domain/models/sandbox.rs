//! Sandbox lifecycle state.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a sandbox working directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxState {
    Setup,
    Ready,
    Running,
    Teardown,
    Error,
}

/// A per-workspace working directory that frames a tool subprocess's
/// filesystem view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sandbox {
    pub id: Uuid,
    pub workspace_id: String,
    /// Absolute root under `<base>/<workspace_id>/<id>`.
    pub root: PathBuf,
    pub state: SandboxState,
    pub created_at: DateTime<Utc>,
}

impl Sandbox {
    pub fn new(workspace_id: impl Into<String>, root: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id: workspace_id.into(),
            root,
            state: SandboxState::Setup,
            created_at: Utc::now(),
        }
    }
}
