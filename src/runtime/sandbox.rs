//! Per-workspace sandbox directories for tool subprocesses.
//!
//! Every sandbox lives under `<base>/<workspace_id>/<uuid>`; nothing
//! outside `<base>` is ever written. Argument traversal checking rejects
//! `..`, leading `/`, and `~` unless absolute paths are explicitly
//! permitted.

use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{RunContext, Sandbox, SandboxConfig, SandboxState};
use crate::runtime::process;

const DIR_MODE: u32 = 0o755;

/// Owns sandbox directories, keyed by workspace id.
pub struct SandboxManager {
    base: PathBuf,
    traversal_check: bool,
    allow_absolute_paths: bool,
    command_timeout: Duration,
    sandboxes: RwLock<HashMap<String, Sandbox>>,
}

impl SandboxManager {
    pub fn new(config: &SandboxConfig, command_timeout: Duration) -> Self {
        Self {
            base: PathBuf::from(&config.base_dir),
            traversal_check: config.traversal_check,
            allow_absolute_paths: config.allow_absolute_paths,
            command_timeout,
            sandboxes: RwLock::new(HashMap::new()),
        }
    }

    /// Create a fresh sandbox directory for a workspace.
    pub async fn setup(&self, workspace_id: &str) -> AgentResult<Sandbox> {
        validate_workspace_id(workspace_id)?;

        let mut sandbox = Sandbox::new(workspace_id, PathBuf::new());
        sandbox.root = self
            .base
            .join(workspace_id)
            .join(sandbox.id.to_string());

        tokio::fs::create_dir_all(&sandbox.root).await?;
        let mut perms = tokio::fs::metadata(&sandbox.root).await?.permissions();
        perms.set_mode(DIR_MODE);
        tokio::fs::set_permissions(&sandbox.root, perms).await?;

        sandbox.state = SandboxState::Ready;
        tracing::debug!(workspace = workspace_id, root = %sandbox.root.display(), "sandbox ready");

        self.sandboxes
            .write()
            .await
            .insert(workspace_id.to_string(), sandbox.clone());
        Ok(sandbox)
    }

    /// The current sandbox for a workspace, if one is set up.
    pub async fn get(&self, workspace_id: &str) -> Option<Sandbox> {
        self.sandboxes.read().await.get(workspace_id).cloned()
    }

    /// The current sandbox, creating one when absent.
    pub async fn get_or_setup(&self, workspace_id: &str) -> AgentResult<Sandbox> {
        if let Some(sandbox) = self.get(workspace_id).await {
            return Ok(sandbox);
        }
        self.setup(workspace_id).await
    }

    /// Remove every sandbox directory belonging to a workspace.
    pub async fn teardown(&self, workspace_id: &str) -> AgentResult<()> {
        validate_workspace_id(workspace_id)?;

        let mut sandboxes = self.sandboxes.write().await;
        if let Some(sandbox) = sandboxes.get_mut(workspace_id) {
            sandbox.state = SandboxState::Teardown;
        }
        sandboxes.remove(workspace_id);
        drop(sandboxes);

        let workspace_dir = self.base.join(workspace_id);
        if workspace_dir.exists() {
            tokio::fs::remove_dir_all(&workspace_dir).await?;
        }
        tracing::debug!(workspace = workspace_id, "sandbox torn down");
        Ok(())
    }

    /// Run a command with the sandbox root as its working directory.
    ///
    /// Output and error text are merged into the failure message on a
    /// non-zero exit.
    pub async fn execute_in_sandbox(
        &self,
        ctx: &RunContext,
        workspace_id: &str,
        cmd: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> AgentResult<String> {
        if cmd.trim().is_empty() {
            return Err(AgentError::InvalidInput("command must not be empty".to_string()));
        }
        if self.traversal_check {
            for arg in args {
                self.check_traversal(arg)?;
            }
        }

        let sandbox = self
            .get(workspace_id)
            .await
            .ok_or_else(|| AgentError::NotFound(format!("sandbox for workspace {workspace_id}")))?;

        self.set_state(workspace_id, SandboxState::Running).await;
        let result = process::run_command(
            ctx,
            cmd,
            args,
            Some(&sandbox.root),
            env,
            None,
            self.command_timeout,
        )
        .await;
        self.set_state(workspace_id, SandboxState::Ready).await;

        let output = result?;
        if !output.success {
            return Err(AgentError::Transient(format!(
                "{cmd} failed in sandbox: {} {}",
                output.stdout.trim(),
                output.stderr.trim()
            )));
        }
        Ok(output.stdout)
    }

    fn check_traversal(&self, arg: &str) -> AgentResult<()> {
        if arg.contains("..") {
            return Err(AgentError::PermissionDenied(format!(
                "argument contains path traversal: {arg}"
            )));
        }
        if arg.starts_with('/') && !self.allow_absolute_paths {
            return Err(AgentError::PermissionDenied(format!(
                "absolute path argument rejected: {arg}"
            )));
        }
        if arg.contains('~') {
            return Err(AgentError::PermissionDenied(format!(
                "home expansion rejected: {arg}"
            )));
        }
        Ok(())
    }

    async fn set_state(&self, workspace_id: &str, state: SandboxState) {
        if let Some(sandbox) = self.sandboxes.write().await.get_mut(workspace_id) {
            sandbox.state = state;
        }
    }
}

/// Workspace ids become path segments; refuse anything that could escape
/// the base directory.
fn validate_workspace_id(workspace_id: &str) -> AgentResult<()> {
    if workspace_id.is_empty()
        || workspace_id.contains('/')
        || workspace_id.contains('\\')
        || workspace_id.contains("..")
    {
        return Err(AgentError::InvalidInput(format!(
            "invalid workspace id: {workspace_id:?}"
        )));
    }
    Ok(())
}
