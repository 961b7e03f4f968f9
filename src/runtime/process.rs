//! Shared subprocess execution for script runtimes and the sandbox.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::RunContext;

/// Grace period between SIGTERM and the hard kill on timeout.
const TERM_GRACE: Duration = Duration::from_secs(2);

/// Captured output of a finished subprocess.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// Spawn a command and wait for it, honouring the deadline and the run's
/// cancellation token. A timed-out child gets SIGTERM, then SIGKILL after
/// a short grace period.
pub async fn run_command(
    ctx: &RunContext,
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    envs: &HashMap<String, String>,
    stdin: Option<&str>,
    timeout: Duration,
) -> AgentResult<ProcessOutput> {
    if ctx.is_cancelled() {
        return Err(AgentError::Cancelled);
    }

    let mut command = Command::new(program);
    command
        .args(args)
        .envs(envs)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    let mut child = command
        .spawn()
        .map_err(|e| AgentError::Transient(format!("failed to spawn {program}: {e}")))?;

    if let (Some(input), Some(mut handle)) = (stdin, child.stdin.take()) {
        handle
            .write_all(input.as_bytes())
            .await
            .map_err(|e| AgentError::Transient(format!("stdin write failed: {e}")))?;
    }

    let pid = child.id();
    let wait = child.wait_with_output();
    tokio::pin!(wait);

    let output = tokio::select! {
        result = &mut wait => {
            result.map_err(|e| AgentError::Transient(format!("{program} wait failed: {e}")))?
        }
        () = tokio::time::sleep(timeout) => {
            if let Some(pid) = pid {
                let _ = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }
            // Give the child a moment to exit cleanly; dropping the wait
            // future afterwards hard-kills it.
            let _ = tokio::time::timeout(TERM_GRACE, &mut wait).await;
            return Err(AgentError::Transient(format!(
                "{program} timed out after {}s",
                timeout.as_secs()
            )));
        }
        () = ctx.cancelled() => return Err(AgentError::Cancelled),
    };

    Ok(ProcessOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        success: output.status.success(),
    })
}

/// Normalise script stdout into a JSON result.
///
/// Empty output becomes `{}`; valid JSON passes through; anything else is
/// wrapped as `{"output": "<raw>"}`.
pub fn normalize_output(stdout: &str) -> serde_json::Value {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return serde_json::json!({});
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| serde_json::json!({ "output": trimmed }))
}
