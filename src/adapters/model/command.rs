//! Model client backed by an external command.
//!
//! Provider-agnostic: the configured command receives the prompt on stdin
//! and prints the completion on stdout. Chat completions exchange JSON
//! envelopes so tool-aware CLIs can participate; a plain-text reply is
//! accepted as an answer with no tool calls.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{Message, ModelConfig, RunContext, ToolCall, ToolDef};
use crate::domain::ports::{ChatCompletion, ModelClient};

/// Spawns a configured command per completion call.
pub struct CommandModelClient {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ChatEnvelope {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

impl CommandModelClient {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    /// Build from the model section of the config; `None` when no command
    /// is configured.
    pub fn from_config(config: &ModelConfig) -> Option<Self> {
        config.command.as_ref().map(|command| {
            Self::new(
                command.clone(),
                config.args.clone(),
                Duration::from_secs(config.timeout_secs),
            )
        })
    }

    async fn invoke(&self, ctx: &RunContext, extra_args: &[&str], stdin: &str) -> AgentResult<String> {
        if ctx.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .args(extra_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AgentError::Transient(format!("failed to spawn {}: {e}", self.command)))?;

        if let Some(mut handle) = child.stdin.take() {
            handle
                .write_all(stdin.as_bytes())
                .await
                .map_err(|e| AgentError::Transient(format!("model stdin write failed: {e}")))?;
        }

        let output = tokio::select! {
            result = tokio::time::timeout(self.timeout, child.wait_with_output()) => match result {
                Ok(output) => output
                    .map_err(|e| AgentError::Transient(format!("model command failed: {e}")))?,
                Err(_) => {
                    return Err(AgentError::Transient(format!(
                        "model command timed out after {}s",
                        self.timeout.as_secs()
                    )))
                }
            },
            () = ctx.cancelled() => return Err(AgentError::Cancelled),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AgentError::Transient(format!(
                "model command exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl ModelClient for CommandModelClient {
    async fn complete(&self, ctx: &RunContext, prompt: &str) -> AgentResult<String> {
        self.invoke(ctx, &[], prompt).await
    }

    async fn chat_complete(
        &self,
        ctx: &RunContext,
        messages: &[Message],
        tools: &[ToolDef],
    ) -> AgentResult<ChatCompletion> {
        let envelope = serde_json::json!({
            "messages": messages,
            "tools": tools,
        });
        let stdin = serde_json::to_string(&envelope)
            .map_err(|e| AgentError::Internal(format!("chat envelope encode failed: {e}")))?;

        let stdout = self.invoke(ctx, &["--chat"], &stdin).await?;

        match serde_json::from_str::<ChatEnvelope>(&stdout) {
            Ok(reply) => Ok(ChatCompletion {
                content: reply.content,
                tool_calls: reply.tool_calls,
            }),
            // Plain text is a final answer.
            Err(_) => Ok(ChatCompletion {
                content: stdout,
                tool_calls: Vec::new(),
            }),
        }
    }
}
