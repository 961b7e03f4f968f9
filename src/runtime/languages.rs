//! Per-language script runtimes.
//!
//! Each runtime composes an interpreter binary, looked up on PATH at
//! construction time, with a convention-specific invocation. A missing
//! binary disables that language.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{CustomTool, RunContext, Sandbox, ScriptLanguage};
use crate::runtime::process::{self, normalize_output};

/// Executes user-defined scripts for one language.
#[async_trait]
pub trait LanguageRuntime: Send + Sync {
    fn language(&self) -> ScriptLanguage;

    /// Interpreter version string, when probing succeeded.
    fn version(&self) -> Option<&str>;

    /// Run a script with JSON input, optionally inside a sandbox.
    async fn execute_script(
        &self,
        ctx: &RunContext,
        script_path: &Path,
        input: &serde_json::Value,
        sandbox: Option<&Sandbox>,
    ) -> AgentResult<serde_json::Value>;

    /// Best-effort dependency validation; absence of a manifest is fine.
    async fn validate_dependencies(&self, tool: &CustomTool) -> AgentResult<()>;

    /// Best-effort dependency installation.
    async fn install_dependencies(&self, tool: &CustomTool) -> AgentResult<()>;
}

/// Interpreter-backed runtime covering all six script languages.
pub struct ScriptRuntime {
    language: ScriptLanguage,
    binary: PathBuf,
    version: Option<String>,
    timeout: Duration,
}

impl ScriptRuntime {
    /// Probe PATH for the language's interpreter. `None` when the binary
    /// is missing, which disables the language.
    pub async fn probe(language: ScriptLanguage, timeout: Duration) -> Option<Self> {
        let binary = find_on_path(interpreter_for(language))?;
        let version = probe_version(&binary).await;
        Some(Self {
            language,
            binary,
            version,
            timeout,
        })
    }

    #[cfg(test)]
    pub fn with_binary(language: ScriptLanguage, binary: PathBuf, timeout: Duration) -> Self {
        Self {
            language,
            binary,
            version: None,
            timeout,
        }
    }

    fn invocation(&self, script: &Path, input: &str) -> (Vec<String>, Option<String>) {
        let script = script.to_string_lossy().to_string();
        match self.language {
            // Shell tools read their input from stdin.
            ScriptLanguage::Shell => (vec![script], Some(input.to_string())),
            ScriptLanguage::Python | ScriptLanguage::Javascript | ScriptLanguage::Ruby => (
                vec![script, "--input".to_string(), input.to_string()],
                None,
            ),
            ScriptLanguage::Go => (
                vec![
                    "run".to_string(),
                    script,
                    "--input".to_string(),
                    input.to_string(),
                ],
                None,
            ),
            ScriptLanguage::Rust => (
                vec![
                    "run".to_string(),
                    "--".to_string(),
                    "--input".to_string(),
                    input.to_string(),
                ],
                None,
            ),
        }
    }

    /// Go and Rust toolchains run from the script's directory; the other
    /// languages prefer the sandbox root when one is provided.
    fn working_dir(&self, script: &Path, sandbox: Option<&Sandbox>) -> Option<PathBuf> {
        match self.language {
            ScriptLanguage::Go | ScriptLanguage::Rust => script.parent().map(Path::to_path_buf),
            _ => sandbox
                .map(|s| s.root.clone())
                .or_else(|| script.parent().map(Path::to_path_buf)),
        }
    }
}

#[async_trait]
impl LanguageRuntime for ScriptRuntime {
    fn language(&self) -> ScriptLanguage {
        self.language
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    async fn execute_script(
        &self,
        ctx: &RunContext,
        script_path: &Path,
        input: &serde_json::Value,
        sandbox: Option<&Sandbox>,
    ) -> AgentResult<serde_json::Value> {
        let input_text = serde_json::to_string(input)
            .map_err(|e| AgentError::Internal(format!("input encode failed: {e}")))?;
        let (args, stdin) = self.invocation(script_path, &input_text);
        let cwd = self.working_dir(script_path, sandbox);

        let output = process::run_command(
            ctx,
            &self.binary.to_string_lossy(),
            &args,
            cwd.as_deref(),
            &HashMap::new(),
            stdin.as_deref(),
            self.timeout,
        )
        .await?;

        if !output.success {
            return Err(AgentError::Transient(format!(
                "script {} failed: {}",
                script_path.display(),
                output.stderr.trim()
            )));
        }

        Ok(normalize_output(&output.stdout))
    }

    async fn validate_dependencies(&self, tool: &CustomTool) -> AgentResult<()> {
        let Some(dir) = tool.script_path.parent() else {
            return Ok(());
        };
        let Some((manifest, check_args)) = dependency_check(self.language) else {
            return Ok(());
        };
        if !dir.join(manifest).exists() {
            return Ok(());
        }

        let ctx = RunContext::new("dependency-check");
        let args: Vec<String> = check_args.iter().map(ToString::to_string).collect();
        let output = process::run_command(
            &ctx,
            &self.binary.to_string_lossy(),
            &args,
            Some(dir),
            &HashMap::new(),
            None,
            self.timeout,
        )
        .await?;

        if !output.success {
            return Err(AgentError::InvalidInput(format!(
                "dependency check failed for {}: {}",
                tool.descriptor.def.name,
                output.stderr.trim()
            )));
        }
        Ok(())
    }

    async fn install_dependencies(&self, tool: &CustomTool) -> AgentResult<()> {
        let Some(dir) = tool.script_path.parent() else {
            return Ok(());
        };
        let Some((manifest, install_args)) = dependency_install(self.language) else {
            return Ok(());
        };
        if !dir.join(manifest).exists() {
            return Ok(());
        }

        let ctx = RunContext::new("dependency-install");
        let (program, args) = install_args;
        let output = process::run_command(
            &ctx,
            program,
            &args.iter().map(ToString::to_string).collect::<Vec<_>>(),
            Some(dir),
            &HashMap::new(),
            None,
            self.timeout,
        )
        .await?;

        if !output.success {
            return Err(AgentError::Transient(format!(
                "dependency install failed for {}: {}",
                tool.descriptor.def.name,
                output.stderr.trim()
            )));
        }
        Ok(())
    }
}

const fn interpreter_for(language: ScriptLanguage) -> &'static str {
    match language {
        ScriptLanguage::Python => "python3",
        ScriptLanguage::Shell => "sh",
        ScriptLanguage::Javascript => "node",
        ScriptLanguage::Go => "go",
        ScriptLanguage::Ruby => "ruby",
        ScriptLanguage::Rust => "cargo",
    }
}

/// Manifest file and interpreter arguments for the dependency check.
const fn dependency_check(language: ScriptLanguage) -> Option<(&'static str, &'static [&'static str])> {
    match language {
        ScriptLanguage::Python => Some(("requirements.txt", &["-m", "pip", "check"])),
        ScriptLanguage::Go => Some(("go.mod", &["mod", "verify"])),
        ScriptLanguage::Rust => Some(("Cargo.toml", &["metadata", "--no-deps", "--quiet"])),
        ScriptLanguage::Ruby => Some(("Gemfile", &["-S", "bundle", "check"])),
        ScriptLanguage::Shell | ScriptLanguage::Javascript => None,
    }
}

/// Manifest file plus install command for the language's package manager.
const fn dependency_install(
    language: ScriptLanguage,
) -> Option<(&'static str, (&'static str, &'static [&'static str]))> {
    match language {
        ScriptLanguage::Python => Some((
            "requirements.txt",
            ("python3", &["-m", "pip", "install", "-r", "requirements.txt"]),
        )),
        ScriptLanguage::Go => Some(("go.mod", ("go", &["mod", "download"]))),
        ScriptLanguage::Rust => Some(("Cargo.toml", ("cargo", &["fetch", "--quiet"]))),
        ScriptLanguage::Ruby => Some(("Gemfile", ("bundle", &["install", "--quiet"]))),
        ScriptLanguage::Shell | ScriptLanguage::Javascript => None,
    }
}

/// Locate a binary on PATH.
fn find_on_path(binary: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        let candidate = dir.join(binary);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

async fn probe_version(binary: &Path) -> Option<String> {
    let ctx = RunContext::new("version-probe");
    let output = process::run_command(
        &ctx,
        &binary.to_string_lossy(),
        &["--version".to_string()],
        None,
        &HashMap::new(),
        None,
        Duration::from_secs(5),
    )
    .await
    .ok()?;
    if !output.success {
        return None;
    }
    let text = if output.stdout.trim().is_empty() {
        output.stderr
    } else {
        output.stdout
    };
    text.lines().next().map(|l| l.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    fn shell_runtime() -> ScriptRuntime {
        ScriptRuntime::with_binary(
            ScriptLanguage::Shell,
            find_on_path("sh").expect("sh on PATH"),
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn test_shell_plain_text_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "hello.sh", "echo hello\n");
        let runtime = shell_runtime();
        let result = runtime
            .execute_script(&RunContext::default(), &script, &serde_json::json!({}), None)
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({"output": "hello"}));
    }

    #[tokio::test]
    async fn test_shell_json_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "json.sh", "echo '{\"a\":1}'\n");
        let runtime = shell_runtime();
        let result = runtime
            .execute_script(&RunContext::default(), &script, &serde_json::json!({}), None)
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_shell_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "quiet.sh", "true\n");
        let runtime = shell_runtime();
        let result = runtime
            .execute_script(&RunContext::default(), &script, &serde_json::json!({}), None)
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_shell_reads_input_from_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "stdin.sh", "cat\n");
        let runtime = shell_runtime();
        let result = runtime
            .execute_script(
                &RunContext::default(),
                &script,
                &serde_json::json!({"city": "Oslo"}),
                None,
            )
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({"city": "Oslo"}));
    }

    #[tokio::test]
    async fn test_nonzero_exit_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "fail.sh", "echo broken >&2; exit 3\n");
        let runtime = shell_runtime();
        let err = runtime
            .execute_script(&RunContext::default(), &script, &serde_json::json!({}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Transient(_)));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_invocation_conventions() {
        let runtime = ScriptRuntime::with_binary(
            ScriptLanguage::Python,
            PathBuf::from("/usr/bin/python3"),
            Duration::from_secs(1),
        );
        let (args, stdin) = runtime.invocation(Path::new("/tmp/tool.py"), "{}");
        assert_eq!(args, vec!["/tmp/tool.py", "--input", "{}"]);
        assert!(stdin.is_none());

        let runtime = ScriptRuntime::with_binary(
            ScriptLanguage::Rust,
            PathBuf::from("/usr/bin/cargo"),
            Duration::from_secs(1),
        );
        let (args, _) = runtime.invocation(Path::new("/proj/main.rs"), "{}");
        assert_eq!(args, vec!["run", "--", "--input", "{}"]);
    }

    #[test]
    fn test_find_on_path() {
        assert!(find_on_path("sh").is_some());
        assert!(find_on_path("no-such-binary-exists").is_none());
    }
}
