//! Multi-language script execution with sandboxed filesystem isolation.

pub mod languages;
pub mod process;
pub mod sandbox;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{CustomTool, RunContext, RuntimeConfig, ScriptLanguage};
use crate::services::registry::{ToolHandler, ToolRegistry};

pub use languages::{LanguageRuntime, ScriptRuntime};
pub use process::normalize_output;
pub use sandbox::SandboxManager;

/// All script languages a runtime can be probed for.
pub const ALL_LANGUAGES: [ScriptLanguage; 6] = [
    ScriptLanguage::Python,
    ScriptLanguage::Shell,
    ScriptLanguage::Javascript,
    ScriptLanguage::Go,
    ScriptLanguage::Ruby,
    ScriptLanguage::Rust,
];

/// Available language runtimes, keyed by language.
///
/// Languages whose interpreter is missing from PATH are simply absent.
#[derive(Default)]
pub struct RuntimeRegistry {
    runtimes: HashMap<ScriptLanguage, Arc<dyn LanguageRuntime>>,
}

impl RuntimeRegistry {
    /// Probe PATH for every supported language.
    pub async fn probe_all(config: &RuntimeConfig) -> Self {
        let timeout = Duration::from_secs(config.script_timeout_secs);
        let mut runtimes: HashMap<ScriptLanguage, Arc<dyn LanguageRuntime>> = HashMap::new();
        for language in ALL_LANGUAGES {
            if let Some(runtime) = ScriptRuntime::probe(language, timeout).await {
                tracing::debug!(
                    language = language.as_str(),
                    version = runtime.version().unwrap_or("unknown"),
                    "language runtime available"
                );
                runtimes.insert(language, Arc::new(runtime));
            } else {
                tracing::debug!(language = language.as_str(), "interpreter missing, language disabled");
            }
        }
        Self { runtimes }
    }

    pub fn insert(&mut self, runtime: Arc<dyn LanguageRuntime>) {
        self.runtimes.insert(runtime.language(), runtime);
    }

    pub fn get(&self, language: ScriptLanguage) -> Option<Arc<dyn LanguageRuntime>> {
        self.runtimes.get(&language).cloned()
    }

    pub fn available(&self) -> Vec<ScriptLanguage> {
        let mut languages: Vec<ScriptLanguage> = self.runtimes.keys().copied().collect();
        languages.sort_by_key(ScriptLanguage::as_str);
        languages
    }
}

/// Tool handler executing a user-defined script through its language
/// runtime, inside the workspace sandbox.
pub struct ScriptToolHandler {
    tool: CustomTool,
    runtimes: Arc<RuntimeRegistry>,
    sandboxes: Option<Arc<SandboxManager>>,
    workspace_id: String,
}

impl ScriptToolHandler {
    pub fn new(
        tool: CustomTool,
        runtimes: Arc<RuntimeRegistry>,
        sandboxes: Option<Arc<SandboxManager>>,
        workspace_id: impl Into<String>,
    ) -> Self {
        Self {
            tool,
            runtimes,
            sandboxes,
            workspace_id: workspace_id.into(),
        }
    }
}

#[async_trait]
impl ToolHandler for ScriptToolHandler {
    async fn invoke(
        &self,
        ctx: &RunContext,
        args: &serde_json::Value,
        _input_text: &str,
    ) -> AgentResult<serde_json::Value> {
        let runtime = self.runtimes.get(self.tool.language).ok_or_else(|| {
            AgentError::NotFound(format!(
                "no runtime for language {}",
                self.tool.language.as_str()
            ))
        })?;

        let sandbox = match &self.sandboxes {
            Some(manager) => Some(manager.get_or_setup(&self.workspace_id).await?),
            None => None,
        };

        runtime
            .execute_script(ctx, &self.tool.script_path, args, sandbox.as_ref())
            .await
    }
}

/// Register discovered custom tools against the registry, wiring each to
/// its script handler. Later discoveries replace earlier ones, matching
/// root precedence.
pub fn register_custom_tools(
    registry: &mut ToolRegistry,
    tools: Vec<CustomTool>,
    runtimes: &Arc<RuntimeRegistry>,
    sandboxes: Option<&Arc<SandboxManager>>,
    workspace_id: &str,
) -> AgentResult<usize> {
    let mut registered = 0;
    for tool in tools {
        if runtimes.get(tool.language).is_none() {
            tracing::warn!(
                tool = %tool.descriptor.def.name,
                language = tool.language.as_str(),
                "skipping tool, language runtime unavailable"
            );
            continue;
        }
        let descriptor = tool.descriptor.clone();
        let handler = Arc::new(ScriptToolHandler::new(
            tool,
            runtimes.clone(),
            sandboxes.cloned(),
            workspace_id,
        ));
        registry.register_or_replace(descriptor, handler)?;
        registered += 1;
    }
    Ok(registered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    use crate::domain::models::{SandboxLevel, ToolDef, ToolDescriptor, ToolMetadata, ToolSource};

    fn shell_tool(script_path: PathBuf) -> CustomTool {
        CustomTool {
            descriptor: ToolDescriptor::new(
                ToolDef::new("greet", "prints a greeting", serde_json::json!({})),
                ToolMetadata {
                    source: ToolSource::Skill,
                    ..Default::default()
                },
            ),
            language: ScriptLanguage::Shell,
            script_path,
            sandbox: SandboxLevel::Basic,
            dependencies: vec![],
        }
    }

    #[tokio::test]
    async fn test_script_handler_runs_tool() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("greet.sh");
        let mut file = std::fs::File::create(&script).unwrap();
        file.write_all(b"echo hello\n").unwrap();

        let mut runtimes = RuntimeRegistry::default();
        runtimes.insert(Arc::new(languages::ScriptRuntime::with_binary(
            ScriptLanguage::Shell,
            which_sh(),
            Duration::from_secs(10),
        )));

        let handler = ScriptToolHandler::new(
            shell_tool(script),
            Arc::new(runtimes),
            None,
            "ws-1",
        );
        let result = handler
            .invoke(&RunContext::default(), &serde_json::json!({}), "")
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({"output": "hello"}));
    }

    #[tokio::test]
    async fn test_register_skips_unavailable_language() {
        let mut registry = ToolRegistry::new();
        let runtimes = Arc::new(RuntimeRegistry::default());
        let count = register_custom_tools(
            &mut registry,
            vec![shell_tool(PathBuf::from("/nowhere.sh"))],
            &runtimes,
            None,
            "ws-1",
        )
        .unwrap();
        assert_eq!(count, 0);
        assert!(registry.is_empty());
    }

    fn which_sh() -> PathBuf {
        std::env::split_paths(&std::env::var_os("PATH").unwrap())
            .map(|d| d.join("sh"))
            .find(|p| p.is_file())
            .expect("sh on PATH")
    }
}
