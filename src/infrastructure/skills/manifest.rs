//! Skill custom-tool manifest (`tools/tools.yaml`).

use std::path::Path;

use serde::Deserialize;

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{
    CustomTool, RiskLevel, SandboxLevel, ScriptLanguage, ToolDef, ToolDescriptor, ToolMetadata,
    ToolSource,
};

/// Top-level manifest shape.
#[derive(Debug, Deserialize)]
pub struct ToolManifest {
    #[serde(default)]
    pub tools: Vec<ManifestTool>,
}

/// One tool entry as written by skill authors.
#[derive(Debug, Deserialize)]
pub struct ManifestTool {
    pub name: String,
    pub language: String,
    pub script: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub risk: Option<String>,
    #[serde(default)]
    pub sandbox: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl ToolManifest {
    /// Parse a manifest file's contents.
    pub fn parse(yaml: &str) -> AgentResult<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| AgentError::InvalidInput(format!("invalid tools manifest: {e}")))
    }
}

impl ManifestTool {
    /// Resolve into a `CustomTool`, with the script path anchored at the
    /// manifest's skill directory.
    pub fn resolve(self, skill_dir: &Path) -> AgentResult<CustomTool> {
        let language = ScriptLanguage::from_str(&self.language).ok_or_else(|| {
            AgentError::InvalidInput(format!(
                "tool {}: unknown language {:?}",
                self.name, self.language
            ))
        })?;

        let source = match self.source.as_deref() {
            None => ToolSource::Skill,
            Some(s) => match s.to_lowercase().as_str() {
                "builtin" => ToolSource::Builtin,
                "skill" => ToolSource::Skill,
                "runtime" => ToolSource::Runtime,
                "community" => ToolSource::Community,
                "organization" => ToolSource::Organization,
                other => {
                    return Err(AgentError::InvalidInput(format!(
                        "tool {}: unknown source {other:?}",
                        self.name
                    )))
                }
            },
        };

        let risk = match self.risk.as_deref() {
            None => RiskLevel::Medium,
            Some(s) => RiskLevel::from_str(s).ok_or_else(|| {
                AgentError::InvalidInput(format!("tool {}: unknown risk {s:?}", self.name))
            })?,
        };

        let sandbox = match self.sandbox.as_deref() {
            None => SandboxLevel::Basic,
            Some("basic") => SandboxLevel::Basic,
            Some("medium") => SandboxLevel::Medium,
            Some("advanced") => SandboxLevel::Advanced,
            Some("container") => SandboxLevel::Container,
            Some(other) => {
                return Err(AgentError::InvalidInput(format!(
                    "tool {}: unknown sandbox level {other:?}",
                    self.name
                )))
            }
        };

        let parameters = if self.parameters.is_null() {
            serde_json::json!({"type": "object", "properties": {}})
        } else {
            self.parameters
        };

        let def = ToolDef::new(self.name, self.description, parameters);
        def.validate().map_err(AgentError::InvalidInput)?;

        Ok(CustomTool {
            descriptor: ToolDescriptor::new(
                def,
                ToolMetadata {
                    source,
                    capabilities: self.capabilities,
                    risk,
                    tags: Vec::new(),
                },
            ),
            language,
            script_path: skill_dir.join(self.script),
            sandbox,
            dependencies: self.dependencies,
        })
    }
}
