//! Tool definitions, metadata, and custom-tool records.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_.-]*$").expect("valid tool name pattern"));

/// Canonical form of a tool name.
///
/// All registry keys, policy lookups, and broker scoring agree on this
/// normalisation.
pub fn canonical_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Model-facing tool definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    /// JSON-schema object describing the accepted input.
    #[serde(default = "empty_schema")]
    pub parameters: serde_json::Value,
}

fn empty_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

impl ToolDef {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Validate the tool name against the accepted identifier pattern.
    pub fn validate(&self) -> Result<(), String> {
        if !NAME_PATTERN.is_match(&self.name) {
            return Err(format!("invalid tool name: {:?}", self.name));
        }
        Ok(())
    }
}

/// Where a tool came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolSource {
    Builtin,
    Skill,
    Runtime,
    Community,
    Organization,
}

impl Default for ToolSource {
    fn default() -> Self {
        Self::Builtin
    }
}

impl ToolSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Skill => "skill",
            Self::Runtime => "runtime",
            Self::Community => "community",
            Self::Organization => "organization",
        }
    }
}

/// Declared hazard level of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl Default for RiskLevel {
    fn default() -> Self {
        Self::Medium
    }
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Metadata carried alongside a tool definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    #[serde(default)]
    pub source: ToolSource,
    /// Dotted-path capability identifiers, e.g. `web.fetch`, `exec.command`.
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub risk: RiskLevel,
    /// Tags used by the broker for relevance scoring.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A registered tool: definition plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    #[serde(flatten)]
    pub def: ToolDef,
    #[serde(flatten)]
    pub metadata: ToolMetadata,
}

impl ToolDescriptor {
    pub fn new(def: ToolDef, metadata: ToolMetadata) -> Self {
        Self { def, metadata }
    }

    pub fn builtin(def: ToolDef) -> Self {
        Self {
            def,
            metadata: ToolMetadata {
                source: ToolSource::Builtin,
                ..Default::default()
            },
        }
    }

    /// Canonical registry key for this tool.
    pub fn canonical_name(&self) -> String {
        canonical_name(&self.def.name)
    }
}

/// Sandbox isolation level requested by a custom tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxLevel {
    Basic,
    Medium,
    Advanced,
    Container,
}

impl Default for SandboxLevel {
    fn default() -> Self {
        Self::Basic
    }
}

/// Script language of a user-defined tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptLanguage {
    Python,
    Shell,
    Javascript,
    Go,
    Ruby,
    Rust,
}

impl ScriptLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Shell => "shell",
            Self::Javascript => "javascript",
            Self::Go => "go",
            Self::Ruby => "ruby",
            Self::Rust => "rust",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "python" | "py" => Some(Self::Python),
            "shell" | "sh" | "bash" => Some(Self::Shell),
            "javascript" | "js" | "node" => Some(Self::Javascript),
            "go" | "golang" => Some(Self::Go),
            "ruby" | "rb" => Some(Self::Ruby),
            "rust" | "rs" => Some(Self::Rust),
            _ => None,
        }
    }

    /// Language inferred from a script file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "py" => Some(Self::Python),
            "sh" => Some(Self::Shell),
            "js" => Some(Self::Javascript),
            "go" => Some(Self::Go),
            "rb" => Some(Self::Ruby),
            "rs" => Some(Self::Rust),
            _ => None,
        }
    }
}

/// A user-defined tool backed by a script file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomTool {
    pub descriptor: ToolDescriptor,
    pub language: ScriptLanguage,
    /// Absolute path to the script source, resolved at discovery time.
    pub script_path: PathBuf,
    #[serde(default)]
    pub sandbox: SandboxLevel,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_name_validation() {
        assert!(ToolDef::new("weather", "", serde_json::json!({})).validate().is_ok());
        assert!(ToolDef::new("get_weather.v2", "", serde_json::json!({})).validate().is_ok());
        assert!(ToolDef::new("file-read", "", serde_json::json!({})).validate().is_ok());
        assert!(ToolDef::new("2fast", "", serde_json::json!({})).validate().is_err());
        assert!(ToolDef::new("", "", serde_json::json!({})).validate().is_err());
        assert!(ToolDef::new("has space", "", serde_json::json!({})).validate().is_err());
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("  Weather "), "weather");
        assert_eq!(canonical_name("Exec_Command"), "exec_command");
    }

    #[test]
    fn test_risk_defaults_to_medium() {
        let meta: ToolMetadata = serde_json::from_str(r#"{"source": "skill"}"#).unwrap();
        assert_eq!(meta.risk, RiskLevel::Medium);
    }

    #[test]
    fn test_language_from_extension() {
        assert_eq!(ScriptLanguage::from_extension("py"), Some(ScriptLanguage::Python));
        assert_eq!(ScriptLanguage::from_extension("rs"), Some(ScriptLanguage::Rust));
        assert_eq!(ScriptLanguage::from_extension("txt"), None);
    }
}
