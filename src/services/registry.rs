//! Tool registry: canonical name to descriptor plus handler.
//!
//! Built once at start-up and read-only afterwards; runs only ever look
//! tools up.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{canonical_name, RunContext, ToolDescriptor};

/// Invocation seam for a registered tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(
        &self,
        ctx: &RunContext,
        args: &serde_json::Value,
        input_text: &str,
    ) -> AgentResult<serde_json::Value>;
}

/// Handler wrapping a synchronous closure; convenient for builtins.
pub struct FnToolHandler<F>
where
    F: Fn(&serde_json::Value) -> AgentResult<serde_json::Value> + Send + Sync,
{
    func: F,
}

impl<F> FnToolHandler<F>
where
    F: Fn(&serde_json::Value) -> AgentResult<serde_json::Value> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> ToolHandler for FnToolHandler<F>
where
    F: Fn(&serde_json::Value) -> AgentResult<serde_json::Value> + Send + Sync,
{
    async fn invoke(
        &self,
        _ctx: &RunContext,
        args: &serde_json::Value,
        _input_text: &str,
    ) -> AgentResult<serde_json::Value> {
        (self.func)(args)
    }
}

/// A registered tool: descriptor plus its handler.
#[derive(Clone)]
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub handler: Arc<dyn ToolHandler>,
}

/// Case-normalised tool name registry.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A duplicate name is a programmer error surfaced as
    /// `Internal` during initialisation.
    pub fn register(
        &mut self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
    ) -> AgentResult<()> {
        descriptor.def.validate().map_err(AgentError::InvalidInput)?;
        let key = descriptor.canonical_name();
        if self.tools.contains_key(&key) {
            return Err(AgentError::Internal(format!(
                "tool already registered: {key}"
            )));
        }
        self.tools.insert(key, RegisteredTool { descriptor, handler });
        Ok(())
    }

    /// Register a tool, replacing any previous registration of the same
    /// name. Used by skill discovery, where later roots take precedence.
    pub fn register_or_replace(
        &mut self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
    ) -> AgentResult<()> {
        descriptor.def.validate().map_err(AgentError::InvalidInput)?;
        let key = descriptor.canonical_name();
        self.tools.insert(key, RegisteredTool { descriptor, handler });
        Ok(())
    }

    /// Look a tool up by any casing of its name.
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(&canonical_name(name))
    }

    /// All descriptors, sorted by canonical name.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut all: Vec<ToolDescriptor> =
            self.tools.values().map(|t| t.descriptor.clone()).collect();
        all.sort_by_key(ToolDescriptor::canonical_name);
        all
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ToolDef;

    fn echo_tool(name: &str) -> (ToolDescriptor, Arc<dyn ToolHandler>) {
        let descriptor = ToolDescriptor::builtin(ToolDef::new(
            name,
            "echoes the input",
            serde_json::json!({"type": "object", "properties": {}}),
        ));
        let handler = Arc::new(FnToolHandler::new(|args: &serde_json::Value| Ok(args.clone())));
        (descriptor, handler)
    }

    #[test]
    fn test_lookup_is_case_normalised() {
        let mut registry = ToolRegistry::new();
        let (descriptor, handler) = echo_tool("Echo");
        registry.register(descriptor, handler).unwrap();

        assert!(registry.get("echo").is_some());
        assert!(registry.get("ECHO").is_some());
        assert!(registry.get(" echo ").is_some());
        assert!(registry.get("other").is_none());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ToolRegistry::new();
        let (d1, h1) = echo_tool("echo");
        let (d2, h2) = echo_tool("ECHO");
        registry.register(d1, h1).unwrap();
        let err = registry.register(d2, h2).unwrap_err();
        assert!(matches!(err, AgentError::Internal(_)));
    }

    #[test]
    fn test_replace_for_discovery_precedence() {
        let mut registry = ToolRegistry::new();
        let (d1, h1) = echo_tool("echo");
        registry.register(d1, h1).unwrap();

        let mut d2 = ToolDescriptor::builtin(ToolDef::new("echo", "override", serde_json::json!({})));
        d2.metadata.source = crate::domain::models::ToolSource::Skill;
        let handler = Arc::new(FnToolHandler::new(|_: &serde_json::Value| {
            Ok(serde_json::json!("replaced"))
        }));
        registry.register_or_replace(d2, handler).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("echo").unwrap().descriptor.def.description, "override");
    }

    #[test]
    fn test_invalid_name_rejected() {
        let mut registry = ToolRegistry::new();
        let (mut descriptor, handler) = echo_tool("ok");
        descriptor.def.name = "9bad name".to_string();
        assert!(registry.register(descriptor, handler).is_err());
    }
}
