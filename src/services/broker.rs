//! Tool selection: score tools against a goal, return a bounded subset.

use std::collections::HashSet;

use crate::domain::models::{RiskLevel, ToolDescriptor, ToolSource};

/// Words signalling the goal intends to mutate state; their absence makes
/// risky tools less relevant.
const WRITE_INTENT: &[&str] = &[
    "write", "create", "update", "edit", "modify", "patch", "save", "delete", "exec", "run",
    "command", "shell",
];

/// Scores and selects a bounded subset of tools per goal.
#[derive(Debug, Clone, Copy)]
pub struct ToolBroker {
    max_tools: usize,
}

impl ToolBroker {
    pub fn new(max_tools: usize) -> Self {
        Self { max_tools }
    }

    /// Select at most `max_tools` tools for the goal. When the budget
    /// covers the whole set, the set is returned unchanged.
    pub fn select(&self, goal: &str, tools: &[ToolDescriptor]) -> Vec<ToolDescriptor> {
        if self.max_tools == 0 || tools.len() <= self.max_tools {
            tracing::debug!(count = tools.len(), reason = "within_budget", "broker select");
            return tools.to_vec();
        }

        let goal_lower = goal.to_lowercase();
        let goal_tokens = tokenize(&goal_lower);
        let write_intent = WRITE_INTENT.iter().any(|w| goal_tokens.contains(*w));
        let path_like = goal.contains('/') || goal.contains('\\');

        let mut scored: Vec<(i64, String, &ToolDescriptor)> = tools
            .iter()
            .map(|tool| {
                let (score, reason) =
                    score_tool(tool, &goal_lower, &goal_tokens, write_intent, path_like);
                (score, reason, tool)
            })
            .collect();

        // Highest score first; ties break on ascending lowercase name.
        scored.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| a.2.canonical_name().cmp(&b.2.canonical_name()))
        });

        for (score, reason, tool) in scored.iter().take(self.max_tools) {
            tracing::debug!(tool = %tool.def.name, score, reason = %reason, "broker selected");
        }

        scored
            .into_iter()
            .take(self.max_tools)
            .map(|(_, _, tool)| tool.clone())
            .collect()
    }
}

/// Split on whitespace after mapping punctuation to spaces.
fn tokenize(text: &str) -> HashSet<&str> {
    text.split(|c: char| c.is_whitespace() || matches!(c, '.' | '_' | '-' | '/' | ':' | ','))
        .filter(|t| !t.is_empty())
        .collect()
}

fn score_tool(
    tool: &ToolDescriptor,
    goal_lower: &str,
    goal_tokens: &HashSet<&str>,
    write_intent: bool,
    path_like: bool,
) -> (i64, String) {
    let mut score = 0i64;
    let mut reasons = Vec::new();

    let tag_tokens: HashSet<String> = tool
        .metadata
        .tags
        .iter()
        .map(|t| t.to_lowercase())
        .collect();
    for tag in &tag_tokens {
        if goal_tokens.contains(tag.as_str()) {
            score += 4;
            reasons.push(format!("tag:{tag}"));
        }
    }

    let capability_tokens: HashSet<String> = tool
        .metadata
        .capabilities
        .iter()
        .flat_map(|c| c.split('.'))
        .map(str::to_lowercase)
        .collect();
    for token in &capability_tokens {
        if goal_tokens.contains(token.as_str()) {
            score += 6;
            reasons.push(format!("capability:{token}"));
        }
    }

    if goal_lower.contains(&tool.canonical_name()) {
        score += 10;
        reasons.push("name_match".to_string());
    }

    if path_like && capability_tokens.contains("file") {
        score += 6;
        reasons.push("path_hint".to_string());
    }

    if !write_intent {
        match tool.metadata.risk {
            RiskLevel::High => {
                score -= 6;
                reasons.push("risk:high".to_string());
            }
            RiskLevel::Medium => {
                score -= 2;
                reasons.push("risk:medium".to_string());
            }
            RiskLevel::Low => {}
        }
    }

    if score == 0
        && matches!(
            tool.metadata.source,
            ToolSource::Builtin | ToolSource::Runtime
        )
    {
        score = 1;
        reasons.push("safe_baseline".to_string());
    }

    (score, reasons.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ToolDef, ToolMetadata};

    fn tool(
        name: &str,
        source: ToolSource,
        risk: RiskLevel,
        capabilities: &[&str],
        tags: &[&str],
    ) -> ToolDescriptor {
        ToolDescriptor::new(
            ToolDef::new(name, format!("the {name} tool"), serde_json::json!({})),
            ToolMetadata {
                source,
                capabilities: capabilities.iter().map(ToString::to_string).collect(),
                risk,
                tags: tags.iter().map(ToString::to_string).collect(),
            },
        )
    }

    fn catalogue() -> Vec<ToolDescriptor> {
        vec![
            tool("weather", ToolSource::Builtin, RiskLevel::Low, &["web.weather"], &["weather"]),
            tool("web_search", ToolSource::Builtin, RiskLevel::Low, &["web.search"], &["search"]),
            tool("file_read", ToolSource::Builtin, RiskLevel::Low, &["file.read"], &["file"]),
            tool("exec_command", ToolSource::Builtin, RiskLevel::High, &["exec.command"], &["shell"]),
            tool("db_admin", ToolSource::Community, RiskLevel::High, &["db.admin"], &["database"]),
        ]
    }

    #[test]
    fn test_within_budget_returns_all() {
        let broker = ToolBroker::new(10);
        let tools = catalogue();
        let selected = broker.select("anything at all", &tools);
        assert_eq!(selected.len(), tools.len());

        let broker = ToolBroker::new(0);
        assert_eq!(broker.select("goal", &tools).len(), tools.len());
    }

    #[test]
    fn test_budget_bound_holds() {
        let broker = ToolBroker::new(2);
        let selected = broker.select("check the weather in Oslo", &catalogue());
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_relevant_tool_ranked_first() {
        let broker = ToolBroker::new(2);
        let selected = broker.select("check the weather in Oslo", &catalogue());
        assert_eq!(selected[0].def.name, "weather");
    }

    #[test]
    fn test_risk_penalty_without_write_intent() {
        let broker = ToolBroker::new(3);
        let selected = broker.select("summarise the search results please", &catalogue());
        assert!(
            !selected.iter().any(|t| t.def.name == "db_admin"),
            "high-risk tool selected for a read-only goal"
        );
    }

    #[test]
    fn test_write_intent_lifts_penalty() {
        let broker = ToolBroker::new(3);
        let selected = broker.select("run the shell command to list files", &catalogue());
        assert!(selected.iter().any(|t| t.def.name == "exec_command"));
    }

    #[test]
    fn test_path_hint_boosts_file_capability() {
        let broker = ToolBroker::new(1);
        let selected = broker.select("summarise src/main.rs contents", &catalogue());
        assert_eq!(selected[0].def.name, "file_read");
    }

    #[test]
    fn test_ties_break_by_name() {
        let tools = vec![
            tool("zeta", ToolSource::Builtin, RiskLevel::Low, &[], &[]),
            tool("alpha", ToolSource::Builtin, RiskLevel::Low, &[], &[]),
            tool("mid", ToolSource::Builtin, RiskLevel::Low, &[], &[]),
        ];
        let broker = ToolBroker::new(2);
        let selected = broker.select("an unrelated goal", &tools);
        assert_eq!(selected[0].def.name, "alpha");
        assert_eq!(selected[1].def.name, "mid");
    }
}
