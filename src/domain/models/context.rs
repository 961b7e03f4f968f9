//! Per-run cognitive context with token-budgeted pruning.
//!
//! The context is exclusively owned by one engine run. Every mutation is
//! followed by a prune pass, so the estimated token total never exceeds
//! the configured budget.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::message::Message;
use super::plan::Plan;
use super::reflection::Reflection;
use super::tool::ToolDescriptor;

/// Approximate characters per token (conservative heuristic).
const CHARS_PER_TOKEN: usize = 4;

/// Estimate the number of tokens in a string.
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() + CHARS_PER_TOKEN - 1) / CHARS_PER_TOKEN
}

fn message_tokens(msg: &Message) -> usize {
    let call_chars: usize = msg
        .tool_calls
        .iter()
        .map(|c| c.name.len() + c.input.len())
        .sum();
    estimate_tokens(&msg.content) + (call_chars + CHARS_PER_TOKEN - 1) / CHARS_PER_TOKEN
}

/// Dynamic state for a single goal run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CognitiveContext {
    pub session_id: String,
    pub workspace_id: String,
    /// Tools visible to this run, injected before the run starts.
    #[serde(default)]
    pub available_tools: Vec<ToolDescriptor>,
    #[serde(default)]
    pub available_skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_context: Option<String>,
    /// Conversation history, pruned to the token budget.
    #[serde(default)]
    pub history: Vec<Message>,
    /// Retrieved facts, pruned to the token budget.
    #[serde(default)]
    pub memories: Vec<String>,
    /// Reflection analyses; the newest entries are retained under pressure.
    #[serde(default)]
    pub scratchpad: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    /// Index of the plan step the run is nominally on.
    #[serde(default)]
    pub step_cursor: usize,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Maximum estimated context tokens; 0 disables pruning.
    #[serde(default)]
    pub token_budget: usize,
}

impl CognitiveContext {
    pub fn new(session_id: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            workspace_id: workspace_id.into(),
            ..Default::default()
        }
    }

    pub fn with_token_budget(mut self, budget: usize) -> Self {
        self.token_budget = budget;
        self
    }

    /// Append a history message and prune.
    pub fn push_history(&mut self, message: Message) {
        self.history.push(message);
        self.prune();
    }

    /// Add memories, skipping duplicates, and prune.
    pub fn extend_memories<I, S>(&mut self, facts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for fact in facts {
            let fact = fact.into();
            if !fact.trim().is_empty() && !self.memories.contains(&fact) {
                self.memories.push(fact);
            }
        }
        self.prune();
    }

    /// Append a scratchpad entry and prune.
    pub fn push_scratchpad(&mut self, entry: impl Into<String>) {
        self.scratchpad.push(entry.into());
        self.prune();
    }

    /// Apply a reflection: analysis joins the scratchpad, new memories are
    /// deduplicated in.
    pub fn apply_reflection(&mut self, reflection: &Reflection) {
        if !reflection.analysis.trim().is_empty() {
            self.scratchpad.push(reflection.analysis.clone());
        }
        self.extend_memories(reflection.new_memories.iter().cloned());
    }

    pub fn set_plan(&mut self, plan: Plan) {
        self.plan = Some(plan);
        self.step_cursor = 0;
        self.prune();
    }

    /// Estimated token total over the prunable sections.
    pub fn estimated_tokens(&self) -> usize {
        let plan = self
            .plan
            .as_ref()
            .map_or(0, |p| estimate_tokens(&p.raw));
        let scratchpad: usize = self.scratchpad.iter().map(|s| estimate_tokens(s)).sum();
        let memories: usize = self.memories.iter().map(|m| estimate_tokens(m)).sum();
        let history: usize = self.history.iter().map(message_tokens).sum();
        plan + scratchpad + memories + history
    }

    /// Drop context in priority order until the estimate fits the budget.
    ///
    /// Retention priority, highest first: the current plan (always kept),
    /// the scratchpad tail, the memories head, the history tail. If the
    /// plan alone exceeds the budget, everything else is dropped.
    pub fn prune(&mut self) {
        if self.token_budget == 0 {
            return;
        }

        let plan_tokens = self
            .plan
            .as_ref()
            .map_or(0, |p| estimate_tokens(&p.raw));

        if plan_tokens >= self.token_budget {
            self.scratchpad.clear();
            self.memories.clear();
            self.history.clear();
            return;
        }

        let mut remaining = self.token_budget - plan_tokens;

        // Scratchpad: keep the longest suffix that fits.
        let mut keep_from = self.scratchpad.len();
        for (idx, entry) in self.scratchpad.iter().enumerate().rev() {
            let cost = estimate_tokens(entry);
            if cost > remaining {
                break;
            }
            remaining -= cost;
            keep_from = idx;
        }
        self.scratchpad.drain(..keep_from);

        // Memories: keep the longest prefix that fits.
        let mut keep_until = 0;
        for memory in &self.memories {
            let cost = estimate_tokens(memory);
            if cost > remaining {
                break;
            }
            remaining -= cost;
            keep_until += 1;
        }
        self.memories.truncate(keep_until);

        // History: keep the longest suffix that fits, order preserved.
        let mut keep_from = self.history.len();
        for (idx, message) in self.history.iter().enumerate().rev() {
            let cost = message_tokens(message);
            if cost > remaining {
                break;
            }
            remaining -= cost;
            keep_from = idx;
        }
        self.history.drain(..keep_from);
    }

    /// Seed a child context for a sub-task run: identity, tools, skills,
    /// and metadata are copied; history, scratchpad, and plan are not.
    pub fn derive_child(&self) -> Self {
        Self {
            session_id: self.session_id.clone(),
            workspace_id: self.workspace_id.clone(),
            available_tools: self.available_tools.clone(),
            available_skills: self.available_skills.clone(),
            skill_context: self.skill_context.clone(),
            metadata: self.metadata.clone(),
            token_budget: self.token_budget,
            ..Default::default()
        }
    }
}
