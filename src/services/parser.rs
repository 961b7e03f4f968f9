//! Tolerant parser for structured model output.
//!
//! Model replies arrive as free text that should contain JSON: a plan step
//! list, a reflection object, or a sub-task decomposition. Parsing runs in
//! three stages: strip code fences, strict decode, then a balanced-bracket
//! scan that ignores bracket characters inside quoted strings. Strict mode
//! surfaces `InvalidModelOutput` when all stages fail; lenient mode falls
//! back to line-splitting for embedding callers that prefer a best-effort
//! read. The engine paths (planner, reflector, decomposer) are strict.

use serde_json::Value;

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{ControlSignal, PlanStep, Reflection, StepStatus, SubTask};

/// How unparseable input is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Fail with `InvalidModelOutput` when no canonical shape is found.
    Strict,
    /// Fall back to line-splitting heuristics.
    Lenient,
}

/// Object keys accepted as the item list in plan and decomposition output.
const LIST_KEYS: &[&str] = &["steps", "plan", "items", "tasks", "sub_tasks", "subtasks"];

/// Strip surrounding whitespace and a single markdown code fence.
pub fn strip_fences(input: &str) -> &str {
    let trimmed = input.trim();
    for prefix in ["```json", "```"] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            if let Some(inner) = rest.trim_start_matches(['\r', '\n']).strip_suffix("```") {
                return inner.trim();
            }
            // Unterminated fence: drop the opening marker only.
            return rest.trim();
        }
    }
    trimmed
}

/// Find the first balanced `[...]` or `{...}` region, ignoring bracket
/// characters inside double-quoted strings (backslash escapes respected).
pub fn extract_balanced(input: &str) -> Option<&str> {
    let bytes = input.as_bytes();
    let start = input.find(['[', '{'])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => depth += 1,
            b']' | b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&input[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Decode the outer JSON value, trying strict decode then balanced extraction.
fn decode_value(input: &str) -> Option<Value> {
    let stripped = strip_fences(input);
    if let Ok(value) = serde_json::from_str::<Value>(stripped) {
        return Some(value);
    }
    let candidate = extract_balanced(stripped)?;
    serde_json::from_str(candidate).ok()
}

/// Pull the item array out of a decoded value: a top-level array, or an
/// object carrying one of the accepted list keys.
fn item_list(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items.clone()),
        Value::Object(map) => LIST_KEYS
            .iter()
            .find_map(|key| map.get(*key))
            .and_then(Value::as_array)
            .cloned(),
        _ => None,
    }
}

/// Canonical string form of an id that may arrive as string or integer.
fn id_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn description_of(item: &Value) -> Option<String> {
    let text = match item {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("description")
            .or_else(|| map.get("desc"))
            .and_then(Value::as_str)
            .map(ToString::to_string)?,
        _ => return None,
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Line-splitting fallback used by lenient mode: each non-empty line
/// becomes one description, bullet markers removed.
fn split_lines(input: &str) -> Vec<String> {
    input
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '*'])
                .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')')
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// Parse a plan step list.
pub fn parse_plan_steps(input: &str, mode: ParseMode) -> AgentResult<Vec<PlanStep>> {
    let items = decode_value(input).and_then(|v| item_list(&v));

    let items = match (items, mode) {
        (Some(items), _) => items,
        (None, ParseMode::Strict) => {
            return Err(AgentError::InvalidModelOutput(format!(
                "no plan step list found in: {}",
                snippet(input)
            )))
        }
        (None, ParseMode::Lenient) => {
            return Ok(split_lines(input)
                .into_iter()
                .enumerate()
                .map(|(idx, description)| PlanStep::new(format!("step-{}", idx + 1), description))
                .collect())
        }
    };

    let mut steps = Vec::new();
    let mut seen_ids = std::collections::HashSet::new();
    for item in &items {
        let Some(description) = description_of(item) else {
            continue;
        };
        let id = match id_string(item.get("id")) {
            Some(id) if seen_ids.insert(id.clone()) => id,
            _ => fallback_id("step", steps.len() + 1, &mut seen_ids),
        };
        let status = item
            .get("status")
            .and_then(Value::as_str)
            .and_then(step_status_from_str)
            .unwrap_or(StepStatus::Pending);
        steps.push(PlanStep {
            id,
            description,
            status,
        });
    }
    Ok(steps)
}

/// Positional fallback id, bumped past any ids already taken.
fn fallback_id(
    prefix: &str,
    index: usize,
    seen_ids: &mut std::collections::HashSet<String>,
) -> String {
    let mut n = index;
    loop {
        let candidate = format!("{prefix}-{n}");
        if seen_ids.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn step_status_from_str(s: &str) -> Option<StepStatus> {
    match s.to_lowercase().as_str() {
        "pending" => Some(StepStatus::Pending),
        "completed" | "complete" | "done" => Some(StepStatus::Completed),
        "failed" => Some(StepStatus::Failed),
        _ => None,
    }
}

/// Parse a sub-task decomposition.
pub fn parse_sub_tasks(input: &str, mode: ParseMode) -> AgentResult<Vec<SubTask>> {
    let items = decode_value(input).and_then(|v| item_list(&v));

    let items = match (items, mode) {
        (Some(items), _) => items,
        (None, ParseMode::Strict) => {
            return Err(AgentError::InvalidModelOutput(format!(
                "no sub-task list found in: {}",
                snippet(input)
            )))
        }
        (None, ParseMode::Lenient) => {
            return Ok(split_lines(input)
                .into_iter()
                .enumerate()
                .map(|(idx, description)| {
                    SubTask::new(format!("task-{}", idx + 1), description)
                        .with_priority(u32::try_from(idx + 1).unwrap_or(u32::MAX))
                })
                .collect())
        }
    };

    let mut tasks: Vec<SubTask> = Vec::new();
    let mut seen_ids = std::collections::HashSet::new();
    for item in &items {
        let Some(description) = description_of(item) else {
            continue;
        };
        let index = tasks.len() + 1;
        let id = match id_string(item.get("id")) {
            Some(id) if seen_ids.insert(id.clone()) => id,
            _ => fallback_id("task", index, &mut seen_ids),
        };
        let priority = item
            .get("priority")
            .and_then(Value::as_u64)
            .and_then(|p| u32::try_from(p).ok())
            .unwrap_or_else(|| u32::try_from(index).unwrap_or(u32::MAX));

        let mut dependencies = Vec::new();
        if let Some(deps) = item.get("dependencies").and_then(Value::as_array) {
            for dep in deps {
                if let Some(dep_id) = id_string(Some(dep)) {
                    if dep_id != id && !dependencies.contains(&dep_id) {
                        dependencies.push(dep_id);
                    }
                }
            }
        }

        tasks.push(SubTask {
            id,
            description,
            priority,
            dependencies,
        });
    }
    Ok(tasks)
}

/// Parse a reflection object.
pub fn parse_reflection(input: &str, mode: ParseMode) -> AgentResult<Reflection> {
    let value = decode_value(input);

    let Some(Value::Object(map)) = value else {
        return match mode {
            ParseMode::Strict => Err(AgentError::InvalidModelOutput(format!(
                "no reflection object found in: {}",
                snippet(input)
            ))),
            ParseMode::Lenient => Ok(Reflection {
                analysis: input.trim().to_string(),
                signal: ControlSignal::Continue,
                new_memories: Vec::new(),
            }),
        };
    };

    let analysis = map
        .get("analysis")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    let raw_signal = map.get("next_action").and_then(Value::as_str);
    let signal = match raw_signal.and_then(ControlSignal::from_str) {
        Some(signal) => signal,
        None => match mode {
            ParseMode::Strict => {
                return Err(AgentError::InvalidModelOutput(format!(
                    "unknown control signal: {:?}",
                    raw_signal.unwrap_or("<missing>")
                )))
            }
            ParseMode::Lenient => ControlSignal::Continue,
        },
    };

    let new_memories = map
        .get("new_memories")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Reflection {
        analysis,
        signal,
        new_memories,
    })
}

fn snippet(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.len() <= 120 {
        trimmed.to_string()
    } else {
        let cut = trimmed
            .char_indices()
            .take_while(|(i, _)| *i < 120)
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        format!("{}...", &trimmed[..cut])
    }
}
