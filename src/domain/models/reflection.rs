//! Reflections and loop control signals.

use serde::{Deserialize, Serialize};

/// Loop directive emitted by the reflector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlSignal {
    Continue,
    Retry,
    Replan,
    Stop,
}

impl Default for ControlSignal {
    fn default() -> Self {
        Self::Continue
    }
}

impl ControlSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Retry => "retry",
            Self::Replan => "replan",
            Self::Stop => "stop",
        }
    }

    /// Case-insensitive mapping; unknown values yield `None`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "continue" => Some(Self::Continue),
            "retry" => Some(Self::Retry),
            "replan" => Some(Self::Replan),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }
}

/// The reflector's analysis of an action outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub analysis: String,
    #[serde(rename = "next_action", default)]
    pub signal: ControlSignal,
    #[serde(default)]
    pub new_memories: Vec<String>,
}

impl Reflection {
    pub fn new(analysis: impl Into<String>, signal: ControlSignal) -> Self {
        Self {
            analysis: analysis.into(),
            signal,
            new_memories: Vec::new(),
        }
    }
}
