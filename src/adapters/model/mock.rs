//! Mock model client for testing.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{Message, RunContext, ToolDef};
use crate::domain::ports::{ChatCompletion, ModelClient};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Complete(String),
    Chat(ChatCompletion),
    Fail(String),
}

/// Scripted model client: replies are consumed in order, calls recorded.
///
/// `complete` and `chat_complete` draw from separate queues so a test can
/// interleave planner, thinker, and reflector traffic deterministically.
pub struct MockModelClient {
    completions: Mutex<VecDeque<MockReply>>,
    chats: Mutex<VecDeque<MockReply>>,
    default_completion: Option<String>,
    default_chat: Option<ChatCompletion>,
    complete_log: Mutex<Vec<String>>,
    chat_log: Mutex<Vec<(Vec<Message>, Vec<ToolDef>)>>,
}

impl MockModelClient {
    pub fn new() -> Self {
        Self {
            completions: Mutex::new(VecDeque::new()),
            chats: Mutex::new(VecDeque::new()),
            default_completion: None,
            default_chat: None,
            complete_log: Mutex::new(Vec::new()),
            chat_log: Mutex::new(Vec::new()),
        }
    }

    /// Client that answers every call the same way, regardless of order.
    /// Useful when calls arrive from concurrent runs.
    pub fn uniform(completion: impl Into<String>, chat: ChatCompletion) -> Self {
        Self {
            default_completion: Some(completion.into()),
            default_chat: Some(chat),
            ..Self::new()
        }
    }

    /// Client whose `complete` calls return the given texts in order.
    pub fn completing(texts: Vec<String>) -> Self {
        let client = Self::new();
        for text in texts {
            client.push_completion(text);
        }
        client
    }

    /// Client whose `chat_complete` calls return the given completions in order.
    pub fn chatting(completions: Vec<ChatCompletion>) -> Self {
        let client = Self::new();
        for completion in completions {
            client.push_chat(completion);
        }
        client
    }

    pub fn push_completion(&self, text: impl Into<String>) {
        self.completions
            .lock()
            .unwrap()
            .push_back(MockReply::Complete(text.into()));
    }

    pub fn push_completion_failure(&self, error: impl Into<String>) {
        self.completions
            .lock()
            .unwrap()
            .push_back(MockReply::Fail(error.into()));
    }

    pub fn push_chat(&self, completion: ChatCompletion) {
        self.chats
            .lock()
            .unwrap()
            .push_back(MockReply::Chat(completion));
    }

    pub fn push_chat_failure(&self, error: impl Into<String>) {
        self.chats
            .lock()
            .unwrap()
            .push_back(MockReply::Fail(error.into()));
    }

    /// Number of `complete` calls observed.
    pub fn complete_calls(&self) -> usize {
        self.complete_log.lock().unwrap().len()
    }

    /// Number of `chat_complete` calls observed.
    pub fn chat_calls(&self) -> usize {
        self.chat_log.lock().unwrap().len()
    }

    /// Prompts passed to `complete`, in order.
    pub fn complete_prompts(&self) -> Vec<String> {
        self.complete_log.lock().unwrap().clone()
    }

    /// The last message list and tool set passed to `chat_complete`.
    pub fn last_chat_request(&self) -> Option<(Vec<Message>, Vec<ToolDef>)> {
        self.chat_log.lock().unwrap().last().cloned()
    }
}

impl Default for MockModelClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn complete(&self, _ctx: &RunContext, prompt: &str) -> AgentResult<String> {
        self.complete_log.lock().unwrap().push(prompt.to_string());
        match self.completions.lock().unwrap().pop_front() {
            Some(MockReply::Complete(text)) => Ok(text),
            Some(MockReply::Fail(error)) => Err(AgentError::Transient(error)),
            Some(MockReply::Chat(_)) => Err(AgentError::Internal(
                "chat reply scripted where completion expected".to_string(),
            )),
            None => self.default_completion.clone().ok_or_else(|| {
                AgentError::Internal("mock model has no completion scripted".to_string())
            }),
        }
    }

    async fn chat_complete(
        &self,
        _ctx: &RunContext,
        messages: &[Message],
        tools: &[ToolDef],
    ) -> AgentResult<ChatCompletion> {
        self.chat_log
            .lock()
            .unwrap()
            .push((messages.to_vec(), tools.to_vec()));
        match self.chats.lock().unwrap().pop_front() {
            Some(MockReply::Chat(completion)) => Ok(completion),
            Some(MockReply::Fail(error)) => Err(AgentError::Transient(error)),
            Some(MockReply::Complete(_)) => Err(AgentError::Internal(
                "completion scripted where chat reply expected".to_string(),
            )),
            None => self.default_chat.clone().ok_or_else(|| {
                AgentError::Internal("mock model has no chat completion scripted".to_string())
            }),
        }
    }
}
