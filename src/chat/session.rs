use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::history::Transcript;
use crate::cortex::ServiceDescriptor;

/// Models offered for answer generation. The first entry is the default.
pub const MODELS: &[&str] = &["mistral-large2", "llama3.1-70b", "llama3.1-8b"];

pub const MIN_RETRIEVED_CHUNKS: u32 = 1;
pub const MAX_RETRIEVED_CHUNKS: u32 = 30;
pub const DEFAULT_RETRIEVED_CHUNKS: u32 = 5;

pub const MIN_CHAT_MESSAGES: u32 = 1;
pub const MAX_CHAT_MESSAGES: u32 = 10;
pub const DEFAULT_CHAT_MESSAGES: u32 = 5;

/// Per-session knobs, all adjustable between turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Search service to retrieve from. `None` falls back to the first
    /// discovered service at turn time.
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_retrieved_chunks")]
    pub num_retrieved_chunks: u32,
    #[serde(default = "default_chat_messages")]
    pub num_chat_messages: u32,
    #[serde(default = "default_use_chat_history")]
    pub use_chat_history: bool,
    #[serde(default)]
    pub debug: bool,
}

fn default_model() -> String {
    MODELS[0].to_string()
}

fn default_retrieved_chunks() -> u32 {
    DEFAULT_RETRIEVED_CHUNKS
}

fn default_chat_messages() -> u32 {
    DEFAULT_CHAT_MESSAGES
}

fn default_use_chat_history() -> bool {
    true
}

impl Default for ChatOptions {
    fn default() -> Self {
        ChatOptions {
            service: None,
            model: default_model(),
            num_retrieved_chunks: DEFAULT_RETRIEVED_CHUNKS,
            num_chat_messages: DEFAULT_CHAT_MESSAGES,
            use_chat_history: default_use_chat_history(),
            debug: false,
        }
    }
}

impl ChatOptions {
    pub fn validate(&self, services: &[ServiceDescriptor]) -> Result<(), String> {
        if !MODELS.contains(&self.model.as_str()) {
            return Err(format!("unknown model '{}'", self.model));
        }
        if self.num_retrieved_chunks < MIN_RETRIEVED_CHUNKS
            || self.num_retrieved_chunks > MAX_RETRIEVED_CHUNKS
        {
            return Err(format!(
                "num_retrieved_chunks must be between {} and {}",
                MIN_RETRIEVED_CHUNKS, MAX_RETRIEVED_CHUNKS
            ));
        }
        if self.num_chat_messages < MIN_CHAT_MESSAGES || self.num_chat_messages > MAX_CHAT_MESSAGES
        {
            return Err(format!(
                "num_chat_messages must be between {} and {}",
                MIN_CHAT_MESSAGES, MAX_CHAT_MESSAGES
            ));
        }
        if let Some(service) = &self.service {
            if !services.iter().any(|descriptor| &descriptor.name == service) {
                return Err(format!("unknown search service '{}'", service));
            }
        }
        Ok(())
    }
}

/// One conversation: its transcript, its options, and a gate that keeps
/// turns strictly sequential.
pub struct ChatSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Short-lived lock so mid-turn readers still see the in-flight
    /// user message.
    pub transcript: Mutex<Transcript>,
    pub options: Mutex<ChatOptions>,
    /// Held across a whole turn. Concurrent turns on one session queue
    /// here instead of interleaving.
    pub turn_gate: tokio::sync::Mutex<()>,
}

impl ChatSession {
    fn with_options(id: &str, options: ChatOptions) -> Self {
        ChatSession {
            id: id.to_string(),
            created_at: Utc::now(),
            transcript: Mutex::new(Transcript::default()),
            options: Mutex::new(options),
            turn_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn options_snapshot(&self) -> ChatOptions {
        match self.options.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_options(&self, options: ChatOptions) {
        match self.options.lock() {
            Ok(mut guard) => *guard = options,
            Err(poisoned) => *poisoned.into_inner() = options,
        }
    }

    pub fn with_transcript<R>(&self, f: impl FnOnce(&mut Transcript) -> R) -> R {
        match self.transcript.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

/// Sessions keyed by caller-chosen id, created on first touch.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<ChatSession>>>,
}

impl SessionStore {
    pub fn get_or_create(&self, id: &str) -> Arc<ChatSession> {
        self.get_or_create_with(id, ChatOptions::default())
    }

    /// Creates the session with the given starting options if it does not
    /// exist yet. Existing sessions keep the options they already have.
    pub fn get_or_create_with(&self, id: &str, defaults: ChatOptions) -> Arc<ChatSession> {
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(ChatSession::with_options(id, defaults)))
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<ChatSession>> {
        let sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.get(id).cloned()
    }
}
