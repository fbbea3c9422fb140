use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    pub fn user(content: &str) -> Self {
        StoredMessage {
            role: Role::User,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        StoredMessage {
            role: Role::Assistant,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Append-only conversation record for one session.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<StoredMessage>,
}

impl Transcript {
    pub fn push_user(&mut self, content: &str) {
        self.messages.push(StoredMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.messages.push(StoredMessage::assistant(content));
    }

    pub fn messages(&self) -> &[StoredMessage] {
        &self.messages
    }

    pub fn snapshot(&self) -> Vec<StoredMessage> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Sliding window used as rewrite context: the last `k` messages up to
    /// but excluding the most recent one. Callers take the window right
    /// after pushing the in-flight user message, so that message never
    /// feeds back into its own rewrite.
    pub fn window_before_latest(&self, k: usize) -> Vec<StoredMessage> {
        if self.messages.is_empty() {
            return Vec::new();
        }
        let end = self.messages.len() - 1;
        let start = self.messages.len().saturating_sub(k).min(end);
        self.messages[start..end].to_vec()
    }
}
