//! Rolling chat transcript shared by the user, the assistant and the system.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default number of messages kept.
const DEFAULT_MAX_MESSAGES: usize = 200;

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person using the editor.
    User,
    /// The generation service.
    Assistant,
    /// The editor itself (errors and notices).
    System,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote it.
    pub role: Role,
    /// Message text.
    pub text: String,
}

/// Bounded message log; the oldest message is dropped when full.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    messages: VecDeque<Message>,
    max_messages: usize,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    /// Create an empty transcript with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_messages(DEFAULT_MAX_MESSAGES)
    }

    /// Create a transcript keeping at most `max_messages` (minimum 1).
    #[must_use]
    pub fn with_max_messages(max_messages: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            max_messages: max_messages.max(1),
        }
    }

    /// Append a message.
    pub fn push(&mut self, role: Role, text: impl Into<String>) {
        if self.messages.len() >= self.max_messages {
            self.messages.pop_front();
        }
        self.messages.push_back(Message {
            role,
            text: text.into(),
        });
    }

    /// Messages, oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Most recent message.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
