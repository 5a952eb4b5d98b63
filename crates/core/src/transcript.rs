//! The conversation log.

use careline_model::ChatMessage;
use serde::{Deserialize, Serialize};

/// A single completed exchange: what the user said, and what the
/// assistant answered.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Turn {
    /// The user's input text.
    pub user: String,
    /// The assistant's reply, which may be the fallback text if the
    /// provider call failed.
    pub assistant: String,
}

impl Turn {
    /// Creates a turn from the two sides of an exchange.
    #[inline]
    pub fn new<U: Into<String>, A: Into<String>>(user: U, assistant: A) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }
}

/// An ordered log of completed turns.
///
/// The log only grows: a turn is appended after each exchange, and turns
/// are never edited or removed. It lives in the caller's session state
/// and is not persisted anywhere.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Creates an empty transcript.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a completed turn.
    #[inline]
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Returns the number of completed turns.
    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns `true` if no turn has completed yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Returns all completed turns in submission order.
    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Returns the last `n` turns, or all of them when fewer exist.
    #[inline]
    pub fn window(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// Renders the log as alternating role-tagged messages, oldest first.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.turns.len() * 2);
        for turn in &self.turns {
            messages.push(ChatMessage::User(turn.user.clone()));
            messages.push(ChatMessage::Assistant(turn.assistant.clone()));
        }
        messages
    }
}
