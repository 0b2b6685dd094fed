//! Session data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One role-tagged message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Per-user conversation state: selected model and bounded history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Selected model code; deliberately not validated
    pub model_code: String,
    /// Turns, oldest first
    pub history: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session using the given model code
    pub fn new(model_code: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            model_code: model_code.into(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a turn, then drop the oldest turns beyond `limit`
    pub fn push_turn(&mut self, turn: Turn, limit: usize) {
        self.history.push(turn);
        self.truncate_history(limit);
        self.updated_at = Utc::now();
    }

    /// Keep only the most recent `limit` turns, in their original order
    pub fn truncate_history(&mut self, limit: usize) {
        if self.history.len() > limit {
            let excess = self.history.len() - limit;
            self.history.drain(..excess);
        }
    }

    /// Drop the conversation but keep the selected model
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.updated_at = Utc::now();
    }

    pub fn set_model(&mut self, code: impl Into<String>) {
        self.model_code = code.into();
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let session = Session::new("gpt4o");
        assert_eq!(session.model_code, "gpt4o");
        assert!(session.history.is_empty());
    }

    #[test]
    fn test_push_35_keeps_last_30_in_order() {
        let mut session = Session::new("gpt4o");
        for i in 0..35 {
            session.push_turn(Turn::user(format!("Message {}", i)), 30);
        }

        assert_eq!(session.history.len(), 30);
        for (offset, turn) in session.history.iter().enumerate() {
            assert_eq!(turn.content, format!("Message {}", offset + 5));
        }
    }

    #[test]
    fn test_truncate_without_overflow_is_noop() {
        let mut session = Session::new("gpt4o");
        session.push_turn(Turn::user("a"), 30);
        session.push_turn(Turn::assistant("b"), 30);

        session.truncate_history(30);
        assert_eq!(session.history.len(), 2);

        let mut empty = Session::new("gpt4o");
        empty.truncate_history(30);
        assert!(empty.history.is_empty());
    }

    #[test]
    fn test_clear_history_keeps_model() {
        let mut session = Session::new("gpt4o");
        session.set_model("gpt5_syncing");
        session.push_turn(Turn::user("hello"), 30);

        session.clear_history();

        assert!(session.history.is_empty());
        assert_eq!(session.model_code, "gpt5_syncing");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        assert_eq!(Role::User.as_str(), "user");
    }
}
