//! Append-only conversation log records: messages and their owning sessions.

use crate::agent_type::AgentType;
use crate::message::MessageRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A persisted turn-message. Append-only within a session; no update path exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: Uuid,
    pub user_id: i64,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    pub agent_type: Option<AgentType>,
    pub tokens_used: Option<u32>,
    pub processing_time_ms: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn new(
        user_id: i64,
        session_id: impl Into<String>,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            session_id: session_id.into(),
            role,
            content: content.into(),
            agent_type: None,
            tokens_used: None,
            processing_time_ms: None,
            created_at: Utc::now(),
        }
    }
}

/// A contiguous span of conversation. At most one session per user has `ended_at = None`
/// ("the active session") at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: String,
    pub user_id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub message_count: u32,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ConversationSession {
    pub fn new(id: impl Into<String>, user_id: i64) -> Self {
        Self {
            id: id.into(),
            user_id,
            started_at: Utc::now(),
            ended_at: None,
            message_count: 0,
            metadata: HashMap::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Re-open a closed session, matching the upsert-by-`session_id` semantics of
    /// `get_or_create_session` (§4.6): a conflicting insert re-opens rather than erroring.
    pub fn reopen(&mut self) {
        self.ended_at = None;
    }

    pub fn end(&mut self) {
        self.ended_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_active() {
        let s = ConversationSession::new("sess-1", 1);
        assert!(s.is_active());
    }

    #[test]
    fn reopen_clears_ended_at() {
        let mut s = ConversationSession::new("sess-1", 1);
        s.end();
        assert!(!s.is_active());
        s.reopen();
        assert!(s.is_active());
    }
}
