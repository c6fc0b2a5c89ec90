//! In-memory per-user turn state. Mutated only by that user's turn task (§5).

use crate::agent_type::AgentType;
use crate::message::Message;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};

/// Bounded ordered history plus bookkeeping for one user's ongoing conversation.
///
/// Insertion past `max_history` evicts the oldest message — the history is a ring, not a
/// growing log; the durable log lives in the memory subsystem.
#[derive(Debug, Clone)]
pub struct DialogContext {
    pub session_id: String,
    pub user_id: i64,
    history: VecDeque<Message>,
    max_history: usize,
    pub message_count: u64,
    pub current_agent: Option<AgentType>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl DialogContext {
    pub fn new(user_id: i64, session_id: impl Into<String>, max_history: usize) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            user_id,
            history: VecDeque::with_capacity(max_history),
            max_history,
            message_count: 0,
            current_agent: None,
            metadata: HashMap::new(),
            created_at: now,
            last_active_at: now,
        }
    }

    /// Append a message, evicting the oldest entry once `max_history` is exceeded.
    /// `message_count` still increments on an evicting insert (§8 boundary behavior).
    pub fn push(&mut self, message: Message) {
        if self.history.len() >= self.max_history && self.max_history > 0 {
            self.history.pop_front();
        }
        self.history.push_back(message);
        self.message_count += 1;
        self.last_active_at = Utc::now();
    }

    pub fn history(&self) -> &VecDeque<Message> {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_evicts_oldest_past_cap() {
        let mut ctx = DialogContext::new(1, "s1", 2);
        ctx.push(Message::user("one"));
        ctx.push(Message::user("two"));
        ctx.push(Message::user("three"));

        assert_eq!(ctx.history().len(), 2);
        assert_eq!(ctx.history()[0].content, "two");
        assert_eq!(ctx.history()[1].content, "three");
        assert_eq!(ctx.message_count, 3);
    }

    #[test]
    fn zero_cap_keeps_no_history_but_still_counts() {
        let mut ctx = DialogContext::new(1, "s1", 0);
        ctx.push(Message::user("x"));
        assert_eq!(ctx.history().len(), 0);
        assert_eq!(ctx.message_count, 1);
    }
}
