//! The memory service: high-level read/write over the repositories, assembling the
//! per-turn [`UserMemoryContext`] snapshot (§4.6).

use std::sync::Arc;

use chrono::{Duration, Utc};
use nexus_core::{
    ConversationMessage, ConversationSession, MessageRole, ProfileFact, User, UserMemoryContext,
    UserProfile,
};

use crate::error::MemoryError;
use crate::repositories::extraction_events::ExtractionOutcome;
use crate::repositories::{
    ConversationRepository, ExtractionEventRepository, FactRepository, ProfileRepository,
    UserRepository,
};

/// Cheap per-user summary built from one `get_memory_context` call with history
/// disabled (§1.2 supplemented feature).
#[derive(Debug, Clone)]
pub struct UserStats {
    pub has_profile: bool,
    pub fact_count: usize,
    pub message_count: u32,
    pub has_active_session: bool,
}

/// Counts from one housekeeping sweep (§1.2, §4.6).
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupStats {
    pub messages_deleted: u64,
    pub facts_deleted: u64,
}

pub struct MemoryService {
    users: Arc<dyn UserRepository>,
    profiles: Arc<dyn ProfileRepository>,
    facts: Arc<dyn FactRepository>,
    conversations: Arc<dyn ConversationRepository>,
    extraction_events: Arc<dyn ExtractionEventRepository>,
    cleanup_days: i64,
}

impl MemoryService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        profiles: Arc<dyn ProfileRepository>,
        facts: Arc<dyn FactRepository>,
        conversations: Arc<dyn ConversationRepository>,
        extraction_events: Arc<dyn ExtractionEventRepository>,
        cleanup_days: i64,
    ) -> Self {
        Self { users, profiles, facts, conversations, extraction_events, cleanup_days }
    }

    /// Upsert-by-id; called on first contact and on every subsequent turn (§3 Lifecycle).
    pub async fn upsert_user(&self, user: &User) -> Result<(), MemoryError> {
        self.users.upsert(user).await
    }

    pub async fn get_or_create_session(
        &self,
        session_id: &str,
        user_id: i64,
    ) -> Result<ConversationSession, MemoryError> {
        self.conversations.get_or_create_session(session_id, user_id).await
    }

    /// Assembles a [`UserMemoryContext`] snapshot: looks up or synthesizes an empty user
    /// (reads on an unknown user never fail with not-found, §4.6 invariant), fetches the
    /// profile, facts ordered by recency, the last `history_limit` messages, and the
    /// active session.
    pub async fn get_memory_context(
        &self,
        user_id: i64,
        include_history: bool,
        history_limit: usize,
    ) -> Result<UserMemoryContext, MemoryError> {
        let user = self.users.get(user_id).await?.unwrap_or_else(|| User::ephemeral(user_id));
        let profile = self.profiles.get(user_id).await?;
        let facts = self.facts.list_for_user(user_id).await?;
        let recent_messages = if include_history {
            self.conversations.recent_messages_for_user(user_id, history_limit).await?
        } else {
            Vec::new()
        };
        let current_session = self.conversations.get_active_session(user_id).await?;

        Ok(UserMemoryContext { user, profile, facts, recent_messages, current_session })
    }

    /// Inserts a message and increments the owning session's `message_count` in the
    /// same logical unit (§4.6 write path).
    pub async fn add_message(
        &self,
        user_id: i64,
        session_id: &str,
        role: MessageRole,
        content: &str,
        agent_type: Option<nexus_core::AgentType>,
        tokens_used: Option<u32>,
        processing_time_ms: Option<u32>,
    ) -> Result<ConversationMessage, MemoryError> {
        let mut message = ConversationMessage::new(user_id, session_id, role, content);
        message.agent_type = agent_type;
        message.tokens_used = tokens_used;
        message.processing_time_ms = processing_time_ms;
        self.conversations.add_message(&message).await?;
        Ok(message)
    }

    /// Point-update a fact: replaces value/confidence/source/expiry, never creates
    /// history (§4.6 invariant).
    pub async fn upsert_fact(&self, fact: &ProfileFact) -> Result<(), MemoryError> {
        self.facts.upsert(fact).await
    }

    pub async fn get_profile(&self, user_id: i64) -> Result<Option<UserProfile>, MemoryError> {
        self.profiles.get(user_id).await
    }

    pub async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), MemoryError> {
        self.profiles.upsert(profile).await
    }

    pub async fn record_extraction_event(
        &self,
        user_id: i64,
        facts_extracted: u32,
        profile_updated: bool,
        outcome: ExtractionOutcome,
    ) -> Result<(), MemoryError> {
        self.extraction_events
            .record(user_id, facts_extracted, profile_updated, outcome)
            .await
    }

    /// `cleanup_old_messages(cleanup_days)` (by `created_at` only, §9 resolved open
    /// question) plus `delete_expired_facts()` (§1.2).
    pub async fn cleanup_old_data(&self) -> Result<CleanupStats, MemoryError> {
        let cutoff = Utc::now() - Duration::days(self.cleanup_days);
        let messages_deleted = self.conversations.cleanup_old_messages(cutoff).await?;
        let facts_deleted = self.facts.delete_expired(Utc::now()).await?;
        Ok(CleanupStats { messages_deleted, facts_deleted })
    }

    pub async fn get_user_stats(&self, user_id: i64) -> Result<UserStats, MemoryError> {
        let context = self.get_memory_context(user_id, false, 0).await?;
        Ok(UserStats {
            has_profile: context.profile.is_some(),
            fact_count: context.facts.len(),
            message_count: context.current_session.as_ref().map(|s| s.message_count).unwrap_or(0),
            has_active_session: context.current_session.is_some(),
        })
    }
}
