//! `conversation_messages` (append-only) and `conversation_sessions` (§3). A session's
//! `message_count` is incremented in the same logical unit as the message insert
//! (§4.6 write path); the active-session pointer and `conversation_messages_by_user`
//! are denormalizations over the same facts, kept in sync by this repository.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use nexus_core::{ConversationMessage, ConversationSession, MessageRole};
use uuid::Uuid;

use crate::client::ScyllaClient;
use crate::error::MemoryError;

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn add_message(&self, message: &ConversationMessage) -> Result<(), MemoryError>;
    /// Last `limit` messages across all of the user's sessions, newest first.
    /// Does not deduplicate across overlapping session boundaries (§9 resolved open
    /// question — matches the prior source).
    async fn recent_messages_for_user(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>, MemoryError>;

    /// Idempotent: inserts a new session, or re-opens (`ended_at := null`) an existing
    /// one with the same id (§3/§4.6).
    async fn get_or_create_session(
        &self,
        session_id: &str,
        user_id: i64,
    ) -> Result<ConversationSession, MemoryError>;
    async fn get_active_session(&self, user_id: i64) -> Result<Option<ConversationSession>, MemoryError>;
    async fn end_session(&self, session_id: &str) -> Result<(), MemoryError>;

    /// Deletes messages older than `cutoff` by `created_at` only, ignoring a session's
    /// `ended_at` (§9 resolved open question — matches the prior source). Returns the
    /// count deleted.
    async fn cleanup_old_messages(&self, cutoff: DateTime<Utc>) -> Result<u64, MemoryError>;
}

#[derive(Clone)]
pub struct ScyllaConversationRepository {
    client: ScyllaClient,
}

impl ScyllaConversationRepository {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    async fn increment_message_count(&self, session_id: &str) -> Result<(), MemoryError> {
        // Scylla has no atomic increment on a plain INT without a counter table; this
        // read-modify-write is acceptable because message inserts for one session are
        // already serialized by the per-user turn lock (§5).
        let select = format!(
            "SELECT message_count FROM {}.conversation_sessions WHERE session_id = ?",
            self.client.keyspace()
        );
        let result = self.client.session().query_unpaged(select, (session_id,)).await?;
        let current: i32 = result
            .rows
            .and_then(|rows| rows.into_iter().next())
            .and_then(|row| row.into_typed::<(i32,)>().ok())
            .map(|(count,)| count)
            .unwrap_or(0);

        let update = format!(
            "UPDATE {}.conversation_sessions SET message_count = ? WHERE session_id = ?",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(update, (current + 1, session_id))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ConversationRepository for ScyllaConversationRepository {
    async fn add_message(&self, message: &ConversationMessage) -> Result<(), MemoryError> {
        let role = message.role.as_str();
        let agent_type = message.agent_type.map(|a| a.as_str().to_string());
        let created_at_ms = message.created_at.timestamp_millis();

        let by_session = format!(
            "INSERT INTO {}.conversation_messages (
                session_id, created_at, message_id, user_id, role, content, agent_type, tokens_used, processing_time_ms
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                by_session,
                (
                    &message.session_id,
                    created_at_ms,
                    message.id,
                    message.user_id,
                    role,
                    &message.content,
                    &agent_type,
                    message.tokens_used.map(|t| t as i32),
                    message.processing_time_ms.map(|t| t as i32),
                ),
            )
            .await?;

        let by_user = format!(
            "INSERT INTO {}.conversation_messages_by_user (
                user_id, created_at, message_id, session_id, role, content, agent_type, tokens_used, processing_time_ms
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                by_user,
                (
                    message.user_id,
                    created_at_ms,
                    message.id,
                    &message.session_id,
                    role,
                    &message.content,
                    &agent_type,
                    message.tokens_used.map(|t| t as i32),
                    message.processing_time_ms.map(|t| t as i32),
                ),
            )
            .await?;

        self.increment_message_count(&message.session_id).await?;
        Ok(())
    }

    async fn recent_messages_for_user(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>, MemoryError> {
        let query = format!(
            "SELECT user_id, created_at, message_id, session_id, role, content, agent_type, tokens_used, processing_time_ms
             FROM {}.conversation_messages_by_user WHERE user_id = ? LIMIT ?",
            self.client.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(query, (user_id, limit as i32))
            .await?;
        let Some(rows) = result.rows else { return Ok(Vec::new()) };

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            #[allow(clippy::type_complexity)]
            let (
                user_id,
                created_at,
                message_id,
                session_id,
                role,
                content,
                agent_type,
                tokens_used,
                processing_time_ms,
            ): (i64, i64, Uuid, String, String, String, Option<String>, Option<i32>, Option<i32>) =
                row.into_typed().map_err(|e| MemoryError::Serialization(e.to_string()))?;

            messages.push(ConversationMessage {
                id: message_id,
                user_id,
                session_id,
                role: parse_role(&role),
                content,
                agent_type: agent_type.and_then(|a| parse_agent_type(&a)),
                tokens_used: tokens_used.map(|t| t as u32),
                processing_time_ms: processing_time_ms.map(|t| t as u32),
                created_at: millis_to_datetime(created_at),
            });
        }
        // `conversation_messages_by_user` clusters newest-first already; returned as-is.
        Ok(messages)
    }

    async fn get_or_create_session(
        &self,
        session_id: &str,
        user_id: i64,
    ) -> Result<ConversationSession, MemoryError> {
        let select = format!(
            "SELECT session_id, user_id, started_at, ended_at, message_count, metadata_json
             FROM {}.conversation_sessions WHERE session_id = ?",
            self.client.keyspace()
        );
        let result = self.client.session().query_unpaged(select, (session_id,)).await?;

        if let Some(row) = result.rows.and_then(|rows| rows.into_iter().next()) {
            let (id, user_id, started_at, ended_at, message_count, metadata_json): (
                String,
                i64,
                i64,
                Option<i64>,
                i32,
                Option<String>,
            ) = row.into_typed().map_err(|e| MemoryError::Serialization(e.to_string()))?;

            if ended_at.is_some() {
                self.reopen_session(&id).await?;
            }

            return Ok(ConversationSession {
                id,
                user_id,
                started_at: millis_to_datetime(started_at),
                ended_at: None,
                message_count: message_count as u32,
                metadata: parse_metadata(metadata_json.as_deref())?,
            });
        }

        let session = ConversationSession::new(session_id, user_id);
        self.insert_session(&session).await?;
        self.set_active_session(user_id, session_id).await?;
        Ok(session)
    }

    async fn get_active_session(&self, user_id: i64) -> Result<Option<ConversationSession>, MemoryError> {
        let select = format!(
            "SELECT session_id FROM {}.active_sessions_by_user WHERE user_id = ?",
            self.client.keyspace()
        );
        let result = self.client.session().query_unpaged(select, (user_id,)).await?;
        let Some((session_id,)) = result
            .rows
            .and_then(|rows| rows.into_iter().next())
            .and_then(|row| row.into_typed::<(String,)>().ok())
        else {
            return Ok(None);
        };

        let select_session = format!(
            "SELECT session_id, user_id, started_at, ended_at, message_count, metadata_json
             FROM {}.conversation_sessions WHERE session_id = ?",
            self.client.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(select_session, (session_id,))
            .await?;
        let Some(row) = result.rows.and_then(|rows| rows.into_iter().next()) else { return Ok(None) };

        let (id, user_id, started_at, ended_at, message_count, metadata_json): (
            String,
            i64,
            i64,
            Option<i64>,
            i32,
            Option<String>,
        ) = row.into_typed().map_err(|e| MemoryError::Serialization(e.to_string()))?;

        if ended_at.is_some() {
            return Ok(None);
        }

        Ok(Some(ConversationSession {
            id,
            user_id,
            started_at: millis_to_datetime(started_at),
            ended_at: None,
            message_count: message_count as u32,
            metadata: parse_metadata(metadata_json.as_deref())?,
        }))
    }

    async fn end_session(&self, session_id: &str) -> Result<(), MemoryError> {
        let update = format!(
            "UPDATE {}.conversation_sessions SET ended_at = ? WHERE session_id = ?",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(update, (Utc::now().timestamp_millis(), session_id))
            .await?;
        Ok(())
    }

    async fn cleanup_old_messages(&self, cutoff: DateTime<Utc>) -> Result<u64, MemoryError> {
        let select = format!(
            "SELECT session_id, created_at, message_id FROM {}.conversation_messages",
            self.client.keyspace()
        );
        let result = self.client.session().query_unpaged(select, &[]).await?;
        let Some(rows) = result.rows else { return Ok(0) };

        let cutoff_ms = cutoff.timestamp_millis();
        let mut deleted = 0u64;
        for row in rows {
            let (session_id, created_at, message_id): (String, i64, Uuid) =
                row.into_typed().map_err(|e| MemoryError::Serialization(e.to_string()))?;
            if created_at >= cutoff_ms {
                continue;
            }
            let delete = format!(
                "DELETE FROM {}.conversation_messages WHERE session_id = ? AND created_at = ? AND message_id = ?",
                self.client.keyspace()
            );
            self.client
                .session()
                .query_unpaged(delete, (session_id, created_at, message_id))
                .await?;
            deleted += 1;
        }
        Ok(deleted)
    }
}

impl ScyllaConversationRepository {
    async fn insert_session(&self, session: &ConversationSession) -> Result<(), MemoryError> {
        let metadata_json = serde_json::to_string(&session.metadata)?;
        let insert = format!(
            "INSERT INTO {}.conversation_sessions (
                session_id, user_id, started_at, ended_at, message_count, metadata_json
            ) VALUES (?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                insert,
                (
                    &session.id,
                    session.user_id,
                    session.started_at.timestamp_millis(),
                    session.ended_at.map(|d| d.timestamp_millis()),
                    session.message_count as i32,
                    metadata_json,
                ),
            )
            .await?;
        Ok(())
    }

    async fn reopen_session(&self, session_id: &str) -> Result<(), MemoryError> {
        let update = format!(
            "UPDATE {}.conversation_sessions SET ended_at = null WHERE session_id = ?",
            self.client.keyspace()
        );
        self.client.session().query_unpaged(update, (session_id,)).await?;
        Ok(())
    }

    async fn set_active_session(&self, user_id: i64, session_id: &str) -> Result<(), MemoryError> {
        let insert = format!(
            "INSERT INTO {}.active_sessions_by_user (user_id, session_id) VALUES (?, ?)",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(insert, (user_id, session_id))
            .await?;
        Ok(())
    }
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_else(Utc::now)
}

fn parse_role(s: &str) -> MessageRole {
    match s {
        "system" => MessageRole::System,
        "assistant" => MessageRole::Assistant,
        _ => MessageRole::User,
    }
}

fn parse_agent_type(s: &str) -> Option<nexus_core::AgentType> {
    nexus_core::AgentType::ALL.iter().copied().find(|t| t.as_str() == s)
}

fn parse_metadata(json: Option<&str>) -> Result<HashMap<String, serde_json::Value>, MemoryError> {
    Ok(json.map(serde_json::from_str).transpose()?.unwrap_or_default())
}
