//! `memory_extraction_events` table: an audit row per extraction attempt, independent
//! of whether any facts resulted (§3, §4.6). Never read by any agent.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::client::ScyllaClient;
use crate::error::MemoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Extracted,
    ParseError,
    Disabled,
    Error,
}

impl ExtractionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionOutcome::Extracted => "extracted",
            ExtractionOutcome::ParseError => "parse_error",
            ExtractionOutcome::Disabled => "disabled",
            ExtractionOutcome::Error => "error",
        }
    }
}

#[async_trait]
pub trait ExtractionEventRepository: Send + Sync {
    async fn record(
        &self,
        user_id: i64,
        facts_extracted: u32,
        profile_updated: bool,
        outcome: ExtractionOutcome,
    ) -> Result<(), MemoryError>;
}

#[derive(Clone)]
pub struct ScyllaExtractionEventRepository {
    client: ScyllaClient,
}

impl ScyllaExtractionEventRepository {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExtractionEventRepository for ScyllaExtractionEventRepository {
    async fn record(
        &self,
        user_id: i64,
        facts_extracted: u32,
        profile_updated: bool,
        outcome: ExtractionOutcome,
    ) -> Result<(), MemoryError> {
        let query = format!(
            "INSERT INTO {}.memory_extraction_events (
                user_id, created_at, event_id, facts_extracted, profile_updated, outcome
            ) VALUES (?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                query,
                (
                    user_id,
                    Utc::now().timestamp_millis(),
                    Uuid::new_v4(),
                    facts_extracted as i32,
                    profile_updated,
                    outcome.as_str(),
                ),
            )
            .await?;
        Ok(())
    }
}
