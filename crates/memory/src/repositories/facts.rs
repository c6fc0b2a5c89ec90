//! `profile_facts` table, clustered on `(fact_type, fact_key)` under partition `user_id`
//! so that uniqueness on `(user_id, fact_type, fact_key)` (§3) is the clustering key
//! itself: an upsert is a plain `INSERT` that replaces the existing row in place.

use chrono::{DateTime, TimeZone, Utc};
use async_trait::async_trait;
use nexus_core::ProfileFact;
use uuid::Uuid;

use crate::client::ScyllaClient;
use crate::error::MemoryError;

#[async_trait]
pub trait FactRepository: Send + Sync {
    async fn upsert(&self, fact: &ProfileFact) -> Result<(), MemoryError>;
    /// Facts for `user_id`, most-recently-updated first.
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<ProfileFact>, MemoryError>;
    /// Delete expired facts across every user; returns the count deleted. A full-table
    /// scan, acceptable for an infrequent housekeeping sweep (§4.6 Housekeeping).
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, MemoryError>;
}

#[derive(Clone)]
pub struct ScyllaFactRepository {
    client: ScyllaClient,
}

impl ScyllaFactRepository {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FactRepository for ScyllaFactRepository {
    async fn upsert(&self, fact: &ProfileFact) -> Result<(), MemoryError> {
        let query = format!(
            "INSERT INTO {}.profile_facts (
                user_id, fact_type, fact_key, fact_id, fact_value, confidence, source, expires_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                query,
                (
                    fact.user_id,
                    &fact.fact_type,
                    &fact.fact_key,
                    fact.id,
                    &fact.fact_value,
                    fact.confidence,
                    &fact.source,
                    fact.expires_at.map(|d| d.timestamp_millis()),
                    Utc::now().timestamp_millis(),
                ),
            )
            .await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<ProfileFact>, MemoryError> {
        let query = format!(
            "SELECT user_id, fact_type, fact_key, fact_id, fact_value, confidence, source, expires_at, updated_at
             FROM {}.profile_facts WHERE user_id = ?",
            self.client.keyspace()
        );
        let result = self.client.session().query_unpaged(query, (user_id,)).await?;
        let Some(rows) = result.rows else { return Ok(Vec::new()) };

        let mut facts_with_ts: Vec<(i64, ProfileFact)> = Vec::with_capacity(rows.len());
        for row in rows {
            let (user_id, fact_type, fact_key, fact_id, fact_value, confidence, source, expires_at, updated_at): (
                i64,
                String,
                String,
                Uuid,
                String,
                f32,
                Option<String>,
                Option<i64>,
                i64,
            ) = row.into_typed().map_err(|e| MemoryError::Serialization(e.to_string()))?;

            facts_with_ts.push((
                updated_at,
                ProfileFact {
                    id: fact_id,
                    user_id,
                    fact_type,
                    fact_key,
                    fact_value,
                    confidence,
                    source,
                    expires_at: expires_at.map(millis_to_datetime),
                },
            ));
        }

        facts_with_ts.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(facts_with_ts.into_iter().map(|(_, f)| f).collect())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, MemoryError> {
        let select = format!(
            "SELECT user_id, fact_type, fact_key, expires_at FROM {}.profile_facts",
            self.client.keyspace()
        );
        let result = self.client.session().query_unpaged(select, &[]).await?;
        let Some(rows) = result.rows else { return Ok(0) };

        let mut deleted = 0u64;
        for row in rows {
            let (user_id, fact_type, fact_key, expires_at): (i64, String, String, Option<i64>) =
                row.into_typed().map_err(|e| MemoryError::Serialization(e.to_string()))?;

            let Some(expires_at) = expires_at else { continue };
            if millis_to_datetime(expires_at) > now {
                continue;
            }

            let delete = format!(
                "DELETE FROM {}.profile_facts WHERE user_id = ? AND fact_type = ? AND fact_key = ?",
                self.client.keyspace()
            );
            self.client
                .session()
                .query_unpaged(delete, (user_id, fact_type, fact_key))
                .await?;
            deleted += 1;
        }
        Ok(deleted)
    }
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_else(Utc::now)
}
