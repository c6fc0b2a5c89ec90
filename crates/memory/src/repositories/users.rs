//! `users` table: `(telegram_id PK, username?, first_name?, last_name?, language?,
//! is_allowed, created_at, updated_at)` (§3).

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use nexus_core::User;

use crate::client::ScyllaClient;
use crate::error::MemoryError;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert-or-replace by primary key (first-contact creation and every subsequent
    /// update go through the same path, §3 Lifecycle summary).
    async fn upsert(&self, user: &User) -> Result<(), MemoryError>;
    async fn get(&self, user_id: i64) -> Result<Option<User>, MemoryError>;
}

#[derive(Clone)]
pub struct ScyllaUserRepository {
    client: ScyllaClient,
}

impl ScyllaUserRepository {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UserRepository for ScyllaUserRepository {
    async fn upsert(&self, user: &User) -> Result<(), MemoryError> {
        let query = format!(
            "INSERT INTO {}.users (
                user_id, username, first_name, last_name, language, is_allowed, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                query,
                (
                    user.id,
                    &user.username,
                    &user.first_name,
                    &user.last_name,
                    &user.language,
                    user.is_allowed,
                    user.created_at.timestamp_millis(),
                    user.updated_at.timestamp_millis(),
                ),
            )
            .await?;
        Ok(())
    }

    async fn get(&self, user_id: i64) -> Result<Option<User>, MemoryError> {
        let query = format!(
            "SELECT user_id, username, first_name, last_name, language, is_allowed, created_at, updated_at
             FROM {}.users WHERE user_id = ?",
            self.client.keyspace()
        );
        let result = self.client.session().query_unpaged(query, (user_id,)).await?;
        let Some(rows) = result.rows else { return Ok(None) };
        let Some(row) = rows.into_iter().next() else { return Ok(None) };

        let (id, username, first_name, last_name, language, is_allowed, created_at, updated_at): (
            i64,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            bool,
            i64,
            i64,
        ) = row.into_typed().map_err(|e| MemoryError::Serialization(e.to_string()))?;

        Ok(Some(User {
            id,
            username,
            first_name,
            last_name,
            language,
            is_allowed,
            created_at: millis_to_datetime(created_at),
            updated_at: millis_to_datetime(updated_at),
        }))
    }
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_round_trip_is_stable() {
        let now = Utc::now();
        let millis = now.timestamp_millis();
        let back = millis_to_datetime(millis);
        assert_eq!(back.timestamp_millis(), millis);
    }
}
