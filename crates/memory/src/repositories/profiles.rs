//! `user_profiles` table: one row per user (§3).

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use nexus_core::UserProfile;

use crate::client::ScyllaClient;
use crate::error::MemoryError;

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn upsert(&self, profile: &UserProfile) -> Result<(), MemoryError>;
    async fn get(&self, user_id: i64) -> Result<Option<UserProfile>, MemoryError>;
}

#[derive(Clone)]
pub struct ScyllaProfileRepository {
    client: ScyllaClient,
}

impl ScyllaProfileRepository {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProfileRepository for ScyllaProfileRepository {
    async fn upsert(&self, profile: &UserProfile) -> Result<(), MemoryError> {
        let custom_attributes_json = serde_json::to_string(&profile.custom_attributes)?;
        let query = format!(
            "INSERT INTO {}.user_profiles (
                user_id, preferred_name, age, location, timezone, occupation,
                languages, interests, expertise_areas, communication_style, custom_attributes_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                query,
                (
                    profile.user_id,
                    &profile.preferred_name,
                    profile.age.map(|a| a as i32),
                    &profile.location,
                    &profile.timezone,
                    &profile.occupation,
                    &profile.languages,
                    &profile.interests,
                    &profile.expertise_areas,
                    &profile.communication_style,
                    custom_attributes_json,
                ),
            )
            .await?;
        Ok(())
    }

    async fn get(&self, user_id: i64) -> Result<Option<UserProfile>, MemoryError> {
        let query = format!(
            "SELECT user_id, preferred_name, age, location, timezone, occupation,
                    languages, interests, expertise_areas, communication_style, custom_attributes_json
             FROM {}.user_profiles WHERE user_id = ?",
            self.client.keyspace()
        );
        let result = self.client.session().query_unpaged(query, (user_id,)).await?;
        let Some(rows) = result.rows else { return Ok(None) };
        let Some(row) = rows.into_iter().next() else { return Ok(None) };

        #[allow(clippy::type_complexity)]
        let (
            user_id,
            preferred_name,
            age,
            location,
            timezone,
            occupation,
            languages,
            interests,
            expertise_areas,
            communication_style,
            custom_attributes_json,
        ): (
            i64,
            Option<String>,
            Option<i32>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<HashSet<String>>,
            Option<HashSet<String>>,
            Option<HashSet<String>>,
            Option<String>,
            Option<String>,
        ) = row.into_typed().map_err(|e| MemoryError::Serialization(e.to_string()))?;

        let custom_attributes: HashMap<String, serde_json::Value> = custom_attributes_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?
            .unwrap_or_default();

        Ok(Some(UserProfile {
            user_id,
            preferred_name,
            age: age.map(|a| a as u32),
            location,
            timezone,
            occupation,
            languages: languages.unwrap_or_default(),
            interests: interests.unwrap_or_default(),
            expertise_areas: expertise_areas.unwrap_or_default(),
            communication_style,
            custom_attributes,
        }))
    }
}
