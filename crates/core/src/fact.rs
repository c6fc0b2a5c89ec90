//! A single extracted or manually recorded fact about a user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Uniqueness is `(user_id, fact_type, fact_key)`; an upsert replaces
/// value/confidence/source/expiry rather than creating a new row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileFact {
    pub id: Uuid,
    pub user_id: i64,
    pub fact_type: String,
    pub fact_key: String,
    pub fact_value: String,
    pub confidence: f32,
    pub source: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ProfileFact {
    pub fn new(
        user_id: i64,
        fact_type: impl Into<String>,
        fact_key: impl Into<String>,
        fact_value: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            fact_type: fact_type.into(),
            fact_key: fact_key.into(),
            fact_value: fact_value.into(),
            confidence: confidence.clamp(0.0, 1.0),
            source: None,
            expires_at: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |exp| exp <= now)
    }

    /// The composite uniqueness key for this fact.
    pub fn identity(&self) -> (i64, &str, &str) {
        (self.user_id, &self.fact_type, &self.fact_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn confidence_is_clamped_on_construction() {
        let f = ProfileFact::new(1, "personal", "name", "Ivan", 1.4);
        assert_eq!(f.confidence, 1.0);
    }

    #[test]
    fn identity_is_the_uniqueness_triple() {
        let f = ProfileFact::new(1, "personal", "name", "Ivan", 0.9);
        assert_eq!(f.identity(), (1, "personal", "name"));
    }

    #[test]
    fn expiry_check_is_inclusive_of_the_boundary() {
        let now = Utc::now();
        let mut f = ProfileFact::new(1, "p", "k", "v", 1.0);
        f.expires_at = Some(now - Duration::seconds(1));
        assert!(f.is_expired(now));
        f.expires_at = Some(now + Duration::seconds(60));
        assert!(!f.is_expired(now));
    }
}
