//! Audit trail for the memory extraction service's LLM-driven fact mining (§4.6/§4.7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fact::ProfileFact;
use crate::profile::ProfileUpdates;

/// One run of the extraction service over a batch of conversation messages.
///
/// `reasoning` is the model's stated justification for each extracted fact; it is kept
/// here for audit/debugging and is never copied onto the persisted `ProfileFact`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryExtractionEvent {
    pub id: Uuid,
    pub user_id: i64,
    pub session_id: String,
    pub source_message_ids: Vec<Uuid>,
    pub extracted_facts: Vec<ExtractedFact>,
    pub profile_updates: ProfileUpdates,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFact {
    pub fact_type: String,
    pub fact_key: String,
    pub fact_value: String,
    pub confidence: f32,
    pub reasoning: Option<String>,
}

impl MemoryExtractionEvent {
    pub fn new(user_id: i64, session_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            session_id: session_id.into(),
            source_message_ids: Vec::new(),
            extracted_facts: Vec::new(),
            profile_updates: ProfileUpdates::default(),
            model: model.into(),
            created_at: Utc::now(),
        }
    }

    /// Facts worth persisting, dropping the ephemeral `reasoning` field.
    pub fn persistable_facts(&self) -> Vec<ProfileFact> {
        self.extracted_facts
            .iter()
            .map(|f| {
                ProfileFact::new(
                    self.user_id,
                    f.fact_type.clone(),
                    f.fact_key.clone(),
                    f.fact_value.clone(),
                    f.confidence,
                )
                .with_source(format!("extraction:{}", self.id))
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.extracted_facts.is_empty() && self.profile_updates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistable_facts_drop_reasoning_but_keep_values() {
        let mut event = MemoryExtractionEvent::new(1, "s1", "gpt-test");
        event.extracted_facts.push(ExtractedFact {
            fact_type: "personal".into(),
            fact_key: "name".into(),
            fact_value: "Ivan".into(),
            confidence: 0.9,
            reasoning: Some("user stated their name directly".into()),
        });

        let facts = event.persistable_facts();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].fact_value, "Ivan");
        assert!(facts[0].source.as_deref().unwrap().starts_with("extraction:"));
    }

    #[test]
    fn empty_event_has_no_facts_or_updates() {
        let event = MemoryExtractionEvent::new(1, "s1", "gpt-test");
        assert!(event.is_empty());
    }
}
