//! LLM-driven fact mining from user turns (§4.6 Extraction).
//!
//! Builds a prompt enumerating what counts as extractable (personal info, preferences,
//! durable interests) versus what does not (temporal/day-specific plans, trivial
//! detail, facts about third parties — §1.2), and requires a `reasoning` field on each
//! candidate fact for audit; `reasoning` is read for the log line and then discarded,
//! never persisted on [`ProfileFact`].

use std::sync::Arc;

use nexus_core::{ExtractedFact, Message, MemoryExtractionEvent, ProfileUpdates};
use nexus_llm::{GenerateOptions, LlmProvider};
use serde::Deserialize;

use crate::repositories::extraction_events::ExtractionOutcome;
use crate::service::MemoryService;

const EXTRACTION_SYSTEM_PROMPT: &str = "\
Ты — модуль извлечения фактов о пользователе из диалога. Извлекай ТОЛЬКО:
- личную информацию (имя, возраст, местоположение, профессия, часовой пояс);
- устойчивые предпочтения и интересы;
- области экспертизы пользователя.

НЕ извлекай:
- разовые/сиюминутные планы, привязанные к конкретному дню;
- тривиальные детали без долгосрочной ценности;
- факты о третьих лицах.

Ответь единственным JSON-объектом вида:
{\"facts\": [{\"fact_type\": \"personal\", \"fact_key\": \"name\", \"fact_value\": \"...\", \"confidence\": 0.9, \"reasoning\": \"...\"}], \
\"should_update_profile\": true, \"profile_updates\": {\"preferred_name\": null, \"age\": null, \"location\": null, \"timezone\": null, \"occupation\": null, \"interests\": null, \"expertise_areas\": null, \"communication_style\": null}}";

#[derive(Debug, Deserialize)]
struct RawFact {
    fact_type: String,
    fact_key: String,
    fact_value: String,
    confidence: f32,
    #[serde(default)]
    reasoning: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawProfileUpdates {
    preferred_name: Option<String>,
    age: Option<u32>,
    location: Option<String>,
    timezone: Option<String>,
    occupation: Option<String>,
    interests: Option<Vec<String>>,
    expertise_areas: Option<Vec<String>>,
    communication_style: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExtractionEnvelope {
    #[serde(default)]
    facts: Vec<RawFact>,
    #[serde(default)]
    should_update_profile: bool,
    #[serde(default)]
    profile_updates: RawProfileUpdates,
}

pub struct MemoryExtractionService {
    llm: Arc<dyn LlmProvider>,
    memory: Arc<MemoryService>,
    model_label: String,
    confidence_threshold: f32,
    enabled: bool,
}

impl MemoryExtractionService {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        memory: Arc<MemoryService>,
        model_label: impl Into<String>,
        confidence_threshold: f32,
        enabled: bool,
    ) -> Self {
        Self { llm, memory, model_label: model_label.into(), confidence_threshold, enabled }
    }

    /// Mines facts from `user_message` (with `history` as context), upserts every fact
    /// at or above the confidence threshold, merges profile updates, and records a
    /// [`MemoryExtractionEvent`] unconditionally — whether zero, some, or no facts
    /// resulted, including the "disabled" and "parse failure" outcomes (§4.6).
    ///
    /// Best-effort: every error is swallowed into an `Error`-outcome event rather than
    /// propagated, since extraction never blocks or fails a turn (§4.7, §7).
    pub async fn extract_and_store(
        &self,
        user_id: i64,
        session_id: &str,
        user_message: &str,
        history: &[Message],
    ) -> MemoryExtractionEvent {
        let mut event = MemoryExtractionEvent::new(user_id, session_id, &self.model_label);

        if !self.enabled {
            self.finish(user_id, &event, ExtractionOutcome::Disabled).await;
            return event;
        }

        let prompt = self.build_prompt(user_message, history);
        let response = match self
            .llm
            .generate(&prompt, GenerateOptions { temperature: Some(0.0), ..Default::default() })
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "memory extraction LLM call failed");
                self.finish(user_id, &event, ExtractionOutcome::Error).await;
                return event;
            }
        };

        let envelope = match parse_envelope(&response.content) {
            Some(envelope) => envelope,
            None => {
                tracing::debug!(user_id, "memory extraction response was not parseable JSON");
                self.finish(user_id, &event, ExtractionOutcome::ParseError).await;
                return event;
            }
        };

        for fact in envelope.facts {
            if fact.confidence < self.confidence_threshold {
                continue;
            }
            tracing::debug!(
                user_id,
                fact_type = %fact.fact_type,
                fact_key = %fact.fact_key,
                reasoning = fact.reasoning.as_deref().unwrap_or(""),
                "extracted fact"
            );
            event.extracted_facts.push(ExtractedFact {
                fact_type: fact.fact_type,
                fact_key: fact.fact_key,
                fact_value: fact.fact_value,
                confidence: fact.confidence,
                reasoning: fact.reasoning,
            });
        }

        let profile_updates = ProfileUpdates {
            preferred_name: envelope.profile_updates.preferred_name,
            age: envelope.profile_updates.age,
            location: envelope.profile_updates.location,
            timezone: envelope.profile_updates.timezone,
            occupation: envelope.profile_updates.occupation,
            interests: envelope.profile_updates.interests,
            expertise_areas: envelope.profile_updates.expertise_areas,
            communication_style: envelope.profile_updates.communication_style,
        };
        let should_update_profile = envelope.should_update_profile && !profile_updates.is_empty();
        event.profile_updates = profile_updates;

        for fact in event.persistable_facts() {
            if let Err(e) = self.memory.upsert_fact(&fact).await {
                tracing::warn!(user_id, error = %e, "failed to persist extracted fact");
            }
        }

        if should_update_profile {
            let mut profile = self
                .memory
                .get_profile(user_id)
                .await
                .ok()
                .flatten()
                .unwrap_or_else(|| nexus_core::UserProfile::new(user_id));
            profile.merge(event.profile_updates.clone());
            if let Err(e) = self.memory.upsert_profile(&profile).await {
                tracing::warn!(user_id, error = %e, "failed to persist profile update");
            }
        }

        self.finish(user_id, &event, ExtractionOutcome::Extracted).await;
        event
    }

    fn build_prompt(&self, user_message: &str, history: &[Message]) -> Vec<Message> {
        let mut messages = vec![Message::system(EXTRACTION_SYSTEM_PROMPT)];
        for m in history.iter().rev().take(5).rev() {
            messages.push(m.clone());
        }
        messages.push(Message::user(user_message));
        messages
    }

    async fn finish(&self, user_id: i64, event: &MemoryExtractionEvent, outcome: ExtractionOutcome) {
        let facts_extracted = event.extracted_facts.len() as u32;
        let profile_updated = !event.profile_updates.is_empty();
        if let Err(e) = self
            .memory
            .record_extraction_event(user_id, facts_extracted, profile_updated, outcome)
            .await
        {
            tracing::warn!(user_id, error = %e, "failed to record memory extraction event");
        }
    }
}

fn parse_envelope(text: &str) -> Option<ExtractionEnvelope> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_is_recovered_from_surrounding_prose() {
        let text = "Вот результат: {\"facts\": [], \"should_update_profile\": false, \"profile_updates\": {}} спасибо";
        let envelope = parse_envelope(text).unwrap();
        assert!(envelope.facts.is_empty());
        assert!(!envelope.should_update_profile);
    }

    #[test]
    fn malformed_envelope_fails_to_parse() {
        assert!(parse_envelope("not json at all").is_none());
    }

    #[test]
    fn two_facts_parse_with_confidence_and_reasoning() {
        let text = r#"{"facts": [
            {"fact_type": "personal", "fact_key": "name", "fact_value": "Иван", "confidence": 0.95, "reasoning": "stated directly"},
            {"fact_type": "personal", "fact_key": "location", "fact_value": "Москва", "confidence": 0.9, "reasoning": "stated directly"}
        ], "should_update_profile": true, "profile_updates": {"preferred_name": "Иван", "location": "Москва"}}"#;
        let envelope = parse_envelope(text).unwrap();
        assert_eq!(envelope.facts.len(), 2);
        assert_eq!(envelope.profile_updates.preferred_name.as_deref(), Some("Иван"));
    }
}
