//! Immutable per-turn snapshot of a user's memory, assembled by the memory service's
//! read path (§4.6) and consumed read-only by agents.

use crate::conversation_log::{ConversationMessage, ConversationSession};
use crate::fact::ProfileFact;
use crate::message::MessageRole;
use crate::profile::UserProfile;
use crate::user::User;

#[derive(Debug, Clone)]
pub struct UserMemoryContext {
    pub user: User,
    pub profile: Option<UserProfile>,
    pub facts: Vec<ProfileFact>,
    pub recent_messages: Vec<ConversationMessage>,
    pub current_session: Option<ConversationSession>,
}

impl UserMemoryContext {
    /// Human-readable, Russian-localized bullet summary of the known profile, used to
    /// ground the dispatcher's and agents' prompts.
    pub fn profile_summary(&self) -> String {
        let Some(profile) = &self.profile else {
            return "Информация о пользователе отсутствует.".to_string();
        };

        let mut lines = Vec::new();
        if let Some(name) = &profile.preferred_name {
            lines.push(format!("Предпочитаемое имя: {name}"));
        }
        if let Some(age) = profile.age {
            lines.push(format!("Возраст: {age}"));
        }
        if let Some(location) = &profile.location {
            lines.push(format!("Местоположение: {location}"));
        }
        if let Some(occupation) = &profile.occupation {
            lines.push(format!("Профессия: {occupation}"));
        }
        if !profile.interests.is_empty() {
            let mut interests: Vec<&str> = profile.interests.iter().map(String::as_str).collect();
            interests.sort_unstable();
            lines.push(format!("Интересы: {}", interests.join(", ")));
        }
        if !profile.expertise_areas.is_empty() {
            let mut areas: Vec<&str> = profile.expertise_areas.iter().map(String::as_str).collect();
            areas.sort_unstable();
            lines.push(format!("Области экспертизы: {}", areas.join(", ")));
        }
        if !self.facts.is_empty() {
            for fact in &self.facts {
                lines.push(format!("{}: {}", fact.fact_key, fact.fact_value));
            }
        }

        if lines.is_empty() {
            "Информация о пользователе отсутствует.".to_string()
        } else {
            lines.join("\n")
        }
    }

    /// Last-M formatted conversation lines, each truncated to 200 chars.
    pub fn conversation_summary(&self, max_messages: usize) -> String {
        if self.recent_messages.is_empty() {
            return "История переписки пуста.".to_string();
        }
        let start = self.recent_messages.len().saturating_sub(max_messages);
        self.recent_messages[start..]
            .iter()
            .map(|m| {
                let role = match m.role {
                    MessageRole::User => "Пользователь",
                    MessageRole::Assistant => "Ассистент",
                    MessageRole::System => "Система",
                };
                let content: String = m.content.chars().take(200).collect();
                format!("{role}: {content}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_context(user_id: i64) -> UserMemoryContext {
        UserMemoryContext {
            user: User::ephemeral(user_id),
            profile: None,
            facts: Vec::new(),
            recent_messages: Vec::new(),
            current_session: None,
        }
    }

    #[test]
    fn profile_summary_without_profile_says_unknown() {
        let ctx = blank_context(1);
        assert_eq!(ctx.profile_summary(), "Информация о пользователе отсутствует.");
    }

    #[test]
    fn profile_summary_includes_location_and_name() {
        let mut ctx = blank_context(1);
        let mut profile = UserProfile::new(1);
        profile.preferred_name = Some("Иван".into());
        profile.location = Some("Москва".into());
        ctx.profile = Some(profile);

        let summary = ctx.profile_summary();
        assert!(summary.contains("Иван"));
        assert!(summary.contains("Москва"));
    }

    #[test]
    fn conversation_summary_empty_history() {
        let ctx = blank_context(1);
        assert_eq!(ctx.conversation_summary(5), "История переписки пуста.");
    }
}
