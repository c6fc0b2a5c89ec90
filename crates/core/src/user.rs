//! Persisted user identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Telegram user id; primary key.
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language: Option<String>,
    pub is_allowed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// An ephemeral user synthesized for a read on a user that has never upserted.
    /// Never persisted as-is; the memory service returns this rather than failing with
    /// not-found (§4.6 invariant).
    pub fn ephemeral(id: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            username: None,
            first_name: None,
            last_name: None,
            language: None,
            is_allowed: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(f), Some(l)) => format!("{f} {l}"),
            (Some(f), None) => f.clone(),
            (None, Some(l)) => l.clone(),
            (None, None) => self.username.clone().unwrap_or_else(|| self.id.to_string()),
        }
    }

    pub fn display_name(&self) -> String {
        self.username.clone().unwrap_or_else(|| self.full_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_user_is_allowed_by_default() {
        let u = User::ephemeral(42);
        assert_eq!(u.id, 42);
        assert!(u.is_allowed);
    }

    #[test]
    fn full_name_falls_back_to_id() {
        let u = User::ephemeral(7);
        assert_eq!(u.full_name(), "7");
    }
}
