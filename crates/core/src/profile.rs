//! Long-term user profile: at most one per user, mutated by the extraction service or
//! by direct API calls.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub preferred_name: Option<String>,
    pub age: Option<u32>,
    pub location: Option<String>,
    pub timezone: Option<String>,
    pub occupation: Option<String>,
    pub languages: HashSet<String>,
    pub interests: HashSet<String>,
    pub expertise_areas: HashSet<String>,
    pub communication_style: Option<String>,
    pub custom_attributes: HashMap<String, serde_json::Value>,
}

impl UserProfile {
    pub fn new(user_id: i64) -> Self {
        Self { user_id, ..Default::default() }
    }

    /// Merge `updates` on top of `self`: non-null fields in `updates` win, null fields
    /// leave the existing value untouched (§4.6 write path).
    pub fn merge(&mut self, updates: ProfileUpdates) {
        if let Some(v) = updates.preferred_name {
            self.preferred_name = Some(v);
        }
        if let Some(v) = updates.age {
            self.age = Some(v);
        }
        if let Some(v) = updates.location {
            self.location = Some(v);
        }
        if let Some(v) = updates.timezone {
            self.timezone = Some(v);
        }
        if let Some(v) = updates.occupation {
            self.occupation = Some(v);
        }
        if let Some(v) = updates.interests {
            self.interests.extend(v);
        }
        if let Some(v) = updates.expertise_areas {
            self.expertise_areas.extend(v);
        }
        if let Some(v) = updates.communication_style {
            self.communication_style = Some(v);
        }
    }
}

/// Partial update applied by the extraction service or an explicit profile-edit call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdates {
    pub preferred_name: Option<String>,
    pub age: Option<u32>,
    pub location: Option<String>,
    pub timezone: Option<String>,
    pub occupation: Option<String>,
    pub interests: Option<Vec<String>>,
    pub expertise_areas: Option<Vec<String>>,
    pub communication_style: Option<String>,
}

impl ProfileUpdates {
    pub fn is_empty(&self) -> bool {
        self.preferred_name.is_none()
            && self.age.is_none()
            && self.location.is_none()
            && self.timezone.is_none()
            && self.occupation.is_none()
            && self.interests.is_none()
            && self.expertise_areas.is_none()
            && self.communication_style.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overwrites_only_non_null_fields() {
        let mut profile = UserProfile::new(1);
        profile.location = Some("Moscow".into());

        profile.merge(ProfileUpdates {
            preferred_name: Some("Ivan".into()),
            location: None,
            ..Default::default()
        });

        assert_eq!(profile.preferred_name.as_deref(), Some("Ivan"));
        assert_eq!(profile.location.as_deref(), Some("Moscow"));
    }

    #[test]
    fn empty_updates_detected() {
        assert!(ProfileUpdates::default().is_empty());
        let mut u = ProfileUpdates::default();
        u.age = Some(30);
        assert!(!u.is_empty());
    }
}
