//! Collected profile — the answers gathered over one survey conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The six answer slots of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    Location,
    UserId,
    Voted,
    Issues,
    Party,
}

impl ProfileField {
    pub const ALL: [ProfileField; 6] = [
        ProfileField::Name,
        ProfileField::Location,
        ProfileField::UserId,
        ProfileField::Voted,
        ProfileField::Issues,
        ProfileField::Party,
    ];
}

impl std::fmt::Display for ProfileField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Location => "location",
            Self::UserId => "user_id",
            Self::Voted => "voted",
            Self::Issues => "issues",
            Self::Party => "party",
        };
        write!(f, "{s}")
    }
}

/// Answers accumulated across every nested dialog of a conversation.
///
/// Each field is an ordered list of extracted strings; only the first
/// element is ever read. `None` and `Some(vec![])` both mean "not
/// disclosed".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voted: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party: Option<Vec<String>>,
    /// Answer to the closing "may I save this?" question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_consent: Option<bool>,
}

impl CollectedProfile {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, field: ProfileField) -> &Option<Vec<String>> {
        match field {
            ProfileField::Name => &self.name,
            ProfileField::Location => &self.location,
            ProfileField::UserId => &self.user_id,
            ProfileField::Voted => &self.voted,
            ProfileField::Issues => &self.issues,
            ProfileField::Party => &self.party,
        }
    }

    fn slot_mut(&mut self, field: ProfileField) -> &mut Option<Vec<String>> {
        match field {
            ProfileField::Name => &mut self.name,
            ProfileField::Location => &mut self.location,
            ProfileField::UserId => &mut self.user_id,
            ProfileField::Voted => &mut self.voted,
            ProfileField::Issues => &mut self.issues,
            ProfileField::Party => &mut self.party,
        }
    }

    /// First value of a field, or `None` when not disclosed.
    pub fn first(&self, field: ProfileField) -> Option<&str> {
        self.slot(field)
            .as_ref()
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Whether a field holds at least one value.
    pub fn is_set(&self, field: ProfileField) -> bool {
        self.first(field).is_some()
    }

    /// Store values for a field unless it is already set.
    ///
    /// Returns `true` if the values were stored. Empty lists are ignored.
    pub fn fill(&mut self, field: ProfileField, values: Vec<String>) -> bool {
        if self.is_set(field) || values.is_empty() {
            return false;
        }
        *self.slot_mut(field) = Some(values);
        true
    }

    /// Explicitly clear a field so a later dialog may set it again.
    pub fn clear(&mut self, field: ProfileField) {
        *self.slot_mut(field) = None;
    }
}

/// A profile the user agreed to have saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedProfile {
    pub id: String,
    pub conversation_id: String,
    pub profile: CollectedProfile,
    pub saved_at: DateTime<Utc>,
}

impl SavedProfile {
    pub fn new(conversation_id: impl Into<String>, profile: CollectedProfile) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            profile,
            saved_at: Utc::now(),
        }
    }
}
