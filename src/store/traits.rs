//! `ConversationStore` trait — persistence for dialog state and saved profiles.

use async_trait::async_trait;

use crate::dialog::ConversationState;
use crate::error::DatabaseError;
use crate::profile::SavedProfile;

/// Backend-agnostic storage for conversations.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// State of an in-progress conversation, if any.
    async fn load_state(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationState>, DatabaseError>;

    /// Insert or replace a conversation's state.
    async fn save_state(
        &self,
        conversation_id: &str,
        state: &ConversationState,
    ) -> Result<(), DatabaseError>;

    /// Forget a conversation's state. Returns whether anything was removed.
    async fn clear_state(&self, conversation_id: &str) -> Result<bool, DatabaseError>;

    /// Persist a profile the user agreed to save.
    async fn save_profile(&self, profile: &SavedProfile) -> Result<(), DatabaseError>;

    /// Saved profiles, newest first, up to `limit`.
    async fn list_profiles(&self, limit: usize) -> Result<Vec<SavedProfile>, DatabaseError>;
}
