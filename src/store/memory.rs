//! In-memory store, used when no database path is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::dialog::ConversationState;
use crate::error::DatabaseError;
use crate::profile::SavedProfile;
use crate::store::traits::ConversationStore;

#[derive(Default)]
pub struct MemoryStore {
    states: RwLock<HashMap<String, ConversationState>>,
    profiles: RwLock<Vec<SavedProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn load_state(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationState>, DatabaseError> {
        Ok(self.states.read().await.get(conversation_id).cloned())
    }

    async fn save_state(
        &self,
        conversation_id: &str,
        state: &ConversationState,
    ) -> Result<(), DatabaseError> {
        self.states
            .write()
            .await
            .insert(conversation_id.to_string(), state.clone());
        Ok(())
    }

    async fn clear_state(&self, conversation_id: &str) -> Result<bool, DatabaseError> {
        Ok(self.states.write().await.remove(conversation_id).is_some())
    }

    async fn save_profile(&self, profile: &SavedProfile) -> Result<(), DatabaseError> {
        self.profiles.write().await.push(profile.clone());
        Ok(())
    }

    async fn list_profiles(&self, limit: usize) -> Result<Vec<SavedProfile>, DatabaseError> {
        let profiles = self.profiles.read().await;
        let mut newest: Vec<SavedProfile> = profiles.iter().rev().take(limit).cloned().collect();
        newest.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(newest)
    }
}
