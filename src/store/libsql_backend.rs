//! libSQL backend — async `ConversationStore` implementation.
//!
//! Conversation state and profiles are stored as JSON text columns.
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::dialog::ConversationState;
use crate::error::DatabaseError;
use crate::profile::{CollectedProfile, SavedProfile};
use crate::store::migrations;
use crate::store::traits::ConversationStore;

/// libSQL store.
///
/// Holds a single connection reused for all operations.
pub struct LibSqlStore {
    // Keeps the database handle alive for the connection's lifetime.
    _db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Create an in-memory database.
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            _db: Arc::new(db),
            conn,
        })
    }
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn row_to_profile(row: &libsql::Row) -> Result<SavedProfile, DatabaseError> {
    let get_text = |idx: i32| {
        row.get::<String>(idx)
            .map_err(|e| DatabaseError::Query(format!("profile row parse: {e}")))
    };
    let profile: CollectedProfile = serde_json::from_str(&get_text(2)?)
        .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
    Ok(SavedProfile {
        id: get_text(0)?,
        conversation_id: get_text(1)?,
        profile,
        saved_at: parse_datetime(&get_text(3)?),
    })
}

#[async_trait]
impl ConversationStore for LibSqlStore {
    async fn load_state(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationState>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT state FROM conversation_state WHERE conversation_id = ?1",
                params![conversation_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("load_state: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let json: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("load_state row parse: {e}")))?;
                let state = serde_json::from_str(&json)
                    .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
                Ok(Some(state))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("load_state: {e}"))),
        }
    }

    async fn save_state(
        &self,
        conversation_id: &str,
        state: &ConversationState,
    ) -> Result<(), DatabaseError> {
        let json =
            serde_json::to_string(state).map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO conversation_state (conversation_id, state, turn_count, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (conversation_id) DO UPDATE SET state = ?2, turn_count = ?3, updated_at = ?4",
                params![conversation_id, json, state.turn_count as i64, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_state: {e}")))?;

        debug!(conversation_id, turn = state.turn_count, "Conversation state saved");
        Ok(())
    }

    async fn clear_state(&self, conversation_id: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn
            .execute(
                "DELETE FROM conversation_state WHERE conversation_id = ?1",
                params![conversation_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("clear_state: {e}")))?;
        Ok(count > 0)
    }

    async fn save_profile(&self, profile: &SavedProfile) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(&profile.profile)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO saved_profiles (id, conversation_id, profile, saved_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    profile.id.as_str(),
                    profile.conversation_id.as_str(),
                    json,
                    profile.saved_at.to_rfc3339()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_profile: {e}")))?;

        info!(profile_id = %profile.id, conversation_id = %profile.conversation_id, "Profile saved");
        Ok(())
    }

    async fn list_profiles(&self, limit: usize) -> Result<Vec<SavedProfile>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, conversation_id, profile, saved_at FROM saved_profiles
                 ORDER BY saved_at DESC LIMIT ?1",
                params![limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_profiles: {e}")))?;

        let mut profiles = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_profiles: {e}")))?
        {
            profiles.push(row_to_profile(&row)?);
        }
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::{DialogFrame, DialogOptions};
    use crate::profile::ProfileField;

    async fn test_db() -> LibSqlStore {
        LibSqlStore::new_memory().await.unwrap()
    }

    fn sample_state() -> ConversationState {
        let mut state = ConversationState::new();
        state
            .stack
            .push(DialogFrame::new("main", DialogOptions::default()));
        state.stack.push(DialogFrame::new("name", DialogOptions::default()));
        state.profile.fill(ProfileField::Name, vec!["Jane".into()]);
        state.turn_count = 4;
        state
    }

    #[tokio::test]
    async fn state_roundtrip() {
        let db = test_db().await;
        let state = sample_state();
        db.save_state("web:abc", &state).await.unwrap();

        let loaded = db.load_state("web:abc").await.unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn save_state_overwrites() {
        let db = test_db().await;
        let mut state = sample_state();
        db.save_state("c", &state).await.unwrap();
        state.turn_count = 5;
        state.stack.pop();
        db.save_state("c", &state).await.unwrap();

        let loaded = db.load_state("c").await.unwrap().unwrap();
        assert_eq!(loaded.turn_count, 5);
        assert_eq!(loaded.stack.depth(), 1);
    }

    #[tokio::test]
    async fn load_missing_state_is_none() {
        let db = test_db().await;
        assert!(db.load_state("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_state_reports_removal() {
        let db = test_db().await;
        db.save_state("c", &sample_state()).await.unwrap();
        assert!(db.clear_state("c").await.unwrap());
        assert!(!db.clear_state("c").await.unwrap());
        assert!(db.load_state("c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn profiles_roundtrip_newest_first() {
        let db = test_db().await;

        let mut older = SavedProfile::new("c1", CollectedProfile::new());
        older.saved_at = Utc::now() - chrono::Duration::minutes(5);
        let mut profile = CollectedProfile::new();
        profile.fill(ProfileField::Party, vec!["labour".into()]);
        profile.save_consent = Some(true);
        let newer = SavedProfile::new("c2", profile.clone());

        db.save_profile(&older).await.unwrap();
        db.save_profile(&newer).await.unwrap();

        let listed = db.list_profiles(10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed[0].profile, profile);
        assert_eq!(listed[1].conversation_id, "c1");

        assert_eq!(db.list_profiles(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("botwise.db");

        {
            let db = LibSqlStore::new_local(&path).await.unwrap();
            db.save_state("c", &sample_state()).await.unwrap();
        }

        let db = LibSqlStore::new_local(&path).await.unwrap();
        assert_eq!(db.load_state("c").await.unwrap(), Some(sample_state()));
    }
}
