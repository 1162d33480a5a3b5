// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use recall_config::model::StorageConfig;
use recall_core::{
    AdapterType, Category, ConversationSession, HealthStatus, Memory, MemoryRelationship,
    PluginAdapter, RecallError, StorageAdapter, Tag,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened by
/// [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, RecallError> {
        self.db.get().ok_or_else(|| RecallError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RecallError> {
        let Some(db) = self.db.get() else {
            return Ok(HealthStatus::Unhealthy("not initialized".into()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RecallError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), RecallError> {
        let path = self.config.database_path.clone();
        let db = Database::open(&path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| RecallError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), RecallError> {
        self.db()?.checkpoint().await
    }

    // --- Sessions ---

    async fn insert_session(&self, session: &ConversationSession) -> Result<(), RecallError> {
        queries::sessions::insert_session(self.db()?, session).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<ConversationSession>, RecallError> {
        queries::sessions::get_session(self.db()?, id).await
    }

    async fn latest_session(
        &self,
        channel: &str,
        channel_user_id: &str,
    ) -> Result<Option<ConversationSession>, RecallError> {
        queries::sessions::latest_session(self.db()?, channel, channel_user_id).await
    }

    async fn compare_and_swap_session(
        &self,
        session: &ConversationSession,
    ) -> Result<bool, RecallError> {
        queries::sessions::compare_and_swap_session(self.db()?, session).await
    }

    async fn mark_session_expired(&self, id: &str) -> Result<(), RecallError> {
        queries::sessions::mark_session_expired(self.db()?, id).await
    }

    // --- Memories ---

    async fn insert_memory(&self, memory: &Memory) -> Result<(), RecallError> {
        queries::memories::insert_memory(self.db()?, memory).await
    }

    async fn get_memory(&self, owner_id: &str, id: &str) -> Result<Option<Memory>, RecallError> {
        queries::memories::get_memory(self.db()?, owner_id, id).await
    }

    async fn get_memories_by_ids(
        &self,
        owner_id: &str,
        ids: &[String],
    ) -> Result<Vec<Memory>, RecallError> {
        queries::memories::get_memories_by_ids(self.db()?, owner_id, ids).await
    }

    async fn find_memory_by_content(
        &self,
        owner_id: &str,
        content: &str,
    ) -> Result<Option<Memory>, RecallError> {
        queries::memories::find_memory_by_content(self.db()?, owner_id, content).await
    }

    async fn update_memory(&self, memory: &Memory) -> Result<bool, RecallError> {
        queries::memories::update_memory(self.db()?, memory).await
    }

    async fn soft_delete_memory(&self, owner_id: &str, id: &str) -> Result<bool, RecallError> {
        queries::memories::soft_delete_memory(self.db()?, owner_id, id).await
    }

    async fn search_similar(
        &self,
        owner_id: &str,
        embedding: &[f32],
        limit: usize,
        min_similarity: f32,
        exclude_id: Option<&str>,
    ) -> Result<Vec<(String, f32)>, RecallError> {
        queries::memories::search_similar(
            self.db()?,
            owner_id,
            embedding,
            limit,
            min_similarity,
            exclude_id,
        )
        .await
    }

    async fn search_keyword(
        &self,
        owner_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<(String, f64)>, RecallError> {
        queries::memories::search_keyword(self.db()?, owner_id, query, limit).await
    }

    async fn recent_category_summaries(
        &self,
        owner_id: &str,
        category_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, RecallError> {
        queries::memories::recent_category_summaries(self.db()?, owner_id, category_id, limit)
            .await
    }

    // --- Categories ---

    async fn list_categories(&self, owner_id: &str) -> Result<Vec<Category>, RecallError> {
        queries::categories::list_categories(self.db()?, owner_id).await
    }

    async fn get_category(
        &self,
        owner_id: &str,
        id: &str,
    ) -> Result<Option<Category>, RecallError> {
        queries::categories::get_category(self.db()?, owner_id, id).await
    }

    async fn find_category_by_name(
        &self,
        owner_id: &str,
        name: &str,
    ) -> Result<Option<Category>, RecallError> {
        queries::categories::find_category_by_name(self.db()?, owner_id, name).await
    }

    async fn insert_category(&self, category: &Category) -> Result<Category, RecallError> {
        queries::categories::insert_category(self.db()?, category).await
    }

    async fn adjust_category_usage(&self, id: &str, delta: i64) -> Result<(), RecallError> {
        queries::categories::adjust_category_usage(self.db()?, id, delta).await
    }

    async fn set_category_description(
        &self,
        id: &str,
        description: &str,
    ) -> Result<(), RecallError> {
        queries::categories::set_category_description(self.db()?, id, description).await
    }

    // --- Tags ---

    async fn list_tags(&self, owner_id: &str) -> Result<Vec<Tag>, RecallError> {
        queries::tags::list_tags(self.db()?, owner_id).await
    }

    async fn find_tag_by_normalized(
        &self,
        owner_id: &str,
        normalized_name: &str,
    ) -> Result<Option<Tag>, RecallError> {
        queries::tags::find_tag_by_normalized(self.db()?, owner_id, normalized_name).await
    }

    async fn insert_tag(&self, tag: &Tag) -> Result<Tag, RecallError> {
        queries::tags::insert_tag(self.db()?, tag).await
    }

    async fn adjust_tag_usage(&self, id: &str, delta: i64) -> Result<(), RecallError> {
        queries::tags::adjust_tag_usage(self.db()?, id, delta).await
    }

    async fn attach_tags(&self, memory_id: &str, tag_ids: &[String]) -> Result<(), RecallError> {
        queries::tags::attach_tags(self.db()?, memory_id, tag_ids).await
    }

    async fn tags_for_memory(&self, memory_id: &str) -> Result<Vec<Tag>, RecallError> {
        queries::tags::tags_for_memory(self.db()?, memory_id).await
    }

    // --- Relationships ---

    async fn upsert_relationship(
        &self,
        relationship: &MemoryRelationship,
    ) -> Result<(), RecallError> {
        queries::relationships::upsert_relationship(self.db()?, relationship).await
    }

    async fn relationships_for(
        &self,
        owner_id: &str,
        memory_id: &str,
    ) -> Result<Vec<MemoryRelationship>, RecallError> {
        queries::relationships::relationships_for(self.db()?, owner_id, memory_id).await
    }

    // --- Channel links ---

    async fn resolve_channel_owner(
        &self,
        channel: &str,
        channel_user_id: &str,
    ) -> Result<Option<String>, RecallError> {
        queries::links::resolve_channel_owner(self.db()?, channel, channel_user_id).await
    }

    async fn create_link_code(
        &self,
        owner_id: &str,
        code: &str,
        expires_at: &str,
    ) -> Result<(), RecallError> {
        queries::links::create_link_code(self.db()?, owner_id, code, expires_at).await
    }

    async fn redeem_link_code(
        &self,
        code: &str,
        channel: &str,
        channel_user_id: &str,
        now: &str,
    ) -> Result<Option<String>, RecallError> {
        queries::links::redeem_link_code(self.db()?, code, channel, channel_user_id, now).await
    }
}
