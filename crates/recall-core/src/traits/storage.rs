// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends.

use async_trait::async_trait;

use crate::error::RecallError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Category, ConversationSession, Memory, MemoryRelationship, Tag};

/// Owner-scoped persistence for memories, their classification buckets,
/// relationship edges, conversation sessions, and channel links.
///
/// Every query that touches memories excludes soft-deleted rows unless
/// stated otherwise.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (open connection, run migrations).
    async fn initialize(&self) -> Result<(), RecallError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), RecallError>;

    // --- Sessions ---

    async fn insert_session(&self, session: &ConversationSession) -> Result<(), RecallError>;

    async fn get_session(&self, id: &str) -> Result<Option<ConversationSession>, RecallError>;

    /// Most recent non-expired session row for a channel identity. The caller
    /// decides whether its TTL has elapsed.
    async fn latest_session(
        &self,
        channel: &str,
        channel_user_id: &str,
    ) -> Result<Option<ConversationSession>, RecallError>;

    /// Writes `session` only if the stored version still equals `session.version`,
    /// bumping the stored version by one. Returns false when another writer won.
    async fn compare_and_swap_session(
        &self,
        session: &ConversationSession,
    ) -> Result<bool, RecallError>;

    async fn mark_session_expired(&self, id: &str) -> Result<(), RecallError>;

    // --- Memories ---

    async fn insert_memory(&self, memory: &Memory) -> Result<(), RecallError>;

    async fn get_memory(&self, owner_id: &str, id: &str) -> Result<Option<Memory>, RecallError>;

    async fn get_memories_by_ids(
        &self,
        owner_id: &str,
        ids: &[String],
    ) -> Result<Vec<Memory>, RecallError>;

    /// Finds a memory whose content is byte-identical to `content`.
    async fn find_memory_by_content(
        &self,
        owner_id: &str,
        content: &str,
    ) -> Result<Option<Memory>, RecallError>;

    /// Rewrites title, content, summary, embedding, category and timestamps.
    /// Returns false if the memory does not exist for the owner.
    async fn update_memory(&self, memory: &Memory) -> Result<bool, RecallError>;

    /// Soft-deletes a memory, removes its tag joins, and decrements the
    /// usage counts of its category and tags in one transaction.
    async fn soft_delete_memory(&self, owner_id: &str, id: &str) -> Result<bool, RecallError>;

    /// Brute-force cosine similarity over the owner's stored vectors.
    /// Returns `(memory_id, similarity)` pairs at or above `min_similarity`,
    /// best first.
    async fn search_similar(
        &self,
        owner_id: &str,
        embedding: &[f32],
        limit: usize,
        min_similarity: f32,
        exclude_id: Option<&str>,
    ) -> Result<Vec<(String, f32)>, RecallError>;

    /// Full-text keyword search. Returns `(memory_id, bm25)` pairs, best first
    /// (bm25 is lower-is-better).
    async fn search_keyword(
        &self,
        owner_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<(String, f64)>, RecallError>;

    /// Summaries of the newest memories in a category.
    async fn recent_category_summaries(
        &self,
        owner_id: &str,
        category_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, RecallError>;

    // --- Categories ---

    async fn list_categories(&self, owner_id: &str) -> Result<Vec<Category>, RecallError>;

    async fn get_category(&self, owner_id: &str, id: &str)
    -> Result<Option<Category>, RecallError>;

    /// Case-insensitive exact name lookup.
    async fn find_category_by_name(
        &self,
        owner_id: &str,
        name: &str,
    ) -> Result<Option<Category>, RecallError>;

    /// Inserts a category, or returns the existing row if another writer
    /// created the same name first.
    async fn insert_category(&self, category: &Category) -> Result<Category, RecallError>;

    async fn adjust_category_usage(&self, id: &str, delta: i64) -> Result<(), RecallError>;

    async fn set_category_description(
        &self,
        id: &str,
        description: &str,
    ) -> Result<(), RecallError>;

    // --- Tags ---

    async fn list_tags(&self, owner_id: &str) -> Result<Vec<Tag>, RecallError>;

    async fn find_tag_by_normalized(
        &self,
        owner_id: &str,
        normalized_name: &str,
    ) -> Result<Option<Tag>, RecallError>;

    /// Inserts a tag, or returns the existing row on a normalized-name conflict.
    async fn insert_tag(&self, tag: &Tag) -> Result<Tag, RecallError>;

    async fn adjust_tag_usage(&self, id: &str, delta: i64) -> Result<(), RecallError>;

    async fn attach_tags(&self, memory_id: &str, tag_ids: &[String]) -> Result<(), RecallError>;

    async fn tags_for_memory(&self, memory_id: &str) -> Result<Vec<Tag>, RecallError>;

    // --- Relationships ---

    /// Inserts the edge or updates the score of the existing edge for the
    /// same canonical pair.
    async fn upsert_relationship(
        &self,
        relationship: &MemoryRelationship,
    ) -> Result<(), RecallError>;

    /// Edges touching `memory_id` whose other endpoint is not deleted.
    async fn relationships_for(
        &self,
        owner_id: &str,
        memory_id: &str,
    ) -> Result<Vec<MemoryRelationship>, RecallError>;

    // --- Channel links ---

    async fn resolve_channel_owner(
        &self,
        channel: &str,
        channel_user_id: &str,
    ) -> Result<Option<String>, RecallError>;

    async fn create_link_code(
        &self,
        owner_id: &str,
        code: &str,
        expires_at: &str,
    ) -> Result<(), RecallError>;

    /// Consumes an unexpired, unused code and links the channel identity to
    /// its owner. Returns the owner id on success.
    async fn redeem_link_code(
        &self,
        code: &str,
        channel: &str,
        channel_user_id: &str,
        now: &str,
    ) -> Result<Option<String>, RecallError>;
}
