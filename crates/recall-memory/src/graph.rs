// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relationship discovery for newly saved memories.

use std::sync::Arc;

use recall_config::model::GraphConfig;
use recall_core::{MemoryRelationship, RecallError, StorageAdapter, now_timestamp};
use tracing::{debug, warn};

use crate::retriever::Retriever;

/// Score at which an edge is labeled `strongly_related`.
pub const STRONG_RELATIONSHIP: f32 = 0.85;

pub fn relationship_type(score: f32) -> &'static str {
    if score >= STRONG_RELATIONSHIP {
        "strongly_related"
    } else {
        "related"
    }
}

/// Orders an unordered pair so the lexicographically smaller id comes first.
pub fn canonical_pair<'a>(x: &'a str, y: &'a str) -> (&'a str, &'a str) {
    if x <= y { (x, y) } else { (y, x) }
}

/// Neighbors come from the retriever's semantic tier; edges are written
/// straight to storage.
pub struct GraphBuilder {
    retriever: Arc<Retriever>,
    storage: Arc<dyn StorageAdapter>,
    config: GraphConfig,
}

impl GraphBuilder {
    pub fn new(
        retriever: Arc<Retriever>,
        storage: Arc<dyn StorageAdapter>,
        config: GraphConfig,
    ) -> Self {
        Self {
            retriever,
            storage,
            config,
        }
    }

    /// Link `memory_id` to its nearest neighbors. Returns the number of
    /// edges written; failures are logged and count as zero.
    pub async fn build_for(&self, owner_id: &str, memory_id: &str, embedding: &[f32]) -> usize {
        match self.try_build(owner_id, memory_id, embedding).await {
            Ok(count) => {
                debug!(owner_id, memory_id, edges = count, "relationships built");
                count
            }
            Err(e) => {
                warn!(owner_id, memory_id, error = %e, "relationship building failed");
                0
            }
        }
    }

    async fn try_build(
        &self,
        owner_id: &str,
        memory_id: &str,
        embedding: &[f32],
    ) -> Result<usize, RecallError> {
        if self.config.max_neighbors == 0 || embedding.is_empty() {
            return Ok(0);
        }
        let neighbors = self
            .retriever
            .nearest(
                owner_id,
                embedding,
                self.config.max_neighbors,
                self.config.similarity_floor,
                Some(memory_id),
            )
            .await?;

        let mut written = 0;
        for (neighbor, score) in neighbors {
            let (a, b) = canonical_pair(memory_id, &neighbor);
            let now = now_timestamp();
            let edge = MemoryRelationship {
                id: uuid::Uuid::new_v4().to_string(),
                owner_id: owner_id.to_string(),
                memory_a: a.to_string(),
                memory_b: b.to_string(),
                score,
                relationship_type: relationship_type(score).to_string(),
                created_at: now.clone(),
                updated_at: now,
            };
            self.storage.upsert_relationship(&edge).await?;
            written += 1;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{cached, memory, storage};

    use recall_config::model::RetrievalConfig;
    use recall_test_utils::MockEmbedder;
    use recall_test_utils::mock_embedder::{at_similarity, unit};

    fn builder(storage: &Arc<dyn StorageAdapter>) -> GraphBuilder {
        let retriever = Arc::new(Retriever::new(
            Arc::clone(storage),
            cached(Arc::new(MockEmbedder::new())),
            RetrievalConfig::default(),
        ));
        GraphBuilder::new(retriever, Arc::clone(storage), GraphConfig::default())
    }

    #[test]
    fn types_and_pairs() {
        assert_eq!(relationship_type(0.9), "strongly_related");
        assert_eq!(relationship_type(0.85), "strongly_related");
        assert_eq!(relationship_type(0.6), "related");
        assert_eq!(canonical_pair("b", "a"), ("a", "b"));
        assert_eq!(canonical_pair("a", "b"), ("a", "b"));
    }

    #[tokio::test]
    async fn edges_are_symmetric_and_unique() {
        let (_dir, storage) = storage().await;
        let a = memory("a", "o", "first", unit(0));
        let b = memory("b", "o", "second", at_similarity(0, 1, 0.9));
        storage.insert_memory(&a).await.unwrap();
        storage.insert_memory(&b).await.unwrap();
        let builder = builder(&storage);

        // Discovered from b's side, then again from a's side.
        assert_eq!(builder.build_for("o", "b", &b.embedding).await, 1);
        assert_eq!(builder.build_for("o", "a", &a.embedding).await, 1);

        let from_a = storage.relationships_for("o", "a").await.unwrap();
        let from_b = storage.relationships_for("o", "b").await.unwrap();
        assert_eq!(from_a.len(), 1);
        assert_eq!(from_a, from_b);
        assert_eq!(from_a[0].memory_a, "a");
        assert_eq!(from_a[0].memory_b, "b");
        assert_eq!(from_a[0].relationship_type, "strongly_related");
    }

    #[tokio::test]
    async fn dissimilar_memories_stay_unlinked() {
        let (_dir, storage) = storage().await;
        storage.insert_memory(&memory("a", "o", "first", unit(0))).await.unwrap();
        let far = memory("b", "o", "second", unit(1));
        storage.insert_memory(&far).await.unwrap();
        let builder = builder(&storage);
        assert_eq!(builder.build_for("o", "b", &far.embedding).await, 0);
    }

    #[tokio::test]
    async fn storage_failure_counts_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        // Never initialized, so every query fails.
        let storage: Arc<dyn StorageAdapter> =
            Arc::new(recall_storage::SqliteStorage::new(recall_config::model::StorageConfig {
                database_path: dir.path().join("x.db").to_string_lossy().into_owned(),
                wal_mode: true,
            }));
        let builder = builder(&storage);
        assert_eq!(builder.build_for("o", "x", &unit(0)).await, 0);
    }
}
