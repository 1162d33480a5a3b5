// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generic labeled-bucket resolution shared by categories and tags.
//!
//! A bucket is reused when its embedding clears the reuse threshold against
//! the content. Otherwise the oracle names one; a proposed name is matched
//! exactly first, then by embedding against the near-duplicate threshold,
//! and only then created. This keeps "Trips" and "Travel" from both
//! existing for the same owner.

use std::sync::Arc;

use async_trait::async_trait;
use recall_core::RecallError;
use recall_core::vector::cosine_similarity;
use tracing::{debug, warn};

use crate::embedder::CachedEmbedder;
use crate::oracle::{BucketKind, LabelOracle};

/// A category or tag as seen by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub id: String,
    pub name: String,
    pub embedding: Option<Vec<f32>>,
    pub usage_count: i64,
}

/// Persistence for one bucket kind.
#[async_trait]
pub trait BucketStore: Send + Sync {
    fn kind(&self) -> BucketKind;

    /// The identity key two names must share to denote the same bucket.
    fn normalize(&self, name: &str) -> String;

    async fn list(&self, owner_id: &str) -> Result<Vec<Bucket>, RecallError>;

    /// Exact lookup by normalized identity.
    async fn find(&self, owner_id: &str, name: &str) -> Result<Option<Bucket>, RecallError>;

    /// Create a bucket, returning the existing one if a concurrent writer won.
    async fn create(
        &self,
        owner_id: &str,
        name: &str,
        embedding: Option<Vec<f32>>,
    ) -> Result<Bucket, RecallError>;
}

/// Similarity cut-offs for one bucket kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Content-to-bucket similarity at which an existing bucket is reused.
    pub reuse: f32,
    /// Name-to-bucket similarity at which a proposed name collapses into an
    /// existing bucket.
    pub near_duplicate: f32,
}

/// Buckets whose embedding scores at least `threshold` against `embedding`,
/// best first. Buckets without an embedding never match.
pub fn ranked_matches(buckets: &[Bucket], embedding: &[f32], threshold: f32) -> Vec<(Bucket, f32)> {
    let mut scored: Vec<(Bucket, f32)> = buckets
        .iter()
        .filter_map(|b| {
            let score = cosine_similarity(b.embedding.as_deref()?, embedding);
            (score >= threshold).then(|| (b.clone(), score))
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
}

/// The single best bucket at or above `threshold`.
pub fn best_match(buckets: &[Bucket], embedding: &[f32], threshold: f32) -> Option<(Bucket, f32)> {
    ranked_matches(buckets, embedding, threshold).into_iter().next()
}

pub struct BucketResolver<S> {
    store: S,
    embedder: Arc<CachedEmbedder>,
    oracle: Arc<dyn LabelOracle>,
    thresholds: Thresholds,
}

impl<S: BucketStore> BucketResolver<S> {
    pub fn new(
        store: S,
        embedder: Arc<CachedEmbedder>,
        oracle: Arc<dyn LabelOracle>,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            store,
            embedder,
            oracle,
            thresholds,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn embedder(&self) -> &Arc<CachedEmbedder> {
        &self.embedder
    }

    /// Existing buckets that clear the reuse threshold for `embedding`.
    pub fn reusable(&self, buckets: &[Bucket], embedding: &[f32]) -> Vec<(Bucket, f32)> {
        ranked_matches(buckets, embedding, self.thresholds.reuse)
    }

    /// Ask the oracle for up to `max` names, passing the existing names along.
    pub async fn propose(
        &self,
        text: &str,
        buckets: &[Bucket],
        max: usize,
    ) -> Result<Vec<String>, RecallError> {
        let existing: Vec<String> = buckets.iter().map(|b| b.name.clone()).collect();
        self.oracle
            .propose(self.store.kind(), text, &existing, max)
            .await
    }

    /// Resolve a proposed name: exact match, then near-duplicate by
    /// embedding, then create.
    pub async fn resolve_name(
        &self,
        owner_id: &str,
        name: &str,
        buckets: &[Bucket],
    ) -> Result<Bucket, RecallError> {
        let name = name.trim();
        if self.store.normalize(name).is_empty() {
            return Err(RecallError::Validation(format!(
                "empty {} name",
                self.store.kind()
            )));
        }
        if let Some(existing) = self.store.find(owner_id, name).await? {
            return Ok(existing);
        }

        let embedding = self.embedder.embed(name).await?;
        if let Some((bucket, score)) =
            best_match(buckets, &embedding, self.thresholds.near_duplicate)
        {
            debug!(
                kind = %self.store.kind(),
                proposed = name,
                reused = %bucket.name,
                score,
                "proposed name collapsed into existing bucket"
            );
            return Ok(bucket);
        }

        let created = self.store.create(owner_id, name, Some(embedding)).await?;
        debug!(kind = %self.store.kind(), name = %created.name, "created bucket");
        Ok(created)
    }

    /// Exact lookup, else create. Used for explicit overrides, which bypass
    /// similarity entirely. The new bucket is embedded on a best-effort basis.
    pub async fn exact_or_create(&self, owner_id: &str, name: &str) -> Result<Bucket, RecallError> {
        let name = name.trim();
        if self.store.normalize(name).is_empty() {
            return Err(RecallError::Validation(format!(
                "empty {} name",
                self.store.kind()
            )));
        }
        if let Some(existing) = self.store.find(owner_id, name).await? {
            return Ok(existing);
        }
        let embedding = match self.embedder.embed(name).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!(kind = %self.store.kind(), name, error = %e, "creating bucket without embedding");
                None
            }
        };
        self.store.create(owner_id, name, embedding).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// In-memory store keyed by lowercase name.
    pub struct MemoryBucketStore {
        pub kind: BucketKind,
        pub buckets: Mutex<Vec<Bucket>>,
    }

    impl MemoryBucketStore {
        pub fn new(kind: BucketKind, buckets: Vec<Bucket>) -> Self {
            Self {
                kind,
                buckets: Mutex::new(buckets),
            }
        }

        pub fn names(&self) -> Vec<String> {
            self.buckets
                .lock()
                .unwrap()
                .iter()
                .map(|b| b.name.clone())
                .collect()
        }
    }

    #[async_trait]
    impl BucketStore for MemoryBucketStore {
        fn kind(&self) -> BucketKind {
            self.kind
        }

        fn normalize(&self, name: &str) -> String {
            name.trim().to_lowercase()
        }

        async fn list(&self, _owner_id: &str) -> Result<Vec<Bucket>, RecallError> {
            Ok(self.buckets.lock().unwrap().clone())
        }

        async fn find(&self, _owner_id: &str, name: &str) -> Result<Option<Bucket>, RecallError> {
            let key = self.normalize(name);
            Ok(self
                .buckets
                .lock()
                .unwrap()
                .iter()
                .find(|b| self.normalize(&b.name) == key)
                .cloned())
        }

        async fn create(
            &self,
            _owner_id: &str,
            name: &str,
            embedding: Option<Vec<f32>>,
        ) -> Result<Bucket, RecallError> {
            let mut buckets = self.buckets.lock().unwrap();
            let bucket = Bucket {
                id: format!("b{}", buckets.len() + 1),
                name: name.to_string(),
                embedding,
                usage_count: 0,
            };
            buckets.push(bucket.clone());
            Ok(bucket)
        }
    }

    /// Oracle returning a fixed list, or failing.
    pub struct FixedOracle(pub Result<Vec<String>, String>);

    #[async_trait]
    impl LabelOracle for FixedOracle {
        async fn propose(
            &self,
            _kind: BucketKind,
            _text: &str,
            _existing: &[String],
            max: usize,
        ) -> Result<Vec<String>, RecallError> {
            match &self.0 {
                Ok(names) => Ok(names.iter().take(max).cloned().collect()),
                Err(message) => Err(RecallError::provider(message.clone())),
            }
        }
    }

    pub fn bucket(id: &str, name: &str, embedding: Vec<f32>) -> Bucket {
        Bucket {
            id: id.to_string(),
            name: name.to_string(),
            embedding: Some(embedding),
            usage_count: 0,
        }
    }
}
