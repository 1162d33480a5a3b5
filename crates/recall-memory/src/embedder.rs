// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caching front for the embedding collaborator.
//!
//! Vectors are cached by normalized text (trimmed, whitespace collapsed,
//! lowercased) in a `DashMap`. Entries expire after the configured TTL and
//! the map is bounded: on overflow, expired entries go first, then the
//! oldest. A TTL of zero disables caching entirely.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use recall_config::model::EmbeddingConfig;
use recall_core::{EmbeddingAdapter, EmbeddingInput, RecallError, with_timeout};
use tracing::debug;

struct CacheEntry {
    vector: Arc<Vec<f32>>,
    inserted_at: Instant,
}

/// Embedding adapter wrapper with a bounded TTL cache and a per-call deadline.
pub struct CachedEmbedder {
    inner: Arc<dyn EmbeddingAdapter>,
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    max_entries: usize,
    timeout: Duration,
}

/// Cache key for a text: surrounding whitespace dropped, inner runs
/// collapsed to one space, lowercased.
pub fn normalize_cache_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl CachedEmbedder {
    pub fn new(
        inner: Arc<dyn EmbeddingAdapter>,
        ttl: Duration,
        max_entries: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            ttl,
            max_entries,
            timeout,
        }
    }

    pub fn from_config(inner: Arc<dyn EmbeddingAdapter>, config: &EmbeddingConfig) -> Self {
        Self::new(
            inner,
            Duration::from_secs(config.cache_ttl_secs),
            config.cache_max_entries,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn caching(&self) -> bool {
        !self.ttl.is_zero() && self.max_entries > 0
    }

    fn get(&self, key: &str) -> Option<Arc<Vec<f32>>> {
        if !self.caching() {
            return None;
        }
        let entry = self.entries.get(key)?;
        if entry.inserted_at.elapsed() > self.ttl {
            drop(entry);
            self.entries.remove(key);
            None
        } else {
            Some(Arc::clone(&entry.vector))
        }
    }

    fn put(&self, key: String, vector: Arc<Vec<f32>>) {
        if !self.caching() {
            return;
        }
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.make_room();
        }
        self.entries.insert(
            key,
            CacheEntry {
                vector,
                inserted_at: Instant::now(),
            },
        );
    }

    fn make_room(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.inserted_at.elapsed() <= ttl);
        while self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.value().inserted_at)
                .map(|e| e.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Number of cached vectors, expired ones included until they are touched.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embed one text, serving repeats of the same normalized text from cache.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, RecallError> {
        let key = normalize_cache_key(text);
        if let Some(hit) = self.get(&key) {
            debug!(chars = key.len(), "embedding cache hit");
            return Ok(hit.as_ref().clone());
        }

        let output = with_timeout(
            self.timeout,
            self.inner.embed(EmbeddingInput {
                texts: vec![text.to_string()],
            }),
        )
        .await?;
        let vector = output
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| RecallError::embedding("embedding returned no vector"))?;

        self.put(key, Arc::new(vector.clone()));
        Ok(vector)
    }
}
