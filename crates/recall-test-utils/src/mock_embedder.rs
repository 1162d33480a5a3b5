// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic embedding adapter for tests.
//!
//! Texts map to bag-of-words vectors: every lowercase alphanumeric word is
//! hashed (FNV-1a) into one of [`MOCK_DIMENSIONS`] slots and the result is
//! L2-normalized. Texts that share words therefore have positive cosine
//! similarity, and identical word sets score 1.0. Individual texts can be
//! pinned to exact vectors to stage precise similarity scenarios.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use recall_core::{
    AdapterType, EmbeddingAdapter, EmbeddingInput, EmbeddingOutput, HealthStatus, PluginAdapter,
    RecallError,
};

/// Width of generated vectors. Pinned vectors may use any width.
pub const MOCK_DIMENSIONS: usize = 64;

pub struct MockEmbedder {
    pinned: Mutex<HashMap<String, Vec<f32>>>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

fn key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn fnv1a(word: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in word.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// The bag-of-words vector the mock produces for `text`.
pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; MOCK_DIMENSIONS];
    for word in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        vector[(fnv1a(word) % MOCK_DIMENSIONS as u64) as usize] += 1.0;
    }
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        // Punctuation-only input still needs a usable vector.
        vector[0] = 1.0;
    } else {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
    vector
}

/// A unit vector of mock width along `axis`.
pub fn unit(axis: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; MOCK_DIMENSIONS];
    vector[axis % MOCK_DIMENSIONS] = 1.0;
    vector
}

/// A unit vector whose cosine similarity to `unit(axis)` is exactly
/// `similarity`, tilted toward `unit(toward)`.
pub fn at_similarity(axis: usize, toward: usize, similarity: f32) -> Vec<f32> {
    let mut vector = vec![0.0f32; MOCK_DIMENSIONS];
    vector[axis % MOCK_DIMENSIONS] = similarity;
    vector[toward % MOCK_DIMENSIONS] = (1.0 - similarity * similarity).max(0.0).sqrt();
    vector
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            pinned: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Pin `text` (compared after trimming, whitespace collapsing, and
    /// lowercasing) to an exact vector.
    pub fn with_vector(self, text: &str, vector: Vec<f32>) -> Self {
        self.pin(text, vector);
        self
    }

    pub fn pin(&self, text: &str, vector: Vec<f32>) {
        self.pinned
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key(text), vector);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `embed` calls made (one per batch).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The vector this mock returns for `text`.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        self.pinned
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&key(text))
            .cloned()
            .unwrap_or_else(|| bag_of_words(text))
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, RecallError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RecallError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, RecallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RecallError::embedding("mock embedder failure"));
        }
        let embeddings: Vec<Vec<f32>> = input.texts.iter().map(|t| self.vector_for(t)).collect();
        let dimensions = embeddings.first().map_or(MOCK_DIMENSIONS, Vec::len);
        Ok(EmbeddingOutput {
            embeddings,
            dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::vector::cosine_similarity;

    #[test]
    fn shared_words_score_higher() {
        let lake = bag_of_words("kayak on the lake");
        let lake_again = bag_of_words("The LAKE, kayak on");
        let office = bag_of_words("quarterly budget review");
        assert!((cosine_similarity(&lake, &lake_again) - 1.0).abs() < 1e-5);
        assert!(cosine_similarity(&lake, &office) < cosine_similarity(&lake, &lake_again));
    }

    #[test]
    fn staged_vectors_hit_requested_similarity() {
        let base = unit(3);
        let near = at_similarity(3, 7, 0.9);
        assert!((cosine_similarity(&base, &near) - 0.9).abs() < 1e-5);
    }

    #[tokio::test]
    async fn pinned_vectors_override_hashing() {
        let embedder = MockEmbedder::new().with_vector("Travel", vec![1.0, 0.0]);
        let out = embedder
            .embed(EmbeddingInput {
                texts: vec!["  travel ".into(), "other".into()],
            })
            .await
            .expect("embed");
        assert_eq!(out.embeddings[0], vec![1.0, 0.0]);
        assert_eq!(out.embeddings[1].len(), MOCK_DIMENSIONS);
        assert_eq!(embedder.call_count(), 1);
    }
}
