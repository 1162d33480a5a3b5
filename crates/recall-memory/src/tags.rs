// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tag extraction over the shared bucket resolver.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use recall_config::model::ClassificationConfig;
use recall_core::{RecallError, StorageAdapter, Tag, now_timestamp};
use tracing::warn;

use crate::bucket::{Bucket, BucketResolver, BucketStore, Thresholds};
use crate::embedder::CachedEmbedder;
use crate::oracle::{BucketKind, LabelOracle};

/// Canonical tag identity: lowercase, whitespace runs to `-`, only
/// `[a-z0-9-]` kept, hyphen runs collapsed, no leading or trailing hyphens.
pub fn normalize_tag(name: &str) -> String {
    let dashed = name.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join("-");
    let mut out = String::with_capacity(dashed.len());
    for c in dashed.chars() {
        let keep = c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-';
        if !keep || (c == '-' && out.ends_with('-')) {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('-').to_string()
}

fn to_bucket(tag: Tag) -> Bucket {
    Bucket {
        id: tag.id,
        name: tag.name,
        embedding: tag.embedding,
        usage_count: tag.usage_count,
    }
}

/// Keeps the first occurrence of each normalized name, dropping blanks.
fn dedup_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|n| {
            let key = normalize_tag(n);
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}

/// [`BucketStore`] over the tags table.
pub struct TagStore {
    storage: Arc<dyn StorageAdapter>,
}

impl TagStore {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl BucketStore for TagStore {
    fn kind(&self) -> BucketKind {
        BucketKind::Tag
    }

    fn normalize(&self, name: &str) -> String {
        normalize_tag(name)
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Bucket>, RecallError> {
        let tags = self.storage.list_tags(owner_id).await?;
        Ok(tags.into_iter().map(to_bucket).collect())
    }

    async fn find(&self, owner_id: &str, name: &str) -> Result<Option<Bucket>, RecallError> {
        let found = self
            .storage
            .find_tag_by_normalized(owner_id, &normalize_tag(name))
            .await?;
        Ok(found.map(to_bucket))
    }

    async fn create(
        &self,
        owner_id: &str,
        name: &str,
        embedding: Option<Vec<f32>>,
    ) -> Result<Bucket, RecallError> {
        let normalized = normalize_tag(name);
        let tag = Tag {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: name.split_whitespace().collect::<Vec<_>>().join(" "),
            normalized_name: normalized,
            embedding,
            usage_count: 0,
            created_at: now_timestamp(),
        };
        let stored = self.storage.insert_tag(&tag).await?;
        Ok(to_bucket(stored))
    }
}

/// How the caller wants tags chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagChoice {
    Auto,
    /// Names previously suggested for the draft.
    Suggested(Vec<String>),
    /// User-supplied names, created as-is when missing.
    Override(Vec<String>),
}

pub struct TagClassifier {
    resolver: BucketResolver<TagStore>,
    storage: Arc<dyn StorageAdapter>,
    max_tags: usize,
}

impl TagClassifier {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        embedder: Arc<CachedEmbedder>,
        oracle: Arc<dyn LabelOracle>,
        config: &ClassificationConfig,
    ) -> Self {
        let thresholds = Thresholds {
            reuse: config.tag_reuse_threshold,
            near_duplicate: config.tag_near_duplicate_threshold,
        };
        Self {
            resolver: BucketResolver::new(
                TagStore::new(Arc::clone(&storage)),
                embedder,
                oracle,
                thresholds,
            ),
            storage,
            max_tags: config.max_tags_per_memory,
        }
    }

    /// Tag names for `text`: reusable existing tags first, topped up with
    /// oracle proposals. Never creates anything; failures shrink the list.
    pub async fn suggest(&self, owner_id: &str, text: &str, embedding: Option<&[f32]>) -> Vec<String> {
        let buckets = match self.resolver.store().list(owner_id).await {
            Ok(buckets) => buckets,
            Err(e) => {
                warn!(owner_id, error = %e, "listing tags failed");
                return Vec::new();
            }
        };

        let embedding = match embedding {
            Some(e) => Some(e.to_vec()),
            None => match self.resolver.embedder().embed(text).await {
                Ok(e) => Some(e),
                Err(e) => {
                    warn!(owner_id, error = %e, "tag embedding failed");
                    None
                }
            },
        };
        let mut names: Vec<String> = embedding
            .map(|e| {
                self.resolver
                    .reusable(&buckets, &e)
                    .into_iter()
                    .map(|(b, _)| b.name)
                    .collect()
            })
            .unwrap_or_default();
        names.truncate(self.max_tags);

        if names.len() < self.max_tags {
            match self
                .resolver
                .propose(text, &buckets, self.max_tags - names.len())
                .await
            {
                Ok(proposed) => names.extend(proposed),
                Err(e) => warn!(owner_id, error = %e, "tag proposal failed"),
            }
        }

        let mut names = dedup_names(names);
        names.truncate(self.max_tags);
        names
    }

    /// Resolve tags for a memory being saved. External failures drop the
    /// affected tag; storage failures propagate.
    pub async fn assign(
        &self,
        owner_id: &str,
        text: &str,
        embedding: Option<&[f32]>,
        choice: TagChoice,
    ) -> Result<Vec<Bucket>, RecallError> {
        let (names, exact) = match choice {
            TagChoice::Override(names) => (dedup_names(names), true),
            TagChoice::Suggested(names) => (dedup_names(names), false),
            TagChoice::Auto => (self.suggest(owner_id, text, embedding).await, false),
        };
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let buckets = self.resolver.store().list(owner_id).await?;
        let mut resolved: Vec<Bucket> = Vec::with_capacity(names.len());
        for name in names {
            let outcome = if exact {
                self.resolver.exact_or_create(owner_id, &name).await
            } else {
                self.resolver.resolve_name(owner_id, &name, &buckets).await
            };
            match outcome {
                Ok(bucket) => {
                    if !resolved.iter().any(|b| b.id == bucket.id) {
                        resolved.push(bucket);
                    }
                }
                Err(e) if e.is_external() || matches!(e, RecallError::Validation(_)) => {
                    warn!(owner_id, tag = %name, error = %e, "dropping tag");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(resolved)
    }

    pub async fn record_usage(&self, tag_ids: &[String], delta: i64) -> Result<(), RecallError> {
        for id in tag_ids {
            self.storage.adjust_tag_usage(id, delta).await?;
        }
        Ok(())
    }
}
