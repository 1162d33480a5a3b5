// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Category assignment.
//!
//! Order of precedence: explicit override, exact lookup for short labels,
//! embedding reuse, oracle naming (exact, near-duplicate, create). Any
//! embedding or reasoning failure lands the memory in the default category.

use std::sync::Arc;

use async_trait::async_trait;
use recall_config::model::ClassificationConfig;
use recall_core::{Category, RecallError, StorageAdapter, now_timestamp};
use tracing::{debug, warn};

use crate::bucket::{Bucket, BucketResolver, BucketStore, Thresholds, best_match};
use crate::embedder::CachedEmbedder;
use crate::oracle::{BucketKind, LabelOracle};
use crate::summarizer::Summarizer;
use crate::text::is_short_label;

/// Colors handed to new categories, least-used first.
pub const PALETTE: [&str; 8] = [
    "#3B82F6", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#EC4899", "#14B8A6", "#F97316",
];

/// The palette color carried by the fewest categories. Ties go to palette order.
pub fn pick_color(existing: &[Category]) -> &'static str {
    PALETTE
        .iter()
        .min_by_key(|color| existing.iter().filter(|c| c.color == **color).count())
        .copied()
        .unwrap_or(PALETTE[0])
}

fn display_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn to_bucket(category: Category) -> Bucket {
    Bucket {
        id: category.id,
        name: category.name,
        embedding: category.embedding,
        usage_count: category.usage_count,
    }
}

/// [`BucketStore`] over the categories table.
pub struct CategoryStore {
    storage: Arc<dyn StorageAdapter>,
}

impl CategoryStore {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl BucketStore for CategoryStore {
    fn kind(&self) -> BucketKind {
        BucketKind::Category
    }

    fn normalize(&self, name: &str) -> String {
        display_name(name).to_lowercase()
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Bucket>, RecallError> {
        let categories = self.storage.list_categories(owner_id).await?;
        Ok(categories.into_iter().map(to_bucket).collect())
    }

    async fn find(&self, owner_id: &str, name: &str) -> Result<Option<Bucket>, RecallError> {
        let found = self
            .storage
            .find_category_by_name(owner_id, &display_name(name))
            .await?;
        Ok(found.map(to_bucket))
    }

    async fn create(
        &self,
        owner_id: &str,
        name: &str,
        embedding: Option<Vec<f32>>,
    ) -> Result<Bucket, RecallError> {
        let existing = self.storage.list_categories(owner_id).await?;
        let now = now_timestamp();
        let category = Category {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: display_name(name),
            description: None,
            color: pick_color(&existing).to_string(),
            embedding,
            usage_count: 0,
            created_at: now.clone(),
            updated_at: now,
        };
        let stored = self.storage.insert_category(&category).await?;
        Ok(to_bucket(stored))
    }
}

/// How the caller wants the category chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryChoice {
    /// Classify the content from scratch.
    Auto,
    /// A name previously suggested for the draft; resolved through the
    /// near-duplicate check.
    Suggested(String),
    /// A user-supplied name: exact lookup, otherwise created as-is.
    Override(String),
}

pub struct CategoryClassifier {
    resolver: BucketResolver<CategoryStore>,
    storage: Arc<dyn StorageAdapter>,
    summarizer: Arc<Summarizer>,
    config: ClassificationConfig,
}

impl CategoryClassifier {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        embedder: Arc<CachedEmbedder>,
        oracle: Arc<dyn LabelOracle>,
        summarizer: Arc<Summarizer>,
        config: ClassificationConfig,
    ) -> Self {
        let thresholds = Thresholds {
            reuse: config.category_reuse_threshold,
            near_duplicate: config.category_near_duplicate_threshold,
        };
        Self {
            resolver: BucketResolver::new(
                CategoryStore::new(Arc::clone(&storage)),
                embedder,
                oracle,
                thresholds,
            ),
            storage,
            summarizer,
            config,
        }
    }

    /// Name to show in a draft preview. Never creates anything and never
    /// fails: errors fall back to the default category name.
    pub async fn suggest(&self, owner_id: &str, text: &str, embedding: Option<&[f32]>) -> String {
        match self.try_suggest(owner_id, text, embedding).await {
            Ok(Some(name)) => name,
            Ok(None) => self.config.default_category.clone(),
            Err(e) => {
                warn!(owner_id, error = %e, "category suggestion failed, using default");
                self.config.default_category.clone()
            }
        }
    }

    async fn try_suggest(
        &self,
        owner_id: &str,
        text: &str,
        embedding: Option<&[f32]>,
    ) -> Result<Option<String>, RecallError> {
        let store = self.resolver.store();
        if is_short_label(text, self.config.short_label_max_words) {
            if let Some(found) = store.find(owner_id, text).await? {
                return Ok(Some(found.name));
            }
        }
        let buckets = store.list(owner_id).await?;
        let embedding = match embedding {
            Some(e) => e.to_vec(),
            None => self.resolver.embedder().embed(text).await?,
        };
        if let Some((bucket, _)) = best_match(&buckets, &embedding, self.resolver.thresholds().reuse) {
            return Ok(Some(bucket.name));
        }
        let Some(proposed) = self.resolver.propose(text, &buckets, 1).await?.into_iter().next() else {
            return Ok(None);
        };
        match store.find(owner_id, &proposed).await? {
            Some(existing) => Ok(Some(existing.name)),
            None => Ok(Some(display_name(&proposed))),
        }
    }

    /// Full classification of `text` to a persisted category.
    pub async fn classify(
        &self,
        owner_id: &str,
        text: &str,
        embedding: Option<&[f32]>,
    ) -> Result<Bucket, RecallError> {
        let store = self.resolver.store();
        if is_short_label(text, self.config.short_label_max_words) {
            if let Some(found) = store.find(owner_id, text).await? {
                debug!(owner_id, category = %found.name, "short label matched exactly");
                return Ok(found);
            }
        }

        let buckets = store.list(owner_id).await?;
        let embedding = match embedding {
            Some(e) => e.to_vec(),
            None => self.resolver.embedder().embed(text).await?,
        };
        if let Some((bucket, score)) = best_match(&buckets, &embedding, self.resolver.thresholds().reuse) {
            debug!(owner_id, category = %bucket.name, score, "reusing similar category");
            return Ok(bucket);
        }

        let proposed = self
            .resolver
            .propose(text, &buckets, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RecallError::provider("no category proposed"))?;
        self.resolver.resolve_name(owner_id, &proposed, &buckets).await
    }

    /// Resolve the category for a memory being saved.
    ///
    /// External failures and unusable names degrade to the default
    /// category; storage failures propagate.
    pub async fn assign(
        &self,
        owner_id: &str,
        text: &str,
        embedding: Option<&[f32]>,
        choice: CategoryChoice,
    ) -> Result<Bucket, RecallError> {
        let outcome = match choice {
            CategoryChoice::Override(name) if !name.trim().is_empty() => {
                return self.resolver.exact_or_create(owner_id, &name).await;
            }
            CategoryChoice::Suggested(name) if !name.trim().is_empty() => {
                let buckets = self.resolver.store().list(owner_id).await?;
                self.resolver.resolve_name(owner_id, &name, &buckets).await
            }
            _ => self.classify(owner_id, text, embedding).await,
        };
        match outcome {
            Ok(bucket) => Ok(bucket),
            Err(e) if e.is_external() || matches!(e, RecallError::Validation(_)) => {
                warn!(owner_id, error = %e, "category classification degraded to default");
                self.default_category(owner_id).await
            }
            Err(e) => Err(e),
        }
    }

    pub async fn default_category(&self, owner_id: &str) -> Result<Bucket, RecallError> {
        self.resolver
            .exact_or_create(owner_id, &self.config.default_category)
            .await
    }

    pub async fn record_usage(&self, category_id: &str, delta: i64) -> Result<(), RecallError> {
        self.storage.adjust_category_usage(category_id, delta).await
    }

    /// Regenerate a category's description from its newest summaries.
    pub async fn refresh_description(
        &self,
        owner_id: &str,
        category_id: &str,
    ) -> Result<(), RecallError> {
        let category = self
            .storage
            .get_category(owner_id, category_id)
            .await?
            .ok_or_else(|| RecallError::NotFound {
                entity: "category",
                id: category_id.to_string(),
            })?;
        let summaries = self
            .storage
            .recent_category_summaries(owner_id, category_id, self.config.description_sample_size)
            .await?;
        if summaries.is_empty() {
            return Ok(());
        }
        let description = self
            .summarizer
            .describe_category(&category.name, &summaries)
            .await?;
        self.storage
            .set_category_description(category_id, &description)
            .await?;
        debug!(category = %category.name, "category description refreshed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::test_support::FixedOracle;
    use crate::llm::UtilityModel;
    use crate::test_support::{cached, memory, storage, utility};

    use recall_test_utils::mock_embedder::{at_similarity, unit};
    use recall_test_utils::{MockEmbedder, MockProvider};

    fn config() -> ClassificationConfig {
        ClassificationConfig::default()
    }

    fn classifier(
        storage: Arc<dyn StorageAdapter>,
        mock: Arc<MockEmbedder>,
        oracle: FixedOracle,
    ) -> CategoryClassifier {
        let provider = Arc::new(MockProvider::new());
        let summarizer = Arc::new(Summarizer::new(utility(provider)));
        CategoryClassifier::new(storage, cached(mock), Arc::new(oracle), summarizer, config())
    }

    fn category(owner: &str, name: &str, color: &str, embedding: Vec<f32>) -> Category {
        let now = now_timestamp();
        Category {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner.into(),
            name: name.into(),
            description: None,
            color: color.into(),
            embedding: Some(embedding),
            usage_count: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[test]
    fn palette_picks_least_used_then_first() {
        assert_eq!(pick_color(&[]), PALETTE[0]);
        let used = vec![
            category("o", "a", PALETTE[0], unit(0)),
            category("o", "b", PALETTE[1], unit(1)),
        ];
        assert_eq!(pick_color(&used), PALETTE[2]);
        let all: Vec<Category> = PALETTE
            .iter()
            .enumerate()
            .map(|(i, c)| category("o", &format!("c{i}"), c, unit(i)))
            .collect();
        assert_eq!(pick_color(&all), PALETTE[0]);
    }

    #[tokio::test]
    async fn similarity_above_threshold_reuses_below_does_not() {
        let (_dir, storage) = storage().await;
        let travel = storage
            .insert_category(&category("o", "Travel", PALETTE[0], unit(0)))
            .await
            .unwrap();
        let mock = Arc::new(MockEmbedder::new().with_vector("Cooking", unit(5)));
        let classifier = classifier(
            Arc::clone(&storage),
            mock,
            FixedOracle(Ok(vec!["Cooking".into()])),
        );

        let close = at_similarity(0, 1, 0.9);
        let reused = classifier
            .classify("o", "We flew to Lisbon and walked the hills.", Some(&close))
            .await
            .unwrap();
        assert_eq!(reused.id, travel.id);

        let far = at_similarity(0, 1, 0.4);
        let other = classifier
            .classify("o", "We baked sourdough bread all weekend.", Some(&far))
            .await
            .unwrap();
        assert_ne!(other.id, travel.id);
        assert_eq!(other.name, "Cooking");
    }

    #[tokio::test]
    async fn short_label_matches_existing_name_exactly() {
        let (_dir, storage) = storage().await;
        let work = storage
            .insert_category(&category("o", "Work", PALETTE[0], unit(7)))
            .await
            .unwrap();
        let mock = Arc::new(MockEmbedder::new());
        let classifier = classifier(Arc::clone(&storage), mock.clone(), FixedOracle(Ok(vec![])));

        let found = classifier.classify("o", "work", None).await.unwrap();
        assert_eq!(found.id, work.id);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn override_always_wins() {
        let (_dir, storage) = storage().await;
        storage
            .insert_category(&category("o", "Travel", PALETTE[0], unit(0)))
            .await
            .unwrap();
        let classifier = classifier(
            Arc::clone(&storage),
            Arc::new(MockEmbedder::new()),
            FixedOracle(Ok(vec!["Travel".into()])),
        );
        let close = unit(0);
        let chosen = classifier
            .assign(
                "o",
                "Trip to Rome.",
                Some(&close),
                CategoryChoice::Override("Family".into()),
            )
            .await
            .unwrap();
        assert_eq!(chosen.name, "Family");
        let categories = storage.list_categories("o").await.unwrap();
        let family = categories.iter().find(|c| c.name == "Family").unwrap();
        assert_eq!(family.color, PALETTE[1]);
    }

    #[tokio::test]
    async fn failures_degrade_to_default_category() {
        let (_dir, storage) = storage().await;
        let mock = Arc::new(MockEmbedder::new());
        mock.set_failing(true);
        let classifier = classifier(
            Arc::clone(&storage),
            mock,
            FixedOracle(Err("model down".into())),
        );
        let chosen = classifier
            .assign("o", "A long sentence about things.", None, CategoryChoice::Auto)
            .await
            .unwrap();
        assert_eq!(chosen.name, "General");

        let again = classifier
            .assign("o", "Another sentence entirely.", None, CategoryChoice::Auto)
            .await
            .unwrap();
        assert_eq!(again.id, chosen.id);
    }

    #[tokio::test]
    async fn suggest_never_creates() {
        let (_dir, storage) = storage().await;
        let classifier = classifier(
            Arc::clone(&storage),
            Arc::new(MockEmbedder::new()),
            FixedOracle(Ok(vec!["Gardening".into()])),
        );
        let name = classifier
            .suggest("o", "Planted tomatoes along the fence.", None)
            .await;
        assert_eq!(name, "Gardening");
        assert!(storage.list_categories("o").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn description_refresh_uses_recent_summaries() {
        let (_dir, storage) = storage().await;
        let travel = storage
            .insert_category(&category("o", "Travel", PALETTE[0], unit(0)))
            .await
            .unwrap();
        let mut m = memory("m1", "o", "Porto trip", unit(0));
        m.category_id = Some(travel.id.clone());
        storage.insert_memory(&m).await.unwrap();

        let provider = Arc::new(MockProvider::new());
        provider.set_utility(|_| Ok("Trips away from home.".to_string()));
        let summarizer = Arc::new(Summarizer::new(UtilityModel::new(
            provider,
            "utility",
            128,
            std::time::Duration::from_secs(5),
        )));
        let classifier = CategoryClassifier::new(
            Arc::clone(&storage),
            cached(Arc::new(MockEmbedder::new())),
            Arc::new(FixedOracle(Ok(vec![]))),
            summarizer,
            config(),
        );
        classifier.refresh_description("o", &travel.id).await.unwrap();
        let updated = storage.get_category("o", &travel.id).await.unwrap().unwrap();
        assert_eq!(updated.description.as_deref(), Some("Trips away from home."));
    }
}
