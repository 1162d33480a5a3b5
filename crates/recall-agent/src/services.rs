// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The engines a turn can reach, wired once at startup.

use std::sync::Arc;

use recall_config::model::RecallConfig;
use recall_core::{EmbeddingAdapter, ProviderAdapter, StorageAdapter};
use recall_memory::{
    CachedEmbedder, CategoryClassifier, GraphBuilder, LabelOracle, ProviderOracle, Retriever,
    Summarizer, TagClassifier, UtilityModel,
};
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::session::SessionManager;

pub struct MemoryServices {
    pub storage: Arc<dyn StorageAdapter>,
    pub embedder: Arc<CachedEmbedder>,
    pub categories: Arc<CategoryClassifier>,
    pub tags: Arc<TagClassifier>,
    pub summarizer: Arc<Summarizer>,
    pub retriever: Arc<Retriever>,
    pub graph: Arc<GraphBuilder>,
    pub sessions: Arc<SessionManager>,
    /// Usage counting and description refreshes run here, off the reply path.
    pub tasks: TaskTracker,
    pub preview_chars: usize,
}

impl MemoryServices {
    pub fn new(
        config: &RecallConfig,
        storage: Arc<dyn StorageAdapter>,
        provider: Arc<dyn ProviderAdapter>,
        embedding: Arc<dyn EmbeddingAdapter>,
    ) -> Self {
        let embedder = Arc::new(CachedEmbedder::from_config(embedding, &config.embedding));
        let utility = UtilityModel::from_config(provider, &config.anthropic);
        let oracle: Arc<dyn LabelOracle> = Arc::new(ProviderOracle::new(utility.clone()));
        let summarizer = Arc::new(Summarizer::new(utility));

        let categories = Arc::new(CategoryClassifier::new(
            Arc::clone(&storage),
            Arc::clone(&embedder),
            Arc::clone(&oracle),
            Arc::clone(&summarizer),
            config.classification.clone(),
        ));
        let tags = Arc::new(TagClassifier::new(
            Arc::clone(&storage),
            Arc::clone(&embedder),
            oracle,
            &config.classification,
        ));
        let retriever = Arc::new(Retriever::new(
            Arc::clone(&storage),
            Arc::clone(&embedder),
            config.retrieval.clone(),
        ));
        let graph = Arc::new(GraphBuilder::new(
            Arc::clone(&retriever),
            Arc::clone(&storage),
            config.graph.clone(),
        ));
        let sessions = Arc::new(SessionManager::from_config(
            Arc::clone(&storage),
            &config.session,
        ));

        Self {
            storage,
            embedder,
            categories,
            tags,
            summarizer,
            retriever,
            graph,
            sessions,
            tasks: TaskTracker::new(),
            preview_chars: config.retrieval.preview_chars,
        }
    }

    /// Count a newly saved memory against its category and tags, then
    /// refresh the category description. Runs in the background.
    pub fn spawn_post_save(&self, owner_id: &str, category_id: Option<String>, tag_ids: Vec<String>) {
        let categories = Arc::clone(&self.categories);
        let tags = Arc::clone(&self.tags);
        let owner_id = owner_id.to_string();
        self.tasks.spawn(async move {
            if let Some(category_id) = &category_id {
                if let Err(e) = categories.record_usage(category_id, 1).await {
                    warn!(category_id, error = %e, "category usage increment failed");
                }
            }
            if let Err(e) = tags.record_usage(&tag_ids, 1).await {
                warn!(error = %e, "tag usage increment failed");
            }
            if let Some(category_id) = &category_id {
                match categories.refresh_description(&owner_id, category_id).await {
                    Ok(()) => debug!(category_id, "description refresh done"),
                    Err(e) => warn!(category_id, error = %e, "description refresh failed"),
                }
            }
        });
    }

    /// Wait for every background task spawned so far.
    pub async fn wait_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}
