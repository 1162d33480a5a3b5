// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixtures for unit tests: services over a temporary database and mocks.

use std::sync::Arc;

use recall_config::model::{RecallConfig, StorageConfig};
use recall_core::{ConversationSession, StorageAdapter};
use recall_storage::SqliteStorage;
use recall_test_utils::{MockEmbedder, MockProvider};
use serde_json::Value;
use tempfile::TempDir;

use crate::services::MemoryServices;
use crate::tools::{Tool, ToolContext, ToolOutput};

pub struct Fixture {
    _dir: TempDir,
    pub storage: Arc<dyn StorageAdapter>,
    pub provider: Arc<MockProvider>,
    pub embedder: Arc<MockEmbedder>,
    pub services: Arc<MemoryServices>,
    pub session: ConversationSession,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_config(RecallConfig::default()).await
    }

    pub async fn with_config(config: RecallConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("test.db").to_string_lossy().into_owned(),
            wal_mode: true,
        });
        storage.initialize().await.unwrap();
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);
        let provider = Arc::new(MockProvider::new());
        let embedder = Arc::new(MockEmbedder::new());
        let services = Arc::new(MemoryServices::new(
            &config,
            Arc::clone(&storage),
            provider.clone(),
            embedder.clone(),
        ));
        let session = services
            .sessions
            .load_or_create("owner-1", "test", "user-1")
            .await
            .unwrap();
        Self {
            _dir: dir,
            storage,
            provider,
            embedder,
            services,
            session,
        }
    }

    pub fn ctx(&self) -> ToolContext {
        ToolContext {
            owner_id: self.session.owner_id.clone(),
            session_id: self.session.id.clone(),
            channel: self.session.channel.clone(),
        }
    }

    pub async fn session(&self) -> ConversationSession {
        self.services.sessions.get(&self.session.id).await.unwrap()
    }

    /// Script the utility model: titles, one category, and tags.
    pub fn script_labels(&self, title: &str, category: &str, tags: &[&str]) {
        let title = serde_json::json!({"title": title, "summary": format!("About {title}.")}).to_string();
        let category = serde_json::json!([category]).to_string();
        let tags = serde_json::json!(tags).to_string();
        self.provider.set_utility(move |req| {
            let text = recall_test_utils::mock_provider::last_user_text(req);
            Ok(if text.starts_with("Write a short title") {
                title.clone()
            } else if text.starts_with("Pick one category") {
                category.clone()
            } else if text.starts_with("Suggest up to") {
                tags.clone()
            } else {
                "Everyday moments.".to_string()
            })
        });
    }

    pub async fn call(&self, tool: &dyn Tool, input: Value) -> ToolOutput {
        tool.invoke(&self.ctx(), input).await.unwrap()
    }
}
