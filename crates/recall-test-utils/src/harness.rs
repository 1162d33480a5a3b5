// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end test harness.
//!
//! `TestHarness` wires the full message path (router, orchestrator, tools,
//! engines) over a temporary SQLite database, with [`MockProvider`] and
//! [`MockEmbedder`] standing in for the external models.

use std::sync::Arc;

use recall_agent::MessageRouter;
use recall_config::model::{RecallConfig, StorageConfig};
use recall_core::{InboundMessage, OutboundReply, RecallError, StorageAdapter};
use recall_storage::SqliteStorage;

use crate::mock_embedder::MockEmbedder;
use crate::mock_provider::MockProvider;

pub const TEST_OWNER: &str = "owner-1";
pub const TEST_CHANNEL: &str = "test";
pub const TEST_SENDER: &str = "tester";

pub struct TestHarnessBuilder {
    config: RecallConfig,
    provider: MockProvider,
    embedder: MockEmbedder,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = RecallConfig::default();
        config.agent.system_prompt = Some("You are a test assistant.".to_string());
        Self {
            config,
            provider: MockProvider::new(),
            embedder: MockEmbedder::new(),
        }
    }

    /// Replace the whole configuration. The storage path is always overridden.
    pub fn with_config(mut self, config: RecallConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.agent.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.config.agent.max_tool_iterations = max;
        self
    }

    pub fn with_provider(mut self, provider: MockProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_embedder(mut self, embedder: MockEmbedder) -> Self {
        self.embedder = embedder;
        self
    }

    pub async fn build(mut self) -> Result<TestHarness, RecallError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| RecallError::Storage { source: e.into() })?;
        self.config.storage = StorageConfig {
            database_path: temp_dir.path().join("test.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };

        let storage = SqliteStorage::new(self.config.storage.clone());
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);
        let provider = Arc::new(self.provider);
        let embedder = Arc::new(self.embedder);

        let router = MessageRouter::build(
            &self.config,
            Arc::clone(&storage),
            provider.clone(),
            embedder.clone(),
        )
        .await;

        Ok(TestHarness {
            provider,
            embedder,
            storage,
            router,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete Recall stack over mocks and a throwaway database.
pub struct TestHarness {
    pub provider: Arc<MockProvider>,
    pub embedder: Arc<MockEmbedder>,
    pub storage: Arc<dyn StorageAdapter>,
    pub router: MessageRouter,
    pub config: RecallConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default settings.
    pub async fn new() -> Result<Self, RecallError> {
        Self::builder().build().await
    }

    /// Send text as the default test user, whose owner is already known.
    pub async fn send(&self, text: &str) -> OutboundReply {
        self.route(self.message(text)).await
    }

    /// Press a quick-reply button as the default test user.
    pub async fn press(&self, payload: &str) -> OutboundReply {
        self.route(InboundMessage {
            button: Some(payload.to_string()),
            ..self.message("")
        })
        .await
    }

    /// Route an arbitrary inbound message.
    pub async fn route(&self, inbound: InboundMessage) -> OutboundReply {
        self.router.route(inbound).await
    }

    /// Inbound message from the default test user.
    pub fn message(&self, text: &str) -> InboundMessage {
        InboundMessage {
            owner_id: Some(TEST_OWNER.to_string()),
            channel: TEST_CHANNEL.to_string(),
            sender_id: TEST_SENDER.to_string(),
            text: text.to_string(),
            ..Default::default()
        }
    }

    /// Wait for background usage counting and description refreshes.
    pub async fn settle(&self) {
        self.router.services().wait_idle().await;
    }
}
