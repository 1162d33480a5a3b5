// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for unit tests in this crate.

use std::sync::Arc;
use std::time::Duration;

use recall_config::model::StorageConfig;
use recall_core::{Memory, StorageAdapter, SyncStatus, now_timestamp};
use recall_storage::SqliteStorage;
use recall_test_utils::{MockEmbedder, MockProvider};
use tempfile::TempDir;

use crate::embedder::CachedEmbedder;
use crate::llm::UtilityModel;

pub async fn storage() -> (TempDir, Arc<dyn StorageAdapter>) {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::new(StorageConfig {
        database_path: dir.path().join("test.db").to_string_lossy().into_owned(),
        wal_mode: true,
    });
    storage.initialize().await.unwrap();
    (dir, Arc::new(storage))
}

pub fn cached(mock: Arc<MockEmbedder>) -> Arc<CachedEmbedder> {
    Arc::new(CachedEmbedder::new(
        mock,
        Duration::from_secs(60),
        1000,
        Duration::from_secs(5),
    ))
}

pub fn utility(provider: Arc<MockProvider>) -> UtilityModel {
    UtilityModel::new(provider, "utility", 256, Duration::from_secs(5))
}

pub fn memory(id: &str, owner: &str, content: &str, embedding: Vec<f32>) -> Memory {
    let now = now_timestamp();
    Memory {
        id: id.to_string(),
        owner_id: owner.to_string(),
        title: format!("Title {id}"),
        content: content.to_string(),
        summary: format!("Summary of {id}"),
        embedding,
        category_id: None,
        source_channel: "test".to_string(),
        occurred_at: None,
        created_at: now.clone(),
        updated_at: now,
        sync_status: SyncStatus::Pending,
        deleted_at: None,
    }
}
