// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.

pub mod categories;
pub mod links;
pub mod memories;
pub mod relationships;
pub mod sessions;
pub mod tags;

#[cfg(test)]
pub(crate) mod test_support {
    use recall_core::{Category, Memory, SyncStatus};
    use tempfile::TempDir;

    use crate::database::Database;

    pub async fn setup_db() -> (Database, TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().expect("utf8"), true)
            .await
            .expect("open");
        (db, dir)
    }

    pub fn memory(id: &str, owner: &str, content: &str, embedding: Vec<f32>) -> Memory {
        Memory {
            id: id.to_string(),
            owner_id: owner.to_string(),
            title: format!("Title {id}"),
            content: content.to_string(),
            summary: format!("Summary of {id}"),
            embedding,
            category_id: None,
            source_channel: "cli".to_string(),
            occurred_at: None,
            created_at: format!("2026-01-01T00:00:{:02}.000Z", id.len() % 60),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
            sync_status: SyncStatus::Pending,
            deleted_at: None,
        }
    }

    pub fn category(id: &str, owner: &str, name: &str) -> Category {
        Category {
            id: id.to_string(),
            owner_id: owner.to_string(),
            name: name.to_string(),
            description: None,
            color: "#3B82F6".to_string(),
            embedding: Some(vec![1.0, 0.0]),
            usage_count: 0,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }
}
