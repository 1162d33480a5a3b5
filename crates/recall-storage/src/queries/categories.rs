// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Category bucket persistence.

use recall_core::vector::vec_to_blob;
use recall_core::{Category, RecallError, now_timestamp};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err, storage_msg};
use crate::models::{CATEGORY_COLUMNS, category_from_row};

/// All categories for an owner, most used first.
pub async fn list_categories(db: &Database, owner_id: &str) -> Result<Vec<Category>, RecallError> {
    let owner_id = owner_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Category>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CATEGORY_COLUMNS} FROM categories WHERE owner_id = ?1
                 ORDER BY usage_count DESC, name"
            ))?;
            stmt.query_map(params![owner_id], category_from_row)?.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_category(
    db: &Database,
    owner_id: &str,
    id: &str,
) -> Result<Option<Category>, RecallError> {
    let owner_id = owner_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Category>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1 AND owner_id = ?2"),
                params![id, owner_id],
                category_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Case-insensitive exact lookup on the trimmed name.
pub async fn find_category_by_name(
    db: &Database,
    owner_id: &str,
    name: &str,
) -> Result<Option<Category>, RecallError> {
    let owner_id = owner_id.to_string();
    let name = name.trim().to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Category>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {CATEGORY_COLUMNS} FROM categories
                     WHERE owner_id = ?1 AND name = ?2 COLLATE NOCASE"
                ),
                params![owner_id, name],
                category_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a category, returning whichever row owns the name afterwards.
///
/// A concurrent insert of the same name is not an error: the unique index
/// turns the second insert into a no-op and the winner's row is returned.
pub async fn insert_category(db: &Database, category: &Category) -> Result<Category, RecallError> {
    let c = category.clone();
    let stored = db
        .connection()
        .call(move |conn| -> Result<Option<Category>, rusqlite::Error> {
            conn.execute(
                "INSERT OR IGNORE INTO categories (id, owner_id, name, description, color,
                    embedding, usage_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    c.id,
                    c.owner_id,
                    c.name.trim(),
                    c.description,
                    c.color,
                    c.embedding.as_deref().map(vec_to_blob),
                    c.usage_count,
                    c.created_at,
                    c.updated_at,
                ],
            )?;
            conn.query_row(
                &format!(
                    "SELECT {CATEGORY_COLUMNS} FROM categories
                     WHERE owner_id = ?1 AND name = ?2 COLLATE NOCASE"
                ),
                params![c.owner_id, c.name.trim()],
                category_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    stored.ok_or_else(|| storage_msg(format!("category {} vanished after insert", category.id)))
}

/// Add `delta` to a category's usage count, clamping at zero.
pub async fn adjust_category_usage(db: &Database, id: &str, delta: i64) -> Result<(), RecallError> {
    let id = id.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE categories SET usage_count = MAX(usage_count + ?1, 0), updated_at = ?2
                 WHERE id = ?3",
                params![delta, now, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_category_description(
    db: &Database,
    id: &str,
    description: &str,
) -> Result<(), RecallError> {
    let id = id.to_string();
    let description = description.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE categories SET description = ?1, updated_at = ?2 WHERE id = ?3",
                params![description, now, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{category, setup_db};

    #[tokio::test]
    async fn name_lookup_ignores_case_and_whitespace() {
        let (db, _dir) = setup_db().await;
        insert_category(&db, &category("c1", "alice", "Travel")).await.expect("insert");

        let found = find_category_by_name(&db, "alice", "  travel ").await.expect("find");
        assert_eq!(found.map(|c| c.id).as_deref(), Some("c1"));
        assert!(find_category_by_name(&db, "bob", "Travel").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_returns_existing_row() {
        let (db, _dir) = setup_db().await;
        let first = insert_category(&db, &category("c1", "alice", "Family"))
            .await
            .expect("insert");
        let second = insert_category(&db, &category("c2", "alice", "FAMILY"))
            .await
            .expect("insert");
        assert_eq!(first.id, "c1");
        assert_eq!(second.id, "c1");
        assert_eq!(list_categories(&db, "alice").await.expect("list").len(), 1);

        // Other owners get their own bucket.
        let other = insert_category(&db, &category("c3", "bob", "Family"))
            .await
            .expect("insert");
        assert_eq!(other.id, "c3");
    }

    #[tokio::test]
    async fn usage_never_goes_negative() {
        let (db, _dir) = setup_db().await;
        insert_category(&db, &category("c1", "alice", "Work")).await.expect("insert");
        adjust_category_usage(&db, "c1", 2).await.expect("inc");
        adjust_category_usage(&db, "c1", -5).await.expect("dec");
        let c = get_category(&db, "alice", "c1").await.expect("get").expect("exists");
        assert_eq!(c.usage_count, 0);
    }

    #[tokio::test]
    async fn description_and_embedding_persist() {
        let (db, _dir) = setup_db().await;
        insert_category(&db, &category("c1", "alice", "Work")).await.expect("insert");
        set_category_description(&db, "c1", "Projects and colleagues.")
            .await
            .expect("describe");
        let c = get_category(&db, "alice", "c1").await.expect("get").expect("exists");
        assert_eq!(c.description.as_deref(), Some("Projects and colleagues."));
        assert_eq!(c.embedding, Some(vec![1.0, 0.0]));
    }
}
