// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory CRUD, similarity search, and full-text keyword search.
//!
//! Vector similarity is computed in-process over the owner's stored
//! embeddings. Keyword search runs against the `memories_fts` FTS5 index,
//! which triggers keep in step with the base table.

use std::collections::HashMap;

use recall_core::vector::{cosine_similarity, vec_to_blob};
use recall_core::{Memory, RecallError, now_timestamp};
use rusqlite::{OptionalExtension, params, params_from_iter};
use tracing::debug;

use crate::database::{Database, map_tr_err};
use crate::models::{MEMORY_COLUMNS, content_hash, memory_from_row};

/// Insert a memory row (the FTS index is populated by trigger).
pub async fn insert_memory(db: &Database, memory: &Memory) -> Result<(), RecallError> {
    let m = memory.clone();
    let hash = content_hash(&m.content);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO memories (id, owner_id, title, content, content_hash, summary,
                    embedding, category_id, source_channel, occurred_at, sync_status,
                    created_at, updated_at, deleted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    m.id,
                    m.owner_id,
                    m.title,
                    m.content,
                    hash,
                    m.summary,
                    vec_to_blob(&m.embedding),
                    m.category_id,
                    m.source_channel,
                    m.occurred_at,
                    m.sync_status.to_string(),
                    m.created_at,
                    m.updated_at,
                    m.deleted_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a live memory by ID, scoped to its owner.
pub async fn get_memory(
    db: &Database,
    owner_id: &str,
    id: &str,
) -> Result<Option<Memory>, RecallError> {
    let owner_id = owner_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Memory>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {MEMORY_COLUMNS} FROM memories
                     WHERE id = ?1 AND owner_id = ?2 AND deleted_at IS NULL"
                ),
                params![id, owner_id],
                memory_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Load live memories by ID, preserving the order of `ids`. Unknown or
/// deleted IDs are skipped.
pub async fn get_memories_by_ids(
    db: &Database,
    owner_id: &str,
    ids: &[String],
) -> Result<Vec<Memory>, RecallError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let owner_id = owner_id.to_string();
    let ids = ids.to_vec();
    db.connection()
        .call(move |conn| -> Result<Vec<Memory>, rusqlite::Error> {
            let placeholders = (0..ids.len())
                .map(|i| format!("?{}", i + 2))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT {MEMORY_COLUMNS} FROM memories
                 WHERE owner_id = ?1 AND deleted_at IS NULL AND id IN ({placeholders})"
            );
            let mut stmt = conn.prepare(&sql)?;
            let bind = std::iter::once(owner_id.clone()).chain(ids.iter().cloned());
            let mut by_id: HashMap<String, Memory> = stmt
                .query_map(params_from_iter(bind), memory_from_row)?
                .map(|row| row.map(|m| (m.id.clone(), m)))
                .collect::<Result<_, _>>()?;
            Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
        })
        .await
        .map_err(map_tr_err)
}

/// Find a live memory whose body is exactly `content`.
pub async fn find_memory_by_content(
    db: &Database,
    owner_id: &str,
    content: &str,
) -> Result<Option<Memory>, RecallError> {
    let owner_id = owner_id.to_string();
    let content = content.to_string();
    let hash = content_hash(&content);
    db.connection()
        .call(move |conn| -> Result<Option<Memory>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {MEMORY_COLUMNS} FROM memories
                     WHERE owner_id = ?1 AND content_hash = ?2 AND content = ?3
                       AND deleted_at IS NULL
                     ORDER BY created_at LIMIT 1"
                ),
                params![owner_id, hash, content],
                memory_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Rewrite a live memory's editable fields. Returns false if nothing matched.
pub async fn update_memory(db: &Database, memory: &Memory) -> Result<bool, RecallError> {
    let m = memory.clone();
    let hash = content_hash(&m.content);
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE memories
                 SET title = ?1, content = ?2, content_hash = ?3, summary = ?4, embedding = ?5,
                     category_id = ?6, occurred_at = ?7, sync_status = ?8, updated_at = ?9
                 WHERE id = ?10 AND owner_id = ?11 AND deleted_at IS NULL",
                params![
                    m.title,
                    m.content,
                    hash,
                    m.summary,
                    vec_to_blob(&m.embedding),
                    m.category_id,
                    m.occurred_at,
                    m.sync_status.to_string(),
                    m.updated_at,
                    m.id,
                    m.owner_id,
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Soft-delete a memory and release its classification in one transaction.
pub async fn soft_delete_memory(
    db: &Database,
    owner_id: &str,
    id: &str,
) -> Result<bool, RecallError> {
    let owner_id = owner_id.to_string();
    let id = id.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let category: Option<Option<String>> = tx
                .query_row(
                    "SELECT category_id FROM memories
                     WHERE id = ?1 AND owner_id = ?2 AND deleted_at IS NULL",
                    params![id, owner_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(category_id) = category else {
                return Ok(false);
            };

            tx.execute(
                "UPDATE memories SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2",
                params![now, id],
            )?;
            if let Some(category_id) = category_id {
                tx.execute(
                    "UPDATE categories SET usage_count = MAX(usage_count - 1, 0), updated_at = ?1
                     WHERE id = ?2",
                    params![now, category_id],
                )?;
            }
            tx.execute(
                "UPDATE tags SET usage_count = MAX(usage_count - 1, 0)
                 WHERE id IN (SELECT tag_id FROM memory_tags WHERE memory_id = ?1)",
                params![id],
            )?;
            tx.execute("DELETE FROM memory_tags WHERE memory_id = ?1", params![id])?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

/// Rank the owner's live memories by cosine similarity to `embedding`.
pub async fn search_similar(
    db: &Database,
    owner_id: &str,
    embedding: &[f32],
    limit: usize,
    min_similarity: f32,
    exclude_id: Option<&str>,
) -> Result<Vec<(String, f32)>, RecallError> {
    let owner_id = owner_id.to_string();
    let query = embedding.to_vec();
    let exclude = exclude_id.map(str::to_string);
    let scored = db
        .connection()
        .call(move |conn| -> Result<Vec<(String, f32)>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, embedding FROM memories WHERE owner_id = ?1 AND deleted_at IS NULL",
            )?;
            let rows = stmt.query_map(params![owner_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?;
            let mut scored = Vec::new();
            for row in rows {
                let (id, blob) = row?;
                if exclude.as_deref() == Some(id.as_str()) {
                    continue;
                }
                let stored = recall_core::vector::blob_to_vec(&blob);
                let similarity = cosine_similarity(&query, &stored);
                if similarity >= min_similarity {
                    scored.push((id, similarity));
                }
            }
            Ok(scored)
        })
        .await
        .map_err(map_tr_err)?;

    let mut scored = scored;
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    debug!(matches = scored.len(), "similarity search complete");
    Ok(scored)
}

/// Turn free text into an FTS5 query: each word quoted, OR-ed together.
///
/// Quoting strips FTS operators (`AND`, `NEAR`, `*`, column filters) out of
/// user input. Returns `None` when no searchable word remains.
pub fn fts_query(text: &str) -> Option<String> {
    let terms: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{t}\""))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

/// Keyword search over title, content, and summary. Returns `(id, bm25)`
/// with the best (lowest) bm25 first.
pub async fn search_keyword(
    db: &Database,
    owner_id: &str,
    query: &str,
    limit: usize,
) -> Result<Vec<(String, f64)>, RecallError> {
    let Some(fts) = fts_query(query) else {
        return Ok(Vec::new());
    };
    let owner_id = owner_id.to_string();
    let limit = limit as i64;
    db.connection()
        .call(move |conn| -> Result<Vec<(String, f64)>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT m.id, bm25(memories_fts) AS score
                 FROM memories_fts
                 JOIN memories m ON m.rowid = memories_fts.rowid
                 WHERE memories_fts MATCH ?1 AND m.owner_id = ?2 AND m.deleted_at IS NULL
                 ORDER BY score
                 LIMIT ?3",
            )?;
            stmt.query_map(params![fts, owner_id, limit], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Non-empty summaries of the newest live memories in a category.
pub async fn recent_category_summaries(
    db: &Database,
    owner_id: &str,
    category_id: &str,
    limit: usize,
) -> Result<Vec<String>, RecallError> {
    let owner_id = owner_id.to_string();
    let category_id = category_id.to_string();
    let limit = limit as i64;
    db.connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT summary FROM memories
                 WHERE owner_id = ?1 AND category_id = ?2 AND deleted_at IS NULL AND summary != ''
                 ORDER BY created_at DESC
                 LIMIT ?3",
            )?;
            stmt.query_map(params![owner_id, category_id, limit], |row| row.get(0))?
                .collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::categories::insert_category;
    use crate::queries::tags::{attach_tags, insert_tag};
    use crate::queries::test_support::{category, memory, setup_db};
    use recall_core::Tag;

    #[test]
    fn fts_query_quotes_words_and_drops_operators() {
        assert_eq!(
            fts_query("lake trip* AND \"june\"").as_deref(),
            Some("\"lake\" OR \"trip\" OR \"AND\" OR \"june\"")
        );
        assert_eq!(fts_query("  --  ").as_deref(), None);
    }

    #[tokio::test]
    async fn insert_get_and_owner_scoping() {
        let (db, _dir) = setup_db().await;
        let m = memory("m1", "alice", "First snow in the valley.", vec![1.0, 0.0]);
        insert_memory(&db, &m).await.expect("insert");

        let loaded = get_memory(&db, "alice", "m1").await.expect("get").expect("exists");
        assert_eq!(loaded, m);
        assert!(get_memory(&db, "bob", "m1").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn get_by_ids_keeps_requested_order() {
        let (db, _dir) = setup_db().await;
        for id in ["a", "b", "c"] {
            insert_memory(&db, &memory(id, "alice", id, vec![1.0]))
                .await
                .expect("insert");
        }
        let ids = vec!["c".to_string(), "missing".to_string(), "a".to_string()];
        let found = get_memories_by_ids(&db, "alice", &ids).await.expect("get");
        let found: Vec<_> = found.into_iter().map(|m| m.id).collect();
        assert_eq!(found, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn find_by_content_matches_exact_body_only() {
        let (db, _dir) = setup_db().await;
        insert_memory(&db, &memory("m1", "alice", "Dinner at Luca's.", vec![1.0]))
            .await
            .expect("insert");
        let hit = find_memory_by_content(&db, "alice", "Dinner at Luca's.")
            .await
            .expect("find");
        assert_eq!(hit.map(|m| m.id).as_deref(), Some("m1"));
        assert!(
            find_memory_by_content(&db, "alice", "Dinner at Luca's")
                .await
                .expect("find")
                .is_none()
        );
        assert!(
            find_memory_by_content(&db, "bob", "Dinner at Luca's.")
                .await
                .expect("find")
                .is_none()
        );
    }

    #[tokio::test]
    async fn similarity_search_ranks_filters_and_excludes() {
        let (db, _dir) = setup_db().await;
        insert_memory(&db, &memory("same", "alice", "x", vec![1.0, 0.0]))
            .await
            .expect("insert");
        insert_memory(&db, &memory("close", "alice", "y", vec![0.9, 0.1]))
            .await
            .expect("insert");
        insert_memory(&db, &memory("far", "alice", "z", vec![0.0, 1.0]))
            .await
            .expect("insert");
        insert_memory(&db, &memory("other", "bob", "w", vec![1.0, 0.0]))
            .await
            .expect("insert");

        let hits = search_similar(&db, "alice", &[1.0, 0.0], 10, 0.5, None)
            .await
            .expect("search");
        let ids: Vec<_> = hits.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["same", "close"]);

        let hits = search_similar(&db, "alice", &[1.0, 0.0], 10, 0.5, Some("same"))
            .await
            .expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "close");

        let hits = search_similar(&db, "alice", &[1.0, 0.0], 1, 0.0, None)
            .await
            .expect("search");
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn keyword_search_follows_updates_and_deletes() {
        let (db, _dir) = setup_db().await;
        insert_memory(
            &db,
            &memory("m1", "alice", "We rented kayaks on the lake.", vec![1.0]),
        )
        .await
        .expect("insert");
        insert_memory(&db, &memory("m2", "alice", "Quiet day at home.", vec![1.0]))
            .await
            .expect("insert");

        let hits = search_keyword(&db, "alice", "kayaks", 10).await.expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "m1");
        assert!(search_keyword(&db, "bob", "kayaks", 10).await.expect("search").is_empty());
        assert!(search_keyword(&db, "alice", "***", 10).await.expect("search").is_empty());

        let mut updated = get_memory(&db, "alice", "m1").await.expect("get").expect("exists");
        updated.content = "We rented canoes instead.".into();
        assert!(update_memory(&db, &updated).await.expect("update"));
        assert!(search_keyword(&db, "alice", "kayaks", 10).await.expect("search").is_empty());
        assert_eq!(search_keyword(&db, "alice", "canoes", 10).await.expect("search").len(), 1);

        assert!(soft_delete_memory(&db, "alice", "m1").await.expect("delete"));
        assert!(search_keyword(&db, "alice", "canoes", 10).await.expect("search").is_empty());
    }

    #[tokio::test]
    async fn soft_delete_releases_category_and_tags() {
        let (db, _dir) = setup_db().await;
        let mut cat = category("c1", "alice", "Travel");
        cat.usage_count = 1;
        insert_category(&db, &cat).await.expect("category");
        let tag = insert_tag(
            &db,
            &Tag {
                id: "t1".into(),
                owner_id: "alice".into(),
                name: "Lake".into(),
                normalized_name: "lake".into(),
                embedding: None,
                usage_count: 1,
                created_at: "2026-01-01T00:00:00.000Z".into(),
            },
        )
        .await
        .expect("tag");

        let mut m = memory("m1", "alice", "Sailing lesson.", vec![1.0]);
        m.category_id = Some("c1".into());
        insert_memory(&db, &m).await.expect("insert");
        attach_tags(&db, "m1", &[tag.id.clone()]).await.expect("attach");

        assert!(!soft_delete_memory(&db, "bob", "m1").await.expect("delete"));
        assert!(soft_delete_memory(&db, "alice", "m1").await.expect("delete"));
        assert!(!soft_delete_memory(&db, "alice", "m1").await.expect("delete twice"));

        assert!(get_memory(&db, "alice", "m1").await.expect("get").is_none());
        let cat = crate::queries::categories::get_category(&db, "alice", "c1")
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(cat.usage_count, 0);
        let tags = crate::queries::tags::list_tags(&db, "alice").await.expect("list");
        assert_eq!(tags[0].usage_count, 0);
        assert!(
            crate::queries::tags::tags_for_memory(&db, "m1")
                .await
                .expect("tags")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn recent_summaries_are_newest_first() {
        let (db, _dir) = setup_db().await;
        insert_category(&db, &category("c1", "alice", "Food")).await.expect("category");
        for (id, created) in [("m1", "2026-01-01"), ("m2", "2026-01-03"), ("m3", "2026-01-02")] {
            let mut m = memory(id, "alice", id, vec![1.0]);
            m.category_id = Some("c1".into());
            m.created_at = format!("{created}T00:00:00.000Z");
            insert_memory(&db, &m).await.expect("insert");
        }
        let summaries = recent_category_summaries(&db, "alice", "c1", 2)
            .await
            .expect("summaries");
        assert_eq!(summaries, vec!["Summary of m2", "Summary of m3"]);
    }
}
