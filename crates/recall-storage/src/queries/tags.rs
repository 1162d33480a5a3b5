// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tag bucket persistence and memory/tag joins.

use recall_core::vector::vec_to_blob;
use recall_core::{RecallError, Tag};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err, storage_msg};
use crate::models::{TAG_COLUMNS, tag_from_row};

pub async fn list_tags(db: &Database, owner_id: &str) -> Result<Vec<Tag>, RecallError> {
    let owner_id = owner_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Tag>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TAG_COLUMNS} FROM tags WHERE owner_id = ?1
                 ORDER BY usage_count DESC, normalized_name"
            ))?;
            stmt.query_map(params![owner_id], tag_from_row)?.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn find_tag_by_normalized(
    db: &Database,
    owner_id: &str,
    normalized_name: &str,
) -> Result<Option<Tag>, RecallError> {
    let owner_id = owner_id.to_string();
    let normalized_name = normalized_name.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Tag>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {TAG_COLUMNS} FROM tags WHERE owner_id = ?1 AND normalized_name = ?2"
                ),
                params![owner_id, normalized_name],
                tag_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a tag, returning the row that owns its normalized name afterwards.
pub async fn insert_tag(db: &Database, tag: &Tag) -> Result<Tag, RecallError> {
    let t = tag.clone();
    let stored = db
        .connection()
        .call(move |conn| -> Result<Option<Tag>, rusqlite::Error> {
            conn.execute(
                "INSERT OR IGNORE INTO tags (id, owner_id, name, normalized_name, embedding,
                    usage_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    t.id,
                    t.owner_id,
                    t.name,
                    t.normalized_name,
                    t.embedding.as_deref().map(vec_to_blob),
                    t.usage_count,
                    t.created_at,
                ],
            )?;
            conn.query_row(
                &format!(
                    "SELECT {TAG_COLUMNS} FROM tags WHERE owner_id = ?1 AND normalized_name = ?2"
                ),
                params![t.owner_id, t.normalized_name],
                tag_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    stored.ok_or_else(|| storage_msg(format!("tag {} vanished after insert", tag.id)))
}

/// Add `delta` to a tag's usage count, clamping at zero.
pub async fn adjust_tag_usage(db: &Database, id: &str, delta: i64) -> Result<(), RecallError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE tags SET usage_count = MAX(usage_count + ?1, 0) WHERE id = ?2",
                params![delta, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Link tags to a memory. Already-linked pairs are left alone.
pub async fn attach_tags(db: &Database, memory_id: &str, tag_ids: &[String]) -> Result<(), RecallError> {
    if tag_ids.is_empty() {
        return Ok(());
    }
    let memory_id = memory_id.to_string();
    let tag_ids = tag_ids.to_vec();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO memory_tags (memory_id, tag_id) VALUES (?1, ?2)",
                )?;
                for tag_id in &tag_ids {
                    stmt.execute(params![memory_id, tag_id])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Tags linked to a memory, alphabetical by normalized name.
pub async fn tags_for_memory(db: &Database, memory_id: &str) -> Result<Vec<Tag>, RecallError> {
    let memory_id = memory_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Tag>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.owner_id, t.name, t.normalized_name, t.embedding, t.usage_count,
                        t.created_at
                 FROM tags t
                 JOIN memory_tags mt ON mt.tag_id = t.id
                 WHERE mt.memory_id = ?1
                 ORDER BY t.normalized_name",
            )?;
            stmt.query_map(params![memory_id], tag_from_row)?.collect()
        })
        .await
        .map_err(map_tr_err)
}
