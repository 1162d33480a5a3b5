// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite rows and the records defined in
//! `recall-core::types`.
//!
//! Each `*_COLUMNS` constant lists the columns in the order the matching
//! `*_from_row` function reads them.

use std::str::FromStr;

use recall_core::vector::blob_to_vec;
use recall_core::{
    Category, ConversationSession, ConversationState, Draft, HistoryEntry, Memory,
    MemoryRelationship, SyncStatus, Tag,
};
use rusqlite::Row;
use rusqlite::types::Type;
use sha2::{Digest, Sha256};

pub(crate) const MEMORY_COLUMNS: &str = "id, owner_id, title, content, summary, embedding, \
     category_id, source_channel, occurred_at, created_at, updated_at, sync_status, deleted_at";

pub(crate) const CATEGORY_COLUMNS: &str =
    "id, owner_id, name, description, color, embedding, usage_count, created_at, updated_at";

pub(crate) const TAG_COLUMNS: &str =
    "id, owner_id, name, normalized_name, embedding, usage_count, created_at";

pub(crate) const SESSION_COLUMNS: &str = "id, owner_id, channel, channel_user_id, state, draft, \
     history, last_saved_memory_id, version, expires_at, created_at, updated_at";

/// SHA-256 of the memory body, hex encoded. Narrows duplicate lookups
/// before the exact content comparison.
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

pub(crate) fn memory_from_row(row: &Row<'_>) -> rusqlite::Result<Memory> {
    let blob: Vec<u8> = row.get(5)?;
    let sync: String = row.get(11)?;
    Ok(Memory {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        summary: row.get(4)?,
        embedding: blob_to_vec(&blob),
        category_id: row.get(6)?,
        source_channel: row.get(7)?,
        occurred_at: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        sync_status: SyncStatus::from_str(&sync).unwrap_or_default(),
        deleted_at: row.get(12)?,
    })
}

pub(crate) fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    let blob: Option<Vec<u8>> = row.get(5)?;
    Ok(Category {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        color: row.get(4)?,
        embedding: blob.map(|b| blob_to_vec(&b)),
        usage_count: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub(crate) fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    let blob: Option<Vec<u8>> = row.get(4)?;
    Ok(Tag {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        normalized_name: row.get(3)?,
        embedding: blob.map(|b| blob_to_vec(&b)),
        usage_count: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub(crate) fn relationship_from_row(row: &Row<'_>) -> rusqlite::Result<MemoryRelationship> {
    let score: f64 = row.get(4)?;
    Ok(MemoryRelationship {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        memory_a: row.get(2)?,
        memory_b: row.get(3)?,
        score: score as f32,
        relationship_type: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub(crate) fn session_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationSession> {
    let state: String = row.get(4)?;
    let draft: String = row.get(5)?;
    let history: String = row.get(6)?;
    Ok(ConversationSession {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        channel: row.get(2)?,
        channel_user_id: row.get(3)?,
        state: ConversationState::from_str(&state).map_err(|e| conversion_err(4, e))?,
        draft: serde_json::from_str::<Draft>(&draft).map_err(|e| conversion_err(5, e))?,
        history: serde_json::from_str::<Vec<HistoryEntry>>(&history)
            .map_err(|e| conversion_err(6, e))?,
        last_saved_memory_id: row.get(7)?,
        version: row.get(8)?,
        expires_at: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_stable_hex() {
        let a = content_hash("We hiked the ridge.");
        assert_eq!(a.len(), 64);
        assert_eq!(a, content_hash("We hiked the ridge."));
        assert_ne!(a, content_hash("We hiked the ridge"));
    }
}
