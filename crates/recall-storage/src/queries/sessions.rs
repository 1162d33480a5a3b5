// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation session persistence with optimistic concurrency.

use recall_core::{ConversationSession, RecallError, now_timestamp};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{SESSION_COLUMNS, session_from_row};

fn encode(session: &ConversationSession) -> Result<(String, String), RecallError> {
    let draft = serde_json::to_string(&session.draft)
        .map_err(|e| RecallError::Internal(format!("failed to encode draft: {e}")))?;
    let history = serde_json::to_string(&session.history)
        .map_err(|e| RecallError::Internal(format!("failed to encode history: {e}")))?;
    Ok((draft, history))
}

/// Insert a new session row.
pub async fn insert_session(db: &Database, session: &ConversationSession) -> Result<(), RecallError> {
    let (draft, history) = encode(session)?;
    let s = session.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO conversation_sessions (id, owner_id, channel, channel_user_id, state,
                    draft, history, last_saved_memory_id, version, expires_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    s.id,
                    s.owner_id,
                    s.channel,
                    s.channel_user_id,
                    s.state.to_string(),
                    draft,
                    history,
                    s.last_saved_memory_id,
                    s.version,
                    s.expires_at,
                    s.created_at,
                    s.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a session by ID, expired or not.
pub async fn get_session(
    db: &Database,
    id: &str,
) -> Result<Option<ConversationSession>, RecallError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ConversationSession>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM conversation_sessions WHERE id = ?1"),
                params![id],
                session_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// The newest session for a channel identity that has not been marked expired.
pub async fn latest_session(
    db: &Database,
    channel: &str,
    channel_user_id: &str,
) -> Result<Option<ConversationSession>, RecallError> {
    let channel = channel.to_string();
    let channel_user_id = channel_user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ConversationSession>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM conversation_sessions
                     WHERE channel = ?1 AND channel_user_id = ?2 AND expired = 0
                     ORDER BY created_at DESC, rowid DESC LIMIT 1"
                ),
                params![channel, channel_user_id],
                session_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Write every mutable column if the stored version still matches.
///
/// Returns `true` when the row was updated (and its version bumped).
pub async fn compare_and_swap_session(
    db: &Database,
    session: &ConversationSession,
) -> Result<bool, RecallError> {
    let (draft, history) = encode(session)?;
    let s = session.clone();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE conversation_sessions
                 SET state = ?1, draft = ?2, history = ?3, last_saved_memory_id = ?4,
                     expires_at = ?5, updated_at = ?6, version = version + 1
                 WHERE id = ?7 AND version = ?8 AND expired = 0",
                params![
                    s.state.to_string(),
                    draft,
                    history,
                    s.last_saved_memory_id,
                    s.expires_at,
                    now,
                    s.id,
                    s.version,
                ],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Flag a session as expired so lookups skip it.
pub async fn mark_session_expired(db: &Database, id: &str) -> Result<(), RecallError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE conversation_sessions
                 SET expired = 1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
