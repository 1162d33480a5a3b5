// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel identity links and one-time link codes.

use recall_core::RecallError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Owner linked to a channel identity, if any.
pub async fn resolve_channel_owner(
    db: &Database,
    channel: &str,
    channel_user_id: &str,
) -> Result<Option<String>, RecallError> {
    let channel = channel.to_string();
    let channel_user_id = channel_user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT owner_id FROM channel_links WHERE channel = ?1 AND channel_user_id = ?2",
                params![channel, channel_user_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Store a link code. Reissuing the same code replaces it.
pub async fn create_link_code(
    db: &Database,
    owner_id: &str,
    code: &str,
    expires_at: &str,
) -> Result<(), RecallError> {
    let owner_id = owner_id.to_string();
    let code = code.to_string();
    let expires_at = expires_at.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT OR REPLACE INTO link_codes (code, owner_id, expires_at, used_at)
                 VALUES (?1, ?2, ?3, NULL)",
                params![code, owner_id, expires_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Consume a code and link the channel identity to the code's owner.
///
/// `now` uses the persisted timestamp format so it compares correctly
/// against `expires_at`.
pub async fn redeem_link_code(
    db: &Database,
    code: &str,
    channel: &str,
    channel_user_id: &str,
    now: &str,
) -> Result<Option<String>, RecallError> {
    let code = code.to_string();
    let channel = channel.to_string();
    let channel_user_id = channel_user_id.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let owner: Option<String> = tx
                .query_row(
                    "SELECT owner_id FROM link_codes
                     WHERE code = ?1 AND used_at IS NULL AND expires_at > ?2",
                    params![code, now],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(owner_id) = owner else {
                return Ok(None);
            };
            tx.execute(
                "UPDATE link_codes SET used_at = ?1 WHERE code = ?2",
                params![now, code],
            )?;
            tx.execute(
                "INSERT OR REPLACE INTO channel_links (channel, channel_user_id, owner_id, linked_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![channel, channel_user_id, owner_id, now],
            )?;
            tx.commit()?;
            Ok(Some(owner_id))
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    const NOW: &str = "2026-05-01T12:00:00.000Z";

    #[tokio::test]
    async fn redeem_links_identity_once() {
        let (db, _dir) = setup_db().await;
        create_link_code(&db, "alice", "ABCD-1234", "2026-05-01T12:10:00.000Z")
            .await
            .expect("code");
        assert!(resolve_channel_owner(&db, "telegram", "tg-1").await.expect("resolve").is_none());

        let owner = redeem_link_code(&db, "ABCD-1234", "telegram", "tg-1", NOW)
            .await
            .expect("redeem");
        assert_eq!(owner.as_deref(), Some("alice"));
        assert_eq!(
            resolve_channel_owner(&db, "telegram", "tg-1").await.expect("resolve").as_deref(),
            Some("alice")
        );

        let again = redeem_link_code(&db, "ABCD-1234", "telegram", "tg-2", NOW)
            .await
            .expect("redeem");
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn expired_and_unknown_codes_fail() {
        let (db, _dir) = setup_db().await;
        create_link_code(&db, "alice", "OLD1", "2026-05-01T11:59:59.999Z")
            .await
            .expect("code");
        assert!(
            redeem_link_code(&db, "OLD1", "telegram", "tg-1", NOW)
                .await
                .expect("redeem")
                .is_none()
        );
        assert!(
            redeem_link_code(&db, "NOPE", "telegram", "tg-1", NOW)
                .await
                .expect("redeem")
                .is_none()
        );
    }
}
