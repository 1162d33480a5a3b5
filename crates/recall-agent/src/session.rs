// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation sessions with optimistic check-and-set writes.
//!
//! A session belongs to one channel identity and carries the state machine
//! state, the in-progress draft, and a bounded history. Every write goes
//! through [`SessionManager::update`], which re-reads the row, re-applies
//! the caller's closure, and writes only if the stored version is still the
//! one it read. Sessions expire after the configured TTL; each turn slides
//! the expiry forward.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use recall_config::model::SessionConfig;
use recall_core::{
    ConversationSession, ConversationState, Draft, HistoryEntry, RecallError, StorageAdapter,
    format_timestamp, now_timestamp,
};
use tracing::{debug, info, warn};

/// Attempts before a contended update gives up with a conflict.
pub const MAX_CAS_ATTEMPTS: usize = 5;

/// Default age at which a draft's saving marker stops blocking.
pub const DEFAULT_SAVE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub struct SessionManager {
    storage: Arc<dyn StorageAdapter>,
    ttl: Duration,
    history_limit: usize,
    save_timeout: Duration,
}

impl SessionManager {
    pub fn new(storage: Arc<dyn StorageAdapter>, ttl: Duration, history_limit: usize) -> Self {
        Self {
            storage,
            ttl,
            history_limit,
            save_timeout: DEFAULT_SAVE_TIMEOUT,
        }
    }

    pub fn from_config(storage: Arc<dyn StorageAdapter>, config: &SessionConfig) -> Self {
        Self::new(
            storage,
            Duration::from_secs(config.ttl_secs),
            config.history_limit,
        )
        .with_save_timeout(Duration::from_secs(config.save_timeout_secs))
    }

    pub fn with_save_timeout(mut self, save_timeout: Duration) -> Self {
        self.save_timeout = save_timeout;
        self
    }

    fn expiry_from_now(&self) -> String {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        let at = Utc::now().checked_add_signed(ttl).unwrap_or(chrono::DateTime::<Utc>::MAX_UTC);
        format_timestamp(at)
    }

    /// Whether a finalize currently holds `draft`.
    ///
    /// A marker older than the save timeout belongs to a finalize that died
    /// before releasing it; it is reported and ignored so the draft can be
    /// saved, edited, or cancelled again.
    pub fn save_in_flight(&self, draft: &Draft) -> bool {
        if !draft.saving {
            return false;
        }
        let timeout = chrono::Duration::from_std(self.save_timeout).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(timeout)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        let live = draft.save_in_flight(&format_timestamp(cutoff));
        if !live {
            warn!(saving_since = ?draft.saving_since, "ignoring abandoned saving marker");
        }
        live
    }

    /// The live session for a channel identity, creating one when none
    /// exists or the previous one has expired. Reuse slides the expiry.
    pub async fn load_or_create(
        &self,
        owner_id: &str,
        channel: &str,
        channel_user_id: &str,
    ) -> Result<ConversationSession, RecallError> {
        let now = now_timestamp();
        if let Some(existing) = self.storage.latest_session(channel, channel_user_id).await? {
            let expired = existing.expires_at.as_str() <= now.as_str();
            if !expired && existing.owner_id == owner_id {
                let expires_at = self.expiry_from_now();
                match self
                    .update(&existing.id, |s| s.expires_at = expires_at.clone())
                    .await
                {
                    Ok((session, ())) => return Ok(session),
                    Err(RecallError::Conflict { .. }) => {
                        warn!(session_id = %existing.id, "could not slide session expiry");
                        return self.get(&existing.id).await;
                    }
                    Err(e) => return Err(e),
                }
            }
            info!(
                session_id = %existing.id,
                had_draft = !existing.draft.is_empty(),
                "session expired, starting a new one"
            );
            self.storage.mark_session_expired(&existing.id).await?;
        }

        let session = ConversationSession {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            channel: channel.to_string(),
            channel_user_id: channel_user_id.to_string(),
            state: ConversationState::Conversation,
            draft: Draft::default(),
            history: Vec::new(),
            last_saved_memory_id: None,
            version: 0,
            expires_at: self.expiry_from_now(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.storage.insert_session(&session).await?;
        debug!(session_id = %session.id, channel, "session created");
        Ok(session)
    }

    pub async fn get(&self, id: &str) -> Result<ConversationSession, RecallError> {
        self.storage
            .get_session(id)
            .await?
            .ok_or_else(|| RecallError::NotFound {
                entity: "session",
                id: id.to_string(),
            })
    }

    /// Apply `f` to the freshest copy of the session and persist the result
    /// with a versioned write, retrying on contention.
    ///
    /// A closure that changes nothing performs no write. Returns the session
    /// as persisted together with the closure's value from the final attempt.
    pub async fn update<T, F>(
        &self,
        id: &str,
        mut f: F,
    ) -> Result<(ConversationSession, T), RecallError>
    where
        F: FnMut(&mut ConversationSession) -> T,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let current = self.get(id).await?;
            let mut next = current.clone();
            let out = f(&mut next);
            if next == current {
                return Ok((current, out));
            }
            next.version = current.version;
            next.updated_at = now_timestamp();
            if self.storage.compare_and_swap_session(&next).await? {
                next.version += 1;
                return Ok((next, out));
            }
            debug!(session_id = id, attempt, "session write lost a race, retrying");
        }
        Err(RecallError::Conflict {
            entity: "session",
            id: id.to_string(),
        })
    }

    /// Append a history entry, dropping the oldest beyond the limit.
    pub fn push_history(&self, session: &mut ConversationSession, role: &str, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        session.history.push(HistoryEntry {
            role: role.to_string(),
            text: text.to_string(),
        });
        let excess = session.history.len().saturating_sub(self.history_limit);
        if excess > 0 {
            session.history.drain(..excess);
        }
    }
}
