// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Saving a draft as a memory.
//!
//! The draft carries a `saving` marker set by check-and-set before any
//! expensive work starts. A second call that sees the marker answers
//! `saving_in_progress`; one that arrives after the save answers
//! `duplicate` with the saved memory. A marker older than
//! `session.save_timeout_secs` is ignored, so a finalize that died mid-save
//! cannot lock the draft. Byte-identical content is never stored twice for
//! the same owner.

use std::sync::Arc;

use async_trait::async_trait;
use recall_core::{
    ConversationSession, ConversationState, Draft, Memory, RecallError, SyncStatus, now_timestamp,
};
use recall_memory::{Bucket, CategoryChoice, TagChoice, TitleSummary};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{Tool, ToolContext, ToolOutput, default_suggestions, memory_json, memory_labels, non_blank, parse_args};
use crate::services::MemoryServices;
use crate::session::SessionManager;

#[derive(Debug, Default, Deserialize)]
struct Args {
    #[serde(default)]
    title_override: Option<String>,
    #[serde(default)]
    category_override: Option<String>,
    #[serde(default)]
    tags_override: Option<Vec<String>>,
}

/// What the claim step found on the session.
enum Claim {
    Claimed(Draft),
    Saving,
    Empty(Option<String>),
}

/// Point the session at an already saved copy of its draft.
///
/// A finalize that claimed the draft in the meantime owns it and resets the
/// session itself, so a claimed draft is left untouched. Returns whether the
/// draft was cleared.
fn settle_duplicate(sessions: &SessionManager, s: &mut ConversationSession, memory_id: &str) -> bool {
    if sessions.save_in_flight(&s.draft) {
        return false;
    }
    s.draft = Draft::default();
    s.state = ConversationState::Conversation;
    s.last_saved_memory_id = Some(memory_id.to_string());
    true
}

pub struct FinalizeMemory {
    services: Arc<MemoryServices>,
}

impl FinalizeMemory {
    pub fn new(services: Arc<MemoryServices>) -> Self {
        Self { services }
    }

    async fn duplicate_of(&self, owner_id: &str, memory_id: &str) -> Result<ToolOutput, RecallError> {
        let memory = self
            .services
            .storage
            .get_memory(owner_id, memory_id)
            .await?
            .ok_or_else(|| RecallError::NotFound {
                entity: "memory",
                id: memory_id.to_string(),
            })?;
        self.duplicate(&memory).await
    }

    async fn duplicate(&self, memory: &Memory) -> Result<ToolOutput, RecallError> {
        let (category, tags) = memory_labels(&self.services, memory).await?;
        Ok(ToolOutput::ok(json!({
            "status": "duplicate",
            "memory": memory_json(memory, category.as_deref(), &tags, self.services.preview_chars),
        }))
        .with_cited(vec![memory.id.clone()]))
    }

    /// Everything between claiming the draft and persisting it.
    async fn persist(
        &self,
        ctx: &ToolContext,
        draft: &Draft,
        args: &Args,
    ) -> Result<(Memory, Bucket, Vec<Bucket>), RecallError> {
        let services = &self.services;
        let content = draft.content();

        let drafted = match (&draft.title, &draft.summary) {
            (Some(title), Some(summary)) => TitleSummary {
                title: title.clone(),
                summary: summary.clone(),
            },
            _ => match services.summarizer.title_and_summary(&content).await {
                Ok(ts) => ts,
                Err(e) => {
                    warn!(session_id = %ctx.session_id, error = %e, "title generation failed, deriving from content");
                    TitleSummary::fallback(&content, services.preview_chars)
                }
            },
        };
        let title = non_blank(args.title_override.clone()).unwrap_or(drafted.title);

        let embedding = services.embedder.embed(&content).await?;

        let preview = draft.preview.as_ref();
        let category_choice = match non_blank(args.category_override.clone()) {
            Some(name) => CategoryChoice::Override(name),
            None => match preview.and_then(|p| p.category.clone()) {
                Some(name) => CategoryChoice::Suggested(name),
                None => CategoryChoice::Auto,
            },
        };
        let category = services
            .categories
            .assign(&ctx.owner_id, &content, Some(&embedding), category_choice)
            .await?;

        let tag_choice = match &args.tags_override {
            Some(names) => TagChoice::Override(names.clone()),
            None => match preview {
                Some(p) => TagChoice::Suggested(p.tags.clone()),
                None => TagChoice::Auto,
            },
        };
        let tags = services
            .tags
            .assign(&ctx.owner_id, &content, Some(&embedding), tag_choice)
            .await?;

        let now = now_timestamp();
        let memory = Memory {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: ctx.owner_id.clone(),
            title,
            content,
            summary: drafted.summary,
            embedding,
            category_id: Some(category.id.clone()),
            source_channel: ctx.channel.clone(),
            occurred_at: None,
            created_at: now.clone(),
            updated_at: now,
            sync_status: SyncStatus::Pending,
            deleted_at: None,
        };
        services.storage.insert_memory(&memory).await?;
        Ok((memory, category, tags))
    }
}

#[async_trait]
impl Tool for FinalizeMemory {
    fn name(&self) -> &str {
        "finalize_memory"
    }

    fn description(&self) -> &str {
        "Save the current draft as a memory. Only call after the user confirmed. Optional overrides replace the suggested title, category, or tags."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title_override": { "type": "string" },
                "category_override": { "type": "string" },
                "tags_override": { "type": "array", "items": { "type": "string" } }
            }
        })
    }

    async fn invoke(&self, ctx: &ToolContext, input: Value) -> Result<ToolOutput, RecallError> {
        let args: Args = parse_args(input)?;
        let services = &self.services;

        let session = services.sessions.get(&ctx.session_id).await?;
        if services.sessions.save_in_flight(&session.draft) {
            return Ok(ToolOutput::ok(json!({"status": "saving_in_progress"})));
        }
        if session.draft.is_empty() {
            return match &session.last_saved_memory_id {
                Some(id) => self.duplicate_of(&ctx.owner_id, id).await,
                None => Ok(ToolOutput::error(json!({"error": "no_draft"}))),
            };
        }

        let content = session.draft.content();
        if let Some(existing) = services
            .storage
            .find_memory_by_content(&ctx.owner_id, &content)
            .await?
        {
            info!(owner_id = %ctx.owner_id, memory_id = %existing.id, "draft matches a saved memory");
            services
                .sessions
                .update(&ctx.session_id, |s| {
                    settle_duplicate(&services.sessions, s, &existing.id)
                })
                .await?;
            return self.duplicate(&existing).await;
        }

        let (_, claim) = services
            .sessions
            .update(&ctx.session_id, |s| {
                if services.sessions.save_in_flight(&s.draft) {
                    Claim::Saving
                } else if s.draft.is_empty() {
                    Claim::Empty(s.last_saved_memory_id.clone())
                } else {
                    s.draft.begin_save();
                    let mut draft = s.draft.clone();
                    draft.end_save();
                    Claim::Claimed(draft)
                }
            })
            .await?;
        let draft = match claim {
            Claim::Claimed(draft) => draft,
            Claim::Saving => return Ok(ToolOutput::ok(json!({"status": "saving_in_progress"}))),
            Claim::Empty(Some(id)) => return self.duplicate_of(&ctx.owner_id, &id).await,
            Claim::Empty(None) => return Ok(ToolOutput::error(json!({"error": "no_draft"}))),
        };

        let (memory, category, tags) = match self.persist(ctx, &draft, &args).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!(session_id = %ctx.session_id, error = %e, "save failed, releasing draft");
                if let Err(release) = services
                    .sessions
                    .update(&ctx.session_id, |s| s.draft.end_save())
                    .await
                {
                    warn!(session_id = %ctx.session_id, error = %release, "could not clear saving marker");
                }
                return Ok(ToolOutput::error(json!({
                    "error": "save_failed",
                    "retryable": true,
                    "message": e.to_string(),
                })));
            }
        };

        let mut tag_ids: Vec<String> = tags.iter().map(|t| t.id.clone()).collect();
        let mut tag_names: Vec<String> = tags.iter().map(|t| t.name.clone()).collect();
        if let Err(e) = services.storage.attach_tags(&memory.id, &tag_ids).await {
            warn!(memory_id = %memory.id, error = %e, "attaching tags failed");
            tag_ids.clear();
            tag_names.clear();
        }
        services.spawn_post_save(&ctx.owner_id, Some(category.id.clone()), tag_ids);
        let related_count = services
            .graph
            .build_for(&ctx.owner_id, &memory.id, &memory.embedding)
            .await;

        if let Err(e) = services
            .sessions
            .update(&ctx.session_id, |s| {
                s.draft = Draft::default();
                s.state = ConversationState::Conversation;
                s.last_saved_memory_id = Some(memory.id.clone());
            })
            .await
        {
            warn!(session_id = %ctx.session_id, memory_id = %memory.id, error = %e, "memory saved but session not reset");
        }
        info!(owner_id = %ctx.owner_id, memory_id = %memory.id, related_count, "memory saved");

        let mut rendered = memory_json(&memory, Some(&category.name), &tag_names, services.preview_chars);
        rendered["related_count"] = json!(related_count);
        Ok(ToolOutput::ok(json!({
            "status": "memory_saved",
            "memory": rendered,
        }))
        .with_created(memory.id)
        .with_suggestions(default_suggestions()))
    }
}
