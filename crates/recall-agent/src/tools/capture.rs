// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Draft-building tools: start, add, preview, cancel.

use std::sync::Arc;

use async_trait::async_trait;
use recall_core::{
    ClassificationPreview, ConversationState, Draft, DraftFragment, QuickReply, RecallError,
};
use recall_memory::TitleSummary;
use recall_memory::text::preview;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{Tool, ToolContext, ToolOutput, non_blank, parse_args, suggestions_for};
use crate::services::MemoryServices;

fn drafting_suggestions() -> Vec<QuickReply> {
    suggestions_for(ConversationState::MemoryEnrichment)
}

fn review_suggestions() -> Vec<QuickReply> {
    suggestions_for(ConversationState::MemoryDraft)
}

fn saving_in_progress() -> ToolOutput {
    ToolOutput::ok(json!({"status": "saving_in_progress"}))
}

// --- start_memory_capture ---

#[derive(Debug, Deserialize)]
struct StartArgs {
    #[serde(default)]
    initial_content: Option<String>,
}

pub struct StartMemoryCapture {
    services: Arc<MemoryServices>,
}

impl StartMemoryCapture {
    pub fn new(services: Arc<MemoryServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for StartMemoryCapture {
    fn name(&self) -> &str {
        "start_memory_capture"
    }

    fn description(&self) -> &str {
        "Begin capturing a new memory. Pass initial_content when the user already said what to remember. Discards any unsaved draft."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "initial_content": { "type": "string", "description": "What the user has shared so far" }
            }
        })
    }

    async fn invoke(&self, ctx: &ToolContext, input: Value) -> Result<ToolOutput, RecallError> {
        let args: StartArgs = parse_args(input)?;
        let initial = non_blank(args.initial_content);

        let sessions = &self.services.sessions;
        let (_, started) = sessions
            .update(&ctx.session_id, |s| {
                if sessions.save_in_flight(&s.draft) {
                    return false;
                }
                s.draft = Draft::default();
                match &initial {
                    Some(content) => {
                        s.draft.fragments.push(DraftFragment {
                            content: content.clone(),
                            is_answer: false,
                        });
                        s.state = ConversationState::MemoryEnrichment;
                    }
                    None => s.state = ConversationState::MemoryCapture,
                }
                true
            })
            .await?;
        if !started {
            return Ok(saving_in_progress());
        }

        let message = if initial.is_some() {
            "Capture started with the initial content. Ask a follow-up question or offer to preview."
        } else {
            "Capture started. Ask the user what they want to remember."
        };
        let buttons = drafting_suggestions();
        Ok(ToolOutput::ok(json!({
            "status": "capture_started",
            "message": message,
            "suggested_buttons": buttons,
        }))
        .with_suggestions(buttons))
    }
}

// --- add_to_memory_draft ---

#[derive(Debug, Deserialize)]
struct AddArgs {
    content: String,
    #[serde(default)]
    is_answer: bool,
}

pub struct AddToMemoryDraft {
    services: Arc<MemoryServices>,
}

impl AddToMemoryDraft {
    pub fn new(services: Arc<MemoryServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for AddToMemoryDraft {
    fn name(&self) -> &str {
        "add_to_memory_draft"
    }

    fn description(&self) -> &str {
        "Append content to the memory being captured. Set is_answer when the content answers your follow-up question."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": { "type": "string", "description": "Text to add" },
                "is_answer": { "type": "boolean", "description": "True when answering a follow-up question" }
            },
            "required": ["content"]
        })
    }

    async fn invoke(&self, ctx: &ToolContext, input: Value) -> Result<ToolOutput, RecallError> {
        let args: AddArgs = parse_args(input)?;
        let content = non_blank(Some(args.content))
            .ok_or_else(|| RecallError::Validation("content must not be empty".into()))?;

        let sessions = &self.services.sessions;
        let (session, added) = sessions
            .update(&ctx.session_id, |s| {
                if sessions.save_in_flight(&s.draft) {
                    return false;
                }
                s.draft.end_save();
                s.draft.fragments.push(DraftFragment {
                    content: content.clone(),
                    is_answer: args.is_answer,
                });
                // New content invalidates any generated preview.
                s.draft.title = None;
                s.draft.summary = None;
                s.draft.preview = None;
                s.state = ConversationState::MemoryEnrichment;
                true
            })
            .await?;
        if !added {
            return Ok(saving_in_progress());
        }

        Ok(ToolOutput::ok(json!({
            "status": "added",
            "enrichment_count": session.draft.enrichment_count(),
            "total_parts": session.draft.fragments.len(),
        }))
        .with_suggestions(drafting_suggestions()))
    }
}

// --- generate_memory_draft ---

pub struct GenerateMemoryDraft {
    services: Arc<MemoryServices>,
}

impl GenerateMemoryDraft {
    pub fn new(services: Arc<MemoryServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for GenerateMemoryDraft {
    fn name(&self) -> &str {
        "generate_memory_draft"
    }

    fn description(&self) -> &str {
        "Prepare the draft for review: generates a title, summary, category, and tags. Show the result to the user before saving."
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, ctx: &ToolContext, _input: Value) -> Result<ToolOutput, RecallError> {
        let services = &self.services;
        let session = services.sessions.get(&ctx.session_id).await?;
        if services.sessions.save_in_flight(&session.draft) {
            return Ok(saving_in_progress());
        }
        if session.draft.is_empty() {
            return Ok(ToolOutput::error(json!({"error": "no_draft"})));
        }
        let content = session.draft.content();

        let generated = match services.summarizer.title_and_summary(&content).await {
            Ok(ts) => ts,
            Err(e) => {
                warn!(session_id = %ctx.session_id, error = %e, "title generation failed, deriving from content");
                TitleSummary::fallback(&content, services.preview_chars)
            }
        };
        let embedding = match services.embedder.embed(&content).await {
            Ok(e) => Some(e),
            Err(e) => {
                warn!(session_id = %ctx.session_id, error = %e, "draft embedding failed");
                None
            }
        };
        let category = services
            .categories
            .suggest(&ctx.owner_id, &content, embedding.as_deref())
            .await;
        let tags = services
            .tags
            .suggest(&ctx.owner_id, &content, embedding.as_deref())
            .await;

        let (_, applied) = services
            .sessions
            .update(&ctx.session_id, |s| {
                if services.sessions.save_in_flight(&s.draft) || s.draft.content() != content {
                    return false;
                }
                s.draft.title = Some(generated.title.clone());
                s.draft.summary = Some(generated.summary.clone());
                s.draft.preview = Some(ClassificationPreview {
                    category: Some(category.clone()),
                    tags: tags.clone(),
                });
                s.state = ConversationState::MemoryDraft;
                true
            })
            .await?;
        if !applied {
            debug!(session_id = %ctx.session_id, "draft changed while generating preview");
        }

        Ok(ToolOutput::ok(json!({
            "status": "draft_ready",
            "draft": {
                "title": generated.title,
                "summary": generated.summary,
                "content_preview": preview(&content, services.preview_chars),
                "category": category,
                "tags": tags,
            },
        }))
        .with_suggestions(review_suggestions()))
    }
}

// --- cancel_memory_draft ---

pub struct CancelMemoryDraft {
    services: Arc<MemoryServices>,
}

impl CancelMemoryDraft {
    pub fn new(services: Arc<MemoryServices>) -> Self {
        Self { services }
    }
}

enum Cancel {
    Cancelled,
    Nothing,
    Saving,
}

#[async_trait]
impl Tool for CancelMemoryDraft {
    fn name(&self) -> &str {
        "cancel_memory_draft"
    }

    fn description(&self) -> &str {
        "Throw away the draft being captured. Nothing is saved."
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, ctx: &ToolContext, _input: Value) -> Result<ToolOutput, RecallError> {
        let sessions = &self.services.sessions;
        let (_, outcome) = sessions
            .update(&ctx.session_id, |s| {
                if sessions.save_in_flight(&s.draft) {
                    return Cancel::Saving;
                }
                if s.draft.is_empty() && s.state == ConversationState::Conversation {
                    return Cancel::Nothing;
                }
                s.draft = Draft::default();
                s.state = ConversationState::Conversation;
                Cancel::Cancelled
            })
            .await?;
        Ok(match outcome {
            Cancel::Cancelled => ToolOutput::ok(json!({"status": "draft_cancelled"})),
            Cancel::Nothing => ToolOutput::ok(json!({"status": "nothing_to_cancel"})),
            Cancel::Saving => saving_in_progress(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    #[tokio::test]
    async fn start_with_initial_content_enters_enrichment() {
        let fx = Fixture::new().await;
        let tool = StartMemoryCapture::new(Arc::clone(&fx.services));
        let out = fx.call(&tool, json!({"initial_content": "Lost my first tooth"})).await;
        assert_eq!(out.status(), Some("capture_started"));
        assert!(out.suggestions.is_some());
        let session = fx.session().await;
        assert_eq!(session.state, ConversationState::MemoryEnrichment);
        assert_eq!(session.draft.fragments.len(), 1);

        fx.call(&tool, json!({})).await;
        let session = fx.session().await;
        assert_eq!(session.state, ConversationState::MemoryCapture);
        assert!(session.draft.is_empty());
    }

    #[tokio::test]
    async fn add_counts_answers_and_parts() {
        let fx = Fixture::new().await;
        let tool = AddToMemoryDraft::new(Arc::clone(&fx.services));
        fx.call(&tool, json!({"content": "We drove to the coast."})).await;
        let out = fx
            .call(&tool, json!({"content": "It was June.", "is_answer": true}))
            .await;
        assert_eq!(out.status(), Some("added"));
        assert_eq!(out.content["enrichment_count"], 1);
        assert_eq!(out.content["total_parts"], 2);
        assert_eq!(fx.session().await.state, ConversationState::MemoryEnrichment);
    }

    #[tokio::test]
    async fn add_rejects_blank_content() {
        let fx = Fixture::new().await;
        let tool = AddToMemoryDraft::new(Arc::clone(&fx.services));
        let err = tool
            .invoke(&fx.ctx(), json!({"content": "   "}))
            .await
            .unwrap_err();
        assert!(matches!(err, RecallError::Validation(_)));
    }

    #[tokio::test]
    async fn generate_without_draft_reports_no_draft() {
        let fx = Fixture::new().await;
        let tool = GenerateMemoryDraft::new(Arc::clone(&fx.services));
        let out = fx.call(&tool, json!({})).await;
        assert!(out.is_error);
        assert_eq!(out.content, json!({"error": "no_draft"}));
    }

    #[tokio::test]
    async fn generate_fills_preview_and_moves_to_draft_state() {
        let fx = Fixture::new().await;
        fx.script_labels("Coast trip", "Travel", &["coast", "summer"]);
        let add = AddToMemoryDraft::new(Arc::clone(&fx.services));
        fx.call(&add, json!({"content": "We drove to the coast in June."})).await;

        let tool = GenerateMemoryDraft::new(Arc::clone(&fx.services));
        let out = fx.call(&tool, json!({})).await;
        assert_eq!(out.status(), Some("draft_ready"));
        assert_eq!(out.content["draft"]["title"], "Coast trip");
        assert_eq!(out.content["draft"]["category"], "Travel");
        assert_eq!(out.content["draft"]["tags"], json!(["coast", "summer"]));

        let session = fx.session().await;
        assert_eq!(session.state, ConversationState::MemoryDraft);
        let preview = session.draft.preview.unwrap();
        assert_eq!(preview.category.as_deref(), Some("Travel"));
        // Nothing is created before the user saves.
        assert!(fx.storage.list_categories("owner-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn generate_survives_model_failure() {
        let fx = Fixture::new().await;
        fx.provider.set_failing(true);
        let add = AddToMemoryDraft::new(Arc::clone(&fx.services));
        fx.call(&add, json!({"content": "Grandma's apple pie recipe"})).await;
        let out = fx.call(&GenerateMemoryDraft::new(Arc::clone(&fx.services)), json!({})).await;
        assert_eq!(out.status(), Some("draft_ready"));
        assert_eq!(out.content["draft"]["title"], "Grandma's apple pie recipe");
        assert_eq!(out.content["draft"]["category"], "General");
    }

    #[tokio::test]
    async fn cancel_clears_draft_once() {
        let fx = Fixture::new().await;
        let add = AddToMemoryDraft::new(Arc::clone(&fx.services));
        fx.call(&add, json!({"content": "Something"})).await;
        let cancel = CancelMemoryDraft::new(Arc::clone(&fx.services));
        assert_eq!(fx.call(&cancel, json!({})).await.status(), Some("draft_cancelled"));
        let session = fx.session().await;
        assert!(session.draft.is_empty());
        assert_eq!(session.state, ConversationState::Conversation);
        assert_eq!(fx.call(&cancel, json!({})).await.status(), Some("nothing_to_cancel"));
        assert!(fx.storage.find_memory_by_content("owner-1", "Something").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_saving_marker_stops_blocking_edits() {
        let config = {
            let mut config = recall_config::model::RecallConfig::default();
            config.session.save_timeout_secs = 1;
            config
        };
        let fx = Fixture::with_config(config).await;
        let add = AddToMemoryDraft::new(Arc::clone(&fx.services));
        let cancel = CancelMemoryDraft::new(Arc::clone(&fx.services));
        fx.call(&add, json!({"content": "Fed the ducks."})).await;

        fx.services
            .sessions
            .update(&fx.session.id, |s| s.draft.begin_save())
            .await
            .unwrap();
        let out = fx.call(&add, json!({"content": "They were loud."})).await;
        assert_eq!(out.status(), Some("saving_in_progress"));
        assert_eq!(fx.call(&cancel, json!({})).await.status(), Some("saving_in_progress"));

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        let out = fx.call(&add, json!({"content": "They were loud."})).await;
        assert_eq!(out.status(), Some("added"));
        assert!(!fx.session().await.draft.saving);
        assert_eq!(fx.call(&cancel, json!({})).await.status(), Some("draft_cancelled"));
    }
}
