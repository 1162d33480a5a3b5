// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Recall workspace.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Formats a timestamp the way every persisted record stores it
/// (`2026-01-02T03:04:05.678Z`). The fixed width keeps string comparison
/// in SQL consistent with time order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The current time in persisted-timestamp format.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Embedding,
    Storage,
}

// --- Provider types ---

/// A content block within a provider message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text { text: String },
    /// A tool invocation requested by the assistant.
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// The result of a tool invocation, sent back as a user turn.
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

/// A single message in a provider conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMessage {
    /// "user" or "assistant".
    pub role: String,
    pub content: Vec<ContentBlock>,
}

impl ProviderMessage {
    /// A user message holding a single text block.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// An assistant message holding a single text block.
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }
}

/// A request to the reasoning provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Model identifier.
    pub model: String,
    /// System instructions, sent separately from the message list.
    pub system_prompt: Option<String>,
    pub messages: Vec<ProviderMessage>,
    pub max_tokens: u32,
    /// Tool definitions (`{name, description, input_schema}`) the model may call.
    pub tools: Option<Vec<serde_json::Value>>,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUseData {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// Token usage reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A complete response from the reasoning provider.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub id: String,
    /// Concatenated text blocks.
    pub content: String,
    /// Tool calls in the order the model emitted them. Empty means the turn is done.
    pub tool_calls: Vec<ToolUseData>,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: TokenUsage,
}

// --- Embedding types ---

/// Input for an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output from an embedding adapter, one vector per input text.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}

// --- Channel boundary ---

/// Attachment context forwarded by a channel adapter. Content extraction
/// happens outside this crate; only the extracted text arrives here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: String,
    pub file_name: Option<String>,
    pub extracted_text: Option<String>,
}

/// A message arriving from a channel adapter.
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    /// Owner identity when the channel already knows it (e.g. an authenticated web client).
    pub owner_id: Option<String>,
    pub channel: String,
    pub sender_id: String,
    pub text: String,
    pub attachment: Option<Attachment>,
    /// Payload of a pressed quick-reply button.
    pub button: Option<String>,
}

/// A quick-reply suggestion rendered by the channel as a button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReply {
    pub label: String,
    pub payload: String,
}

impl QuickReply {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// The reply handed back to a channel adapter.
#[derive(Debug, Clone, Default)]
pub struct OutboundReply {
    pub text: String,
    pub suggestions: Vec<QuickReply>,
    pub cited_memory_ids: Vec<String>,
    pub created_memory_id: Option<String>,
}

// --- Persistent records ---

/// Synchronization status toward external mirrors.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Pending,
    Synced,
    Failed,
}

/// A captured memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Memory {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub embedding: Vec<f32>,
    pub category_id: Option<String>,
    pub source_channel: String,
    pub occurred_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub sync_status: SyncStatus,
    pub deleted_at: Option<String>,
}

/// A per-owner category bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub embedding: Option<Vec<f32>>,
    pub usage_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A per-owner tag bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub normalized_name: String,
    pub embedding: Option<Vec<f32>>,
    pub usage_count: i64,
    pub created_at: String,
}

/// An undirected similarity edge. `memory_a` always sorts before `memory_b`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRelationship {
    pub id: String,
    pub owner_id: String,
    pub memory_a: String,
    pub memory_b: String,
    pub score: f32,
    pub relationship_type: String,
    pub created_at: String,
    pub updated_at: String,
}

impl MemoryRelationship {
    /// Returns the endpoint opposite `memory_id`, or `None` if the edge does not touch it.
    pub fn other_end(&self, memory_id: &str) -> Option<&str> {
        if self.memory_a == memory_id {
            Some(&self.memory_b)
        } else if self.memory_b == memory_id {
            Some(&self.memory_a)
        } else {
            None
        }
    }
}

/// Conversation state for a session.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationState {
    #[default]
    Conversation,
    MemoryCapture,
    MemoryEnrichment,
    MemoryDraft,
}

/// One piece of content contributed to a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftFragment {
    pub content: String,
    #[serde(default)]
    pub is_answer: bool,
}

/// Classification shown to the user before saving.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationPreview {
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The in-progress representation of a memory being captured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default)]
    pub fragments: Vec<DraftFragment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<ClassificationPreview>,
    /// Set while a finalize is running for this draft.
    #[serde(default)]
    pub saving: bool,
    /// When the running finalize claimed the draft.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saving_since: Option<String>,
}

impl Draft {
    /// Claim the draft for a save starting now.
    pub fn begin_save(&mut self) {
        self.saving = true;
        self.saving_since = Some(now_timestamp());
    }

    pub fn end_save(&mut self) {
        self.saving = false;
        self.saving_since = None;
    }

    /// Whether a save still holds the draft. A marker set at or before
    /// `cutoff`, or one without a start time, was left by a save that never
    /// finished and no longer blocks.
    pub fn save_in_flight(&self, cutoff: &str) -> bool {
        self.saving
            && self
                .saving_since
                .as_deref()
                .is_some_and(|since| since > cutoff)
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.iter().all(|f| f.content.trim().is_empty())
    }

    /// Fragments joined into the memory body.
    pub fn content(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.content.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Number of fragments supplied as answers to follow-up questions.
    pub fn enrichment_count(&self) -> usize {
        self.fragments.iter().filter(|f| f.is_answer).count()
    }
}

/// A single entry of the bounded per-session history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub text: String,
}

/// A conversation session for one channel identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSession {
    pub id: String,
    pub owner_id: String,
    pub channel: String,
    pub channel_user_id: String,
    pub state: ConversationState,
    pub draft: Draft,
    pub history: Vec<HistoryEntry>,
    pub last_saved_memory_id: Option<String>,
    /// Optimistic-concurrency counter, bumped by every persisted write.
    pub version: i64,
    pub expires_at: String,
    pub created_at: String,
    pub updated_at: String,
}
