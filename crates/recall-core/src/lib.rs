// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Recall memory assistant.
//!
//! This crate provides the error taxonomy, the adapter traits for the
//! collaborators the memory core consumes (reasoning model, embedding
//! model, persistence), and the records shared across the workspace.

pub mod error;
pub mod traits;
pub mod types;
pub mod vector;

pub use error::{RecallError, with_timeout};
pub use types::{
    AdapterType, Attachment, Category, ClassificationPreview, ContentBlock, ConversationSession,
    ConversationState, Draft, DraftFragment, EmbeddingInput, EmbeddingOutput, HealthStatus,
    HistoryEntry, InboundMessage, Memory, MemoryRelationship, OutboundReply, ProviderMessage,
    ProviderRequest, ProviderResponse, QuickReply, SyncStatus, Tag, TokenUsage, ToolUseData,
    format_timestamp, now_timestamp,
};

pub use traits::{EmbeddingAdapter, PluginAdapter, ProviderAdapter, StorageAdapter};
