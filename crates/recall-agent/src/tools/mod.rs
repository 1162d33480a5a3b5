// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tools the reasoning model can call, and the registry that dispatches them.
//!
//! Every tool answers with a JSON document. Failures never escape the
//! registry: malformed arguments, unknown tools, missing records, and
//! handler errors all come back as structured `{"error": ...}` results the
//! model can react to.

pub mod capture;
pub mod finalize;
pub mod manage;
pub mod search;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use recall_core::{ConversationState, Memory, QuickReply, RecallError, ToolUseData};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use recall_memory::text::preview;

use crate::services::MemoryServices;

/// Button payloads understood by the prompt.
pub mod buttons {
    pub const START_CAPTURE: &str = "start_capture";
    pub const GENERATE_DRAFT: &str = "generate_draft";
    pub const SAVE: &str = "save_memory";
    pub const CANCEL: &str = "cancel_draft";
}

/// The suggestion shown when no tool chose one.
pub fn default_suggestions() -> Vec<QuickReply> {
    vec![QuickReply::new("New memory", buttons::START_CAPTURE)]
}

/// Buttons matching where the session stands.
pub fn suggestions_for(state: ConversationState) -> Vec<QuickReply> {
    match state {
        ConversationState::Conversation => default_suggestions(),
        ConversationState::MemoryCapture | ConversationState::MemoryEnrichment => vec![
            QuickReply::new("Preview", buttons::GENERATE_DRAFT),
            QuickReply::new("Cancel", buttons::CANCEL),
        ],
        ConversationState::MemoryDraft => vec![
            QuickReply::new("Save", buttons::SAVE),
            QuickReply::new("Cancel", buttons::CANCEL),
        ],
    }
}

/// Who a tool call acts for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContext {
    pub owner_id: String,
    pub session_id: String,
    pub channel: String,
}

/// Result of one tool call plus the side information the turn accumulates.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: Value,
    pub is_error: bool,
    pub cited_memory_ids: Vec<String>,
    pub created_memory_id: Option<String>,
    pub suggestions: Option<Vec<QuickReply>>,
}

impl ToolOutput {
    pub fn ok(content: Value) -> Self {
        Self {
            content,
            is_error: false,
            cited_memory_ids: Vec::new(),
            created_memory_id: None,
            suggestions: None,
        }
    }

    pub fn error(content: Value) -> Self {
        Self {
            is_error: true,
            ..Self::ok(content)
        }
    }

    pub fn with_cited(mut self, ids: Vec<String>) -> Self {
        self.cited_memory_ids = ids;
        self
    }

    pub fn with_created(mut self, id: String) -> Self {
        self.created_memory_id = Some(id);
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<QuickReply>) -> Self {
        self.suggestions = Some(suggestions);
        self
    }

    /// `status` field of the result, if any.
    pub fn status(&self) -> Option<&str> {
        self.content.get("status").and_then(Value::as_str)
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the tool input.
    fn parameters_schema(&self) -> Value;

    async fn invoke(&self, ctx: &ToolContext, input: Value) -> Result<ToolOutput, RecallError>;
}

/// Deserialize tool input. A missing or null input reads as `{}`.
pub fn parse_args<T: DeserializeOwned>(input: Value) -> Result<T, RecallError> {
    let input = if input.is_null() { json!({}) } else { input };
    serde_json::from_value(input).map_err(|e| RecallError::Validation(e.to_string()))
}

/// Trimmed text, or `None` when blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Memory rendered for tool results.
pub(crate) fn memory_json(
    memory: &Memory,
    category: Option<&str>,
    tags: &[String],
    preview_chars: usize,
) -> Value {
    json!({
        "id": memory.id,
        "title": memory.title,
        "content_preview": preview(&memory.content, preview_chars),
        "category": category,
        "tags": tags,
    })
}

/// Category name and tag names for a stored memory.
pub(crate) async fn memory_labels(
    services: &MemoryServices,
    memory: &Memory,
) -> Result<(Option<String>, Vec<String>), RecallError> {
    let category = match &memory.category_id {
        Some(id) => services
            .storage
            .get_category(&memory.owner_id, id)
            .await?
            .map(|c| c.name),
        None => None,
    };
    let tags = services
        .storage
        .tags_for_memory(&memory.id)
        .await?
        .into_iter()
        .map(|t| t.name)
        .collect();
    Ok((category, tags))
}

/// Tools indexed by name.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry holding every memory tool.
    pub fn with_memory_tools(services: Arc<MemoryServices>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(search::SearchMemories::new(Arc::clone(&services))));
        registry.register(Arc::new(capture::StartMemoryCapture::new(Arc::clone(&services))));
        registry.register(Arc::new(capture::AddToMemoryDraft::new(Arc::clone(&services))));
        registry.register(Arc::new(capture::GenerateMemoryDraft::new(Arc::clone(&services))));
        registry.register(Arc::new(capture::CancelMemoryDraft::new(Arc::clone(&services))));
        registry.register(Arc::new(finalize::FinalizeMemory::new(Arc::clone(&services))));
        registry.register(Arc::new(manage::DeleteMemory::new(Arc::clone(&services))));
        registry.register(Arc::new(manage::UpdateMemory::new(services)));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Anthropic-format tool definitions, sorted by name.
    pub fn tool_definitions(&self) -> Vec<Value> {
        let mut tools: Vec<&Arc<dyn Tool>> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
            .into_iter()
            .map(|t| {
                json!({
                    "name": t.name(),
                    "description": t.description(),
                    "input_schema": t.parameters_schema(),
                })
            })
            .collect()
    }

    /// Run one tool call. Never fails: every problem becomes an error result.
    pub async fn dispatch(&self, ctx: &ToolContext, call: &ToolUseData) -> ToolOutput {
        let Some(tool) = self.get(&call.name) else {
            warn!(tool = %call.name, "model called an unknown tool");
            return ToolOutput::error(json!({"error": "unknown_tool", "tool": call.name}));
        };
        debug!(tool = %call.name, session_id = %ctx.session_id, "invoking tool");
        match tool.invoke(ctx, call.input.clone()).await {
            Ok(output) => output,
            Err(RecallError::Validation(message)) => ToolOutput::error(json!({
                "error": "invalid_arguments",
                "tool": call.name,
                "message": message,
            })),
            Err(RecallError::NotFound { entity, id }) => ToolOutput::error(json!({
                "error": "not_found",
                "entity": entity,
                "id": id,
            })),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool failed");
                ToolOutput::error(json!({
                    "error": "tool_failed",
                    "tool": call.name,
                    "message": e.to_string(),
                }))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
