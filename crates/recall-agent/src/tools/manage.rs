// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Editing and removing saved memories.

use std::sync::Arc;

use async_trait::async_trait;
use recall_core::{RecallError, now_timestamp};
use recall_memory::CategoryChoice;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{Tool, ToolContext, ToolOutput, memory_json, memory_labels, non_blank, parse_args};
use crate::services::MemoryServices;

fn memory_not_found(id: &str) -> RecallError {
    RecallError::NotFound {
        entity: "memory",
        id: id.to_string(),
    }
}

// --- delete_memory ---

#[derive(Debug, Deserialize)]
struct DeleteArgs {
    memory_id: String,
}

pub struct DeleteMemory {
    services: Arc<MemoryServices>,
}

impl DeleteMemory {
    pub fn new(services: Arc<MemoryServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for DeleteMemory {
    fn name(&self) -> &str {
        "delete_memory"
    }

    fn description(&self) -> &str {
        "Delete a saved memory by id. Ask the user to confirm first."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "memory_id": { "type": "string" } },
            "required": ["memory_id"]
        })
    }

    async fn invoke(&self, ctx: &ToolContext, input: Value) -> Result<ToolOutput, RecallError> {
        let args: DeleteArgs = parse_args(input)?;
        let id = args.memory_id.trim().to_string();
        if !self
            .services
            .storage
            .soft_delete_memory(&ctx.owner_id, &id)
            .await?
        {
            return Err(memory_not_found(&id));
        }
        info!(owner_id = %ctx.owner_id, memory_id = %id, "memory deleted");

        if let Err(e) = self
            .services
            .sessions
            .update(&ctx.session_id, |s| {
                if s.last_saved_memory_id.as_deref() == Some(id.as_str()) {
                    s.last_saved_memory_id = None;
                }
            })
            .await
        {
            warn!(session_id = %ctx.session_id, error = %e, "could not forget deleted memory");
        }
        Ok(ToolOutput::ok(json!({"status": "memory_deleted", "id": id})))
    }
}

// --- update_memory ---

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    memory_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

pub struct UpdateMemory {
    services: Arc<MemoryServices>,
}

impl UpdateMemory {
    pub fn new(services: Arc<MemoryServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for UpdateMemory {
    fn name(&self) -> &str {
        "update_memory"
    }

    fn description(&self) -> &str {
        "Change the title, content, or category of a saved memory."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "memory_id": { "type": "string" },
                "title": { "type": "string" },
                "content": { "type": "string" },
                "category": { "type": "string" }
            },
            "required": ["memory_id"]
        })
    }

    async fn invoke(&self, ctx: &ToolContext, input: Value) -> Result<ToolOutput, RecallError> {
        let args: UpdateArgs = parse_args(input)?;
        let title = non_blank(args.title);
        let content = non_blank(args.content);
        let category = non_blank(args.category);
        if title.is_none() && content.is_none() && category.is_none() {
            return Err(RecallError::Validation(
                "give at least one of title, content, or category".into(),
            ));
        }

        let services = &self.services;
        let id = args.memory_id.trim().to_string();
        let mut memory = services
            .storage
            .get_memory(&ctx.owner_id, &id)
            .await?
            .ok_or_else(|| memory_not_found(&id))?;

        let mut content_changed = false;
        if let Some(content) = content.filter(|c| *c != memory.content) {
            if let Some(existing) = services
                .storage
                .find_memory_by_content(&ctx.owner_id, &content)
                .await?
            {
                return Ok(ToolOutput::error(json!({
                    "error": "duplicate_content",
                    "id": existing.id,
                })));
            }
            memory.embedding = services.embedder.embed(&content).await?;
            match services.summarizer.title_and_summary(&content).await {
                Ok(generated) => memory.summary = generated.summary,
                Err(e) => warn!(memory_id = %id, error = %e, "summary refresh failed, keeping old summary"),
            }
            memory.content = content;
            content_changed = true;
        }
        if let Some(title) = title {
            memory.title = title;
        }

        let previous_category = memory.category_id.clone();
        if let Some(name) = category {
            let bucket = services
                .categories
                .assign(
                    &ctx.owner_id,
                    &memory.content,
                    Some(&memory.embedding),
                    CategoryChoice::Override(name),
                )
                .await?;
            memory.category_id = Some(bucket.id);
        }

        memory.updated_at = now_timestamp();
        if !services.storage.update_memory(&memory).await? {
            return Err(memory_not_found(&id));
        }

        if memory.category_id != previous_category {
            if let Some(old) = &previous_category {
                if let Err(e) = services.categories.record_usage(old, -1).await {
                    warn!(category_id = %old, error = %e, "category usage decrement failed");
                }
            }
            services.spawn_post_save(&ctx.owner_id, memory.category_id.clone(), Vec::new());
        }
        if content_changed {
            services
                .graph
                .build_for(&ctx.owner_id, &memory.id, &memory.embedding)
                .await;
        }
        info!(owner_id = %ctx.owner_id, memory_id = %id, content_changed, "memory updated");

        let (category, tags) = memory_labels(services, &memory).await?;
        Ok(ToolOutput::ok(json!({
            "status": "memory_updated",
            "memory": memory_json(&memory, category.as_deref(), &tags, services.preview_chars),
        }))
        .with_cited(vec![memory.id.clone()]))
    }
}
