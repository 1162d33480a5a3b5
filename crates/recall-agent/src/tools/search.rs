// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use recall_core::RecallError;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Tool, ToolContext, ToolOutput, parse_args};
use crate::services::MemoryServices;

pub const DEFAULT_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
struct Args {
    query: String,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    include_related: bool,
}

pub struct SearchMemories {
    services: Arc<MemoryServices>,
}

impl SearchMemories {
    pub fn new(services: Arc<MemoryServices>) -> Self {
        Self { services }
    }
}

/// Requested limit clamped to `1..=MAX_LIMIT`.
pub fn clamp_limit(limit: Option<i64>) -> usize {
    match limit {
        None => DEFAULT_LIMIT,
        Some(n) => n.clamp(1, MAX_LIMIT as i64) as usize,
    }
}

#[async_trait]
impl Tool for SearchMemories {
    fn name(&self) -> &str {
        "search_memories"
    }

    fn description(&self) -> &str {
        "Search the user's saved memories. Use when the user asks about something they may have told you before."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "What to look for" },
                "limit": { "type": "integer", "minimum": 1, "maximum": MAX_LIMIT, "description": "Maximum results (default 5)" },
                "include_related": { "type": "boolean", "description": "Also follow links to related memories" }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, ctx: &ToolContext, input: Value) -> Result<ToolOutput, RecallError> {
        let args: Args = parse_args(input)?;
        let outcome = self
            .services
            .retriever
            .search(
                &ctx.owner_id,
                &args.query,
                clamp_limit(args.limit),
                args.include_related,
            )
            .await?;

        if outcome.hits.is_empty() {
            return Ok(ToolOutput::ok(json!({
                "memories": [],
                "message": "No matching memories found.",
            })));
        }
        let cited = outcome.hits.iter().map(|h| h.id.clone()).collect();
        Ok(ToolOutput::ok(json!({
            "memories": outcome.hits,
            "tier": outcome.tier,
        }))
        .with_cited(cited))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_clamped() {
        assert_eq!(clamp_limit(None), 5);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(-3)), 1);
        assert_eq!(clamp_limit(Some(7)), 7);
        assert_eq!(clamp_limit(Some(50)), 10);
    }
}
