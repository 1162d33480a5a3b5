// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entry point for channel adapters.
//!
//! Turns for one channel identity run one at a time, in arrival order,
//! behind a per-identity mutex. Different identities never wait on each
//! other.

use std::sync::{Arc, LazyLock};

use chrono::Utc;
use dashmap::DashMap;
use recall_config::model::RecallConfig;
use recall_core::{
    EmbeddingAdapter, InboundMessage, OutboundReply, ProviderAdapter, RecallError,
    StorageAdapter, format_timestamp, now_timestamp,
};
use regex::Regex;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::orchestrator::{APOLOGY_REPLY, Orchestrator};
use crate::prompt::load_system_prompt;
use crate::services::MemoryServices;
use crate::tools::{ToolRegistry, default_suggestions};

/// How long an issued link code stays redeemable.
pub const LINK_CODE_TTL_MINUTES: i64 = 15;

const LINK_INSTRUCTIONS: &str = "This chat isn't linked to a Recall account yet. \
Generate a link code from your account and send it here as: /link YOUR-CODE";

const LINK_FAILED: &str = "That link code is invalid or has expired. Please generate a new one.";

const LINKED: &str = "You're linked! Tell me anything you'd like to remember.";

const EMPTY_MESSAGE: &str = "Tell me something you'd like to remember, or ask about a memory.";

static LINK_COMMAND: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^/?link\s+([a-z0-9-]{4,32})$").ok());

/// Link code carried by a `/link CODE` message.
pub fn parse_link_command(text: &str) -> Option<String> {
    let re = LINK_COMMAND.as_ref()?;
    re.captures(text.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_uppercase())
}

/// Text handed to the model: the message plus attachment and button context.
pub fn compose_turn_text(inbound: &InboundMessage) -> String {
    let mut parts: Vec<String> = Vec::new();
    let text = inbound.text.trim();
    if !text.is_empty() {
        parts.push(text.to_string());
    }
    if let Some(attachment) = &inbound.attachment {
        let name = attachment.file_name.as_deref().unwrap_or("unnamed");
        let mut line = format!("[Attachment: {} {}]", attachment.kind, name);
        if let Some(extracted) = attachment
            .extracted_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            line.push('\n');
            line.push_str(extracted);
        }
        parts.push(line);
    }
    if let Some(button) = inbound.button.as_deref().filter(|b| !b.trim().is_empty()) {
        parts.push(format!("[Button pressed: {button}]"));
    }
    parts.join("\n\n")
}

fn text_reply(text: &str) -> OutboundReply {
    OutboundReply {
        text: text.to_string(),
        suggestions: default_suggestions(),
        ..Default::default()
    }
}

pub struct MessageRouter {
    services: Arc<MemoryServices>,
    orchestrator: Arc<Orchestrator>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl MessageRouter {
    pub fn new(services: Arc<MemoryServices>, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            services,
            orchestrator,
            locks: DashMap::new(),
        }
    }

    /// Wire services, tools, and the orchestrator from configuration.
    pub async fn build(
        config: &RecallConfig,
        storage: Arc<dyn StorageAdapter>,
        provider: Arc<dyn ProviderAdapter>,
        embedding: Arc<dyn EmbeddingAdapter>,
    ) -> Self {
        let services = Arc::new(MemoryServices::new(
            config,
            storage,
            Arc::clone(&provider),
            embedding,
        ));
        let registry = Arc::new(ToolRegistry::with_memory_tools(Arc::clone(&services)));
        let system_prompt = load_system_prompt(&config.agent).await;
        let orchestrator = Arc::new(Orchestrator::new(
            provider,
            registry,
            Arc::clone(&services.sessions),
            config,
            system_prompt,
        ));
        info!(
            tools = orchestrator.registry().len(),
            model = %config.anthropic.default_model,
            "message router ready"
        );
        Self::new(services, orchestrator)
    }

    pub fn services(&self) -> &Arc<MemoryServices> {
        &self.services
    }

    /// Handle one inbound message. Always produces a reply.
    pub async fn route(&self, inbound: InboundMessage) -> OutboundReply {
        let key = format!("{}:{}", inbound.channel, inbound.sender_id);
        let lock = Arc::clone(
            self.locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );

        let reply = {
            let _turn = lock.lock().await;
            match self.handle(&inbound).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(channel = %inbound.channel, sender = %inbound.sender_id, error = %e, "turn failed");
                    text_reply(APOLOGY_REPLY)
                }
            }
        };

        drop(lock);
        self.locks.remove_if(&key, |_, l| Arc::strong_count(l) == 1);
        reply
    }

    async fn handle(&self, inbound: &InboundMessage) -> Result<OutboundReply, RecallError> {
        let storage = &self.services.storage;

        if let Some(code) = parse_link_command(&inbound.text) {
            let linked = storage
                .redeem_link_code(&code, &inbound.channel, &inbound.sender_id, &now_timestamp())
                .await?;
            return Ok(match linked {
                Some(owner_id) => {
                    info!(owner_id = %owner_id, channel = %inbound.channel, "channel identity linked");
                    text_reply(LINKED)
                }
                None => text_reply(LINK_FAILED),
            });
        }

        let owner_id = match inbound.owner_id.clone().filter(|o| !o.trim().is_empty()) {
            Some(owner) => owner,
            None => match storage
                .resolve_channel_owner(&inbound.channel, &inbound.sender_id)
                .await?
            {
                Some(owner) => owner,
                None => {
                    debug!(channel = %inbound.channel, sender = %inbound.sender_id, "unlinked sender");
                    return Ok(text_reply(LINK_INSTRUCTIONS));
                }
            },
        };

        let text = compose_turn_text(inbound);
        if text.is_empty() {
            return Ok(text_reply(EMPTY_MESSAGE));
        }

        let session = self
            .services
            .sessions
            .load_or_create(&owner_id, &inbound.channel, &inbound.sender_id)
            .await?;
        Ok(self.orchestrator.run_turn(&session, &text).await)
    }

    /// Issue a one-time code that links a channel identity to `owner_id`.
    pub async fn issue_link_code(&self, owner_id: &str) -> Result<String, RecallError> {
        let code = uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase();
        let expires_at =
            format_timestamp(Utc::now() + chrono::Duration::minutes(LINK_CODE_TTL_MINUTES));
        self.services
            .storage
            .create_link_code(owner_id, &code, &expires_at)
            .await?;
        info!(owner_id, "link code issued");
        Ok(code)
    }

    /// Number of identities with a turn in flight.
    pub fn active_turns(&self) -> usize {
        self.locks.len()
    }
}
