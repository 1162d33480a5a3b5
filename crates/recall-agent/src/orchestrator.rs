// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The bounded tool-calling loop behind every turn.
//!
//! Each round sends the conversation and the tool catalog to the reasoning
//! model. A response without tool calls ends the turn. Otherwise every call
//! is dispatched in order, the results go back as a user message, and the
//! loop repeats, at most `max_tool_iterations` times.

use std::sync::Arc;
use std::time::Duration;

use recall_config::model::RecallConfig;
use recall_core::{
    ContentBlock, ConversationSession, OutboundReply, ProviderAdapter, ProviderMessage,
    ProviderRequest, QuickReply, with_timeout,
};
use tracing::{debug, info, warn};

use crate::prompt;
use crate::session::SessionManager;
use crate::tools::{ToolContext, ToolRegistry, suggestions_for};

/// Reply when the reasoning model cannot be reached.
pub const APOLOGY_REPLY: &str =
    "Sorry, I couldn't process that just now. Please try again in a moment.";

/// Reply when the model keeps calling tools past the iteration bound.
pub const EXHAUSTED_REPLY: &str =
    "Sorry, that took more steps than I can manage at once. Could you say it another way?";

const EMPTY_REPLY: &str = "Okay.";

/// Side information collected from tool results during one turn.
#[derive(Debug, Default)]
struct TurnEffects {
    cited: Vec<String>,
    created: Option<String>,
    suggestions: Option<Vec<QuickReply>>,
}

pub struct Orchestrator {
    provider: Arc<dyn ProviderAdapter>,
    registry: Arc<ToolRegistry>,
    sessions: Arc<SessionManager>,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    max_iterations: usize,
    system_prompt: String,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        registry: Arc<ToolRegistry>,
        sessions: Arc<SessionManager>,
        config: &RecallConfig,
        system_prompt: String,
    ) -> Self {
        Self {
            provider,
            registry,
            sessions,
            model: config.anthropic.default_model.clone(),
            max_tokens: config.anthropic.max_tokens,
            timeout: Duration::from_secs(config.anthropic.timeout_secs),
            max_iterations: config.agent.max_tool_iterations.max(1),
            system_prompt,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one user turn to completion. Never fails: provider trouble
    /// becomes an apology and a runaway loop becomes a fallback reply.
    pub async fn run_turn(&self, session: &ConversationSession, text: &str) -> OutboundReply {
        let ctx = ToolContext {
            owner_id: session.owner_id.clone(),
            session_id: session.id.clone(),
            channel: session.channel.clone(),
        };
        let system = prompt::compose(&self.system_prompt, session);
        let tools = self.registry.tool_definitions();

        let mut messages: Vec<ProviderMessage> = session
            .history
            .iter()
            .skip_while(|h| h.role != "user")
            .map(|h| ProviderMessage {
                role: h.role.clone(),
                content: vec![ContentBlock::Text {
                    text: h.text.clone(),
                }],
            })
            .collect();
        messages.push(ProviderMessage::user_text(text));

        let mut effects = TurnEffects::default();
        let mut reply: Option<String> = None;

        for iteration in 1..=self.max_iterations {
            let request = ProviderRequest {
                model: self.model.clone(),
                system_prompt: Some(system.clone()),
                messages: messages.clone(),
                max_tokens: self.max_tokens,
                tools: Some(tools.clone()),
            };
            let response = match with_timeout(self.timeout, self.provider.complete(request)).await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(session_id = %ctx.session_id, iteration, error = %e, "reasoning call failed");
                    reply = Some(APOLOGY_REPLY.to_string());
                    break;
                }
            };

            if response.tool_calls.is_empty() {
                debug!(session_id = %ctx.session_id, iteration, "turn finished");
                reply = Some(response.content);
                break;
            }

            let mut calls = Vec::with_capacity(response.tool_calls.len() + 1);
            if !response.content.trim().is_empty() {
                calls.push(ContentBlock::Text {
                    text: response.content.clone(),
                });
            }
            calls.extend(response.tool_calls.iter().map(|c| ContentBlock::ToolUse {
                id: c.id.clone(),
                name: c.name.clone(),
                input: c.input.clone(),
            }));
            messages.push(ProviderMessage {
                role: "assistant".into(),
                content: calls,
            });

            let mut results = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                let output = self.registry.dispatch(&ctx, call).await;
                for id in &output.cited_memory_ids {
                    if !effects.cited.contains(id) {
                        effects.cited.push(id.clone());
                    }
                }
                if output.created_memory_id.is_some() {
                    effects.created = output.created_memory_id.clone();
                }
                if output.suggestions.is_some() {
                    effects.suggestions = output.suggestions.clone();
                }
                results.push(ContentBlock::ToolResult {
                    tool_use_id: call.id.clone(),
                    content: output.content.to_string(),
                    is_error: output.is_error.then_some(true),
                });
            }
            messages.push(ProviderMessage {
                role: "user".into(),
                content: results,
            });
        }

        let text_out = match reply {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            Some(_) => EMPTY_REPLY.to_string(),
            None => {
                info!(
                    session_id = %ctx.session_id,
                    max_iterations = self.max_iterations,
                    "tool loop hit its iteration bound"
                );
                EXHAUSTED_REPLY.to_string()
            }
        };

        let state = match self
            .sessions
            .update(&ctx.session_id, |s| {
                self.sessions.push_history(s, "user", text);
                self.sessions.push_history(s, "assistant", &text_out);
            })
            .await
        {
            Ok((fresh, ())) => fresh.state,
            Err(e) => {
                warn!(session_id = %ctx.session_id, error = %e, "failed to record turn history");
                session.state
            }
        };

        OutboundReply {
            text: text_out,
            suggestions: effects.suggestions.unwrap_or_else(|| suggestions_for(state)),
            cited_memory_ids: effects.cited,
            created_memory_id: effects.created,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::ConversationState;
    use recall_test_utils::MockProvider;
    use serde_json::json;

    use crate::test_support::Fixture;
    use crate::tools::buttons;

    fn orchestrator(fx: &Fixture, config: &RecallConfig) -> Orchestrator {
        Orchestrator::new(
            fx.provider.clone(),
            Arc::new(ToolRegistry::with_memory_tools(Arc::clone(&fx.services))),
            Arc::clone(&fx.services.sessions),
            config,
            "Base prompt.".into(),
        )
    }

    #[tokio::test]
    async fn plain_reply_is_recorded_in_history() {
        let fx = Fixture::new().await;
        fx.provider.push_text("Hi there!");
        let reply = orchestrator(&fx, &RecallConfig::default())
            .run_turn(&fx.session().await, "hello")
            .await;
        assert_eq!(reply.text, "Hi there!");
        assert_eq!(reply.suggestions[0].payload, buttons::START_CAPTURE);

        let session = fx.session().await;
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[0].text, "hello");
        assert_eq!(session.history[1].role, "assistant");

        let request = &fx.provider.tool_requests()[0];
        assert!(request.system_prompt.as_deref().unwrap().starts_with("Base prompt."));
        assert_eq!(request.tools.as_ref().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn tool_results_feed_the_next_round() {
        let fx = Fixture::new().await;
        fx.provider
            .push_tool_call("start_memory_capture", json!({"initial_content": "My first marathon"}));
        fx.provider.push_text("Congratulations! How did it feel?");

        let reply = orchestrator(&fx, &RecallConfig::default())
            .run_turn(&fx.session().await, "I ran my first marathon")
            .await;
        assert_eq!(reply.text, "Congratulations! How did it feel?");
        assert_eq!(reply.suggestions[0].payload, buttons::GENERATE_DRAFT);
        assert_eq!(fx.session().await.state, ConversationState::MemoryEnrichment);

        let second = &fx.provider.tool_requests()[1];
        let last = second.messages.last().unwrap();
        assert_eq!(last.role, "user");
        match &last.content[0] {
            ContentBlock::ToolResult {
                content, is_error, ..
            } => {
                assert!(content.contains("capture_started"));
                assert!(is_error.is_none());
            }
            other => panic!("expected a tool result, got {other:?}"),
        }
        assert_eq!(second.messages[second.messages.len() - 2].role, "assistant");
    }

    #[tokio::test]
    async fn loop_stops_at_iteration_bound() {
        let mut config = RecallConfig::default();
        config.agent.max_tool_iterations = 3;
        let fx = Fixture::with_config(config.clone()).await;
        for _ in 0..5 {
            fx.provider.push_tool_call("cancel_memory_draft", json!({}));
        }
        let reply = orchestrator(&fx, &config)
            .run_turn(&fx.session().await, "loop forever")
            .await;
        assert_eq!(reply.text, EXHAUSTED_REPLY);
        assert_eq!(fx.provider.tool_requests().len(), 3);
        assert_eq!(fx.provider.pending_responses(), 2);
    }

    #[tokio::test]
    async fn provider_failure_becomes_an_apology() {
        let fx = Fixture::new().await;
        fx.provider.set_failing(true);
        let reply = orchestrator(&fx, &RecallConfig::default())
            .run_turn(&fx.session().await, "hello")
            .await;
        assert_eq!(reply.text, APOLOGY_REPLY);
        assert!(reply.created_memory_id.is_none());
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_back_to_the_model() {
        let fx = Fixture::new().await;
        fx.provider.push_tool_call("teleport", json!({}));
        fx.provider.push_text("I can't do that.");
        let reply = orchestrator(&fx, &RecallConfig::default())
            .run_turn(&fx.session().await, "beam me up")
            .await;
        assert_eq!(reply.text, "I can't do that.");
        let second = &fx.provider.tool_requests()[1];
        match &second.messages.last().unwrap().content[0] {
            ContentBlock::ToolResult {
                content, is_error, ..
            } => {
                assert!(content.contains("unknown_tool"));
                assert_eq!(*is_error, Some(true));
            }
            other => panic!("expected a tool result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn saved_memory_id_reaches_the_reply() {
        let fx = Fixture::new().await;
        fx.script_labels("Picnic", "Family", &["park"]);
        fx.provider.push_response(MockProvider::tool_calls(vec![
            ("add_to_memory_draft", json!({"content": "Picnic in the park with the kids."})),
            ("finalize_memory", json!({})),
        ]));
        fx.provider.push_text("Saved!");

        let reply = orchestrator(&fx, &RecallConfig::default())
            .run_turn(&fx.session().await, "save this: picnic in the park with the kids")
            .await;
        assert_eq!(reply.text, "Saved!");
        let id = reply.created_memory_id.unwrap();
        assert!(fx.storage.get_memory("owner-1", &id).await.unwrap().is_some());
        assert_eq!(reply.suggestions[0].payload, buttons::START_CAPTURE);
    }
}
