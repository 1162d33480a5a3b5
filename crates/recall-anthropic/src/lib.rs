// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reasoning provider backed by the Anthropic Messages API.
//!
//! Translates [`ProviderRequest`]s into Messages API calls and maps
//! `tool_use` blocks in the reply to [`ToolUseData`].

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use recall_config::model::AnthropicConfig;
use recall_core::{
    AdapterType, ContentBlock, HealthStatus, PluginAdapter, ProviderAdapter, ProviderRequest,
    ProviderResponse, RecallError, TokenUsage, ToolUseData,
};
use tracing::{debug, info, warn};

pub use client::AnthropicClient;
use types::{
    ApiContent, ApiContentBlock, ApiMessage, MessageRequest, ResponseContentBlock, ToolDefinition,
};

pub struct AnthropicProvider {
    client: AnthropicClient,
}

impl AnthropicProvider {
    /// Build a provider from configuration.
    ///
    /// The API key comes from `anthropic.api_key`, else `ANTHROPIC_API_KEY`.
    pub fn new(config: &AnthropicConfig) -> Result<Self, RecallError> {
        let api_key = resolve_api_key(config.api_key.as_deref())?;
        let client = AnthropicClient::new(
            &api_key,
            &config.api_version,
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(
            model = %config.default_model,
            utility_model = %config.utility_model,
            "Anthropic provider initialized"
        );
        Ok(Self { client })
    }

    pub fn with_client(client: AnthropicClient) -> Self {
        Self { client }
    }
}

/// Convert a core request to the Messages API body.
pub fn to_message_request(request: &ProviderRequest) -> MessageRequest {
    let messages = request
        .messages
        .iter()
        .map(|m| ApiMessage {
            role: m.role.clone(),
            content: convert_content(&m.content),
        })
        .collect();

    let tools = request
        .tools
        .as_ref()
        .map(|values| {
            values
                .iter()
                .filter_map(|v| match serde_json::from_value::<ToolDefinition>(v.clone()) {
                    Ok(def) => Some(def),
                    Err(e) => {
                        warn!(error = %e, "skipping malformed tool definition");
                        None
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|defs| !defs.is_empty());

    MessageRequest {
        model: request.model.clone(),
        messages,
        system: request.system_prompt.clone(),
        max_tokens: request.max_tokens,
        tools,
    }
}

fn convert_content(blocks: &[ContentBlock]) -> ApiContent {
    if let [ContentBlock::Text { text }] = blocks {
        return ApiContent::Text(text.clone());
    }
    ApiContent::Blocks(
        blocks
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => ApiContentBlock::Text { text: text.clone() },
                ContentBlock::ToolUse { id, name, input } => ApiContentBlock::ToolUse {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                },
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => ApiContentBlock::ToolResult {
                    tool_use_id: tool_use_id.clone(),
                    content: content.clone(),
                    is_error: *is_error,
                },
            })
            .collect(),
    )
}

fn resolve_api_key(configured: Option<&str>) -> Result<String, RecallError> {
    if let Some(key) = configured
        && !key.trim().is_empty()
    {
        return Ok(key.to_string());
    }
    std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
        RecallError::Config(
            "Anthropic API key not found. Set anthropic.api_key in config or the ANTHROPIC_API_KEY environment variable.".into(),
        )
    })
}

#[async_trait]
impl PluginAdapter for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, RecallError> {
        // Avoid spending tokens on health checks.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RecallError> {
        debug!("Anthropic provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, RecallError> {
        let api_request = to_message_request(&request);
        let response = self.client.complete_message(&api_request).await?;

        let mut text = Vec::new();
        let mut tool_calls = Vec::new();
        for block in response.content {
            match block {
                ResponseContentBlock::Text { text: t } => text.push(t),
                ResponseContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolUseData { id, name, input })
                }
                ResponseContentBlock::Other => {}
            }
        }
        debug!(
            model = %response.model,
            tool_calls = tool_calls.len(),
            output_tokens = response.usage.output_tokens,
            "completion received"
        );

        Ok(ProviderResponse {
            id: response.id,
            content: text.join(""),
            tool_calls,
            model: response.model,
            stop_reason: response.stop_reason,
            usage: TokenUsage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::ProviderMessage;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> AnthropicProvider {
        let client = AnthropicClient::new("k", "2023-06-01", Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri())
            .with_retry(0, Duration::from_millis(1));
        AnthropicProvider::with_client(client)
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "claude-test".into(),
            system_prompt: Some("Be kind.".into()),
            messages: vec![
                ProviderMessage::user_text("find my lake trip"),
                ProviderMessage {
                    role: "assistant".into(),
                    content: vec![ContentBlock::ToolUse {
                        id: "toolu_0".into(),
                        name: "search_memories".into(),
                        input: json!({"query": "lake"}),
                    }],
                },
                ProviderMessage {
                    role: "user".into(),
                    content: vec![ContentBlock::ToolResult {
                        tool_use_id: "toolu_0".into(),
                        content: "{\"memories\":[]}".into(),
                        is_error: None,
                    }],
                },
            ],
            max_tokens: 128,
            tools: Some(vec![json!({
                "name": "search_memories",
                "description": "Search",
                "input_schema": {"type": "object", "properties": {}}
            })]),
        }
    }

    #[test]
    fn request_conversion_keeps_blocks_and_tools() {
        let api = to_message_request(&request());
        let value = serde_json::to_value(&api).unwrap();
        assert_eq!(value["system"], "Be kind.");
        assert_eq!(value["messages"][0]["content"], "find my lake trip");
        assert_eq!(value["messages"][1]["content"][0]["type"], "tool_use");
        assert_eq!(value["messages"][2]["content"][0]["tool_use_id"], "toolu_0");
        assert_eq!(value["tools"][0]["name"], "search_memories");
    }

    #[test]
    fn malformed_tools_are_dropped() {
        let mut req = request();
        req.tools = Some(vec![json!({"name": "broken"})]);
        assert!(to_message_request(&req).tools.is_none());
    }

    #[test]
    fn configured_key_wins() {
        assert_eq!(resolve_api_key(Some("sk-test")).unwrap(), "sk-test");
    }

    #[tokio::test]
    async fn tool_use_blocks_become_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"model": "claude-test", "max_tokens": 128})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_9",
                "type": "message",
                "role": "assistant",
                "content": [
                    {"type": "text", "text": "Saving that."},
                    {"type": "tool_use", "id": "toolu_1", "name": "finalize_memory", "input": {}}
                ],
                "model": "claude-test",
                "stop_reason": "tool_use",
                "usage": {"input_tokens": 40, "output_tokens": 12}
            })))
            .mount(&server)
            .await;

        let resp = provider(&server).complete(request()).await.unwrap();
        assert_eq!(resp.content, "Saving that.");
        assert_eq!(resp.tool_calls.len(), 1);
        assert_eq!(resp.tool_calls[0].name, "finalize_memory");
        assert_eq!(resp.stop_reason.as_deref(), Some("tool_use"));
        assert_eq!(resp.usage.input_tokens, 40);
    }

    #[tokio::test]
    async fn server_errors_surface_as_provider_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        let err = provider(&server).complete(request()).await.unwrap_err();
        assert!(matches!(err, RecallError::Provider { .. }));
    }
}
