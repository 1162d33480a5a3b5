// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock reasoning provider for deterministic testing.
//!
//! `MockProvider` serves two kinds of traffic differently:
//!
//! - requests that carry tool definitions (the conversational loop) pop
//!   scripted responses from a FIFO queue, falling back to plain
//!   "mock response" text when the queue is empty;
//! - requests without tools (title/summary generation, label proposals,
//!   category descriptions) go to a utility responder closure. The default
//!   responder answers with an empty string, which sends callers down their
//!   fallback paths.
//!
//! Every request is recorded for later assertions.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use recall_core::{
    AdapterType, ContentBlock, HealthStatus, PluginAdapter, ProviderAdapter, ProviderRequest,
    ProviderResponse, RecallError, TokenUsage, ToolUseData,
};

type UtilityResponder = dyn Fn(&ProviderRequest) -> Result<String, RecallError> + Send + Sync;

/// A mock provider with scripted tool-loop responses and a utility responder.
pub struct MockProvider {
    responses: Mutex<VecDeque<ProviderResponse>>,
    utility: Mutex<Arc<UtilityResponder>>,
    requests: Mutex<Vec<ProviderRequest>>,
    failing: AtomicBool,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            utility: Mutex::new(Arc::new(|_| Ok(String::new()))),
            requests: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// A mock pre-loaded with scripted responses for the tool loop.
    pub fn with_responses(responses: Vec<ProviderResponse>) -> Self {
        let provider = Self::new();
        for response in responses {
            provider.push_response(response);
        }
        provider
    }

    /// A final text response with no tool calls.
    pub fn text(text: impl Into<String>) -> ProviderResponse {
        ProviderResponse {
            id: format!("mock-resp-{}", uuid::Uuid::new_v4()),
            content: text.into(),
            tool_calls: Vec::new(),
            model: "mock-model".to_string(),
            stop_reason: Some("end_turn".to_string()),
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 20,
            },
        }
    }

    /// A response requesting a single tool call.
    pub fn tool_call(name: &str, input: serde_json::Value) -> ProviderResponse {
        Self::tool_calls(vec![(name, input)])
    }

    /// A response requesting several tool calls in order.
    pub fn tool_calls(calls: Vec<(&str, serde_json::Value)>) -> ProviderResponse {
        let tool_calls = calls
            .into_iter()
            .map(|(name, input)| ToolUseData {
                id: format!("toolu_{}", uuid::Uuid::new_v4().simple()),
                name: name.to_string(),
                input,
            })
            .collect();
        ProviderResponse {
            tool_calls,
            stop_reason: Some("tool_use".to_string()),
            ..Self::text("")
        }
    }

    pub fn push_response(&self, response: ProviderResponse) {
        lock(&self.responses).push_back(response);
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.push_response(Self::text(text));
    }

    pub fn push_tool_call(&self, name: &str, input: serde_json::Value) {
        self.push_response(Self::tool_call(name, input));
    }

    /// Replace the responder used for requests without tools.
    pub fn set_utility<F>(&self, responder: F)
    where
        F: Fn(&ProviderRequest) -> Result<String, RecallError> + Send + Sync + 'static,
    {
        *lock(&self.utility) = Arc::new(responder);
    }

    /// Make every call fail with a provider error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        lock(&self.requests).clone()
    }

    /// Requests that carried tool definitions.
    pub fn tool_requests(&self) -> Vec<ProviderRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.tools.is_some())
            .collect()
    }

    pub fn pending_responses(&self) -> usize {
        lock(&self.responses).len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Concatenated text of the last user message in a request.
pub fn last_user_text(request: &ProviderRequest) -> String {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| {
            m.content
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, RecallError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RecallError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, RecallError> {
        lock(&self.requests).push(request.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(RecallError::provider("mock provider failure"));
        }

        let mut response = if request.tools.is_some() {
            lock(&self.responses)
                .pop_front()
                .unwrap_or_else(|| Self::text("mock response"))
        } else {
            let responder = Arc::clone(&*lock(&self.utility));
            Self::text(responder(&request)?)
        };
        response.model = request.model;
        Ok(response)
    }
}
