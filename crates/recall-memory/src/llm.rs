// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-shot calls to the reasoning collaborator for utility work
//! (naming, summarizing). These requests carry no tools.

use std::sync::Arc;
use std::time::Duration;

use recall_config::model::AnthropicConfig;
use recall_core::{ProviderAdapter, ProviderMessage, ProviderRequest, RecallError, with_timeout};

/// The utility model plus the deadline every call runs under.
#[derive(Clone)]
pub struct UtilityModel {
    provider: Arc<dyn ProviderAdapter>,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl UtilityModel {
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens,
            timeout,
        }
    }

    pub fn from_config(provider: Arc<dyn ProviderAdapter>, config: &AnthropicConfig) -> Self {
        Self::new(
            provider,
            config.utility_model.clone(),
            512,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Send one user prompt and return the trimmed text reply.
    pub async fn ask(&self, system: &str, prompt: String) -> Result<String, RecallError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            system_prompt: Some(system.to_string()),
            messages: vec![ProviderMessage::user_text(prompt)],
            max_tokens: self.max_tokens,
            tools: None,
        };
        let response = with_timeout(self.timeout, self.provider.complete(request)).await?;
        Ok(response.content.trim().to_string())
    }
}
