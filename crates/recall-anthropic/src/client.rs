// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Anthropic Messages API.
//!
//! Handles authentication headers and retries transient failures
//! (429, 500, 503, 529) with a doubling delay.

use std::time::Duration;

use recall_core::RecallError;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, MessageRequest, MessageResponse};

const API_BASE_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl AnthropicClient {
    pub fn new(api_key: &str, api_version: &str, timeout: Duration) -> Result<Self, RecallError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| RecallError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(api_version).map_err(|e| {
                RecallError::Config(format!("invalid API version header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| RecallError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: API_BASE_URL.to_string(),
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Point the client at another endpoint (a proxy or a test server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_retry(mut self, max_retries: u32, initial_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = initial_delay;
        self
    }

    /// Send one non-streaming request, retrying transient failures.
    pub async fn complete_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, RecallError> {
        let mut delay = self.retry_delay;
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(&self.base_url)
                .json(request)
                .send()
                .await
                .map_err(|e| RecallError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "messages response received");

            if status.is_success() {
                return response
                    .json::<MessageResponse>()
                    .await
                    .map_err(|e| RecallError::Provider {
                        message: format!("failed to parse API response: {e}"),
                        source: Some(Box::new(e)),
                    });
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient(status) && attempt < self.max_retries {
                attempt += 1;
                warn!(status = %status, attempt, "transient API error, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
                continue;
            }
            return Err(RecallError::provider(describe_error(status, &body)));
        }
    }
}

fn describe_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api) => format!(
            "Anthropic API error ({}): {}",
            api.error.type_, api.error.message
        ),
        Err(_) => format!("API returned {status}: {body}"),
    }
}

fn is_transient(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 529)
}
