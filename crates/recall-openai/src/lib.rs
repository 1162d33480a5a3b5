// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding provider for any OpenAI-compatible `/embeddings` endpoint
//! (OpenAI, Ollama, vLLM, LM Studio).

use std::time::Duration;

use async_trait::async_trait;
use recall_config::model::EmbeddingConfig;
use recall_core::{
    AdapterType, EmbeddingAdapter, EmbeddingInput, EmbeddingOutput, HealthStatus, PluginAdapter,
    RecallError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

pub struct OpenAiEmbedder {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
    dimensions: Option<usize>,
}

impl OpenAiEmbedder {
    /// Build an embedder from configuration.
    ///
    /// The key comes from `embedding.api_key`, else `OPENAI_API_KEY`. Local
    /// servers that need no key work with neither set.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, RecallError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RecallError::Embedding {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        info!(model = %config.model, base_url = %config.base_url, "embedding provider initialized");
        Ok(Self {
            client,
            url: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

#[async_trait]
impl PluginAdapter for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai-embeddings"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, RecallError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RecallError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for OpenAiEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, RecallError> {
        if input.texts.is_empty() {
            return Ok(EmbeddingOutput {
                embeddings: Vec::new(),
                dimensions: self.dimensions.unwrap_or(0),
            });
        }

        let body = EmbedRequest {
            model: &self.model,
            input: &input.texts,
            dimensions: self.dimensions,
        };
        let mut req = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.map_err(|e| RecallError::Embedding {
            message: format!("HTTP request failed: {e}"),
            source: Some(Box::new(e)),
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorResponse>(&text) {
                Ok(api) => format!("embedding API returned {status}: {}", api.error.message),
                Err(_) => format!("embedding API returned {status}: {text}"),
            };
            return Err(RecallError::embedding(message));
        }

        let mut parsed: EmbedResponse = resp.json().await.map_err(|e| RecallError::Embedding {
            message: format!("failed to parse embedding response: {e}"),
            source: Some(Box::new(e)),
        })?;
        if parsed.data.len() != input.texts.len() {
            return Err(RecallError::embedding(format!(
                "expected {} embeddings, got {}",
                input.texts.len(),
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|d| d.index);
        let embeddings: Vec<Vec<f32>> = parsed.data.into_iter().map(|d| d.embedding).collect();
        let dimensions = embeddings.first().map(Vec::len).unwrap_or(0);
        if embeddings.iter().any(|e| e.len() != dimensions || e.is_empty()) {
            return Err(RecallError::embedding("embedding vectors have inconsistent lengths"));
        }
        debug!(count = embeddings.len(), dimensions, "embedded texts");

        Ok(EmbeddingOutput {
            embeddings,
            dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedder(server: &MockServer, key: Option<&str>) -> OpenAiEmbedder {
        OpenAiEmbedder::new(&EmbeddingConfig {
            base_url: format!("{}/v1/", server.uri()),
            api_key: key.map(str::to_string),
            model: "text-embedding-3-small".into(),
            dimensions: Some(3),
            ..Default::default()
        })
        .unwrap()
    }

    fn input(texts: &[&str]) -> EmbeddingInput {
        EmbeddingInput {
            texts: texts.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn embeds_in_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "text-embedding-3-small",
                "input": ["first", "second"],
                "dimensions": 3
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [
                    {"object": "embedding", "index": 1, "embedding": [0.0, 1.0, 0.0]},
                    {"object": "embedding", "index": 0, "embedding": [1.0, 0.0, 0.0]}
                ],
                "model": "text-embedding-3-small"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let out = embedder(&server, Some("sk-test"))
            .embed(input(&["first", "second"]))
            .await
            .unwrap();
        assert_eq!(out.dimensions, 3);
        assert_eq!(out.embeddings[0], vec![1.0, 0.0, 0.0]);
        assert_eq!(out.embeddings[1], vec![0.0, 1.0, 0.0]);
    }

    #[tokio::test]
    async fn empty_input_skips_the_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        let out = embedder(&server, None).embed(input(&[])).await.unwrap();
        assert!(out.embeddings.is_empty());
    }

    #[tokio::test]
    async fn api_errors_are_embedding_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;
        let err = embedder(&server, Some("bad")).embed(input(&["x"])).await.unwrap_err();
        assert!(matches!(err, RecallError::Embedding { .. }));
        assert!(err.to_string().contains("Incorrect API key"), "got: {err}");
    }

    #[tokio::test]
    async fn count_mismatch_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"index": 0, "embedding": [1.0]}]
            })))
            .mount(&server)
            .await;
        let err = embedder(&server, None)
            .embed(input(&["a", "b"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected 2 embeddings"));
    }
}
