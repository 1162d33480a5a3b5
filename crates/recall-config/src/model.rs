// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Recall memory assistant.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Recall configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecallConfig {
    /// Assistant identity and tool-loop settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Anthropic API settings for the reasoning model.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Embedding endpoint and cache settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Conversation session lifetime settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Category and tag classification thresholds.
    #[serde(default)]
    pub classification: ClassificationConfig,

    /// Search tier thresholds and fusion weights.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Relationship graph discovery settings.
    #[serde(default)]
    pub graph: GraphConfig,
}

/// Assistant identity and tool-loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Inline system prompt string. Overridden by `system_prompt_file` if both set.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Path to a markdown file containing the system prompt.
    #[serde(default)]
    pub system_prompt_file: Option<String>,

    /// Hard upper bound on reasoning rounds per inbound message.
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: None,
            system_prompt_file: None,
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

fn default_agent_name() -> String {
    "recall".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_tool_iterations() -> usize {
    8
}

/// Anthropic API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// Anthropic API key. `None` requires the `ANTHROPIC_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model driving the tool-calling conversation.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Cheaper model for titles, summaries, naming, and descriptions.
    #[serde(default = "default_utility_model")]
    pub utility_model: String,

    /// Maximum tokens to generate per response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Anthropic API version string.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: default_model(),
            utility_model: default_utility_model(),
            max_tokens: default_max_tokens(),
            api_version: default_api_version(),
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_utility_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    60
}

/// Embedding endpoint (OpenAI-compatible) and cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Base URL of an OpenAI-compatible API, without the `/embeddings` suffix.
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    /// API key. `None` requires the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Embedding model name.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Requested output dimensions, for models that support truncation.
    #[serde(default)]
    pub dimensions: Option<usize>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of cached vectors.
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Cache entry lifetime in seconds. 0 disables caching.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            api_key: None,
            model: default_embedding_model(),
            dimensions: None,
            timeout_secs: default_embedding_timeout_secs(),
            cache_max_entries: default_cache_max_entries(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_timeout_secs() -> u64 {
    15
}

fn default_cache_max_entries() -> usize {
    1024
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("recall").join("recall.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("recall.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Conversation session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Idle lifetime of a session in seconds. Each turn pushes expiry forward.
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,

    /// Number of history entries (user + assistant) kept per session.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Seconds after which a draft's saving marker is treated as abandoned
    /// and the draft can be saved, edited, or cancelled again.
    #[serde(default = "default_save_timeout_secs")]
    pub save_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
            history_limit: default_history_limit(),
            save_timeout_secs: default_save_timeout_secs(),
        }
    }
}

fn default_session_ttl_secs() -> u64 {
    30 * 60
}

fn default_history_limit() -> usize {
    20
}

fn default_save_timeout_secs() -> u64 {
    5 * 60
}

/// Classification engine configuration.
///
/// Thresholds are cosine similarities in `[0, 1]`. Each bucket kind has a
/// reuse threshold (input vs. existing bucket) and a stricter near-duplicate
/// threshold (suggested name vs. existing bucket).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClassificationConfig {
    #[serde(default = "default_category_reuse_threshold")]
    pub category_reuse_threshold: f32,

    #[serde(default = "default_category_near_duplicate_threshold")]
    pub category_near_duplicate_threshold: f32,

    #[serde(default = "default_tag_reuse_threshold")]
    pub tag_reuse_threshold: f32,

    #[serde(default = "default_tag_near_duplicate_threshold")]
    pub tag_near_duplicate_threshold: f32,

    /// Upper bound on tags attached to one memory.
    #[serde(default = "default_max_tags_per_memory")]
    pub max_tags_per_memory: usize,

    /// Bucket used when classification cannot reach its collaborators.
    #[serde(default = "default_category")]
    pub default_category: String,

    /// Inputs with at most this many words and no sentence punctuation are
    /// treated as a category name and looked up exactly first.
    #[serde(default = "default_short_label_max_words")]
    pub short_label_max_words: usize,

    /// Number of recent memory summaries fed to description regeneration.
    #[serde(default = "default_description_sample_size")]
    pub description_sample_size: usize,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            category_reuse_threshold: default_category_reuse_threshold(),
            category_near_duplicate_threshold: default_category_near_duplicate_threshold(),
            tag_reuse_threshold: default_tag_reuse_threshold(),
            tag_near_duplicate_threshold: default_tag_near_duplicate_threshold(),
            max_tags_per_memory: default_max_tags_per_memory(),
            default_category: default_category(),
            short_label_max_words: default_short_label_max_words(),
            description_sample_size: default_description_sample_size(),
        }
    }
}

fn default_category_reuse_threshold() -> f32 {
    0.55
}

fn default_category_near_duplicate_threshold() -> f32 {
    0.70
}

fn default_tag_reuse_threshold() -> f32 {
    0.60
}

fn default_tag_near_duplicate_threshold() -> f32 {
    0.80
}

fn default_max_tags_per_memory() -> usize {
    5
}

fn default_category() -> String {
    "General".to_string()
}

fn default_short_label_max_words() -> usize {
    4
}

fn default_description_sample_size() -> usize {
    10
}

/// Retrieval engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Minimum similarity for the semantic-only tier.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f32,

    /// Minimum similarity for direct matches and edges in network search.
    #[serde(default = "default_network_similarity_floor")]
    pub network_similarity_floor: f32,

    /// Maximum number of graph neighbors added by network search.
    #[serde(default = "default_network_max_neighbors")]
    pub network_max_neighbors: usize,

    /// RRF weight of the keyword ranking.
    #[serde(default = "default_hybrid_keyword_weight")]
    pub hybrid_keyword_weight: f32,

    /// RRF weight of the semantic ranking.
    #[serde(default = "default_hybrid_semantic_weight")]
    pub hybrid_semantic_weight: f32,

    /// RRF constant k.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,

    /// Fused scores below this are discarded.
    #[serde(default = "default_hybrid_min_score")]
    pub hybrid_min_score: f32,

    /// Candidates pulled from each ranking before fusion.
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: usize,

    /// Characters of content included in search results.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            network_similarity_floor: default_network_similarity_floor(),
            network_max_neighbors: default_network_max_neighbors(),
            hybrid_keyword_weight: default_hybrid_keyword_weight(),
            hybrid_semantic_weight: default_hybrid_semantic_weight(),
            rrf_k: default_rrf_k(),
            hybrid_min_score: default_hybrid_min_score(),
            candidate_pool: default_candidate_pool(),
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_match_threshold() -> f32 {
    0.30
}

fn default_network_similarity_floor() -> f32 {
    0.45
}

fn default_network_max_neighbors() -> usize {
    10
}

fn default_hybrid_keyword_weight() -> f32 {
    0.4
}

fn default_hybrid_semantic_weight() -> f32 {
    0.6
}

fn default_rrf_k() -> f32 {
    60.0
}

fn default_hybrid_min_score() -> f32 {
    0.006
}

fn default_candidate_pool() -> usize {
    50
}

fn default_preview_chars() -> usize {
    200
}

/// Relationship graph configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GraphConfig {
    /// Edges created per finalized memory at most.
    #[serde(default = "default_graph_max_neighbors")]
    pub max_neighbors: usize,

    /// Minimum similarity for an edge.
    #[serde(default = "default_graph_similarity_floor")]
    pub similarity_floor: f32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_neighbors: default_graph_max_neighbors(),
            similarity_floor: default_graph_similarity_floor(),
        }
    }
}

fn default_graph_max_neighbors() -> usize {
    5
}

fn default_graph_similarity_floor() -> f32 {
    0.5
}
