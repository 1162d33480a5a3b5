// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as threshold ranges and threshold ordering.

use crate::diagnostic::ConfigError;
use crate::model::RecallConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &RecallConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(invalid("storage.database_path must not be empty".to_string()));
    }

    if config.agent.max_tool_iterations == 0 {
        errors.push(invalid(
            "agent.max_tool_iterations must be at least 1".to_string(),
        ));
    }

    if config.session.ttl_secs == 0 {
        errors.push(invalid("session.ttl_secs must be greater than 0".to_string()));
    }

    if config.session.save_timeout_secs == 0 {
        errors.push(invalid(
            "session.save_timeout_secs must be greater than 0".to_string(),
        ));
    }

    if config.anthropic.timeout_secs == 0 {
        errors.push(invalid("anthropic.timeout_secs must be greater than 0".to_string()));
    }

    if config.embedding.timeout_secs == 0 {
        errors.push(invalid("embedding.timeout_secs must be greater than 0".to_string()));
    }

    let c = &config.classification;
    let r = &config.retrieval;
    let g = &config.graph;
    for (key, value) in [
        ("classification.category_reuse_threshold", c.category_reuse_threshold),
        (
            "classification.category_near_duplicate_threshold",
            c.category_near_duplicate_threshold,
        ),
        ("classification.tag_reuse_threshold", c.tag_reuse_threshold),
        (
            "classification.tag_near_duplicate_threshold",
            c.tag_near_duplicate_threshold,
        ),
        ("retrieval.match_threshold", r.match_threshold),
        ("retrieval.network_similarity_floor", r.network_similarity_floor),
        ("graph.similarity_floor", g.similarity_floor),
    ] {
        check_unit_range(&mut errors, key, value);
    }

    if c.category_near_duplicate_threshold < c.category_reuse_threshold {
        errors.push(invalid(format!(
            "classification.category_near_duplicate_threshold ({}) must not be below category_reuse_threshold ({})",
            c.category_near_duplicate_threshold, c.category_reuse_threshold
        )));
    }

    if c.tag_near_duplicate_threshold < c.tag_reuse_threshold {
        errors.push(invalid(format!(
            "classification.tag_near_duplicate_threshold ({}) must not be below tag_reuse_threshold ({})",
            c.tag_near_duplicate_threshold, c.tag_reuse_threshold
        )));
    }

    if c.max_tags_per_memory == 0 {
        errors.push(invalid(
            "classification.max_tags_per_memory must be at least 1".to_string(),
        ));
    }

    if c.default_category.trim().is_empty() {
        errors.push(invalid(
            "classification.default_category must not be empty".to_string(),
        ));
    }

    if r.hybrid_keyword_weight < 0.0 || r.hybrid_semantic_weight < 0.0 {
        errors.push(invalid(
            "retrieval.hybrid_keyword_weight and hybrid_semantic_weight must be non-negative"
                .to_string(),
        ));
    } else if r.hybrid_keyword_weight + r.hybrid_semantic_weight == 0.0 {
        errors.push(invalid(
            "retrieval.hybrid_keyword_weight and hybrid_semantic_weight must not both be 0"
                .to_string(),
        ));
    }

    if r.rrf_k <= 0.0 {
        errors.push(invalid(format!(
            "retrieval.rrf_k must be greater than 0, got {}",
            r.rrf_k
        )));
    }

    if r.hybrid_min_score < 0.0 {
        errors.push(invalid(format!(
            "retrieval.hybrid_min_score must be non-negative, got {}",
            r.hybrid_min_score
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Validation { message }
}

fn check_unit_range(errors: &mut Vec<ConfigError>, key: &str, value: f32) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(invalid(format!(
            "{key} must be between 0.0 and 1.0, got {value}"
        )));
    }
}
