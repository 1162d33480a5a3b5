// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Label naming through the reasoning model.
//!
//! When no existing bucket is close enough, the resolver asks a
//! [`LabelOracle`] for names. The production oracle prompts the utility
//! model for a JSON array of strings and tolerates prose or code fences
//! around it.

use async_trait::async_trait;
use recall_core::RecallError;
use strum::Display;
use tracing::{debug, warn};

use crate::llm::UtilityModel;
use crate::text::json_span;

/// Which kind of labeled bucket is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum BucketKind {
    Category,
    Tag,
}

/// Proposes bucket names for a piece of text.
#[async_trait]
pub trait LabelOracle: Send + Sync {
    /// Up to `max` names for `text`, preferring entries of `existing`
    /// when they fit.
    async fn propose(
        &self,
        kind: BucketKind,
        text: &str,
        existing: &[String],
        max: usize,
    ) -> Result<Vec<String>, RecallError>;
}

const ORACLE_SYSTEM: &str = "You organize a personal memory journal. \
Answer with a JSON array of strings and nothing else.";

/// [`LabelOracle`] backed by the utility reasoning model.
pub struct ProviderOracle {
    llm: UtilityModel,
}

impl ProviderOracle {
    pub fn new(llm: UtilityModel) -> Self {
        Self { llm }
    }
}

fn build_prompt(kind: BucketKind, text: &str, existing: &[String], max: usize) -> String {
    let existing = if existing.is_empty() {
        "(none yet)".to_string()
    } else {
        existing.join(", ")
    };
    match kind {
        BucketKind::Category => format!(
            "Pick one category (1-3 words) for the memory below. Reuse an existing \
             category when one fits; otherwise invent a broad new one.\n\n\
             Existing categories: {existing}\n\nMemory:\n{text}\n\n\
             Reply with a JSON array holding exactly one name."
        ),
        BucketKind::Tag => format!(
            "Suggest up to {max} short tags (1-2 words each) for the memory below. \
             Prefer existing tags when they fit.\n\n\
             Existing tags: {existing}\n\nMemory:\n{text}\n\n\
             Reply with a JSON array of tag names."
        ),
    }
}

/// Parse a model reply into label names.
///
/// Returns an empty list for anything that is not a JSON array of strings.
pub fn parse_label_response(response: &str) -> Vec<String> {
    let Some(json) = json_span(response, '[', ']') else {
        debug!(response, "label response carried no JSON array");
        return Vec::new();
    };
    match serde_json::from_str::<Vec<String>>(json) {
        Ok(labels) => labels
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect(),
        Err(e) => {
            warn!("failed to parse label response: {e}");
            Vec::new()
        }
    }
}

#[async_trait]
impl LabelOracle for ProviderOracle {
    async fn propose(
        &self,
        kind: BucketKind,
        text: &str,
        existing: &[String],
        max: usize,
    ) -> Result<Vec<String>, RecallError> {
        if max == 0 {
            return Ok(Vec::new());
        }
        let reply = self
            .llm
            .ask(ORACLE_SYSTEM, build_prompt(kind, text, existing, max))
            .await?;
        let mut labels = parse_label_response(&reply);
        labels.truncate(max);
        debug!(%kind, count = labels.len(), "oracle proposed labels");
        Ok(labels)
    }
}
