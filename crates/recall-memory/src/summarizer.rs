// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Title, summary, and category-description generation.
//!
//! Generation is best-effort: callers fall back to [`TitleSummary::fallback`]
//! when the model fails or answers with something unusable.

use serde::Deserialize;
use tracing::debug;

use recall_core::RecallError;

use crate::llm::UtilityModel;
use crate::text::{json_span, preview};

const TITLE_MAX_CHARS: usize = 60;
const TITLE_MAX_WORDS: usize = 8;

const SUMMARY_SYSTEM: &str = "You write titles and one-sentence summaries for entries in a \
personal memory journal. Answer with a JSON object and nothing else.";

const DESCRIPTION_SYSTEM: &str = "You describe categories in a personal memory journal. \
Answer with one plain sentence.";

/// A generated or derived title/summary pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TitleSummary {
    pub title: String,
    pub summary: String,
}

impl TitleSummary {
    /// Derive a title and summary from the content itself.
    ///
    /// The title is the first line's leading words; the summary is the
    /// content cut to `summary_chars`.
    pub fn fallback(content: &str, summary_chars: usize) -> Self {
        let first_line = content.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        let words: Vec<&str> = first_line.split_whitespace().take(TITLE_MAX_WORDS).collect();
        let mut title = preview(&words.join(" "), TITLE_MAX_CHARS);
        title = title
            .trim_end_matches(['.', ',', ';', ':', '!', '?'])
            .to_string();
        if title.is_empty() {
            title = "Untitled memory".to_string();
        }
        Self {
            title,
            summary: preview(content, summary_chars),
        }
    }
}

/// Parse a `{"title": ..., "summary": ...}` reply. Both fields must be non-empty.
pub fn parse_title_summary(response: &str) -> Option<TitleSummary> {
    let json = json_span(response, '{', '}')?;
    let parsed: TitleSummary = serde_json::from_str(json).ok()?;
    let title = parsed.title.trim();
    let summary = parsed.summary.trim();
    if title.is_empty() || summary.is_empty() {
        return None;
    }
    Some(TitleSummary {
        title: preview(title, TITLE_MAX_CHARS * 2),
        summary: summary.to_string(),
    })
}

pub struct Summarizer {
    llm: UtilityModel,
}

impl Summarizer {
    pub fn new(llm: UtilityModel) -> Self {
        Self { llm }
    }

    /// Ask the model for a title and a one-sentence summary of `content`.
    pub async fn title_and_summary(&self, content: &str) -> Result<TitleSummary, RecallError> {
        let prompt = format!(
            "Write a short title (at most 8 words) and a one-sentence summary for this \
             memory.\n\nMemory:\n{content}\n\n\
             Reply as {{\"title\": \"...\", \"summary\": \"...\"}}."
        );
        let reply = self.llm.ask(SUMMARY_SYSTEM, prompt).await?;
        parse_title_summary(&reply).ok_or_else(|| {
            debug!(reply, "unusable title/summary reply");
            RecallError::provider("model returned no usable title/summary")
        })
    }

    /// One-sentence description of a category from recent memory summaries.
    pub async fn describe_category(
        &self,
        name: &str,
        summaries: &[String],
    ) -> Result<String, RecallError> {
        if summaries.is_empty() {
            return Err(RecallError::Validation(format!(
                "category {name} has no summaries to describe"
            )));
        }
        let listed = summaries
            .iter()
            .map(|s| format!("- {s}"))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Describe in one sentence what the category \"{name}\" holds, based on these \
             recent entries:\n{listed}"
        );
        let reply = self.llm.ask(DESCRIPTION_SYSTEM, prompt).await?;
        let reply = reply.trim().trim_matches('"').trim();
        if reply.is_empty() {
            return Err(RecallError::provider("model returned an empty description"));
        }
        Ok(reply.to_string())
    }
}
