// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Small text helpers shared by the classification and retrieval engines.

/// At most `max_chars` characters of `text`, cut on a char boundary and
/// suffixed with `...` when anything was dropped.
pub fn preview(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

/// True for inputs that read like a label rather than a sentence: at most
/// `max_words` words and no sentence punctuation.
pub fn is_short_label(text: &str, max_words: usize) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    let words = text.split_whitespace().count();
    words <= max_words && !text.contains(['.', '!', '?', ';', '\n'])
}

/// Strips a Markdown code fence and returns the outermost `open`..`close`
/// span, if any. Models often wrap JSON in prose or fences.
pub(crate) fn json_span(response: &str, open: char, close: char) -> Option<&str> {
    let trimmed = response.trim();
    let start = trimmed.find(open)?;
    let end = trimmed.rfind(close)?;
    (end > start).then(|| &trimmed[start..=end])
}
