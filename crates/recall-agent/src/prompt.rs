// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System prompt loading and the per-turn state note.

use recall_config::model::AgentConfig;
use recall_core::{ConversationSession, ConversationState};
use tracing::{info, warn};

/// Base instructions for the reasoning model.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You help the user keep a journal of personal memories through conversation.

When the user shares something worth keeping, call start_memory_capture. Ask at \
most one or two short follow-up questions, adding each answer with \
add_to_memory_draft and is_answer set. When the memory feels complete or the \
user asks, call generate_memory_draft and show the title, category, and tags. \
Only call finalize_memory after the user confirms. If the user changes their \
mind, call cancel_memory_draft.

When the user asks about their past, call search_memories and answer only from \
what it returns. Mention when nothing matched. Use update_memory and \
delete_memory only when the user asks to change or remove a specific memory.

Keep replies short and warm. Never invent memories.";

/// Loads the system prompt: file, then inline string, then the built-in default.
pub async fn load_system_prompt(config: &AgentConfig) -> String {
    if let Some(path) = &config.system_prompt_file {
        match tokio::fs::read_to_string(path).await {
            Ok(content) if !content.trim().is_empty() => {
                info!(path = path.as_str(), "loaded system prompt from file");
                return content.trim().to_string();
            }
            Ok(_) => warn!(path = path.as_str(), "system prompt file is empty, falling back"),
            Err(e) => warn!(
                path = path.as_str(),
                error = %e,
                "failed to read system prompt file, falling back"
            ),
        }
    }

    if let Some(prompt) = &config.system_prompt
        && !prompt.trim().is_empty()
    {
        return prompt.clone();
    }

    format!("You are {}.\n\n{DEFAULT_SYSTEM_PROMPT}", config.name)
}

/// One paragraph telling the model where the session stands.
pub fn state_note(session: &ConversationSession) -> String {
    let draft = &session.draft;
    match session.state {
        ConversationState::Conversation => {
            "Current state: normal conversation. No memory is being captured.".to_string()
        }
        ConversationState::MemoryCapture => {
            "Current state: capture started, waiting for the user to say what to remember."
                .to_string()
        }
        ConversationState::MemoryEnrichment => format!(
            "Current state: capturing a memory with {} part(s) and {} follow-up answer(s). \
             Ask another question or offer a preview.",
            draft.fragments.len(),
            draft.enrichment_count()
        ),
        ConversationState::MemoryDraft => {
            let title = draft.title.as_deref().unwrap_or("(untitled)");
            let category = draft
                .preview
                .as_ref()
                .and_then(|p| p.category.as_deref())
                .unwrap_or("(none)");
            format!(
                "Current state: draft \"{title}\" in category {category} is waiting for the \
                 user to save, edit, or cancel."
            )
        }
    }
}

/// Full system prompt for one turn.
pub fn compose(base: &str, session: &ConversationSession) -> String {
    format!("{base}\n\n{}", state_note(session))
}
