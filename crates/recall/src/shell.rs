// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `recall shell` command implementation.
//!
//! Interactive REPL over the full message path. Each line is routed as an
//! inbound message from the `cli` channel; suggestions are listed under the
//! reply and can be pressed by typing their number.

use std::sync::Arc;

use colored::Colorize;
use recall_agent::MessageRouter;
use recall_anthropic::AnthropicProvider;
use recall_config::model::RecallConfig;
use recall_core::{InboundMessage, OutboundReply, QuickReply, RecallError, StorageAdapter};
use recall_openai::OpenAiEmbedder;
use recall_storage::SqliteStorage;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};

use crate::adapters::AdapterSet;

const SHELL_CHANNEL: &str = "cli";

/// Open and migrate the configured database.
pub async fn open_storage(config: &RecallConfig) -> Result<Arc<SqliteStorage>, RecallError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    Ok(Arc::new(storage))
}

/// Wire the production adapters into a router. Every adapter is registered
/// in the returned set so the caller can shut them down.
pub async fn build_router(
    config: &RecallConfig,
    storage: Arc<SqliteStorage>,
) -> Result<(MessageRouter, AdapterSet), RecallError> {
    let provider = Arc::new(AnthropicProvider::new(&config.anthropic).inspect_err(|_| {
        eprintln!(
            "error: Anthropic API key required. Set anthropic.api_key in config or the ANTHROPIC_API_KEY env var"
        );
    })?);
    let embedder = Arc::new(OpenAiEmbedder::new(&config.embedding)?);

    let mut adapters = AdapterSet::new();
    adapters.register(storage.clone());
    adapters.register(provider.clone());
    adapters.register(embedder.clone());

    let storage: Arc<dyn StorageAdapter> = storage;
    let router = MessageRouter::build(config, storage, provider, embedder).await;
    Ok((router, adapters))
}

/// What a line typed at the prompt means.
#[derive(Debug, PartialEq, Eq)]
enum ShellInput {
    Quit,
    Help,
    Skip,
    Text(String),
    Press(String),
}

fn interpret(line: &str, suggestions: &[QuickReply]) -> ShellInput {
    let trimmed = line.trim();
    match trimmed {
        "" => ShellInput::Skip,
        "/quit" | "/exit" => ShellInput::Quit,
        "/help" => ShellInput::Help,
        _ => match trimmed.parse::<usize>() {
            Ok(n) if (1..=suggestions.len()).contains(&n) => {
                ShellInput::Press(suggestions[n - 1].payload.clone())
            }
            _ => ShellInput::Text(trimmed.to_string()),
        },
    }
}

fn print_reply(reply: &OutboundReply) {
    println!("{}", reply.text);
    if let Some(id) = &reply.created_memory_id {
        println!("{}", format!("(saved {id})").dimmed());
    }
    if !reply.cited_memory_ids.is_empty() {
        println!(
            "{}",
            format!("(cited {})", reply.cited_memory_ids.join(", ")).dimmed()
        );
    }
    for (i, suggestion) in reply.suggestions.iter().enumerate() {
        println!("  {} {}", format!("[{}]", i + 1).cyan(), suggestion.label);
    }
    println!();
}

/// Runs the `recall shell` interactive REPL.
pub async fn run_shell(config: RecallConfig, owner: &str) -> Result<(), RecallError> {
    let storage = open_storage(&config).await?;
    let (router, adapters) = build_router(&config, storage).await?;
    info!(owner, "shell started");

    let mut rl = DefaultEditor::new()
        .map_err(|e| RecallError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", format!("{} shell", config.agent.name).bold().green());
    println!(
        "Type {} to exit, {} for help.\n",
        "/quit".yellow(),
        "/help".yellow()
    );

    let prompt = format!("{}> ", config.agent.name.green());
    let mut suggestions: Vec<QuickReply> = Vec::new();
    loop {
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        };

        let mut inbound = InboundMessage {
            owner_id: Some(owner.to_string()),
            channel: SHELL_CHANNEL.to_string(),
            sender_id: owner.to_string(),
            ..Default::default()
        };
        match interpret(&line, &suggestions) {
            ShellInput::Quit => break,
            ShellInput::Skip => continue,
            ShellInput::Help => {
                println!("Tell me about a moment to start a memory, or ask about past ones.");
                println!("Type a suggestion's number to press it.\n");
                continue;
            }
            ShellInput::Press(payload) => inbound.button = Some(payload),
            ShellInput::Text(text) => inbound.text = text,
        }
        let _ = rl.add_history_entry(line.trim());

        let reply = router.route(inbound).await;
        print_reply(&reply);
        suggestions = reply.suggestions;
    }

    router.services().wait_idle().await;
    if let Err(e) = adapters.shutdown().await {
        warn!(error = %e, "shutdown incomplete");
    }
    println!("{}", "goodbye".dimmed());
    Ok(())
}
