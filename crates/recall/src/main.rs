// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recall - a conversational memory-capture assistant.
//!
//! This is the binary entry point.

mod adapters;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use recall_config::model::RecallConfig;
use recall_core::{HealthStatus, RecallError};

use crate::adapters::AdapterSet;

/// Recall - a conversational memory-capture assistant.
#[derive(Parser, Debug)]
#[command(name = "recall", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Chat with the assistant in the terminal.
    Shell {
        /// Owner the shell acts for.
        #[arg(long, default_value = "local")]
        owner: String,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Issue a one-time code that links a chat identity to an owner.
    LinkCode {
        /// Owner the linked identity will act for.
        owner: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the resolved configuration as TOML.
    Show,
    /// Validate configuration, open the database, and report its health.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => recall_config::load_and_validate_path(path),
        None => recall_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            recall_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.agent.log_level);

    let result = match cli.command {
        Some(Commands::Shell { owner }) => shell::run_shell(config, &owner).await,
        Some(Commands::Config { action }) => run_config(&config, action).await,
        Some(Commands::LinkCode { owner }) => run_link_code(config, &owner).await,
        None => {
            println!("recall: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run_config(config: &RecallConfig, action: ConfigAction) -> Result<(), RecallError> {
    match action {
        ConfigAction::Show => {
            let rendered = recall_config::render_toml(&redacted(config))
                .map_err(|e| RecallError::Config(e.to_string()))?;
            print!("{rendered}");
            Ok(())
        }
        ConfigAction::Check => {
            println!("recall: configuration is valid");
            let mut adapters = AdapterSet::new();
            adapters.register(shell::open_storage(config).await?);
            let health = adapters.health_check().await;
            adapters.shutdown().await?;
            report_health(&adapters, &health)
        }
    }
}

/// Print one line per adapter and fail unless everything is healthy.
fn report_health(adapters: &AdapterSet, health: &HealthStatus) -> Result<(), RecallError> {
    for line in adapters.describe() {
        println!("  {line}");
    }
    match health {
        HealthStatus::Healthy => {
            println!("recall: storage is healthy");
            Ok(())
        }
        HealthStatus::Degraded(reason) => {
            println!("recall: storage is degraded: {reason}");
            Ok(())
        }
        HealthStatus::Unhealthy(reason) => {
            Err(RecallError::Internal(format!("storage is unhealthy: {reason}")))
        }
    }
}

/// Copy of the configuration safe to print.
fn redacted(config: &RecallConfig) -> RecallConfig {
    let mut shown = config.clone();
    if shown.anthropic.api_key.is_some() {
        shown.anthropic.api_key = Some("***".into());
    }
    if shown.embedding.api_key.is_some() {
        shown.embedding.api_key = Some("***".into());
    }
    shown
}

async fn run_link_code(config: RecallConfig, owner: &str) -> Result<(), RecallError> {
    let storage = shell::open_storage(&config).await?;
    let (router, adapters) = shell::build_router(&config, storage).await?;
    let code = router.issue_link_code(owner).await;
    adapters.shutdown().await?;
    let code = code?;
    println!("{code}");
    eprintln!(
        "Send \"/link {code}\" from the chat you want to link. The code expires in {} minutes.",
        recall_agent::router::LINK_CODE_TTL_MINUTES
    );
    Ok(())
}

/// Initializes the tracing subscriber. `RUST_LOG` wins over `agent.log_level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("recall={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::parse_from(["recall", "shell", "--owner", "me"]);
        assert!(matches!(cli.command, Some(Commands::Shell { owner }) if owner == "me"));

        let cli = Cli::parse_from(["recall", "--config", "/tmp/r.toml", "config", "check"]);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/r.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Check
            })
        ));

        let cli = Cli::parse_from(["recall", "link-code", "owner-9"]);
        assert!(matches!(cli.command, Some(Commands::LinkCode { owner }) if owner == "owner-9"));
    }

    #[test]
    fn shell_owner_defaults_to_local() {
        let cli = Cli::parse_from(["recall", "shell"]);
        assert!(matches!(cli.command, Some(Commands::Shell { owner }) if owner == "local"));
    }

    #[test]
    fn only_unhealthy_storage_fails_the_check() {
        let adapters = AdapterSet::new();
        assert!(report_health(&adapters, &HealthStatus::Healthy).is_ok());
        assert!(report_health(&adapters, &HealthStatus::Degraded("slow".into())).is_ok());
        let err = report_health(&adapters, &HealthStatus::Unhealthy("not initialized".into()))
            .unwrap_err();
        assert!(err.to_string().contains("not initialized"));
    }

    #[tokio::test]
    async fn check_opens_and_releases_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RecallConfig::default();
        config.storage.database_path = dir.path().join("recall.db").to_string_lossy().into_owned();
        run_config(&config, ConfigAction::Check).await.unwrap();
        assert!(dir.path().join("recall.db").exists());
    }

    #[test]
    fn show_hides_secrets() {
        let mut config = RecallConfig::default();
        config.anthropic.api_key = Some("sk-ant-secret".into());
        let shown = redacted(&config);
        assert_eq!(shown.anthropic.api_key.as_deref(), Some("***"));
        assert!(shown.embedding.api_key.is_none());
        let rendered = recall_config::render_toml(&shown).unwrap();
        assert!(!rendered.contains("sk-ant-secret"));
    }
}
