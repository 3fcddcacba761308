// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # actionflow CLI
//!
//! Runs AI-proposed file actions through the validation and execution
//! pipeline against a workspace.
//!
//! ## Commands
//!
//! - `actionflow apply <artifact.json> [--workspace ID] [--concurrent]` - Execute an artifact
//! - `actionflow validate <action.json>` - Static checks for one action
//! - `actionflow estimate <artifact.json>` - Advisory execution time
//! - `actionflow config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use actionflow_cli::commands::{self, ConfigCommand};
use actionflow_core::domain::config::{ActionflowConfig, LogFormat, LoggingConfig};

/// actionflow - validate and execute AI file actions
#[derive(Parser)]
#[command(name = "actionflow")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = "ACTIONFLOW_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true, env = "ACTIONFLOW_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute an artifact against a workspace
    #[command(name = "apply")]
    Apply {
        /// Artifact JSON file (`{"actions": [...]}` or an array of actions)
        #[arg(value_name = "ARTIFACT")]
        artifact: PathBuf,

        /// Workspace to apply the actions to
        #[arg(short, long, default_value = "default")]
        workspace: String,

        /// Run actions on different files in parallel instead of in order
        #[arg(long)]
        concurrent: bool,
    },

    /// Validate a single action without executing it
    #[command(name = "validate")]
    Validate {
        /// Action JSON file
        #[arg(value_name = "ACTION")]
        action: PathBuf,

        /// Print the validation result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Estimate how long an artifact will take
    #[command(name = "estimate")]
    Estimate {
        #[arg(value_name = "ARTIFACT")]
        artifact: PathBuf,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = ActionflowConfig::load_or_default(cli.config.clone())
        .map(|config| config.logging)
        .unwrap_or_default();
    init_logging(cli.log_level.as_deref().unwrap_or(&logging.level), &logging)?;

    match cli.command {
        Some(Commands::Apply {
            artifact,
            workspace,
            concurrent,
        }) => commands::apply::execute(artifact, workspace, concurrent, cli.config).await,
        Some(Commands::Validate { action, json }) => commands::validate::execute(action, json, cli.config).await,
        Some(Commands::Estimate { artifact }) => commands::estimate::execute(artifact, cli.config).await,
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }

    Ok(())
}
