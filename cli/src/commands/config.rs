// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use actionflow_core::domain::config::ActionflowConfig;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate a configuration file holding every default
    Generate {
        /// Output path (default: ./actionflow.yaml)
        #[arg(short, long, default_value = "./actionflow.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, force } => generate(output, force).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ActionflowConfig::load_or_default(config_override.clone()).context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. ACTIONFLOW_CONFIG_PATH: {}",
            std::env::var("ACTIONFLOW_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./actionflow.yaml");
        println!("  4. ~/.actionflow/config.yaml");
        if let Some(found) = config_override.or_else(ActionflowConfig::discover_config) {
            println!("  Using: {}", found.display().to_string().cyan());
        } else {
            println!("  Using: {}", "built-in defaults".cyan());
        }
        println!();
    }

    println!("{}", "Orchestrator:".bold());
    let orchestrator = &config.orchestrator;
    println!("  Max concurrent groups: {}", orchestrator.max_concurrent_operations);
    println!("  Operation timeout: {}ms", orchestrator.operation_timeout_ms);
    println!(
        "  Retries: {} attempt(s), base delay {}ms",
        orchestrator.retry_attempts, orchestrator.retry_delay_ms
    );
    println!("  Never retried: {}", orchestrator.non_retryable_patterns.join(", "));
    println!();

    println!("{}", "Validation:".bold());
    let validation = &config.validation;
    println!("  Max path length: {}", validation.max_path_length);
    println!("  Absolute paths: {}", allowed(validation.allow_absolute_paths));
    println!("  Executable content: {}", allowed(validation.allow_executable_content));
    println!("  Max file size: {} bytes", validation.max_file_size);
    println!("  Extensions: {}", validation.allowed_extensions.len());
    println!();

    println!("{}", "File Service:".bold());
    println!("  Backend: {:?}", config.file_service.backend);
    println!("  Root: {}", config.file_service.root.display());
    if let Some(url) = &config.file_service.base_url {
        println!("  Base URL: {}", url);
    }
    println!();

    println!("{}", "Logging:".bold());
    println!("  Level: {} ({:?})", config.logging.level, config.logging.format);

    Ok(())
}

fn allowed(flag: bool) -> colored::ColoredString {
    if flag {
        "allowed".yellow()
    } else {
        "rejected".green()
    }
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ActionflowConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());
    Ok(())
}

async fn generate(output: PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }

    ActionflowConfig::default()
        .to_yaml_file(&output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generated_config_validates() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("actionflow.yaml");

        generate(output.clone(), false).await.unwrap();
        assert!(generate(output.clone(), false).await.is_err());
        generate(output.clone(), true).await.unwrap();

        validate(Some(output)).await.unwrap();
    }
}
