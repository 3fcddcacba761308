// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `actionflow estimate`: advisory execution time for an artifact.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use actionflow_core::application::orchestrator::FileOperationOrchestrator;
use actionflow_core::domain::config::ActionflowConfig;

use crate::session::read_artifact;

pub async fn execute(artifact_path: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let artifact = read_artifact(&artifact_path)?;
    let config = ActionflowConfig::load_or_default(config_path).context("Failed to load configuration")?;
    let orchestrator = FileOperationOrchestrator::new(config.orchestrator);

    println!("{}", "Estimated complexity:".bold());
    for action in &artifact.actions {
        println!(
            "  {:>5.2}  {} {}",
            orchestrator.estimate_complexity(action),
            action.action_type,
            action.target_path().or(action.command.as_deref()).unwrap_or("-")
        );
    }

    let estimate = orchestrator.estimate_execution_time(&artifact.actions);
    println!();
    println!("Estimated time: {}", format!("{:.1}s", estimate.as_secs_f64()).cyan());
    Ok(())
}
