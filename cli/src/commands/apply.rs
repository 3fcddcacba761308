// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `actionflow apply`: run an artifact against a workspace.

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use actionflow_core::domain::operation::{BatchOperationResult, OperationProgress, OperationStatus, ProgressCallback};

use crate::session::{read_artifact, Session};

pub async fn execute(
    artifact_path: PathBuf,
    workspace: String,
    concurrent: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let artifact = read_artifact(&artifact_path)?;
    let session = Session::new(config_path, &workspace)?;
    session.cancel_on_ctrl_c();

    info!(
        artifact = %artifact_path.display(),
        actions = artifact.len(),
        concurrent,
        "Applying artifact"
    );
    println!(
        "{} {} action(s) to workspace {}",
        "Applying".bold(),
        artifact.len(),
        workspace.cyan()
    );

    let printer: ProgressCallback = Arc::new(print_progress);
    let batch = if concurrent {
        session
            .orchestrator
            .execute_concurrent(&artifact.actions, &session.context, Some(&printer))
            .await
    } else {
        session
            .orchestrator
            .execute_artifact(&artifact, &session.context, Some(&printer))
            .await
    };

    print_summary(&batch);
    if batch.success {
        Ok(())
    } else {
        anyhow::bail!(
            "{} of {} action(s) failed",
            batch.failed_operations,
            batch.total_operations
        )
    }
}

fn print_progress(progress: OperationProgress) {
    let target = progress.file_path.as_deref().unwrap_or("-");
    let percent = progress.progress.map(|p| format!("{:>3}%", p)).unwrap_or_else(|| "   -".to_string());
    match progress.status {
        OperationStatus::Completed => println!("  {} {} {}", percent.green(), progress.action, target),
        OperationStatus::Failed => println!(
            "  {} {} {}: {}",
            "FAIL".red(),
            progress.action,
            target,
            progress.error.as_deref().unwrap_or("unknown error")
        ),
        _ => println!("  {} {} {}", percent.dimmed(), progress.action, target.dimmed()),
    }
}

fn print_summary(batch: &BatchOperationResult) {
    println!();
    let line = format!(
        "{} succeeded, {} failed, {} total",
        batch.successful_operations, batch.failed_operations, batch.total_operations
    );
    if batch.success {
        println!("{} {}", "✓".green(), line.green());
    } else {
        println!("{} {}", "✗".red(), line.red());
        for error in &batch.errors {
            println!("  - {}", error);
        }
    }
}
