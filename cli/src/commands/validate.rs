// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `actionflow validate`: run every static check on one action without
//! touching the workspace.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use actionflow_core::application::validation_service::ValidationService;
use actionflow_core::domain::action::AiAction;
use actionflow_core::domain::config::ActionflowConfig;
use actionflow_core::domain::security::{SecurityLevel, SecurityValidationResult};

use crate::session::read_action;

pub async fn execute(action_path: PathBuf, json: bool, config_path: Option<PathBuf>) -> Result<()> {
    let action = read_action(&action_path)?;
    let config = ActionflowConfig::load_or_default(config_path).context("Failed to load configuration")?;
    let service = ValidationService::new(config.validation);

    let result = check_action(&service, &action);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    if result.is_valid {
        Ok(())
    } else {
        anyhow::bail!("Action failed validation")
    }
}

/// Required fields, shell safety, path rules and content rules, merged.
pub fn check_action(service: &ValidationService, action: &AiAction) -> SecurityValidationResult {
    let mut result = service.validate_ai_action(action);
    if let Some(path) = action.target_path() {
        result.merge(service.validate_file_path(path, &service.path_options()));
        if let Some(content) = action.content.as_deref() {
            result.merge(service.validate_file_content(content, &service.content_options_for(path)));
        }
    }
    result
}

fn print_result(result: &SecurityValidationResult) {
    let level = match result.security_level {
        SecurityLevel::Safe => "safe".green(),
        SecurityLevel::Warning => "warning".yellow(),
        SecurityLevel::Danger => "danger".red(),
    };
    if result.is_valid {
        println!("{} Action is valid (security level: {})", "✓".green(), level);
    } else {
        println!("{} Action is invalid (security level: {})", "✗".red(), level);
    }

    for error in &result.errors {
        println!("  {} {}", "error:".red(), error);
    }
    for warning in &result.warnings {
        println!("  {} {}", "warning:".yellow(), warning);
    }
    if !result.threats.is_empty() {
        println!("  {} {}", "threats:".bold(), result.threats.join(", "));
    }
}
