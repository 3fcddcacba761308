// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-process session: the services one CLI invocation executes against.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use actionflow_core::{
    application::{
        context::OperationContext, error_handling::ErrorHandlingService,
        orchestrator::FileOperationOrchestrator, validation_service::ValidationService,
    },
    domain::{
        action::{AiAction, AiArtifact},
        config::ActionflowConfig,
    },
    infrastructure::{
        editor::InMemoryEditorService,
        event_bus::{EventBus, LoggingMiddleware, ValidationMiddleware},
        file_service::create_file_service,
    },
};

pub struct Session {
    pub config: ActionflowConfig,
    pub orchestrator: FileOperationOrchestrator,
    pub context: OperationContext,
}

impl Session {
    /// Loads and validates configuration, then wires every collaborator.
    pub fn new(config_path: Option<PathBuf>, workspace_id: &str) -> Result<Self> {
        let config = ActionflowConfig::load_or_default(config_path).context("Failed to load configuration")?;
        config.validate().context("Configuration validation failed")?;
        Self::from_config(config, workspace_id)
    }

    pub fn from_config(config: ActionflowConfig, workspace_id: &str) -> Result<Self> {
        let file_service =
            create_file_service(&config.file_service).context("Failed to initialize file service")?;

        let event_bus = Arc::new(EventBus::new(&config.event_bus));
        event_bus.use_middleware(Arc::new(ValidationMiddleware));
        event_bus.use_middleware(Arc::new(LoggingMiddleware));

        let context = OperationContext::new(workspace_id, file_service, Arc::new(InMemoryEditorService::new()))
            .with_validation_service(Arc::new(ValidationService::new(config.validation.clone())))
            .with_event_bus(event_bus)
            .with_error_handler(Arc::new(ErrorHandlingService::new(&config.error_handling)))
            .with_cancellation(CancellationToken::new());

        debug!(workspace_id, backend = ?config.file_service.backend, "Session initialized");

        Ok(Self {
            orchestrator: FileOperationOrchestrator::new(config.orchestrator.clone()),
            config,
            context,
        })
    }

    /// Cancels the session token on Ctrl-C.
    pub fn cancel_on_ctrl_c(&self) {
        let token = self.context.cancellation.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    warn!("Interrupt received, cancelling remaining actions");
                    token.cancel();
                }
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
            }
        });
    }
}

/// Reads an artifact file. Accepts either `{"actions": [...]}` or a bare
/// array of actions.
pub fn read_artifact(path: &Path) -> Result<AiArtifact> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_artifact(&raw).with_context(|| format!("Invalid artifact file {}", path.display()))
}

pub fn parse_artifact(raw: &str) -> Result<AiArtifact> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if value.is_array() {
        let actions: Vec<AiAction> = serde_json::from_value(value)?;
        return Ok(AiArtifact::new(actions));
    }
    Ok(serde_json::from_value(value)?)
}

pub fn read_action(path: &Path) -> Result<AiAction> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid action file {}", path.display()))
}
