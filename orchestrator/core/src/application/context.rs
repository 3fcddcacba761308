// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Session-scoped service bundle handed by reference to every strategy call.
//!
//! Built once by the caller at session start; the orchestrator never owns or
//! caches it.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::application::error_handling::ErrorHandlingService;
use crate::application::validation_service::ValidationService;
use crate::domain::workspace::{EditorService, FileService};
use crate::infrastructure::event_bus::EventBus;

#[derive(Clone)]
pub struct OperationContext {
    pub workspace_id: String,
    pub user_id: Option<String>,
    pub file_service: Arc<dyn FileService>,
    pub editor_service: Arc<dyn EditorService>,
    pub validation_service: Arc<ValidationService>,
    pub event_bus: Arc<EventBus>,
    pub error_handler: Arc<ErrorHandlingService>,
    pub cancellation: CancellationToken,
}

impl OperationContext {
    /// Context with default validation rules, a fresh event bus and error
    /// handler, and a token that is never cancelled.
    pub fn new(
        workspace_id: impl Into<String>,
        file_service: Arc<dyn FileService>,
        editor_service: Arc<dyn EditorService>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            user_id: None,
            file_service,
            editor_service,
            validation_service: Arc::new(ValidationService::default()),
            event_bus: Arc::new(EventBus::default()),
            error_handler: Arc::new(ErrorHandlingService::default()),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_validation_service(mut self, validation_service: Arc<ValidationService>) -> Self {
        self.validation_service = validation_service;
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn with_error_handler(mut self, error_handler: Arc<ErrorHandlingService>) -> Self {
        self.error_handler = error_handler;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
