// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use tracing::info;

use super::{
    check_storage_result, editor_outcome, emit, ensure_exists, ensure_valid_path, failed, progress, require_path,
    FileOperationStrategy,
};
use crate::application::context::OperationContext;
use crate::domain::action::{ActionType, AiAction};
use crate::domain::errors::{ActionError, ErrorCode};
use crate::domain::events::DomainEvent;
use crate::domain::operation::{OperationMetadata, OperationResult, ProgressCallback};

const DELETE_COMPLEXITY: f64 = 0.5;

/// Removes a file and closes it in the editor.
/// Progress milestones: 0, 60 (deleted), 80 (closed), 100.
pub struct DeleteFileStrategy;

impl DeleteFileStrategy {
    async fn run(
        &self,
        action: &AiAction,
        context: &OperationContext,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<OperationResult, ActionError> {
        let path = require_path(action)?;
        progress(action, on_progress, 0);

        let removed = context
            .file_service
            .delete_file(&context.workspace_id, path)
            .await?;
        check_storage_result(removed, ErrorCode::FileDeleteError, format!("Failed to delete file: {}", path))?;
        progress(action, on_progress, 60);

        editor_outcome(context.editor_service.close_file(path).await, path);
        progress(action, on_progress, 80);

        emit(context, DomainEvent::file_deleted(&context.workspace_id, path));
        progress(action, on_progress, 100);

        info!(workspace_id = %context.workspace_id, file_path = %path, "File deleted");
        Ok(OperationResult::succeeded(ActionType::Delete, Some(path), OperationMetadata::default()))
    }
}

#[async_trait]
impl FileOperationStrategy for DeleteFileStrategy {
    fn name(&self) -> &str {
        "delete"
    }

    fn priority(&self) -> u32 {
        30
    }

    fn can_handle(&self, action: &AiAction) -> bool {
        action.action_type == ActionType::Delete
    }

    async fn validate(&self, action: &AiAction, context: &OperationContext) -> Result<(), ActionError> {
        let path = require_path(action)?;
        ensure_valid_path(path, context)?;
        ensure_exists(path, true, context).await
    }

    async fn execute(
        &self,
        action: &AiAction,
        context: &OperationContext,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<OperationResult, ActionError> {
        self.run(action, context, on_progress)
            .await
            .map_err(|e| failed(action, context, on_progress, e))
    }

    fn estimate_complexity(&self, _action: &AiAction) -> f64 {
        DELETE_COMPLEXITY
    }
}
