// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use tracing::{info, warn};

use super::{
    check_storage_result, content_complexity, editor_outcome, emit, ensure_exists, ensure_valid_content,
    ensure_valid_path, failed, progress, require_content, require_path, sanitize_for, FileOperationStrategy,
};
use crate::application::context::OperationContext;
use crate::domain::action::{ActionType, AiAction};
use crate::domain::errors::{ActionError, ErrorCode};
use crate::domain::events::DomainEvent;
use crate::domain::operation::{OperationMetadata, OperationResult, ProgressCallback};

/// Overwrites an existing file, keeping its previous content in the result
/// metadata and the `file.updated` event.
///
/// Progress milestones: 0, 20 (previous content fetched), 40 (sanitized),
/// 70 (stored), 85 (editor updated), 100.
pub struct EditFileStrategy;

impl EditFileStrategy {
    async fn run(
        &self,
        action: &AiAction,
        context: &OperationContext,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<OperationResult, ActionError> {
        let path = require_path(action)?;
        let content = require_content(action)?;
        progress(action, on_progress, 0);

        let previous_content = match context
            .file_service
            .get_file_content(&context.workspace_id, path)
            .await
        {
            Ok(previous) => Some(previous),
            Err(e) => {
                warn!(file_path = %path, error = %e, "Could not fetch previous content");
                None
            }
        };
        progress(action, on_progress, 20);

        let sanitized = sanitize_for(path, content, context);
        progress(action, on_progress, 40);

        let stored = context
            .file_service
            .update_file(&context.workspace_id, path, &sanitized)
            .await?;
        check_storage_result(stored, ErrorCode::FileWriteError, format!("Failed to update file: {}", path))?;
        progress(action, on_progress, 70);

        editor_outcome(context.editor_service.update_file_from_ai(path, &sanitized).await, path);
        progress(action, on_progress, 85);

        emit(
            context,
            DomainEvent::file_updated(&context.workspace_id, path, sanitized.len(), previous_content.clone()),
        );
        progress(action, on_progress, 100);

        info!(workspace_id = %context.workspace_id, file_path = %path, bytes = sanitized.len(), "File updated");
        let metadata = OperationMetadata {
            sanitized: sanitized != content,
            content_length: Some(sanitized.len()),
            previous_content,
            ..Default::default()
        };
        Ok(OperationResult::succeeded(ActionType::Edit, Some(path), metadata))
    }
}

#[async_trait]
impl FileOperationStrategy for EditFileStrategy {
    fn name(&self) -> &str {
        "edit"
    }

    fn priority(&self) -> u32 {
        20
    }

    fn can_handle(&self, action: &AiAction) -> bool {
        action.action_type == ActionType::Edit
    }

    async fn validate(&self, action: &AiAction, context: &OperationContext) -> Result<(), ActionError> {
        let path = require_path(action)?;
        let content = require_content(action)?;
        ensure_valid_path(path, context)?;
        ensure_valid_content(path, content, context)?;
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

    fn estimate_complexity(&self, action: &AiAction) -> f64 {
        content_complexity(1.5, action.content_len())
    }
}
