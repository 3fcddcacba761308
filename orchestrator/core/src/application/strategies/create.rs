// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use tracing::info;

use super::{
    check_storage_result, content_complexity, editor_outcome, emit, ensure_exists, ensure_valid_content,
    ensure_valid_path, failed, progress, require_content, require_path, sanitize_for, FileOperationStrategy,
};
use crate::application::context::OperationContext;
use crate::domain::action::{ActionType, AiAction};
use crate::domain::errors::{ActionError, ErrorCode};
use crate::domain::events::DomainEvent;
use crate::domain::operation::{OperationMetadata, OperationResult, ProgressCallback};

/// Writes a new file. Progress milestones: 0, 25 (sanitized), 60 (stored),
/// 80 (opened in editor), 100.
pub struct CreateFileStrategy;

impl CreateFileStrategy {
    async fn run(
        &self,
        action: &AiAction,
        context: &OperationContext,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<OperationResult, ActionError> {
        let path = require_path(action)?;
        let content = require_content(action)?;
        progress(action, on_progress, 0);

        let sanitized = sanitize_for(path, content, context);
        progress(action, on_progress, 25);

        let stored = context
            .file_service
            .create_file(&context.workspace_id, path, &sanitized)
            .await?;
        check_storage_result(stored, ErrorCode::FileWriteError, format!("Failed to create file: {}", path))?;
        progress(action, on_progress, 60);

        editor_outcome(context.editor_service.open_file_from_ai(path, &sanitized).await, path);
        progress(action, on_progress, 80);

        emit(context, DomainEvent::file_created(&context.workspace_id, path, sanitized.len()));
        progress(action, on_progress, 100);

        info!(workspace_id = %context.workspace_id, file_path = %path, bytes = sanitized.len(), "File created");
        let metadata = OperationMetadata {
            sanitized: sanitized != content,
            content_length: Some(sanitized.len()),
            ..Default::default()
        };
        Ok(OperationResult::succeeded(ActionType::Create, Some(path), metadata))
    }
}

#[async_trait]
impl FileOperationStrategy for CreateFileStrategy {
    fn name(&self) -> &str {
        "create"
    }

    fn priority(&self) -> u32 {
        10
    }

    fn can_handle(&self, action: &AiAction) -> bool {
        action.action_type == ActionType::Create
    }

    async fn validate(&self, action: &AiAction, context: &OperationContext) -> Result<(), ActionError> {
        let path = require_path(action)?;
        let content = require_content(action)?;
        ensure_valid_path(path, context)?;
        ensure_valid_content(path, content, context)?;
        ensure_exists(path, false, context).await
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
        content_complexity(1.0, action.content_len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::strategies::test_support::{context, milestones, recorder, WS};
    use crate::domain::events::FILE_CREATED;
    use crate::domain::operation::OperationStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_create_writes_sanitized_content() {
        let (ctx, files, editor) = context();
        let events = Arc::new(AtomicUsize::new(0));
        let e = events.clone();
        ctx.event_bus.on(FILE_CREATED, move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        });
        let (cb, seen) = recorder();
        let action = AiAction::create("config/app.json", r#"{"debug":true}"#);

        CreateFileStrategy.validate(&action, &ctx).await.unwrap();
        let result = CreateFileStrategy.execute(&action, &ctx, Some(&cb)).await.unwrap();

        assert!(result.success);
        assert!(result.metadata.sanitized);
        let stored = files.content(WS, "config/app.json").unwrap();
        assert_eq!(stored, "{\n  \"debug\": true\n}");
        assert_eq!(editor.content("config/app.json"), Some(stored));
        assert_eq!(events.load(Ordering::SeqCst), 1);
        assert_eq!(milestones(&seen), vec![Some(0), Some(25), Some(60), Some(80), Some(100)]);
    }

    #[tokio::test]
    async fn test_dangerous_script_fails_validation_before_any_write() {
        let (ctx, files, _) = context();
        let action = AiAction::create("app.js", "eval(userInput); document.write('<b>')");

        let err = CreateFileStrategy.validate(&action, &ctx).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::DangerousContent);
        assert!(err.message.contains("eval()"));
        assert_eq!(err.context.file_path.as_deref(), Some("app.js"));
        assert_eq!(files.call_count("create_file"), 0);
        assert!(files.content(WS, "app.js").is_none());
    }

    #[tokio::test]
    async fn test_create_on_existing_path_fails_validation() {
        let (ctx, files, _) = context();
        files.insert(WS, "index.html", "<p>hi</p>");
        let err = CreateFileStrategy
            .validate(&AiAction::create("index.html", "<p>new</p>"), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::FileAlreadyExists);
        assert_eq!(err.message, "File already exists: index.html");
    }

    #[tokio::test]
    async fn test_traversal_path_is_a_security_error() {
        let (ctx, _, _) = context();
        let err = CreateFileStrategy
            .validate(&AiAction::create("../outside.js", "1"), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PathTraversal);
    }

    #[tokio::test]
    async fn test_storage_failure_reports_failed_progress() {
        let (ctx, files, _) = context();
        files.fail_next("disk quota exceeded");
        let (cb, seen) = recorder();
        let err = CreateFileStrategy
            .execute(&AiAction::create("a.txt", "hello"), &ctx, Some(&cb))
            .await
            .unwrap_err();

        assert!(err.message.contains("disk quota exceeded"));
        assert_eq!(err.context.workspace_id.as_deref(), Some(WS));
        let last = seen.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.status, OperationStatus::Failed);
    }

    #[test]
    fn test_complexity() {
        assert_eq!(CreateFileStrategy.estimate_complexity(&AiAction::create("a.js", "")), 1.0);
        let big = "x".repeat(100_000);
        assert_eq!(CreateFileStrategy.estimate_complexity(&AiAction::create("a.js", big)), 5.0);
    }
}
