// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # File Operation Strategies
//!
//! One strategy per executable action type. A strategy owns the whole policy
//! for its type: required-field and security validation, the existence
//! precondition, the storage call, mirroring the change into the editor, the
//! domain event, and progress milestones.
//!
//! | Strategy | Priority | Precondition | Complexity |
//! |----------|----------|--------------|------------|
//! | [`CreateFileStrategy`] | 10 | path must not exist | `1.0 + len/10000`, max 5 |
//! | [`EditFileStrategy`] | 20 | path must exist | `1.5 + len/10000`, max 5 |
//! | [`DeleteFileStrategy`] | 30 | path must exist | `0.5` |
//!
//! Dispatch goes through [`StrategyRegistry`]; an action no registered
//! strategy accepts is rejected with "Unsupported operation type".

mod create;
mod delete;
mod edit;

pub use create::CreateFileStrategy;
pub use delete::DeleteFileStrategy;
pub use edit::EditFileStrategy;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::application::context::OperationContext;
use crate::application::error_handling::ErrorHandlingService;
use crate::application::validation_service::{ValidationService, THREAT_TRAVERSAL};
use crate::domain::action::{ActionType, AiAction};
use crate::domain::errors::{ActionError, ErrorCategory, ErrorCode};
use crate::domain::events::DomainEvent;
use crate::domain::operation::{report, OperationProgress, OperationResult, ProgressCallback};
use crate::domain::workspace::FileOperationResult;

/// Complexity reported for actions no strategy handles.
pub const UNSUPPORTED_COMPLEXITY: f64 = 1.0;

/// Cap on any content-derived complexity.
pub const MAX_COMPLEXITY: f64 = 5.0;

#[async_trait]
pub trait FileOperationStrategy: Send + Sync {
    /// Unique name, used for unregistration.
    fn name(&self) -> &str;

    /// Lower values are consulted first.
    fn priority(&self) -> u32;

    fn can_handle(&self, action: &AiAction) -> bool;

    /// Fails before any side effect when the action must not run.
    async fn validate(&self, action: &AiAction, context: &OperationContext) -> Result<(), ActionError>;

    async fn execute(
        &self,
        action: &AiAction,
        context: &OperationContext,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<OperationResult, ActionError>;

    /// Heuristic cost in complexity units.
    fn estimate_complexity(&self, action: &AiAction) -> f64;
}

/// Strategies ordered by ascending priority.
#[derive(Clone)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn FileOperationStrategy>>,
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Registry holding the create, edit and delete strategies.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        for action_type in ActionType::ALL {
            if let Some(strategy) = builtin_strategy(action_type) {
                registry.register(strategy);
            }
        }
        registry
    }

    /// Adds a strategy, replacing any strategy with the same name, and keeps
    /// the list sorted by priority. Ties keep registration order.
    pub fn register(&mut self, strategy: Arc<dyn FileOperationStrategy>) {
        self.strategies.retain(|s| s.name() != strategy.name());
        debug!(strategy = strategy.name(), priority = strategy.priority(), "Strategy registered");
        self.strategies.push(strategy);
        self.strategies.sort_by_key(|s| s.priority());
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.strategies.len();
        self.strategies.retain(|s| s.name() != name);
        before != self.strategies.len()
    }

    pub fn strategies(&self) -> &[Arc<dyn FileOperationStrategy>] {
        &self.strategies
    }

    /// First strategy, by priority, that accepts the action.
    pub fn select(&self, action: &AiAction) -> Result<Arc<dyn FileOperationStrategy>, ActionError> {
        self.strategies
            .iter()
            .find(|s| s.can_handle(action))
            .cloned()
            .ok_or_else(|| ActionError::unsupported(action.action_type.as_str()))
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

/// The built-in strategy for an action type, if the type is executable here.
pub fn builtin_strategy(action_type: ActionType) -> Option<Arc<dyn FileOperationStrategy>> {
    match action_type {
        ActionType::Create => Some(Arc::new(CreateFileStrategy)),
        ActionType::Edit => Some(Arc::new(EditFileStrategy)),
        ActionType::Delete => Some(Arc::new(DeleteFileStrategy)),
        ActionType::File | ActionType::Shell | ActionType::Start => None,
    }
}

pub(crate) fn content_complexity(base: f64, content_len: usize) -> f64 {
    (base + content_len as f64 / 10_000.0).min(MAX_COMPLEXITY)
}

pub(crate) fn require_path(action: &AiAction) -> Result<&str, ActionError> {
    action.target_path().ok_or_else(|| {
        ActionError::validation(
            ErrorCode::MissingRequiredField,
            format!("Validation failed: file path is required for {} actions", action.action_type),
        )
    })
}

pub(crate) fn require_content(action: &AiAction) -> Result<&str, ActionError> {
    action.content.as_deref().ok_or_else(|| {
        ActionError::validation(
            ErrorCode::MissingRequiredField,
            format!("Validation failed: content is required for {} actions", action.action_type),
        )
    })
}

/// Turns a failed path check into a security or validation error.
pub(crate) fn ensure_valid_path(path: &str, context: &OperationContext) -> Result<(), ActionError> {
    let validation = &context.validation_service;
    let result = validation.validate_file_path(path, &validation.path_options());
    if result.is_valid {
        return Ok(());
    }
    let err = if result.is_dangerous() {
        let code = if result.threats.iter().any(|t| t == THREAT_TRAVERSAL) {
            ErrorCode::PathTraversal
        } else {
            ErrorCode::SecurityViolation
        };
        ActionError::security(code, format!("Security validation failed for path: {}", result.summary()))
    } else {
        ActionError::validation(ErrorCode::InvalidFilePath, format!("Validation failed: {}", result.summary()))
    };
    Err(err.with_file_path(path))
}

/// Sanitizes `content` for the type implied by `path`.
pub(crate) fn sanitize_for(path: &str, content: &str, context: &OperationContext) -> String {
    let file_type = ValidationService::detect_file_type(path);
    context.validation_service.sanitize_content(content, file_type)
}

/// Validates the content as proposed. Dangerous constructs fail here, before
/// any write; sanitization only happens in `execute`.
pub(crate) fn ensure_valid_content(path: &str, content: &str, context: &OperationContext) -> Result<(), ActionError> {
    let validation = &context.validation_service;
    let result = validation.validate_file_content(content, &validation.content_options_for(path));
    for warning in &result.warnings {
        debug!(file_path = %path, warning = %warning, "Content warning");
    }
    if result.is_valid {
        return Ok(());
    }
    let err = if result.is_dangerous() {
        ActionError::security(
            ErrorCode::DangerousContent,
            format!("Security validation failed for content: {}", result.summary()),
        )
    } else {
        ActionError::validation(ErrorCode::InvalidContent, format!("Validation failed: {}", result.summary()))
    };
    Err(err.with_file_path(path))
}

pub(crate) async fn ensure_exists(path: &str, should_exist: bool, context: &OperationContext) -> Result<(), ActionError> {
    let exists = context
        .file_service
        .file_exists(&context.workspace_id, path)
        .await
        .map_err(ActionError::from)?;
    match (exists, should_exist) {
        (true, false) => Err(ActionError::file_operation(
            ErrorCode::FileAlreadyExists,
            format!("File already exists: {}", path),
        )
        .with_file_path(path)),
        (false, true) => Err(ActionError::file_operation(
            ErrorCode::FileNotFound,
            format!("File does not exist: {}", path),
        )
        .with_file_path(path)),
        _ => Ok(()),
    }
}

/// Converts a storage result with `success == false` into an error.
pub(crate) fn check_storage_result(
    result: FileOperationResult,
    default_code: ErrorCode,
    fallback: String,
) -> Result<(), ActionError> {
    if result.success {
        return Ok(());
    }
    let message = result.error.unwrap_or(fallback);
    let classified = ErrorHandlingService::classify_message(&message);
    if classified.category == ErrorCategory::FileOperation {
        Err(classified)
    } else {
        Err(ActionError::file_operation(default_code, message))
    }
}

/// Editor state is a mirror; failing to update it does not fail the action.
pub(crate) fn editor_outcome(result: anyhow::Result<()>, file_path: &str) {
    if let Err(e) = result {
        warn!(file_path = %file_path, error = %e, "Editor update failed");
    }
}

pub(crate) fn emit(context: &OperationContext, event: DomainEvent) {
    if let Err(e) = context.event_bus.emit(event) {
        warn!(error = %e, "Failed to emit domain event");
    }
}

/// Reports a failed progress update and attaches the operation context.
pub(crate) fn failed(
    action: &AiAction,
    context: &OperationContext,
    on_progress: Option<&ProgressCallback>,
    error: ActionError,
) -> ActionError {
    let path = action.target_path();
    report(on_progress, OperationProgress::failed(action.action_type, path, error.message.clone()));
    error.in_context(action.action_type.as_str(), &context.workspace_id, path)
}

pub(crate) fn progress(action: &AiAction, on_progress: Option<&ProgressCallback>, value: u8) {
    report(
        on_progress,
        OperationProgress::running(action.action_type, action.target_path(), value),
    );
}


#[cfg(test)]
mod tests {
    use super::*;

    struct FallbackStrategy;

    #[async_trait]
    impl FileOperationStrategy for FallbackStrategy {
        fn name(&self) -> &str {
            "fallback"
        }

        fn priority(&self) -> u32 {
            5
        }

        fn can_handle(&self, action: &AiAction) -> bool {
            action.action_type == ActionType::Shell
        }

        async fn validate(&self, _action: &AiAction, _context: &OperationContext) -> Result<(), ActionError> {
            Ok(())
        }

        async fn execute(
            &self,
            action: &AiAction,
            _context: &OperationContext,
            _on_progress: Option<&ProgressCallback>,
        ) -> Result<OperationResult, ActionError> {
            Ok(OperationResult::succeeded(action.action_type, None, Default::default()))
        }

        fn estimate_complexity(&self, _action: &AiAction) -> f64 {
            2.0
        }
    }

    #[test]
    fn test_builtin_registry_is_sorted_by_priority() {
        let registry = StrategyRegistry::with_builtin();
        let names: Vec<_> = registry.strategies().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["create", "edit", "delete"]);
    }

    #[test]
    fn test_select_by_tag() {
        let registry = StrategyRegistry::with_builtin();
        assert_eq!(registry.select(&AiAction::edit("a.js", "x")).unwrap().name(), "edit");
        assert_eq!(registry.select(&AiAction::delete("a.js")).unwrap().name(), "delete");
    }

    #[test]
    fn test_unhandled_tags_are_unsupported() {
        let registry = StrategyRegistry::with_builtin();
        for action in [AiAction::shell("npm install"), AiAction::start("npm run dev")] {
            let err = registry.select(&action).err().unwrap();
            assert_eq!(err.code, ErrorCode::UnsupportedOperation);
            assert!(err.message.starts_with("Unsupported operation type"));
        }
    }

    #[test]
    fn test_register_resorts_and_unregister() {
        let mut registry = StrategyRegistry::with_builtin();
        registry.register(Arc::new(FallbackStrategy));
        assert_eq!(registry.strategies()[0].name(), "fallback");
        assert_eq!(registry.select(&AiAction::shell("ls")).unwrap().name(), "fallback");

        assert!(registry.unregister("fallback"));
        assert!(!registry.unregister("fallback"));
        assert!(registry.select(&AiAction::shell("ls")).is_err());
    }

    #[test]
    fn test_content_complexity_is_capped() {
        assert_eq!(content_complexity(1.0, 0), 1.0);
        assert_eq!(content_complexity(1.5, 5_000), 2.0);
        assert_eq!(content_complexity(1.0, 1_000_000), MAX_COMPLEXITY);
    }
}
