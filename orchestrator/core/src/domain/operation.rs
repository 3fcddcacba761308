// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Transient values produced while an action executes: progress updates pushed
//! through a callback, and the result returned to the caller.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::action::ActionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A progress update for one action. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationProgress {
    pub action: ActionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    pub status: OperationStatus,

    /// 0-100. For batch executions this is the weighted progress of the batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationProgress {
    pub fn running(action: ActionType, file_path: Option<&str>, progress: u8) -> Self {
        Self {
            action,
            file_path: file_path.map(str::to_string),
            status: if progress >= 100 {
                OperationStatus::Completed
            } else {
                OperationStatus::Running
            },
            progress: Some(progress.min(100)),
            error: None,
        }
    }

    pub fn failed(action: ActionType, file_path: Option<&str>, error: impl Into<String>) -> Self {
        Self {
            action,
            file_path: file_path.map(str::to_string),
            status: OperationStatus::Failed,
            progress: None,
            error: Some(error.into()),
        }
    }
}

/// Callback receiving progress updates.
pub type ProgressCallback = Arc<dyn Fn(OperationProgress) + Send + Sync>;

/// Pushes `progress` to `callback` when one was supplied.
pub fn report(callback: Option<&ProgressCallback>, progress: OperationProgress) {
    if let Some(cb) = callback {
        cb(progress);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    /// True when sanitization changed the content that was written.
    #[serde(default)]
    pub sanitized: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<usize>,

    /// Content of the file before an edit, for undo tooling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionType>,

    #[serde(default)]
    pub metadata: OperationMetadata,
}

impl OperationResult {
    pub fn succeeded(action: ActionType, file_path: Option<&str>, metadata: OperationMetadata) -> Self {
        Self {
            success: true,
            error: None,
            file_path: file_path.map(str::to_string),
            action: Some(action),
            metadata,
        }
    }

    pub fn failed(action: ActionType, file_path: Option<&str>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            file_path: file_path.map(str::to_string),
            action: Some(action),
            metadata: OperationMetadata::default(),
        }
    }
}

/// Outcome of an artifact or concurrent batch.
///
/// `results` covers attempted actions only; `failed_operations` also counts
/// actions that were never attempted because an earlier step failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOperationResult {
    pub success: bool,
    pub results: Vec<OperationResult>,
    pub total_operations: usize,
    pub successful_operations: usize,
    pub failed_operations: usize,
    pub errors: Vec<String>,
}

impl BatchOperationResult {
    pub fn from_results(total_operations: usize, results: Vec<OperationResult>, errors: Vec<String>) -> Self {
        let successful_operations = results.iter().filter(|r| r.success).count();
        let failed_operations = total_operations.saturating_sub(successful_operations);
        Self {
            success: failed_operations == 0,
            results,
            total_operations,
            successful_operations,
            failed_operations,
            errors,
        }
    }

    pub fn attempted(&self) -> usize {
        self.results.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_progress_at_hundred_is_completed() {
        let p = OperationProgress::running(ActionType::Create, Some("a.js"), 100);
        assert_eq!(p.status, OperationStatus::Completed);
        let p = OperationProgress::running(ActionType::Create, Some("a.js"), 140);
        assert_eq!(p.progress, Some(100));
    }

    #[test]
    fn test_report_without_callback_is_noop() {
        report(None, OperationProgress::running(ActionType::Delete, None, 0));
    }

    #[test]
    fn test_report_forwards_to_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let cb: ProgressCallback = Arc::new(move |p| sink.lock().unwrap().push(p.progress));
        report(Some(&cb), OperationProgress::running(ActionType::Edit, None, 40));
        assert_eq!(*seen.lock().unwrap(), vec![Some(40)]);
    }

    #[test]
    fn test_batch_counts_unattempted_as_failed() {
        let results = vec![
            OperationResult::succeeded(ActionType::Create, Some("a.js"), OperationMetadata::default()),
            OperationResult::failed(ActionType::Edit, Some("b.js"), "boom"),
        ];
        let batch = BatchOperationResult::from_results(3, results, vec!["boom".into()]);
        assert!(!batch.success);
        assert_eq!(batch.successful_operations, 1);
        assert_eq!(batch.failed_operations, 2);
        assert_eq!(batch.attempted(), 2);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let mut metadata = OperationMetadata::default();
        metadata.previous_content = Some("old".into());
        let result = OperationResult::succeeded(ActionType::Edit, Some("a.css"), metadata);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["filePath"], "a.css");
        assert_eq!(json["metadata"]["previousContent"], "old");
    }
}
