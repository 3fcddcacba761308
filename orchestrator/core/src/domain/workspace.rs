// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Workspace Collaborators - Anti-Corruption Layer for file storage and editor state
//!
//! The pipeline never persists files itself. It talks to a [`FileService`]
//! keyed by `(workspace_id, file_path)` and mirrors every change into an
//! [`EditorService`] that owns in-memory open-document state.
//!
//! Implementations live in `crate::infrastructure::file_service` and
//! `crate::infrastructure::editor`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::action::ActionType;
use crate::domain::errors::{ActionError, ErrorCode};

/// Result envelope returned by the storage API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOperationResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionType>,
}

impl FileOperationResult {
    pub fn ok(action: ActionType, file_path: &str) -> Self {
        Self {
            success: true,
            error: None,
            file_path: Some(file_path.to_string()),
            action: Some(action),
        }
    }

    pub fn failed(action: ActionType, file_path: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            file_path: Some(file_path.to_string()),
            action: Some(action),
        }
    }
}

/// File storage collaborator.
///
/// All paths are workspace-relative and have already passed path validation.
#[async_trait]
pub trait FileService: Send + Sync {
    async fn create_file(
        &self,
        workspace_id: &str,
        file_path: &str,
        content: &str,
    ) -> Result<FileOperationResult, FileServiceError>;

    async fn update_file(
        &self,
        workspace_id: &str,
        file_path: &str,
        content: &str,
    ) -> Result<FileOperationResult, FileServiceError>;

    async fn delete_file(
        &self,
        workspace_id: &str,
        file_path: &str,
    ) -> Result<FileOperationResult, FileServiceError>;

    async fn file_exists(&self, workspace_id: &str, file_path: &str) -> Result<bool, FileServiceError>;

    async fn list_files(&self, workspace_id: &str) -> Result<Vec<String>, FileServiceError>;

    async fn get_file_content(&self, workspace_id: &str, file_path: &str) -> Result<String, FileServiceError>;
}

/// Editor collaborator. Mutates in-memory open-document state only.
#[async_trait]
pub trait EditorService: Send + Sync {
    async fn open_file_from_ai(&self, file_path: &str, content: &str) -> anyhow::Result<()>;

    async fn update_file_from_ai(&self, file_path: &str, content: &str) -> anyhow::Result<()>;

    async fn close_file(&self, file_path: &str) -> anyhow::Result<()>;
}

/// Storage errors
#[derive(Debug, Error)]
pub enum FileServiceError {
    #[error("Storage API returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Timeout while communicating with storage backend")]
    Timeout,

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FileServiceError {
    /// HTTP-style status equivalent, used for error classification.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FileServiceError::Http { status, .. } => Some(*status),
            FileServiceError::NotFound(_) => Some(404),
            FileServiceError::AlreadyExists(_) => Some(409),
            FileServiceError::PermissionDenied(_) => Some(403),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FileServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FileServiceError::Timeout
        } else if let Some(status) = err.status() {
            FileServiceError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            FileServiceError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FileServiceError {
    fn from(err: serde_json::Error) -> Self {
        FileServiceError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for FileServiceError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => FileServiceError::NotFound(err.to_string()),
            std::io::ErrorKind::AlreadyExists => FileServiceError::AlreadyExists(err.to_string()),
            std::io::ErrorKind::PermissionDenied => FileServiceError::PermissionDenied(err.to_string()),
            std::io::ErrorKind::TimedOut => FileServiceError::Timeout,
            _ => FileServiceError::Io(err.to_string()),
        }
    }
}

impl From<FileServiceError> for ActionError {
    fn from(err: FileServiceError) -> Self {
        let message = err.to_string();
        if let Some(status) = err.status_code() {
            return ActionError::from_status(status, message);
        }
        match err {
            FileServiceError::Timeout => ActionError::network(ErrorCode::Timeout, message),
            FileServiceError::Transport(_) => ActionError::network(ErrorCode::ConnectionFailed, message),
            FileServiceError::InvalidPath(_) => ActionError::validation(ErrorCode::InvalidFilePath, message),
            FileServiceError::Serialization(_) => ActionError::system(ErrorCode::SystemError, message),
            _ => ActionError::file_operation(ErrorCode::FileWriteError, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorCategory;

    #[test]
    fn test_status_codes() {
        assert_eq!(FileServiceError::NotFound("a".into()).status_code(), Some(404));
        assert_eq!(FileServiceError::AlreadyExists("a".into()).status_code(), Some(409));
        assert_eq!(FileServiceError::Timeout.status_code(), None);
    }

    #[test]
    fn test_io_error_mapping() {
        let err: FileServiceError = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        assert!(matches!(err, FileServiceError::NotFound(_)));
        let err: FileServiceError = std::io::Error::from(std::io::ErrorKind::PermissionDenied).into();
        assert!(matches!(err, FileServiceError::PermissionDenied(_)));
    }

    #[test]
    fn test_conversion_into_action_error() {
        let err: ActionError = FileServiceError::AlreadyExists("src/a.ts".into()).into();
        assert_eq!(err.code, ErrorCode::FileAlreadyExists);
        assert!(err.to_string().contains("already exists"));

        let err: ActionError = FileServiceError::Transport("connection refused".into()).into();
        assert_eq!(err.category, ErrorCategory::Network);
        assert!(err.retryable);

        let err: ActionError = FileServiceError::Http { status: 503, message: "unavailable".into() }.into();
        assert_eq!(err.code, ErrorCode::FileWriteError);
        assert!(err.retryable);
    }
}
