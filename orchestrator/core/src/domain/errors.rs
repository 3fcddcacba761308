// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Error Taxonomy
//!
//! Every failure that leaves the pipeline is an [`ActionError`]: one struct
//! carrying a closed [`ErrorCategory`] (the error "class"), a closed
//! [`ErrorCode`], a [`Severity`], whether a retry may help, whether the message
//! can be shown to a user verbatim, and the [`ErrorContext`] it occurred in.
//!
//! | Category | Class name | Default severity | Retryable | User friendly |
//! |----------|------------|------------------|-----------|---------------|
//! | `Validation` | `ValidationError` | low | no | yes |
//! | `Security` | `SecurityError` | high | no | no |
//! | `FileOperation` | `FileOperationError` | medium | by code | yes |
//! | `Network` | `NetworkError` | medium | yes | no |
//! | `AiProcessing` | `AIProcessingError` | medium | yes | no |
//! | `System` | `SystemError` | high | no | no |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    Security,
    FileOperation,
    Network,
    AiProcessing,
    System,
}

impl ErrorCategory {
    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "ValidationError",
            ErrorCategory::Security => "SecurityError",
            ErrorCategory::FileOperation => "FileOperationError",
            ErrorCategory::Network => "NetworkError",
            ErrorCategory::AiProcessing => "AIProcessingError",
            ErrorCategory::System => "SystemError",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // validation
    ValidationFailed,
    MissingRequiredField,
    InvalidFilePath,
    InvalidContent,
    UnsupportedOperation,
    // security
    SecurityViolation,
    PathTraversal,
    DangerousContent,
    UnsafeCommand,
    // file operations
    FileNotFound,
    FileAlreadyExists,
    FileReadError,
    FileWriteError,
    FileDeleteError,
    Unauthorized,
    // network
    NetworkError,
    Timeout,
    ConnectionFailed,
    // ai processing
    AiProcessingFailed,
    InvalidAiResponse,
    // system
    SystemError,
    Cancelled,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            ErrorCode::InvalidFilePath => "INVALID_FILE_PATH",
            ErrorCode::InvalidContent => "INVALID_CONTENT",
            ErrorCode::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            ErrorCode::SecurityViolation => "SECURITY_VIOLATION",
            ErrorCode::PathTraversal => "PATH_TRAVERSAL",
            ErrorCode::DangerousContent => "DANGEROUS_CONTENT",
            ErrorCode::UnsafeCommand => "UNSAFE_COMMAND",
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::FileAlreadyExists => "FILE_ALREADY_EXISTS",
            ErrorCode::FileReadError => "FILE_READ_ERROR",
            ErrorCode::FileWriteError => "FILE_WRITE_ERROR",
            ErrorCode::FileDeleteError => "FILE_DELETE_ERROR",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::ConnectionFailed => "CONNECTION_FAILED",
            ErrorCode::AiProcessingFailed => "AI_PROCESSING_FAILED",
            ErrorCode::InvalidAiResponse => "INVALID_AI_RESPONSE",
            ErrorCode::SystemError => "SYSTEM_ERROR",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an error happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub operation: Option<String>,
    pub file_path: Option<String>,
    pub workspace_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub backtrace: Option<String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            operation: None,
            file_path: None,
            workspace_id: None,
            timestamp: Utc::now(),
            backtrace: None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ActionError {
    pub category: ErrorCategory,
    pub code: ErrorCode,
    pub message: String,
    pub severity: Severity,
    pub retryable: bool,
    pub user_friendly: bool,
    pub context: ErrorContext,
}

impl ActionError {
    fn build(
        category: ErrorCategory,
        code: ErrorCode,
        message: impl Into<String>,
        severity: Severity,
        retryable: bool,
        user_friendly: bool,
    ) -> Self {
        Self {
            category,
            code,
            message: message.into(),
            severity,
            retryable,
            user_friendly,
            context: ErrorContext::default(),
        }
    }

    pub fn validation(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::build(ErrorCategory::Validation, code, message, Severity::Low, false, true)
    }

    pub fn security(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::build(ErrorCategory::Security, code, message, Severity::High, false, false)
    }

    /// Retryability follows the code: missing, existing and forbidden targets
    /// will not change on a second attempt.
    pub fn file_operation(code: ErrorCode, message: impl Into<String>) -> Self {
        let retryable = !matches!(
            code,
            ErrorCode::FileNotFound
                | ErrorCode::FileAlreadyExists
                | ErrorCode::Unauthorized
                | ErrorCode::ValidationFailed
        );
        Self::build(ErrorCategory::FileOperation, code, message, Severity::Medium, retryable, true)
    }

    pub fn network(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::build(ErrorCategory::Network, code, message, Severity::Medium, true, false)
    }

    pub fn ai_processing(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::build(ErrorCategory::AiProcessing, code, message, Severity::Medium, true, false)
    }

    pub fn system(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::build(ErrorCategory::System, code, message, Severity::High, false, false)
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Self::network(
            ErrorCode::Timeout,
            format!("Operation timed out after {}ms", timeout_ms),
        )
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::system(ErrorCode::Cancelled, message).with_severity(Severity::Low)
    }

    pub fn unsupported(tag: &str) -> Self {
        Self::validation(
            ErrorCode::UnsupportedOperation,
            format!("Unsupported operation type: {}", tag),
        )
    }

    /// Maps an HTTP-style status from the storage API onto a file operation error.
    ///
    /// 404 not found, 409 already exists, 403 unauthorized, 413 validation
    /// failed; everything else is a generic write error, retryable for 5xx.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let code = match status {
            404 => ErrorCode::FileNotFound,
            409 => ErrorCode::FileAlreadyExists,
            403 => ErrorCode::Unauthorized,
            413 => ErrorCode::ValidationFailed,
            _ => ErrorCode::FileWriteError,
        };
        let err = Self::file_operation(code, message);
        if code == ErrorCode::FileWriteError {
            err.with_retryable(status >= 500 || status == 429)
        } else {
            err
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.context.file_path = Some(file_path.into());
        self
    }

    pub fn with_workspace(mut self, workspace_id: impl Into<String>) -> Self {
        self.context.workspace_id = Some(workspace_id.into());
        self
    }

    pub fn with_backtrace(mut self, backtrace: impl Into<String>) -> Self {
        self.context.backtrace = Some(backtrace.into());
        self
    }

    /// Fills context fields that are still empty.
    pub fn in_context(mut self, operation: &str, workspace_id: &str, file_path: Option<&str>) -> Self {
        if self.context.operation.is_none() {
            self.context.operation = Some(operation.to_string());
        }
        if self.context.workspace_id.is_none() {
            self.context.workspace_id = Some(workspace_id.to_string());
        }
        if self.context.file_path.is_none() {
            self.context.file_path = file_path.map(str::to_string);
        }
        self
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_per_category() {
        let v = ActionError::validation(ErrorCode::MissingRequiredField, "Validation failed: file path is required");
        assert!(!v.retryable && v.user_friendly);
        assert_eq!(v.severity, Severity::Low);

        let s = ActionError::security(ErrorCode::PathTraversal, "traversal");
        assert!(!s.retryable && !s.user_friendly);
        assert_eq!(s.category.class_name(), "SecurityError");

        let n = ActionError::network(ErrorCode::ConnectionFailed, "refused");
        assert!(n.retryable);
    }

    #[test]
    fn test_file_operation_retryability_by_code() {
        assert!(!ActionError::file_operation(ErrorCode::FileNotFound, "x").retryable);
        assert!(!ActionError::file_operation(ErrorCode::FileAlreadyExists, "x").retryable);
        assert!(ActionError::file_operation(ErrorCode::FileWriteError, "x").retryable);
    }

    #[test]
    fn test_timeout_message() {
        let err = ActionError::timeout(30000);
        assert_eq!(err.to_string(), "Operation timed out after 30000ms");
        assert_eq!(err.code, ErrorCode::Timeout);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ActionError::from_status(404, "x").code, ErrorCode::FileNotFound);
        assert_eq!(ActionError::from_status(409, "x").code, ErrorCode::FileAlreadyExists);
        assert_eq!(ActionError::from_status(403, "x").code, ErrorCode::Unauthorized);
        assert_eq!(ActionError::from_status(413, "x").code, ErrorCode::ValidationFailed);
        let server = ActionError::from_status(502, "x");
        assert_eq!(server.code, ErrorCode::FileWriteError);
        assert!(server.retryable);
        assert!(!ActionError::from_status(400, "x").retryable);
    }

    #[test]
    fn test_in_context_keeps_existing_fields() {
        let err = ActionError::file_operation(ErrorCode::FileWriteError, "boom")
            .with_file_path("src/a.ts")
            .in_context("create", "ws-1", Some("other.ts"));
        assert_eq!(err.context.file_path.as_deref(), Some("src/a.ts"));
        assert_eq!(err.context.workspace_id.as_deref(), Some("ws-1"));
        assert_eq!(err.context.operation.as_deref(), Some("create"));
    }

    #[test]
    fn test_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::FileAlreadyExists).unwrap();
        assert_eq!(json, "\"FILE_ALREADY_EXISTS\"");
        assert_eq!(ErrorCode::FileAlreadyExists.as_str(), "FILE_ALREADY_EXISTS");
    }
}
