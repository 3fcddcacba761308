// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Error Handling Service
//!
//! Normalizes raw failures into [`ActionError`], keeps a bounded rolling
//! history with aggregate statistics, forwards critical errors to an external
//! [`ErrorReporter`] and offers retryable errors to a chain of
//! [`RecoveryStrategy`] implementations.
//!
//! Reporting is fire-and-forget and recovery never swallows the error: the
//! caller always gets the original [`ActionError`] back, together with
//! whether a recovery strategy ran successfully.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::domain::config::ErrorHandlingConfig;
use crate::domain::errors::{ActionError, ErrorCategory, ErrorCode, Severity};
use crate::domain::path_sanitizer::PathSanitizerError;
use crate::domain::workspace::FileServiceError;
use crate::infrastructure::event_bus::EventBusError;

/// External sink for critical errors (crash reporting, paging).
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    async fn report(&self, error: &ActionError) -> anyhow::Result<()>;
}

#[async_trait]
pub trait RecoveryStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn can_recover(&self, error: &ActionError) -> bool;

    async fn recover(&self, error: &ActionError) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct HandledError {
    pub error: ActionError,
    pub recovered: bool,
    pub recovered_by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorStatistics {
    pub total: usize,
    pub by_severity: HashMap<Severity, usize>,
    pub by_category: HashMap<ErrorCategory, usize>,
    pub retryable_ratio: f64,
}

pub struct ErrorHandlingService {
    history: Mutex<VecDeque<ActionError>>,
    history_limit: usize,
    reporter: RwLock<Option<Arc<dyn ErrorReporter>>>,
    recovery_strategies: RwLock<Vec<Arc<dyn RecoveryStrategy>>>,
}

impl ErrorHandlingService {
    pub fn new(config: &ErrorHandlingConfig) -> Self {
        Self {
            history: Mutex::new(VecDeque::new()),
            history_limit: config.history_limit,
            reporter: RwLock::new(None),
            recovery_strategies: RwLock::new(Vec::new()),
        }
    }

    pub fn set_reporter(&self, reporter: Arc<dyn ErrorReporter>) {
        *self.reporter.write() = Some(reporter);
    }

    /// Appends a strategy to the end of the recovery chain.
    pub fn add_recovery_strategy(&self, strategy: Arc<dyn RecoveryStrategy>) {
        self.recovery_strategies.write().push(strategy);
    }

    /// Maps any failure onto the closed taxonomy.
    pub fn normalize(error: anyhow::Error) -> ActionError {
        let error = match error.downcast::<ActionError>() {
            Ok(e) => return e,
            Err(e) => e,
        };
        let error = match error.downcast::<FileServiceError>() {
            Ok(e) => return e.into(),
            Err(e) => e,
        };
        let error = match error.downcast::<PathSanitizerError>() {
            Ok(e) => {
                let message = e.to_string();
                return match e {
                    PathSanitizerError::PathTraversal(_) | PathSanitizerError::OutsideBoundary(_) => {
                        ActionError::security(ErrorCode::PathTraversal, message)
                    }
                    _ => ActionError::validation(ErrorCode::InvalidFilePath, message),
                };
            }
            Err(e) => e,
        };
        let error = match error.downcast::<tokio::time::error::Elapsed>() {
            Ok(e) => return ActionError::network(ErrorCode::Timeout, e.to_string()),
            Err(e) => e,
        };
        let error = match error.downcast::<reqwest::Error>() {
            Ok(e) => return FileServiceError::from(e).into(),
            Err(e) => e,
        };
        let error = match error.downcast::<std::io::Error>() {
            Ok(e) => return FileServiceError::from(e).into(),
            Err(e) => e,
        };
        let error = match error.downcast::<serde_json::Error>() {
            Ok(e) => return ActionError::ai_processing(ErrorCode::InvalidAiResponse, e.to_string()),
            Err(e) => e,
        };
        let error = match error.downcast::<EventBusError>() {
            Ok(e) => return ActionError::system(ErrorCode::SystemError, e.to_string()),
            Err(e) => e,
        };

        let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
        let classified = Self::classify_message(&error.to_string());
        if causes.is_empty() {
            classified
        } else {
            classified.with_backtrace(causes.join("\n"))
        }
    }

    /// Keyword classification for untyped failures.
    pub fn classify_message(message: &str) -> ActionError {
        let lower = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&["cancelled", "canceled"]) {
            ActionError::cancelled(message)
        } else if has(&["traversal", "security", "dangerous", "unsafe"]) {
            ActionError::security(ErrorCode::SecurityViolation, message)
        } else if has(&["validation", "required", "invalid"]) {
            ActionError::validation(ErrorCode::ValidationFailed, message)
        } else if has(&["already exists"]) {
            ActionError::file_operation(ErrorCode::FileAlreadyExists, message)
        } else if has(&["not found", "does not exist"]) {
            ActionError::file_operation(ErrorCode::FileNotFound, message)
        } else if has(&["unauthorized", "forbidden", "permission denied"]) {
            ActionError::file_operation(ErrorCode::Unauthorized, message)
        } else if has(&["timed out", "timeout"]) {
            ActionError::network(ErrorCode::Timeout, message)
        } else if has(&["network", "connection", "fetch failed"]) {
            ActionError::network(ErrorCode::NetworkError, message)
        } else if has(&["ai response", "model", "completion"]) {
            ActionError::ai_processing(ErrorCode::AiProcessingFailed, message)
        } else {
            ActionError::system(ErrorCode::Unknown, message)
        }
    }

    /// Records, reports and attempts recovery for an already-normalized error.
    pub async fn handle_error(&self, error: ActionError) -> HandledError {
        self.log(&error);
        self.record(error.clone());

        if error.is_critical() {
            self.report(&error);
        }

        let mut handled = HandledError {
            error,
            recovered: false,
            recovered_by: None,
        };

        if !handled.error.retryable {
            return handled;
        }

        let strategies = self.recovery_strategies.read().clone();
        for strategy in strategies {
            if !strategy.can_recover(&handled.error) {
                continue;
            }
            match strategy.recover(&handled.error).await {
                Ok(()) => {
                    info!(strategy = strategy.name(), code = %handled.error.code, "Error recovered");
                    handled.recovered = true;
                    handled.recovered_by = Some(strategy.name().to_string());
                    break;
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "Recovery strategy failed");
                }
            }
        }

        handled
    }

    /// Normalizes then handles a raw failure.
    pub async fn handle(&self, error: anyhow::Error) -> HandledError {
        self.handle_error(Self::normalize(error)).await
    }

    fn log(&self, error: &ActionError) {
        let file_path = error.context.file_path.as_deref().unwrap_or("-");
        let operation = error.context.operation.as_deref().unwrap_or("-");
        match error.severity {
            Severity::Critical | Severity::High => error!(
                class = error.category.class_name(),
                code = %error.code,
                operation,
                file_path,
                "{}",
                error.message
            ),
            Severity::Medium => warn!(
                class = error.category.class_name(),
                code = %error.code,
                operation,
                file_path,
                "{}",
                error.message
            ),
            Severity::Low => debug!(
                class = error.category.class_name(),
                code = %error.code,
                operation,
                file_path,
                "{}",
                error.message
            ),
        }
    }

    fn record(&self, error: ActionError) {
        if self.history_limit == 0 {
            return;
        }
        let mut history = self.history.lock();
        history.push_back(error);
        while history.len() > self.history_limit {
            history.pop_front();
        }
    }

    fn report(&self, error: &ActionError) {
        let Some(reporter) = self.reporter.read().clone() else {
            return;
        };
        let error = error.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = reporter.report(&error).await {
                        error!(code = %error.code, error = %e, "Failed to report critical error");
                    }
                });
            }
            Err(_) => warn!(code = %error.code, "No tokio runtime; critical error not reported"),
        }
    }

    /// Text safe to show to an end user.
    pub fn user_message(error: &ActionError) -> String {
        if error.user_friendly {
            return error.message.clone();
        }
        match error.category {
            ErrorCategory::Validation => "The requested change is not valid. Please check the file path and content.",
            ErrorCategory::Security => "This action was blocked for security reasons.",
            ErrorCategory::FileOperation => "The file operation could not be completed. Please try again.",
            ErrorCategory::Network => "A network error occurred. Please check your connection and try again.",
            ErrorCategory::AiProcessing => "The AI response could not be processed. Please try again.",
            ErrorCategory::System => "An unexpected error occurred. Please try again.",
        }
        .to_string()
    }

    pub fn history(&self) -> Vec<ActionError> {
        self.history.lock().iter().cloned().collect()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    pub fn statistics(&self) -> ErrorStatistics {
        let history = self.history.lock();
        let mut stats = ErrorStatistics {
            total: history.len(),
            ..Default::default()
        };
        let mut retryable = 0usize;
        for error in history.iter() {
            *stats.by_severity.entry(error.severity).or_default() += 1;
            *stats.by_category.entry(error.category).or_default() += 1;
            if error.retryable {
                retryable += 1;
            }
        }
        if stats.total > 0 {
            stats.retryable_ratio = retryable as f64 / stats.total as f64;
        }
        stats
    }
}

impl Default for ErrorHandlingService {
    fn default() -> Self {
        Self::new(&ErrorHandlingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    struct ChannelReporter {
        tx: mpsc::UnboundedSender<ErrorCode>,
    }

    #[async_trait]
    impl ErrorReporter for ChannelReporter {
        async fn report(&self, error: &ActionError) -> anyhow::Result<()> {
            self.tx.send(error.code).ok();
            Ok(())
        }
    }

    struct MockRecovery {
        name: &'static str,
        succeed: bool,
        calls: AtomicUsize,
    }

    impl MockRecovery {
        fn new(name: &'static str, succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                succeed,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RecoveryStrategy for MockRecovery {
        fn name(&self) -> &str {
            self.name
        }

        fn can_recover(&self, error: &ActionError) -> bool {
            error.category == ErrorCategory::Network
        }

        async fn recover(&self, _error: &ActionError) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(())
            } else {
                anyhow::bail!("{} could not recover", self.name)
            }
        }
    }

    #[test]
    fn test_normalize_typed_errors() {
        let typed = ActionError::validation(ErrorCode::InvalidFilePath, "bad path");
        assert_eq!(ErrorHandlingService::normalize(typed.clone().into()), typed);

        let err = ErrorHandlingService::normalize(FileServiceError::NotFound("a.js".into()).into());
        assert_eq!(err.code, ErrorCode::FileNotFound);

        let err = ErrorHandlingService::normalize(
            std::io::Error::from(std::io::ErrorKind::PermissionDenied).into(),
        );
        assert_eq!(err.code, ErrorCode::Unauthorized);

        let err = ErrorHandlingService::normalize(
            PathSanitizerError::PathTraversal("../x".into()).into(),
        );
        assert_eq!(err.category, ErrorCategory::Security);
    }

    #[test]
    fn test_classify_untyped_messages() {
        let cases = [
            ("Validation failed: content is required", ErrorCategory::Validation),
            ("connection reset by peer", ErrorCategory::Network),
            ("File already exists: a.js", ErrorCategory::FileOperation),
            ("Operation timed out after 10ms", ErrorCategory::Network),
            ("something odd", ErrorCategory::System),
        ];
        for (message, category) in cases {
            let err = ErrorHandlingService::normalize(anyhow::anyhow!(message));
            assert_eq!(err.category, category, "{}", message);
            assert_eq!(err.message, message);
        }
    }

    #[test]
    fn test_normalize_keeps_cause_chain() {
        let err = anyhow::anyhow!("disk full").context("write failed");
        let normalized = ErrorHandlingService::normalize(err);
        assert_eq!(normalized.message, "write failed");
        assert_eq!(normalized.context.backtrace.as_deref(), Some("disk full"));
    }

    #[tokio::test]
    async fn test_history_is_bounded_and_statistics() {
        let service = ErrorHandlingService::new(&ErrorHandlingConfig { history_limit: 2 });
        service
            .handle_error(ActionError::validation(ErrorCode::ValidationFailed, "a"))
            .await;
        service
            .handle_error(ActionError::network(ErrorCode::NetworkError, "b"))
            .await;
        service
            .handle_error(ActionError::network(ErrorCode::Timeout, "c"))
            .await;

        let history = service.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message, "b");

        let stats = service.statistics();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_category.get(&ErrorCategory::Network), Some(&2));
        assert_eq!(stats.retryable_ratio, 1.0);

        service.clear_history();
        assert_eq!(service.statistics(), ErrorStatistics::default());
    }

    #[tokio::test]
    async fn test_critical_errors_are_reported() {
        let service = ErrorHandlingService::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        service.set_reporter(Arc::new(ChannelReporter { tx }));

        service
            .handle_error(ActionError::system(ErrorCode::SystemError, "boom").with_severity(Severity::Critical))
            .await;
        service
            .handle_error(ActionError::system(ErrorCode::SystemError, "meh"))
            .await;

        assert_eq!(rx.recv().await, Some(ErrorCode::SystemError));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_recovery_chain_tries_next_on_failure() {
        let service = ErrorHandlingService::default();
        let failing = MockRecovery::new("reconnect", false);
        let working = MockRecovery::new("fallback", true);
        let unused = MockRecovery::new("unused", true);
        service.add_recovery_strategy(failing.clone());
        service.add_recovery_strategy(working.clone());
        service.add_recovery_strategy(unused.clone());

        let handled = service
            .handle_error(ActionError::network(ErrorCode::ConnectionFailed, "refused"))
            .await;

        assert!(handled.recovered);
        assert_eq!(handled.recovered_by.as_deref(), Some("fallback"));
        assert_eq!(handled.error.message, "refused");
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(unused.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_skip_recovery() {
        let service = ErrorHandlingService::default();
        let strategy = MockRecovery::new("any", true);
        service.add_recovery_strategy(strategy.clone());

        let handled = service
            .handle_error(ActionError::security(ErrorCode::PathTraversal, "traversal"))
            .await;
        assert!(!handled.recovered);
        assert_eq!(strategy.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_user_message() {
        let friendly = ActionError::file_operation(ErrorCode::FileNotFound, "File does not exist: a.js");
        assert_eq!(ErrorHandlingService::user_message(&friendly), "File does not exist: a.js");

        let internal = ActionError::security(ErrorCode::PathTraversal, "raw detail");
        assert_eq!(
            ErrorHandlingService::user_message(&internal),
            "This action was blocked for security reasons."
        );
    }
}
