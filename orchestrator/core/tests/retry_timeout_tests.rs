// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

mod common;

use actionflow_core::application::context::OperationContext;
use actionflow_core::application::orchestrator::FileOperationOrchestrator;
use actionflow_core::application::strategies::FileOperationStrategy;
use actionflow_core::domain::action::{ActionType, AiAction};
use actionflow_core::domain::config::OrchestratorConfig;
use actionflow_core::domain::errors::{ActionError, ErrorCode};
use actionflow_core::domain::operation::{OperationMetadata, OperationResult, OperationStatus, ProgressCallback};
use async_trait::async_trait;
use common::{memory_context, progress_recorder};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Create-handling strategy that fails with a fixed error until it has been
/// called `succeed_on` times.
struct ScriptedStrategy {
    error: ActionError,
    succeed_on: Option<usize>,
    delay: Option<Duration>,
    cancel_on_failure: bool,
    calls: parking_lot::Mutex<Vec<Instant>>,
}

impl ScriptedStrategy {
    fn failing(error: ActionError) -> Self {
        Self {
            error,
            succeed_on: None,
            delay: None,
            cancel_on_failure: false,
            calls: parking_lot::Mutex::new(Vec::new()),
        }
    }

    fn succeeding_on(mut self, call: usize) -> Self {
        self.succeed_on = Some(call);
        self
    }

    fn hanging(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn cancelling(mut self) -> Self {
        self.cancel_on_failure = true;
        self
    }

    fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl FileOperationStrategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn priority(&self) -> u32 {
        0
    }

    fn can_handle(&self, action: &AiAction) -> bool {
        action.action_type == ActionType::Create
    }

    async fn validate(&self, _action: &AiAction, _context: &OperationContext) -> Result<(), ActionError> {
        Ok(())
    }

    async fn execute(
        &self,
        action: &AiAction,
        context: &OperationContext,
        _on_progress: Option<&ProgressCallback>,
    ) -> Result<OperationResult, ActionError> {
        let call = {
            let mut calls = self.calls.lock();
            calls.push(Instant::now());
            calls.len()
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.succeed_on == Some(call) {
            return Ok(OperationResult::succeeded(
                ActionType::Create,
                action.target_path(),
                OperationMetadata::default(),
            ));
        }
        if self.cancel_on_failure {
            context.cancellation.cancel();
        }
        Err(self.error.clone())
    }

    fn estimate_complexity(&self, _action: &AiAction) -> f64 {
        1.0
    }
}

fn orchestrator_with(strategy: Arc<ScriptedStrategy>, config: OrchestratorConfig) -> FileOperationOrchestrator {
    let orchestrator = FileOperationOrchestrator::new(config);
    orchestrator.register_strategy(strategy);
    orchestrator
}

fn millis_between(a: Instant, b: Instant) -> u128 {
    b.duration_since(a).as_millis()
}

#[tokio::test(start_paused = true)]
async fn test_retryable_failure_backs_off_exponentially() {
    let (ctx, _, _) = memory_context();
    let strategy = Arc::new(ScriptedStrategy::failing(ActionError::network(
        ErrorCode::ConnectionFailed,
        "connection reset by peer",
    )));
    let orchestrator = orchestrator_with(strategy.clone(), OrchestratorConfig::default());

    let err = orchestrator
        .execute_action(&AiAction::create("a.txt", "x"), &ctx, None)
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::ConnectionFailed);
    let calls = strategy.call_times();
    assert_eq!(calls.len(), 3);
    let first_gap = millis_between(calls[0], calls[1]);
    let second_gap = millis_between(calls[1], calls[2]);
    assert!((1000..1100).contains(&first_gap), "first gap {}ms", first_gap);
    assert!((2000..2100).contains(&second_gap), "second gap {}ms", second_gap);
}

#[tokio::test(start_paused = true)]
async fn test_success_after_retry_reports_attempts() {
    let (ctx, _, _) = memory_context();
    let strategy = Arc::new(
        ScriptedStrategy::failing(ActionError::network(ErrorCode::NetworkError, "socket hang up")).succeeding_on(2),
    );
    let orchestrator = orchestrator_with(strategy.clone(), OrchestratorConfig::default());

    let result = orchestrator
        .execute_action(&AiAction::create("a.txt", "x"), &ctx, None)
        .await
        .unwrap();

    assert_eq!(result.metadata.attempts, Some(2));
    assert_eq!(strategy.call_times().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_message_is_attempted_once() {
    let (ctx, _, _) = memory_context();
    let strategy = Arc::new(ScriptedStrategy::failing(ActionError::system(
        ErrorCode::SystemError,
        "Schema VALIDATION rejected the payload",
    )));
    let orchestrator = orchestrator_with(strategy.clone(), OrchestratorConfig::default());

    orchestrator
        .execute_action(&AiAction::create("a.txt", "x"), &ctx, None)
        .await
        .unwrap_err();

    assert_eq!(strategy.call_times().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_fails_with_timeout_error() {
    let (ctx, _, _) = memory_context();
    let strategy = Arc::new(
        ScriptedStrategy::failing(ActionError::system(ErrorCode::SystemError, "unreachable"))
            .hanging(Duration::from_secs(60)),
    );
    let config = OrchestratorConfig {
        operation_timeout_ms: 100,
        retry_attempts: 1,
        ..Default::default()
    };
    let orchestrator = orchestrator_with(strategy, config);
    let (cb, seen) = progress_recorder();

    let started = Instant::now();
    let err = orchestrator
        .execute_action(&AiAction::create("slow.txt", "x"), &ctx, Some(&cb))
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::Timeout);
    assert_eq!(err.message, "Operation timed out after 100ms");
    assert!(started.elapsed() < Duration::from_secs(1));
    let last = seen.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.status, OperationStatus::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_interrupts_backoff() {
    let (ctx, _, _) = memory_context();
    let strategy = Arc::new(
        ScriptedStrategy::failing(ActionError::network(ErrorCode::ConnectionFailed, "connection refused")).cancelling(),
    );
    let orchestrator = orchestrator_with(strategy.clone(), OrchestratorConfig::default());

    let err = orchestrator
        .execute_action(&AiAction::create("a.txt", "x"), &ctx, None)
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::Cancelled);
    assert_eq!(strategy.call_times().len(), 1);
}
