// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # File Operation Orchestrator
//!
//! Entry point for executing AI-proposed actions. For each action:
//!
//! 1. reject early if the context's cancellation token fired
//! 2. `ValidationService::validate_ai_action` (required fields, shell safety)
//! 3. select a strategy from the [`StrategyRegistry`]
//! 4. `strategy.validate` (path, content, existence precondition)
//! 5. `strategy.execute` under a timeout, retried with exponential backoff
//!
//! Every action ends with an `ai.action.processed` event, and every failure
//! is routed through the context's [`ErrorHandlingService`] before it is
//! returned.
//!
//! ## Concurrency
//!
//! [`FileOperationOrchestrator::execute_concurrent`] partitions actions by
//! target path. Actions on the same path always run one after another in
//! input order; at most `max_concurrent_operations` path groups run at once.
//!
//! ## Timeouts
//!
//! A timed-out strategy future is dropped at its next suspension point. A
//! storage request already sent may still complete on the server, so a
//! timeout does not guarantee the write did not happen.
//!
//! [`ErrorHandlingService`]: crate::application::error_handling::ErrorHandlingService

use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::application::context::OperationContext;
use crate::application::strategies::{FileOperationStrategy, StrategyRegistry, UNSUPPORTED_COMPLEXITY};
use crate::domain::action::{AiAction, AiArtifact};
use crate::domain::config::OrchestratorConfig;
use crate::domain::errors::{ActionError, ErrorCode};
use crate::domain::events::DomainEvent;
use crate::domain::operation::{
    report, BatchOperationResult, OperationProgress, OperationResult, ProgressCallback,
};
use crate::domain::path_sanitizer::PathSanitizer;
use crate::infrastructure::telemetry;

/// Advisory wall time per complexity unit.
pub const MILLIS_PER_COMPLEXITY_UNIT: f64 = 2000.0;

/// Group key for actions without a target path.
const NO_FILE_GROUP: &str = "\0no-file";

pub struct FileOperationOrchestrator {
    config: OrchestratorConfig,
    registry: RwLock<StrategyRegistry>,
    non_retryable: Vec<Regex>,
}

impl FileOperationOrchestrator {
    /// Orchestrator with the built-in create, edit and delete strategies.
    pub fn new(config: OrchestratorConfig) -> Self {
        Self::with_registry(config, StrategyRegistry::with_builtin())
    }

    pub fn with_registry(config: OrchestratorConfig, registry: StrategyRegistry) -> Self {
        let non_retryable = config
            .non_retryable_patterns
            .iter()
            .filter_map(|pattern| {
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(regex) => Some(regex),
                    Err(e) => {
                        warn!(pattern = %pattern, error = %e, "Ignoring invalid non-retryable pattern");
                        None
                    }
                }
            })
            .collect();

        Self {
            config,
            registry: RwLock::new(registry),
            non_retryable,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn register_strategy(&self, strategy: Arc<dyn FileOperationStrategy>) {
        info!(strategy = strategy.name(), "Registering strategy");
        self.registry.write().register(strategy);
    }

    /// Returns `true` if a strategy with that name was registered.
    pub fn unregister_strategy(&self, name: &str) -> bool {
        let removed = self.registry.write().unregister(name);
        if removed {
            info!(strategy = name, "Unregistered strategy");
        }
        removed
    }

    /// Registered strategies in dispatch order.
    pub fn strategies(&self) -> Vec<Arc<dyn FileOperationStrategy>> {
        self.registry.read().strategies().to_vec()
    }

    fn select_strategy(&self, action: &AiAction) -> Result<Arc<dyn FileOperationStrategy>, ActionError> {
        self.registry.read().select(action)
    }

    /// Validates and executes a single action.
    ///
    /// Emits `ai.action.processed` whatever the outcome. Failures are passed
    /// to the context's error handler and then returned unchanged.
    pub async fn execute_action(
        &self,
        action: &AiAction,
        context: &OperationContext,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<OperationResult, ActionError> {
        let started = Instant::now();
        let path = action.target_path();
        let outcome = self
            .run_action(action, context, on_progress)
            .await
            .map_err(|e| e.in_context(action.action_type.as_str(), &context.workspace_id, path));
        let duration_ms = started.elapsed().as_millis() as u64;

        let failure = outcome.as_ref().err().map(|e| e.message.clone());
        if let Err(e) = context.event_bus.emit(DomainEvent::action_processed(
            &context.workspace_id,
            action.action_type,
            path,
            failure,
            duration_ms,
        )) {
            warn!(error = %e, "Failed to emit action processed event");
        }

        match outcome {
            Ok(result) => {
                info!(
                    action = %action.action_type,
                    file_path = path.unwrap_or_default(),
                    duration_ms,
                    "Action processed"
                );
                Ok(result)
            }
            Err(e) => {
                error!(
                    action = %action.action_type,
                    file_path = path.unwrap_or_default(),
                    code = e.code.as_str(),
                    error = %e,
                    "Action failed"
                );
                let handled = context.error_handler.handle_error(e.clone()).await;
                if handled.recovered {
                    debug!(recovered_by = ?handled.recovered_by, "Recovery strategy handled failure");
                }
                Err(e)
            }
        }
    }

    async fn run_action(
        &self,
        action: &AiAction,
        context: &OperationContext,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<OperationResult, ActionError> {
        if context.is_cancelled() {
            return Err(ActionError::cancelled("Operation cancelled before start"));
        }

        let checked = context.validation_service.validate_ai_action(action);
        if !checked.is_valid {
            return Err(if checked.is_dangerous() {
                ActionError::security(ErrorCode::UnsafeCommand, checked.summary())
            } else {
                ActionError::validation(ErrorCode::MissingRequiredField, checked.summary())
            });
        }
        for warning in &checked.warnings {
            warn!(action = %action.action_type, warning = %warning, "Action warning");
        }

        let strategy = self.select_strategy(action)?;
        debug!(strategy = strategy.name(), action = %action.action_type, "Strategy selected");

        strategy.validate(action, context).await?;
        self.execute_with_retry(strategy.as_ref(), action, context, on_progress)
            .await
    }

    async fn execute_with_retry(
        &self,
        strategy: &dyn FileOperationStrategy,
        action: &AiAction,
        context: &OperationContext,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<OperationResult, ActionError> {
        let max_attempts = self.config.retry_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.execute_with_timeout(strategy, action, context, on_progress).await {
                Ok(mut result) => {
                    result.metadata.attempts = Some(attempt);
                    return Ok(result);
                }
                Err(e) if attempt >= max_attempts || !self.should_retry(&e) => return Err(e),
                Err(e) => {
                    let delay = self.config.retry_delay() * 2_u32.saturating_pow(attempt - 1);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Operation failed, retrying"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = context.cancellation.cancelled() => {
                            return Err(ActionError::cancelled("Operation cancelled during retry backoff"));
                        }
                    }
                }
            }
        }
    }

    async fn execute_with_timeout(
        &self,
        strategy: &dyn FileOperationStrategy,
        action: &AiAction,
        context: &OperationContext,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<OperationResult, ActionError> {
        let timeout = self.config.operation_timeout();
        let execution = async {
            match tokio::time::timeout(timeout, strategy.execute(action, context, on_progress)).await {
                Ok(result) => result,
                Err(_) => {
                    let err = ActionError::timeout(self.config.operation_timeout_ms);
                    report_failure(action, on_progress, &err);
                    Err(err)
                }
            }
        };

        tokio::select! {
            result = telemetry::timed(strategy.name(), execution) => result,
            _ = context.cancellation.cancelled() => {
                let err = ActionError::cancelled("Operation cancelled");
                report_failure(action, on_progress, &err);
                Err(err)
            }
        }
    }

    fn should_retry(&self, error: &ActionError) -> bool {
        error.code != ErrorCode::Cancelled && !self.non_retryable.iter().any(|re| re.is_match(&error.message))
    }

    /// Runs an artifact's actions in order, stopping at the first failure.
    ///
    /// Progress is weighted by each action's complexity. Actions after a
    /// failure, or after cancellation, are never attempted and count as
    /// failed.
    pub async fn execute_artifact(
        &self,
        artifact: &AiArtifact,
        context: &OperationContext,
        on_progress: Option<&ProgressCallback>,
    ) -> BatchOperationResult {
        let total = artifact.len();
        let artifact_id = artifact.id.as_deref().unwrap_or("-");
        info!(artifact_id, actions = total, "Executing artifact");

        let weights: Vec<f64> = artifact.actions.iter().map(|a| self.estimate_complexity(a)).collect();
        let total_weight: f64 = weights.iter().sum::<f64>().max(f64::EPSILON);
        let mut completed_weight = 0.0;

        let mut results = Vec::with_capacity(total);
        let mut errors = Vec::new();

        for (index, (action, weight)) in artifact.actions.iter().zip(weights).enumerate() {
            if context.is_cancelled() {
                warn!(artifact_id, remaining = total - index, "Artifact cancelled");
                errors.push(format!("Cancelled before action {} of {}", index + 1, total));
                break;
            }

            let scaled = on_progress.map(|callback| weighted(callback.clone(), completed_weight, weight, total_weight));
            match self.execute_action(action, context, scaled.as_ref()).await {
                Ok(result) => {
                    completed_weight += weight;
                    results.push(result);
                }
                Err(e) => {
                    results.push(OperationResult::failed(action.action_type, action.target_path(), e.message.clone()));
                    errors.push(e.message);
                    break;
                }
            }
        }

        let batch = BatchOperationResult::from_results(total, results, errors);
        info!(
            artifact_id,
            successful = batch.successful_operations,
            failed = batch.failed_operations,
            "Artifact finished"
        );
        batch
    }

    /// Runs actions with per-path serialization and bounded parallelism.
    ///
    /// Every action is attempted; results come back in input order.
    pub async fn execute_concurrent(
        &self,
        actions: &[AiAction],
        context: &OperationContext,
        on_progress: Option<&ProgressCallback>,
    ) -> BatchOperationResult {
        let groups = group_by_path(actions);
        let limit = self.config.max_concurrent_operations.max(1);
        debug!(actions = actions.len(), groups = groups.len(), limit, "Executing concurrently");

        let mut outcomes: Vec<(usize, Result<OperationResult, ActionError>)> = stream::iter(groups)
            .map(|members| async move {
                let mut out = Vec::with_capacity(members.len());
                for index in members {
                    let outcome = self.execute_action(&actions[index], context, on_progress).await;
                    out.push((index, outcome));
                }
                out
            })
            .buffer_unordered(limit)
            .flat_map(stream::iter)
            .collect()
            .await;
        outcomes.sort_by_key(|(index, _)| *index);

        let mut results = Vec::with_capacity(outcomes.len());
        let mut errors = Vec::new();
        for (index, outcome) in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) => {
                    let action = &actions[index];
                    results.push(OperationResult::failed(action.action_type, action.target_path(), e.message.clone()));
                    errors.push(e.message);
                }
            }
        }
        BatchOperationResult::from_results(actions.len(), results, errors)
    }

    /// Complexity of one action under the strategy that would run it.
    pub fn estimate_complexity(&self, action: &AiAction) -> f64 {
        self.select_strategy(action)
            .map(|s| s.estimate_complexity(action))
            .unwrap_or(UNSUPPORTED_COMPLEXITY)
    }

    /// Advisory wall time: two seconds per complexity unit.
    pub fn estimate_execution_time(&self, actions: &[AiAction]) -> Duration {
        let units: f64 = actions.iter().map(|a| self.estimate_complexity(a)).sum();
        Duration::from_millis((units * MILLIS_PER_COMPLEXITY_UNIT).round() as u64)
    }
}

impl Default for FileOperationOrchestrator {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default())
    }
}

fn report_failure(action: &AiAction, on_progress: Option<&ProgressCallback>, error: &ActionError) {
    report(
        on_progress,
        OperationProgress::failed(action.action_type, action.target_path(), error.message.clone()),
    );
}

/// Maps one action's 0..=100 progress onto the artifact-wide scale.
fn weighted(callback: ProgressCallback, base: f64, weight: f64, total: f64) -> ProgressCallback {
    Arc::new(move |mut progress: OperationProgress| {
        if let Some(value) = progress.progress {
            let overall = (base + weight * f64::from(value) / 100.0) / total * 100.0;
            progress.progress = Some(overall.round().clamp(0.0, 100.0) as u8);
        }
        callback(progress)
    })
}

/// Indices grouped by normalized target path, groups in first-seen order.
/// Actions without a path share one group.
fn group_by_path(actions: &[AiAction]) -> Vec<Vec<usize>> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (index, action) in actions.iter().enumerate() {
        let key = action
            .target_path()
            .map(PathSanitizer::normalize)
            .unwrap_or_else(|| NO_FILE_GROUP.to_string());
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(index);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::strategies::test_support::{context, recorder, WS};
    use crate::domain::action::ActionType;
    use crate::domain::events::{EventPayload, AI_ACTION_PROCESSED};
    use crate::domain::operation::OperationStatus;

    fn fast_config() -> OrchestratorConfig {
        OrchestratorConfig {
            retry_delay_ms: 10,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_then_edit() {
        let (ctx, files, _) = context();
        let orchestrator = FileOperationOrchestrator::new(fast_config());

        let created = orchestrator
            .execute_action(&AiAction::create("src/a.ts", "export const a = 1;"), &ctx, None)
            .await
            .unwrap();
        assert_eq!(created.metadata.attempts, Some(1));

        orchestrator
            .execute_action(&AiAction::edit("src/a.ts", "export const a = 2;"), &ctx, None)
            .await
            .unwrap();
        assert_eq!(files.content(WS, "src/a.ts").as_deref(), Some("export const a = 2;"));

        let processed = ctx.event_bus.history(Some(AI_ACTION_PROCESSED));
        assert_eq!(processed.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_path_is_rejected_before_dispatch() {
        let (ctx, files, _) = context();
        let orchestrator = FileOperationOrchestrator::new(fast_config());
        let action = AiAction {
            action_type: ActionType::Create,
            file_path: None,
            content: Some("x".into()),
            command: None,
        };

        let err = orchestrator.execute_action(&action, &ctx, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingRequiredField);
        assert_eq!(files.call_count("file_exists"), 0);
        assert_eq!(ctx.error_handler.history().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_type() {
        let (ctx, _, _) = context();
        let orchestrator = FileOperationOrchestrator::new(fast_config());
        let err = orchestrator
            .execute_action(&AiAction::start("npm run dev"), &ctx, None)
            .await
            .unwrap_err();
        assert_eq!(err.message, "Unsupported operation type: start");
    }

    #[tokio::test]
    async fn test_dangerous_command_is_a_security_error() {
        let (ctx, _, _) = context();
        let orchestrator = FileOperationOrchestrator::new(fast_config());
        let err = orchestrator
            .execute_action(&AiAction::shell("rm -rf /"), &ctx, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsafeCommand);
    }

    #[tokio::test]
    async fn test_failure_event_carries_error() {
        let (ctx, _, _) = context();
        let orchestrator = FileOperationOrchestrator::new(fast_config());
        orchestrator
            .execute_action(&AiAction::delete("ghost.txt"), &ctx, None)
            .await
            .unwrap_err();

        let events = ctx.event_bus.history(Some(AI_ACTION_PROCESSED));
        match &events[0].payload {
            EventPayload::AiActionProcessed { success, error, .. } => {
                assert!(!success);
                assert_eq!(error.as_deref(), Some("File does not exist: ghost.txt"));
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_context_fails_fast() {
        let (ctx, files, _) = context();
        ctx.cancellation.cancel();
        let orchestrator = FileOperationOrchestrator::new(fast_config());

        let err = orchestrator
            .execute_action(&AiAction::create("a.txt", "x"), &ctx, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Cancelled);
        assert!(files.content(WS, "a.txt").is_none());
    }

    #[tokio::test]
    async fn test_artifact_progress_is_weighted_and_monotonic() {
        let (ctx, _, _) = context();
        let orchestrator = FileOperationOrchestrator::new(fast_config());
        let artifact = AiArtifact::new(vec![AiAction::create("a.js", "1"), AiAction::create("b.js", "2")]);
        let (cb, seen) = recorder();

        let batch = orchestrator.execute_artifact(&artifact, &ctx, Some(&cb)).await;
        assert!(batch.success);

        let values: Vec<u8> = seen.lock().unwrap().iter().filter_map(|p| p.progress).collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "{:?}", values);
        assert_eq!(values.last(), Some(&100));
        assert!(values.contains(&50));
        let last = seen.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.status, OperationStatus::Completed);
    }

    #[tokio::test]
    async fn test_strategy_registration() {
        let orchestrator = FileOperationOrchestrator::default();
        let names: Vec<String> = orchestrator.strategies().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["create", "edit", "delete"]);

        assert!(orchestrator.unregister_strategy("delete"));
        assert!(!orchestrator.unregister_strategy("delete"));
        assert_eq!(orchestrator.estimate_complexity(&AiAction::delete("a")), UNSUPPORTED_COMPLEXITY);
    }

    #[test]
    fn test_estimate_execution_time() {
        let orchestrator = FileOperationOrchestrator::default();
        let actions = vec![
            AiAction::create("a.js", ""),
            AiAction::delete("b.js"),
            AiAction::shell("ls"),
        ];
        // 1.0 + 0.5 + 1.0 units
        assert_eq!(orchestrator.estimate_execution_time(&actions), Duration::from_millis(5000));
        assert_eq!(orchestrator.estimate_execution_time(&[]), Duration::ZERO);
    }

    #[test]
    fn test_grouping_normalizes_paths() {
        let actions = vec![
            AiAction::create("src/a.js", "1"),
            AiAction::shell("ls"),
            AiAction::edit("src\\a.js", "2"),
            AiAction::create("b.js", "3"),
            AiAction::start("npm start"),
        ];
        assert_eq!(group_by_path(&actions), vec![vec![0, 2], vec![1, 4], vec![3]]);
    }

    #[test]
    fn test_invalid_pattern_is_ignored() {
        let config = OrchestratorConfig {
            non_retryable_patterns: vec!["(".into(), "validation".into()],
            ..Default::default()
        };
        let orchestrator = FileOperationOrchestrator::new(config);
        assert_eq!(orchestrator.non_retryable.len(), 1);
        assert!(!orchestrator.should_retry(&ActionError::validation(ErrorCode::ValidationFailed, "VALIDATION failed")));
        assert!(orchestrator.should_retry(&ActionError::timeout(10)));
        assert!(!orchestrator.should_retry(&ActionError::cancelled("stop")));
    }
}
