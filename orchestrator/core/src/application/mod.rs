// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod context;
pub mod error_handling;
pub mod orchestrator;
pub mod strategies;
pub mod validation_service;

pub use context::OperationContext;
pub use error_handling::{ErrorHandlingService, ErrorReporter, RecoveryStrategy};
pub use orchestrator::FileOperationOrchestrator;
pub use strategies::{FileOperationStrategy, StrategyRegistry};
pub use validation_service::ValidationService;
