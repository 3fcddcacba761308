// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Operation timing through the `metrics` facade.
//!
//! Without an installed recorder the macros are no-ops, so library users pay
//! nothing unless they opt in.

use std::future::Future;
use std::time::Instant;

pub const OPERATION_DURATION_SECONDS: &str = "actionflow_operation_duration_seconds";
pub const OPERATIONS_TOTAL: &str = "actionflow_operations_total";

/// Runs `future`, then records its wall time and outcome under `operation`.
pub async fn timed<T, E, F>(operation: &str, future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let started = Instant::now();
    let result = future.await;
    let outcome = if result.is_ok() { "success" } else { "failure" };

    metrics::histogram!(OPERATION_DURATION_SECONDS, "operation" => operation.to_string())
        .record(started.elapsed().as_secs_f64());
    metrics::counter!(OPERATIONS_TOTAL, "operation" => operation.to_string(), "outcome" => outcome).increment(1);

    result
}
