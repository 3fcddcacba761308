// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Actionflow Core
//!
//! Validation and execution pipeline for file actions proposed by an AI agent.
//!
//! # Architecture
//!
//! - **domain:** actions, results, events, errors, configuration, collaborator traits
//! - **application:** validation, per-action strategies, orchestrator, error handling
//! - **infrastructure:** event bus, file service adapters, editor state, timing

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
