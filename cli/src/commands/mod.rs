// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the actionflow CLI

pub mod apply;
pub mod config;
pub mod estimate;
pub mod validate;

pub use self::config::ConfigCommand;
