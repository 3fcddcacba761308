// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! Value types, the error taxonomy and the collaborator traits shared by the
//! application and infrastructure layers. Nothing here performs I/O.

pub mod action;
pub mod config;
pub mod errors;
pub mod events;
pub mod operation;
pub mod path_sanitizer;
pub mod security;
pub mod workspace;
