// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod editor;
pub mod event_bus;
pub mod file_service;
pub mod telemetry;

pub use editor::InMemoryEditorService;
pub use event_bus::{EventBus, EventBusError, EventReceiver};
pub use file_service::{HttpFileService, InMemoryFileService, LocalFileService};
