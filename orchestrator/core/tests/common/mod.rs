// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

#![allow(dead_code)]

use actionflow_core::application::context::OperationContext;
use actionflow_core::domain::operation::{OperationProgress, ProgressCallback};
use actionflow_core::infrastructure::editor::InMemoryEditorService;
use actionflow_core::infrastructure::file_service::InMemoryFileService;
use std::sync::{Arc, Mutex};

pub const WS: &str = "ws-integration";

pub fn memory_context() -> (OperationContext, Arc<InMemoryFileService>, Arc<InMemoryEditorService>) {
    let files = Arc::new(InMemoryFileService::new());
    let editor = Arc::new(InMemoryEditorService::new());
    let ctx = OperationContext::new(WS, files.clone(), editor.clone());
    (ctx, files, editor)
}

pub fn progress_recorder() -> (ProgressCallback, Arc<Mutex<Vec<OperationProgress>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let cb: ProgressCallback = Arc::new(move |p| sink.lock().unwrap().push(p));
    (cb, seen)
}
