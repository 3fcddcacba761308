// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! File Service Infrastructure Module
//!
//! Concrete implementations of the [`FileService`] trait for the storage
//! backends selectable from configuration.

pub mod http;
pub mod local;
pub mod memory;

pub use http::HttpFileService;
pub use local::LocalFileService;
pub use memory::InMemoryFileService;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::domain::config::{FileServiceBackend, FileServiceConfig};
use crate::domain::workspace::FileService;

/// Builds the file service selected by `config.backend`.
pub fn create_file_service(config: &FileServiceConfig) -> anyhow::Result<Arc<dyn FileService>> {
    match config.backend {
        FileServiceBackend::Http => {
            let base_url = config
                .base_url
                .as_deref()
                .context("file_service.base_url is required for the http backend")?;
            let service = HttpFileService::with_timeout(base_url, Duration::from_millis(config.request_timeout_ms))
                .context("Failed to build storage API client")?;
            Ok(Arc::new(service))
        }
        FileServiceBackend::Local => {
            let service = LocalFileService::new(&config.root)
                .with_context(|| format!("Failed to open workspace root {}", config.root.display()))?;
            Ok(Arc::new(service))
        }
        FileServiceBackend::Memory => Ok(Arc::new(InMemoryFileService::new())),
    }
}
