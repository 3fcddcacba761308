// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Path Sanitizer Domain Service
//!
//! Separator normalization and workspace-boundary resolution for file paths
//! proposed by the AI. Validation of the path string itself (encodings,
//! character sets, extensions) happens in
//! [`crate::application::validation_service::ValidationService`]; this service
//! answers a narrower question for storage adapters: where on disk does a
//! workspace-relative path land, and is that still inside the workspace.
//!
//! # Security Guarantees
//! - Rejects paths containing `..` components
//! - Normalizes separators (`\` → `/`)
//! - Rejects absolute and drive-prefixed paths when resolving against a root
//! - Rejects NUL bytes

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathSanitizerError {
    #[error("Path traversal attempt detected: {0}")]
    PathTraversal(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path outside workspace boundary: {0}")]
    OutsideBoundary(String),

    #[error("Path too long: {0}")]
    PathTooLong(String),
}

pub struct PathSanitizer {
    max_path_len: usize,
}

impl PathSanitizer {
    pub fn new() -> Self {
        Self { max_path_len: 4096 }
    }

    pub fn with_max_length(max_path_len: usize) -> Self {
        Self { max_path_len }
    }

    /// Normalizes separators and drops empty and `.` segments.
    ///
    /// `src\\components/./App.tsx` becomes `src/components/App.tsx`. A leading
    /// `/` is preserved so absolute paths stay recognizable.
    pub fn normalize(path: &str) -> String {
        let unified = path.replace('\\', "/");
        let absolute = unified.starts_with('/');
        let joined = unified
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect::<Vec<_>>()
            .join("/");
        if absolute {
            format!("/{}", joined)
        } else {
            joined
        }
    }

    /// Lightweight string check usable before any filesystem access.
    pub fn validate(&self, path: &str) -> Result<(), PathSanitizerError> {
        if path.len() > self.max_path_len {
            return Err(PathSanitizerError::PathTooLong(path.to_string()));
        }

        if path.contains('\0') {
            tracing::warn!(path = %path.escape_debug(), "Path contains null byte");
            return Err(PathSanitizerError::InvalidPath(
                "Path contains null byte".to_string(),
            ));
        }

        if Self::normalize(path).split('/').any(|segment| segment == "..") {
            tracing::warn!(path = %path, "Path traversal segment rejected");
            return Err(PathSanitizerError::PathTraversal(path.to_string()));
        }

        Ok(())
    }

    /// Resolves a workspace-relative path to a location under `workspace_root`.
    ///
    /// # Examples
    /// ```
    /// use actionflow_core::domain::path_sanitizer::PathSanitizer;
    /// use std::path::{Path, PathBuf};
    ///
    /// let sanitizer = PathSanitizer::new();
    /// let root = Path::new("/srv/workspaces/ws-1");
    ///
    /// let safe = sanitizer.resolve("src/./App.tsx", root).unwrap();
    /// assert_eq!(safe, PathBuf::from("/srv/workspaces/ws-1/src/App.tsx"));
    ///
    /// assert!(sanitizer.resolve("../ws-2/secrets.json", root).is_err());
    /// assert!(sanitizer.resolve("/etc/passwd", root).is_err());
    /// ```
    pub fn resolve(&self, path: &str, workspace_root: &Path) -> Result<PathBuf, PathSanitizerError> {
        self.validate(path)?;

        let normalized = Self::normalize(path);
        if normalized.is_empty() {
            return Err(PathSanitizerError::InvalidPath("Path is empty".to_string()));
        }

        let mut resolved = workspace_root.to_path_buf();
        for component in Path::new(&normalized).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(PathSanitizerError::PathTraversal(path.to_string()));
                }
                Component::RootDir | Component::Prefix(_) => {
                    tracing::warn!(path = %path, "Absolute path rejected during resolution");
                    return Err(PathSanitizerError::OutsideBoundary(path.to_string()));
                }
            }
        }

        if !resolved.starts_with(workspace_root) {
            return Err(PathSanitizerError::OutsideBoundary(path.to_string()));
        }

        Ok(resolved)
    }

    /// Inverse of [`resolve`](Self::resolve): the workspace-relative path of a
    /// file found under `workspace_root`, with `/` separators.
    pub fn strip_workspace_root(
        &self,
        absolute_path: &Path,
        workspace_root: &Path,
    ) -> Result<String, PathSanitizerError> {
        let relative = absolute_path
            .strip_prefix(workspace_root)
            .map_err(|_| PathSanitizerError::OutsideBoundary(absolute_path.display().to_string()))?;

        Ok(relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/"))
    }
}

impl Default for PathSanitizer {
    fn default() -> Self {
        Self::new()
    }
}
