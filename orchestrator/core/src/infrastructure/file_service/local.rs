// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Local Filesystem File Service
//!
//! Stores each workspace as a directory under a common root:
//! `{root}/{workspace_id}/{file_path}`. Every path goes through
//! [`PathSanitizer`] before it reaches the filesystem, so no read or write
//! can leave its workspace directory.
//!
//! **Limitations:**
//! - Single node only; nothing is replicated
//! - No locking across processes sharing the same root

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::domain::action::ActionType;
use crate::domain::path_sanitizer::{PathSanitizer, PathSanitizerError};
use crate::domain::workspace::{FileOperationResult, FileService, FileServiceError};

pub struct LocalFileService {
    /// Directory holding one subdirectory per workspace
    root: PathBuf,
    sanitizer: PathSanitizer,
}

impl LocalFileService {
    /// Opens (creating if needed) a workspace root and checks it is writable.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, FileServiceError> {
        let root = root.into();

        std::fs::create_dir_all(&root).map_err(|e| {
            FileServiceError::Io(format!("Failed to create workspace root {}: {}", root.display(), e))
        })?;

        let probe = root.join(".actionflow-write-test");
        std::fs::write(&probe, b"probe").map_err(|e| {
            FileServiceError::Io(format!("Workspace root {} is not writable: {}", root.display(), e))
        })?;
        std::fs::remove_file(&probe)
            .map_err(|e| FileServiceError::Io(format!("Failed to clean up write probe: {}", e)))?;

        Ok(Self {
            root,
            sanitizer: PathSanitizer::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn workspace_dir(&self, workspace_id: &str) -> Result<PathBuf, FileServiceError> {
        if workspace_id.is_empty() || workspace_id.contains(['/', '\\']) {
            return Err(FileServiceError::InvalidPath(format!(
                "Invalid workspace id: {}",
                workspace_id
            )));
        }
        self.sanitizer
            .resolve(workspace_id, &self.root)
            .map_err(sanitizer_error)
    }

    fn resolve(&self, workspace_id: &str, file_path: &str) -> Result<PathBuf, FileServiceError> {
        let workspace = self.workspace_dir(workspace_id)?;
        self.sanitizer
            .resolve(file_path, &workspace)
            .map_err(sanitizer_error)
    }

    async fn ensure_parent(path: &Path) -> Result<(), FileServiceError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

fn sanitizer_error(err: PathSanitizerError) -> FileServiceError {
    FileServiceError::InvalidPath(err.to_string())
}

fn not_found_as(file_path: &str, err: std::io::Error) -> FileServiceError {
    if err.kind() == std::io::ErrorKind::NotFound {
        FileServiceError::NotFound(file_path.to_string())
    } else {
        err.into()
    }
}

#[async_trait]
impl FileService for LocalFileService {
    async fn create_file(
        &self,
        workspace_id: &str,
        file_path: &str,
        content: &str,
    ) -> Result<FileOperationResult, FileServiceError> {
        let target = self.resolve(workspace_id, file_path)?;
        Self::ensure_parent(&target).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => FileServiceError::AlreadyExists(file_path.to_string()),
                _ => e.into(),
            })?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        debug!(workspace_id, file_path, path = %target.display(), "Created file on disk");
        Ok(FileOperationResult::ok(ActionType::Create, file_path))
    }

    async fn update_file(
        &self,
        workspace_id: &str,
        file_path: &str,
        content: &str,
    ) -> Result<FileOperationResult, FileServiceError> {
        let target = self.resolve(workspace_id, file_path)?;
        if !tokio::fs::try_exists(&target).await? {
            return Err(FileServiceError::NotFound(file_path.to_string()));
        }
        tokio::fs::write(&target, content).await?;

        debug!(workspace_id, file_path, "Updated file on disk");
        Ok(FileOperationResult::ok(ActionType::Edit, file_path))
    }

    async fn delete_file(&self, workspace_id: &str, file_path: &str) -> Result<FileOperationResult, FileServiceError> {
        let target = self.resolve(workspace_id, file_path)?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|e| not_found_as(file_path, e))?;

        debug!(workspace_id, file_path, "Deleted file from disk");
        Ok(FileOperationResult::ok(ActionType::Delete, file_path))
    }

    async fn file_exists(&self, workspace_id: &str, file_path: &str) -> Result<bool, FileServiceError> {
        let target = self.resolve(workspace_id, file_path)?;
        Ok(tokio::fs::try_exists(&target).await?)
    }

    async fn list_files(&self, workspace_id: &str) -> Result<Vec<String>, FileServiceError> {
        let workspace = self.workspace_dir(workspace_id)?;
        if !tokio::fs::try_exists(&workspace).await? {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut pending = vec![workspace.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else {
                    files.push(
                        self.sanitizer
                            .strip_workspace_root(&path, &workspace)
                            .map_err(sanitizer_error)?,
                    );
                }
            }
        }
        files.sort();
        Ok(files)
    }

    async fn get_file_content(&self, workspace_id: &str, file_path: &str) -> Result<String, FileServiceError> {
        let target = self.resolve(workspace_id, file_path)?;
        tokio::fs::read_to_string(&target)
            .await
            .map_err(|e| not_found_as(file_path, e))
    }
}
