// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory file service for tests and dry runs.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

use crate::domain::action::ActionType;
use crate::domain::workspace::{FileOperationResult, FileService, FileServiceError};

#[derive(Default)]
struct State {
    /// (workspace_id, file_path) -> content
    files: HashMap<(String, String), String>,
    /// Failure injected into the next mutating call
    fail_next: Option<String>,
    calls: BTreeMap<&'static str, usize>,
}

/// `HashMap`-backed [`FileService`]. Nothing touches the disk.
#[derive(Default)]
pub struct InMemoryFileService {
    state: Mutex<State>,
}

impl InMemoryFileService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a file without going through the trait.
    pub fn insert(&self, workspace_id: &str, file_path: &str, content: impl Into<String>) {
        self.state
            .lock()
            .files
            .insert(key(workspace_id, file_path), content.into());
    }

    pub fn content(&self, workspace_id: &str, file_path: &str) -> Option<String> {
        self.state.lock().files.get(&key(workspace_id, file_path)).cloned()
    }

    /// Makes the next create/update/delete fail with an I/O error.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.state.lock().fail_next = Some(message.into());
    }

    /// Number of times the named trait method was called.
    pub fn call_count(&self, method: &str) -> usize {
        self.state.lock().calls.get(method).copied().unwrap_or(0)
    }

    fn record(state: &mut State, method: &'static str) {
        *state.calls.entry(method).or_default() += 1;
    }

    fn take_failure(state: &mut State) -> Result<(), FileServiceError> {
        match state.fail_next.take() {
            Some(message) => Err(FileServiceError::Io(message)),
            None => Ok(()),
        }
    }
}

fn key(workspace_id: &str, file_path: &str) -> (String, String) {
    (workspace_id.to_string(), file_path.to_string())
}

#[async_trait]
impl FileService for InMemoryFileService {
    async fn create_file(
        &self,
        workspace_id: &str,
        file_path: &str,
        content: &str,
    ) -> Result<FileOperationResult, FileServiceError> {
        let mut state = self.state.lock();
        Self::record(&mut state, "create_file");
        Self::take_failure(&mut state)?;

        let k = key(workspace_id, file_path);
        if state.files.contains_key(&k) {
            return Err(FileServiceError::AlreadyExists(file_path.to_string()));
        }
        state.files.insert(k, content.to_string());
        Ok(FileOperationResult::ok(ActionType::Create, file_path))
    }

    async fn update_file(
        &self,
        workspace_id: &str,
        file_path: &str,
        content: &str,
    ) -> Result<FileOperationResult, FileServiceError> {
        let mut state = self.state.lock();
        Self::record(&mut state, "update_file");
        Self::take_failure(&mut state)?;

        match state.files.get_mut(&key(workspace_id, file_path)) {
            Some(existing) => {
                *existing = content.to_string();
                Ok(FileOperationResult::ok(ActionType::Edit, file_path))
            }
            None => Err(FileServiceError::NotFound(file_path.to_string())),
        }
    }

    async fn delete_file(&self, workspace_id: &str, file_path: &str) -> Result<FileOperationResult, FileServiceError> {
        let mut state = self.state.lock();
        Self::record(&mut state, "delete_file");
        Self::take_failure(&mut state)?;

        match state.files.remove(&key(workspace_id, file_path)) {
            Some(_) => Ok(FileOperationResult::ok(ActionType::Delete, file_path)),
            None => Err(FileServiceError::NotFound(file_path.to_string())),
        }
    }

    async fn file_exists(&self, workspace_id: &str, file_path: &str) -> Result<bool, FileServiceError> {
        let mut state = self.state.lock();
        Self::record(&mut state, "file_exists");
        Ok(state.files.contains_key(&key(workspace_id, file_path)))
    }

    async fn list_files(&self, workspace_id: &str) -> Result<Vec<String>, FileServiceError> {
        let mut state = self.state.lock();
        Self::record(&mut state, "list_files");
        let mut files: Vec<String> = state
            .files
            .keys()
            .filter(|(ws, _)| ws == workspace_id)
            .map(|(_, path)| path.clone())
            .collect();
        files.sort();
        Ok(files)
    }

    async fn get_file_content(&self, workspace_id: &str, file_path: &str) -> Result<String, FileServiceError> {
        let mut state = self.state.lock();
        Self::record(&mut state, "get_file_content");
        state
            .files
            .get(&key(workspace_id, file_path))
            .cloned()
            .ok_or_else(|| FileServiceError::NotFound(file_path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_workspaces_are_isolated() {
        let service = InMemoryFileService::new();
        service.create_file("ws-1", "a.txt", "one").await.unwrap();
        service.create_file("ws-2", "a.txt", "two").await.unwrap();

        assert_eq!(service.get_file_content("ws-1", "a.txt").await.unwrap(), "one");
        assert_eq!(service.list_files("ws-2").await.unwrap(), vec!["a.txt"]);
        assert!(!service.file_exists("ws-3", "a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_twice_conflicts() {
        let service = InMemoryFileService::new();
        service.create_file("ws", "a.txt", "1").await.unwrap();
        let err = service.create_file("ws", "a.txt", "2").await.unwrap_err();
        assert!(matches!(err, FileServiceError::AlreadyExists(_)));
        assert_eq!(service.content("ws", "a.txt").as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let service = InMemoryFileService::new();
        assert!(matches!(
            service.update_file("ws", "nope", "x").await,
            Err(FileServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_file("ws", "nope").await,
            Err(FileServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_fail_next_applies_once() {
        let service = InMemoryFileService::new();
        service.fail_next("disk full");
        let err = service.create_file("ws", "a.txt", "1").await.unwrap_err();
        assert_eq!(err.to_string(), "IO error: disk full");
        service.create_file("ws", "a.txt", "1").await.unwrap();
        assert_eq!(service.call_count("create_file"), 2);
    }
}
