// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory editor state: the open documents and their buffers.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::domain::workspace::EditorService;

#[derive(Debug, Clone)]
struct OpenDocument {
    path: String,
    content: String,
}

/// [`EditorService`] keeping open documents in the order they were opened.
///
/// Updating a document that is not open opens it. Closing one that is not
/// open is a no-op.
#[derive(Default)]
pub struct InMemoryEditorService {
    documents: RwLock<Vec<OpenDocument>>,
}

impl InMemoryEditorService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self, file_path: &str) -> Option<String> {
        self.documents
            .read()
            .iter()
            .find(|doc| doc.path == file_path)
            .map(|doc| doc.content.clone())
    }

    pub fn open_files(&self) -> Vec<String> {
        self.documents.read().iter().map(|doc| doc.path.clone()).collect()
    }

    pub fn is_open(&self, file_path: &str) -> bool {
        self.documents.read().iter().any(|doc| doc.path == file_path)
    }

    fn upsert(&self, file_path: &str, content: &str) {
        let mut documents = self.documents.write();
        match documents.iter_mut().find(|doc| doc.path == file_path) {
            Some(doc) => doc.content = content.to_string(),
            None => documents.push(OpenDocument {
                path: file_path.to_string(),
                content: content.to_string(),
            }),
        }
    }
}

#[async_trait]
impl EditorService for InMemoryEditorService {
    async fn open_file_from_ai(&self, file_path: &str, content: &str) -> anyhow::Result<()> {
        self.upsert(file_path, content);
        debug!(file_path, "Opened document");
        Ok(())
    }

    async fn update_file_from_ai(&self, file_path: &str, content: &str) -> anyhow::Result<()> {
        self.upsert(file_path, content);
        debug!(file_path, "Updated document buffer");
        Ok(())
    }

    async fn close_file(&self, file_path: &str) -> anyhow::Result<()> {
        self.documents.write().retain(|doc| doc.path != file_path);
        debug!(file_path, "Closed document");
        Ok(())
    }
}
