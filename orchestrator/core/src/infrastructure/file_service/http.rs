// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP Storage API File Service
//!
//! Talks to a workspace storage API over JSON.
//!
//! # API Endpoints
//!
//! - `POST   /api/workspaces/{ws}/files/{path}` - Create file (`{"content": ...}`)
//! - `PUT    /api/workspaces/{ws}/files/{path}` - Replace file content
//! - `DELETE /api/workspaces/{ws}/files/{path}` - Delete file
//! - `GET    /api/workspaces/{ws}/files/{path}` - Read file (`{"content": ...}`)
//! - `HEAD   /api/workspaces/{ws}/files/{path}` - Existence check
//! - `GET    /api/workspaces/{ws}/files`        - List files (`{"files": [...]}`)
//!
//! Mutating endpoints answer with a `FileOperationResult` envelope. An empty
//! 2xx body counts as success.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::action::ActionType;
use crate::domain::workspace::{FileOperationResult, FileService, FileServiceError};

/// Characters left as-is inside a single path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct ContentBody<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct ContentResponse {
    content: String,
}

#[derive(Deserialize)]
struct ListResponse {
    files: Vec<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Storage API adapter
pub struct HttpFileService {
    client: Client,

    /// API base URL (e.g., "http://localhost:8080")
    base_url: String,
}

impl HttpFileService {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FileServiceError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FileServiceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn files_url(&self, workspace_id: &str) -> String {
        format!(
            "{}/api/workspaces/{}/files",
            self.base_url,
            utf8_percent_encode(workspace_id, SEGMENT)
        )
    }

    /// Encodes each segment separately so `/` stays a separator.
    fn file_url(&self, workspace_id: &str, file_path: &str) -> String {
        let encoded = file_path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", self.files_url(workspace_id), encoded)
    }

    async fn envelope(
        response: Response,
        action: ActionType,
        file_path: &str,
    ) -> Result<FileOperationResult, FileServiceError> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, response, file_path).await);
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(FileOperationResult::ok(action, file_path));
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn status_error(status: StatusCode, response: Response, file_path: &str) -> FileServiceError {
        match status {
            StatusCode::NOT_FOUND => return FileServiceError::NotFound(file_path.to_string()),
            StatusCode::CONFLICT => return FileServiceError::AlreadyExists(file_path.to_string()),
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                return FileServiceError::PermissionDenied(file_path.to_string())
            }
            _ => {}
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .ok()
            .and_then(|body| body.error.or(body.message))
            .unwrap_or_else(|| {
                if text.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    text
                }
            });
        FileServiceError::Http {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl FileService for HttpFileService {
    async fn create_file(
        &self,
        workspace_id: &str,
        file_path: &str,
        content: &str,
    ) -> Result<FileOperationResult, FileServiceError> {
        debug!(workspace_id, file_path, "POST file to storage API");
        let response = self
            .client
            .post(self.file_url(workspace_id, file_path))
            .json(&ContentBody { content })
            .send()
            .await?;
        Self::envelope(response, ActionType::Create, file_path).await
    }

    async fn update_file(
        &self,
        workspace_id: &str,
        file_path: &str,
        content: &str,
    ) -> Result<FileOperationResult, FileServiceError> {
        debug!(workspace_id, file_path, "PUT file to storage API");
        let response = self
            .client
            .put(self.file_url(workspace_id, file_path))
            .json(&ContentBody { content })
            .send()
            .await?;
        Self::envelope(response, ActionType::Edit, file_path).await
    }

    async fn delete_file(&self, workspace_id: &str, file_path: &str) -> Result<FileOperationResult, FileServiceError> {
        debug!(workspace_id, file_path, "DELETE file from storage API");
        let response = self
            .client
            .delete(self.file_url(workspace_id, file_path))
            .send()
            .await?;
        Self::envelope(response, ActionType::Delete, file_path).await
    }

    async fn file_exists(&self, workspace_id: &str, file_path: &str) -> Result<bool, FileServiceError> {
        let response = self
            .client
            .head(self.file_url(workspace_id, file_path))
            .send()
            .await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(Self::status_error(status, response, file_path).await),
        }
    }

    async fn list_files(&self, workspace_id: &str) -> Result<Vec<String>, FileServiceError> {
        let response = self.client.get(self.files_url(workspace_id)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, response, workspace_id).await);
        }
        Ok(response.json::<ListResponse>().await?.files)
    }

    async fn get_file_content(&self, workspace_id: &str, file_path: &str) -> Result<String, FileServiceError> {
        let response = self
            .client
            .get(self.file_url(workspace_id, file_path))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, response, file_path).await);
        }
        Ok(response.json::<ContentResponse>().await?.content)
    }
}
