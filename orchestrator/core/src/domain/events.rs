// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain events broadcast after a workspace change. Consumed by UI and
//! telemetry observers through [`crate::infrastructure::event_bus::EventBus`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::action::ActionType;

pub const FILE_CREATED: &str = "file.created";
pub const FILE_UPDATED: &str = "file.updated";
pub const FILE_DELETED: &str = "file.deleted";
pub const AI_ACTION_PROCESSED: &str = "ai.action.processed";

/// Who caused the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Ai,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventPayload {
    #[serde(rename = "file.created")]
    FileCreated {
        workspace_id: String,
        file_path: String,
        content_length: usize,
    },
    #[serde(rename = "file.updated")]
    FileUpdated {
        workspace_id: String,
        file_path: String,
        content_length: usize,
        previous_content: Option<String>,
    },
    #[serde(rename = "file.deleted")]
    FileDeleted {
        workspace_id: String,
        file_path: String,
    },
    #[serde(rename = "ai.action.processed")]
    AiActionProcessed {
        workspace_id: String,
        action: ActionType,
        file_path: Option<String>,
        success: bool,
        error: Option<String>,
        duration_ms: u64,
    },
    /// Extension point for events owned by collaborators outside this crate.
    #[serde(rename = "custom")]
    Custom { event_type: String, data: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub source: EventSource,
    pub payload: EventPayload,
}

impl DomainEvent {
    pub fn new(source: EventSource, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source,
            payload,
        }
    }

    pub fn file_created(workspace_id: &str, file_path: &str, content_length: usize) -> Self {
        Self::new(
            EventSource::Ai,
            EventPayload::FileCreated {
                workspace_id: workspace_id.to_string(),
                file_path: file_path.to_string(),
                content_length,
            },
        )
    }

    pub fn file_updated(
        workspace_id: &str,
        file_path: &str,
        content_length: usize,
        previous_content: Option<String>,
    ) -> Self {
        Self::new(
            EventSource::Ai,
            EventPayload::FileUpdated {
                workspace_id: workspace_id.to_string(),
                file_path: file_path.to_string(),
                content_length,
                previous_content,
            },
        )
    }

    pub fn file_deleted(workspace_id: &str, file_path: &str) -> Self {
        Self::new(
            EventSource::Ai,
            EventPayload::FileDeleted {
                workspace_id: workspace_id.to_string(),
                file_path: file_path.to_string(),
            },
        )
    }

    pub fn action_processed(
        workspace_id: &str,
        action: ActionType,
        file_path: Option<&str>,
        error: Option<String>,
        duration_ms: u64,
    ) -> Self {
        Self::new(
            EventSource::Ai,
            EventPayload::AiActionProcessed {
                workspace_id: workspace_id.to_string(),
                action,
                file_path: file_path.map(str::to_string),
                success: error.is_none(),
                error,
                duration_ms,
            },
        )
    }

    pub fn custom(source: EventSource, event_type: impl Into<String>, data: Value) -> Self {
        Self::new(
            source,
            EventPayload::Custom {
                event_type: event_type.into(),
                data,
            },
        )
    }

    /// Routing key used by subscribers.
    pub fn event_type(&self) -> &str {
        match &self.payload {
            EventPayload::FileCreated { .. } => FILE_CREATED,
            EventPayload::FileUpdated { .. } => FILE_UPDATED,
            EventPayload::FileDeleted { .. } => FILE_DELETED,
            EventPayload::AiActionProcessed { .. } => AI_ACTION_PROCESSED,
            EventPayload::Custom { event_type, .. } => event_type,
        }
    }

    /// The file this event concerns, when it concerns one.
    pub fn file_path(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::FileCreated { file_path, .. }
            | EventPayload::FileUpdated { file_path, .. }
            | EventPayload::FileDeleted { file_path, .. } => Some(file_path),
            EventPayload::AiActionProcessed { file_path, .. } => file_path.as_deref(),
            EventPayload::Custom { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_routing_keys() {
        assert_eq!(DomainEvent::file_created("ws", "a.js", 3).event_type(), FILE_CREATED);
        assert_eq!(DomainEvent::file_updated("ws", "a.js", 3, None).event_type(), FILE_UPDATED);
        assert_eq!(DomainEvent::file_deleted("ws", "a.js").event_type(), FILE_DELETED);
        assert_eq!(
            DomainEvent::custom(EventSource::User, "editor.saved", Value::Null).event_type(),
            "editor.saved"
        );
    }

    #[test]
    fn test_action_processed_success_flag_follows_error() {
        let ok = DomainEvent::action_processed("ws", ActionType::Create, Some("a.js"), None, 12);
        let failed = DomainEvent::action_processed(
            "ws",
            ActionType::Edit,
            Some("a.js"),
            Some("File does not exist: a.js".into()),
            4,
        );
        assert!(matches!(ok.payload, EventPayload::AiActionProcessed { success: true, .. }));
        assert!(matches!(failed.payload, EventPayload::AiActionProcessed { success: false, .. }));
        assert_eq!(failed.file_path(), Some("a.js"));
    }

    #[test]
    fn test_serialized_shape_carries_type_and_data() {
        let event = DomainEvent::file_deleted("ws-1", "old.css");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["source"], "ai");
        assert_eq!(json["payload"]["type"], "file.deleted");
        assert_eq!(json["payload"]["data"]["file_path"], "old.css");
    }
}
