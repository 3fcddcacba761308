// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # AI Actions
//!
//! Value types produced by the AI-response parser and consumed once by the
//! orchestrator. An [`AiAction`] is a single proposed mutation; an
//! [`AiArtifact`] is an ordered plan of actions where later steps may rely on
//! earlier ones having succeeded.
//!
//! Actions are never mutated after construction. Anything that transforms an
//! action's payload (sanitization, normalization) produces a new value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The six action tags recognized by the parser.
///
/// Deserialization rejects any other tag, so an `AiAction` that exists at all
/// always carries a recognized type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Create,
    Edit,
    Delete,
    File,
    Shell,
    Start,
}

impl ActionType {
    pub const ALL: [ActionType; 6] = [
        ActionType::Create,
        ActionType::Edit,
        ActionType::Delete,
        ActionType::File,
        ActionType::Shell,
        ActionType::Start,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Create => "create",
            ActionType::Edit => "edit",
            ActionType::Delete => "delete",
            ActionType::File => "file",
            ActionType::Shell => "shell",
            ActionType::Start => "start",
        }
    }

    /// Types that touch a file and therefore need a `file_path`.
    pub fn requires_file_path(&self) -> bool {
        matches!(
            self,
            ActionType::Create | ActionType::Edit | ActionType::Delete | ActionType::File
        )
    }

    /// Types that write content.
    pub fn requires_content(&self) -> bool {
        matches!(self, ActionType::Create | ActionType::Edit | ActionType::File)
    }

    /// Types that run a command in the sandbox.
    pub fn requires_command(&self) -> bool {
        matches!(self, ActionType::Shell | ActionType::Start)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unrecognized action type: '{0}'")]
pub struct UnknownActionType(pub String);

impl FromStr for ActionType {
    type Err = UnknownActionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownActionType(s.to_string()))
    }
}

/// A single file or shell mutation proposed by the AI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl AiAction {
    pub fn create(file_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            action_type: ActionType::Create,
            file_path: Some(file_path.into()),
            content: Some(content.into()),
            command: None,
        }
    }

    pub fn edit(file_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            action_type: ActionType::Edit,
            file_path: Some(file_path.into()),
            content: Some(content.into()),
            command: None,
        }
    }

    pub fn delete(file_path: impl Into<String>) -> Self {
        Self {
            action_type: ActionType::Delete,
            file_path: Some(file_path.into()),
            content: None,
            command: None,
        }
    }

    pub fn shell(command: impl Into<String>) -> Self {
        Self {
            action_type: ActionType::Shell,
            file_path: None,
            content: None,
            command: Some(command.into()),
        }
    }

    pub fn start(command: impl Into<String>) -> Self {
        Self {
            action_type: ActionType::Start,
            file_path: None,
            content: None,
            command: Some(command.into()),
        }
    }

    /// The non-empty target path, if any.
    pub fn target_path(&self) -> Option<&str> {
        self.file_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn content_len(&self) -> usize {
        self.content.as_ref().map(String::len).unwrap_or(0)
    }
}

/// An ordered plan of actions authored in one AI response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub actions: Vec<AiAction>,
}

impl AiArtifact {
    pub fn new(actions: Vec<AiAction>) -> Self {
        Self {
            id: None,
            title: None,
            actions,
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
