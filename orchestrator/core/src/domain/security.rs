// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Security Validation Results
//!
//! Structured outcome of path, content and action checks. Validators never
//! fail with an error; they accumulate findings into a
//! [`SecurityValidationResult`] and leave it to the strategy layer to turn an
//! invalid result into an error before any side effect happens.
//!
//! | Level | Meaning |
//! |-------|---------|
//! | `Safe` | no findings |
//! | `Warning` | suspicious or malformed, may or may not block |
//! | `Danger` | an attack signature (traversal, script injection, unsafe command) |

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    #[default]
    Safe,
    Warning,
    Danger,
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityLevel::Safe => f.write_str("safe"),
            SecurityLevel::Warning => f.write_str("warning"),
            SecurityLevel::Danger => f.write_str("danger"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub security_level: SecurityLevel,
    pub threats: Vec<String>,
}

impl Default for SecurityValidationResult {
    fn default() -> Self {
        Self::safe()
    }
}

impl SecurityValidationResult {
    pub fn safe() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            security_level: SecurityLevel::Safe,
            threats: Vec::new(),
        }
    }

    /// Raises the level; never lowers it.
    pub fn escalate(&mut self, level: SecurityLevel) {
        self.security_level = self.security_level.max(level);
    }

    pub fn add_error(&mut self, level: SecurityLevel, message: impl Into<String>) {
        self.errors.push(message.into());
        self.is_valid = false;
        self.escalate(level);
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
        self.escalate(SecurityLevel::Warning);
    }

    pub fn add_threat(&mut self, threat: impl Into<String>) {
        let threat = threat.into();
        if !self.threats.contains(&threat) {
            self.threats.push(threat);
        }
        self.escalate(SecurityLevel::Danger);
    }

    pub fn merge(&mut self, other: SecurityValidationResult) {
        self.is_valid &= other.is_valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        for threat in other.threats {
            if !self.threats.contains(&threat) {
                self.threats.push(threat);
            }
        }
        self.escalate(other.security_level);
    }

    pub fn is_dangerous(&self) -> bool {
        self.security_level == SecurityLevel::Danger
    }

    /// All errors joined for inclusion in an error message.
    pub fn summary(&self) -> String {
        self.errors.join("; ")
    }
}

/// Content language detected from a file path; drives scanning and sanitization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Javascript,
    Typescript,
    Html,
    Css,
    Json,
    Markdown,
    Text,
    Other,
}

impl FileType {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "js" | "jsx" | "mjs" | "cjs" => FileType::Javascript,
            "ts" | "tsx" | "mts" | "cts" => FileType::Typescript,
            "html" | "htm" | "vue" | "svelte" | "astro" => FileType::Html,
            "css" | "scss" | "sass" | "less" => FileType::Css,
            "json" => FileType::Json,
            "md" | "mdx" | "markdown" => FileType::Markdown,
            "txt" | "log" | "csv" => FileType::Text,
            _ => FileType::Other,
        }
    }

    /// Script-bearing languages share the same dangerous-pattern table.
    pub fn is_script(&self) -> bool {
        matches!(self, FileType::Javascript | FileType::Typescript)
    }

    /// Languages that can embed raw markup.
    pub fn is_markup(&self) -> bool {
        matches!(self, FileType::Html | FileType::Markdown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathValidationOptions {
    pub max_length: usize,
    pub allow_absolute_paths: bool,
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentValidationOptions {
    pub max_size: usize,
    pub allow_executable_content: bool,
    pub file_type: Option<FileType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalate_never_lowers() {
        let mut result = SecurityValidationResult::safe();
        result.escalate(SecurityLevel::Danger);
        result.escalate(SecurityLevel::Warning);
        assert_eq!(result.security_level, SecurityLevel::Danger);
    }

    #[test]
    fn test_warning_does_not_invalidate() {
        let mut result = SecurityValidationResult::safe();
        result.add_warning("hidden file");
        assert!(result.is_valid);
        assert_eq!(result.security_level, SecurityLevel::Warning);
    }

    #[test]
    fn test_merge_combines_findings() {
        let mut a = SecurityValidationResult::safe();
        a.add_warning("w1");
        let mut b = SecurityValidationResult::safe();
        b.add_error(SecurityLevel::Danger, "e1");
        b.add_threat("Directory traversal");
        a.merge(b);
        assert!(!a.is_valid);
        assert!(a.is_dangerous());
        assert_eq!(a.errors, vec!["e1"]);
        assert_eq!(a.threats, vec!["Directory traversal"]);
        assert_eq!(a.summary(), "e1");
    }

    #[test]
    fn test_file_type_from_extension() {
        assert_eq!(FileType::from_extension("TSX"), FileType::Typescript);
        assert_eq!(FileType::from_extension("htm"), FileType::Html);
        assert_eq!(FileType::from_extension("rs"), FileType::Other);
        assert!(FileType::Javascript.is_script());
        assert!(FileType::Markdown.is_markup());
    }
}
