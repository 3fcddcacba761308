// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Validation Service
//!
//! Security and format checks for everything the AI proposes: file paths,
//! file content and whole actions. Every check returns a
//! [`SecurityValidationResult`]; nothing here fails with an error or touches
//! storage. Strategies turn an invalid result into an [`ActionError`] before
//! any side effect.
//!
//! [`ValidationService::sanitize_content`] rewrites dangerous constructs into
//! inert markers per file type. Sanitization is idempotent and its output
//! passes [`ValidationService::validate_file_content`] for the same type.
//!
//! [`ActionError`]: crate::domain::errors::ActionError

use percent_encoding::percent_decode_str;
use regex::Regex;
use std::sync::LazyLock;

use crate::domain::action::AiAction;
use crate::domain::config::ValidationConfig;
use crate::domain::security::{
    ContentValidationOptions, FileType, PathValidationOptions, SecurityLevel,
    SecurityValidationResult,
};

pub const THREAT_TRAVERSAL: &str = "Directory traversal";
pub const THREAT_ABSOLUTE_PATH: &str = "Absolute path access";
pub const THREAT_NULL_BYTE: &str = "Null byte injection";
pub const THREAT_SCRIPT_INJECTION: &str = "Script injection";
pub const THREAT_STYLE_INJECTION: &str = "Style injection";
pub const THREAT_BINARY_CONTENT: &str = "Binary content";
pub const THREAT_COMMAND_INJECTION: &str = "Command injection";
pub const THREAT_DESTRUCTIVE_COMMAND: &str = "Destructive command";

const MAX_DECODE_PASSES: usize = 3;
const MAX_SANITIZE_PASSES: usize = 16;

/// Extensionless file names accepted by the extension check.
const ALLOWED_BARE_NAMES: &[&str] = &[
    "Dockerfile", "Makefile", "LICENSE", "README", "Procfile", "CHANGELOG", "CODEOWNERS",
];

/// Dotfiles that are expected in web projects and do not warrant a warning.
const HIDDEN_FILE_EXCEPTIONS: &[&str] = &[
    ".gitignore", ".gitattributes", ".env", ".env.example", ".env.local", ".env.development",
    ".env.production", ".eslintrc", ".eslintrc.json", ".eslintrc.js", ".eslintignore",
    ".prettierrc", ".prettierrc.json", ".prettierignore", ".babelrc", ".editorconfig", ".npmrc",
    ".nvmrc", ".github", ".vscode",
];

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

const DESTRUCTIVE_BINARIES: &[&str] = &[
    "rm", "rmdir", "del", "format", "shutdown", "reboot", "halt", "poweroff", "chmod", "chown",
    "dd", "mkfs", "fdisk", "kill", "killall", "sudo", "su",
];

fn pattern(src: &str) -> Regex {
    Regex::new(src).expect("static validation pattern must compile")
}

/// Two dots, any of them literal or encoded.
static ENCODED_TRAVERSAL: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"(?i)(?:\.|%2e|%252e|%25252e|\\x2e|0x2e|\\u002e|%u002e|%c0%ae|%e0%80%ae|\x{ff0e}){2}",
    )
});

/// Overlong UTF-8 encodings of `/` and `\`.
static OVERLONG_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?i)%c0%af|%c1%9c|%c0%5c|%c1%1c"));

static DRIVE_PREFIX: LazyLock<Regex> = LazyLock::new(|| pattern(r"^[a-zA-Z]:"));

static INVALID_PATH_CHARS: LazyLock<Regex> = LazyLock::new(|| pattern(r#"[<>:"|?*\x00-\x1f]"#));

static CONTROL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]"));

static BIDI_CONTROLS: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"[\x{202A}-\x{202E}\x{2066}-\x{2069}]"));

/// A construct that blocks validation and that sanitization rewrites.
struct DangerRule {
    regex: Regex,
    replacement: &'static str,
    message: &'static str,
    threat: &'static str,
}

fn danger(src: &str, replacement: &'static str, message: &'static str, threat: &'static str) -> DangerRule {
    DangerRule {
        regex: pattern(src),
        replacement,
        message,
        threat,
    }
}

static SCRIPT_DANGER: LazyLock<Vec<DangerRule>> = LazyLock::new(|| {
    vec![
        danger(
            r"\beval\s*\(",
            "/* blocked: eval */ void (",
            "Use of eval() is not allowed",
            THREAT_SCRIPT_INJECTION,
        ),
        danger(
            r"\b(?:new\s+)?Function\s*\(",
            "/* blocked: Function */ void (",
            "Dynamic Function() construction is not allowed",
            THREAT_SCRIPT_INJECTION,
        ),
        danger(
            r"\bdocument\.write(?:ln)?\s*\(",
            "/* blocked: document.write */ void (",
            "Use of document.write is not allowed",
            THREAT_SCRIPT_INJECTION,
        ),
        danger(
            r"\.(?:innerHTML|outerHTML)(\s*\+?=)([^=]|$)",
            ".textContent${1}${2}",
            "Assignment to innerHTML/outerHTML is not allowed",
            THREAT_SCRIPT_INJECTION,
        ),
        danger(
            r"\.insertAdjacentHTML\s*\(",
            ".insertAdjacentText(",
            "Use of insertAdjacentHTML is not allowed",
            THREAT_SCRIPT_INJECTION,
        ),
        danger(
            r"\bfetch\s*\(",
            "/* blocked: fetch */ void (",
            "Network requests via fetch() are not allowed",
            THREAT_SCRIPT_INJECTION,
        ),
        danger(
            r"\bXMLHttpRequest\b",
            "/* blocked: XMLHttpRequest */ Object",
            "Network requests via XMLHttpRequest are not allowed",
            THREAT_SCRIPT_INJECTION,
        ),
    ]
});

static SCRIPT_WARNINGS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (pattern(r"\bnew\s+WebSocket\s*\("), "Content opens a WebSocket connection"),
        (pattern(r"\b(?:localStorage|sessionStorage)\b"), "Content accesses browser storage"),
        (pattern(r"\bdocument\.cookie\b"), "Content accesses document.cookie"),
        (pattern(r"\bwindow\.location\s*="), "Content redirects the page"),
        (pattern(r#"\bset(?:Timeout|Interval)\s*\(\s*["'`]"#), "Timer called with a string argument"),
        (pattern(r"\bimport\s*\(\s*[^'`\x22]"), "Dynamic import with a computed specifier"),
    ]
});

static MARKUP_DANGER: LazyLock<Vec<DangerRule>> = LazyLock::new(|| {
    let mut rules = Vec::new();
    for (tag, marker, message) in [
        ("script", "<!-- script removed -->", "Inline <script> tags are not allowed"),
        ("iframe", "<!-- iframe removed -->", "Embedded <iframe> elements are not allowed"),
        ("object", "<!-- object removed -->", "Embedded <object> elements are not allowed"),
        ("embed", "<!-- embed removed -->", "Embedded <embed> elements are not allowed"),
    ] {
        // paired element first so its body goes with it, then any stray opener
        rules.push(danger(
            &format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>"),
            marker,
            message,
            THREAT_SCRIPT_INJECTION,
        ));
        rules.push(danger(
            &format!(r"(?i)<{tag}\b[^>]*>"),
            marker,
            message,
            THREAT_SCRIPT_INJECTION,
        ));
    }
    rules.push(danger(
        r#"(?i)(<[a-z][^>]*?)\s+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#,
        "${1}",
        "Inline event handlers are not allowed",
        THREAT_SCRIPT_INJECTION,
    ));
    rules.push(danger(
        r"(?i)\bjavascript\s*:",
        "blocked:",
        "javascript: URLs are not allowed",
        THREAT_SCRIPT_INJECTION,
    ));
    rules
});

static MARKUP_WARNINGS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (pattern(r"(?i)\bdata\s*:\s*text/html"), "Content embeds a data:text/html URL"),
        (pattern(r"(?i)<form\b[^>]*\baction\s*=\s*[\x22']?https?:"), "Form posts to an external URL"),
        (pattern(r"(?i)<meta\b[^>]*http-equiv\s*=\s*[\x22']?refresh"), "Meta refresh redirect"),
    ]
});

static STYLE_DANGER: LazyLock<Vec<DangerRule>> = LazyLock::new(|| {
    vec![
        danger(
            r"(?i)\bexpression\s*\(",
            "/* blocked: expression */ (",
            "CSS expression() is not allowed",
            THREAT_STYLE_INJECTION,
        ),
        danger(
            r"(?i)@import\s+url\s*\([^)]*\)\s*;?",
            "/* blocked: @import */",
            "@import url() is not allowed",
            THREAT_STYLE_INJECTION,
        ),
        danger(
            r"(?i)-moz-binding\s*:[^;}]*;?",
            "/* blocked: -moz-binding */",
            "-moz-binding is not allowed",
            THREAT_STYLE_INJECTION,
        ),
        danger(
            r"(?i)\bbehavior\s*:[^;}]*;?",
            "/* blocked: behavior */",
            "behavior: is not allowed",
            THREAT_STYLE_INJECTION,
        ),
        danger(
            r"(?i)\bjavascript\s*:",
            "blocked:",
            "javascript: URLs are not allowed",
            THREAT_STYLE_INJECTION,
        ),
    ]
});

static PIPE_TO_SHELL: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"\|\s*(?:sudo\s+)?(?:/\S*/)?(?:sh|bash|zsh|dash|ksh|fish|python[0-9.]*|node|perl|ruby)\b")
});

static SHELL_METACHARACTERS: LazyLock<Regex> = LazyLock::new(|| pattern(r"[;&|`$()]"));

static DEV_NULL_REDIRECT: LazyLock<Regex> = LazyLock::new(|| pattern(r"[0-9&]?>>?\s*/dev/null"));

fn danger_rules(file_type: FileType) -> &'static [DangerRule] {
    match file_type {
        FileType::Javascript | FileType::Typescript => &SCRIPT_DANGER,
        FileType::Html | FileType::Markdown => &MARKUP_DANGER,
        FileType::Css => &STYLE_DANGER,
        FileType::Json | FileType::Text | FileType::Other => &[],
    }
}

fn warning_rules(file_type: FileType) -> &'static [(Regex, &'static str)] {
    match file_type {
        FileType::Javascript | FileType::Typescript => &SCRIPT_WARNINGS,
        FileType::Html | FileType::Markdown => &MARKUP_WARNINGS,
        _ => &[],
    }
}

/// Last path segment, after separator normalization.
fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Extension of a file name; leading dots of dotfiles do not count.
fn extension(name: &str) -> Option<&str> {
    let trimmed = name.trim_start_matches('.');
    trimmed
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

pub struct ValidationService {
    config: ValidationConfig,
}

impl ValidationService {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn path_options(&self) -> PathValidationOptions {
        self.config.path_options()
    }

    /// Content options with the file type detected from `path`.
    pub fn content_options_for(&self, path: &str) -> ContentValidationOptions {
        self.config.content_options(Some(Self::detect_file_type(path)))
    }

    pub fn detect_file_type(path: &str) -> FileType {
        extension(file_name(path))
            .map(FileType::from_extension)
            .unwrap_or(FileType::Other)
    }

    /// Checks a workspace-relative path.
    ///
    /// All checks run and accumulate findings; only an empty path returns early.
    pub fn validate_file_path(&self, path: &str, options: &PathValidationOptions) -> SecurityValidationResult {
        let mut result = SecurityValidationResult::safe();

        if path.trim().is_empty() {
            result.add_error(SecurityLevel::Warning, "File path is required");
            return result;
        }

        let normalized = path.replace('\\', "/");

        if normalized.chars().count() > options.max_length {
            result.add_error(
                SecurityLevel::Warning,
                format!("Path exceeds maximum length of {} characters", options.max_length),
            );
        }

        if Self::contains_traversal(path) || Self::contains_traversal(&normalized) {
            result.add_error(SecurityLevel::Danger, "Path contains directory traversal sequences");
            result.add_threat(THREAT_TRAVERSAL);
        }

        let has_drive = DRIVE_PREFIX.is_match(&normalized);
        let is_absolute = normalized.starts_with('/') || has_drive;
        if is_absolute && !options.allow_absolute_paths {
            result.add_error(SecurityLevel::Danger, "Absolute paths are not allowed");
            result.add_threat(THREAT_ABSOLUTE_PATH);
        }

        // the drive colon is only legal when absolute paths are
        let char_scope = if has_drive && options.allow_absolute_paths {
            &normalized[2..]
        } else {
            normalized.as_str()
        };
        if INVALID_PATH_CHARS.is_match(char_scope) {
            if char_scope.contains('\0') {
                result.add_error(SecurityLevel::Danger, "Path contains a null byte");
                result.add_threat(THREAT_NULL_BYTE);
            } else {
                result.add_error(SecurityLevel::Warning, "Path contains invalid characters");
            }
        }

        let name = file_name(&normalized);
        if !name.is_empty() && !HIDDEN_FILE_EXCEPTIONS.contains(&name) {
            match extension(name) {
                Some(ext) => {
                    let allowed = options
                        .allowed_extensions
                        .iter()
                        .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(ext));
                    if !allowed {
                        result.add_error(
                            SecurityLevel::Warning,
                            format!("File extension '.{}' is not allowed", ext),
                        );
                    }
                }
                None if ALLOWED_BARE_NAMES.contains(&name) => {}
                None => {
                    result.add_error(
                        SecurityLevel::Warning,
                        format!("File '{}' has no allowed extension", name),
                    );
                }
            }
        } else if name.is_empty() {
            result.add_error(SecurityLevel::Warning, "Path does not name a file");
        }

        for segment in normalized.split('/').filter(|s| !s.is_empty()) {
            let stem = segment.split('.').next().unwrap_or(segment);
            if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
                result.add_error(SecurityLevel::Warning, format!("Reserved file name: {}", segment));
            }

            if segment.starts_with('.')
                && segment != "."
                && segment != ".."
                && !HIDDEN_FILE_EXCEPTIONS.contains(&segment)
            {
                result.add_warning(format!("Hidden file or directory: {}", segment));
            }
        }

        result
    }

    /// Literal, percent-encoded (up to three layers), hex-escaped and overlong
    /// UTF-8 forms of `..`.
    fn contains_traversal(path: &str) -> bool {
        let mut candidate = path.to_string();
        for _ in 0..=MAX_DECODE_PASSES {
            if candidate.contains("..")
                || ENCODED_TRAVERSAL.is_match(&candidate)
                || OVERLONG_SEPARATOR.is_match(&candidate)
            {
                return true;
            }
            let decoded = percent_decode_str(&candidate).decode_utf8_lossy().into_owned();
            if decoded == candidate {
                break;
            }
            candidate = decoded;
        }
        false
    }

    pub fn validate_file_content(
        &self,
        content: &str,
        options: &ContentValidationOptions,
    ) -> SecurityValidationResult {
        let mut result = SecurityValidationResult::safe();

        let oversized = content.len() > options.max_size;
        if oversized {
            result.add_error(
                SecurityLevel::Warning,
                format!("Content exceeds maximum size of {} bytes", options.max_size),
            );
        }

        if CONTROL_CHARS.is_match(content) {
            if options.allow_executable_content {
                result.add_warning("Content contains binary or control characters");
            } else {
                result.add_error(SecurityLevel::Danger, "Content contains binary or control characters");
                result.add_threat(THREAT_BINARY_CONTENT);
            }
        }

        if let Some(file_type) = options.file_type {
            for rule in danger_rules(file_type) {
                if rule.regex.is_match(content) {
                    result.add_error(SecurityLevel::Danger, rule.message);
                    result.add_threat(rule.threat);
                }
            }
            for (regex, message) in warning_rules(file_type) {
                if regex.is_match(content) {
                    result.add_warning(*message);
                }
            }
            if file_type == FileType::Json && serde_json::from_str::<serde_json::Value>(content).is_err() {
                result.add_warning("Content is not valid JSON");
            }
        }

        // `&str` is valid UTF-8, so a percent-encoding round trip is always
        // lossless; decoding damage shows up as replacement characters instead.
        if content.contains('\u{FFFD}') {
            result.add_warning("Content contains replacement characters; the source encoding may be corrupt");
        }
        if BIDI_CONTROLS.is_match(content) {
            result.add_warning("Content contains bidirectional control characters");
        }

        result
    }

    /// Returns a new string with dangerous constructs replaced by inert
    /// markers. JSON is parsed and pretty-printed; invalid JSON is returned
    /// unchanged.
    pub fn sanitize_content(&self, content: &str, file_type: FileType) -> String {
        if file_type == FileType::Json {
            return match serde_json::from_str::<serde_json::Value>(content) {
                Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| content.to_string()),
                Err(e) => {
                    tracing::warn!(error = %e, "JSON content could not be parsed; leaving unsanitized");
                    content.to_string()
                }
            };
        }

        let rules = danger_rules(file_type);
        let mut sanitized = content.to_string();
        for _ in 0..MAX_SANITIZE_PASSES {
            let mut changed = false;
            for rule in rules {
                if rule.regex.is_match(&sanitized) {
                    sanitized = rule.regex.replace_all(&sanitized, rule.replacement).into_owned();
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        if sanitized != content {
            tracing::debug!(?file_type, "Content sanitized");
        }
        sanitized
    }

    /// Required fields per action type, plus the shell safety check for
    /// command-bearing actions.
    pub fn validate_ai_action(&self, action: &AiAction) -> SecurityValidationResult {
        let mut result = SecurityValidationResult::safe();
        let kind = action.action_type;

        if kind.requires_file_path() && action.target_path().is_none() {
            result.add_error(
                SecurityLevel::Warning,
                format!("Validation failed: file path is required for {} actions", kind),
            );
        }

        if kind.requires_content() && action.content.is_none() {
            result.add_error(
                SecurityLevel::Warning,
                format!("Validation failed: content is required for {} actions", kind),
            );
        }

        if kind.requires_command() {
            match action.command.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
                Some(command) => result.merge(self.validate_shell_command(command)),
                None => result.add_error(
                    SecurityLevel::Warning,
                    format!("Validation failed: command is required for {} actions", kind),
                ),
            }
        }

        result
    }

    pub fn validate_shell_command(&self, command: &str) -> SecurityValidationResult {
        let mut result = SecurityValidationResult::safe();
        let command = command.trim();

        if command.is_empty() {
            result.add_error(SecurityLevel::Warning, "Command is empty");
            return result;
        }

        let binary = command
            .split_whitespace()
            .find(|token| !Self::is_env_assignment(token))
            .map(|token| token.rsplit('/').next().unwrap_or(token))
            .unwrap_or_default();
        if DESTRUCTIVE_BINARIES.contains(&binary) {
            result.add_error(
                SecurityLevel::Danger,
                format!("Security: command '{}' is not allowed", binary),
            );
            result.add_threat(THREAT_DESTRUCTIVE_COMMAND);
        }

        if PIPE_TO_SHELL.is_match(command) {
            result.add_error(SecurityLevel::Danger, "Security: piping into a shell interpreter is not allowed");
            result.add_threat(THREAT_COMMAND_INJECTION);
        }

        if DEV_NULL_REDIRECT.is_match(command) {
            result.add_error(SecurityLevel::Danger, "Security: redirecting output to /dev/null is not allowed");
            result.add_threat(THREAT_COMMAND_INJECTION);
        }

        if SHELL_METACHARACTERS.is_match(command) {
            result.add_error(SecurityLevel::Danger, "Security: command contains shell metacharacters");
            result.add_threat(THREAT_COMMAND_INJECTION);
        }

        result
    }

    fn is_env_assignment(token: &str) -> bool {
        token
            .split_once('=')
            .is_some_and(|(name, _)| !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
    }
}

impl Default for ValidationService {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
