// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Actionflow Configuration
//
// Defines the YAML manifest that configures one pipeline session:
// - Orchestrator limits (concurrency, timeout, retry policy)
// - Validation rules (path length, extension allow-list, content size)
// - Event bus and error history bounds
// - Logging and file service backend selection

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::security::{ContentValidationOptions, FileType, PathValidationOptions};

pub const API_VERSION: &str = "actionflow/v1";
pub const KIND: &str = "ActionflowConfig";

/// Extensions accepted by path validation unless the manifest overrides them.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts", "html", "htm", "vue", "svelte",
    "astro", "css", "scss", "sass", "less", "json", "md", "mdx", "markdown", "txt", "csv",
    "log", "svg", "xml", "yaml", "yml", "toml", "lock", "map", "graphql", "gql", "sql", "py",
    "rs", "go", "java", "rb", "php",
];

/// Top-level configuration manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionflowConfig {
    /// API version (must be "actionflow/v1")
    #[serde(rename = "apiVersion", default = "default_api_version")]
    pub api_version: String,

    /// Resource kind (must be "ActionflowConfig")
    #[serde(default = "default_kind")]
    pub kind: String,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub event_bus: EventBusConfig,

    #[serde(default)]
    pub error_handling: ErrorHandlingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub file_service: FileServiceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Upper bound on concurrently executing path groups
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_operations: usize,

    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// Total attempts, including the first
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base delay; attempt n waits `retry_delay_ms * 2^(n-1)`
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Case-insensitive patterns; an error message matching any of them is never retried
    #[serde(default = "default_non_retryable_patterns")]
    pub non_retryable_patterns: Vec<String>,
}

impl OrchestratorConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_max_path_length")]
    pub max_path_length: usize,

    #[serde(default)]
    pub allow_absolute_paths: bool,

    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    #[serde(default)]
    pub allow_executable_content: bool,
}

impl ValidationConfig {
    pub fn path_options(&self) -> PathValidationOptions {
        PathValidationOptions {
            max_length: self.max_path_length,
            allow_absolute_paths: self.allow_absolute_paths,
            allowed_extensions: self.allowed_extensions.clone(),
        }
    }

    pub fn content_options(&self, file_type: Option<FileType>) -> ContentValidationOptions {
        ContentValidationOptions {
            max_size: self.max_file_size,
            allow_executable_content: self.allow_executable_content,
            file_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBusConfig {
    #[serde(default = "default_event_history_limit")]
    pub history_limit: usize,

    /// Buffer of the broadcast stream handed to `subscribe_stream` observers
    #[serde(default = "default_stream_capacity")]
    pub stream_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorHandlingConfig {
    #[serde(default = "default_error_history_limit")]
    pub history_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileServiceBackend {
    #[default]
    Local,
    Http,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileServiceConfig {
    #[serde(default)]
    pub backend: FileServiceBackend,

    /// Directory holding one subdirectory per workspace (local backend)
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Storage API endpoint (http backend)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

fn default_max_concurrent() -> usize {
    5
}

fn default_operation_timeout_ms() -> u64 {
    30_000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_non_retryable_patterns() -> Vec<String> {
    [
        "validation",
        "security",
        "unauthorized",
        "forbidden",
        "not found",
        "already exists",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

fn default_max_path_length() -> usize {
    260
}

fn default_allowed_extensions() -> Vec<String> {
    DEFAULT_ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

fn default_max_file_size() -> usize {
    10 * 1024 * 1024
}

fn default_event_history_limit() -> usize {
    1_000
}

fn default_stream_capacity() -> usize {
    1_000
}

fn default_error_history_limit() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_root() -> PathBuf {
    PathBuf::from("./workspaces")
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_operations: default_max_concurrent(),
            operation_timeout_ms: default_operation_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            non_retryable_patterns: default_non_retryable_patterns(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_path_length: default_max_path_length(),
            allow_absolute_paths: false,
            allowed_extensions: default_allowed_extensions(),
            max_file_size: default_max_file_size(),
            allow_executable_content: false,
        }
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            history_limit: default_event_history_limit(),
            stream_capacity: default_stream_capacity(),
        }
    }
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            history_limit: default_error_history_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Compact,
        }
    }
}

impl Default for FileServiceConfig {
    fn default() -> Self {
        Self {
            backend: FileServiceBackend::Local,
            root: default_root(),
            base_url: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for ActionflowConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            orchestrator: OrchestratorConfig::default(),
            validation: ValidationConfig::default(),
            event_bus: EventBusConfig::default(),
            error_handling: ErrorHandlingConfig::default(),
            logging: LoggingConfig::default(),
            file_service: FileServiceConfig::default(),
        }
    }
}

impl ActionflowConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. ACTIONFLOW_CONFIG_PATH environment variable
    /// 2. ./actionflow.yaml (working directory)
    /// 3. ~/.actionflow/config.yaml (user home)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("ACTIONFLOW_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./actionflow.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".actionflow").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing or invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to the orchestrator section
    pub fn apply_env_overrides(&mut self) {
        if let Some(val) = env_number::<usize>("ACTIONFLOW_MAX_CONCURRENT") {
            self.orchestrator.max_concurrent_operations = val;
        }
        if let Some(val) = env_number::<u64>("ACTIONFLOW_OPERATION_TIMEOUT_MS") {
            self.orchestrator.operation_timeout_ms = val;
        }
        if let Some(val) = env_number::<u32>("ACTIONFLOW_RETRY_ATTEMPTS") {
            self.orchestrator.retry_attempts = val;
        }
        if let Some(val) = env_number::<u64>("ACTIONFLOW_RETRY_DELAY_MS") {
            self.orchestrator.retry_delay_ms = val;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        let orchestrator = &self.orchestrator;
        if orchestrator.max_concurrent_operations == 0 {
            anyhow::bail!("orchestrator.max_concurrent_operations must be at least 1");
        }
        if orchestrator.operation_timeout_ms == 0 {
            anyhow::bail!("orchestrator.operation_timeout_ms must be greater than 0");
        }
        if orchestrator.retry_attempts == 0 {
            anyhow::bail!("orchestrator.retry_attempts must be at least 1");
        }
        for pattern in &orchestrator.non_retryable_patterns {
            if let Err(e) = regex::Regex::new(pattern) {
                anyhow::bail!("Invalid non-retryable pattern '{}': {}", pattern, e);
            }
        }

        if self.validation.allowed_extensions.is_empty() {
            anyhow::bail!("validation.allowed_extensions cannot be empty");
        }
        if self.validation.max_path_length == 0 {
            anyhow::bail!("validation.max_path_length must be greater than 0");
        }

        if self.file_service.backend == FileServiceBackend::Http
            && self.file_service.base_url.as_deref().map_or(true, str::is_empty)
        {
            anyhow::bail!("file_service.base_url is required for the http backend");
        }

        Ok(())
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    let val = std::env::var(key).ok()?;
    match val.trim().parse::<T>() {
        Ok(parsed) => {
            tracing::info!("Environment override: {}={}", key, val);
            Some(parsed)
        }
        Err(_) => {
            tracing::warn!("Invalid value for {}: '{}'. Expected a number. Ignoring.", key, val);
            None
        }
    }
}
