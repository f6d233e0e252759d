use crate::error::{Result, TutordeskError};
use crate::model::TimeOfDay;
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutordeskConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub availability: AvailabilityConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    /// Custom path for the SQLite database. Defaults to `~/.config/tutordesk/tutordesk.db`.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityConfig {
    /// Key the slot list is persisted under.
    #[serde(default = "default_availability_key")]
    pub storage_key: String,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            storage_key: default_availability_key(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// First grid row, `HH:MM`.
    #[serde(default = "default_day_start")]
    pub day_start: String,
    /// Grid rows stop before this time.
    #[serde(default = "default_day_end")]
    pub day_end: String,
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            day_start: default_day_start(),
            day_end: default_day_end(),
            slot_minutes: default_slot_minutes(),
        }
    }
}

impl ScheduleConfig {
    /// Row times for the weekly grid. Empty if the bounds don't parse;
    /// `validate()` resets them, so a loaded config always yields rows.
    pub fn time_slots(&self) -> Vec<TimeOfDay> {
        match (
            self.day_start.parse::<TimeOfDay>(),
            self.day_end.parse::<TimeOfDay>(),
        ) {
            (Ok(start), Ok(end)) => crate::grid::time_slots(start, end, self.slot_minutes),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// `memory` (demo fixtures) or `rest` (hosted table).
    #[serde(default = "default_remote_backend")]
    pub backend: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_remote_table")]
    pub table: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Env var consulted when `api_key` is unset.
    #[serde(default = "default_remote_key_env")]
    pub api_key_env: String,
    /// Poll interval for change detection; 0 disables polling.
    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            backend: default_remote_backend(),
            url: None,
            table: default_remote_table(),
            api_key: None,
            api_key_env: default_remote_key_env(),
            poll_seconds: default_poll_seconds(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    /// Explicit `api_key` wins, then the configured env var.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_deref() {
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }
        std::env::var(&self.api_key_env).map_err(|_| {
            TutordeskError::Config(format!(
                "rest session source requires an API key (set remote.api_key or {})",
                self.api_key_env
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_web_port")]
    pub port: u16,
    #[serde(default = "default_web_host")]
    pub host: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: default_web_port(),
            host: default_web_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Custom path for the activity log. Defaults to `~/.config/tutordesk/activity.jsonl`.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

// -- Defaults --

fn default_storage_backend() -> String {
    "sqlite".to_string()
}
fn default_availability_key() -> String {
    "tutorAvailability".to_string()
}
fn default_day_start() -> String {
    "09:00".to_string()
}
fn default_day_end() -> String {
    "19:00".to_string()
}
fn default_slot_minutes() -> u32 {
    60
}
fn default_remote_backend() -> String {
    "memory".to_string()
}
fn default_remote_table() -> String {
    "sessions".to_string()
}
fn default_remote_key_env() -> String {
    "TUTORDESK_REMOTE_KEY".to_string()
}
fn default_poll_seconds() -> u64 {
    30
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_web_port() -> u16 {
    37800
}
fn default_web_host() -> String {
    "127.0.0.1".to_string()
}
fn default_true() -> bool {
    true
}

/// Valid storage backend names.
pub const VALID_STORAGE_BACKENDS: &[&str] = &["sqlite", "memory"];

/// Valid remote session source names.
pub const VALID_REMOTE_BACKENDS: &[&str] = &["memory", "rest"];

impl TutordeskConfig {
    /// Load configuration with three-layer TOML merge:
    /// 1. ~/.config/tutordesk/config.toml (global)
    /// 2. .tutordesk/config.toml (project)
    /// 3. .tutordesk/config.local.toml (local, gitignored)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        if let Some(dir) = project_dir {
            let project_config = dir.join(".tutordesk").join("config.toml");
            if project_config.exists() {
                builder = builder.add_source(File::from(project_config).required(false));
            }

            let local_config = dir.join(".tutordesk").join("config.local.toml");
            if local_config.exists() {
                builder = builder.add_source(File::from(local_config).required(false));
            }
        }

        let config = builder
            .build()
            .map_err(|e| TutordeskError::Config(e.to_string()))?;

        let mut cfg: Self = config
            .try_deserialize()
            .map_err(|e| TutordeskError::Config(e.to_string()))?;

        cfg.validate();
        Ok(cfg)
    }

    /// Defaults only (no files).
    pub fn default_config() -> Self {
        Self {
            storage: StorageConfig::default(),
            availability: AvailabilityConfig::default(),
            schedule: ScheduleConfig::default(),
            remote: RemoteConfig::default(),
            web: WebConfig::default(),
            history: HistoryConfig::default(),
        }
    }

    /// Validate config values, resetting bad ones to defaults and logging warnings.
    /// Lenient: it fixes values rather than rejecting the config.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !VALID_STORAGE_BACKENDS.contains(&self.storage.backend.as_str()) {
            warnings.push(format!(
                "unknown storage backend '{}', valid: {}",
                self.storage.backend,
                VALID_STORAGE_BACKENDS.join(", ")
            ));
        }

        if !VALID_REMOTE_BACKENDS.contains(&self.remote.backend.as_str()) {
            warnings.push(format!(
                "unknown remote backend '{}', valid: {}",
                self.remote.backend,
                VALID_REMOTE_BACKENDS.join(", ")
            ));
        }

        if self.remote.backend == "rest" && self.remote.url.is_none() {
            warnings.push("remote.backend = rest but remote.url is not set".to_string());
        }

        if self.availability.storage_key.trim().is_empty() {
            warnings.push("availability.storage_key is empty, using default".to_string());
            self.availability.storage_key = default_availability_key();
        }

        let start = self.schedule.day_start.parse::<TimeOfDay>();
        if start.is_err() {
            warnings.push(format!(
                "schedule.day_start '{}' is not HH:MM, using {}",
                self.schedule.day_start,
                default_day_start()
            ));
            self.schedule.day_start = default_day_start();
        }
        let end = self.schedule.day_end.parse::<TimeOfDay>();
        if end.is_err() {
            warnings.push(format!(
                "schedule.day_end '{}' is not HH:MM, using {}",
                self.schedule.day_end,
                default_day_end()
            ));
            self.schedule.day_end = default_day_end();
        }
        if let (Ok(start), Ok(end)) = (start, end) {
            if start >= end {
                warnings.push(format!(
                    "schedule.day_start ({start}) is not before day_end ({end}), swapping"
                ));
                std::mem::swap(&mut self.schedule.day_start, &mut self.schedule.day_end);
            }
        }

        if self.schedule.slot_minutes == 0 {
            warnings.push("schedule.slot_minutes = 0, setting to 60".to_string());
            self.schedule.slot_minutes = default_slot_minutes();
        }

        if self.remote.timeout_secs == 0 {
            warnings.push("remote.timeout_secs = 0, setting to 10".to_string());
            self.remote.timeout_secs = default_timeout_secs();
        }

        for w in &warnings {
            tracing::warn!("config: {}", w);
        }

        warnings
    }

    /// Pretty TOML for `tutordesk config`.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TutordeskError::Config(e.to_string()))
    }

    /// Resolved SQLite path.
    pub fn db_path(&self) -> PathBuf {
        match &self.storage.path {
            Some(p) => PathBuf::from(p),
            None => config_dir().join("tutordesk.db"),
        }
    }

    /// Resolved activity log path.
    pub fn history_path(&self) -> PathBuf {
        match &self.history.path {
            Some(p) => PathBuf::from(p),
            None => config_dir().join("activity.jsonl"),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tutordesk")
}

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tutordesk").join("config.toml"))
}
