use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Log verbosity level.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Most verbose.
    Trace,
    /// Debug messages.
    Debug,
    /// Informational messages (default).
    #[default]
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// The level as a `tracing` filter directive.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// How multi-handler aggregation reacts to a failed handler.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialFailureSetting {
    /// The first handler error fails the whole request.
    #[default]
    FailFast,
    /// Failed handlers are dropped; only all-failed requests error.
    ReturnPartial,
}

/// Dependency-restore settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreConfig {
    /// The restore tool to run.
    #[serde(default = "default_restore_program")]
    pub program: String,
    /// Arguments passed to the restore tool.
    #[serde(default = "default_restore_args")]
    pub args: Vec<String>,
    /// Maximum concurrent restore runs. 0 means half the available
    /// cores.
    #[serde(default)]
    pub concurrency: usize,
}

fn default_restore_program() -> String {
    "dotnet".to_string()
}

fn default_restore_args() -> Vec<String> {
    vec!["restore".to_string()]
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            program: default_restore_program(),
            args: default_restore_args(),
            concurrency: 0,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log verbosity level.
    #[serde(default)]
    pub level: LogLevel,
    /// Optional path to a log file.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
        }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Positions on the wire are one-based. Internally everything is
    /// zero-based regardless.
    #[serde(default)]
    pub one_based_indices: bool,
    /// Aggregation policy for multi-handler endpoints.
    #[serde(default)]
    pub partial_failure: PartialFailureSetting,
    /// Budget for timeout-sensitive endpoints, in seconds (1–600).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Allow untracked files to fall back to the miscellaneous
    /// project.
    #[serde(default = "default_true")]
    pub enable_misc_files: bool,
    /// Dependency-restore settings.
    #[serde(default)]
    pub restore: RestoreConfig,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

fn default_timeout_secs() -> u64 {
    2
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            one_based_indices: false,
            partial_failure: PartialFailureSetting::FailFast,
            timeout_secs: 2,
            enable_misc_files: true,
            restore: RestoreConfig::default(),
            log: LogConfig::default(),
        }
    }
}
