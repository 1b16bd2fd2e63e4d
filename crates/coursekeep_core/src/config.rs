//! Environment-driven core configuration.
//!
//! # Responsibility
//! - Resolve data/backup directories, deployment mode, backup cadence and
//!   retention from the process environment.
//!
//! # Invariants
//! - Interval is strictly positive; retention keeps at least one snapshot.
//! - Deployment mode is decided once, here, never at call sites.

use crate::backup::DEFAULT_RETAIN;
use crate::logging::{default_log_level, LogLevel};
use crate::schedule::DEFAULT_INTERVAL;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DATA_DIR: &str = "COURSEKEEP_DATA_DIR";
pub const ENV_BACKUP_DIR: &str = "COURSEKEEP_BACKUP_DIR";
pub const ENV_DEPLOYMENT: &str = "COURSEKEEP_DEPLOYMENT";
pub const ENV_BACKUP_INTERVAL_MS: &str = "COURSEKEEP_BACKUP_INTERVAL_MS";
pub const ENV_BACKUP_RETAIN: &str = "COURSEKEEP_BACKUP_RETAIN";
pub const ENV_LOG_LEVEL: &str = "COURSEKEEP_LOG_LEVEL";

/// Variables whose presence marks a short-lived serverless runtime.
const SERVERLESS_MARKERS: [&str; 2] = ["VERCEL", "AWS_LAMBDA_FUNCTION_NAME"];

/// Default collection type names.
pub const DEFAULT_COLLECTIONS: [&str; 3] = ["courses", "materials", "notes"];

/// Lifetime of the hosting process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentMode {
    /// Long-running server; periodic backup is meaningful.
    LongLived,
    /// Per-request execution; in-process timers have no continuity.
    Serverless,
}

impl DeploymentMode {
    pub fn allows_scheduler(self) -> bool {
        matches!(self, Self::LongLived)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        variable: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                variable,
                value,
                expected,
            } => write!(f, "invalid value `{value}` for {variable}; expected {expected}"),
        }
    }
}

impl Error for ConfigError {}

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub deployment: DeploymentMode,
    pub backup_interval: Duration,
    pub backup_retain: usize,
    pub log_level: LogLevel,
    pub collections: Vec<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            backup_dir: PathBuf::from("backups"),
            deployment: DeploymentMode::LongLived,
            backup_interval: DEFAULT_INTERVAL,
            backup_retain: DEFAULT_RETAIN,
            log_level: default_log_level(),
            collections: DEFAULT_COLLECTIONS.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl CoreConfig {
    /// Defaults rooted at explicit directories.
    pub fn with_dirs(data_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            backup_dir: backup_dir.into(),
            ..Self::default()
        }
    }

    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which returns a variable's value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(dir) = read(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = read(ENV_BACKUP_DIR) {
            config.backup_dir = PathBuf::from(dir);
        }

        config.deployment = match read(ENV_DEPLOYMENT) {
            Some(value) => parse_deployment(&value)?,
            None if SERVERLESS_MARKERS.iter().any(|name| read(*name).is_some()) => {
                DeploymentMode::Serverless
            }
            None => DeploymentMode::LongLived,
        };

        if let Some(value) = read(ENV_BACKUP_INTERVAL_MS) {
            let millis = value
                .parse::<u64>()
                .ok()
                .filter(|millis| *millis > 0)
                .ok_or(ConfigError::InvalidValue {
                    variable: ENV_BACKUP_INTERVAL_MS,
                    value: value.clone(),
                    expected: "a positive number of milliseconds",
                })?;
            config.backup_interval = Duration::from_millis(millis);
        }

        if let Some(value) = read(ENV_BACKUP_RETAIN) {
            config.backup_retain = value
                .parse::<usize>()
                .ok()
                .filter(|retain| *retain >= 1)
                .ok_or(ConfigError::InvalidValue {
                    variable: ENV_BACKUP_RETAIN,
                    value: value.clone(),
                    expected: "an integer >= 1",
                })?;
        }

        if let Some(value) = read(ENV_LOG_LEVEL) {
            config.log_level = LogLevel::parse(&value).ok_or(ConfigError::InvalidValue {
                variable: ENV_LOG_LEVEL,
                value: value.clone(),
                expected: LogLevel::EXPECTED,
            })?;
        }

        Ok(config)
    }

    /// Registers an additional collection type name.
    pub fn with_collection(mut self, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        if !self.collections.contains(&type_name) {
            self.collections.push(type_name);
        }
        self
    }
}

fn parse_deployment(value: &str) -> Result<DeploymentMode, ConfigError> {
    match value.to_ascii_lowercase().replace('-', "_").as_str() {
        "long_lived" | "server" => Ok(DeploymentMode::LongLived),
        "serverless" => Ok(DeploymentMode::Serverless),
        _ => Err(ConfigError::InvalidValue {
            variable: ENV_DEPLOYMENT,
            value: value.to_string(),
            expected: "long_lived|serverless",
        }),
    }
}
