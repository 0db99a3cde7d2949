//! Configuration types for decoy.

mod listen;

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub use listen::{ListenConfig, LogFormat, LoggingConfig};

use crate::expectation::{ExpectationId, ExpectationStore, DEFAULT_LOG_CAPACITY};
use crate::serialization::parse_expectations;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Listener answering mocked traffic
    #[serde(default = "default_mock_listen")]
    pub mock: ListenConfig,

    /// Listener for the admin API
    #[serde(default = "default_admin_listen")]
    pub admin: ListenConfig,

    /// Number of received requests kept for `/retrieve?type=requests` (0 disables)
    #[serde(default = "default_request_log_capacity")]
    pub request_log_capacity: usize,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// JSON file with expectations registered at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_expectations: Option<PathBuf>,
}

fn default_mock_listen() -> ListenConfig {
    ListenConfig::new(1080)
}

fn default_admin_listen() -> ListenConfig {
    ListenConfig::new(1090)
}

fn default_request_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mock: default_mock_listen(),
            admin: default_admin_listen(),
            request_log_capacity: default_request_log_capacity(),
            logging: LoggingConfig::default(),
            initial_expectations: None,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.mock.port != 0 && self.mock.socket_addr() == self.admin.socket_addr() {
            anyhow::bail!(
                "Mock and admin listeners cannot share the address {}",
                self.mock.socket_addr()
            );
        }

        // Plain levels are checked; full EnvFilter directives are accepted as is
        let level = self.logging.level.trim();
        if level.is_empty() {
            anyhow::bail!("logging.level must not be empty");
        }
        if !level.contains(['=', ',']) && !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Unknown log level: '{}'. Expected one of: {}",
                level,
                LOG_LEVELS.join(", ")
            );
        }

        if let Some(path) = &self.initial_expectations {
            if path.as_os_str().is_empty() {
                anyhow::bail!("initial_expectations must not be an empty path");
            }
        }

        Ok(())
    }
}

/// Register the expectations stored in a JSON file (one object or an array).
pub fn load_expectations<P: AsRef<Path>>(
    path: P,
    store: &ExpectationStore,
) -> Result<Vec<ExpectationId>, anyhow::Error> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read expectations file {}", path.display()))?;
    let expectations = parse_expectations(&contents)
        .with_context(|| format!("Invalid expectations in {}", path.display()))?;

    Ok(store.add_all(expectations)?)
}
