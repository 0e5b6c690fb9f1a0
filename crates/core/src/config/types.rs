use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
}

/// Ticket store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Storage backend type
    #[serde(default)]
    pub backend: StoreBackend,
    /// Database file path (used when backend = "sqlite")
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tornello.db")
}

/// Available storage backends
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Turnstile scanner gate configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerConfig {
    /// Upper bound in seconds on how long one redemption may hold the gate
    /// (default: 10)
    #[serde(default = "default_in_flight_timeout")]
    pub in_flight_timeout_secs: u64,
    /// How long in seconds the decision stays on screen before the next scan
    /// is accepted (default: 3)
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            in_flight_timeout_secs: default_in_flight_timeout(),
            cooldown_secs: default_cooldown(),
        }
    }
}

fn default_in_flight_timeout() -> u64 {
    10
}

fn default_cooldown() -> u64 {
    3
}
