use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::{AppError, AppResult};

pub const CONFIG_FILE: &str = "config.json";
const MAX_POLL_INTERVAL_MS: u64 = 500;

/// Tunables for the Java Edition status exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JavaProbeConfig {
    pub connect_timeout_ms: u64,
    /// Bound on the whole exchange, measured from the start of the connect.
    pub exchange_timeout_ms: u64,
    /// Send a ping after the status response to measure latency.
    pub measure_ping: bool,
}

impl Default for JavaProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 3_000,
            exchange_timeout_ms: 5_000,
            measure_ping: true,
        }
    }
}

impl JavaProbeConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_millis(self.exchange_timeout_ms.max(self.connect_timeout_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BedrockProbeConfig {
    pub response_timeout_ms: u64,
    /// Total ping attempts; 2 means one retry.
    pub attempts: u32,
}

impl Default for BedrockProbeConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: 2_000,
            attempts: 2,
        }
    }
}

impl BedrockProbeConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_ms: u64,
    pub deadline_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: MAX_POLL_INTERVAL_MS,
            deadline_secs: 300,
        }
    }
}

impl MonitorConfig {
    /// Poll interval, clamped so cancellation is always seen within 500ms.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.clamp(1, MAX_POLL_INTERVAL_MS))
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

/// Backend configuration persisted as `config.json` in the app config dir.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub java: JavaProbeConfig,
    pub bedrock: BedrockProbeConfig,
    pub batch_concurrency: usize,
    pub monitor: MonitorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            java: JavaProbeConfig::default(),
            bedrock: BedrockProbeConfig::default(),
            batch_concurrency: 8,
            monitor: MonitorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load `config.json` from `dir`, falling back to defaults when the file
    /// is missing or unreadable.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!("Cannot read {:?}: {}", path, e);
                return Self::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Corrupt {:?}, using defaults: {}", path, e);
            Self::default()
        })
    }

    pub fn save(&self, dir: &Path) -> AppResult<()> {
        std::fs::create_dir_all(dir).map_err(|source| AppError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|source| AppError::Io { path, source })
    }

    pub fn batch_concurrency(&self) -> usize {
        self.batch_concurrency.max(1)
    }
}
