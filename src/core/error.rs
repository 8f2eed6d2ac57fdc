use std::path::PathBuf;
use std::time::Duration;

use serde::ser::SerializeStruct;
use thiserror::Error;

/// Central error type for the server browser backend.
/// Every module returns `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Address ─────────────────────────────────────────
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    // ── Network ─────────────────────────────────────────
    #[error("Could not resolve host {host}")]
    DnsResolutionFailed { host: String },

    #[error("Connection to {address} refused: {reason}")]
    ConnectionRefused { address: String, reason: String },

    #[error("Timed out during {stage} after {}ms", .elapsed.as_millis())]
    Timeout {
        stage: &'static str,
        elapsed: Duration,
    },

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    // ── Monitor ─────────────────────────────────────────
    #[error("A monitoring session is already running")]
    AlreadyMonitoring,

    #[error("No credentials detected within {}s", .0.as_secs())]
    MonitoringTimeout(Duration),

    // ── Persistence ─────────────────────────────────────
    #[error("Settings persistence failed at {path:?}: {message}")]
    PersistenceError { path: PathBuf, message: String },

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Stable taxonomy name handed to the UI for user-facing translation.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidAddress(_) => "InvalidAddress",
            AppError::DnsResolutionFailed { .. } => "DnsResolutionFailed",
            AppError::ConnectionRefused { .. } => "ConnectionRefused",
            AppError::Timeout { .. } => "Timeout",
            AppError::ProtocolError(_) => "ProtocolError",
            AppError::AlreadyMonitoring => "AlreadyMonitoring",
            AppError::MonitoringTimeout(_) => "MonitoringTimeout",
            AppError::PersistenceError { .. } => "PersistenceError",
            AppError::Io { .. } => "Io",
            AppError::Json(_) => "Json",
            AppError::Other(_) => "Other",
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        AppError::ProtocolError(message.into())
    }

    pub fn persistence(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        AppError::PersistenceError {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(source: std::io::Error) -> Self {
        AppError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// ── Serialization for Tauri IPC ─────────────────────────
// Tauri commands require the error type to implement `Serialize`.
impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AppError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
