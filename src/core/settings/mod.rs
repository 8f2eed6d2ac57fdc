// ─── Settings ───
// Flat string key/value persistence shared by the UI (theme, collapsed
// panels, ...) and the credential monitor.

pub mod json;

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::core::error::{AppError, AppResult};

pub use json::JsonSettingsStore;

pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// Write several keys at once. Implementations persist them together.
    fn set_many(&self, entries: &[(&str, &str)]) -> AppResult<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// In-process store, nothing touches the disk.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| AppError::persistence("<memory>", "settings lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| AppError::persistence("<memory>", "settings lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
