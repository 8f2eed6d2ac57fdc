use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

use super::SettingsStore;
use crate::core::error::{AppError, AppResult};

pub const SETTINGS_FILE: &str = "settings.json";

/// Settings persisted as a pretty-printed JSON object.
///
/// The map is cached in memory; every write replaces the file through a
/// temporary sibling and a rename so a crash never leaves half a file.
#[derive(Debug)]
pub struct JsonSettingsStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonSettingsStore {
    /// Open (or lazily create) `settings.json` inside `dir`.
    pub fn open(dir: &Path) -> AppResult<Self> {
        let path = dir.join(SETTINGS_FILE);
        let values = match std::fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| AppError::persistence(&path, format!("corrupt settings: {e}")))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {:?}, starting empty", path);
                BTreeMap::new()
            }
            Err(e) => return Err(AppError::persistence(&path, e)),
        };

        info!("Loaded {} settings from {:?}", values.len(), path);
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn write_to_disk(&self, values: &BTreeMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::persistence(parent, e))?;
        }
        let json = serde_json::to_vec_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| AppError::persistence(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| AppError::persistence(&self.path, e))
    }

    fn update(&self, entries: &[(&str, &str)]) -> AppResult<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| AppError::persistence(&self.path, "settings lock poisoned"))?;

        let mut next = values.clone();
        for (key, value) in entries {
            next.insert((*key).to_string(), (*value).to_string());
        }
        self.write_to_disk(&next)?;
        *values = next;
        Ok(())
    }
}

impl SettingsStore for JsonSettingsStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| AppError::persistence(&self.path, "settings lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.update(&[(key, value)])
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> AppResult<()> {
        self.update(entries)
    }
}
