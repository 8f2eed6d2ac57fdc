use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::core::config::{AppConfig, CONFIG_FILE};
use crate::core::error::AppResult;
use crate::core::events::EventBus;
use crate::core::monitor::{CredentialMonitor, CredentialSource, ProcessCredentialSource};
use crate::core::settings::{JsonSettingsStore, SettingsStore};

const APP_DIR_NAME: &str = "craftlist";

/// Everything the command layer needs, owned in one place and handed to
/// Tauri as managed state.
pub struct AppState {
    pub config: AppConfig,
    pub settings: Arc<dyn SettingsStore>,
    pub events: EventBus,
    pub monitor: CredentialMonitor,
}

impl AppState {
    pub fn new(data_dir: PathBuf) -> AppResult<Self> {
        Self::with_source(data_dir, Arc::new(ProcessCredentialSource::new()))
    }

    pub fn with_source(data_dir: PathBuf, source: Arc<dyn CredentialSource>) -> AppResult<Self> {
        let config = load_or_seed_config(&data_dir);
        let settings: Arc<dyn SettingsStore> = Arc::new(JsonSettingsStore::open(&data_dir)?);
        let events = EventBus::new();
        let monitor = CredentialMonitor::new(
            source,
            settings.clone(),
            events.clone(),
            config.monitor.clone(),
        );

        info!("App state ready in {:?}", data_dir);
        Ok(Self {
            config,
            settings,
            events,
            monitor,
        })
    }
}

fn load_or_seed_config(dir: &Path) -> AppConfig {
    let config = AppConfig::load(dir);
    if !dir.join(CONFIG_FILE).exists() {
        if let Err(e) = config.save(dir) {
            warn!("Could not write default config to {:?}: {}", dir, e);
        }
    }
    config
}

/// Fallback location when the shell cannot provide an app config dir.
pub fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
