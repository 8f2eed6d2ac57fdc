use std::sync::Arc;

use tracing::{info, warn};

use crate::core::address::{Edition, ServerQuery};
use crate::core::error::{AppError, AppResult};
use crate::core::monitor::{self, Credentials, MonitorSession};
use crate::core::state::AppState;
use crate::core::status::{self, ServerStatus};
use crate::core::text::{parse_formatted, TextSection};

// ── Server status ───────────────────────────────────────

#[tauri::command]
pub async fn get_server_metadata(
    state: tauri::State<'_, Arc<AppState>>,
    address: String,
    port: Option<u16>,
    edition: Option<Edition>,
) -> AppResult<ServerStatus> {
    let query = ServerQuery::parse(&address, port, edition.unwrap_or_default())?;
    status::probe(&state.config, &query).await
}

#[tauri::command]
pub async fn get_servers_metadata(
    state: tauri::State<'_, Arc<AppState>>,
    addresses: Vec<String>,
) -> AppResult<Vec<ServerStatus>> {
    let results = status::probe_many(&state.config, addresses).await;
    Ok(status::successful(results))
}

#[tauri::command]
pub fn parse_motd(text: String) -> Vec<TextSection> {
    parse_formatted(&text)
}

// ── Credential monitoring ───────────────────────────────

#[tauri::command]
pub async fn start_minecraft_monitoring(state: tauri::State<'_, Arc<AppState>>) -> AppResult<()> {
    match state.monitor.start().await {
        Ok(session) => {
            info!("Monitoring session {:?} running", session.id);
            Ok(())
        }
        Err(AppError::AlreadyMonitoring) => {
            info!("Monitoring already running, ignoring start request");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[tauri::command]
pub async fn stop_minecraft_monitoring(state: tauri::State<'_, Arc<AppState>>) -> AppResult<()> {
    state.monitor.stop().await;
    Ok(())
}

#[tauri::command]
pub async fn is_monitoring(state: tauri::State<'_, Arc<AppState>>) -> AppResult<bool> {
    Ok(state.monitor.is_monitoring().await)
}

#[tauri::command]
pub async fn get_monitoring_session(
    state: tauri::State<'_, Arc<AppState>>,
) -> AppResult<MonitorSession> {
    Ok(state.monitor.session().await)
}

#[tauri::command]
pub fn get_minecraft_credentials(
    state: tauri::State<'_, Arc<AppState>>,
) -> AppResult<Option<Credentials>> {
    Credentials::load(state.settings.as_ref())
}

#[tauri::command]
pub fn delete_minecraft_credentials(state: tauri::State<'_, Arc<AppState>>) -> AppResult<()> {
    monitor::delete_credentials(state.settings.as_ref())?;
    info!("Stored Minecraft credentials cleared");
    Ok(())
}

// ── Settings ────────────────────────────────────────────

#[tauri::command]
pub fn get_setting(state: tauri::State<'_, Arc<AppState>>, key: String) -> AppResult<Option<String>> {
    state.settings.get(&key)
}

#[tauri::command]
pub fn set_setting(
    state: tauri::State<'_, Arc<AppState>>,
    key: String,
    value: String,
) -> AppResult<()> {
    state.settings.set(&key, &value).map_err(|e| {
        warn!("Failed to save setting {}: {}", key, e);
        e
    })
}
