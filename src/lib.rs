#[cfg(feature = "desktop")]
mod commands;
pub mod core;

#[cfg(feature = "desktop")]
use std::sync::Arc;

#[cfg(feature = "desktop")]
use tauri::{Emitter, Manager};

#[cfg(feature = "desktop")]
use crate::core::state::{default_data_dir, AppState};

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    crate::core::logging::init_tracing();

    tracing::info!("Craftlist starting...");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let data_dir = app
                .path()
                .app_config_dir()
                .unwrap_or_else(|_| default_data_dir());
            let state = Arc::new(AppState::new(data_dir)?);

            // Forward monitor events to the webview.
            let handle = app.handle().clone();
            let mut events = state.events.subscribe();
            tauri::async_runtime::spawn(async move {
                while let Some(event) = events.recv().await {
                    let _ = handle.emit(event.name(), &event);
                }
            });

            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_server_metadata,
            commands::get_servers_metadata,
            commands::parse_motd,
            commands::start_minecraft_monitoring,
            commands::stop_minecraft_monitoring,
            commands::is_monitoring,
            commands::get_monitoring_session,
            commands::get_setting,
            commands::set_setting,
            commands::get_minecraft_credentials,
            commands::delete_minecraft_credentials,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
