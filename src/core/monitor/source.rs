use std::ffi::OsStr;

use async_trait::async_trait;
use sysinfo::{ProcessRefreshKind, RefreshKind, System, UpdateKind};
use tracing::debug;

use super::credentials::Credentials;
use crate::core::error::{AppError, AppResult};

const CLIENT_MAIN_CLASS: &str = "net.minecraft.client.main.Main";

/// Where the monitor looks for a freshly launched, authenticated client.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// One non-blocking look. `Ok(None)` means "not yet".
    async fn poll(&self) -> AppResult<Option<Credentials>>;
}

/// Scans running processes for a game client and reads its launch arguments.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCredentialSource;

impl ProcessCredentialSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialSource for ProcessCredentialSource {
    async fn poll(&self) -> AppResult<Option<Credentials>> {
        tokio::task::spawn_blocking(scan_processes)
            .await
            .map_err(|e| AppError::Other(format!("process scan task failed: {e}")))
    }
}

/// Process names and command lines only; cpu, memory and disks are never read.
fn refresh_kind() -> RefreshKind {
    RefreshKind::new().with_processes(ProcessRefreshKind::new().with_cmd(UpdateKind::Always))
}

fn scan_processes() -> Option<Credentials> {
    let system = System::new_with_specifics(refresh_kind());

    for (pid, process) in system.processes() {
        let name = lossy(process.name());
        let cmd: Vec<String> = process.cmd().iter().map(lossy).collect();
        if !is_game_client(&name, &cmd) {
            continue;
        }

        match Credentials::from_launch_args(&cmd) {
            Some(credentials) => {
                debug!("Credentials found in process {} ({})", pid, name);
                return Some(credentials);
            }
            None => debug!("Process {} looks like a client but has partial credentials", pid),
        }
    }
    None
}

fn lossy(value: impl AsRef<OsStr>) -> String {
    value.as_ref().to_string_lossy().into_owned()
}

/// `java`/`javaw` (with or without `.exe`), or any process whose command
/// line runs the client main class.
pub fn is_game_client(name: &str, cmd: &[String]) -> bool {
    let name = name.to_ascii_lowercase();
    let stem = name.strip_suffix(".exe").unwrap_or(&name);
    matches!(stem, "java" | "javaw") || cmd.iter().any(|arg| arg == CLIENT_MAIN_CLASS)
}
