//! Printer runtime state and user-visible status messages.
//!
//! Every pipeline outcome maps to a distinct message; nothing is silently
//! dropped. The runtime state mirrors what a UI would show.

use std::sync::LazyLock;

use tokio::sync::RwLock;
use zebraprinter::EnvironmentStatus;

#[derive(Debug, Clone, Default)]
pub struct PrinterRuntimeState {
    pub connected: bool,
    pub target: Option<String>,
    pub last_message: Option<String>,
}

static PRINTER_RUNTIME: LazyLock<RwLock<PrinterRuntimeState>> =
    LazyLock::new(|| RwLock::new(PrinterRuntimeState::default()));

pub async fn runtime_state() -> PrinterRuntimeState {
    PRINTER_RUNTIME.read().await.clone()
}

pub async fn mark_connected(target: &str) {
    let mut rt = PRINTER_RUNTIME.write().await;
    rt.connected = true;
    rt.target = Some(target.to_string());
    rt.last_message = Some(format!("Connected ({target})"));
    tracing::info!(%target, "printer connected");
}

pub async fn mark_disconnected() {
    let mut rt = PRINTER_RUNTIME.write().await;
    rt.connected = false;
    rt.target = None;
}

/// Record a user-visible status message.
pub async fn mark_status(message: impl Into<String>) {
    let message = message.into();
    tracing::info!("{message}");
    let mut rt = PRINTER_RUNTIME.write().await;
    rt.last_message = Some(message);
}

/// Map an environment probe result to its status message.
pub fn environment_message(status: EnvironmentStatus) -> &'static str {
    match status {
        EnvironmentStatus::Ready => "Printer environment ready",
        EnvironmentStatus::MissingPermissions => "Bluetooth permissions not granted",
        EnvironmentStatus::AdapterUnavailable => "Bluetooth not available on this device",
        EnvironmentStatus::AdapterDisabled => "Please enable Bluetooth",
    }
}
