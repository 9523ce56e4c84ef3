//! Bluetooth label printer control library for ZPL printers.
//!
//! Provides device address normalization, a pairing/connection/print session
//! manager, host status queries, and a ZPL badge label encoder.

pub mod address;
#[cfg(feature = "bluez")]
pub mod bluez;
pub mod platform;
pub mod session;
pub mod status;
pub mod zpl;

// Re-exports for convenience
pub use platform::{BluetoothRadio, BondEvent, BondState, Transport, TransportOptions};
pub use session::{EnvironmentStatus, PrintRefusal, PrinterSession, SessionOptions};
pub use status::{ControlLanguage, HostStatus, ZebraPrinter};

/// Label width in printer dots (4 cm at 203 dpi).
pub const LABEL_WIDTH_DOTS: u32 = 320;

/// Label height in printer dots (3 cm at 203 dpi).
pub const LABEL_HEIGHT_DOTS: u32 = 240;

/// Errors that can occur during printer operations.
#[derive(Debug, thiserror::Error)]
pub enum ZebraError {
    #[error("Bluetooth adapter unavailable")]
    AdapterUnavailable,

    #[error("Bluetooth platform error: {0}")]
    Platform(String),

    #[error("Pairing error: {0}")]
    Pairing(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Not connected to any printer")]
    NotConnected,

    #[error("Device identification failed: {0}")]
    Identification(String),

    #[error("Malformed status reply: {0}")]
    MalformedStatus(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for printer operations.
pub type Result<T> = std::result::Result<T, ZebraError>;
