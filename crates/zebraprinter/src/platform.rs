//! Platform Bluetooth primitives.
//!
//! These traits are the system boundary: adapter queries, bond management,
//! bonding-state notifications, and a byte-stream transport. The session
//! logic stands on them alone; `bluez` provides the Linux implementation.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::Result;

/// Bond state of a remote device, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondState {
    NotBonded,
    Bonding,
    Bonded,
}

/// Bonding-state-changed notification for a specific device.
#[derive(Debug, Clone)]
pub struct BondEvent {
    /// Device address, in whatever spelling the platform reports.
    pub address: String,
    pub state: BondState,
}

/// Fixed read-timing parameters applied to a freshly opened transport.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Maximum wait for the first byte of a reply.
    pub read_timeout: Duration,
    /// How long to keep waiting for more data once a reply has started.
    pub inter_byte_wait: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(10),
            inter_byte_wait: Duration::from_secs(1),
        }
    }
}

/// Byte-stream transport to a printer (SPP/RFCOMM on Linux).
#[async_trait]
pub trait Transport: Send {
    /// Cheap local connected flag; does not probe the device.
    fn is_connected(&self) -> bool;

    /// Write the whole buffer as one transmission.
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// One bounded read: wait up to `read_timeout` for data, then collect
    /// until the line stays quiet for `inter_byte_wait`. Returns an empty
    /// buffer when nothing arrived in time.
    async fn read(&mut self) -> Result<Vec<u8>>;

    /// Close the transport. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}

/// Platform Bluetooth radio: adapter state, bonding, and transport opening.
#[async_trait]
pub trait BluetoothRadio: Send + Sync {
    /// Whether a Bluetooth adapter exists at all.
    fn adapter_present(&self) -> bool;

    /// Whether the adapter is powered on.
    async fn adapter_enabled(&self) -> Result<bool>;

    /// Whether the process holds the permissions needed to use Bluetooth.
    fn permissions_granted(&self) -> bool;

    /// Current bond state of the device at `address`.
    async fn bond_state(&self, address: &str) -> Result<BondState>;

    /// Initiate bonding with the device at `address`. Returns whether the
    /// request was accepted; the outcome arrives as a [`BondEvent`].
    async fn request_bond(&self, address: &str) -> Result<bool>;

    /// Subscribe to bonding-state-changed notifications. Dropping the
    /// receiver unsubscribes.
    fn bond_events(&self) -> broadcast::Receiver<BondEvent>;

    /// Open a fresh byte-stream transport to the device at `address`.
    async fn open_transport(
        &self,
        address: &str,
        options: &TransportOptions,
    ) -> Result<Box<dyn Transport>>;
}
