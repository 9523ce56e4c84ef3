//! BlueZ (Linux) implementation of the platform traits.
//!
//! Uses `bluer` for adapter queries and bonding, and an RFCOMM (SPP) socket
//! as the byte-stream transport. Compiled only with the `bluez` feature.

use std::str::FromStr;

use async_trait::async_trait;
use bluer::rfcomm::{SocketAddr, Stream};
use bluer::{Adapter, Address, Session};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::broadcast;

use crate::address::normalize_mac;
use crate::platform::{BluetoothRadio, BondEvent, BondState, Transport, TransportOptions};
use crate::{Result, ZebraError};

const BOND_EVENT_CAPACITY: usize = 16;
const READ_CHUNK: usize = 4096;

/// Bluetooth radio backed by the BlueZ daemon.
pub struct BlueZRadio {
    _session: Session,
    adapter: Adapter,
    channel: u8,
    bond_tx: broadcast::Sender<BondEvent>,
}

impl BlueZRadio {
    /// Connect to the BlueZ daemon and claim the default adapter.
    ///
    /// `channel` is the RFCOMM channel the printer's SPP service listens on
    /// (commonly 1).
    pub async fn new(channel: u8) -> Result<Self> {
        let session = Session::new()
            .await
            .map_err(|e| ZebraError::Platform(format!("bluez session: {e}")))?;
        let adapter = session
            .default_adapter()
            .await
            .map_err(|_| ZebraError::AdapterUnavailable)?;
        let (bond_tx, _) = broadcast::channel(BOND_EVENT_CAPACITY);

        tracing::debug!(adapter = %adapter.name(), "bluez adapter ready");
        Ok(Self {
            _session: session,
            adapter,
            channel,
            bond_tx,
        })
    }

    fn parse_address(address: &str) -> Result<Address> {
        Address::from_str(&normalize_mac(address))
            .map_err(|e| ZebraError::Platform(format!("invalid address {address}: {e}")))
    }

    fn device(&self, address: &str) -> Result<bluer::Device> {
        let addr = Self::parse_address(address)?;
        self.adapter
            .device(addr)
            .map_err(|e| ZebraError::Platform(format!("device {address}: {e}")))
    }
}

#[async_trait]
impl BluetoothRadio for BlueZRadio {
    fn adapter_present(&self) -> bool {
        // Construction fails without an adapter, so a live radio has one.
        true
    }

    async fn adapter_enabled(&self) -> Result<bool> {
        self.adapter
            .is_powered()
            .await
            .map_err(|e| ZebraError::Platform(format!("adapter power: {e}")))
    }

    fn permissions_granted(&self) -> bool {
        // Linux has no runtime Bluetooth permission prompt; D-Bus access
        // problems surface as adapter errors instead.
        true
    }

    async fn bond_state(&self, address: &str) -> Result<BondState> {
        let device = self.device(address)?;
        let paired = device
            .is_paired()
            .await
            .map_err(|e| ZebraError::Pairing(format!("bond query: {e}")))?;
        Ok(if paired {
            BondState::Bonded
        } else {
            BondState::NotBonded
        })
    }

    async fn request_bond(&self, address: &str) -> Result<bool> {
        let device = self.device(address)?;
        let canonical = normalize_mac(address);
        let tx = self.bond_tx.clone();

        // BlueZ's Pair() call resolves when bonding finishes either way;
        // run it aside and report the outcome as a bond event.
        tokio::spawn(async move {
            let state = match device.pair().await {
                Ok(()) => BondState::Bonded,
                Err(e) => {
                    tracing::warn!(address = %canonical, error = %e, "pairing failed");
                    BondState::NotBonded
                }
            };
            let _ = tx.send(BondEvent {
                address: canonical,
                state,
            });
        });

        Ok(true)
    }

    fn bond_events(&self) -> broadcast::Receiver<BondEvent> {
        self.bond_tx.subscribe()
    }

    async fn open_transport(
        &self,
        address: &str,
        options: &TransportOptions,
    ) -> Result<Box<dyn Transport>> {
        let addr = Self::parse_address(address)?;
        let target = SocketAddr::new(addr, self.channel);

        tracing::debug!(%address, channel = self.channel, "opening rfcomm stream");
        let stream = Stream::connect(target)
            .await
            .map_err(|e| ZebraError::Transport(format!("rfcomm connect: {e}")))?;

        Ok(Box::new(RfcommTransport {
            stream: Some(stream),
            options: options.clone(),
        }))
    }
}

/// SPP byte-stream transport over an RFCOMM socket.
pub struct RfcommTransport {
    stream: Option<Stream>,
    options: TransportOptions,
}

#[async_trait]
impl Transport for RfcommTransport {
    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(ZebraError::NotConnected);
        };
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn read(&mut self) -> Result<Vec<u8>> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(ZebraError::NotConnected);
        };

        let mut buf = vec![0u8; READ_CHUNK];
        let mut out = Vec::new();

        // First chunk, bounded by the read timeout.
        match tokio::time::timeout(self.options.read_timeout, stream.read(&mut buf)).await {
            Ok(Ok(0)) => {
                self.stream = None;
                return Ok(out);
            }
            Ok(Ok(n)) => out.extend_from_slice(&buf[..n]),
            Ok(Err(e)) => {
                self.stream = None;
                return Err(e.into());
            }
            Err(_) => return Ok(out),
        }

        // Tail: keep collecting until the line stays quiet.
        loop {
            match tokio::time::timeout(self.options.inter_byte_wait, stream.read(&mut buf)).await {
                Ok(Ok(0)) => {
                    self.stream = None;
                    break;
                }
                Ok(Ok(n)) => out.extend_from_slice(&buf[..n]),
                Ok(Err(e)) => {
                    self.stream = None;
                    return Err(e.into());
                }
                Err(_) => break,
            }
        }

        Ok(out)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
        }
        Ok(())
    }
}
