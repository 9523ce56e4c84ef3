//! Device handle and host status queries.
//!
//! `ZebraPrinter` is obtained once per connection by probing the device's
//! control language over SGD, and answers `~HS` host status queries. Replies
//! are ASCII strings framed in STX (0x02) / ETX (0x03).

use crate::platform::Transport;
use crate::{Result, ZebraError};

const STX: u8 = 0x02;
const ETX: u8 = 0x03;

/// SGD query for the active command language.
const CMD_GET_LANGUAGE: &[u8] = b"! U1 getvar \"device.languages\"\n";

/// Host status query.
const CMD_HOST_STATUS: &[u8] = b"~HS";

/// Control language the printer reports over SGD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLanguage {
    Zpl,
    Cpcl,
    Unknown,
}

impl ControlLanguage {
    fn from_sgd_reply(reply: &str) -> Self {
        let value = reply.trim().trim_matches('"').to_ascii_lowercase();
        if value.contains("zpl") {
            ControlLanguage::Zpl
        } else if value.contains("cpcl") || value.contains("line_print") {
            ControlLanguage::Cpcl
        } else {
            ControlLanguage::Unknown
        }
    }
}

/// Status snapshot read immediately before printing. Never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostStatus {
    pub paper_out: bool,
    pub paused: bool,
    pub head_open: bool,
    pub buffer_full: bool,
}

impl HostStatus {
    /// Whether nothing blocks printing right now.
    pub fn ready_to_print(&self) -> bool {
        !self.paper_out && !self.paused && !self.head_open && !self.buffer_full
    }

    /// Parse the three STX/ETX-framed strings of a `~HS` reply.
    ///
    /// String 1 carries paper-out (field 2), pause (field 3), and
    /// buffer-full (field 6); string 2 carries head-up (field 3).
    pub fn parse(frames: &[Vec<u8>]) -> Result<Self> {
        if frames.len() < 2 {
            return Err(ZebraError::MalformedStatus(format!(
                "expected 3 status strings, got {}",
                frames.len()
            )));
        }

        let s1 = String::from_utf8_lossy(&frames[0]);
        let s2 = String::from_utf8_lossy(&frames[1]);
        let f1: Vec<&str> = s1.trim().split(',').collect();
        let f2: Vec<&str> = s2.trim().split(',').collect();

        if f1.len() < 6 || f2.len() < 3 {
            return Err(ZebraError::MalformedStatus(format!(
                "short status strings ({}/{} fields)",
                f1.len(),
                f2.len()
            )));
        }

        Ok(Self {
            paper_out: flag(f1[1]),
            paused: flag(f1[2]),
            buffer_full: flag(f1[5]),
            head_open: flag(f2[2]),
        })
    }
}

fn flag(field: &str) -> bool {
    field.trim() == "1"
}

/// Extract STX…ETX frames from a raw reply buffer.
pub fn read_frames(raw: &[u8]) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    let mut current: Option<Vec<u8>> = None;

    for &b in raw {
        match b {
            STX => current = Some(Vec::new()),
            ETX => {
                if let Some(frame) = current.take() {
                    frames.push(frame);
                }
            }
            _ => {
                if let Some(frame) = current.as_mut() {
                    frame.push(b);
                }
            }
        }
    }

    frames
}

/// Handle to a connected printer, created by probing the device once per
/// connection. Mediates every status read against the transport.
#[derive(Debug, Clone)]
pub struct ZebraPrinter {
    language: ControlLanguage,
}

impl ZebraPrinter {
    /// Probe the device's control language and build a handle.
    ///
    /// Fails when the device does not answer; the session treats that as a
    /// connect failure.
    pub async fn attach(transport: &mut dyn Transport) -> Result<Self> {
        transport.write(CMD_GET_LANGUAGE).await?;
        let reply = transport.read().await?;
        if reply.is_empty() {
            return Err(ZebraError::Identification(
                "no reply to language query".into(),
            ));
        }

        let text = String::from_utf8_lossy(&reply);
        let language = ControlLanguage::from_sgd_reply(&text);
        tracing::debug!(?language, "device identified");
        Ok(Self { language })
    }

    pub fn language(&self) -> ControlLanguage {
        self.language
    }

    /// Read a fresh status snapshot via `~HS`.
    pub async fn current_status(&self, transport: &mut dyn Transport) -> Result<HostStatus> {
        transport.write(CMD_HOST_STATUS).await?;
        let reply = transport.read().await?;
        let frames = read_frames(&reply);
        HostStatus::parse(&frames)
    }
}
