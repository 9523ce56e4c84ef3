//! Printer session management: pairing, connecting, configuring, printing.
//!
//! One `PrinterSession` owns at most one live transport to one label printer
//! and mediates every read/write against it. Transport failures never escape
//! a public operation; every outcome is a bool or enum the caller can act on.

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::time::{sleep, timeout};

use crate::address::normalize_mac;
use crate::platform::{BluetoothRadio, BondState, Transport, TransportOptions};
use crate::status::ZebraPrinter;
use crate::{LABEL_HEIGHT_DOTS, LABEL_WIDTH_DOTS, Result};

/// Flush/cancel all pending jobs on the device.
const CMD_CANCEL_ALL: &[u8] = b"~JA\n";

/// Force the device command language to ZPL.
const CMD_LANGUAGE_ZPL: &[u8] = b"! U1 setvar \"device.languages\" \"zpl\"\n";

/// Continuous media sensing (no gap/notch autodetection).
const CMD_SENSE_MODE: &[u8] = b"! U1 setvar \"media.sense_mode\" \"bar\"\n";

/// Baseline print darkness.
const CMD_PRINT_TONE: &[u8] = b"! U1 setvar \"print.tone\" \"0\"\n";

/// Resume a paused printer.
const CMD_RESUME: &[u8] = b"~PS\n";

/// Result of the pre-flight environment probe, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentStatus {
    Ready,
    MissingPermissions,
    AdapterUnavailable,
    AdapterDisabled,
}

/// Device-refusal reason recorded by the last print attempt.
///
/// These are printer conditions, not transport errors; they do not tear
/// down the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintRefusal {
    HeadOpen,
    PaperOut,
}

/// All session timings, defaulting to the device-proven values.
///
/// The inter-command delays are the only synchronization with the device's
/// command parser; there is no acknowledgment protocol.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Upper bound on waiting for a bonding notification.
    pub pairing_timeout: Duration,
    /// Wait after the transport comes up before configuring.
    pub connect_settle: Duration,
    /// Delay after each configuration command.
    pub config_step_delay: Duration,
    /// Delay after the label geometry block.
    pub geometry_settle: Duration,
    /// Delay after resuming a paused printer.
    pub resume_settle: Duration,
    /// Delay after writing the payload.
    pub write_settle: Duration,
    /// Additional wait for the physical print to run.
    pub print_settle: Duration,
    /// Read timing for freshly opened transports.
    pub transport: TransportOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            pairing_timeout: Duration::from_secs(30),
            connect_settle: Duration::from_millis(500),
            config_step_delay: Duration::from_millis(200),
            geometry_settle: Duration::from_millis(300),
            resume_settle: Duration::from_millis(500),
            write_settle: Duration::from_millis(100),
            print_settle: Duration::from_secs(1),
            transport: TransportOptions::default(),
        }
    }
}

/// Manages the lifecycle of one Bluetooth connection to a label printer.
///
/// Operations take `&mut self`; callers needing cross-task access serialize
/// behind a mutex. One instance per device.
pub struct PrinterSession<R: BluetoothRadio> {
    radio: R,
    options: SessionOptions,
    transport: Option<Box<dyn Transport>>,
    printer: Option<ZebraPrinter>,
    last_refusal: Option<PrintRefusal>,
}

impl<R: BluetoothRadio> PrinterSession<R> {
    pub fn new(radio: R) -> Self {
        Self::with_options(radio, SessionOptions::default())
    }

    pub fn with_options(radio: R, options: SessionOptions) -> Self {
        Self {
            radio,
            options,
            transport: None,
            printer: None,
            last_refusal: None,
        }
    }

    /// Probe the Bluetooth environment. Side-effect free and re-callable;
    /// checks run in priority order: adapter presence, adapter power,
    /// permissions.
    pub async fn check_environment(&self) -> EnvironmentStatus {
        if !self.radio.adapter_present() {
            return EnvironmentStatus::AdapterUnavailable;
        }
        match self.radio.adapter_enabled().await {
            Ok(true) => {}
            Ok(false) => return EnvironmentStatus::AdapterDisabled,
            Err(e) => {
                tracing::warn!(error = %e, "adapter power query failed");
                return EnvironmentStatus::AdapterDisabled;
            }
        }
        if !self.radio.permissions_granted() {
            return EnvironmentStatus::MissingPermissions;
        }
        EnvironmentStatus::Ready
    }

    /// Ensure the device at `address` is bonded.
    ///
    /// Already-bonded devices return `true` without issuing a bond request.
    /// Otherwise a bond is requested and the matching bonding notification
    /// is awaited under the pairing timeout; timeout or rejection yields
    /// `false`. The event subscription is dropped on every path.
    pub async fn ensure_paired(&self, address: &str) -> bool {
        if !self.radio.permissions_granted() {
            tracing::error!("bluetooth permissions not granted");
            return false;
        }
        if !self.radio.adapter_present() {
            tracing::error!("no bluetooth adapter");
            return false;
        }

        match self.try_pair(address).await {
            Ok(paired) => paired,
            Err(e) => {
                tracing::error!(%address, error = %e, "pairing error");
                false
            }
        }
    }

    async fn try_pair(&self, address: &str) -> Result<bool> {
        if self.radio.bond_state(address).await? == BondState::Bonded {
            tracing::debug!(%address, "device already paired");
            return Ok(true);
        }

        tracing::debug!(%address, "starting pairing");

        // Subscribe before requesting the bond so the outcome cannot race
        // past us.
        let mut events = self.radio.bond_events();

        if !self.radio.request_bond(address).await? {
            return Ok(false);
        }

        let target = normalize_mac(address);
        let wait_for_bond = async {
            loop {
                match events.recv().await {
                    Ok(event) if normalize_mac(&event.address) == target => match event.state {
                        BondState::Bonded => {
                            tracing::debug!(%address, "pairing successful");
                            break true;
                        }
                        BondState::NotBonded => {
                            tracing::debug!(%address, "pairing failed");
                            break false;
                        }
                        BondState::Bonding => continue,
                    },
                    Ok(_) => continue,
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break false,
                }
            }
        };

        match timeout(self.options.pairing_timeout, wait_for_bond).await {
            Ok(bonded) => Ok(bonded),
            Err(_) => {
                tracing::warn!(%address, "pairing timed out");
                Ok(false)
            }
        }
    }

    /// Open a connection to `address`, replacing any existing one.
    ///
    /// Tears down the prior connection first, opens a fresh transport,
    /// obtains the device handle, and runs the full configuration sequence.
    /// Any failure closes the fresh transport and leaves the session
    /// disconnected; at most one transport is ever open.
    pub async fn connect(&mut self, address: &str) -> bool {
        tracing::debug!(%address, "connecting");

        self.disconnect().await;

        let mut transport = match self
            .radio
            .open_transport(address, &self.options.transport)
            .await
        {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(%address, error = %e, "failed to open transport");
                return false;
            }
        };

        if !transport.is_connected() {
            tracing::error!(%address, "transport did not come up");
            self.close_quietly(transport.as_mut()).await;
            return false;
        }

        match self.bring_up(transport.as_mut()).await {
            Ok(printer) => {
                self.transport = Some(transport);
                self.printer = Some(printer);
                tracing::info!(%address, "connected and configured");
                true
            }
            Err(e) => {
                tracing::error!(%address, error = %e, "connection error");
                self.close_quietly(transport.as_mut()).await;
                false
            }
        }
    }

    async fn bring_up(&self, transport: &mut dyn Transport) -> Result<ZebraPrinter> {
        let printer = ZebraPrinter::attach(transport).await?;
        sleep(self.options.connect_settle).await;
        self.configure(transport).await?;
        Ok(printer)
    }

    /// Run the device configuration sequence. Each command is followed by a
    /// fixed delay to let the device's parser keep pace; nothing is
    /// acknowledged. Errors propagate as connect failure.
    async fn configure(&self, transport: &mut dyn Transport) -> Result<()> {
        tracing::debug!("configuring printer");
        let step = self.options.config_step_delay;

        transport.write(CMD_CANCEL_ALL).await?;
        sleep(step).await;

        transport.write(CMD_LANGUAGE_ZPL).await?;
        sleep(step).await;

        let geometry = format!(
            "^XA\n^PW{LABEL_WIDTH_DOTS}\n^LL{LABEL_HEIGHT_DOTS}\n^LS0\n^LH0,0\n^XZ"
        );
        transport.write(geometry.as_bytes()).await?;
        sleep(self.options.geometry_settle).await;

        // Some firmware honors the SGD path but not the ZPL block, or the
        // other way around; set the geometry through both.
        let width = format!("! U1 setvar \"zpl.print_width\" \"{LABEL_WIDTH_DOTS}\"\n");
        transport.write(width.as_bytes()).await?;
        sleep(step).await;

        let length = format!("! U1 setvar \"zpl.label_length\" \"{LABEL_HEIGHT_DOTS}\"\n");
        transport.write(length.as_bytes()).await?;
        sleep(step).await;

        transport.write(CMD_SENSE_MODE).await?;
        sleep(step).await;

        transport.write(CMD_PRINT_TONE).await?;
        sleep(step).await;

        tracing::debug!("printer configuration complete");
        Ok(())
    }

    /// Cheap query of the transport's connected flag; no device probe.
    pub fn is_connected(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_connected())
    }

    /// Device-refusal reason from the last `print_zpl` attempt, if any.
    pub fn last_refusal(&self) -> Option<PrintRefusal> {
        self.last_refusal
    }

    /// Send a ZPL payload to the connected printer.
    ///
    /// Requires an open connection and a device handle; there is no
    /// implicit reconnect. A best-effort status read gates the write:
    /// head-open and paper-out refuse without sending anything, a paused
    /// printer is resumed first. `true` means the data was transmitted,
    /// not that a physical label was verified.
    pub async fn print_zpl(&mut self, zpl: &str) -> bool {
        self.last_refusal = None;

        if !self.is_connected() || self.printer.is_none() {
            tracing::error!("no active connection or printer handle");
            return false;
        }

        match self.try_print(zpl).await {
            Ok(sent) => sent,
            Err(e) => {
                tracing::error!(error = %e, "print error");
                false
            }
        }
    }

    async fn try_print(&mut self, zpl: &str) -> Result<bool> {
        let Some(transport) = self.transport.as_mut() else {
            return Ok(false);
        };
        let Some(printer) = self.printer.as_ref() else {
            return Ok(false);
        };

        tracing::debug!("checking printer status");
        let status = match printer.current_status(transport.as_mut()).await {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!(error = %e, "could not read printer status");
                None
            }
        };

        if let Some(status) = status {
            if status.head_open {
                tracing::error!("cannot print: head open");
                self.last_refusal = Some(PrintRefusal::HeadOpen);
                return Ok(false);
            } else if status.paper_out {
                tracing::error!("cannot print: paper out");
                self.last_refusal = Some(PrintRefusal::PaperOut);
                return Ok(false);
            } else if status.paused {
                tracing::warn!("printer paused, resuming");
                transport.write(CMD_RESUME).await?;
                sleep(self.options.resume_settle).await;
            } else if !status.ready_to_print() {
                tracing::warn!("printer not ready, attempting to print anyway");
            }
        }

        tracing::debug!(bytes = zpl.len(), "sending ZPL payload");
        transport.write(zpl.as_bytes()).await?;

        sleep(self.options.write_settle).await;
        sleep(self.options.print_settle).await;

        tracing::debug!("ZPL payload sent");
        Ok(true)
    }

    /// Close the transport and release the device handle. No-op when
    /// already disconnected; close errors are logged, never propagated.
    pub async fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            self.close_quietly(transport.as_mut()).await;
            tracing::debug!("disconnected");
        }
        self.printer = None;
    }

    async fn close_quietly(&self, transport: &mut dyn Transport) {
        if let Err(e) = transport.close().await {
            tracing::warn!(error = %e, "error closing transport");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tokio::sync::broadcast;

    use super::*;
    use crate::platform::BondEvent;
    use crate::{Result, ZebraError};

    /// Shared view into a mock transport, kept by the test for assertions.
    #[derive(Clone)]
    struct TransportProbe {
        writes: Arc<Mutex<Vec<Vec<u8>>>>,
        open: Arc<AtomicBool>,
    }

    impl TransportProbe {
        fn new() -> Self {
            Self {
                writes: Arc::new(Mutex::new(Vec::new())),
                open: Arc::new(AtomicBool::new(true)),
            }
        }

        fn is_open(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }

        fn writes(&self) -> Vec<String> {
            self.writes
                .lock()
                .unwrap()
                .iter()
                .map(|w| String::from_utf8_lossy(w).into_owned())
                .collect()
        }
    }

    struct MockTransport {
        probe: TransportProbe,
        reads: VecDeque<Vec<u8>>,
        fail_write_containing: Option<&'static str>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        fn is_connected(&self) -> bool {
            self.probe.is_open()
        }

        async fn write(&mut self, data: &[u8]) -> Result<()> {
            if let Some(pattern) = self.fail_write_containing {
                if String::from_utf8_lossy(data).contains(pattern) {
                    return Err(ZebraError::Transport("scripted write failure".into()));
                }
            }
            self.probe.writes.lock().unwrap().push(data.to_vec());
            Ok(())
        }

        async fn read(&mut self) -> Result<Vec<u8>> {
            Ok(self.reads.pop_front().unwrap_or_default())
        }

        async fn close(&mut self) -> Result<()> {
            self.probe.open.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    struct MockRadio {
        present: bool,
        enabled: bool,
        permitted: bool,
        bond_states: HashMap<String, BondState>,
        bond_requests: Arc<Mutex<Vec<String>>>,
        /// Events emitted when a bond request comes in.
        bond_replies: Vec<BondEvent>,
        bond_tx: broadcast::Sender<BondEvent>,
        transports: Mutex<VecDeque<MockTransport>>,
    }

    impl MockRadio {
        fn new() -> Self {
            let (bond_tx, _) = broadcast::channel(16);
            Self {
                present: true,
                enabled: true,
                permitted: true,
                bond_states: HashMap::new(),
                bond_requests: Arc::new(Mutex::new(Vec::new())),
                bond_replies: Vec::new(),
                bond_tx,
                transports: Mutex::new(VecDeque::new()),
            }
        }

        fn with_transport(self, transport: MockTransport) -> Self {
            self.transports.lock().unwrap().push_back(transport);
            self
        }

        fn bond_request_count(&self) -> usize {
            self.bond_requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl BluetoothRadio for MockRadio {
        fn adapter_present(&self) -> bool {
            self.present
        }

        async fn adapter_enabled(&self) -> Result<bool> {
            Ok(self.enabled)
        }

        fn permissions_granted(&self) -> bool {
            self.permitted
        }

        async fn bond_state(&self, address: &str) -> Result<BondState> {
            Ok(self
                .bond_states
                .get(&normalize_mac(address))
                .copied()
                .unwrap_or(BondState::NotBonded))
        }

        async fn request_bond(&self, address: &str) -> Result<bool> {
            self.bond_requests.lock().unwrap().push(address.to_string());
            for event in &self.bond_replies {
                let _ = self.bond_tx.send(event.clone());
            }
            Ok(true)
        }

        fn bond_events(&self) -> broadcast::Receiver<BondEvent> {
            self.bond_tx.subscribe()
        }

        async fn open_transport(
            &self,
            _address: &str,
            _options: &TransportOptions,
        ) -> Result<Box<dyn Transport>> {
            self.transports
                .lock()
                .unwrap()
                .pop_front()
                .map(|t| Box::new(t) as Box<dyn Transport>)
                .ok_or_else(|| ZebraError::Transport("no transport scripted".into()))
        }
    }

    const ADDR: &str = "AA:BB:CC:DD:EE:FF";

    fn fast_options() -> SessionOptions {
        SessionOptions {
            pairing_timeout: Duration::from_millis(50),
            connect_settle: Duration::ZERO,
            config_step_delay: Duration::ZERO,
            geometry_settle: Duration::ZERO,
            resume_settle: Duration::ZERO,
            write_settle: Duration::ZERO,
            print_settle: Duration::ZERO,
            transport: TransportOptions::default(),
        }
    }

    fn sgd_language_reply() -> Vec<u8> {
        b"\"zpl\"\r\n".to_vec()
    }

    fn host_status_reply(paper_out: bool, paused: bool, head_open: bool) -> Vec<u8> {
        let s1 = format!(
            "014,{},{},0240,000,0,0,0,000,0,0,0",
            paper_out as u8, paused as u8
        );
        let s2 = format!("001,0,{},0,1,2,4,0,00000000,1,000", head_open as u8);
        let mut out = Vec::new();
        for s in [s1.as_str(), s2.as_str(), "1234,0"] {
            out.push(0x02);
            out.extend_from_slice(s.as_bytes());
            out.push(0x03);
            out.extend_from_slice(b"\r\n");
        }
        out
    }

    fn transport_with_reads(reads: Vec<Vec<u8>>) -> (MockTransport, TransportProbe) {
        let probe = TransportProbe::new();
        let transport = MockTransport {
            probe: probe.clone(),
            reads: reads.into(),
            fail_write_containing: None,
        };
        (transport, probe)
    }

    #[tokio::test]
    async fn environment_checks_run_in_priority_order() {
        let mut radio = MockRadio::new();
        radio.present = false;
        radio.permitted = false;
        let session = PrinterSession::with_options(radio, fast_options());
        assert_eq!(
            session.check_environment().await,
            EnvironmentStatus::AdapterUnavailable
        );

        let mut radio = MockRadio::new();
        radio.enabled = false;
        radio.permitted = false;
        let session = PrinterSession::with_options(radio, fast_options());
        assert_eq!(
            session.check_environment().await,
            EnvironmentStatus::AdapterDisabled
        );

        let mut radio = MockRadio::new();
        radio.permitted = false;
        let session = PrinterSession::with_options(radio, fast_options());
        assert_eq!(
            session.check_environment().await,
            EnvironmentStatus::MissingPermissions
        );

        let session = PrinterSession::with_options(MockRadio::new(), fast_options());
        assert_eq!(session.check_environment().await, EnvironmentStatus::Ready);
    }

    #[tokio::test]
    async fn ensure_paired_bonded_device_is_a_no_op() {
        let mut radio = MockRadio::new();
        radio
            .bond_states
            .insert(normalize_mac(ADDR), BondState::Bonded);
        let session = PrinterSession::with_options(radio, fast_options());

        assert!(session.ensure_paired(ADDR).await);
        assert_eq!(session.radio.bond_request_count(), 0);
    }

    #[tokio::test]
    async fn ensure_paired_resolves_on_bonded_event() {
        let mut radio = MockRadio::new();
        radio.bond_replies = vec![BondEvent {
            address: ADDR.to_string(),
            state: BondState::Bonded,
        }];
        let session = PrinterSession::with_options(radio, fast_options());

        assert!(session.ensure_paired(ADDR).await);
        assert_eq!(session.radio.bond_request_count(), 1);
    }

    #[tokio::test]
    async fn ensure_paired_reports_rejection() {
        let mut radio = MockRadio::new();
        radio.bond_replies = vec![BondEvent {
            address: ADDR.to_string(),
            state: BondState::NotBonded,
        }];
        let session = PrinterSession::with_options(radio, fast_options());

        assert!(!session.ensure_paired(ADDR).await);
    }

    #[tokio::test]
    async fn ensure_paired_ignores_other_devices() {
        let mut radio = MockRadio::new();
        radio.bond_replies = vec![
            BondEvent {
                address: "11:22:33:44:55:66".to_string(),
                state: BondState::NotBonded,
            },
            BondEvent {
                address: "aabbccddeeff".to_string(),
                state: BondState::Bonded,
            },
        ];
        let session = PrinterSession::with_options(radio, fast_options());

        // The unrelated rejection must not cross-resolve the wait; the
        // bare-hex spelling of the target address must.
        assert!(session.ensure_paired(ADDR).await);
    }

    #[tokio::test]
    async fn ensure_paired_times_out_and_unsubscribes() {
        let radio = MockRadio::new();
        let session = PrinterSession::with_options(radio, fast_options());

        assert!(!session.ensure_paired(ADDR).await);
        assert_eq!(session.radio.bond_tx.receiver_count(), 0);
    }

    #[tokio::test]
    async fn connect_runs_configuration_in_order() {
        let (transport, probe) = transport_with_reads(vec![sgd_language_reply()]);
        let radio = MockRadio::new().with_transport(transport);
        let mut session = PrinterSession::with_options(radio, fast_options());

        assert!(session.connect(ADDR).await);
        assert!(session.is_connected());

        let writes = probe.writes();
        assert_eq!(writes.len(), 8);
        assert!(writes[0].contains("getvar \"device.languages\""));
        assert!(writes[1].starts_with("~JA"));
        assert!(writes[2].contains("setvar \"device.languages\" \"zpl\""));
        assert!(writes[3].contains("^PW320"));
        assert!(writes[3].contains("^LL240"));
        assert!(writes[4].contains("zpl.print_width"));
        assert!(writes[5].contains("zpl.label_length"));
        assert!(writes[6].contains("media.sense_mode"));
        assert!(writes[7].contains("print.tone"));
    }

    #[tokio::test]
    async fn connect_replaces_existing_connection() {
        let (t1, p1) = transport_with_reads(vec![sgd_language_reply()]);
        let (t2, p2) = transport_with_reads(vec![sgd_language_reply()]);
        let radio = MockRadio::new().with_transport(t1).with_transport(t2);
        let mut session = PrinterSession::with_options(radio, fast_options());

        assert!(session.connect(ADDR).await);
        assert!(p1.is_open());

        assert!(session.connect(ADDR).await);
        assert!(!p1.is_open(), "first transport must be torn down");
        assert!(p2.is_open());
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn failed_connect_leaves_no_open_transport() {
        let (t1, p1) = transport_with_reads(vec![sgd_language_reply()]);
        let probe2 = TransportProbe::new();
        let t2 = MockTransport {
            probe: probe2.clone(),
            reads: VecDeque::from(vec![sgd_language_reply()]),
            fail_write_containing: Some("media.sense_mode"),
        };
        let radio = MockRadio::new().with_transport(t1).with_transport(t2);
        let mut session = PrinterSession::with_options(radio, fast_options());

        assert!(session.connect(ADDR).await);
        assert!(p1.is_open());

        assert!(!session.connect(ADDR).await);
        assert!(!p1.is_open());
        assert!(!probe2.is_open(), "failed transport must be closed");
        assert!(!session.is_connected());

        // Handle is cleared too: printing refuses outright.
        let writes_before = probe2.writes().len();
        assert!(!session.print_zpl("^XA^XZ").await);
        assert_eq!(probe2.writes().len(), writes_before);
    }

    #[tokio::test]
    async fn print_refuses_without_connection() {
        let session_radio = MockRadio::new();
        let mut session = PrinterSession::with_options(session_radio, fast_options());
        assert!(!session.print_zpl("^XA^XZ").await);
    }

    async fn connected_session(
        status_reply: Vec<u8>,
    ) -> (PrinterSession<MockRadio>, TransportProbe) {
        let (transport, probe) =
            transport_with_reads(vec![sgd_language_reply(), status_reply]);
        let radio = MockRadio::new().with_transport(transport);
        let mut session = PrinterSession::with_options(radio, fast_options());
        assert!(session.connect(ADDR).await);
        (session, probe)
    }

    #[tokio::test]
    async fn print_head_open_sends_nothing() {
        let (mut session, probe) =
            connected_session(host_status_reply(false, false, true)).await;
        let connect_writes = probe.writes().len();

        assert!(!session.print_zpl("^XA^FDtest^FS^XZ").await);
        assert_eq!(session.last_refusal(), Some(PrintRefusal::HeadOpen));

        let writes = probe.writes();
        // Only the status query goes out; zero payload writes.
        assert_eq!(writes.len(), connect_writes + 1);
        assert!(writes.last().unwrap().starts_with("~HS"));
        assert!(session.is_connected(), "refusal must not disconnect");
    }

    #[tokio::test]
    async fn print_paper_out_sends_nothing() {
        let (mut session, probe) =
            connected_session(host_status_reply(true, false, false)).await;
        let connect_writes = probe.writes().len();

        assert!(!session.print_zpl("^XA^FDtest^FS^XZ").await);
        assert_eq!(session.last_refusal(), Some(PrintRefusal::PaperOut));
        assert_eq!(probe.writes().len(), connect_writes + 1);
    }

    #[tokio::test]
    async fn print_paused_resumes_exactly_once() {
        let (mut session, probe) =
            connected_session(host_status_reply(false, true, false)).await;

        assert!(session.print_zpl("^XA^FDtest^FS^XZ").await);

        let writes = probe.writes();
        let resumes: Vec<usize> = writes
            .iter()
            .enumerate()
            .filter(|(_, w)| w.starts_with("~PS"))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(resumes.len(), 1);

        let payload_at = writes
            .iter()
            .position(|w| w.contains("^FDtest"))
            .expect("payload written");
        assert!(resumes[0] < payload_at, "resume precedes the payload");
    }

    #[tokio::test]
    async fn print_ready_sends_one_full_payload() {
        let (mut session, probe) =
            connected_session(host_status_reply(false, false, false)).await;
        let zpl = "^XA^FO10,10^FDtest^FS^XZ";

        assert!(session.print_zpl(zpl).await);

        let writes = probe.writes();
        let payloads: Vec<&String> = writes.iter().filter(|w| w.contains("^FDtest")).collect();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].as_str(), zpl);
    }

    #[tokio::test]
    async fn print_with_unreadable_status_proceeds() {
        // No status reply scripted: the read comes back empty, the status
        // is unknown, and printing goes ahead anyway.
        let (mut session, probe) = connected_session(Vec::new()).await;

        assert!(session.print_zpl("^XA^FDtest^FS^XZ").await);
        assert!(probe.writes().iter().any(|w| w.contains("^FDtest")));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let (transport, probe) = transport_with_reads(vec![sgd_language_reply()]);
        let radio = MockRadio::new().with_transport(transport);
        let mut session = PrinterSession::with_options(radio, fast_options());

        assert!(session.connect(ADDR).await);
        session.disconnect().await;
        assert!(!session.is_connected());
        assert!(!probe.is_open());

        // Second disconnect is a no-op.
        session.disconnect().await;
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn end_to_end_pair_connect_print() {
        let raw_input = "aabbccddeeff";
        let address = normalize_mac(raw_input);
        assert_eq!(address, "AA:BB:CC:DD:EE:FF");

        let (transport, probe) = transport_with_reads(vec![
            sgd_language_reply(),
            host_status_reply(false, false, false),
        ]);
        let mut radio = MockRadio::new().with_transport(transport);
        radio
            .bond_states
            .insert(address.clone(), BondState::Bonded);
        let mut session = PrinterSession::with_options(radio, fast_options());

        assert!(session.ensure_paired(&address).await);
        assert_eq!(session.radio.bond_request_count(), 0);

        assert!(session.connect(&address).await);

        let zpl = "^XA^FO10,10^FDJane^FS^XZ";
        assert!(session.print_zpl(zpl).await);

        let writes = probe.writes();
        let payloads: Vec<&String> = writes.iter().filter(|w| w.contains("^FDJane")).collect();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].as_str(), zpl);
    }
}
