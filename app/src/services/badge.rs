//! Badge printing pipeline.
//!
//! Reproduces the reference flow: resolve the printer address (explicit or
//! from the backend), pair, connect, fetch the user for a scanned code,
//! encode the label, print. Each step records its status message.

use profile_client::ApiClient;
use zebraprinter::address::{looks_like_mac, normalize_mac};
use zebraprinter::zpl::{self, LabelUser};
use zebraprinter::{BluetoothRadio, EnvironmentStatus, PrintRefusal, PrinterSession};

use super::printer::{environment_message, mark_connected, mark_disconnected, mark_status};

/// Validate and normalize an explicitly supplied printer address.
pub fn resolve_explicit_mac(raw: &str) -> Option<String> {
    looks_like_mac(raw).then(|| normalize_mac(raw))
}

/// Pair with and connect to the printer at `mac` (canonical form).
pub async fn connect_to<R: BluetoothRadio>(session: &mut PrinterSession<R>, mac: &str) -> bool {
    mark_status("Pairing with printer...").await;
    if !session.ensure_paired(mac).await {
        mark_status(format!("Pairing failed ({mac})")).await;
        return false;
    }

    mark_status("Establishing connection...").await;
    if session.connect(mac).await {
        mark_connected(mac).await;
        true
    } else {
        mark_disconnected().await;
        mark_status(format!("Connection failed ({mac})")).await;
        false
    }
}

/// Connect using the backend's printer configuration. Reuses an existing
/// live connection; loss of connection is only repaired here, explicitly.
pub async fn ensure_connected<R: BluetoothRadio>(
    session: &mut PrinterSession<R>,
    api: &ApiClient,
    token: &str,
) -> bool {
    if session.is_connected() {
        return true;
    }

    let info = match api.get_printer_info(token).await {
        Ok(info) => info,
        Err(e) => {
            tracing::error!(error = %e, "printer info fetch failed");
            mark_status("No printer info from server").await;
            return false;
        }
    };

    let Some(mac) = info.mac_address.filter(|m| !m.trim().is_empty()) else {
        mark_status("No MAC address configured").await;
        return false;
    };

    connect_to(session, &normalize_mac(&mac)).await
}

/// Print a badge label for a scanned or typed username.
pub async fn print_badge<R: BluetoothRadio>(
    session: &mut PrinterSession<R>,
    api: &ApiClient,
    token: &str,
    code: &str,
) -> bool {
    let environment = session.check_environment().await;
    if environment != EnvironmentStatus::Ready {
        mark_status(environment_message(environment)).await;
        return false;
    }

    if !ensure_connected(session, api, token).await {
        return false;
    }

    mark_status("Loading user data...").await;
    let user = match api.get_user_by_username(token, code).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(%code, error = %e, "user lookup failed");
            mark_status("User not found").await;
            return false;
        }
    };

    let label_user = LabelUser {
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
        role: user.role.clone(),
    };
    let label = zpl::user_label(&label_user, code);

    mark_status("Printing label...").await;
    if session.print_zpl(&label).await {
        mark_status("Print successful").await;
        true
    } else {
        let message = match session.last_refusal() {
            Some(PrintRefusal::HeadOpen) => "Cannot print: head is open",
            Some(PrintRefusal::PaperOut) => "Cannot print: paper out",
            None => "Print failed - check printer",
        };
        mark_status(message).await;
        false
    }
}
