//! badge-station — headless companion for badge label printing.
//!
//! Logs in to the profile backend, manages the Bluetooth printer session,
//! and prints badge labels for scanned usernames.

mod config;
mod services;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use profile_client::{ApiClient, TokenStore};
use zebraprinter::bluez::BlueZRadio;
use zebraprinter::{EnvironmentStatus, PrinterSession};

use crate::config::AppConfig;
use crate::services::badge;
use crate::services::printer::{environment_message, mark_status, runtime_state};

#[derive(Parser)]
#[command(name = "badge-station", about = "Companion service for badge label printing")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in to the profile backend and store the session token.
    Login {
        username: String,
        #[arg(long, env = "BADGE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show environment, session, and printer state.
    Status,
    /// Pair and connect to the configured printer (or an explicit address).
    Connect {
        /// Printer address override; persisted to the backend when given.
        #[arg(long)]
        mac: Option<String>,
    },
    /// Print a badge label for a scanned or typed username.
    Print { code: String },
    /// Forget the stored session token.
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load();
    let api = ApiClient::new(config.api_base_url.clone());
    let mut store = TokenStore::load(config.session_file());

    match cli.command {
        Command::Login { username, password } => {
            let token = api
                .login(&username, &password)
                .await
                .context("login failed")?;
            store.save_token(&token).context("could not persist session")?;
            println!("Logged in as {username}");
        }
        Command::Status => {
            cmd_status(&config, &store).await;
        }
        Command::Connect { mac } => {
            let token = require_login(&store)?;
            cmd_connect(&config, &api, &token, mac).await?;
        }
        Command::Print { code } => {
            let token = require_login(&store)?;
            cmd_print(&config, &api, &token, &code).await?;
        }
        Command::Logout => {
            store.clear().context("could not clear session")?;
            println!("Logged out");
        }
    }

    Ok(())
}

fn require_login(store: &TokenStore) -> anyhow::Result<String> {
    if !store.is_logged_in() {
        bail!("not logged in (or session expired) - run `badge-station login` first");
    }
    store
        .token()
        .map(str::to_string)
        .context("no stored token")
}

async fn cmd_status(config: &AppConfig, store: &TokenStore) {
    match BlueZRadio::new(config.rfcomm_channel).await {
        Ok(radio) => {
            let session = PrinterSession::new(radio);
            let environment = session.check_environment().await;
            println!("Environment: {}", environment_message(environment));
        }
        Err(e) => {
            tracing::debug!(error = %e, "bluez radio unavailable");
            println!(
                "Environment: {}",
                environment_message(EnvironmentStatus::AdapterUnavailable)
            );
        }
    }

    println!(
        "Session: {}",
        if store.is_logged_in() {
            "logged in"
        } else {
            "logged out"
        }
    );

    let state = runtime_state().await;
    match state.target {
        Some(target) if state.connected => println!("Printer: connected ({target})"),
        _ => println!("Printer: not connected"),
    }
}

async fn cmd_connect(
    config: &AppConfig,
    api: &ApiClient,
    token: &str,
    mac: Option<String>,
) -> anyhow::Result<()> {
    let mut session = printer_session(config).await?;

    let environment = session.check_environment().await;
    if environment != EnvironmentStatus::Ready {
        bail!("{}", environment_message(environment));
    }

    let connected = match mac {
        Some(raw) => {
            let Some(mac) = badge::resolve_explicit_mac(&raw) else {
                bail!("'{raw}' is not a printer address");
            };
            // Persist the explicit address so other clients pick it up.
            if let Err(e) = api.save_printer_mac(token, &mac).await {
                tracing::warn!(error = %e, "could not save printer address");
                mark_status("Could not save printer address").await;
            }
            badge::connect_to(&mut session, &mac).await
        }
        None => badge::ensure_connected(&mut session, api, token).await,
    };

    report_outcome(connected).await
}

async fn cmd_print(
    config: &AppConfig,
    api: &ApiClient,
    token: &str,
    code: &str,
) -> anyhow::Result<()> {
    let mut session = printer_session(config).await?;
    let printed = badge::print_badge(&mut session, api, token, code).await;
    session.disconnect().await;
    report_outcome(printed).await
}

async fn printer_session(config: &AppConfig) -> anyhow::Result<PrinterSession<BlueZRadio>> {
    let radio = BlueZRadio::new(config.rfcomm_channel)
        .await
        .context("Bluetooth not available on this device")?;
    Ok(PrinterSession::new(radio))
}

async fn report_outcome(ok: bool) -> anyhow::Result<()> {
    let state = runtime_state().await;
    let message = state
        .last_message
        .unwrap_or_else(|| "No status recorded".to_string());
    if ok {
        println!("{message}");
        Ok(())
    } else {
        bail!("{message}");
    }
}
