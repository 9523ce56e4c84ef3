//! Application configuration from environment variables and `.env`.

use std::path::PathBuf;

const DEFAULT_API_BASE_URL: &str = "http://localhost:5062";
const DEFAULT_RFCOMM_CHANNEL: u8 = 1;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the profile backend.
    pub api_base_url: String,
    /// RFCOMM channel of the printer's SPP service.
    pub rfcomm_channel: u8,
    /// Directory for persisted state (session token).
    pub data_dir: PathBuf,
}

impl AppConfig {
    pub fn load() -> Self {
        load_dotenv();
        Self {
            api_base_url: std::env::var("BADGE_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            rfcomm_channel: parse_channel(std::env::var("BADGE_PRINTER_CHANNEL").ok()),
            data_dir: data_dir(),
        }
    }

    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }
}

fn parse_channel(raw: Option<String>) -> u8 {
    raw.and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_RFCOMM_CHANNEL)
}

/// Determine the data directory for the application.
fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BADGE_STATION_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".badge-station")
}

/// Load .env from candidate paths.
fn load_dotenv() {
    let candidates = [".env", "../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::debug!("Loaded .env from: {path}");
            return;
        }
    }
}
