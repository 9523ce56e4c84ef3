//! REST client for the profile backend.
//!
//! Provides the API endpoints the badge app consumes (auth, user lookup,
//! printer configuration), JWT claim decoding for expiry checks, and a
//! persisted token store.

pub mod api;
pub mod jwt;
pub mod models;
pub mod session;

// Re-exports for convenience
pub use api::ApiClient;
pub use models::{LoginRequest, PrinterInfo, UpdateUserRequest, User};
pub use session::TokenStore;

/// Unified error type for the profile-client crate.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication required: no valid token")]
    AuthRequired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for profile-client operations.
pub type Result<T> = std::result::Result<T, ProfileError>;
