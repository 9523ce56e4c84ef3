//! HTTP API client for the profile backend.

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use crate::models::{
    LoginRequest, LoginResponse, PrinterInfo, SavePrinterMacRequest, UpdateUserRequest, User,
};
use crate::{ProfileError, Result};

/// Typed client over the backend's REST endpoints.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn auth_headers(&self, token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {token}");
        let value = HeaderValue::from_str(&bearer)
            .map_err(|e| ProfileError::InvalidToken(format!("header value: {e}")))?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    /// Exchange credentials for a JWT.
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let resp = self
            .http
            .post(self.url("api/auth/login"))
            .json(&body)
            .send()
            .await?;
        let login: LoginResponse = Self::parse_json(resp).await?;
        Ok(login.token)
    }

    /// The user the token belongs to.
    pub async fn me(&self, token: &str) -> Result<User> {
        self.authenticated_get("api/users/me", token).await
    }

    /// Look up a user by username (the scanned badge code).
    pub async fn get_user_by_username(&self, token: &str, username: &str) -> Result<User> {
        self.authenticated_get(&format!("api/users/{username}"), token)
            .await
    }

    /// Update the user's editable profile fields.
    pub async fn update_user(&self, token: &str, body: &UpdateUserRequest) -> Result<()> {
        let resp = self
            .http
            .put(self.url("api/users/update"))
            .headers(self.auth_headers(token)?)
            .json(body)
            .send()
            .await?;
        Self::expect_success(resp).await
    }

    /// The configured printer, if the backend knows one.
    pub async fn get_printer_info(&self, token: &str) -> Result<PrinterInfo> {
        self.authenticated_get("api/printer/info", token).await
    }

    /// Persist the printer address on the backend.
    pub async fn save_printer_mac(&self, token: &str, mac: &str) -> Result<()> {
        let body = SavePrinterMacRequest {
            mac_address: mac.to_string(),
        };
        let resp = self
            .http
            .post(self.url("api/printer/mac"))
            .headers(self.auth_headers(token)?)
            .json(&body)
            .send()
            .await?;
        Self::expect_success(resp).await
    }

    /// Execute a GET with the bearer header and parse the JSON body.
    async fn authenticated_get<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T> {
        let resp = self
            .http
            .get(self.url(path))
            .headers(self.auth_headers(token)?)
            .send()
            .await?;
        Self::parse_json(resp).await
    }

    async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        let body = resp.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("got 401, stored token should be cleared");
            return Err(ProfileError::AuthRequired);
        }
        if !status.is_success() {
            return Err(ProfileError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn expect_success(resp: reqwest::Response) -> Result<()> {
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ProfileError::AuthRequired);
        }
        if !status.is_success() {
            let body = resp.text().await?;
            return Err(ProfileError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(())
    }
}
