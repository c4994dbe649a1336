//! Thin JSON transport to the remote scheduling service.
//!
//! [`ApiClient`] owns the base URL and a shared `reqwest` client, attaches
//! `Authorization: Bearer <token>` whenever its [`CredentialProvider`] has a
//! token, and turns non-2xx answers into [`ApiError::Status`].

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use slotbook_config::ApiConfig;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::services::CredentialProvider;

pub mod client;

/// Errors produced by [`ApiClient`].
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server answered with a non-2xx status. `message` is the `message`
    /// field of a JSON error body, when there was one.
    #[error("Request failed with status code {status}")]
    Status { status: u16, message: Option<String> },

    /// The request never produced a response (connect, timeout, TLS, ...).
    #[error("{0}")]
    Transport(String),

    /// A 2xx body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status for [`ApiError::Status`].
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The server-provided message, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// JSON client bound to one base URL.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.credentials.is_some())
            .finish()
    }
}

impl ApiClient {
    /// Creates an anonymous client for `base_url`.
    pub fn new(client: Client, base_url: impl Into<String>) -> Result<Self, ApiError> {
        let base_url = base_url.into();
        let trimmed = base_url.trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ApiError::InvalidUrl(base_url));
        }
        Ok(Self {
            client,
            base_url: trimmed.to_string(),
            credentials: None,
        })
    }

    /// Creates an anonymous client from the `[api]` config section.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = client::create_client(config.timeout_secs, true)?;
        Self::new(client, config.base_url.clone())
    }

    /// Returns a copy that authorizes requests with `provider`.
    pub fn with_credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET path`, decoding a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.client.get(self.url(path))).await?;
        Ok(response.json::<T>().await?)
    }

    /// `POST path` with a JSON body, decoding a JSON answer.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(self.client.post(self.url(path)).json(body)).await?;
        Ok(response.json::<T>().await?)
    }

    /// `POST path` with a JSON body, ignoring whatever the server answers.
    pub async fn post_unit<B>(&self, path: &str, body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.send(self.client.post(self.url(path)).json(body)).await?;
        Ok(())
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let token = self.credentials.as_ref().and_then(|c| c.bearer_token());
        let builder = match &token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        debug!(
            "{} {} -> {}",
            response.url().path(),
            if token.is_some() { "(bearer)" } else { "(anonymous)" },
            status
        );
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            if let (Some(provider), Some(sent)) = (&self.credentials, &token) {
                warn!("Server rejected the bearer credential, invalidating it");
                provider.invalidate(sent);
            }
        }

        let message = error_message(response).await;
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

/// Extracts `message` from a JSON error body.
async fn error_message(response: Response) -> Option<String> {
    let body = response.text().await.ok()?;
    let value: serde_json::Value = serde_json::from_str(&body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
