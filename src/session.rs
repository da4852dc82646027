//! Exchange of configured credentials for an upstream session token.

use std::fmt;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::Error;

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A freshly issued session token.
#[derive(Clone, Debug)]
pub struct SessionGrant {
    pub token: String,
    /// Expiry reported by the upstream, when it reports one.
    pub expires_at: Option<SystemTime>,
}

impl SessionGrant {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn expiring_at(mut self, expires_at: SystemTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Performs the network exchange of credentials for a token.
///
/// Implementations make a single attempt and report failures; an `Err`
/// means no token was obtained.
#[async_trait]
pub trait UpstreamAuthenticator: Send + Sync {
    async fn exchange_credentials(&self, credentials: &Credentials) -> Result<SessionGrant, Error>;
}

#[derive(Deserialize)]
struct SessionResponse {
    #[serde(default)]
    token: String,
}

/// Authenticates against `POST {api_base}/session`.
#[derive(Clone, Debug)]
pub struct SessionAuthenticator {
    http: Client,
    session_url: String,
}

impl SessionAuthenticator {
    pub const TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(api_base: &str) -> Result<Self, Error> {
        let http = Client::builder().timeout(Self::TIMEOUT).build()?;
        Ok(Self::with_client(http, api_base))
    }

    pub fn with_client(http: Client, api_base: &str) -> Self {
        Self {
            http,
            session_url: format!("{}/session", api_base.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl UpstreamAuthenticator for SessionAuthenticator {
    async fn exchange_credentials(&self, credentials: &Credentials) -> Result<SessionGrant, Error> {
        let resp = self
            .http
            .post(&self.session_url)
            .json(credentials)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "session exchange rejected");
            return Err(Error::Auth(format!(
                "session endpoint returned status {}",
                status.as_u16()
            )));
        }

        let session: SessionResponse = resp
            .json()
            .await
            .map_err(|e| Error::Auth(format!("malformed session response: {e}")))?;
        if session.token.is_empty() {
            return Err(Error::Auth("received empty token".into()));
        }
        info!(len = session.token.len(), "session token acquired");
        Ok(SessionGrant::new(session.token))
    }
}
