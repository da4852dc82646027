use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime};

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Request};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::Error;
use crate::session::{Credentials, UpstreamAuthenticator};
use crate::telemetry::refresh::RefreshTelemetry;

use super::store::{self, CredentialStore, RefreshInFlight};
use super::{BackgroundRefresher, RefreshPolicy, TokenEnvelope, TokenStatus};

/// Convenience result alias for guard operations.
pub type TokenGuardResult<T> = Result<T, Error>;

/// Configuration inputs required to build a TokenGuard.
#[derive(Clone, Debug)]
pub struct TokenGuardConfig {
    pub credentials: Credentials,
    pub policy: RefreshPolicy,
}

/// Owns the process's session token and coordinates its refreshes.
///
/// Concurrent callers that find the token stale queue behind a single
/// refresh instead of each hitting the upstream.
pub struct TokenGuard {
    authenticator: Arc<dyn UpstreamAuthenticator>,
    credentials: Credentials,
    policy: RefreshPolicy,
    http: Client,
    store: Mutex<CredentialStore>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl TokenGuard {
    pub fn new(authenticator: Arc<dyn UpstreamAuthenticator>, config: TokenGuardConfig) -> Self {
        Self {
            authenticator,
            credentials: config.credentials,
            policy: config.policy,
            http: Client::new(),
            store: Mutex::new(CredentialStore::new()),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Seeds the store, e.g. with a token carried over from a previous client.
    pub fn with_envelope(self, envelope: TokenEnvelope) -> Self {
        store::lock(&self.store).replace(envelope);
        self
    }

    /// Client used to build requests in `create_authenticated_request`.
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    /// Returns a token outside the safety margin, refreshing when needed.
    ///
    /// `cancel` aborts both the wait behind another caller's refresh and the
    /// network exchange; either way the result is `Error::Cancelled`.
    pub async fn get_valid_token(&self, cancel: &CancellationToken) -> TokenGuardResult<String> {
        if let Some(token) = self.usable_token() {
            return Ok(token);
        }

        let telemetry = RefreshTelemetry::new("token.get_valid");
        // Only one refresh attempt should run at a time.
        let _serial = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            permit = self.refresh_lock.lock() => permit,
        };

        if let Some(token) = self.usable_token() {
            telemetry.emit_coalesced();
            return Ok(token);
        }

        self.refresh(cancel, &telemetry).await
    }

    async fn refresh(
        &self,
        cancel: &CancellationToken,
        telemetry: &RefreshTelemetry,
    ) -> TokenGuardResult<String> {
        let _in_flight = RefreshInFlight::raise(&self.store);
        let started = Instant::now();
        telemetry.emit_start(SystemTime::now());

        let exchange = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            grant = self.authenticator.exchange_credentials(&self.credentials) => grant,
        };
        let envelope = exchange.and_then(|grant| {
            let issued_at = SystemTime::now();
            let expires_at = self.policy.expiry_for(issued_at, grant.expires_at);
            TokenEnvelope::try_new(grant.token, issued_at, expires_at)
        });

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match envelope {
            Ok(envelope) => {
                let token = envelope.value().to_owned();
                let expires_at = envelope.expires_at();
                store::lock(&self.store).replace(envelope);
                telemetry.emit_success(expires_at, elapsed_ms);
                Ok(token)
            }
            Err(err) => {
                telemetry.emit_failure(&err, elapsed_ms);
                Err(err)
            }
        }
    }

    /// Drops the cached token so the next caller re-authenticates.
    pub fn invalidate_token(&self) {
        info!("invalidating cached session token");
        store::lock(&self.store).clear();
    }

    /// Drops `token` if it is still the cached one.
    ///
    /// A token rejected by the upstream may already have been replaced by a
    /// concurrent refresh; the replacement is kept.
    pub fn invalidate_if_current(&self, token: &str) -> bool {
        let cleared = store::lock(&self.store).clear_if_current(token);
        if cleared {
            info!("invalidating rejected session token");
        } else {
            debug!("rejected session token was already replaced");
        }
        cleared
    }

    pub fn token_status(&self) -> TokenStatus {
        store::lock(&self.store).status(SystemTime::now(), self.policy.safety_margin)
    }

    pub fn refresh_in_progress(&self) -> bool {
        store::lock(&self.store).refreshing()
    }

    /// Builds an outbound request carrying the bearer token and a JSON
    /// content type.
    pub async fn create_authenticated_request(
        &self,
        cancel: &CancellationToken,
        method: Method,
        target: &str,
        body: Option<Vec<u8>>,
    ) -> TokenGuardResult<Request> {
        let token = self.get_valid_token(cancel).await?;
        self.authorize(&token, method, target, body)
    }

    /// Builds a request carrying `token`, which the caller obtained from
    /// `get_valid_token`.
    pub(crate) fn authorize(
        &self,
        token: &str,
        method: Method,
        target: &str,
        body: Option<Vec<u8>>,
    ) -> TokenGuardResult<Request> {
        let mut builder = self
            .http
            .request(method, target)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            builder = builder.body(body);
        }
        Ok(builder.build()?)
    }

    /// Spawns the periodic refresh loop; it runs until `shutdown` is cancelled.
    pub fn start_background_refresh(self: &Arc<Self>, shutdown: CancellationToken) -> BackgroundRefresher {
        BackgroundRefresher::spawn(Arc::clone(self), self.policy.background_interval, shutdown)
    }

    fn usable_token(&self) -> Option<String> {
        store::lock(&self.store)
            .usable_token(SystemTime::now(), self.policy.safety_margin)
            .map(str::to_owned)
    }
}
