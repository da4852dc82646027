#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use upstream_session_cache::{
    Credentials, Error, RefreshPolicy, SessionGrant, TokenEnvelope, TokenGuard, TokenGuardConfig,
    UpstreamAuthenticator,
};

/// Test authenticator issuing `T1`, `T2`, ... after an optional delay.
#[derive(Default)]
pub struct ScriptedAuthenticator {
    calls: AtomicUsize,
    failing: AtomicBool,
    delay: Duration,
    reported_lifetime: Option<Duration>,
}

impl ScriptedAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn reporting_lifetime(lifetime: Duration) -> Self {
        Self {
            reported_lifetime: Some(lifetime),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamAuthenticator for ScriptedAuthenticator {
    async fn exchange_credentials(&self, credentials: &Credentials) -> Result<SessionGrant, Error> {
        assert_eq!(credentials.username, "admin");
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Auth("session endpoint returned status 401".into()));
        }
        let grant = SessionGrant::new(format!("T{n}"));
        Ok(match self.reported_lifetime {
            Some(lifetime) => grant.expiring_at(SystemTime::now() + lifetime),
            None => grant,
        })
    }
}

pub fn guard(authenticator: Arc<ScriptedAuthenticator>) -> TokenGuard {
    TokenGuard::new(
        authenticator,
        TokenGuardConfig {
            credentials: Credentials::new("admin", "secret"),
            policy: RefreshPolicy::default(),
        },
    )
}

/// An envelope issued an hour ago that expires `expires_in` from now.
pub fn envelope_expiring_in(value: &str, expires_in: Duration) -> TokenEnvelope {
    let now = SystemTime::now();
    TokenEnvelope::try_new(
        value.to_string(),
        now - Duration::from_secs(3600),
        now + expires_in,
    )
    .expect("valid envelope")
}
