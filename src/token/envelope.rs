use std::fmt;
use std::time::{Duration, SystemTime};

use crate::errors::Error;

/// A session token plus the timestamps required for refresh decisions.
#[derive(Clone)]
pub struct TokenEnvelope {
    value: String,
    issued_at: SystemTime,
    expires_at: SystemTime,
}

impl TokenEnvelope {
    pub fn try_new(
        value: String,
        issued_at: SystemTime,
        expires_at: SystemTime,
    ) -> Result<Self, Error> {
        if value.is_empty() {
            return Err(Error::Auth("received empty token".into()));
        }
        if expires_at < issued_at {
            return Err(Error::Auth("token expires before it was issued".into()));
        }
        Ok(Self {
            value,
            issued_at,
            expires_at,
        })
    }

    /// Returns the raw token value suitable for Authorization headers.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> SystemTime {
        self.issued_at
    }

    pub fn expires_at(&self) -> SystemTime {
        self.expires_at
    }

    /// Time left before the upstream rejects the token, `None` once expired.
    pub fn remaining(&self, now: SystemTime) -> Option<Duration> {
        self.expires_at.duration_since(now).ok()
    }

    /// True while `now` is earlier than the expiry minus `safety_margin`.
    pub fn is_usable(&self, now: SystemTime, safety_margin: Duration) -> bool {
        match self.expires_at.checked_sub(safety_margin) {
            Some(cutoff) => now < cutoff,
            None => false,
        }
    }
}

impl fmt::Debug for TokenEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenEnvelope")
            .field("value", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
