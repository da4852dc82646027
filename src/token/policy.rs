use std::time::{Duration, SystemTime};

use crate::errors::Error;

/// Rules governing proactive refresh behaviour.
#[derive(Clone, Debug)]
pub struct RefreshPolicy {
    /// Subtracted from the real expiry; a token inside this window is stale.
    pub safety_margin: Duration,
    /// Lifetime assumed when the upstream does not report an expiry.
    pub assumed_lifetime: Duration,
    /// Period of the background refresh loop.
    pub background_interval: Duration,
}

impl RefreshPolicy {
    pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_ASSUMED_LIFETIME: Duration = Duration::from_secs(23 * 60 * 60);
    pub const DEFAULT_BACKGROUND_INTERVAL: Duration = Duration::from_secs(60);

    pub fn new(
        safety_margin: Duration,
        assumed_lifetime: Duration,
        background_interval: Duration,
    ) -> Result<Self, Error> {
        if assumed_lifetime <= safety_margin {
            return Err(Error::Config(
                "Assumed token lifetime must exceed the safety margin".into(),
            ));
        }
        if background_interval.is_zero() {
            return Err(Error::Config(
                "Background refresh interval must be > 0".into(),
            ));
        }
        Ok(Self {
            safety_margin,
            assumed_lifetime,
            background_interval,
        })
    }

    /// Picks the expiry for a token issued at `issued_at`.
    ///
    /// An expiry reported by the upstream wins when it lies after the issue
    /// time; otherwise the assumed lifetime applies.
    pub fn expiry_for(&self, issued_at: SystemTime, reported: Option<SystemTime>) -> SystemTime {
        match reported {
            Some(expires_at) if expires_at > issued_at => expires_at,
            _ => issued_at + self.assumed_lifetime,
        }
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            safety_margin: Self::DEFAULT_SAFETY_MARGIN,
            assumed_lifetime: Self::DEFAULT_ASSUMED_LIFETIME,
            background_interval: Self::DEFAULT_BACKGROUND_INTERVAL,
        }
    }
}
