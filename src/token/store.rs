use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use super::{TokenEnvelope, TokenStatus};

/// The single in-memory credential slot plus its refresh bookkeeping.
#[derive(Debug, Default)]
pub struct CredentialStore {
    envelope: Option<TokenEnvelope>,
    refreshing: bool,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_envelope(envelope: TokenEnvelope) -> Self {
        Self {
            envelope: Some(envelope),
            refreshing: false,
        }
    }

    pub fn envelope(&self) -> Option<&TokenEnvelope> {
        self.envelope.as_ref()
    }

    /// The current token if it is outside the safety margin.
    pub fn usable_token(&self, now: SystemTime, safety_margin: Duration) -> Option<&str> {
        self.envelope
            .as_ref()
            .filter(|env| env.is_usable(now, safety_margin))
            .map(TokenEnvelope::value)
    }

    pub fn replace(&mut self, envelope: TokenEnvelope) {
        self.envelope = Some(envelope);
    }

    pub fn clear(&mut self) {
        self.envelope = None;
    }

    /// Clears the store only while it still holds `value`.
    pub fn clear_if_current(&mut self, value: &str) -> bool {
        let current = self.envelope.as_ref().is_some_and(|env| env.value() == value);
        if current {
            self.envelope = None;
        }
        current
    }

    pub fn refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn status(&self, now: SystemTime, safety_margin: Duration) -> TokenStatus {
        match self.envelope.as_ref() {
            Some(envelope) => TokenStatus::observe(envelope, now, safety_margin),
            None => TokenStatus::empty(),
        }
    }
}

pub(crate) fn lock(store: &Mutex<CredentialStore>) -> MutexGuard<'_, CredentialStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a refresh as in flight for as long as it is alive.
///
/// Dropping it clears the flag, so success, failure, cancellation and a
/// dropped caller future all leave the store consistent.
pub(crate) struct RefreshInFlight<'a> {
    store: &'a Mutex<CredentialStore>,
}

impl<'a> RefreshInFlight<'a> {
    pub(crate) fn raise(store: &'a Mutex<CredentialStore>) -> Self {
        lock(store).refreshing = true;
        Self { store }
    }
}

impl Drop for RefreshInFlight<'_> {
    fn drop(&mut self) {
        lock(self.store).refreshing = false;
    }
}
