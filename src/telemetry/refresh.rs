use std::time::SystemTime;

use tracing::{Level, event};
use uuid::Uuid;

use crate::errors::Error;

#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    attempt_id: Uuid,
    context: String,
}

impl RefreshTelemetry {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            context: context.into(),
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn emit_start(&self, at: SystemTime) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            context = %self.context,
            timestamp = ?at,
            "refresh.start"
        );
    }

    pub fn emit_success(&self, expires_at: SystemTime, elapsed_ms: u64) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            context = %self.context,
            expires_at = %display_time(expires_at),
            elapsed_ms,
            "refresh.success"
        );
    }

    /// A waiter found the token renewed by a concurrent refresh.
    pub fn emit_coalesced(&self) {
        event!(
            Level::DEBUG,
            attempt_id = %self.attempt_id,
            context = %self.context,
            "refresh.coalesced"
        );
    }

    pub fn emit_failure(&self, error: &Error, elapsed_ms: u64) {
        event!(
            Level::ERROR,
            attempt_id = %self.attempt_id,
            context = %self.context,
            elapsed_ms,
            error = %error,
            "refresh.failure"
        );
    }
}

fn display_time(at: SystemTime) -> String {
    jiff::Timestamp::try_from(at)
        .map(|ts| ts.to_string())
        .unwrap_or_else(|_| format!("{at:?}"))
}
