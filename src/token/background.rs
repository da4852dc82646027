use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::Error;

use super::TokenGuard;

/// Handle to the periodic refresh task.
///
/// Dropping the handle detaches the task; it keeps running until its
/// shutdown token is cancelled.
#[derive(Debug)]
pub struct BackgroundRefresher {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl BackgroundRefresher {
    pub(crate) fn spawn(guard: Arc<TokenGuard>, period: Duration, shutdown: CancellationToken) -> Self {
        let handle = tokio::spawn(refresh_loop(guard, period, shutdown.clone()));
        Self { shutdown, handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancels the loop and waits for it to exit.
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(err) = self.handle.await
            && err.is_panic()
        {
            error!("background token refresh panicked");
        }
    }
}

async fn refresh_loop(guard: Arc<TokenGuard>, period: Duration, shutdown: CancellationToken) {
    info!(interval_secs = period.as_secs(), "background token refresh started");
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                match guard.get_valid_token(&shutdown).await {
                    Ok(_) => debug!("background token check ok"),
                    Err(Error::Cancelled) => break,
                    Err(err) => warn!(error = %err, "background token refresh failed"),
                }
            }
        }
    }
    info!("background token refresh stopped");
}
