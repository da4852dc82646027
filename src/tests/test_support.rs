use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::subscriber::{DefaultGuard, set_default};
use tracing_subscriber::{Registry, fmt, layer::SubscriberExt};

use crate::{
    Credentials, Error, RefreshPolicy, SessionGrant, TokenGuard, TokenGuardConfig,
    UpstreamAuthenticator,
};

/// Authenticator that fails every exchange and counts attempts.
#[derive(Default)]
pub struct RejectingAuthenticator {
    pub calls: AtomicUsize,
}

#[async_trait]
impl UpstreamAuthenticator for RejectingAuthenticator {
    async fn exchange_credentials(&self, _credentials: &Credentials) -> Result<SessionGrant, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::Auth("session endpoint returned status 401".into()))
    }
}

pub fn guard_with(authenticator: Arc<dyn UpstreamAuthenticator>, policy: RefreshPolicy) -> TokenGuard {
    TokenGuard::new(
        authenticator,
        TokenGuardConfig {
            credentials: Credentials::new("admin", "secret"),
            policy,
        },
    )
}

struct VecWriter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl std::io::Write for VecWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.lines.lock().unwrap();
        guard.push(String::from_utf8_lossy(buf).into_owned());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn make_subscriber(lines: Arc<Mutex<Vec<String>>>) -> impl tracing::Subscriber + Send + Sync {
    let writer_lines = lines.clone();
    Registry::default().with(
        fmt::Layer::default()
            .with_writer(move || VecWriter {
                lines: writer_lines.clone(),
            })
            .with_target(false)
            .with_level(true)
            .with_ansi(false),
    )
}

pub fn capture_logs() -> (Arc<Mutex<Vec<String>>>, DefaultGuard) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let guard = set_default(make_subscriber(lines.clone()));
    (lines, guard)
}

pub fn drain_logs(lines: Arc<Mutex<Vec<String>>>) -> Vec<String> {
    std::mem::take(&mut *lines.lock().unwrap())
}
