use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::RefreshPolicy;
use crate::tests::test_support::{RejectingAuthenticator, capture_logs, drain_logs, guard_with};

#[tokio::test(start_paused = true)]
async fn background_failures_are_logged_and_loop_continues() {
    let auth = Arc::new(RejectingAuthenticator::default());
    let guard = Arc::new(guard_with(auth.clone(), RefreshPolicy::default()));

    let (lines, log_guard) = capture_logs();
    let shutdown = CancellationToken::new();
    let refresher = guard.start_background_refresh(shutdown.clone());

    tokio::time::sleep(Duration::from_secs(121)).await;
    assert_eq!(auth.calls.load(Ordering::SeqCst), 2, "one attempt per tick");
    assert!(!refresher.is_finished(), "failures must not stop the loop");

    refresher.stop().await;
    drop(log_guard);

    let logs = drain_logs(lines);
    let warn_count = logs
        .iter()
        .filter(|line| line.contains("WARN") && line.contains("background token refresh failed"))
        .count();
    assert_eq!(warn_count, 2, "expected a warning per failed tick, got {:?}", logs);
    assert!(
        logs.iter().any(|line| line.contains("background token refresh stopped")),
        "expected stop log, got {:?}",
        logs
    );
    assert!(shutdown.is_cancelled());
}

#[tokio::test(flavor = "current_thread")]
async fn invalidation_is_logged() {
    let guard = guard_with(
        Arc::new(RejectingAuthenticator::default()),
        RefreshPolicy::default(),
    );
    let (lines, log_guard) = capture_logs();
    guard.invalidate_token();
    drop(log_guard);

    let logs = drain_logs(lines);
    assert!(
        logs.iter()
            .any(|line| line.contains("INFO") && line.contains("invalidating cached session token")),
        "got {:?}",
        logs
    );
}
