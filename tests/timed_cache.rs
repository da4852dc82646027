use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use upstream_session_cache::TimedCache;

#[tokio::test(start_paused = true)]
async fn shared_across_tasks() {
    let cache = Arc::new(TimedCache::new(Duration::from_secs(30)));
    let writer = cache.clone();
    tokio::spawn(async move { writer.set(vec!["infra".to_string()]) })
        .await
        .unwrap();

    let reader = cache.clone();
    let seen = tokio::spawn(async move { reader.get() }).await.unwrap();
    assert_eq!(seen, Some(vec!["infra".to_string()]));

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(cache.get(), None);
}

#[tokio::test(start_paused = true)]
async fn one_cache_per_key() {
    let caches: HashMap<&str, TimedCache<u32>> = [
        ("projects", TimedCache::new(Duration::from_secs(10))),
        ("applications", TimedCache::new(Duration::from_secs(60))),
    ]
    .into_iter()
    .collect();

    caches["projects"].set(1);
    caches["applications"].set(2);

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(caches["projects"].get(), None);
    assert_eq!(caches["applications"].get(), Some(2));

    caches["applications"].invalidate();
    assert_eq!(caches["applications"].get(), None);
}

#[test]
fn disabled_cache_never_holds_values() {
    let cache = TimedCache::disabled();
    assert!(!cache.is_enabled());
    assert_eq!(cache.ttl(), Duration::ZERO);
    cache.set("value");
    assert_eq!(cache.get(), None);
}
