//! Single-slot response cache with a fixed time-to-live.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use tokio::time::Instant;

/// Holds one value of `T` for at most `ttl`.
///
/// A zero `ttl` disables the cache: every `get` misses and every `set` is
/// dropped. Callers that need several keys create one cache per key.
#[derive(Debug)]
pub struct TimedCache<T> {
    ttl: Duration,
    slot: RwLock<Option<(T, Instant)>>,
}

impl<T: Clone> TimedCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Returns the cached value if one was set no more than `ttl` ago.
    pub fn get(&self) -> Option<T> {
        if !self.is_enabled() {
            return None;
        }
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some((value, cached_at)) if cached_at.elapsed() <= self.ttl => Some(value.clone()),
            _ => None,
        }
    }

    pub fn set(&self, value: T) {
        if !self.is_enabled() {
            return;
        }
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some((value, Instant::now()));
    }

    pub fn invalidate(&self) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn hit_until_ttl_then_miss() {
        let cache = TimedCache::new(Duration::from_secs(30));
        cache.set(7u32);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.get(), Some(7));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get(), None);
    }

    #[test]
    fn zero_ttl_never_caches() {
        let cache = TimedCache::disabled();
        cache.set("listing".to_string());
        assert_eq!(cache.get(), None);
        assert!(!cache.is_enabled());
    }

    #[test]
    fn last_set_wins() {
        let cache = TimedCache::new(Duration::from_secs(60));
        cache.set("a");
        cache.set("b");
        assert_eq!(cache.get(), Some("b"));
    }

    #[test]
    fn invalidate_is_idempotent() {
        let cache = TimedCache::new(Duration::from_secs(60));
        cache.set(1u8);
        cache.invalidate();
        cache.invalidate();
        assert_eq!(cache.get(), None);

        let disabled = TimedCache::<u8>::disabled();
        disabled.invalidate();
        assert_eq!(disabled.get(), None);
    }

    #[test]
    fn empty_cache_misses() {
        let cache = TimedCache::<Vec<String>>::new(Duration::from_secs(60));
        assert!(cache.get().is_none());
    }
}
