//! Read-through cache for mailing listings

use crate::policy::ListScope;
use mailcast_common::Result;
use mailcast_storage::models::Mailing;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Mailing listings keyed by query shape
///
/// Entries are never shared between scopes, and any mailing write drops all of
/// them. Concurrent fills of the same scope are last-write-wins. A fill that
/// started before an invalidation is returned to its caller but not stored.
pub struct MailingListCache {
    enabled: bool,
    entries: Arc<RwLock<HashMap<ListScope, Arc<Vec<Mailing>>>>>,
    /// Bumped by every invalidation
    generation: AtomicU64,
}

impl MailingListCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: Arc::new(RwLock::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return the cached listing for `scope`, or run `load` and remember it
    pub async fn get_or_load<F, Fut>(&self, scope: ListScope, load: F) -> Result<Arc<Vec<Mailing>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Mailing>>>,
    {
        if !self.enabled {
            return Ok(Arc::new(load().await?));
        }

        if let Some(hit) = self.entries.read().await.get(&scope) {
            debug!(?scope, "Mailing list cache hit");
            return Ok(Arc::clone(hit));
        }

        debug!(?scope, "Mailing list cache miss");
        let generation = self.generation.load(Ordering::Acquire);
        let rows = Arc::new(load().await?);

        let mut entries = self.entries.write().await;
        if self.generation.load(Ordering::Acquire) == generation {
            entries.insert(scope, Arc::clone(&rows));
        } else {
            debug!(?scope, "Mailing list changed during fill, not caching");
        }
        Ok(rows)
    }

    /// Drop every cached listing
    pub async fn invalidate(&self) {
        if !self.enabled {
            return;
        }
        let mut entries = self.entries.write().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        if !entries.is_empty() {
            debug!(entries = entries.len(), "Invalidating mailing list cache");
            entries.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    async fn load_counting(calls: &AtomicUsize) -> Result<Vec<Mailing>> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    #[tokio::test]
    async fn test_enabled_cache_serves_hits_until_invalidated() {
        let cache = MailingListCache::new(true);
        let calls = AtomicUsize::new(0);

        cache.get_or_load(ListScope::All, || load_counting(&calls)).await.unwrap();
        cache.get_or_load(ListScope::All, || load_counting(&calls)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate().await;
        cache.get_or_load(ListScope::All, || load_counting(&calls)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidation_during_fill_is_not_lost() {
        let cache = MailingListCache::new(true);
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let (started, load_started) = tokio::sync::oneshot::channel::<()>();
        let (release, released) = tokio::sync::oneshot::channel::<()>();

        let fill = cache.get_or_load(ListScope::All, move || async move {
            let _ = started.send(());
            let _ = released.await;
            load_counting(counter).await
        });
        let write = async {
            let _ = load_started.await;
            cache.invalidate().await;
            let _ = release.send(());
        };
        let (filled, ()) = tokio::join!(fill, write);
        filled.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The stale fill was not stored, so the next listing loads again
        cache.get_or_load(ListScope::All, || load_counting(&calls)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_scopes_are_not_shared() {
        let cache = MailingListCache::new(true);
        let calls = AtomicUsize::new(0);
        let alice = ListScope::Owner(Uuid::now_v7());
        let bob = ListScope::Owner(Uuid::now_v7());

        cache.get_or_load(alice, || load_counting(&calls)).await.unwrap();
        cache.get_or_load(bob, || load_counting(&calls)).await.unwrap();
        cache.get_or_load(alice, || load_counting(&calls)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_loads() {
        let cache = MailingListCache::new(false);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            cache.get_or_load(ListScope::All, || load_counting(&calls)).await.unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
