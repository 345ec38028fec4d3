//! In-memory memoization in front of the artifact store
//!
//! [`RenderCache`] is the entry point handlers call. A lookup goes through
//! three layers, cheapest first:
//!
//! 1. the memo: request -> artifact, valid for a fixed TTL from insertion;
//! 2. the artifact store's on-disk existence check;
//! 3. the renderer, run at most once per key at a time.
//!
//! Concurrent misses for the same key are collapsed: the first caller
//! resolves it and every other caller blocks until that result is published.

use crate::clock::{Clock, SystemClock};
use crate::{
    ArtifactRef, ArtifactStore, CacheKey, Error, KeyDeriver, RenderRequest, Renderer, Result,
};
use lru::LruCache;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Default lifetime of a memo entry
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Default number of requests kept in the memo
pub const DEFAULT_MEMO_CAPACITY: usize = 1024;

#[derive(Clone, Debug)]
struct MemoEntry {
    artifact: ArtifactRef,
    expires_at: Instant,
}

/// Counters describing how requests were served
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Requests answered from the memo
    pub memo_hits: u64,
    /// Requests that missed the memo (absent or expired)
    pub memo_misses: u64,
    /// Memo misses answered by an artifact already on disk
    pub disk_hits: u64,
    /// Renderer invocations that produced an artifact
    pub renders: u64,
    /// Requests that waited on another caller's in-flight resolution
    pub shared_waits: u64,
    /// Resolutions that ended in an error
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    memo_hits: AtomicU64,
    memo_misses: AtomicU64,
    disk_hits: AtomicU64,
    renders: AtomicU64,
    shared_waits: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            memo_hits: self.memo_hits.load(Ordering::Relaxed),
            memo_misses: self.memo_misses.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            renders: self.renders.load(Ordering::Relaxed),
            shared_waits: self.shared_waits.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// A resolution in progress that other callers can wait on
struct InFlight {
    result: Mutex<Option<Result<ArtifactRef>>>,
    cv: Condvar,
}

impl InFlight {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            cv: Condvar::new(),
        }
    }

    fn publish(&self, result: Result<ArtifactRef>) {
        let mut slot = self.result.lock();
        *slot = Some(result);
        self.cv.notify_all();
    }

    fn wait(&self) -> Result<ArtifactRef> {
        let mut slot = self.result.lock();
        loop {
            if let Some(result) = slot.as_ref() {
                return result.clone();
            }
            self.cv.wait(&mut slot);
        }
    }
}

/// Held by the caller resolving a key; unregisters the in-flight slot when
/// dropped and releases waiters with an error if no result was published
struct LeaderGuard<'a> {
    table: &'a Mutex<HashMap<CacheKey, Arc<InFlight>>>,
    key: &'a CacheKey,
    slot: Arc<InFlight>,
    result: Option<Result<ArtifactRef>>,
}

impl LeaderGuard<'_> {
    fn complete(mut self, result: Result<ArtifactRef>) {
        self.result = Some(result);
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        self.table.lock().remove(self.key);
        let result = self.result.take().unwrap_or_else(|| {
            Err(Error::render(
                self.key.as_str(),
                "renderer panicked while producing the artifact".into(),
            ))
        });
        self.slot.publish(result);
    }
}

/// Memoized, single-flight front for an [`ArtifactStore`]
///
/// Construct one at startup and share it (e.g. behind an `Arc`) between
/// request handlers.
pub struct RenderCache<R, C = SystemClock> {
    deriver: KeyDeriver,
    store: ArtifactStore,
    renderer: R,
    memo: Mutex<LruCache<RenderRequest, MemoEntry>>,
    ttl: Duration,
    in_flight: Mutex<HashMap<CacheKey, Arc<InFlight>>>,
    clock: C,
    counters: Counters,
}

impl<R: Renderer> RenderCache<R> {
    /// Creates a cache using the system clock
    ///
    /// Keys are salted with the renderer's fingerprint; use
    /// [`with_salt`](Self::with_salt) to override it.
    ///
    /// # Errors
    ///
    /// Returns an error if `capacity` is 0
    pub fn new(store: ArtifactStore, renderer: R, ttl: Duration, capacity: usize) -> Result<Self> {
        Self::with_clock(store, renderer, ttl, capacity, SystemClock)
    }
}

impl<R: Renderer, C: Clock> RenderCache<R, C> {
    /// Creates a cache reading time from `clock`
    ///
    /// # Errors
    ///
    /// Returns an error if `capacity` is 0 or `ttl` is too large to add to
    /// the clock's current time
    pub fn with_clock(
        store: ArtifactStore,
        renderer: R,
        ttl: Duration,
        capacity: usize,
        clock: C,
    ) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| Error::configuration("Memo capacity must be non-zero"))?;
        if clock.now().checked_add(ttl).is_none() {
            return Err(Error::configuration(format!(
                "Memo TTL of {}s is out of range",
                ttl.as_secs()
            )));
        }

        Ok(Self {
            deriver: KeyDeriver::new(renderer.fingerprint()),
            store,
            renderer,
            memo: Mutex::new(LruCache::new(capacity)),
            ttl,
            in_flight: Mutex::new(HashMap::new()),
            clock,
            counters: Counters::default(),
        })
    }

    /// Replace the key salt
    ///
    /// Memo entries derived under the previous salt are dropped.
    #[must_use]
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.deriver = KeyDeriver::new(salt);
        self.memo.get_mut().clear();
        self
    }

    /// Return the artifact for `request`, rendering it if no valid one exists
    pub fn get(&self, request: &RenderRequest) -> Result<ArtifactRef> {
        if let Some(artifact) = self.memo_get(request) {
            Counters::bump(&self.counters.memo_hits);
            tracing::debug!(request = %request, key = %artifact.key, "memo hit");
            return Ok(artifact);
        }
        Counters::bump(&self.counters.memo_misses);

        let key = self.deriver.derive(request);
        tracing::debug!(request = %request, key = %key, "memo miss");
        self.resolve_shared(request, &key)
    }

    /// The key `request` is stored under
    #[must_use]
    pub fn key_for(&self, request: &RenderRequest) -> CacheKey {
        self.deriver.derive(request)
    }

    /// The key deriver in use
    #[must_use]
    pub const fn deriver(&self) -> &KeyDeriver {
        &self.deriver
    }

    /// The backing artifact store
    #[must_use]
    pub const fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Lifetime of memo entries
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Forget the memo entry for `request`; the artifact stays on disk
    pub fn invalidate(&self, request: &RenderRequest) {
        self.memo.lock().pop(request);
    }

    /// Forget every memo entry
    pub fn clear_memo(&self) {
        self.memo.lock().clear();
    }

    /// Number of memo entries, including expired ones not yet evicted
    #[must_use]
    pub fn memo_len(&self) -> usize {
        self.memo.lock().len()
    }

    /// Snapshot of the serving counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    fn memo_get(&self, request: &RenderRequest) -> Option<ArtifactRef> {
        let now = self.clock.now();
        let mut memo = self.memo.lock();

        if let Some(entry) = memo.get(request) {
            if now < entry.expires_at {
                return Some(entry.artifact.clone());
            }
            // Evict lazily on access
            memo.pop(request);
        }

        None
    }

    fn memo_insert(&self, request: &RenderRequest, artifact: ArtifactRef) {
        let Some(expires_at) = self.clock.now().checked_add(self.ttl) else {
            tracing::debug!(request = %request, "memo expiry out of range, not memoizing");
            return;
        };
        let entry = MemoEntry {
            artifact,
            expires_at,
        };
        self.memo.lock().put(request.clone(), entry);
    }

    fn resolve_shared(&self, request: &RenderRequest, key: &CacheKey) -> Result<ArtifactRef> {
        let (slot, leader) = {
            let mut table = self.in_flight.lock();
            match table.get(key) {
                Some(slot) => (Arc::clone(slot), false),
                None => {
                    let slot = Arc::new(InFlight::new());
                    table.insert(key.clone(), Arc::clone(&slot));
                    (slot, true)
                }
            }
        };

        if !leader {
            Counters::bump(&self.counters.shared_waits);
            tracing::debug!(key = %key, "waiting on in-flight render");
            return slot.wait();
        }

        let guard = LeaderGuard {
            table: &self.in_flight,
            key,
            slot,
            result: None,
        };

        let result = self
            .store
            .resolve(key, || {
                tracing::info!(request = %request, key = %key, "rendering chart");
                self.renderer.render(request)
            })
            .map(|resolved| {
                if resolved.rendered {
                    Counters::bump(&self.counters.renders);
                } else {
                    Counters::bump(&self.counters.disk_hits);
                }
                self.memo_insert(request, resolved.artifact.clone());
                resolved.artifact
            });

        if let Err(e) = &result {
            Counters::bump(&self.counters.failures);
            tracing::warn!(
                request = %request,
                key = %key,
                error = %e,
                "artifact resolution failed"
            );
        }

        guard.complete(result.clone());
        result
    }
}

impl<R, C> std::fmt::Debug for RenderCache<R, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCache")
            .field("salt", &self.deriver.salt())
            .field("root", &self.store.root())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
