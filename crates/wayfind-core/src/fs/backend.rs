//! Per-operation result storage.
//!
//! With a zero duration only in-flight requests are shared. Otherwise
//! results are kept in a ring of time buckets: each tick the pointer
//! advances and whatever sits in the bucket it lands on is dropped, so an
//! entry lives longer than the configured duration and at most one tick
//! beyond it.
//!
//! Decay runs from a tokio timer while asynchronous reads keep arriving
//! (`Async`), opportunistically on each synchronous read (`Sync`), and not
//! at all once the cache is empty (`Idle`).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures::future::{self, BoxFuture, Shared};
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::FsResult;

type SharedOp<T> = Shared<BoxFuture<'static, FsResult<T>>>;

/// Longest time a result may be kept. Longer durations are clamped.
pub const MAX_CACHE_DURATION: Duration = Duration::from_secs(60 * 60);

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How the cache currently drives its decay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Idle,
    Sync,
    Async,
}

/// Coalesces or caches one kind of filesystem operation.
pub(crate) enum Backend<T> {
    Merge(OperationMerger<T>),
    Cache(CacheBackend<T>),
}

impl<T> Clone for Backend<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Merge(m) => Self::Merge(OperationMerger {
                active: Arc::clone(&m.active),
            }),
            Self::Cache(c) => Self::Cache(CacheBackend {
                state: Arc::clone(&c.state),
                tick: c.tick,
            }),
        }
    }
}

impl<T> Backend<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(name: &'static str, duration: Duration) -> Self {
        if duration.is_zero() {
            Self::Merge(OperationMerger::new())
        } else {
            Self::Cache(CacheBackend::new(name, duration))
        }
    }

    /// Answer `path` from storage, or run `provider` once for all callers.
    pub(crate) fn provide<P>(&self, path: &str, provider: P) -> BoxFuture<'static, FsResult<T>>
    where
        P: FnOnce() -> BoxFuture<'static, FsResult<T>>,
    {
        match self {
            Self::Merge(m) => m.provide(path, provider),
            Self::Cache(c) => c.provide(path, provider),
        }
    }

    pub(crate) fn provide_sync<P>(&self, path: &str, provider: P) -> FsResult<T>
    where
        P: FnOnce() -> FsResult<T>,
    {
        match self {
            Self::Merge(_) => provider(),
            Self::Cache(c) => c.provide_sync(path, provider),
        }
    }

    pub(crate) fn purge_all(&self) {
        if let Self::Cache(c) = self {
            c.purge(|_| true);
        }
    }

    /// Drop every cached key starting with one of `prefixes`.
    pub(crate) fn purge(&self, prefixes: &[&str]) {
        if let Self::Cache(c) = self {
            c.purge(|key| prefixes.iter().any(|p| key.starts_with(p)));
        }
    }

    /// Like [`Backend::purge`], but for the parent directory of each path.
    pub(crate) fn purge_parents(&self, paths: &[&str]) {
        let parents: Vec<&str> = paths.iter().map(|p| wayfind_util::dirname(p)).collect();
        self.purge(&parents);
    }

    pub(crate) fn mode(&self) -> Option<StorageMode> {
        match self {
            Self::Merge(_) => None,
            Self::Cache(c) => Some(lock(&c.state).mode),
        }
    }

    pub(crate) fn cached_len(&self) -> usize {
        match self {
            Self::Merge(_) => 0,
            Self::Cache(c) => lock(&c.state).data.len(),
        }
    }
}

/// Shares one in-flight operation per key. Results are not retained.
pub(crate) struct OperationMerger<T> {
    active: Arc<Mutex<HashMap<String, SharedOp<T>>>>,
}

impl<T> OperationMerger<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new() -> Self {
        Self {
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn provide<P>(&self, path: &str, provider: P) -> BoxFuture<'static, FsResult<T>>
    where
        P: FnOnce() -> BoxFuture<'static, FsResult<T>>,
    {
        let mut active = lock(&self.active);
        if let Some(op) = active.get(path) {
            return op.clone().boxed();
        }

        let pending = provider();
        let registry = Arc::downgrade(&self.active);
        let key = path.to_string();
        let op = async move {
            let result = pending.await;
            if let Some(registry) = registry.upgrade() {
                lock(&registry).remove(&key);
            }
            result
        }
        .boxed()
        .shared();
        active.insert(path.to_string(), op.clone());
        op.boxed()
    }
}

struct CacheState<T> {
    name: &'static str,
    mode: StorageMode,
    data: HashMap<String, FsResult<T>>,
    levels: Vec<HashSet<String>>,
    current_level: usize,
    next_decay: Option<Instant>,
    timer: Option<JoinHandle<()>>,
    active: HashMap<String, SharedOp<T>>,
}

impl<T> CacheState<T> {
    fn store(&mut self, path: String, result: FsResult<T>) {
        if self.data.contains_key(&path) {
            return;
        }
        self.levels[self.current_level].insert(path.clone());
        self.data.insert(path, result);
    }

    fn decay_level(&mut self, tick: Duration) {
        let next = (self.current_level + 1) % self.levels.len();
        self.current_level = next;
        let expired = std::mem::take(&mut self.levels[next]);
        for key in &expired {
            self.data.remove(key);
        }
        trace!(cache = self.name, level = next, evicted = expired.len(), "decayed level");

        if self.data.is_empty() {
            self.enter_idle();
        } else if let Some(at) = self.next_decay.as_mut() {
            *at += tick;
        }
    }

    fn run_decays(&mut self, tick: Duration) {
        let now = Instant::now();
        while let Some(at) = self.next_decay {
            if at > now || self.mode == StorageMode::Idle {
                break;
            }
            self.decay_level(tick);
        }
    }

    fn enter_idle(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.mode = StorageMode::Idle;
        self.next_decay = None;
        debug!(cache = self.name, "cache idle");
    }

    fn enter_sync_when_idle(&mut self, tick: Duration) {
        if self.mode == StorageMode::Idle {
            self.mode = StorageMode::Sync;
            self.next_decay = Some(Instant::now() + tick);
        }
    }

    fn purge(&mut self, matches: impl Fn(&str) -> bool) {
        let before = self.data.len();
        self.data.retain(|key, _| !matches(key));
        for level in &mut self.levels {
            level.retain(|key| !matches(key));
        }
        debug!(cache = self.name, removed = before - self.data.len(), "purged");
        if self.data.is_empty() && self.mode != StorageMode::Idle {
            self.enter_idle();
        }
    }
}

/// Moves the cache into timer-driven decay.
fn enter_async<T>(shared: &Arc<Mutex<CacheState<T>>>, state: &mut CacheState<T>, tick: Duration)
where
    T: Send + Sync + 'static,
{
    let now = Instant::now();
    let timeout = match state.mode {
        StorageMode::Async => return,
        StorageMode::Idle => {
            state.next_decay = Some(now + tick);
            tick
        }
        StorageMode::Sync => {
            state.run_decays(tick);
            if state.mode == StorageMode::Idle {
                return;
            }
            state
                .next_decay
                .map_or(Duration::ZERO, |at| at.saturating_duration_since(now))
        }
    };

    let Ok(handle) = Handle::try_current() else {
        // Without a runtime there is no timer; decay on later calls instead.
        state.mode = StorageMode::Sync;
        return;
    };

    state.mode = StorageMode::Async;
    let weak: Weak<Mutex<CacheState<T>>> = Arc::downgrade(shared);
    state.timer = Some(handle.spawn(async move {
        tokio::time::sleep(timeout).await;
        if let Some(shared) = weak.upgrade() {
            let mut state = lock(&shared);
            state.timer = None;
            state.mode = StorageMode::Sync;
            state.run_decays(tick);
        }
    }));
    debug!(cache = state.name, ?timeout, "cache async");
}

/// Caches results for a bounded time and coalesces concurrent misses.
pub(crate) struct CacheBackend<T> {
    state: Arc<Mutex<CacheState<T>>>,
    tick: Duration,
}

impl<T> CacheBackend<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(name: &'static str, duration: Duration) -> Self {
        let duration = duration.min(MAX_CACHE_DURATION);
        let count = level_count(duration);
        let tick = tick_interval(duration, count);
        let state = CacheState {
            name,
            mode: StorageMode::Idle,
            data: HashMap::new(),
            // One spare bucket keeps entries alive past the full duration.
            levels: vec![HashSet::new(); count.saturating_add(1)],
            current_level: 0,
            next_decay: None,
            timer: None,
            active: HashMap::new(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            tick,
        }
    }

    fn provide<P>(&self, path: &str, provider: P) -> BoxFuture<'static, FsResult<T>>
    where
        P: FnOnce() -> BoxFuture<'static, FsResult<T>>,
    {
        let tick = self.tick;
        let mut state = lock(&self.state);
        if state.mode == StorageMode::Sync {
            enter_async(&self.state, &mut state, tick);
        }

        if let Some(result) = state.data.get(path) {
            return future::ready(result.clone()).boxed();
        }
        if let Some(op) = state.active.get(path) {
            return op.clone().boxed();
        }

        let pending = provider();
        let weak = Arc::downgrade(&self.state);
        let key = path.to_string();
        let op = async move {
            let result = pending.await;
            if let Some(shared) = weak.upgrade() {
                let mut state = lock(&shared);
                state.active.remove(&key);
                state.store(key, result.clone());
                enter_async(&shared, &mut state, tick);
            }
            result
        }
        .boxed()
        .shared();
        state.active.insert(path.to_string(), op.clone());
        op.boxed()
    }

    fn provide_sync<P>(&self, path: &str, provider: P) -> FsResult<T>
    where
        P: FnOnce() -> FsResult<T>,
    {
        {
            let mut state = lock(&self.state);
            if state.mode == StorageMode::Sync {
                state.run_decays(self.tick);
            }
            if let Some(result) = state.data.get(path) {
                return result.clone();
            }
        }

        let result = provider();

        let mut state = lock(&self.state);
        state.store(path.to_string(), result.clone());
        state.enter_sync_when_idle(self.tick);
        result
    }

    fn purge(&self, matches: impl Fn(&str) -> bool) {
        lock(&self.state).purge(matches);
    }
}

/// Ten buckets, plus one for every 500ms of duration beyond five seconds.
pub(crate) fn level_count(duration: Duration) -> usize {
    let ms = duration.as_millis();
    let extra = if ms > 5000 { (ms - 5000).div_ceil(500) } else { 0 };
    10 + usize::try_from(extra).unwrap_or(usize::MAX - 10)
}

pub(crate) fn tick_interval(duration: Duration, count: usize) -> Duration {
    let count = u32::try_from(count).unwrap_or(u32::MAX);
    let tick = duration / count;
    if tick * count < duration {
        tick + Duration::from_nanos(1)
    } else {
        tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::FsError;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counted(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl FnOnce() -> BoxFuture<'static, FsResult<u32>> {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::task::yield_now().await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[test]
    fn test_level_count() {
        assert_eq!(level_count(Duration::from_millis(1000)), 10);
        assert_eq!(level_count(Duration::from_millis(5000)), 10);
        assert_eq!(level_count(Duration::from_millis(5001)), 11);
        assert_eq!(level_count(Duration::from_millis(6000)), 12);
        assert_eq!(level_count(Duration::from_millis(60_000)), 120);
        assert_eq!(level_count(MAX_CACHE_DURATION), 7200);
    }

    #[test]
    fn test_oversized_duration_is_clamped() {
        let backend: Backend<u32> = Backend::new("stat", Duration::MAX);
        let Backend::Cache(cache) = &backend else {
            panic!("expected a caching backend");
        };
        assert_eq!(lock(&cache.state).levels.len(), 7201);
        assert_eq!(cache.tick, tick_interval(MAX_CACHE_DURATION, 7200));

        assert_eq!(backend.provide_sync("/x", || Ok(1)).unwrap(), 1);
        assert_eq!(backend.provide_sync("/x", || Ok(2)).unwrap(), 1);
        assert_eq!(backend.mode(), Some(StorageMode::Sync));
    }

    #[test]
    fn test_tick_interval_rounds_up() {
        assert_eq!(
            tick_interval(Duration::from_millis(1000), 10),
            Duration::from_millis(100)
        );
        let tick = tick_interval(Duration::from_millis(1001), 10);
        assert!(tick * 10 >= Duration::from_millis(1001));
    }

    #[tokio::test]
    async fn test_merger_coalesces_concurrent_requests() {
        let backend: Backend<u32> = Backend::new("stat", Duration::ZERO);
        let calls = Arc::new(AtomicUsize::new(0));

        let a = backend.provide("/x", counted(&calls, 1));
        let b = backend.provide("/x", counted(&calls, 2));
        let (a, b) = futures::join!(a, b);
        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // nothing is retained once the operation settles
        let c = backend.provide("/x", counted(&calls, 3)).await;
        assert_eq!(c.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(backend.mode(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_coalesces_many_concurrent_misses() {
        let backend: Backend<u32> = Backend::new("readFile", Duration::from_secs(1));
        let calls = Arc::new(AtomicUsize::new(0));

        let pending: Vec<_> = (0..8)
            .map(|i| backend.provide("/x", counted(&calls, i)))
            .collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let results = futures::future::join_all(pending).await;
        assert!(results.into_iter().all(|r| r.unwrap() == 0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.cached_len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_serves_hits_and_shares_errors() {
        let backend: Backend<u32> = Backend::new("stat", Duration::from_secs(1));
        let calls = Arc::new(AtomicUsize::new(0));

        assert_eq!(backend.provide("/x", counted(&calls, 7)).await.unwrap(), 7);
        assert_eq!(backend.provide("/x", counted(&calls, 8)).await.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.mode(), Some(StorageMode::Async));

        let missing = || -> BoxFuture<'static, FsResult<u32>> {
            async {
                Err(FsError::new(
                    "stat",
                    "/missing",
                    io::Error::new(io::ErrorKind::NotFound, "gone"),
                ))
            }
            .boxed()
        };
        assert!(backend.provide("/missing", missing).await.unwrap_err().is_not_found());
        // a cached failure is answered without calling the provider
        let err = backend
            .provide("/missing", counted(&calls, 0))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_entries_expire_after_duration() {
        let backend: Backend<u32> = Backend::new("stat", Duration::from_secs(1));
        let calls = Arc::new(AtomicUsize::new(0));

        backend.provide("/x", counted(&calls, 1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(999)).await;
        backend.provide("/y", counted(&calls, 2)).await.unwrap();
        assert_eq!(backend.provide("/x", counted(&calls, 9)).await.unwrap(), 1);
        assert_eq!(backend.cached_len(), 2);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(backend.provide("/x", counted(&calls, 3)).await.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_lifetime_is_bounded() {
        let duration = Duration::from_secs(1);
        let backend: Backend<u32> = Backend::new("stat", duration);
        let mut calls = 0;
        let mut read = |value| {
            backend.provide_sync("/x", || {
                calls += 1;
                Ok(value)
            })
        };

        assert_eq!(read(1).unwrap(), 1);
        assert_eq!(backend.mode(), Some(StorageMode::Sync));

        tokio::time::advance(duration - Duration::from_millis(1)).await;
        assert_eq!(read(2).unwrap(), 1);

        // duration plus one tick, plus slack
        tokio::time::advance(Duration::from_millis(102)).await;
        assert_eq!(read(3).unwrap(), 3);
        assert_eq!(calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_by_prefix_and_parent() {
        let backend: Backend<u32> = Backend::new("readdir", Duration::from_secs(5));
        for path in ["/a/x", "/a/y", "/b/z"] {
            backend.provide_sync(path, || Ok(1)).unwrap();
        }
        backend.purge(&["/a/x"]);
        assert_eq!(backend.cached_len(), 2);

        backend.purge_parents(&["/b/z/file.js"]);
        assert_eq!(backend.cached_len(), 1);

        backend.purge_all();
        assert_eq!(backend.cached_len(), 0);
        assert_eq!(backend.mode(), Some(StorageMode::Idle));
    }
}
