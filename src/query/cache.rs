//! Keyed result cache with observable fetch state.
//!
//! A [`Query`] binds a [`QueryKey`] to a fetcher. Every `Query` built for the
//! same key shares one slot in the [`QueryCache`], so a refetch through one
//! handle is visible through all others. Concurrent refetches are not
//! coordinated: the last one to complete wins.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use futures_util::future::BoxFuture;

use crate::api::ApiError;

// ═══════════════════════════════════════════════════════════
// Keys and state
// ═══════════════════════════════════════════════════════════

/// Hierarchical cache key, e.g. `["workouts", "saved"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<S: AsRef<str>>(parts: &[S]) -> Self {
        Self(parts.iter().map(|p| p.as_ref().to_string()).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Point-in-time view of a query.
///
/// `data` survives a failed refetch, so a screen keeps showing the last
/// good result next to the error.
pub struct QueryState<T> {
    pub data: Option<Arc<T>>,
    pub is_loading: bool,
    pub error: Option<Arc<ApiError>>,
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            is_loading: self.is_loading,
            error: self.error.clone(),
        }
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for QueryState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryState")
            .field("data", &self.data)
            .field("is_loading", &self.is_loading)
            .field("error", &self.error)
            .finish()
    }
}

struct Slot<T> {
    state: RwLock<SlotState<T>>,
}

struct SlotState<T> {
    data: Option<Arc<T>>,
    error: Option<Arc<ApiError>>,
    in_flight: usize,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            state: RwLock::new(SlotState {
                data: None,
                error: None,
                in_flight: 0,
            }),
        }
    }
}

impl<T> Slot<T> {
    fn snapshot(&self) -> QueryState<T> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        QueryState {
            data: state.data.clone(),
            is_loading: state.in_flight > 0,
            error: state.error.clone(),
        }
    }

    fn update(&self, f: impl FnOnce(&mut SlotState<T>)) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        f(&mut state);
    }
}

/// Counts one refetch as in flight until dropped, so a cancelled refetch
/// does not leave the slot loading.
struct InFlight<'a, T>(&'a Slot<T>);

impl<'a, T> InFlight<'a, T> {
    fn start(slot: &'a Slot<T>) -> Self {
        slot.update(|s| s.in_flight += 1);
        Self(slot)
    }
}

impl<T> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        self.0.update(|s| s.in_flight = s.in_flight.saturating_sub(1));
    }
}

// ═══════════════════════════════════════════════════════════
// QueryCache
// ═══════════════════════════════════════════════════════════

/// Fetcher for a query: called once per (re)fetch.
pub type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

/// Shared store of query slots, keyed by [`QueryKey`].
#[derive(Default)]
pub struct QueryCache {
    slots: Mutex<HashMap<QueryKey, Arc<dyn Any + Send + Sync>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle on `key`, creating the slot on first use.
    ///
    /// Reusing a key for a different result type replaces the slot.
    pub fn query<T: Send + Sync + 'static>(&self, key: QueryKey, fetcher: Fetcher<T>) -> Query<T> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let existing = slots
            .get(&key)
            .cloned()
            .and_then(|slot| slot.downcast::<Slot<T>>().ok());
        let slot = match existing {
            Some(slot) => slot,
            None => {
                let slot = Arc::new(Slot::<T>::default());
                slots.insert(key.clone(), slot.clone() as Arc<dyn Any + Send + Sync>);
                slot
            }
        };
        Query { key, slot, fetcher }
    }

    /// Drop the cached slot for `key`. Existing handles keep their state.
    pub fn invalidate(&self, key: &QueryKey) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.remove(key);
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.contains_key(key)
    }
}

// ═══════════════════════════════════════════════════════════
// Query
// ═══════════════════════════════════════════════════════════

pub struct Query<T> {
    key: QueryKey,
    slot: Arc<Slot<T>>,
    fetcher: Fetcher<T>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            slot: Arc::clone(&self.slot),
            fetcher: Arc::clone(&self.fetcher),
        }
    }
}

impl<T: Send + Sync + 'static> Query<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Cached data when present, otherwise fetch.
    pub async fn fetch(&self) -> QueryState<T> {
        let current = self.slot.snapshot();
        if current.data.is_some() {
            return current;
        }
        self.refetch().await
    }

    /// Always hit the fetcher. On success the data and error are replaced;
    /// on failure only the error is.
    pub async fn refetch(&self) -> QueryState<T> {
        let in_flight = InFlight::start(&self.slot);
        let result = (self.fetcher)().await;
        self.slot.update(|s| match result {
            Ok(data) => {
                s.data = Some(Arc::new(data));
                s.error = None;
            }
            Err(e) => {
                tracing::debug!(key = %self.key, error = %e, "Query fetch failed");
                s.error = Some(Arc::new(e));
            }
        });
        drop(in_flight);
        self.slot.snapshot()
    }

    pub fn snapshot(&self) -> QueryState<T> {
        self.slot.snapshot()
    }

    pub fn data(&self) -> Option<Arc<T>> {
        self.slot.snapshot().data
    }

    pub fn is_loading(&self) -> bool {
        self.slot.snapshot().is_loading
    }
}

// ═══════════════════════════════════════════════════════════
// Mutation
// ═══════════════════════════════════════════════════════════

pub type MutationFn<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<O, ApiError>> + Send + Sync>;

/// A side-effecting call with a pending counter. Calls are never
/// deduplicated: two `mutate_async` calls make two requests.
pub struct Mutation<I, O> {
    run: MutationFn<I, O>,
    pending: Arc<AtomicUsize>,
}

impl<I, O> Clone for Mutation<I, O> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
            pending: Arc::clone(&self.pending),
        }
    }
}

struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<I, O> Mutation<I, O> {
    pub fn new(run: MutationFn<I, O>) -> Self {
        Self {
            run,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn mutate_async(&self, input: I) -> Result<O, ApiError> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let _guard = PendingGuard(Arc::clone(&self.pending));
        (self.run)(input).await
    }

    /// True while at least one call is in flight.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }
}
