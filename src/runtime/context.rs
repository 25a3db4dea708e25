use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use tracing::trace;

/// Identity of a reactive state object within a runtime.
pub type StateId = usize;

/// Identity of a subscriber, derived from its allocation address.
pub type SubscriberId = usize;

/// Thread-local tracking window state.
///
/// Holds at most one active subscriber and the enabled flag gating whether
/// reads are recorded. Its value is only meaningful during the synchronous
/// extent of a read-collection pass.
struct TrackingContext {
    active: Option<SubscriberId>,
    enabled: bool,
}

thread_local! {
    static TRACKING: RefCell<TrackingContext> = const {
        RefCell::new(TrackingContext {
            active: None,
            enabled: true,
        })
    };
}

/// Set (or clear) the subscriber whose reads are currently being collected.
///
/// Overwrites any previous value; reads are collected in strictly
/// sequential passes, never concurrently, so a single slot suffices.
pub fn set_active_subscriber(subscriber: Option<SubscriberId>) {
    TRACKING.with(|ctx| ctx.borrow_mut().active = subscriber);
}

/// Stop recording reads as dependencies on the current thread.
pub fn disable_tracking() {
    TRACKING.with(|ctx| ctx.borrow_mut().enabled = false);
}

/// Resume recording reads as dependencies on the current thread.
pub fn enable_tracking() {
    TRACKING.with(|ctx| ctx.borrow_mut().enabled = true);
}

/// The subscriber that a read should be registered against, if any.
///
/// Returns `Some` only when tracking is enabled and an active subscriber
/// is set.
pub(crate) fn tracking_target() -> Option<SubscriberId> {
    TRACKING.with(|ctx| {
        let ctx = ctx.borrow();
        if ctx.enabled {
            ctx.active
        } else {
            None
        }
    })
}

/// Suspend dependency tracking until the returned guard is dropped.
///
/// Used around mutator invocations so that a mutator's own reads of state
/// do not spuriously create new subscriptions. The previous flag value is
/// restored on drop, even if the code inside the pause panics.
///
/// # Examples
///
/// ```
/// use ripplestore::runtime::pause_tracking;
///
/// {
///     let _pause = pause_tracking();
///     // reads here are not recorded as dependencies
/// }
/// // tracking is restored here
/// ```
pub fn pause_tracking() -> TrackingPause {
    let was_enabled = TRACKING.with(|ctx| {
        let mut ctx = ctx.borrow_mut();
        let prev = ctx.enabled;
        ctx.enabled = false;
        prev
    });
    TrackingPause { was_enabled }
}

/// RAII guard returned by [`pause_tracking`].
pub struct TrackingPause {
    was_enabled: bool,
}

impl Drop for TrackingPause {
    fn drop(&mut self) {
        let was_enabled = self.was_enabled;
        TRACKING.with(|ctx| ctx.borrow_mut().enabled = was_enabled);
    }
}

/// Dependency table: state identity -> property key -> subscriber set.
///
/// Holds only ids, never handles, so it cannot keep a state object or a
/// subscriber alive. Empty sets and maps are pruned eagerly so the table
/// does not grow without bound as subscribers come and go.
struct DependencyTable {
    deps: HashMap<StateId, HashMap<String, HashSet<SubscriberId>>>,
}

impl DependencyTable {
    fn new() -> Self {
        Self {
            deps: HashMap::new(),
        }
    }

    fn clear(&mut self) {
        self.deps.clear();
    }
}

/// Inner runtime state that can be shared.
pub struct RuntimeInner {
    table: Mutex<DependencyTable>,
}

impl RuntimeInner {
    fn new() -> Self {
        Self {
            table: Mutex::new(DependencyTable::new()),
        }
    }

    /// Drop every dependency entry belonging to a state object.
    ///
    /// Called when the state is destroyed so the table holds no edges
    /// referring to it.
    pub(crate) fn remove_state(&self, state: StateId) {
        let mut table = self.table.lock().unwrap();
        table.deps.remove(&state);
    }

    fn clear(&self) {
        let mut table = self.table.lock().unwrap();
        table.clear();
    }
}

/// Hybrid reactive runtime holding the subscriber registry.
///
/// Supports both a global runtime (default) and scoped runtimes for
/// isolation. The runtime records which subscribers read which keys of
/// which state objects, and answers notification lookups on writes.
///
/// # Examples
///
/// Using scoped runtimes for isolation:
///
/// ```
/// use ripplestore::runtime::ReactiveRuntime;
/// use ripplestore::Store;
/// use serde_json::json;
///
/// ReactiveRuntime::scope(|| {
///     let store = Store::new(json!({ "count": 0 })).unwrap();
///     assert_eq!(store.state().get("count"), Some(json!(0)));
/// });
/// // Runtime and all its registry state is dropped here
/// ```
pub struct ReactiveRuntime {
    next_id: AtomicUsize,
    inner: Arc<RwLock<RuntimeInner>>,
}

// Thread-local stack for scoped runtimes
thread_local! {
    static RUNTIME_STACK: RefCell<Vec<Arc<ReactiveRuntime>>> = const { RefCell::new(Vec::new()) };
}

impl ReactiveRuntime {
    /// Create a new isolated runtime with an empty registry.
    fn new() -> Arc<Self> {
        Arc::new(ReactiveRuntime {
            next_id: AtomicUsize::new(0),
            inner: Arc::new(RwLock::new(RuntimeInner::new())),
        })
    }

    /// Run a function with a fresh isolated runtime.
    ///
    /// Useful for testing: registry entries made inside the scope are
    /// dropped with the runtime when the function returns.
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let runtime = Self::new();
        Self::with_runtime(runtime, f)
    }

    /// Get or create the global runtime (fallback).
    pub fn global() -> Arc<Self> {
        static RUNTIME: OnceLock<Arc<ReactiveRuntime>> = OnceLock::new();
        Arc::clone(RUNTIME.get_or_init(Self::new))
    }

    /// Get the current reactive runtime (scoped or global fallback).
    pub fn current() -> Arc<Self> {
        RUNTIME_STACK.with(|stack| stack.borrow().last().cloned().unwrap_or_else(Self::global))
    }

    /// Run a function with a specific runtime as the current context.
    ///
    /// Pushes the runtime onto the thread-local stack for the duration of
    /// the function execution, popping it even on panic.
    pub fn with_runtime<F, R>(runtime: Arc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().push(runtime);
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// Clear all registry entries and reset the id counter.
    ///
    /// Useful for resetting between tests.
    pub fn clear(&self) {
        let inner = self.inner.read().unwrap();
        inner.clear();
        self.next_id.store(0, Ordering::SeqCst);
    }

    /// Get a reference to the inner runtime state.
    pub(crate) fn inner(&self) -> Arc<RwLock<RuntimeInner>> {
        Arc::clone(&self.inner)
    }

    /// Generate the next unique id for a reactive state object.
    pub(crate) fn next_id(&self) -> StateId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Record a read of `key` on `state` by the current tracking target.
    ///
    /// No-op when tracking is disabled or no subscriber is active.
    /// Registration is idempotent; intermediate maps and sets are created
    /// lazily on first use.
    pub(crate) fn track_read(&self, state: StateId, key: &str) {
        let Some(subscriber) = tracking_target() else {
            return;
        };
        let inner = self.inner.read().unwrap();
        let mut table = inner.table.lock().unwrap();
        table
            .deps
            .entry(state)
            .or_default()
            .entry(key.to_string())
            .or_default()
            .insert(subscriber);
        trace!(state, key, subscriber, "registered dependency");
    }

    /// Current subscriber set for `(state, key)`, or empty if absent.
    ///
    /// Does not mutate the registry.
    pub(crate) fn subscribers_of(&self, state: StateId, key: &str) -> Vec<SubscriberId> {
        let inner = self.inner.read().unwrap();
        let table = inner.table.lock().unwrap();
        table
            .deps
            .get(&state)
            .and_then(|keys| keys.get(key))
            .map(|subs| subs.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Remove `subscriber` from the set for `(state, key)`.
    ///
    /// Prunes the key entry when its set becomes empty, and the state
    /// entry when its key map becomes empty.
    pub(crate) fn unregister(&self, state: StateId, key: &str, subscriber: SubscriberId) {
        let inner = self.inner.read().unwrap();
        let mut table = inner.table.lock().unwrap();
        let Some(keys) = table.deps.get_mut(&state) else {
            return;
        };
        if let Some(subs) = keys.get_mut(key) {
            subs.remove(&subscriber);
            if subs.is_empty() {
                keys.remove(key);
            }
        }
        if keys.is_empty() {
            table.deps.remove(&state);
        }
        trace!(state, key, subscriber, "unregistered dependency");
    }

    /// Whether the registry currently holds any entry for `state`.
    ///
    /// Emptied entries are pruned eagerly, so this is `false` once the
    /// last subscriber for the state unregisters.
    pub fn has_state(&self, state: StateId) -> bool {
        let inner = self.inner.read().unwrap();
        let table = inner.table.lock().unwrap();
        table.deps.contains_key(&state)
    }
}
