use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::reactive::{subscriber_id, ReactiveState, Subscriber, SubscriberHandle, UpdateCallback};
use crate::runtime::{self, ReactiveRuntime};

/// A mutator invoked by [`Store::dispatch`] with the reactive state and
/// the dispatch arguments.
pub type ActionFn = Arc<dyn Fn(&ReactiveState, &[Value]) + Send + Sync>;

/// One entry in a store's action table.
///
/// Action tables can be assembled from mixed sources, so an entry is
/// either a callable handler or a plain value; dispatching a plain value
/// fails with [`StoreError::ActionNotCallable`].
pub enum ActionEntry {
    /// A callable mutator.
    Handler(ActionFn),
    /// A non-callable placeholder; rejected at dispatch time.
    Value(Value),
}

impl ActionEntry {
    /// Wrap a mutator function as a callable entry.
    pub fn handler<F>(f: F) -> Self
    where
        F: Fn(&ReactiveState, &[Value]) + Send + Sync + 'static,
    {
        Self::Handler(Arc::new(f))
    }
}

impl From<Value> for ActionEntry {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Named mutator table accepted by [`Store::with_actions`].
pub type Actions = HashMap<String, ActionEntry>;

/// Subscription configuration for [`Store::use_data`].
///
/// Recognized options are exactly `use_keys`, `total`, `cb` and
/// `immediate`, with `total` taking priority over `use_keys` when both
/// are present.
///
/// # Examples
///
/// ```
/// use ripplestore::UseOptions;
///
/// let opts = UseOptions::keys(["name", "age"]).deferred();
/// assert!(!opts.immediate);
/// ```
pub struct UseOptions {
    /// Keys to subscribe to when `total` is not set.
    pub use_keys: Vec<String>,
    /// Subscribe to every key currently in the state.
    pub total: bool,
    /// Deliver the current values at subscribe time (default true).
    pub immediate: bool,
    /// Per-key callback used instead of the default update path.
    pub cb: Option<UpdateCallback>,
}

impl Default for UseOptions {
    fn default() -> Self {
        Self {
            use_keys: Vec::new(),
            total: false,
            immediate: true,
            cb: None,
        }
    }
}

impl UseOptions {
    /// Subscribe to exactly the given keys.
    pub fn keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            use_keys: keys.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Subscribe to all keys of the state.
    pub fn total() -> Self {
        Self {
            total: true,
            ..Self::default()
        }
    }

    /// Deliver each tracked key through `f` instead of the default update
    /// path.
    pub fn callback<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.cb = Some(Arc::new(f));
        self
    }

    /// Establish tracking without delivering current values.
    pub fn deferred(mut self) -> Self {
        self.immediate = false;
        self
    }
}

/// A named reactive store: one reactive state object plus an optional
/// table of named mutators.
///
/// Subscribers declare the keys they care about with
/// [`use_data`](Store::use_data); later writes to those keys — typically
/// from a dispatched action — notify exactly those subscribers,
/// synchronously, before the write returns.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use ripplestore::{Store, Subscriber, UseOptions};
/// use serde_json::{json, Map, Value};
///
/// struct View {
///     data: Mutex<Map<String, Value>>,
/// }
///
/// impl Subscriber for View {
///     fn set_data(&self, patch: Map<String, Value>) {
///         self.data.lock().unwrap().extend(patch);
///     }
/// }
///
/// let store = Store::new(json!({ "name": "userStore", "age": 18 })).unwrap();
/// let view = Arc::new(View { data: Mutex::new(Map::new()) });
///
/// store.use_data(&view, UseOptions::keys(["name"]));
/// assert_eq!(view.data.lock().unwrap().get("name"), Some(&json!("userStore")));
/// ```
pub struct Store {
    state: Arc<ReactiveState>,
    actions: Option<Actions>,
}

impl Store {
    /// Create a store over `initial` with no actions configured.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidState`] if `initial` is not an object.
    pub fn new(initial: Value) -> Result<Self> {
        Ok(Self {
            state: Arc::new(ReactiveState::new(initial)?),
            actions: None,
        })
    }

    /// Create a store over `initial` with a named mutator table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidState`] if `initial` is not an object.
    pub fn with_actions(initial: Value, actions: Actions) -> Result<Self> {
        Ok(Self {
            state: Arc::new(ReactiveState::new(initial)?),
            actions: Some(actions),
        })
    }

    /// The store's reactive state object.
    pub fn state(&self) -> &ReactiveState {
        &self.state
    }

    /// Subscribe `subscriber` to this store's state.
    ///
    /// Resolves the effective key set (`total` wins over `use_keys`; both
    /// absent or empty is a no-op), records the key set and callback on
    /// the subscriber's attachment, then reads each effective key with the
    /// subscriber active in the tracking context — those reads are the
    /// only place dependency edges are created.
    ///
    /// With `immediate` set (the default), current values are delivered
    /// once: a single batched `set_data` call when no callback was
    /// supplied, or one `cb(key, value)` call per effective key when one
    /// was. With `immediate` unset, nothing is delivered but tracking is
    /// still established.
    pub fn use_data<S>(&self, subscriber: &Arc<S>, options: UseOptions)
    where
        S: Subscriber + 'static,
    {
        let UseOptions {
            use_keys,
            total,
            immediate,
            cb,
        } = options;
        if !total && use_keys.is_empty() {
            return;
        }
        let effective = if total { self.state.keys() } else { use_keys };

        let id = subscriber_id(subscriber);
        let weak = Arc::downgrade(subscriber);
        let handle: SubscriberHandle = weak;
        self.state
            .save_subscriber(id, handle, effective.clone(), cb.clone());

        runtime::set_active_subscriber(Some(id));
        let mut batch = Map::new();
        for key in &effective {
            // this read registers the dependency edge
            let value = self.state.get(key);
            if !immediate {
                continue;
            }
            let value = value.unwrap_or(Value::Null);
            match &cb {
                Some(cb) => cb(key, &value),
                None => {
                    batch.insert(key.clone(), value);
                }
            }
        }
        runtime::set_active_subscriber(None);

        if immediate && cb.is_none() {
            subscriber.set_data(batch);
        }
    }

    /// Remove `subscriber`'s registrations from this store's state.
    ///
    /// Walks the key set recorded at subscribe time, removing the
    /// subscriber from the registry for each key (pruning emptied
    /// entries), and drops the subscriber's attachment. A subscriber that
    /// never subscribed is a no-op.
    pub fn un_use_data<S>(&self, subscriber: &Arc<S>)
    where
        S: Subscriber + 'static,
    {
        let id = subscriber_id(subscriber);
        let Some(keys) = self.state.remove_subscriber(id) else {
            return;
        };
        let runtime = ReactiveRuntime::current();
        for key in keys {
            runtime.unregister(self.state.id(), &key, id);
        }
    }

    /// Invoke the named mutator with the reactive state and `args`.
    ///
    /// Tracking is suspended for the duration of the call, so the
    /// mutator's own reads do not create new dependencies while its writes
    /// still notify. Notification delivery happens synchronously inside
    /// the mutator call, before `dispatch` returns. Tracking is restored
    /// even if the mutator panics.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownAction`] if no configured action
    /// matches `name`, and [`StoreError::ActionNotCallable`] if the entry
    /// is not a handler. A store with no actions configured returns
    /// `Ok(())` without doing anything.
    pub fn dispatch(&self, name: &str, args: &[Value]) -> Result<()> {
        let Some(actions) = &self.actions else {
            return Ok(());
        };
        let _pause = runtime::pause_tracking();
        let entry = actions
            .get(name)
            .ok_or_else(|| StoreError::UnknownAction(name.to_string()))?;
        match entry {
            ActionEntry::Handler(f) => {
                debug!(action = name, "dispatching");
                f(&self.state, args);
                Ok(())
            }
            ActionEntry::Value(_) => Err(StoreError::ActionNotCallable(name.to_string())),
        }
    }
}
