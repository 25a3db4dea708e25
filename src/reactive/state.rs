use std::sync::{Arc, RwLock, Weak};

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{Result, StoreError};
use crate::reactive::subscriber::{SubscriberEntry, SubscriberHandle, SubscriberTable};
use crate::reactive::UpdateCallback;
use crate::runtime::{ReactiveRuntime, RuntimeInner, StateId, SubscriberId};

/// A key/value state object with instrumented accessors.
///
/// Every read through [`get`](ReactiveState::get) consults the tracking
/// context and registers a dependency edge for the active subscriber;
/// every write through [`set`](ReactiveState::set) looks up the registry
/// and synchronously notifies each subscriber registered for that key.
///
/// Exactly one `ReactiveState` exists per raw state object for the
/// lifetime of its owning store.
///
/// # Examples
///
/// ```
/// use ripplestore::ReactiveState;
/// use serde_json::json;
///
/// let state = ReactiveState::new(json!({ "count": 0 })).unwrap();
/// assert_eq!(state.get("count"), Some(json!(0)));
///
/// state.set("count", json!(1));
/// assert_eq!(state.get("count"), Some(json!(1)));
/// ```
pub struct ReactiveState {
    id: StateId,
    values: RwLock<Map<String, Value>>,
    subscribers: RwLock<SubscriberTable>,
    // Weak back-pointer for registry cleanup when the state is dropped.
    runtime: Weak<RwLock<RuntimeInner>>,
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl ReactiveState {
    /// Wrap a plain state object in a reactive accessor layer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidState`] if `initial` is not a JSON
    /// object; no partial state is created in that case.
    pub fn new(initial: Value) -> Result<Self> {
        let Value::Object(values) = initial else {
            return Err(StoreError::InvalidState(value_kind(&initial)));
        };
        let runtime = ReactiveRuntime::current();
        Ok(Self {
            id: runtime.next_id(),
            values: RwLock::new(values),
            subscribers: RwLock::new(SubscriberTable::new()),
            runtime: Arc::downgrade(&runtime.inner()),
        })
    }

    /// This state's registry identity.
    pub fn id(&self) -> StateId {
        self.id
    }

    /// Read the current value of `key`, registering a dependency edge for
    /// the active subscriber when tracking is enabled.
    ///
    /// Absent keys are tracked too, and read as `None`.
    pub fn get(&self, key: &str) -> Option<Value> {
        ReactiveRuntime::current().track_read(self.id, key);
        self.values.read().unwrap().get(key).cloned()
    }

    /// Assign `value` to `key`, then synchronously notify every subscriber
    /// registered for that key.
    ///
    /// Each registered subscriber is notified exactly once per write. A
    /// subscriber with a saved callback receives `(key, value)` through
    /// it; otherwise the `{key: value}` patch goes through its default
    /// update path. Writes to keys nobody read under tracking notify no
    /// one.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.values.write().unwrap().insert(key.clone(), value.clone());
        self.notify(&key, &value);
    }

    /// The state's current key set, in map order. Not tracked.
    pub fn keys(&self) -> Vec<String> {
        self.values.read().unwrap().keys().cloned().collect()
    }

    /// Whether `key` currently exists in the state. Not tracked.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.read().unwrap().contains_key(key)
    }

    /// Number of keys in the state. Not tracked.
    pub fn len(&self) -> usize {
        self.values.read().unwrap().len()
    }

    /// Whether the state holds no keys. Not tracked.
    pub fn is_empty(&self) -> bool {
        self.values.read().unwrap().is_empty()
    }

    /// Record or overwrite a subscriber's attachment on this state.
    ///
    /// Replaces both the effective key set and the callback slot, so a
    /// re-subscribe without a callback falls back to the default update
    /// path again.
    pub(crate) fn save_subscriber(
        &self,
        id: SubscriberId,
        handle: SubscriberHandle,
        keys: Vec<String>,
        callback: Option<UpdateCallback>,
    ) {
        let mut table = self.subscribers.write().unwrap();
        table.insert(
            id,
            SubscriberEntry {
                handle,
                keys,
                callback,
            },
        );
    }

    /// Remove a subscriber's attachment, returning its recorded key set.
    pub(crate) fn remove_subscriber(&self, id: SubscriberId) -> Option<Vec<String>> {
        let mut table = self.subscribers.write().unwrap();
        table.remove(&id).map(|entry| entry.keys)
    }

    /// Deliver a write of `key` to every registered subscriber.
    ///
    /// Handles and callbacks are snapshotted first so no lock is held
    /// while subscriber code runs. Subscribers whose owning `Arc` has been
    /// dropped are pruned from the registry instead of delivered to.
    fn notify(&self, key: &str, value: &Value) {
        let runtime = ReactiveRuntime::current();
        let ids = runtime.subscribers_of(self.id, key);
        if ids.is_empty() {
            return;
        }
        trace!(state = self.id, key, count = ids.len(), "notifying subscribers");

        let mut deliveries = Vec::with_capacity(ids.len());
        let mut dead = Vec::new();
        {
            let table = self.subscribers.read().unwrap();
            for id in ids {
                match table.get(&id) {
                    Some(entry) => match entry.handle.upgrade() {
                        Some(handle) => deliveries.push((handle, entry.callback.clone())),
                        None => dead.push(id),
                    },
                    // registered but never attached; stale edge
                    None => dead.push(id),
                }
            }
        }

        if !dead.is_empty() {
            let mut stale_keys = Vec::new();
            {
                let mut table = self.subscribers.write().unwrap();
                for id in &dead {
                    match table.remove(id) {
                        Some(entry) => stale_keys.extend(entry.keys.into_iter().map(|k| (k, *id))),
                        None => stale_keys.push((key.to_string(), *id)),
                    }
                }
            }
            for (stale_key, id) in stale_keys {
                runtime.unregister(self.id, &stale_key, id);
            }
        }

        for (handle, callback) in deliveries {
            match callback {
                Some(cb) => cb(key, value),
                None => {
                    let mut patch = Map::new();
                    patch.insert(key.to_string(), value.clone());
                    handle.set_data(patch);
                }
            }
        }
    }
}

impl Drop for ReactiveState {
    fn drop(&mut self) {
        // Purge this state's registry entries; the runtime may already be
        // gone if the state outlived a scoped runtime.
        if let Some(inner) = self.runtime.upgrade() {
            if let Ok(inner) = inner.read() {
                inner.remove_state(self.id);
            }
        }
    }
}
