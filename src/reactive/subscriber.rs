use std::collections::HashMap;
use std::sync::{Arc, Weak};

use serde_json::{Map, Value};

use crate::runtime::SubscriberId;

/// A consumer that can be notified of state changes for specific keys.
///
/// `set_data` is the default update path: it receives a partial key/value
/// mapping and must merge it additively into the subscriber's own visible
/// data, never replacing unrelated keys. Subscribers that always supply a
/// callback at subscribe time may leave it a no-op.
pub trait Subscriber: Send + Sync {
    /// Merge a partial key/value patch into the subscriber's data.
    fn set_data(&self, patch: Map<String, Value>);
}

/// Non-owning handle to a subscriber held by the registry side tables.
pub(crate) type SubscriberHandle = Weak<dyn Subscriber>;

/// Per-key callback invoked instead of the default update path.
pub type UpdateCallback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Derive the registry identity of a subscriber from its allocation.
///
/// Stable for the lifetime of the `Arc` allocation, so repeated subscribe
/// and unsubscribe calls with the same subscriber resolve to the same id.
pub(crate) fn subscriber_id<S>(subscriber: &Arc<S>) -> SubscriberId
where
    S: Subscriber + 'static,
{
    Arc::as_ptr(subscriber) as *const () as usize
}

/// What the state remembers about one subscriber.
///
/// The counterpart of the registry's id sets: the weak handle for
/// delivery, the effective key set recorded at subscribe time (used to
/// reverse registration on unsubscribe), and the optional callback that
/// replaces the default update path.
pub(crate) struct SubscriberEntry {
    pub(crate) handle: SubscriberHandle,
    pub(crate) keys: Vec<String>,
    pub(crate) callback: Option<UpdateCallback>,
}

/// Side table of subscriber entries, keyed by subscriber identity.
///
/// Owned by the reactive state, so every attachment dies with the state.
/// Entries hold only weak handles and never keep a subscriber alive.
pub(crate) type SubscriberTable = HashMap<SubscriberId, SubscriberEntry>;
