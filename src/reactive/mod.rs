//! Reactive state wrapper and the subscriber contract.
//!
//! The wrapper records reads as dependency edges and turns writes into
//! synchronous per-key notifications.

mod state;
mod subscriber;

pub use state::ReactiveState;
pub use subscriber::{Subscriber, UpdateCallback};

pub(crate) use subscriber::{subscriber_id, SubscriberHandle};
