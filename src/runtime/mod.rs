//! Runtime support for dependency tracking.
//!
//! This module provides the subscriber registry and the thread-local
//! tracking context that together decide which reads become dependency
//! edges and which subscribers a write must notify.

mod context;

pub use context::{
    disable_tracking, enable_tracking, pause_tracking, set_active_subscriber, ReactiveRuntime,
    StateId, SubscriberId, TrackingPause,
};
pub(crate) use context::RuntimeInner;
