//! High-level keyed state management.
//!
//! Stores tie the reactive state wrapper, the tracking context and the
//! subscriber registry together behind a subscribe/unsubscribe/dispatch
//! surface.

mod store;

pub use store::{ActionEntry, ActionFn, Actions, Store, UseOptions};
