//! # Ripplestore
//!
//! A keyed fine-grained reactive state store for Rust.
//!
//! Ripplestore tracks which subscriber read which keys of a state object
//! and notifies exactly those subscribers when the keys they read are
//! later written:
//!
//! - [`ReactiveState`] - a key/value object whose reads register
//!   dependency edges and whose writes notify per key
//! - [`Store`] - a named store combining one reactive state with
//!   subscribe/unsubscribe and named-action dispatch
//! - [`runtime`] - the subscriber registry and the thread-local tracking
//!   context behind both
//!
//! Everything is synchronous: a write has delivered every notification by
//! the time it returns.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use ripplestore::{ActionEntry, Actions, Store, Subscriber, UseOptions};
//! use serde_json::{json, Map, Value};
//!
//! struct View {
//!     data: Mutex<Map<String, Value>>,
//! }
//!
//! impl Subscriber for View {
//!     fn set_data(&self, patch: Map<String, Value>) {
//!         self.data.lock().unwrap().extend(patch);
//!     }
//! }
//!
//! let mut actions = Actions::new();
//! actions.insert(
//!     "rename".to_string(),
//!     ActionEntry::handler(|state, args| {
//!         state.set("name", args[0].clone());
//!     }),
//! );
//!
//! let store = Store::with_actions(json!({ "name": "userStore" }), actions).unwrap();
//! let view = Arc::new(View { data: Mutex::new(Map::new()) });
//!
//! store.use_data(&view, UseOptions::keys(["name"]));
//! store.dispatch("rename", &[json!("userStore1")]).unwrap();
//!
//! assert_eq!(view.data.lock().unwrap().get("name"), Some(&json!("userStore1")));
//! ```

pub mod error;
pub mod reactive;
pub mod runtime;
pub mod store;

// Re-export main types for convenience
pub use error::{Result, StoreError};
pub use reactive::{ReactiveState, Subscriber, UpdateCallback};
pub use store::{ActionEntry, ActionFn, Actions, Store, UseOptions};
