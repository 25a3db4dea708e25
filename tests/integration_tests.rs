//! Integration tests for Ripplestore

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use ripplestore::runtime::ReactiveRuntime;
use ripplestore::{ActionEntry, Actions, Store, StoreError, Subscriber, UseOptions};
use serde_json::{json, Map, Value};

/// Test subscriber recording every default-path delivery.
struct Recorder {
    data: Mutex<Map<String, Value>>,
    set_data_calls: AtomicUsize,
}

impl Recorder {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            data: Mutex::new(Map::new()),
            set_data_calls: AtomicUsize::new(0),
        })
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.data.lock().unwrap().get(key).cloned()
    }

    fn calls(&self) -> usize {
        self.set_data_calls.load(Ordering::SeqCst)
    }
}

impl Subscriber for Recorder {
    fn set_data(&self, patch: Map<String, Value>) {
        self.set_data_calls.fetch_add(1, Ordering::SeqCst);
        self.data.lock().unwrap().extend(patch);
    }
}

fn user_store() -> Store {
    Store::new(json!({ "name": "userStore", "age": 18, "id": "001" })).unwrap()
}

#[test]
fn subscribe_batches_initial_values_into_one_call() {
    ReactiveRuntime::scope(|| {
        let store = user_store();
        let view = Recorder::new();

        store.use_data(&view, UseOptions::keys(["name", "age"]));

        assert_eq!(view.calls(), 1);
        assert_eq!(view.get("name"), Some(json!("userStore")));
        assert_eq!(view.get("age"), Some(json!(18)));
        assert_eq!(view.get("id"), None);
    });
}

#[test]
fn total_with_callback_invokes_callback_per_key() {
    ReactiveRuntime::scope(|| {
        let store = user_store();
        let view = Recorder::new();
        let seen = Arc::new(Mutex::new(Map::new()));

        let seen_cb = Arc::clone(&seen);
        store.use_data(
            &view,
            UseOptions::total().callback(move |key, value| {
                seen_cb.lock().unwrap().insert(key.to_string(), value.clone());
            }),
        );

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen.get("name"), Some(&json!("userStore")));
        assert_eq!(seen.get("age"), Some(&json!(18)));
        assert_eq!(seen.get("id"), Some(&json!("001")));
        // the default update path is never used when a callback is set
        assert_eq!(view.calls(), 0);
    });
}

#[test]
fn total_takes_precedence_over_use_keys() {
    ReactiveRuntime::scope(|| {
        let store = user_store();
        let view = Recorder::new();

        store.use_data(
            &view,
            UseOptions {
                use_keys: vec!["name".to_string()],
                total: true,
                ..UseOptions::default()
            },
        );

        assert_eq!(view.calls(), 1);
        assert_eq!(view.data.lock().unwrap().len(), 3);
    });
}

#[test]
fn deferred_subscribe_suppresses_delivery_but_tracks() {
    ReactiveRuntime::scope(|| {
        let store = user_store();
        let view = Recorder::new();

        store.use_data(&view, UseOptions::keys(["name"]).deferred());
        assert_eq!(view.calls(), 0);

        store.state().set("name", json!("later"));
        assert_eq!(view.calls(), 1);
        assert_eq!(view.get("name"), Some(json!("later")));
    });
}

#[test]
fn deferred_subscribe_with_callback_delivers_only_on_write() {
    ReactiveRuntime::scope(|| {
        let store = user_store();
        let view = Recorder::new();
        let cb_calls = Arc::new(AtomicUsize::new(0));

        let counted = Arc::clone(&cb_calls);
        store.use_data(
            &view,
            UseOptions::keys(["name"])
                .callback(move |_, _| {
                    counted.fetch_add(1, Ordering::SeqCst);
                })
                .deferred(),
        );
        assert_eq!(cb_calls.load(Ordering::SeqCst), 0);

        store.state().set("name", json!("later"));
        assert_eq!(cb_calls.load(Ordering::SeqCst), 1);
        assert_eq!(view.calls(), 0);
    });
}

#[test]
fn untracked_keys_never_notify() {
    ReactiveRuntime::scope(|| {
        let store = user_store();
        let view = Recorder::new();

        store.use_data(&view, UseOptions::keys(["name"]));
        assert_eq!(view.calls(), 1);

        store.state().set("age", json!(19));
        store.state().set("id", json!("002"));
        store.state().set("brand_new", json!(true));

        assert_eq!(view.calls(), 1);
    });
}

#[test]
fn unsubscribe_stops_notifications_and_resubscribe_restores() {
    ReactiveRuntime::scope(|| {
        let store = user_store();
        let view = Recorder::new();

        store.use_data(&view, UseOptions::keys(["name"]));
        store.state().set("name", json!("first"));
        assert_eq!(view.calls(), 2);

        store.un_use_data(&view);
        store.state().set("name", json!("silent"));
        assert_eq!(view.calls(), 2);

        store.use_data(&view, UseOptions::keys(["name"]));
        assert_eq!(view.calls(), 3);
        store.state().set("name", json!("again"));
        assert_eq!(view.calls(), 4);
        assert_eq!(view.get("name"), Some(json!("again")));
    });
}

#[test]
fn unsubscribing_a_stranger_is_a_no_op() {
    ReactiveRuntime::scope(|| {
        let store = user_store();
        let stranger = Recorder::new();
        store.un_use_data(&stranger);
    });
}

#[test]
fn resubscribe_overwrites_the_recorded_key_set() {
    ReactiveRuntime::scope(|| {
        let store = user_store();
        let view = Recorder::new();

        store.use_data(&view, UseOptions::keys(["name"]));
        store.use_data(&view, UseOptions::keys(["age"]));
        assert_eq!(view.calls(), 2);

        // unsubscribe reverses only the keys recorded last
        store.un_use_data(&view);
        store.state().set("age", json!(19));
        assert_eq!(view.calls(), 2);
    });
}

#[test]
fn resubscribe_without_callback_restores_default_path() {
    ReactiveRuntime::scope(|| {
        let store = user_store();
        let view = Recorder::new();
        let cb_calls = Arc::new(AtomicUsize::new(0));

        let counted = Arc::clone(&cb_calls);
        store.use_data(
            &view,
            UseOptions::keys(["name"]).callback(move |_, _| {
                counted.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(cb_calls.load(Ordering::SeqCst), 1);

        // the callback slot is overwritten, not sticky
        store.use_data(&view, UseOptions::keys(["name"]));
        store.state().set("name", json!("x"));
        assert_eq!(cb_calls.load(Ordering::SeqCst), 1);
        assert_eq!(view.get("name"), Some(json!("x")));
    });
}

#[test]
fn independent_stores_track_and_notify_independently() {
    ReactiveRuntime::scope(|| {
        let left = Store::new(json!({ "name": "left" })).unwrap();
        let right = Store::new(json!({ "name": "right" })).unwrap();
        let view = Recorder::new();

        left.use_data(&view, UseOptions::keys(["name"]));
        right.use_data(&view, UseOptions::keys(["name"]));
        assert_eq!(view.calls(), 2);

        left.un_use_data(&view);

        left.state().set("name", json!("left2"));
        assert_eq!(view.calls(), 2);

        right.state().set("name", json!("right2"));
        assert_eq!(view.calls(), 3);
        assert_eq!(view.get("name"), Some(json!("right2")));
    });
}

#[test]
fn multiple_subscribers_each_notified_once_per_write() {
    ReactiveRuntime::scope(|| {
        let store = user_store();
        let first = Recorder::new();
        let second = Recorder::new();

        store.use_data(&first, UseOptions::keys(["name"]));
        store.use_data(&second, UseOptions::keys(["name", "age"]));

        store.state().set("name", json!("both"));
        assert_eq!(first.calls(), 2);
        assert_eq!(second.calls(), 2);

        store.state().set("age", json!(19));
        assert_eq!(first.calls(), 2);
        assert_eq!(second.calls(), 3);
    });
}

#[test]
fn dropped_subscribers_stop_receiving_notifications() {
    ReactiveRuntime::scope(|| {
        let store = user_store();
        let kept = Recorder::new();
        let dropped = Recorder::new();

        store.use_data(&kept, UseOptions::keys(["name"]));
        store.use_data(&dropped, UseOptions::keys(["name"]));
        drop(dropped);

        // the dead registration is pruned instead of delivered to
        store.state().set("name", json!("x"));
        assert_eq!(kept.calls(), 2);

        store.state().set("name", json!("y"));
        assert_eq!(kept.calls(), 3);
        assert_eq!(kept.get("name"), Some(json!("y")));
    });
}

#[test]
fn dispatch_errors() {
    ReactiveRuntime::scope(|| {
        let mut actions = Actions::new();
        actions.insert(
            "rename".to_string(),
            ActionEntry::handler(|state, args| {
                state.set("name", args[0].clone());
            }),
        );
        actions.insert("broken".to_string(), ActionEntry::from(json!("not a fn")));

        let store =
            Store::with_actions(json!({ "name": "userStore" }), actions).unwrap();

        assert!(matches!(
            store.dispatch("missing", &[]),
            Err(StoreError::UnknownAction(name)) if name == "missing"
        ));
        assert!(matches!(
            store.dispatch("broken", &[]),
            Err(StoreError::ActionNotCallable(name)) if name == "broken"
        ));
        assert!(store.dispatch("rename", &[json!("ok")]).is_ok());
        assert_eq!(store.state().get("name"), Some(json!("ok")));

        // no actions configured: silently nothing to do
        let plain = Store::new(json!({ "name": "a" })).unwrap();
        assert!(plain.dispatch("missing", &[]).is_ok());
    });
}

#[test]
fn action_reads_do_not_create_dependencies() {
    ReactiveRuntime::scope(|| {
        let mut actions = Actions::new();
        actions.insert(
            "copy_age".to_string(),
            ActionEntry::handler(|state, _| {
                // reading under dispatch must not subscribe anyone to "age"
                let age = state.get("age").unwrap();
                state.set("copied", age);
            }),
        );

        let store =
            Store::with_actions(json!({ "name": "a", "age": 18 }), actions).unwrap();
        let view = Recorder::new();

        store.use_data(&view, UseOptions::keys(["name"]));
        assert_eq!(view.calls(), 1);

        store.dispatch("copy_age", &[]).unwrap();
        store.state().set("age", json!(19));
        assert_eq!(view.calls(), 1);
    });
}

#[test]
fn tracking_survives_a_panicking_action() {
    ReactiveRuntime::scope(|| {
        let mut actions = Actions::new();
        actions.insert(
            "explode".to_string(),
            ActionEntry::handler(|_, _| panic!("boom")),
        );

        let store = Store::with_actions(json!({ "name": "a" }), actions).unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            store.dispatch("explode", &[])
        }));
        assert!(result.is_err());

        // tracking was restored by the scoped pause, so a fresh subscribe
        // still establishes dependencies
        let view = Recorder::new();
        store.use_data(&view, UseOptions::keys(["name"]));
        store.state().set("name", json!("after"));
        assert_eq!(view.calls(), 2);
        assert_eq!(view.get("name"), Some(json!("after")));
    });
}

#[test]
fn invalid_state_is_rejected() {
    assert!(matches!(
        Store::new(json!(42)),
        Err(StoreError::InvalidState(_))
    ));
    assert!(matches!(
        Store::new(json!(null)),
        Err(StoreError::InvalidState(_))
    ));
    assert!(matches!(
        Store::new(json!([1, 2, 3])),
        Err(StoreError::InvalidState(_))
    ));
}

#[test]
fn mini_store_scenario() {
    ReactiveRuntime::scope(|| {
        let mut actions = Actions::new();
        actions.insert(
            "changeNameAction".to_string(),
            ActionEntry::handler(|state, _| {
                state.set("name", json!("userStore1"));
            }),
        );

        let store = Store::with_actions(
            json!({ "name": "userStore", "age": 18, "id": "001" }),
            actions,
        )
        .unwrap();
        let component = Recorder::new();

        store.use_data(&component, UseOptions::keys(["name"]));
        assert_eq!(component.get("name"), Some(json!("userStore")));

        store.dispatch("changeNameAction", &[]).unwrap();
        // the component's data updated without another use_data call
        assert_eq!(component.get("name"), Some(json!("userStore1")));
    });
}
