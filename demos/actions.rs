//! Dispatching named actions with per-key callbacks

use std::sync::{Arc, Mutex};

use ripplestore::{ActionEntry, Actions, Store, Subscriber, UseOptions};
use serde_json::{json, Map, Value};

struct Logger {
    data: Mutex<Map<String, Value>>,
}

impl Subscriber for Logger {
    fn set_data(&self, patch: Map<String, Value>) {
        self.data.lock().unwrap().extend(patch);
    }
}

fn main() {
    println!("=== Actions Example ===\n");

    let mut actions = Actions::new();
    actions.insert(
        "increment".to_string(),
        ActionEntry::handler(|state, args| {
            let by = args.first().and_then(Value::as_i64).unwrap_or(1);
            let count = state.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
            state.set("count", json!(count + by));
        }),
    );
    actions.insert(
        "rename".to_string(),
        ActionEntry::handler(|state, args| {
            state.set("name", args[0].clone());
        }),
    );

    let store = Store::with_actions(json!({ "count": 0, "name": "counter" }), actions).unwrap();

    let logger = Arc::new(Logger {
        data: Mutex::new(Map::new()),
    });

    // watch both keys through a callback instead of the default path
    store.use_data(
        &logger,
        UseOptions::keys(["count", "name"]).callback(|key, value| {
            println!("changed: {key} = {value}");
        }),
    );

    println!("\nDispatching increment twice...");
    store.dispatch("increment", &[]).unwrap();
    store.dispatch("increment", &[json!(10)]).unwrap();

    println!("\nDispatching rename...");
    store.dispatch("rename", &[json!("renamed")]).unwrap();

    println!("\nDispatching an unknown action...");
    match store.dispatch("missing", &[]) {
        Ok(()) => println!("unexpected success"),
        Err(err) => println!("error: {err}"),
    }
}
