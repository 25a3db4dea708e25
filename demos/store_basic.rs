//! Basic store example with keyed subscriptions

use std::sync::{Arc, Mutex};

use ripplestore::{Store, Subscriber, UseOptions};
use serde_json::{json, Map, Value};

struct Component {
    name: &'static str,
    data: Mutex<Map<String, Value>>,
}

impl Subscriber for Component {
    fn set_data(&self, patch: Map<String, Value>) {
        println!("[{}] received patch: {:?}", self.name, patch);
        self.data.lock().unwrap().extend(patch);
    }
}

fn main() {
    println!("=== Basic Store Example ===\n");

    let store = Store::new(json!({
        "name": "userStore",
        "age": 18,
        "id": "001",
    }))
    .unwrap();

    let header = Arc::new(Component {
        name: "header",
        data: Mutex::new(Map::new()),
    });
    let profile = Arc::new(Component {
        name: "profile",
        data: Mutex::new(Map::new()),
    });

    // header cares about the name only; profile tracks everything
    store.use_data(&header, UseOptions::keys(["name"]));
    store.use_data(&profile, UseOptions::total());

    println!("\nWriting age (only profile is notified)...");
    store.state().set("age", json!(19));

    println!("\nWriting name (both are notified)...");
    store.state().set("name", json!("userStore1"));

    println!("\nUnsubscribing header, writing name again...");
    store.un_use_data(&header);
    store.state().set("name", json!("userStore2"));

    println!("\nFinal header data: {:?}", header.data.lock().unwrap());
    println!("Final profile data: {:?}", profile.data.lock().unwrap());
}
