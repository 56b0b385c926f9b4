//! Persistence bridge: a key-value storage contract plus the debounce
//! flag that coalesces writes within one scheduling cycle.

use std::collections::BTreeMap;
use xtra_types::Value;

/// The storage key the whole tree serializes under.
pub const STORAGE_KEY: &str = "xtra_store";

/// Page-session key-value storage contract.
pub trait Storage {
    fn load(&mut self, key: &str) -> Option<String>;
    fn store(&mut self, key: &str, value: &str);
}

/// In-memory storage for tests and hosts without a real backend.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Peek at a stored entry without going through the trait.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl Storage for MemoryStorage {
    fn load(&mut self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn store(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }
}

/// Parse a persisted tree, defaulting to an empty map on absence, parse
/// failure, or a non-map payload.
pub fn load_tree(storage: &mut dyn Storage) -> Value {
    let Some(raw) = storage.load(STORAGE_KEY) else {
        return Value::empty_map();
    };
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(json) => {
            let value = Value::from_json(&json);
            if value.is_composite() {
                value
            } else {
                Value::empty_map()
            }
        }
        Err(err) => {
            log::error!("persistence: failed to parse stored state: {err}");
            Value::empty_map()
        }
    }
}

/// Serialize the tree into storage.
pub fn save_tree(storage: &mut dyn Storage, root: &Value) {
    storage.store(STORAGE_KEY, &root.to_json().to_string());
}
