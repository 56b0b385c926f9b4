//! Path watchers: change callbacks with first-call equality suppression.

use std::collections::BTreeMap;
use xtra_types::{Path, Value};

/// Watcher callback: `(new_value, old_value)`.
pub type WatchFn = Box<dyn FnMut(&Value, &Value)>;

pub(crate) struct Watcher {
    pub(crate) path: Path,
    pub(crate) callback: WatchFn,
    pub(crate) last: Value,
    /// Until the first run, the equality gate is suppressed so the
    /// watcher always observes its initial value.
    pub(crate) inited: bool,
}

/// Watchers indexed by the top-level key they observe.
#[derive(Default)]
pub(crate) struct WatchRegistry {
    pub(crate) by_key: BTreeMap<String, Vec<Watcher>>,
}

impl WatchRegistry {
    pub(crate) fn add(&mut self, path: Path, callback: WatchFn) {
        let top = path.top_key().to_string();
        self.by_key.entry(top).or_default().push(Watcher {
            path,
            callback,
            last: Value::Null,
            inited: false,
        });
    }
}
