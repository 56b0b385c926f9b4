//! [`ReactiveCore`] — the store, computed cache, watchers, and
//! persistence flag behind one handle.

use crate::computed::{ComputedCache, DerivedFn};
use crate::persist::{self, Storage};
use crate::store::{Change, Store};
use crate::watch::{WatchRegistry, Watcher};
use crate::WatchFn;
use xtra_types::{Path, Value};

/// The reactive core. The directive engine owns one and orchestrates
/// change propagation around it.
pub struct ReactiveCore {
    store: Store,
    computeds: ComputedCache,
    watchers: WatchRegistry,
    storage: Box<dyn Storage>,
    save_pending: bool,
}

impl ReactiveCore {
    /// Boot from storage: read the persisted tree under
    /// [`crate::STORAGE_KEY`], defaulting to an empty map.
    pub fn new(mut storage: Box<dyn Storage>) -> Self {
        let root = persist::load_tree(storage.as_mut());
        Self {
            store: Store::new(root),
            computeds: ComputedCache::default(),
            watchers: WatchRegistry::default(),
            storage,
            save_pending: false,
        }
    }

    /// The raw tree.
    pub fn root(&self) -> &Value {
        self.store.root()
    }

    /// Raw read without computed interception (tests, serialization).
    pub fn raw(&self, path: &Path) -> Option<&Value> {
        self.store.get(path)
    }

    // ── Resolution ────────────────────────────────────────────────

    /// Resolve a path against the store or the computed namespace.
    ///
    /// A first segment naming a computed entry recomputes it if dirty and
    /// continues traversal from its cached value. Missing locations
    /// resolve to [`Value::Null`].
    pub fn resolve(&mut self, path: &Path) -> Value {
        let first = path.top_key();
        if self.computeds.contains(first) {
            if self
                .computeds
                .entries
                .get(first)
                .is_some_and(|e| e.dirty)
            {
                self.computeds.recompute(first, &self.store);
            }
            let Some(entry) = self.computeds.entries.get(first) else {
                return Value::Null;
            };
            let mut cur = &entry.value;
            for seg in path.tail() {
                match cur.child(seg) {
                    Some(child) => cur = child,
                    None => return Value::Null,
                }
            }
            return cur.clone();
        }
        self.store.get(path).cloned().unwrap_or(Value::Null)
    }

    // ── Mutation ──────────────────────────────────────────────────

    /// Equality-gated write. Returns the changed top-level key, `None`
    /// when the write was a no-op.
    pub fn set(&mut self, path: &Path, value: Value) -> Option<String> {
        match self.store.set(path, value) {
            Change::Changed(key) => Some(key),
            Change::Unchanged => None,
        }
    }

    /// Delete an entry; an existing entry propagates like a write.
    pub fn delete(&mut self, path: &Path) -> Option<String> {
        match self.store.delete(path) {
            Change::Changed(key) => Some(key),
            Change::Unchanged => None,
        }
    }

    // ── Computed entries ──────────────────────────────────────────

    /// Declare a named derived value. Initially dirty with a null cache.
    pub fn declare_computed(&mut self, name: &str, derive: DerivedFn) {
        self.computeds.declare(name, derive);
    }

    pub fn has_computed(&self, name: &str) -> bool {
        self.computeds.contains(name)
    }

    /// The dependency set a computed entry recorded at its last
    /// evaluation (empty when unknown or never evaluated).
    pub fn computed_deps(&self, name: &str) -> Vec<String> {
        self.computeds
            .entries
            .get(name)
            .map(|e| e.deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Mark every computed entry that read `key` dirty, recompute each
    /// immediately, and return their names for cascade propagation.
    pub fn invalidate_dependents(&mut self, key: &str) -> Vec<String> {
        let names = self.computeds.dependents_of(key);
        for name in &names {
            self.computeds.mark_dirty(name);
            self.computeds.recompute(name, &self.store);
        }
        names
    }

    // ── Watchers ──────────────────────────────────────────────────

    /// Register a watcher on a path. Fires on changes to the path's
    /// top-level key when the resolved value differs from the last
    /// observation (always on the first observation).
    pub fn watch(&mut self, path: Path, callback: WatchFn) {
        self.watchers.add(path, callback);
    }

    /// Run the watchers registered under `key`.
    pub fn run_watchers(&mut self, key: &str) {
        let Some(mut list) = self.watchers.by_key.remove(key) else {
            return;
        };
        for watcher in &mut list {
            let new = self.resolve(&watcher.path);
            if watcher.inited && new == watcher.last {
                continue;
            }
            let old = std::mem::replace(&mut watcher.last, new.clone());
            watcher.inited = true;
            (watcher.callback)(&new, &old);
        }
        self.restore_watchers(key, list);
    }

    fn restore_watchers(&mut self, key: &str, mut list: Vec<Watcher>) {
        if let Some(added) = self.watchers.by_key.remove(key) {
            list.extend(added);
        }
        self.watchers.by_key.insert(key.to_string(), list);
    }

    // ── Persistence ───────────────────────────────────────────────

    /// Note that the tree needs saving. Returns `true` when this begins
    /// a new save cycle (the caller should schedule a flush); further
    /// requests coalesce until the flush.
    pub fn request_save(&mut self) -> bool {
        if self.save_pending {
            return false;
        }
        self.save_pending = true;
        true
    }

    /// Serialize the tree into storage if a save is pending.
    pub fn flush_save(&mut self) {
        if !self.save_pending {
            return;
        }
        self.save_pending = false;
        persist::save_tree(self.storage.as_mut(), self.store.root());
    }

    /// Read back through the storage contract (tests, diagnostics).
    pub fn storage_mut(&mut self) -> &mut dyn Storage {
        self.storage.as_mut()
    }
}
