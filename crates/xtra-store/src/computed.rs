//! Computed entries: memoized derived values with precise dependency
//! tracking.
//!
//! Each entry remembers exactly the top-level keys its derivation read
//! last time. Recomputation detaches the old dependency set, re-runs the
//! derivation against a tracking [`Reader`], and records the new set —
//! so a derivation whose read pattern changes shape re-registers itself.

use crate::store::Store;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use xtra_types::{Path, Value};

/// A derivation failure, logged and absorbed (the entry caches null).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct DerivedError(pub String);

/// A derivation function. Reads through the [`Reader`] register the
/// entry's dependencies.
pub type DerivedFn = Box<dyn Fn(&mut Reader<'_>) -> Result<Value, DerivedError>>;

/// Dependency-tracking read handle passed to derivations.
pub struct Reader<'store> {
    store: &'store Store,
    reads: BTreeSet<String>,
}

impl Reader<'_> {
    /// Resolve a raw store path, recording its top-level key.
    pub fn get(&mut self, path: &Path) -> Value {
        self.reads.insert(path.top_key().to_string());
        self.store.get(path).cloned().unwrap_or(Value::Null)
    }
}

pub(crate) struct ComputedEntry {
    pub(crate) derive: DerivedFn,
    pub(crate) deps: BTreeSet<String>,
    pub(crate) value: Value,
    pub(crate) dirty: bool,
}

/// The computed cache: named entries plus the reverse index from store
/// keys to the entries that read them.
#[derive(Default)]
pub(crate) struct ComputedCache {
    pub(crate) entries: BTreeMap<String, ComputedEntry>,
    pub(crate) by_key: BTreeMap<String, BTreeSet<String>>,
}

impl ComputedCache {
    pub(crate) fn declare(&mut self, name: &str, derive: DerivedFn) {
        self.entries.insert(
            name.to_string(),
            ComputedEntry {
                derive,
                deps: BTreeSet::new(),
                value: Value::Null,
                dirty: true,
            },
        );
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Entries that read `key` during their last evaluation.
    pub(crate) fn dependents_of(&self, key: &str) -> Vec<String> {
        self.by_key
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Recompute one entry against the store, re-registering its
    /// dependency set. Errors are logged; the entry is marked clean with
    /// a null value and will not retry until re-dirtied.
    pub(crate) fn recompute(&mut self, name: &str, store: &Store) {
        let Some(entry) = self.entries.get_mut(name) else {
            return;
        };

        // Detach from every key the previous evaluation read.
        for key in std::mem::take(&mut entry.deps) {
            if let Some(set) = self.by_key.get_mut(&key) {
                set.remove(name);
                if set.is_empty() {
                    self.by_key.remove(&key);
                }
            }
        }

        let mut reader = Reader {
            store,
            reads: BTreeSet::new(),
        };
        let value = match (entry.derive)(&mut reader) {
            Ok(value) => value,
            Err(err) => {
                log::error!("computed '{name}': {err}");
                Value::Null
            }
        };

        entry.deps = reader.reads;
        entry.value = value;
        entry.dirty = false;

        for key in entry.deps.clone() {
            self.by_key.entry(key).or_default().insert(name.to_string());
        }
    }

    pub(crate) fn mark_dirty(&mut self, name: &str) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.dirty = true;
        }
    }
}
