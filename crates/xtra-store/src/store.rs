//! The raw value tree with change-gated mutation.
//!
//! Every composite value lives exactly once in the single owned tree, so
//! repeated reads of the same location observe the same node — the
//! identity-stability the original wrapper cache existed to provide.

use log::warn;
use xtra_types::{Path, Seg, Value};

/// The outcome of a mutation: which top-level key changed, if any.
/// Writes of an equal value and deletes of missing entries report `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Changed(String),
    Unchanged,
}

impl Change {
    pub fn key(&self) -> Option<&str> {
        match self {
            Change::Changed(k) => Some(k),
            Change::Unchanged => None,
        }
    }
}

/// The observable store's backing tree.
#[derive(Debug, Default)]
pub struct Store {
    root: Value,
}

impl Store {
    pub fn new(root: Value) -> Self {
        let root = if root.is_composite() {
            root
        } else {
            Value::empty_map()
        };
        Self { root }
    }

    /// The whole raw tree (for serialization).
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Raw read. Short-circuits to `None` when an intermediate value is
    /// missing or not traversable.
    pub fn get(&self, path: &Path) -> Option<&Value> {
        self.root.traverse(path)
    }

    /// Write a value at `path`, creating intermediate maps for missing
    /// key segments. Equality-gated: writing the current value reports
    /// [`Change::Unchanged`] and has no side effects.
    pub fn set(&mut self, path: &Path, value: Value) -> Change {
        if self.get(path) == Some(&value) {
            return Change::Unchanged;
        }

        let top = path.top_key().to_string();
        let mut cur = &mut self.root;
        let (last, parents) = match path.segs().split_last() {
            Some(split) => split,
            None => return Change::Unchanged,
        };

        for seg in parents {
            match seg {
                Seg::Key(key) => {
                    let Value::Map(map) = cur else {
                        warn!("store: cannot write through non-map at '{seg}' in '{path}'");
                        return Change::Unchanged;
                    };
                    cur = map
                        .entry(key.clone())
                        .or_insert_with(Value::empty_map);
                }
                Seg::Index(idx) => {
                    let Value::List(list) = cur else {
                        warn!("store: cannot index non-list at '{seg}' in '{path}'");
                        return Change::Unchanged;
                    };
                    match list.get_mut(*idx) {
                        Some(item) => cur = item,
                        None => {
                            warn!("store: index {idx} out of range in '{path}'");
                            return Change::Unchanged;
                        }
                    }
                }
            }
        }

        match (cur, last) {
            (Value::Map(map), Seg::Key(key)) => {
                map.insert(key.clone(), value);
            }
            (Value::List(list), Seg::Index(idx)) => {
                if *idx < list.len() {
                    list[*idx] = value;
                } else if *idx == list.len() {
                    list.push(value);
                } else {
                    warn!("store: index {idx} out of range in '{path}'");
                    return Change::Unchanged;
                }
            }
            (other, seg) => {
                warn!(
                    "store: cannot write '{seg}' into {} at '{path}'",
                    other.type_name()
                );
                return Change::Unchanged;
            }
        }

        Change::Changed(top)
    }

    /// Delete the entry at `path`. Deleting a missing entry is a no-op;
    /// deleting an existing one propagates like a write.
    pub fn delete(&mut self, path: &Path) -> Change {
        if self.get(path).is_none() {
            return Change::Unchanged;
        }
        let top = path.top_key().to_string();
        let (last, parents) = match path.segs().split_last() {
            Some(split) => split,
            None => return Change::Unchanged,
        };

        let mut cur = &mut self.root;
        for seg in parents {
            match cur.child_mut(seg) {
                Some(child) => cur = child,
                None => return Change::Unchanged,
            }
        }

        match (cur, last) {
            (Value::Map(map), Seg::Key(key)) => {
                map.remove(key.as_str());
            }
            (Value::List(list), Seg::Index(idx)) => {
                if *idx < list.len() {
                    list.remove(*idx);
                }
            }
            _ => return Change::Unchanged,
        }

        Change::Changed(top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtra_path::parse_path;

    fn path(s: &str) -> Path {
        parse_path(s).expect("valid path")
    }

    #[test]
    fn set_and_get() {
        let mut store = Store::new(Value::empty_map());
        assert_eq!(store.set(&path("count"), Value::Num(1.0)), Change::Changed("count".into()));
        assert_eq!(store.get(&path("count")), Some(&Value::Num(1.0)));
    }

    #[test]
    fn equal_write_is_unchanged() {
        let mut store = Store::new(Value::empty_map());
        store.set(&path("count"), Value::Num(1.0));
        assert_eq!(store.set(&path("count"), Value::Num(1.0)), Change::Unchanged);
    }

    #[test]
    fn nested_write_creates_maps() {
        let mut store = Store::new(Value::empty_map());
        assert_eq!(
            store.set(&path("user.name"), Value::Str("ada".into())),
            Change::Changed("user".into())
        );
        assert_eq!(
            store.get(&path("user.name")),
            Some(&Value::Str("ada".into()))
        );
    }

    #[test]
    fn list_append_at_len() {
        let mut store = Store::new(Value::empty_map());
        store.set(&path("items"), Value::List(vec![Value::Num(1.0)]));
        assert_eq!(
            store.set(&path("items[1]"), Value::Num(2.0)),
            Change::Changed("items".into())
        );
        assert_eq!(store.get(&path("items[2]")), None);
    }

    #[test]
    fn delete_missing_is_noop() {
        let mut store = Store::new(Value::empty_map());
        assert_eq!(store.delete(&path("ghost")), Change::Unchanged);
        store.set(&path("a"), Value::Num(1.0));
        assert_eq!(store.delete(&path("a")), Change::Changed("a".into()));
        assert_eq!(store.get(&path("a")), None);
    }
}
