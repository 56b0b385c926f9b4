//! Restricted property paths.
//!
//! A path is an ordered sequence of key and index segments, e.g. the parse
//! of `items[0].qty`. The first segment is always a key — it names the
//! top-level store entry (or a computed value) and is the unit of
//! dependency-tracking granularity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One path segment: a map key or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seg {
    Key(String),
    Index(usize),
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Key(k) => write!(f, "{k}"),
            Seg::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// A parsed path. Invariant: non-empty, first segment is a [`Seg::Key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path {
    segs: Vec<Seg>,
}

impl Path {
    /// Build a path from segments. Returns `None` unless the invariant
    /// holds (non-empty, key-first).
    pub fn new(segs: Vec<Seg>) -> Option<Self> {
        match segs.first() {
            Some(Seg::Key(_)) => Some(Self { segs }),
            _ => None,
        }
    }

    /// Single-key path.
    pub fn key(name: impl Into<String>) -> Self {
        Self {
            segs: vec![Seg::Key(name.into())],
        }
    }

    /// The top-level key (first segment).
    pub fn top_key(&self) -> &str {
        match &self.segs[0] {
            Seg::Key(k) => k,
            Seg::Index(_) => unreachable!("path invariant: first segment is a key"),
        }
    }

    /// All segments in order.
    pub fn segs(&self) -> &[Seg] {
        &self.segs
    }

    /// Segments after the first (for traversal from a resolved root).
    pub fn tail(&self) -> &[Seg] {
        &self.segs[1..]
    }

    pub fn len(&self) -> usize {
        self.segs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segs.is_empty()
    }
}

impl fmt::Display for Path {
    /// Canonical text form: `a.b[0].c`. Parsing the rendered form yields
    /// the same segment sequence.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segs.iter().enumerate() {
            match seg {
                Seg::Key(k) if i == 0 => write!(f, "{k}")?,
                Seg::Key(k) => write!(f, ".{k}")?,
                Seg::Index(n) => write!(f, "[{n}]")?,
            }
        }
        Ok(())
    }
}
