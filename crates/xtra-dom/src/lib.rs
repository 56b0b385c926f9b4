//! Headless in-memory document.
//!
//! The engine needs only a narrow DOM contract: node creation/removal,
//! attribute and property access, markup parsing/serialization, simple
//! selectors, and form-field collection. This crate owns that contract as
//! an arena-backed tree so the whole engine runs and tests without a
//! browser.
//!
//! Node ids are indices into the arena and are never reused; removing a
//! node detaches it (it stays addressable, matching how removed DOM nodes
//! remain alive while referenced).

mod arena;
mod error;
mod forms;
mod markup;
mod select;

pub use arena::{Document, ElementData, NodeId, NodeKind};
pub use error::DomError;
pub use markup::InsertPosition;
pub use select::Selector;
