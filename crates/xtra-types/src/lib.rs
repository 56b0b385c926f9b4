//! Shared types for the XTRA engine.
//!
//! This crate defines the dynamic value tree held by the store, the
//! restricted path type used by templates and directives, and the AST of
//! the sandboxed handler script language.

mod path;
mod value;
pub mod script;

pub use path::{Path, Seg};
pub use value::Value;
