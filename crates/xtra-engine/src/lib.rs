//! XTRA: a reactive state store driving a declarative DOM-directive
//! engine and an HTTP trigger subsystem, headless and host-driven.
//!
//! The [`Engine`] owns an in-memory document and a reactive value tree.
//! Markup annotated with `(( path ))` markers and `x-*` directives
//! becomes live: store mutations re-render exactly the dependent text,
//! attributes, and directive blocks, synchronously. Network, prompts,
//! storage, and the clock are host contracts, so everything runs
//! deterministically under test.
//!
//! ```
//! use xtra_engine::{Engine, Value};
//!
//! let mut engine = Engine::new();
//! engine.boot(r#"<p id="greet">Hello (( user.name ))!</p>"#);
//! engine.set("user.name", Value::from("Ada"));
//! ```

mod bindings;
mod directives;
mod engine;
mod handler;
mod http;
mod scheduler;

pub use engine::Engine;
pub use http::{
    AlwaysConfirm, Fetcher, HttpRequest, HttpResponse, NoFetcher, Prompter, SwapMode,
    TransportError,
};

pub use xtra_dom::{Document, NodeId, Selector};
pub use xtra_store::{DerivedError, MemoryStorage, Reader, Storage, STORAGE_KEY};
pub use xtra_types::{Path, Seg, Value};
