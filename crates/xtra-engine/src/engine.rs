//! The engine: public API and change propagation.
//!
//! [`Engine`] owns the document, the reactive core, every registry the
//! directive subsystems keep, and the timer queue. All mutation funnels
//! through it, so propagation is synchronous and deterministic: a store
//! write re-renders dependent bindings, fires watchers, re-renders
//! directive blocks, then cascades through invalidated computed entries.

use crate::bindings::Binding;
use crate::directives::Block;
use crate::http::{
    AlwaysConfirm, Fetcher, HttpBinding, HttpRequest, NoFetcher, Prompter, SwapMode,
};
use crate::scheduler::{Scheduler, Task};
use log::{error, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;
use xtra_dom::{Document, NodeId};
use xtra_path::parse_path;
use xtra_store::{DerivedError, MemoryStorage, Reader, ReactiveCore, Storage};
use xtra_types::script::Script;
use xtra_types::{Path, Value};

/// Computed cascades recurse with no cycle detection; this guard turns a
/// dependency cycle into a logged diagnostic instead of a stack overflow.
const MAX_CASCADE_DEPTH: u32 = 64;

pub struct Engine {
    pub(crate) doc: Document,
    pub(crate) core: ReactiveCore,
    pub(crate) fetcher: Box<dyn Fetcher>,
    pub(crate) prompter: Box<dyn Prompter>,
    pub(crate) scheduler: Scheduler,

    pub(crate) bindings: Vec<Binding>,
    pub(crate) bindings_by_key: BTreeMap<String, Vec<usize>>,
    pub(crate) blocks: Vec<Block>,
    pub(crate) blocks_by_key: BTreeMap<String, Vec<usize>>,

    pub(crate) listeners: HashMap<(NodeId, String), Rc<Script>>,
    pub(crate) scripts: HashMap<String, Option<Rc<Script>>>,
    pub(crate) json_cache: HashMap<String, Option<BTreeMap<String, Value>>>,

    pub(crate) http: Vec<HttpBinding>,
    pub(crate) http_listeners: HashMap<(NodeId, String), Vec<usize>>,

    pub(crate) processed: HashSet<NodeId>,
    pub(crate) scanned: HashSet<NodeId>,
    pub(crate) ran: HashSet<NodeId>,
    pub(crate) http_bound: HashSet<NodeId>,
}

impl Engine {
    /// An engine with in-memory storage, no network, and auto-accepted
    /// confirmation prompts.
    pub fn new() -> Self {
        Self::with_parts(
            Box::new(MemoryStorage::new()),
            Box::new(NoFetcher),
            Box::new(AlwaysConfirm),
        )
    }

    /// An engine wired to host-provided collaborators. The store boots
    /// from `storage` immediately.
    pub fn with_parts(
        storage: Box<dyn Storage>,
        fetcher: Box<dyn Fetcher>,
        prompter: Box<dyn Prompter>,
    ) -> Self {
        Self {
            doc: Document::new(),
            core: ReactiveCore::new(storage),
            fetcher,
            prompter,
            scheduler: Scheduler::default(),
            bindings: Vec::new(),
            bindings_by_key: BTreeMap::new(),
            blocks: Vec::new(),
            blocks_by_key: BTreeMap::new(),
            listeners: HashMap::new(),
            scripts: HashMap::new(),
            json_cache: HashMap::new(),
            http: Vec::new(),
            http_listeners: HashMap::new(),
            processed: HashSet::new(),
            scanned: HashSet::new(),
            ran: HashSet::new(),
            http_bound: HashSet::new(),
        }
    }

    // ── Document access ───────────────────────────────────────────

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    /// Mutable document access for host-side markup injection; follow up
    /// with [`Engine::apply`] over the injected region.
    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Parse `markup` as the document body and run the full pipeline.
    pub fn boot(&mut self, markup: &str) {
        let root = self.doc.root();
        self.doc.set_inner_html(root, markup);
        self.apply(root);
    }

    /// The full pipeline over one subtree: binding scan, directive
    /// discovery, HTTP binding. Idempotent per node; newly inserted
    /// content from directive re-renders and swaps repeats it scoped to
    /// just the inserted nodes.
    pub fn apply(&mut self, root: NodeId) {
        self.scan_bindings(root);
        self.process_directives(root);
        self.bind_http_subtree(root);
    }

    // ── Store access ──────────────────────────────────────────────

    /// Write through a path expression. Invalid expressions are logged
    /// and dropped.
    pub fn set(&mut self, expr: &str, value: Value) {
        let Some(path) = parse_path(expr) else {
            warn!("store: invalid path '{expr}'");
            return;
        };
        self.set_path(&path, value);
    }

    /// Resolve a path expression; invalid or missing resolve to null.
    pub fn get(&mut self, expr: &str) -> Value {
        let Some(path) = parse_path(expr) else {
            warn!("store: invalid path '{expr}'");
            return Value::Null;
        };
        self.core.resolve(&path)
    }

    pub fn delete(&mut self, expr: &str) {
        let Some(path) = parse_path(expr) else {
            warn!("store: invalid path '{expr}'");
            return;
        };
        self.delete_path(&path);
    }

    pub(crate) fn set_path(&mut self, path: &Path, value: Value) {
        if let Some(key) = self.core.set(path, value) {
            self.after_mutation(&key);
        }
    }

    pub(crate) fn delete_path(&mut self, path: &Path) {
        if let Some(key) = self.core.delete(path) {
            self.after_mutation(&key);
        }
    }

    fn after_mutation(&mut self, key: &str) {
        if self.core.request_save() {
            self.scheduler.schedule(0, Task::Save);
        }
        self.handle_change(key, 0);
    }

    // ── Reactive surface ──────────────────────────────────────────

    /// Declare a named derived value. Store reads through the tracking
    /// reader become the entry's dependencies.
    pub fn computed<F>(&mut self, name: &str, derive: F)
    where
        F: Fn(&mut Reader<'_>) -> Result<Value, DerivedError> + 'static,
    {
        self.core.declare_computed(name, Box::new(derive));
        // Refresh anything already rendered against this name.
        self.handle_change(name, 0);
    }

    /// Register a watcher; the callback gets `(new, old)` and fires when
    /// the resolved value changes (always on its first observation).
    pub fn watch<F>(&mut self, expr: &str, callback: F)
    where
        F: FnMut(&Value, &Value) + 'static,
    {
        let Some(path) = parse_path(expr) else {
            warn!("store: invalid watch path '{expr}'");
            return;
        };
        self.core.watch(path, Box::new(callback));
    }

    // ── Events ────────────────────────────────────────────────────

    /// Deliver a DOM event. The event bubbles from `node` to the root,
    /// running handler scripts and HTTP triggers bound along the way.
    /// The payload map backs `event.<field>` references in handlers.
    pub fn dispatch(&mut self, node: NodeId, event: &str, payload: Value) {
        let mut cur = Some(node);
        while let Some(n) = cur {
            let key = (n, event.to_string());
            if let Some(script) = self.listeners.get(&key).cloned() {
                self.run_script(&script, n, &payload);
            }
            if let Some(triggers) = self.http_listeners.get(&key).cloned() {
                for idx in triggers {
                    self.http_event_triggered(idx);
                }
            }
            cur = self.doc.parent(n);
        }
    }

    // ── Clock ─────────────────────────────────────────────────────

    /// Advance the clock and run everything that came due: debounced and
    /// delayed requests, polls, and the coalesced persistence flush.
    pub fn advance(&mut self, ms: u64) {
        self.scheduler.advance_clock(ms);
        while let Some(task) = self.scheduler.pop_due() {
            match task {
                Task::Save => self.core.flush_save(),
                Task::HttpFire(idx) => self.send_request(idx),
                Task::HttpPoll(idx) => self.http_poll_fired(idx),
            }
        }
    }

    /// Run tasks due now without advancing time (one scheduling cycle).
    pub fn tick(&mut self) {
        self.advance(0);
    }

    // ── Removal ───────────────────────────────────────────────────

    /// Release and detach a subtree the host removed. The engine's own
    /// removals (if/for re-renders, outer swaps) release automatically;
    /// this is the entry point for externally driven removal.
    pub fn detach(&mut self, root: NodeId) {
        self.release_subtree(root);
        self.doc.detach(root);
    }

    /// Cancel timers owned by HTTP bindings inside a subtree that is
    /// leaving the document. Bindings, blocks, and listeners stay
    /// registered but inert.
    pub(crate) fn release_subtree(&mut self, root: NodeId) {
        let nodes: HashSet<NodeId> = self.doc.descendants(root).into_iter().collect();
        let mut stale = Vec::new();
        for binding in &mut self.http {
            if binding.released || !nodes.contains(&binding.config.el) {
                continue;
            }
            binding.released = true;
            if let Some(timer) = binding.debounce_timer.take() {
                stale.push(timer);
            }
            if let Some(timer) = binding.poll_timer.take() {
                stale.push(timer);
            }
        }
        for timer in stale {
            self.scheduler.cancel(timer);
        }
    }

    /// Explicit fetch-and-swap against a known target.
    pub fn load(&mut self, url: &str, target: NodeId, swap: SwapMode) {
        let request = HttpRequest {
            method: "GET".to_string(),
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
        };
        let result = self.fetcher.fetch(&request);
        self.handle_http_result(&request, result, target, target, swap);
    }

    // ── Propagation ───────────────────────────────────────────────

    /// The change-propagation protocol for one top-level key: bindings,
    /// watchers, directive blocks (if, show, bind, for), then the
    /// computed cascade, recursing with each invalidated entry's name.
    pub(crate) fn handle_change(&mut self, key: &str, depth: u32) {
        if depth > MAX_CASCADE_DEPTH {
            error!("propagation: cascade depth limit at '{key}' (computed dependency cycle?)");
            return;
        }

        if let Some(indices) = self.bindings_by_key.get(key).cloned() {
            for idx in indices {
                self.render_binding(idx);
            }
        }

        self.core.run_watchers(key);

        if let Some(indices) = self.blocks_by_key.get(key).cloned() {
            for pass in 0..4u8 {
                for &idx in &indices {
                    if self.blocks[idx].order() == pass {
                        self.render_block(idx);
                    }
                }
            }
        }

        for name in self.core.invalidate_dependents(key) {
            self.handle_change(&name, depth + 1);
        }
    }

    // ── Diagnostics ───────────────────────────────────────────────

    /// Direct storage access (tests, host serialization checks).
    pub fn storage_mut(&mut self) -> &mut dyn Storage {
        self.core.storage_mut()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
