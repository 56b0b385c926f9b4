//! The directive controller.
//!
//! Directive-annotated elements are discovered by a single depth-first
//! walk; each element is processed exactly once, so re-applying the
//! pipeline over a subtree is idempotent. Four block kinds own DOM
//! regions (`x-if`, `x-show`, `x-bind:*`, `x-for`); `x-on:*` attaches
//! compiled handler scripts and `x-run` executes one at mount.

use crate::engine::Engine;
use log::warn;
use std::collections::BTreeSet;
use std::rc::Rc;
use xtra_dom::NodeId;
use xtra_path::{local_tail, parse_for_expr, parse_path, parse_script, parse_template, Template, TemplateToken};
use xtra_types::script::Script;
use xtra_types::{Path, Value};

/// Which branch an `x-if` block currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Branch {
    None,
    Then,
    Else,
}

pub(crate) struct IfBlock {
    /// Comment node anchoring the insertion point.
    pub(crate) placeholder: NodeId,
    /// Detached template for the truthy branch (the original element).
    pub(crate) then_tpl: NodeId,
    pub(crate) else_tpl: Option<NodeId>,
    pub(crate) path: Path,
    pub(crate) current: Option<NodeId>,
    pub(crate) branch: Branch,
}

pub(crate) struct ShowBlock {
    pub(crate) el: NodeId,
    pub(crate) path: Path,
}

pub(crate) struct BindBlock {
    pub(crate) el: NodeId,
    pub(crate) attr: String,
    pub(crate) path: Path,
}

pub(crate) struct ForBlock {
    pub(crate) el: NodeId,
    pub(crate) var_name: String,
    pub(crate) path: Path,
    /// The element's original inner markup, tokenized once at setup.
    pub(crate) template: Template,
}

pub(crate) enum Block {
    If(IfBlock),
    Show(ShowBlock),
    Bind(BindBlock),
    For(ForBlock),
}

impl Block {
    /// Re-render order within one change: if, show, bind, for.
    pub(crate) fn order(&self) -> u8 {
        match self {
            Block::If(_) => 0,
            Block::Show(_) => 1,
            Block::Bind(_) => 2,
            Block::For(_) => 3,
        }
    }
}

impl Engine {
    // ── Discovery ─────────────────────────────────────────────────

    pub(crate) fn process_directives(&mut self, root: NodeId) {
        for el in self.doc.element_descendants(root) {
            if !self.doc.is_attached(el) || !self.processed.insert(el) {
                continue;
            }
            self.process_element(el);
        }
    }

    fn process_element(&mut self, el: NodeId) {
        // x-if consumes the whole element as a template.
        if let Some(expr) = self.doc.attr(el, "x-if").map(str::to_string) {
            self.setup_if(el, &expr);
            return;
        }
        if self.doc.has_attr(el, "x-else") {
            warn!("directives: x-else without a preceding x-if sibling");
            return;
        }
        if let Some(expr) = self.doc.attr(el, "x-show").map(str::to_string) {
            self.setup_show(el, &expr);
        }
        for (name, value) in self.doc.attrs(el) {
            if let Some(attr) = name.strip_prefix("x-bind:") {
                self.setup_bind(el, attr, &value);
            } else if let Some(event) = name.strip_prefix("x-on:") {
                self.setup_on(el, event, &value);
            }
        }
        if let Some(code) = self.doc.attr(el, "x-run").map(str::to_string) {
            self.run_once(el, &code);
        }
        if let Some(expr) = self.doc.attr(el, "x-for").map(str::to_string) {
            self.setup_for(el, &expr);
        }
    }

    // ── Setup per directive kind ──────────────────────────────────

    fn setup_if(&mut self, el: NodeId, expr: &str) {
        let Some(path) = parse_path(expr) else {
            warn!("directives: invalid x-if path '{expr}'");
            return;
        };
        let Some(parent) = self.doc.parent(el) else {
            return;
        };
        let else_tpl = self
            .doc
            .next_element_sibling(el)
            .filter(|&sibling| self.doc.has_attr(sibling, "x-else"));

        let placeholder = self.doc.create_comment("x-if");
        self.doc.insert_before(parent, placeholder, el);
        self.doc.detach(el);
        if let Some(else_el) = else_tpl {
            self.processed.insert(else_el);
            self.doc.detach(else_el);
        }

        let idx = self.blocks.len();
        self.register_block(path.top_key(), idx);
        self.blocks.push(Block::If(IfBlock {
            placeholder,
            then_tpl: el,
            else_tpl,
            path,
            current: None,
            branch: Branch::None,
        }));
        self.render_block(idx);
    }

    fn setup_show(&mut self, el: NodeId, expr: &str) {
        let Some(path) = parse_path(expr) else {
            warn!("directives: invalid x-show path '{expr}'");
            return;
        };
        let idx = self.blocks.len();
        self.register_block(path.top_key(), idx);
        self.blocks.push(Block::Show(ShowBlock { el, path }));
        self.render_block(idx);
    }

    fn setup_bind(&mut self, el: NodeId, attr: &str, expr: &str) {
        let Some(path) = parse_path(expr) else {
            warn!("directives: invalid x-bind:{attr} path '{expr}'");
            return;
        };
        let idx = self.blocks.len();
        self.register_block(path.top_key(), idx);
        self.blocks.push(Block::Bind(BindBlock {
            el,
            attr: attr.to_string(),
            path,
        }));
        self.render_block(idx);
    }

    fn setup_on(&mut self, el: NodeId, event: &str, code: &str) {
        if let Some(script) = self.compile_script(code) {
            self.listeners.insert((el, event.to_string()), script);
        }
    }

    /// `x-run`: the handler body runs once at mount, with no event in
    /// scope.
    fn run_once(&mut self, el: NodeId, code: &str) {
        if !self.ran.insert(el) {
            return;
        }
        if let Some(script) = self.compile_script(code) {
            self.run_script(&script, el, &Value::Null);
        }
    }

    fn setup_for(&mut self, el: NodeId, expr: &str) {
        let Some(for_expr) = parse_for_expr(expr) else {
            warn!("directives: invalid x-for expression '{expr}'");
            return;
        };
        let template = parse_template(&self.doc.inner_html(el));

        // Registration spans the collection key and every non-local key
        // the item template references.
        let mut keys: BTreeSet<String> = template
            .keys
            .iter()
            .filter(|key| *key != &for_expr.var_name)
            .cloned()
            .collect();
        keys.insert(for_expr.path.top_key().to_string());

        let idx = self.blocks.len();
        for key in &keys {
            self.register_block(key, idx);
        }
        self.blocks.push(Block::For(ForBlock {
            el,
            var_name: for_expr.var_name,
            path: for_expr.path,
            template,
        }));
        self.render_block(idx);
    }

    fn register_block(&mut self, key: &str, idx: usize) {
        self.blocks_by_key
            .entry(key.to_string())
            .or_default()
            .push(idx);
    }

    /// Compile a handler-script attribute body, cached by source text.
    /// Compile failures are logged once and cached as absent.
    pub(crate) fn compile_script(&mut self, src: &str) -> Option<Rc<Script>> {
        if let Some(cached) = self.scripts.get(src) {
            return cached.clone();
        }
        let compiled = match parse_script(src) {
            Ok(script) => Some(Rc::new(script)),
            Err(err) => {
                warn!("script: {err} in '{src}'");
                None
            }
        };
        self.scripts.insert(src.to_string(), compiled.clone());
        compiled
    }

    // ── Rendering ─────────────────────────────────────────────────

    pub(crate) fn render_block(&mut self, idx: usize) {
        enum Plan {
            If,
            Show { el: NodeId, path: Path },
            Bind { el: NodeId, attr: String, path: Path },
            For {
                el: NodeId,
                var_name: String,
                path: Path,
                template: Template,
            },
        }
        let plan = match &self.blocks[idx] {
            Block::If(_) => Plan::If,
            Block::Show(b) => Plan::Show {
                el: b.el,
                path: b.path.clone(),
            },
            Block::Bind(b) => Plan::Bind {
                el: b.el,
                attr: b.attr.clone(),
                path: b.path.clone(),
            },
            Block::For(b) => Plan::For {
                el: b.el,
                var_name: b.var_name.clone(),
                path: b.path.clone(),
                template: b.template.clone(),
            },
        };
        match plan {
            Plan::If => self.render_if(idx),
            Plan::Show { el, path } => self.render_show(el, &path),
            Plan::Bind { el, attr, path } => self.render_bind(el, &attr, &path),
            Plan::For {
                el,
                var_name,
                path,
                template,
            } => self.render_for(el, &var_name, &path, &template),
        }
    }

    fn render_if(&mut self, idx: usize) {
        let (placeholder, then_tpl, else_tpl, path, current, branch) = match &self.blocks[idx] {
            Block::If(b) => (
                b.placeholder,
                b.then_tpl,
                b.else_tpl,
                b.path.clone(),
                b.current,
                b.branch,
            ),
            _ => return,
        };
        if !self.doc.is_attached(placeholder) {
            return;
        }

        let truthy = self.core.resolve(&path).is_truthy();
        let desired = if truthy {
            Branch::Then
        } else if else_tpl.is_some() {
            Branch::Else
        } else {
            Branch::None
        };
        // Stable under repeated identical evaluations.
        if desired == branch {
            return;
        }

        if let Some(mounted) = current {
            self.release_subtree(mounted);
            self.doc.detach(mounted);
        }

        let template = match desired {
            Branch::Then => Some(then_tpl),
            Branch::Else => else_tpl,
            Branch::None => None,
        };
        let mounted = template.map(|tpl| {
            let clone = self.doc.clone_subtree(tpl);
            self.doc.remove_attr(clone, "x-if");
            self.doc.remove_attr(clone, "x-else");
            self.doc.insert_after(clone, placeholder);
            self.apply(clone);
            clone
        });

        if let Block::If(b) = &mut self.blocks[idx] {
            b.current = mounted;
            b.branch = desired;
        }
    }

    fn render_show(&mut self, el: NodeId, path: &Path) {
        if !self.doc.is_attached(el) {
            return;
        }
        if self.core.resolve(path).is_truthy() {
            self.doc.remove_attr(el, "hidden");
        } else {
            self.doc.set_attr(el, "hidden", "");
        }
    }

    fn render_bind(&mut self, el: NodeId, attr: &str, path: &Path) {
        if !self.doc.is_attached(el) {
            return;
        }
        match self.core.resolve(path) {
            Value::Null | Value::Bool(false) => {
                self.doc.remove_attr(el, attr);
                if self.doc.has_bool_prop(el, attr) {
                    self.doc.set_prop(el, attr, Value::Bool(false));
                }
            }
            Value::Bool(true) => {
                if self.doc.has_bool_prop(el, attr) {
                    self.doc.set_prop(el, attr, Value::Bool(true));
                }
                self.doc.set_attr(el, attr, "");
            }
            other => {
                self.doc.set_attr(el, attr, &other.render());
                self.doc.set_prop(el, attr, other);
            }
        }
    }

    /// Rebuild an iteration block: clear the element, substitute the item
    /// template per entry, insert, and re-run the pipeline over the new
    /// children.
    fn render_for(&mut self, el: NodeId, var_name: &str, path: &Path, template: &Template) {
        if !self.doc.is_attached(el) {
            return;
        }
        let items = match self.core.resolve(path) {
            Value::List(items) => items,
            _ => Vec::new(),
        };

        for child in self.doc.children(el).to_vec() {
            self.release_subtree(child);
        }

        let mut markup = String::new();
        for item in &items {
            for token in &template.tokens {
                match token {
                    TemplateToken::Literal(text) => markup.push_str(text),
                    TemplateToken::Path(marker) => {
                        let rendered = match local_tail(var_name, &marker.to_string()) {
                            Some(tail) => {
                                let mut cur = Some(item);
                                for seg in &tail {
                                    cur = cur.and_then(|value| value.child(seg));
                                }
                                cur.cloned().unwrap_or(Value::Null).render()
                            }
                            None => self.core.resolve(marker).render(),
                        };
                        markup.push_str(&rendered);
                    }
                }
            }
        }

        let roots = self.doc.set_inner_html(el, &markup);
        for root in roots {
            self.apply(root);
        }
    }
}
