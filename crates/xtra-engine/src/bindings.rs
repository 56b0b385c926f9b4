//! Template bindings: text nodes and attribute values carrying
//! `(( path ))` markers, kept textually in sync with the store.

use crate::engine::Engine;
use xtra_dom::{NodeId, NodeKind};
use xtra_path::{parse_template, Template, TemplateToken, MARKER_OPEN};

/// One live DOM location: a text node, or an (element, attribute) pair.
pub(crate) struct Binding {
    pub(crate) node: NodeId,
    /// `None` for a text node.
    pub(crate) attr: Option<String>,
    pub(crate) template: Template,
}

impl Engine {
    /// Scan a subtree for interpolation markers, registering and
    /// initially rendering a binding per live location. Subtrees owned
    /// by `x-if`/`x-else`/`x-for` are skipped; their content is
    /// templated separately when instantiated.
    pub(crate) fn scan_bindings(&mut self, root: NodeId) {
        match self.doc.kind(root) {
            NodeKind::Comment(_) => {}
            NodeKind::Text(text) => {
                if text.contains(MARKER_OPEN) && self.scanned.insert(root) {
                    let text = text.clone();
                    self.add_binding(root, None, &text);
                }
            }
            NodeKind::Element(_) => {
                if self.doc.has_attr(root, "x-if") || self.doc.has_attr(root, "x-else") {
                    return;
                }
                if self.scanned.insert(root) {
                    for (name, value) in self.doc.attrs(root) {
                        if name.starts_with("x-") {
                            continue;
                        }
                        if value.contains(MARKER_OPEN) {
                            self.add_binding(root, Some(name), &value);
                        }
                    }
                }
                if self.doc.has_attr(root, "x-for") {
                    return;
                }
                for child in self.doc.children(root).to_vec() {
                    self.scan_bindings(child);
                }
            }
        }
    }

    fn add_binding(&mut self, node: NodeId, attr: Option<String>, source: &str) {
        let template = parse_template(source);
        if !template.is_live() {
            return;
        }
        let idx = self.bindings.len();
        for key in &template.keys {
            self.bindings_by_key
                .entry(key.clone())
                .or_default()
                .push(idx);
        }
        self.bindings.push(Binding {
            node,
            attr,
            template,
        });
        self.render_binding(idx);
    }

    /// Re-render one binding. A binding whose node has left the document
    /// stays registered but is inert.
    pub(crate) fn render_binding(&mut self, idx: usize) {
        let binding = &self.bindings[idx];
        if !self.doc.is_attached(binding.node) {
            return;
        }
        let mut out = String::new();
        for token in &binding.template.tokens {
            match token {
                TemplateToken::Literal(text) => out.push_str(text),
                TemplateToken::Path(path) => out.push_str(&self.core.resolve(path).render()),
            }
        }
        match &binding.attr {
            None => self.doc.set_text(binding.node, &out),
            Some(name) => self.doc.set_attr(binding.node, name, &out),
        }
    }
}
