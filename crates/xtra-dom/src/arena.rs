//! The node arena and tree operations.

use std::collections::BTreeMap;
use xtra_types::Value;

/// Handle to a node in the arena. Ids are stable for the document's
/// lifetime and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

/// Element payload: tag, ordered attributes, and a property side-table
/// (the analog of DOM element properties like `value` and `checked`).
#[derive(Debug, Clone, Default)]
pub struct ElementData {
    pub tag: String,
    pub(crate) attrs: Vec<(String, String)>,
    pub(crate) props: BTreeMap<String, Value>,
}

/// Node payload.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An arena-backed document with a single `body` root element.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Create an empty document (a bare `body` root).
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        doc.root = doc.create_element("body");
        doc
    }

    /// The root element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    // ── Node creation ─────────────────────────────────────────────

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            props: BTreeMap::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Comment(text.to_string()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    // ── Kind access ───────────────────────────────────────────────

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0 as usize].kind
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element(_))
    }

    /// The element's tag name, or `None` for text/comment nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element(el) => Some(&el.tag),
            _ => None,
        }
    }

    /// Text node contents.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Replace a text node's contents.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let NodeKind::Text(s) = &mut self.nodes[id.0 as usize].kind {
            *s = text.to_string();
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Text(s) => out.push_str(s),
            NodeKind::Comment(_) => {}
            NodeKind::Element(_) => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
        }
    }

    // ── Attributes ────────────────────────────────────────────────

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element(el) => el
                .attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element(el) = &mut self.nodes[id.0 as usize].kind {
            match el.attrs.iter_mut().find(|(n, _)| n == name) {
                Some((_, v)) => *v = value.to_string(),
                None => el.attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let NodeKind::Element(el) = &mut self.nodes[id.0 as usize].kind {
            el.attrs.retain(|(n, _)| n != name);
        }
    }

    /// Snapshot of the element's attributes in document order.
    pub fn attrs(&self, id: NodeId) -> Vec<(String, String)> {
        match self.kind(id) {
            NodeKind::Element(el) => el.attrs.clone(),
            _ => Vec::new(),
        }
    }

    // ── Properties (DOM-property side-table) ──────────────────────

    pub fn prop(&self, id: NodeId, name: &str) -> Option<&Value> {
        match self.kind(id) {
            NodeKind::Element(el) => el.props.get(name),
            _ => None,
        }
    }

    pub fn set_prop(&mut self, id: NodeId, name: &str, value: Value) {
        if let NodeKind::Element(el) = &mut self.nodes[id.0 as usize].kind {
            el.props.insert(name.to_string(), value);
        }
    }

    /// `true` if the element carries a boolean-typed property named `name`.
    /// Form controls expose the standard boolean properties even before a
    /// directive first touches them.
    pub fn has_bool_prop(&self, id: NodeId, name: &str) -> bool {
        match self.prop(id, name) {
            Some(Value::Bool(_)) => true,
            Some(_) => false,
            None => {
                matches!(name, "disabled" | "checked" | "hidden" | "readonly" | "required")
                    && self.is_element(id)
            }
        }
    }

    // ── Tree structure ────────────────────────────────────────────

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0 as usize].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0 as usize].children
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0 as usize].parent = Some(parent);
        self.nodes[parent.0 as usize].children.push(child);
    }

    /// Insert `new` under `parent` immediately before `reference`.
    /// Falls back to append when `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, new: NodeId, reference: NodeId) {
        self.detach(new);
        self.nodes[new.0 as usize].parent = Some(parent);
        let children = &mut self.nodes[parent.0 as usize].children;
        match children.iter().position(|&c| c == reference) {
            Some(pos) => children.insert(pos, new),
            None => children.push(new),
        }
    }

    /// Insert `new` under `reference`'s parent immediately after it.
    pub fn insert_after(&mut self, new: NodeId, reference: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.detach(new);
        self.nodes[new.0 as usize].parent = Some(parent);
        let children = &mut self.nodes[parent.0 as usize].children;
        match children.iter().position(|&c| c == reference) {
            Some(pos) => children.insert(pos + 1, new),
            None => children.push(new),
        }
    }

    /// Detach a node from its parent. The subtree stays intact and
    /// addressable; it is simply no longer reachable from the root.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0 as usize].parent.take() {
            self.nodes[parent.0 as usize].children.retain(|&c| c != id);
        }
    }

    /// Remove all children of a node (detaching each subtree).
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0 as usize].children);
        for child in children {
            self.nodes[child.0 as usize].parent = None;
        }
    }

    /// `true` while the node is reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut cur = id;
        loop {
            if cur == self.root {
                return true;
            }
            match self.parent(cur) {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    /// Depth-first pre-order walk of the subtree rooted at `id`
    /// (including `id` itself).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            for &child in self.children(node).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Element descendants only, pre-order, including `id` when it is one.
    pub fn element_descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.is_element(n))
            .collect()
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings[pos + 1..]
            .iter()
            .copied()
            .find(|&s| self.is_element(s))
    }

    /// Nearest ancestor (or self) with the given tag.
    pub fn closest(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        let mut cur = Some(id);
        while let Some(node) = cur {
            if self.tag(node) == Some(tag) {
                return Some(node);
            }
            cur = self.parent(node);
        }
        None
    }

    /// Deep-clone a subtree into fresh nodes. The clone is detached.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let kind = self.nodes[id.0 as usize].kind.clone();
        let clone = self.push(kind);
        let children: Vec<NodeId> = self.children(id).to_vec();
        for child in children {
            let child_clone = self.clone_subtree(child);
            self.append_child(clone, child_clone);
        }
        clone
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
