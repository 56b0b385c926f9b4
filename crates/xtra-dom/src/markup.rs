//! Markup parsing and serialization.
//!
//! A small forgiving fragment parser: elements, text, comments, quoted and
//! bare attribute values, self-closing and void tags. Unknown constructs
//! degrade to text; stray close tags are dropped. The serializer is the
//! exact inverse for well-formed trees.

use crate::arena::{Document, NodeId, NodeKind};

/// Tags that never carry children and serialize without a close tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Where to place parsed markup relative to a target element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    BeforeBegin,
    AfterBegin,
    BeforeEnd,
    AfterEnd,
}

impl Document {
    // ── Parsing ───────────────────────────────────────────────────

    /// Parse a markup fragment into detached nodes, returning the roots.
    pub fn parse_fragment(&mut self, markup: &str) -> Vec<NodeId> {
        let mut parser = FragmentParser {
            doc: self,
            src: markup.as_bytes(),
            raw: markup,
            pos: 0,
        };
        parser.parse()
    }

    /// Replace a node's children with parsed markup. Returns the new
    /// child roots.
    pub fn set_inner_html(&mut self, id: NodeId, markup: &str) -> Vec<NodeId> {
        self.clear_children(id);
        let roots = self.parse_fragment(markup);
        for &root in &roots {
            self.append_child(id, root);
        }
        roots
    }

    /// Insert parsed markup relative to `target`. Returns the new roots.
    pub fn insert_adjacent(
        &mut self,
        target: NodeId,
        position: InsertPosition,
        markup: &str,
    ) -> Vec<NodeId> {
        let roots = self.parse_fragment(markup);
        match position {
            InsertPosition::BeforeBegin => {
                if let Some(parent) = self.parent(target) {
                    for &root in &roots {
                        self.insert_before(parent, root, target);
                    }
                }
            }
            InsertPosition::AfterBegin => {
                // Prepend in order: insert each root before the current
                // first child.
                for &root in roots.iter().rev() {
                    match self.children(target).first().copied() {
                        Some(first) => self.insert_before(target, root, first),
                        None => self.append_child(target, root),
                    }
                }
            }
            InsertPosition::BeforeEnd => {
                for &root in &roots {
                    self.append_child(target, root);
                }
            }
            InsertPosition::AfterEnd => {
                let mut anchor = target;
                for &root in &roots {
                    self.insert_after(root, anchor);
                    anchor = root;
                }
            }
        }
        roots
    }

    // ── Serialization ─────────────────────────────────────────────

    /// Serialize a node's children.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, &mut out);
        }
        out
    }

    /// Serialize a node including itself.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in self.attrs(id) {
                    out.push(' ');
                    out.push_str(&name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape_attr(&value));
                        out.push('"');
                    }
                }
                out.push('>');
                if VOID_TAGS.contains(&self.tag(id).unwrap_or_default()) {
                    return;
                }
                for &child in self.children(id) {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Fragment parser
// ─────────────────────────────────────────────────────────────────────

struct FragmentParser<'doc, 'src> {
    doc: &'doc mut Document,
    src: &'src [u8],
    raw: &'src str,
    pos: usize,
}

impl FragmentParser<'_, '_> {
    fn parse(&mut self) -> Vec<NodeId> {
        let mut roots: Vec<NodeId> = Vec::new();
        // Open-element stack: (node, tag).
        let mut stack: Vec<(NodeId, String)> = Vec::new();

        while self.pos < self.src.len() {
            if self.src[self.pos] == b'<' {
                if self.starts_with("<!--") {
                    let comment = self.read_comment();
                    self.emit(comment, &mut stack, &mut roots);
                } else if self.starts_with("</") {
                    self.read_close_tag(&mut stack);
                } else if self
                    .src
                    .get(self.pos + 1)
                    .is_some_and(|b| b.is_ascii_alphabetic())
                {
                    self.read_open_tag(&mut stack, &mut roots);
                } else {
                    // Literal '<' — treat as text.
                    let text = self.doc.create_text("<");
                    self.emit(text, &mut stack, &mut roots);
                    self.pos += 1;
                }
            } else {
                let text = self.read_text();
                self.emit(text, &mut stack, &mut roots);
            }
        }

        roots
    }

    fn emit(&mut self, node: NodeId, stack: &mut Vec<(NodeId, String)>, roots: &mut Vec<NodeId>) {
        match stack.last() {
            Some(&(parent, _)) => self.doc.append_child(parent, node),
            None => roots.push(node),
        }
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.src[self.pos..].starts_with(prefix.as_bytes())
    }

    fn read_text(&mut self) -> NodeId {
        let start = self.pos;
        while self.pos < self.src.len() && self.src[self.pos] != b'<' {
            self.pos += 1;
        }
        let text = unescape(&self.raw[start..self.pos]);
        self.doc.create_text(&text)
    }

    fn read_comment(&mut self) -> NodeId {
        self.pos += 4; // "<!--"
        let start = self.pos;
        let end = find_sub(self.src, b"-->", self.pos).unwrap_or(self.src.len());
        self.pos = (end + 3).min(self.src.len());
        self.doc.create_comment(&self.raw[start..end])
    }

    fn read_close_tag(&mut self, stack: &mut Vec<(NodeId, String)>) {
        self.pos += 2; // "</"
        let name = self.read_tag_name();
        while self.pos < self.src.len() && self.src[self.pos] != b'>' {
            self.pos += 1;
        }
        if self.pos < self.src.len() {
            self.pos += 1; // '>'
        }
        // Pop to the matching open tag; a stray close tag is dropped.
        if let Some(at) = stack.iter().rposition(|(_, tag)| *tag == name) {
            stack.truncate(at);
        }
    }

    fn read_open_tag(&mut self, stack: &mut Vec<(NodeId, String)>, roots: &mut Vec<NodeId>) {
        self.pos += 1; // '<'
        let name = self.read_tag_name();
        let el = self.doc.create_element(&name);

        // Attributes.
        let mut self_closing = false;
        loop {
            self.skip_ws();
            match self.src.get(self.pos) {
                None => break,
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') => {
                    self.pos += 1;
                    if self.src.get(self.pos) == Some(&b'>') {
                        self.pos += 1;
                        self_closing = true;
                        break;
                    }
                }
                Some(_) => {
                    let attr_name = self.read_attr_name();
                    if attr_name.is_empty() {
                        self.pos += 1;
                        continue;
                    }
                    self.skip_ws();
                    let value = if self.src.get(self.pos) == Some(&b'=') {
                        self.pos += 1;
                        self.skip_ws();
                        self.read_attr_value()
                    } else {
                        String::new()
                    };
                    self.doc.set_attr(el, &attr_name, &value);
                }
            }
        }

        match stack.last() {
            Some(&(parent, _)) => self.doc.append_child(parent, el),
            None => roots.push(el),
        }

        if !self_closing && !VOID_TAGS.contains(&name.as_str()) {
            stack.push((el, name));
        }
    }

    fn read_tag_name(&mut self) -> String {
        let start = self.pos;
        while self
            .src
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'-')
        {
            self.pos += 1;
        }
        self.raw[start..self.pos].to_ascii_lowercase()
    }

    fn read_attr_name(&mut self) -> String {
        let start = self.pos;
        while self
            .src
            .get(self.pos)
            .is_some_and(|b| !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/'))
        {
            self.pos += 1;
        }
        self.raw[start..self.pos].to_ascii_lowercase()
    }

    fn read_attr_value(&mut self) -> String {
        match self.src.get(self.pos) {
            Some(&quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let start = self.pos;
                while self.pos < self.src.len() && self.src[self.pos] != quote {
                    self.pos += 1;
                }
                let value = unescape(&self.raw[start..self.pos]);
                if self.pos < self.src.len() {
                    self.pos += 1; // closing quote
                }
                value
            }
            _ => {
                let start = self.pos;
                while self
                    .src
                    .get(self.pos)
                    .is_some_and(|b| !b.is_ascii_whitespace() && *b != b'>')
                {
                    self.pos += 1;
                }
                unescape(&self.raw[start..self.pos])
            }
        }
    }

    fn skip_ws(&mut self) {
        while self.src.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
            self.pos += 1;
        }
    }
}

fn find_sub(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

// ─────────────────────────────────────────────────────────────────────
// Entities
// ─────────────────────────────────────────────────────────────────────

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
