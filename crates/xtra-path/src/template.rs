//! Template marker scanning: `Hello (( user.name ))!`.
//!
//! Markers are a paired double-paren token wrapping a single path
//! expression. Markers do not nest. A marker whose contents fail to parse
//! as a path is preserved verbatim as literal text — graceful degradation,
//! not an error.

use crate::parse_path;
use std::collections::BTreeSet;
use xtra_types::Path;

/// Cheap pre-filter: text without this substring carries no markers.
pub const MARKER_OPEN: &str = "((";

/// One token of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateToken {
    /// Verbatim text (includes unparsable markers).
    Literal(String),
    /// A resolved-at-render-time path marker.
    Path(Path),
}

/// A parsed template: tokens plus the set of top-level keys it depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub tokens: Vec<TemplateToken>,
    pub keys: BTreeSet<String>,
}

impl Template {
    /// `true` if at least one marker parsed to a path (templates with no
    /// keys never need a live binding).
    pub fn is_live(&self) -> bool {
        !self.keys.is_empty()
    }
}

/// Scan `input` for `(( path ))` markers.
pub fn parse_template(input: &str) -> Template {
    let mut tokens = Vec::new();
    let mut keys = BTreeSet::new();
    let bytes = input.as_bytes();
    let mut literal_start = 0;
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] != b'(' || bytes[i + 1] != b'(' {
            i += 1;
            continue;
        }
        // Candidate marker: contents run until `))` and may not contain
        // parens (non-nesting).
        match scan_marker(bytes, i) {
            Some(end) => {
                let inner = input[i + 2..end].trim();
                match parse_path(inner) {
                    Some(path) => {
                        if literal_start < i {
                            tokens.push(TemplateToken::Literal(
                                input[literal_start..i].to_string(),
                            ));
                        }
                        keys.insert(path.top_key().to_string());
                        tokens.push(TemplateToken::Path(path));
                    }
                    None => {
                        // Keep the raw marker as literal text.
                        if literal_start < i {
                            tokens.push(TemplateToken::Literal(
                                input[literal_start..i].to_string(),
                            ));
                        }
                        tokens.push(TemplateToken::Literal(input[i..end + 2].to_string()));
                    }
                }
                literal_start = end + 2;
                i = end + 2;
            }
            None => {
                i += 1;
            }
        }
    }

    if literal_start < input.len() {
        tokens.push(TemplateToken::Literal(input[literal_start..].to_string()));
    }

    Template { tokens, keys }
}

/// From an opening `((` at `open`, find the offset of the closing `))`.
/// Returns `None` if a paren interrupts the contents or the marker is
/// unterminated.
fn scan_marker(bytes: &[u8], open: usize) -> Option<usize> {
    let mut j = open + 2;
    while j + 1 < bytes.len() {
        match bytes[j] {
            b')' => {
                return if bytes[j + 1] == b')' && j > open + 2 {
                    Some(j)
                } else {
                    None
                };
            }
            b'(' => return None,
            _ => j += 1,
        }
    }
    None
}
