//! Simple selectors: `#id`, `.class`, `tag`, `[attr]`, `[attr=value]`.
//!
//! This is the subset the directive attributes actually use for targets,
//! indicators, and request-time value references.

use crate::arena::{Document, NodeId};
use crate::error::DomError;

/// A parsed simple selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Id(String),
    Class(String),
    Tag(String),
    /// `[name]` or `[name=value]`.
    Attr(String, Option<String>),
}

impl Selector {
    /// Parse a selector string.
    pub fn parse(input: &str) -> Result<Self, DomError> {
        let input = input.trim();
        let invalid = || DomError::InvalidSelector(input.to_string());

        if let Some(id) = input.strip_prefix('#') {
            if id.is_empty() || !is_name(id) {
                return Err(invalid());
            }
            return Ok(Selector::Id(id.to_string()));
        }
        if let Some(class) = input.strip_prefix('.') {
            if class.is_empty() || !is_name(class) {
                return Err(invalid());
            }
            return Ok(Selector::Class(class.to_string()));
        }
        if let Some(body) = input.strip_prefix('[') {
            let body = body.strip_suffix(']').ok_or_else(invalid)?;
            return match body.split_once('=') {
                None => {
                    if body.is_empty() || !is_name(body) {
                        return Err(invalid());
                    }
                    Ok(Selector::Attr(body.to_string(), None))
                }
                Some((name, value)) => {
                    if name.is_empty() || !is_name(name) {
                        return Err(invalid());
                    }
                    let value = value
                        .strip_prefix('"')
                        .and_then(|v| v.strip_suffix('"'))
                        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                        .unwrap_or(value);
                    Ok(Selector::Attr(name.to_string(), Some(value.to_string())))
                }
            };
        }
        if input.is_empty() || !is_name(input) {
            return Err(invalid());
        }
        Ok(Selector::Tag(input.to_ascii_lowercase()))
    }
}

fn is_name(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':')
}

impl Document {
    /// `true` if the element matches the selector.
    pub fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        if !self.is_element(id) {
            return false;
        }
        match selector {
            Selector::Id(want) => self.attr(id, "id") == Some(want.as_str()),
            Selector::Tag(want) => self.tag(id) == Some(want.as_str()),
            Selector::Class(want) => self
                .attr(id, "class")
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == want)),
            Selector::Attr(name, None) => self.has_attr(id, name),
            Selector::Attr(name, Some(want)) => self.attr(id, name) == Some(want.as_str()),
        }
    }

    /// First match in a pre-order walk of the whole document.
    pub fn select_first(&self, selector: &Selector) -> Option<NodeId> {
        self.select_first_in(self.root(), selector)
    }

    /// First match within a subtree (including the subtree root).
    pub fn select_first_in(&self, root: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|&n| self.matches(n, selector))
    }

    /// All matches within a subtree, document order.
    pub fn select_all_in(&self, root: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&n| self.matches(n, selector))
            .collect()
    }
}
