//! Form-field helpers: nearest enclosing form, entry collection, and
//! request-time element value reads.

use crate::arena::{Document, NodeId};
use xtra_types::Value;

impl Document {
    /// Nearest enclosing `<form>` (or self).
    pub fn nearest_form(&self, id: NodeId) -> Option<NodeId> {
        self.closest(id, "form")
    }

    /// Collect `(name, value)` entries from a form's named controls in
    /// document order. Unchecked checkboxes/radios are skipped, matching
    /// form-data semantics.
    pub fn form_entries(&self, form: NodeId) -> Vec<(String, String)> {
        let mut entries = Vec::new();
        for node in self.descendants(form) {
            let Some(tag) = self.tag(node) else { continue };
            if !matches!(tag, "input" | "select" | "textarea") {
                continue;
            }
            let Some(name) = self.attr(node, "name") else {
                continue;
            };
            let input_type = self.attr(node, "type").unwrap_or("text");
            if matches!(input_type, "checkbox" | "radio") && tag == "input" {
                if !self.is_checked(node) {
                    continue;
                }
                let value = self.attr(node, "value").unwrap_or("on");
                entries.push((name.to_string(), value.to_string()));
                continue;
            }
            entries.push((name.to_string(), self.field_value(node)));
        }
        entries
    }

    /// The control's current string value: the `value` property when a
    /// script or bind directive has set one, else the markup attribute,
    /// else the selected option for `<select>`, else empty.
    pub fn field_value(&self, id: NodeId) -> String {
        if let Some(prop) = self.prop(id, "value") {
            return prop.render();
        }
        if let Some(attr) = self.attr(id, "value") {
            return attr.to_string();
        }
        if self.tag(id) == Some("select") {
            let options = self
                .descendants(id)
                .into_iter()
                .filter(|&n| self.tag(n) == Some("option"))
                .collect::<Vec<_>>();
            let chosen = options
                .iter()
                .copied()
                .find(|&n| self.has_attr(n, "selected"))
                .or_else(|| options.first().copied());
            if let Some(option) = chosen {
                return self
                    .attr(option, "value")
                    .map(str::to_string)
                    .unwrap_or_else(|| self.text_content(option));
            }
        }
        if self.tag(id) == Some("textarea") {
            return self.text_content(id);
        }
        String::new()
    }

    fn is_checked(&self, id: NodeId) -> bool {
        match self.prop(id, "checked") {
            Some(v) => v.is_truthy(),
            None => self.has_attr(id, "checked"),
        }
    }

    /// Read an element as a dynamic value for request construction:
    /// checkboxes/radios yield their checked state, other controls their
    /// string value, and non-control elements their text content.
    pub fn element_value(&self, id: NodeId) -> Value {
        match self.tag(id) {
            Some("input") => {
                let input_type = self.attr(id, "type").unwrap_or("text");
                if matches!(input_type, "checkbox" | "radio") {
                    Value::Bool(self.is_checked(id))
                } else {
                    Value::Str(self.field_value(id))
                }
            }
            Some("select") | Some("textarea") => Value::Str(self.field_value(id)),
            Some(_) => Value::Str(self.text_content(id)),
            None => Value::Null,
        }
    }
}
