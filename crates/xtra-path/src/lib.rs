//! The XTRA expression micro-language.
//!
//! Directive authors get a precise, restricted language, not arbitrary
//! script evaluation:
//!
//! - property paths (`user.name`, `items[0].qty`) — [`parse_path`]
//! - template markers (`(( path ))` inside text and attributes) —
//!   [`parse_template`]
//! - the iteration grammar (`"item in items"`) — [`parse_for_expr`]
//! - the sandboxed handler-script grammar used by event directives —
//!   [`parse_script`]
//!
//! Path, template and iteration parsing degrade gracefully (`None` /
//! literal preservation); script parsing reports a structured
//! [`ScriptParseError`] so the directive can be skipped with context.

mod foreach;
mod path;
mod script;
mod template;

pub use foreach::{local_tail, parse_for_expr, ForExpr};
pub use path::parse_path;
pub use script::{parse_script, ScriptParseError};
pub use template::{parse_template, Template, TemplateToken, MARKER_OPEN};
