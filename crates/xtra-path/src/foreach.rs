//! Iteration directive grammar: `"item in items"`.

use crate::parse_path;
use xtra_types::{Path, Seg};

/// A parsed iteration expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ForExpr {
    /// The per-item loop variable name.
    pub var_name: String,
    /// The collection path.
    pub path: Path,
}

/// Parse `"<ident> in <path>"`. Returns `None` when either half fails the
/// restricted grammar.
pub fn parse_for_expr(expr: &str) -> Option<ForExpr> {
    let expr = expr.trim();
    let (var, rest) = split_ident(expr)?;
    let rest = rest.strip_prefix(char::is_whitespace)?.trim_start();
    let rest = rest.strip_prefix("in")?;
    // `in` must be a standalone word, not an ident prefix.
    if rest
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    {
        return None;
    }
    let path = parse_path(rest.trim())?;
    Some(ForExpr {
        var_name: var.to_string(),
        path,
    })
}

/// If `expr` references the loop variable (`item`, `item.x`, `item[0].y`),
/// return the trailing segments to traverse from the item value. An empty
/// vector means the bare variable.
pub fn local_tail(var_name: &str, expr: &str) -> Option<Vec<Seg>> {
    let expr = expr.trim();
    let rest = expr.strip_prefix(var_name)?;
    match rest.chars().next() {
        None => Some(Vec::new()),
        Some('.') | Some('[') => {
            // Re-anchor the tail on a synthetic root so the path parser
            // validates it, then drop that root.
            let path = parse_path(&format!("_{rest}"))?;
            Some(path.tail().to_vec())
        }
        _ => None,
    }
}

fn split_ident(s: &str) -> Option<(&str, &str)> {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return None,
    }
    let mut end = s.len();
    for (i, c) in chars {
        if !(c.is_ascii_alphanumeric() || c == '_' || c == '$') {
            end = i;
            break;
        }
    }
    Some((&s[..end], &s[end..]))
}
