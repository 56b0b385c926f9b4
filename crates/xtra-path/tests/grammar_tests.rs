//! Integration tests for the expression micro-language: path round-trips,
//! template scanning, the iteration grammar, and handler scripts.

use xtra_path::{parse_for_expr, parse_path, parse_script, parse_template, TemplateToken};
use xtra_types::script::{ScriptExpr, ScriptStmt};
use xtra_types::Seg;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

/// Parse, render canonically, and re-parse; both parses must agree.
fn assert_round_trip(expr: &str) {
    let parsed = parse_path(expr).unwrap_or_else(|| panic!("expected valid path: {expr:?}"));
    let rendered = parsed.to_string();
    let reparsed = parse_path(&rendered)
        .unwrap_or_else(|| panic!("canonical form failed to parse: {rendered:?}"));
    assert_eq!(parsed, reparsed, "round trip changed {expr:?}");
}

// ─────────────────────────────────────────────────────────────────────
// Paths
// ─────────────────────────────────────────────────────────────────────

#[test]
fn paths_round_trip_through_canonical_text() {
    for expr in [
        "a",
        "user.name",
        "items[0]",
        "items[0].qty",
        "a.b[10].c[2].d",
        "_private.$dollar",
        "  spaced . out [ 3 ]  ",
    ] {
        assert_round_trip(expr);
    }
}

#[test]
fn canonical_form_is_dotted_and_bracketed() {
    let path = parse_path(" cart . items [ 0 ] . qty ").unwrap();
    assert_eq!(path.to_string(), "cart.items[0].qty");
}

#[test]
fn index_first_paths_are_invalid() {
    assert_eq!(parse_path("[0].a"), None);
}

// ─────────────────────────────────────────────────────────────────────
// Templates
// ─────────────────────────────────────────────────────────────────────

#[test]
fn template_mixes_literals_and_markers() {
    let t = parse_template("((greeting)), (( user.name ))! You have ((cart.items[0].qty)).");
    let paths: Vec<String> = t
        .tokens
        .iter()
        .filter_map(|tok| match tok {
            TemplateToken::Path(p) => Some(p.to_string()),
            TemplateToken::Literal(_) => None,
        })
        .collect();
    assert_eq!(paths, ["greeting", "user.name", "cart.items[0].qty"]);
    assert_eq!(t.keys.len(), 3);
}

#[test]
fn unterminated_marker_is_literal() {
    let t = parse_template("before ((oops");
    assert!(!t.is_live());
}

// ─────────────────────────────────────────────────────────────────────
// Iteration grammar
// ─────────────────────────────────────────────────────────────────────

#[test]
fn for_expression_accepts_nested_collection_paths() {
    let fe = parse_for_expr("  row  in  table.rows  ").unwrap();
    assert_eq!(fe.var_name, "row");
    assert_eq!(fe.path.segs().len(), 2);
}

#[test]
fn for_expression_rejects_expression_collections() {
    assert!(parse_for_expr("row in rows.filter()").is_none());
}

// ─────────────────────────────────────────────────────────────────────
// Handler scripts
// ─────────────────────────────────────────────────────────────────────

#[test]
fn script_targets_are_store_paths_with_indices() {
    let script = parse_script("items[1].done = true").unwrap();
    match &script.stmts[0] {
        ScriptStmt::Assign { target, .. } => {
            assert_eq!(target.segs()[1], Seg::Index(1));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn script_combines_context_and_store_reads() {
    let script = parse_script("search.q = el.value; search.page = search.page + 1").unwrap();
    assert_eq!(script.stmts.len(), 2);
    match &script.stmts[0] {
        ScriptStmt::Assign { value, .. } => {
            assert_eq!(value, &ScriptExpr::El("value".into()));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn script_rejects_unknown_syntax() {
    assert!(parse_script("count++").is_err());
    assert!(parse_script("alert('x')").is_err());
    assert!(parse_script("a = b ? c : d").is_err());
}
