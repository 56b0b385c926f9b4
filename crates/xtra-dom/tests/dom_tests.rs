//! Integration tests for the headless document: fragment parsing and
//! serialization, tree surgery, selectors, and form collection.

use xtra_dom::{Document, InsertPosition, NodeId, Selector};
use xtra_types::Value;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn doc_with(markup: &str) -> Document {
    let mut doc = Document::new();
    let root = doc.root();
    doc.set_inner_html(root, markup);
    doc
}

fn first(doc: &Document, selector: &str) -> NodeId {
    doc.select_first(&Selector::parse(selector).unwrap())
        .unwrap_or_else(|| panic!("no match for {selector}"))
}

// ─────────────────────────────────────────────────────────────────────
// Parse / serialize
// ─────────────────────────────────────────────────────────────────────

#[test]
fn fragment_round_trips() {
    let markup = r#"<div class="card"><h2>Title</h2><p>Body &amp; more</p></div>"#;
    let doc = doc_with(markup);
    assert_eq!(doc.inner_html(doc.root()), markup);
}

#[test]
fn void_and_self_closing_tags() {
    let doc = doc_with(r#"<input name="q" value="x"><br><span/>text"#);
    let html = doc.inner_html(doc.root());
    assert!(html.contains(r#"<input name="q" value="x">"#));
    assert!(html.contains("<br>"));
    assert!(html.contains("<span></span>"));
}

#[test]
fn comments_survive() {
    let doc = doc_with("a<!--marker-->b");
    assert_eq!(doc.inner_html(doc.root()), "a<!--marker-->b");
}

#[test]
fn stray_close_tags_are_dropped() {
    let doc = doc_with("<div>a</span>b</div>");
    assert_eq!(doc.inner_html(doc.root()), "<div>ab</div>");
}

#[test]
fn bare_attribute_values() {
    let doc = doc_with("<div data-x=1 hidden></div>");
    let div = first(&doc, "div");
    assert_eq!(doc.attr(div, "data-x"), Some("1"));
    assert!(doc.has_attr(div, "hidden"));
}

// ─────────────────────────────────────────────────────────────────────
// Tree surgery
// ─────────────────────────────────────────────────────────────────────

#[test]
fn insert_adjacent_positions() {
    let mut doc = doc_with(r#"<div id="t"><i>mid</i></div>"#);
    let target = first(&doc, "#t");
    doc.insert_adjacent(target, InsertPosition::AfterBegin, "<b>first</b>");
    doc.insert_adjacent(target, InsertPosition::BeforeEnd, "<b>last</b>");
    doc.insert_adjacent(target, InsertPosition::BeforeBegin, "<p>before</p>");
    doc.insert_adjacent(target, InsertPosition::AfterEnd, "<p>after</p>");
    assert_eq!(
        doc.inner_html(doc.root()),
        r#"<p>before</p><div id="t"><b>first</b><i>mid</i><b>last</b></div><p>after</p>"#
    );
}

#[test]
fn detach_keeps_subtree_addressable() {
    let mut doc = doc_with(r#"<ul id="l"><li>one</li></ul>"#);
    let list = first(&doc, "#l");
    assert!(doc.is_attached(list));
    doc.detach(list);
    assert!(!doc.is_attached(list));
    assert_eq!(doc.text_content(list), "one");
    assert_eq!(doc.inner_html(doc.root()), "");
}

#[test]
fn clone_subtree_is_independent() {
    let mut doc = doc_with(r#"<div id="a"><span>x</span></div>"#);
    let original = first(&doc, "#a");
    let clone = doc.clone_subtree(original);
    assert!(!doc.is_attached(clone));
    doc.set_attr(clone, "id", "b");
    assert_eq!(doc.attr(original, "id"), Some("a"));
    assert_eq!(doc.outer_html(clone), r#"<div id="b"><span>x</span></div>"#);
}

// ─────────────────────────────────────────────────────────────────────
// Selectors
// ─────────────────────────────────────────────────────────────────────

#[test]
fn selector_kinds() {
    let doc = doc_with(
        r#"<div id="one" class="red hot" data-k="v"></div><span class="red"></span>"#,
    );
    assert!(doc.select_first(&Selector::parse("#one").unwrap()).is_some());
    assert_eq!(
        doc.select_all_in(doc.root(), &Selector::parse(".red").unwrap())
            .len(),
        2
    );
    assert!(doc.select_first(&Selector::parse("span").unwrap()).is_some());
    assert!(doc
        .select_first(&Selector::parse("[data-k=v]").unwrap())
        .is_some());
    assert!(doc
        .select_first(&Selector::parse(r#"[data-k="v"]"#).unwrap())
        .is_some());
    assert!(doc.select_first(&Selector::parse("#absent").unwrap()).is_none());
}

#[test]
fn invalid_selectors_error() {
    assert!(Selector::parse("").is_err());
    assert!(Selector::parse("div > span").is_err());
    assert!(Selector::parse("[unclosed").is_err());
}

// ─────────────────────────────────────────────────────────────────────
// Forms
// ─────────────────────────────────────────────────────────────────────

#[test]
fn form_entries_follow_form_data_rules() {
    let doc = doc_with(
        r#"<form id="f">
            <input name="user" value="ada">
            <input type="checkbox" name="tos" checked>
            <input type="checkbox" name="spam">
            <select name="color"><option value="r">red</option><option value="g" selected>green</option></select>
            <textarea name="bio">hello</textarea>
            <input value="unnamed">
        </form>"#,
    );
    let form = first(&doc, "#f");
    let entries = doc.form_entries(form);
    assert_eq!(
        entries,
        vec![
            ("user".to_string(), "ada".to_string()),
            ("tos".to_string(), "on".to_string()),
            ("color".to_string(), "g".to_string()),
            ("bio".to_string(), "hello".to_string()),
        ]
    );
}

#[test]
fn field_value_prefers_live_property() {
    let mut doc = doc_with(r#"<input id="q" value="initial">"#);
    let input = first(&doc, "#q");
    assert_eq!(doc.field_value(input), "initial");
    doc.set_prop(input, "value", Value::Str("typed".into()));
    assert_eq!(doc.field_value(input), "typed");
}

#[test]
fn element_value_by_kind() {
    let mut doc = doc_with(
        r#"<input id="c" type="checkbox"><input id="t" value="v"><p id="p">body</p>"#,
    );
    let check = first(&doc, "#c");
    assert_eq!(doc.element_value(check), Value::Bool(false));
    doc.set_prop(check, "checked", Value::Bool(true));
    assert_eq!(doc.element_value(check), Value::Bool(true));
    assert_eq!(doc.element_value(first(&doc, "#t")), Value::Str("v".into()));
    assert_eq!(doc.element_value(first(&doc, "#p")), Value::Str("body".into()));
}
