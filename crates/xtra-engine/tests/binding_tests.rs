//! Integration tests for template bindings: interpolation in text and
//! attributes, change-gated propagation, graceful degradation.

use std::cell::RefCell;
use std::rc::Rc;
use xtra_engine::{Engine, NodeId, Selector, Value};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn booted(markup: &str) -> Engine {
    let mut engine = Engine::new();
    engine.boot(markup);
    engine
}

fn find(engine: &Engine, selector: &str) -> NodeId {
    engine
        .doc()
        .select_first(&Selector::parse(selector).unwrap())
        .unwrap_or_else(|| panic!("no match for {selector}"))
}

fn text(engine: &Engine, selector: &str) -> String {
    engine.doc().text_content(find(engine, selector))
}

// ─────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────

#[test]
fn text_interpolation_renders_at_boot_and_on_change() {
    let mut engine = Engine::new();
    engine.set("user.name", Value::from("Ada"));
    engine.boot(r#"<p id="greet">Hello (( user.name ))!</p>"#);
    assert_eq!(text(&engine, "#greet"), "Hello Ada!");

    engine.set("user.name", Value::from("Grace"));
    assert_eq!(text(&engine, "#greet"), "Hello Grace!");
}

#[test]
fn missing_paths_render_empty() {
    let engine = booted(r#"<p id="p">[((ghost))]</p>"#);
    assert_eq!(text(&engine, "#p"), "[]");
}

#[test]
fn attribute_interpolation() {
    let mut engine = Engine::new();
    engine.set("theme", Value::from("dark"));
    engine.boot(r#"<div id="d" class="panel ((theme))"></div>"#);
    assert_eq!(
        engine.doc().attr(find(&engine, "#d"), "class"),
        Some("panel dark")
    );

    engine.set("theme", Value::from("light"));
    assert_eq!(
        engine.doc().attr(find(&engine, "#d"), "class"),
        Some("panel light")
    );
}

#[test]
fn multiple_markers_in_one_text_node() {
    let mut engine = Engine::new();
    engine.set("a", Value::Num(1.0));
    engine.set("b", Value::Num(2.0));
    engine.boot(r#"<span id="s">((a))+((b))</span>"#);
    assert_eq!(text(&engine, "#s"), "1+2");
    engine.set("b", Value::Num(9.0));
    assert_eq!(text(&engine, "#s"), "1+9");
}

#[test]
fn invalid_markers_stay_literal() {
    let engine = booted(r#"<p id="p">((a + b)) stays</p>"#);
    assert_eq!(text(&engine, "#p"), "((a + b)) stays");
}

#[test]
fn numbers_render_without_fraction() {
    let mut engine = Engine::new();
    engine.set("qty", Value::Num(3.0));
    engine.boot(r#"<i id="n">((qty))</i>"#);
    assert_eq!(text(&engine, "#n"), "3");
}

// ─────────────────────────────────────────────────────────────────────
// Change gating
// ─────────────────────────────────────────────────────────────────────

#[test]
fn equal_write_triggers_nothing() {
    let mut engine = Engine::new();
    engine.set("count", Value::Num(1.0));
    engine.boot(r#"<p id="c">((count))</p>"#);

    let calls = Rc::new(RefCell::new(0u32));
    let sink = calls.clone();
    engine.watch("count", move |_, _| *sink.borrow_mut() += 1);

    // First change observation.
    engine.set("count", Value::Num(2.0));
    assert_eq!(*calls.borrow(), 1);
    assert_eq!(text(&engine, "#c"), "2");

    // Writing the current value is a no-op end to end.
    engine.set("count", Value::Num(2.0));
    assert_eq!(*calls.borrow(), 1);
    assert_eq!(text(&engine, "#c"), "2");
}

#[test]
fn deep_equal_rewrite_is_suppressed() {
    let mut engine = Engine::new();
    engine.set("items", Value::List(vec![Value::Num(1.0)]));

    let calls = Rc::new(RefCell::new(0u32));
    let sink = calls.clone();
    engine.watch("items", move |_, _| *sink.borrow_mut() += 1);

    engine.set("items", Value::List(vec![Value::Num(1.0)]));
    assert_eq!(*calls.borrow(), 0);
}

// ─────────────────────────────────────────────────────────────────────
// Computed values in templates
// ─────────────────────────────────────────────────────────────────────

#[test]
fn computed_interpolation_cascades() {
    let mut engine = Engine::new();
    engine.set("items", Value::List(vec![Value::from("a"), Value::from("b")]));
    engine.computed("total", |reader| {
        let items = reader.get(&xtra_path::parse_path("items").unwrap());
        Ok(Value::Num(match items {
            Value::List(l) => l.len() as f64,
            _ => 0.0,
        }))
    });
    engine.boot(r#"<b id="t">((total))</b>"#);
    assert_eq!(text(&engine, "#t"), "2");

    engine.set("items[2]", Value::from("c"));
    assert_eq!(text(&engine, "#t"), "3");
}
