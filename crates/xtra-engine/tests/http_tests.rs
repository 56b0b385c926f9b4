//! Integration tests for the HTTP trigger subsystem: trigger timing,
//! request construction, swap behavior, and error rendering, all through
//! a stub network.

use std::cell::RefCell;
use std::rc::Rc;
use xtra_engine::{
    AlwaysConfirm, Engine, Fetcher, HttpRequest, HttpResponse, MemoryStorage, NodeId, Prompter,
    Selector, SwapMode, TransportError, Value, STORAGE_KEY,
};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

struct StubFetcher {
    calls: Rc<RefCell<Vec<HttpRequest>>>,
    reply: Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError>>,
}

impl Fetcher for StubFetcher {
    fn fetch(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.borrow_mut().push(request.clone());
        (self.reply)(request)
    }
}

struct DeclineAll;

impl Prompter for DeclineAll {
    fn confirm(&mut self, _message: &str) -> bool {
        false
    }
}

fn engine_with<F>(reply: F) -> (Engine, Rc<RefCell<Vec<HttpRequest>>>)
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + 'static,
{
    let calls = Rc::new(RefCell::new(Vec::new()));
    let fetcher = StubFetcher {
        calls: calls.clone(),
        reply: Box::new(reply),
    };
    let engine = Engine::with_parts(
        Box::new(MemoryStorage::new()),
        Box::new(fetcher),
        Box::new(AlwaysConfirm),
    );
    (engine, calls)
}

fn ok(body: &str) -> impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError> {
    let body = body.to_string();
    move |_| {
        Ok(HttpResponse {
            status: 200,
            body: body.clone(),
        })
    }
}

fn find(engine: &Engine, selector: &str) -> NodeId {
    engine
        .doc()
        .select_first(&Selector::parse(selector).unwrap())
        .unwrap_or_else(|| panic!("no match for {selector}"))
}

fn count(engine: &Engine, selector: &str) -> usize {
    engine
        .doc()
        .select_all_in(engine.doc().root(), &Selector::parse(selector).unwrap())
        .len()
}

fn text(engine: &Engine, selector: &str) -> String {
    engine.doc().text_content(find(engine, selector))
}

// ─────────────────────────────────────────────────────────────────────
// Triggers
// ─────────────────────────────────────────────────────────────────────

#[test]
fn click_swaps_inner_and_reruns_the_pipeline() {
    let (mut engine, calls) = engine_with(ok("Hi ((name))"));
    engine.set("name", Value::from("ada"));
    engine.boot(r#"<button id="b" x-http="/hello">go</button>"#);
    assert!(calls.borrow().is_empty());

    engine.dispatch(find(&engine, "#b"), "click", Value::Null);
    assert_eq!(calls.borrow().len(), 1);
    assert_eq!(calls.borrow()[0].method, "GET");
    assert_eq!(calls.borrow()[0].url, "/hello");
    // Swapped markup went through the directive pipeline.
    assert_eq!(text(&engine, "#b"), "Hi ada");
}

#[test]
fn debounced_trigger_sends_only_the_trailing_call() {
    let (mut engine, calls) = engine_with(ok(""));
    engine.boot(r#"<input id="q" x-http="/search" x-trigger="input:100">"#);
    let input = find(&engine, "#q");

    engine.dispatch(input, "input", Value::Null);
    engine.dispatch(input, "input", Value::Null);
    engine.dispatch(input, "input", Value::Null);
    assert!(calls.borrow().is_empty());

    engine.advance(99);
    assert!(calls.borrow().is_empty());
    engine.advance(1);
    assert_eq!(calls.borrow().len(), 1);

    // The window is over; a fresh event starts a new one.
    engine.dispatch(input, "input", Value::Null);
    engine.advance(100);
    assert_eq!(calls.borrow().len(), 2);
}

#[test]
fn load_trigger_fires_once_on_tick() {
    let (mut engine, calls) = engine_with(ok("ready"));
    engine.boot(r#"<div id="d" x-http="/init" x-trigger="load"></div>"#);
    assert!(calls.borrow().is_empty());

    engine.tick();
    assert_eq!(calls.borrow().len(), 1);
    assert_eq!(text(&engine, "#d"), "ready");

    engine.advance(10_000);
    assert_eq!(calls.borrow().len(), 1);
}

#[test]
fn delayed_load_respects_its_delay() {
    let (mut engine, calls) = engine_with(ok(""));
    engine.boot(r#"<div x-http="/later" x-trigger="load:50"></div>"#);

    engine.advance(49);
    assert!(calls.borrow().is_empty());
    engine.advance(1);
    assert_eq!(calls.borrow().len(), 1);
}

#[test]
fn polling_repeats_until_the_element_is_removed() {
    let (mut engine, calls) = engine_with(ok("tick"));
    engine.boot(r#"<div id="p" x-http="/poll" x-trigger="every:10"></div>"#);

    engine.advance(10);
    assert_eq!(calls.borrow().len(), 1);
    engine.advance(10);
    assert_eq!(calls.borrow().len(), 2);

    let node = find(&engine, "#p");
    engine.detach(node);
    engine.advance(50);
    assert_eq!(calls.borrow().len(), 2, "released poll kept firing");
}

#[test]
fn confirm_decline_sends_nothing() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let fetcher = StubFetcher {
        calls: calls.clone(),
        reply: Box::new(ok("")),
    };
    let mut engine = Engine::with_parts(
        Box::new(MemoryStorage::new()),
        Box::new(fetcher),
        Box::new(DeclineAll),
    );
    engine.boot(r#"<button id="b" x-http="/danger" x-confirm="sure?">x</button>"#);
    engine.dispatch(find(&engine, "#b"), "click", Value::Null);
    assert!(calls.borrow().is_empty());
}

// ─────────────────────────────────────────────────────────────────────
// Request construction
// ─────────────────────────────────────────────────────────────────────

#[test]
fn form_post_sends_urlencoded_entries() {
    let (mut engine, calls) = engine_with(ok("saved"));
    engine.boot(
        r#"<form id="f" x-http="/save" x-method="post" x-form>
            <input name="user" value="ada lovelace">
            <input type="checkbox" name="tos" checked>
        </form>"#,
    );
    engine.dispatch(find(&engine, "#f"), "submit", Value::Null);

    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "POST");
    assert_eq!(calls[0].body.as_deref(), Some("user=ada%20lovelace&tos=on"));
    assert!(calls[0]
        .headers
        .contains(&("content-type".to_string(), "application/x-www-form-urlencoded".to_string())));
}

#[test]
fn bare_form_submit_infers_its_own_fields() {
    let (mut engine, calls) = engine_with(ok("saved"));
    engine.boot(
        r#"<form id="f" x-http="/save" x-method="post">
            <input name="a" value="1">
            <input name="b" value="two words">
        </form>"#,
    );
    engine.dispatch(find(&engine, "#f"), "submit", Value::Null);

    let calls = calls.borrow();
    assert_eq!(calls[0].body.as_deref(), Some("a=1&b=two%20words"));
    assert!(calls[0]
        .headers
        .contains(&("content-type".to_string(), "application/x-www-form-urlencoded".to_string())));
}

#[test]
fn bare_get_form_moves_fields_into_the_query() {
    let (mut engine, calls) = engine_with(ok(""));
    engine.boot(r#"<form id="f" x-http="/search"><input name="q" value="x"></form>"#);
    engine.dispatch(find(&engine, "#f"), "submit", Value::Null);

    assert_eq!(calls.borrow()[0].url, "/search?q=x");
    assert_eq!(calls.borrow()[0].body, None);
}

#[test]
fn get_with_json_literal_appends_a_query_string() {
    let (mut engine, calls) = engine_with(ok(""));
    engine.boot(r#"<button id="b" x-http="/list" x-json='{"page":2,"q":"a b"}'>go</button>"#);
    engine.dispatch(find(&engine, "#b"), "click", Value::Null);

    let calls = calls.borrow();
    assert_eq!(calls[0].url, "/list?page=2&q=a%20b");
    assert_eq!(calls[0].body, None);
}

#[test]
fn json_post_serializes_the_parameter_map() {
    let (mut engine, calls) = engine_with(ok(""));
    engine.boot(r#"<button id="b" x-http="/api" x-method="post" x-json='{"n":1}'>go</button>"#);
    engine.dispatch(find(&engine, "#b"), "click", Value::Null);

    let calls = calls.borrow();
    assert_eq!(calls[0].body.as_deref(), Some(r#"{"n":1}"#));
    assert!(calls[0]
        .headers
        .contains(&("content-type".to_string(), "application/json".to_string())));
}

#[test]
fn selector_parameters_read_element_values_at_request_time() {
    let (mut engine, calls) = engine_with(ok(""));
    engine.boot(
        r##"<input id="s" value="rust"><button id="b" x-http="/find" x-json='{"q":"#s"}'>go</button>"##,
    );
    let input = find(&engine, "#s");
    engine.doc_mut().set_prop(input, "value", Value::Str("typed".into()));
    engine.dispatch(find(&engine, "#b"), "click", Value::Null);

    assert_eq!(calls.borrow()[0].url, "/find?q=typed");
}

#[test]
fn explicit_headers_win_over_computed_ones() {
    let (mut engine, calls) = engine_with(ok(""));
    engine.boot(
        r#"<form id="f" x-http="/up" x-method="post" x-form
              x-headers='{"content-type":"text/plain","x-key":"v"}'>
            <input name="a" value="1">
        </form>"#,
    );
    engine.dispatch(find(&engine, "#f"), "submit", Value::Null);

    let calls = calls.borrow();
    let content_types: Vec<_> = calls[0]
        .headers
        .iter()
        .filter(|(n, _)| n.eq_ignore_ascii_case("content-type"))
        .collect();
    assert_eq!(content_types, vec![&("content-type".to_string(), "text/plain".to_string())]);
    assert!(calls[0]
        .headers
        .contains(&("x-key".to_string(), "v".to_string())));
}

// ─────────────────────────────────────────────────────────────────────
// Responses and swaps
// ─────────────────────────────────────────────────────────────────────

#[test]
fn transport_error_renders_the_network_message() {
    let (mut engine, _calls) =
        engine_with(|_| Err(TransportError("connection refused".into())));
    engine.boot(r##"<button id="b" x-http="/x" x-target="#out">go</button><div id="out"></div>"##);
    engine.dispatch(find(&engine, "#b"), "click", Value::Null);
    assert_eq!(text(&engine, "#out"), "Error: NETWORK");
}

#[test]
fn json_error_body_is_replaced_with_a_status_message() {
    let (mut engine, _calls) = engine_with(|_| {
        Ok(HttpResponse {
            status: 404,
            body: r#"{"error":"no such thing"}"#.to_string(),
        })
    });
    engine.boot(
        r##"<button id="b" x-http="/x" x-target="#out" x-target-error="#err">go</button>
           <div id="out"></div><div id="err"></div>"##,
    );
    engine.dispatch(find(&engine, "#b"), "click", Value::Null);
    assert_eq!(text(&engine, "#err"), "Error: 404");
    assert_eq!(text(&engine, "#out"), "");
}

#[test]
fn non_json_error_body_is_swapped_verbatim() {
    let (mut engine, _calls) = engine_with(|_| {
        Ok(HttpResponse {
            status: 500,
            body: "<b>server exploded</b>".to_string(),
        })
    });
    engine.boot(r##"<button id="b" x-http="/x" x-target="#out">go</button><div id="out"></div>"##);
    engine.dispatch(find(&engine, "#b"), "click", Value::Null);
    assert_eq!(text(&engine, "#out"), "server exploded");
}

#[test]
fn non_json_error_markup_joins_the_pipeline() {
    let (mut engine, _calls) = engine_with(|_| {
        Ok(HttpResponse {
            status: 500,
            body: "<b>failed for ((who))</b>".to_string(),
        })
    });
    engine.set("who", Value::from("ada"));
    engine.boot(r##"<button id="b" x-http="/x" x-target="#out">go</button><div id="out"></div>"##);
    engine.dispatch(find(&engine, "#b"), "click", Value::Null);
    assert_eq!(text(&engine, "#out"), "failed for ada");
}

#[test]
fn informational_status_is_not_a_success() {
    let (mut engine, _calls) = engine_with(|_| {
        Ok(HttpResponse {
            status: 100,
            body: "<i>continue</i>".to_string(),
        })
    });
    engine.boot(
        r##"<button id="b" x-http="/x" x-target="#out" x-target-error="#err">go</button>
           <div id="out"></div><div id="err"></div>"##,
    );
    engine.dispatch(find(&engine, "#b"), "click", Value::Null);
    assert_eq!(text(&engine, "#err"), "continue");
    assert_eq!(text(&engine, "#out"), "");
}

#[test]
fn outer_swap_replaces_the_target_element() {
    let (mut engine, _calls) = engine_with(ok(r#"<span id="fresh">new</span>"#));
    engine.boot(r#"<div id="wrap"><button id="b" x-http="/x" x-swap="outer">old</button></div>"#);
    engine.dispatch(find(&engine, "#b"), "click", Value::Null);

    assert_eq!(count(&engine, "#b"), 0);
    assert_eq!(count(&engine, "#fresh"), 1);
    assert_eq!(text(&engine, "#wrap"), "new");
}

#[test]
fn append_swap_keeps_existing_children() {
    let (mut engine, _calls) = engine_with(ok("<li>two</li>"));
    engine.boot(
        r##"<button id="b" x-http="/more" x-target="#list" x-swap="append">more</button>
           <ul id="list"><li>one</li></ul>"##,
    );
    engine.dispatch(find(&engine, "#b"), "click", Value::Null);
    assert_eq!(text(&engine, "#list"), "onetwo");
    assert_eq!(count(&engine, "li"), 2);
}

#[test]
fn swapped_markup_binds_new_http_elements() {
    let (mut engine, calls) = engine_with(ok(r#"<button id="next" x-http="/two">again</button>"#));
    engine.boot(r##"<div id="out"><button id="first" x-http="/one" x-target="#out">go</button></div>"##);
    engine.dispatch(find(&engine, "#first"), "click", Value::Null);

    engine.dispatch(find(&engine, "#next"), "click", Value::Null);
    assert_eq!(calls.borrow().len(), 2);
    assert_eq!(calls.borrow()[1].url, "/two");
}

#[test]
fn indicator_hidden_state_is_restored_after_the_request() {
    let (mut engine, _calls) = engine_with(ok("done"));
    engine.boot(
        r##"<button id="b" x-http="/x" x-indicator="#spin">go</button><div id="spin" hidden></div>"##,
    );
    engine.dispatch(find(&engine, "#b"), "click", Value::Null);
    assert!(engine.doc().has_attr(find(&engine, "#spin"), "hidden"));
}

#[test]
fn missing_target_falls_back_to_the_bound_element() {
    let (mut engine, _calls) = engine_with(ok("fallback"));
    engine.boot(r##"<button id="b" x-http="/x" x-target="#absent">go</button>"##);
    engine.dispatch(find(&engine, "#b"), "click", Value::Null);
    assert_eq!(text(&engine, "#b"), "fallback");
}

// ─────────────────────────────────────────────────────────────────────
// Host-driven APIs
// ─────────────────────────────────────────────────────────────────────

#[test]
fn explicit_load_swaps_into_the_given_target() {
    let (mut engine, calls) = engine_with(ok("<i>fragment</i>"));
    engine.boot(r#"<div id="out"></div>"#);
    let out = find(&engine, "#out");

    engine.load("/frag", out, SwapMode::Inner);
    assert_eq!(calls.borrow()[0].url, "/frag");
    assert_eq!(text(&engine, "#out"), "fragment");
}

#[test]
fn store_writes_persist_on_the_next_tick() {
    let (mut engine, _calls) = engine_with(ok(""));
    engine.set("user.name", Value::from("ada"));
    assert!(engine.storage_mut().load(STORAGE_KEY).is_none());

    engine.tick();
    let raw = engine
        .storage_mut()
        .load(STORAGE_KEY)
        .expect("flush persisted the tree");
    assert!(raw.contains("ada"));
}
