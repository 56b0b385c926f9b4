//! The HTTP trigger subsystem.
//!
//! Elements carrying `x-http` bind to a network request whose whole
//! configuration (method, swap mode, targets, body strategy, headers,
//! confirm prompt, trigger) is resolved once at bind time. Responses are
//! swapped into the document as markup and the directive pipeline re-runs
//! over the swapped region.
//!
//! The network itself is a host-provided contract ([`Fetcher`]); requests
//! resolve synchronously on the single execution context, so a response
//! swap is serialized with all other engine work.

use crate::engine::Engine;
use crate::scheduler::Task;
use log::{error, warn};
use std::collections::BTreeMap;
use thiserror::Error;
use xtra_dom::{InsertPosition, NodeId, Selector};
use xtra_types::Value;

/// Transport-level failure (connection refused, DNS, aborted). Distinct
/// from an HTTP error status, which arrives as a normal [`HttpResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// An outgoing request handed to the [`Fetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// The response a [`Fetcher`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Host network contract. Resolves synchronously; the host decides how
/// requests actually travel.
pub trait Fetcher {
    fn fetch(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Default fetcher for engines built without one: every request fails as
/// a transport error.
#[derive(Debug, Default)]
pub struct NoFetcher;

impl Fetcher for NoFetcher {
    fn fetch(&mut self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        Err(TransportError("no fetcher configured".to_string()))
    }
}

/// Host confirmation-prompt contract (`x-confirm`).
pub trait Prompter {
    fn confirm(&mut self, message: &str) -> bool;
}

/// Default prompter: every confirmation is accepted.
#[derive(Debug, Default)]
pub struct AlwaysConfirm;

impl Prompter for AlwaysConfirm {
    fn confirm(&mut self, _message: &str) -> bool {
        true
    }
}

/// Where response markup lands relative to the target element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwapMode {
    /// Replace the target's children.
    #[default]
    Inner,
    Append,
    Prepend,
    Before,
    After,
    /// Replace the target element itself.
    Outer,
}

impl SwapMode {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") | Some("inner") => SwapMode::Inner,
            Some("append") => SwapMode::Append,
            Some("prepend") => SwapMode::Prepend,
            Some("before") => SwapMode::Before,
            Some("after") => SwapMode::After,
            Some("outer") => SwapMode::Outer,
            Some(other) => {
                warn!("http: unknown swap mode '{other}', using inner");
                SwapMode::Inner
            }
        }
    }
}

/// How the request body (or query string) is built.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BodyStrategy {
    /// No `x-json`/`x-form`. The nearest enclosing form, if any, still
    /// contributes its fields (query string on GET/HEAD, urlencoded body
    /// otherwise).
    None,
    /// `x-json` — JSON body. `None` infers entries from the nearest form.
    Json(Option<BTreeMap<String, Value>>),
    /// `x-form` — form-encoded body. `None` infers from the nearest form.
    Form(Option<BTreeMap<String, Value>>),
}

/// When a binding fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Trigger {
    /// A DOM event, optionally debounced (trailing edge).
    Event {
        name: String,
        debounce_ms: Option<u64>,
    },
    /// Once after mount, optionally delayed.
    Load { delay_ms: u64 },
    /// Recurring fixed interval.
    Every { interval_ms: u64 },
}

/// Fixed per-element request configuration, resolved once at bind time.
#[derive(Debug, Clone)]
pub(crate) struct HttpConfig {
    pub(crate) el: NodeId,
    pub(crate) url: String,
    pub(crate) method: String,
    pub(crate) swap: SwapMode,
    pub(crate) target: Option<Selector>,
    pub(crate) error_target: Option<Selector>,
    pub(crate) indicator: Option<Selector>,
    pub(crate) confirm: Option<String>,
    pub(crate) body: BodyStrategy,
    pub(crate) headers: Vec<(String, String)>,
}

/// A bound element plus its runtime trigger state.
pub(crate) struct HttpBinding {
    pub(crate) config: HttpConfig,
    pub(crate) trigger: Trigger,
    pub(crate) debounce_timer: Option<u64>,
    pub(crate) poll_timer: Option<u64>,
    /// Set when the engine removed the owning subtree; a released binding
    /// never fires again.
    pub(crate) released: bool,
}

/// Parse the `x-trigger` grammar. Missing → `submit` on forms, `click`
/// elsewhere. Unparsable millisecond counts fall back to 0 (1000 for
/// polls).
pub(crate) fn parse_trigger(raw: Option<&str>, is_form: bool) -> Trigger {
    let raw = raw.unwrap_or("").trim();
    if raw.is_empty() {
        let name = if is_form { "submit" } else { "click" };
        return Trigger::Event {
            name: name.to_string(),
            debounce_ms: None,
        };
    }
    let (head, ms) = match raw.split_once(':') {
        Some((head, ms)) => (head.trim(), Some(ms.trim())),
        None => (raw, None),
    };
    let parse_ms = |fallback: u64| {
        ms.and_then(|m| m.parse::<u64>().ok()).unwrap_or(fallback)
    };
    match head {
        "load" => Trigger::Load {
            delay_ms: parse_ms(0),
        },
        "every" => Trigger::Every {
            interval_ms: parse_ms(1000).max(1),
        },
        _ => Trigger::Event {
            name: head.to_string(),
            debounce_ms: ms.map(|m| m.parse::<u64>().unwrap_or(0)),
        },
    }
}

impl Engine {
    // ── Binding ───────────────────────────────────────────────────

    /// Bind every unbound `x-http` element in a subtree. Elements bind
    /// exactly once per session; rebinding is not supported.
    pub(crate) fn bind_http_subtree(&mut self, root: NodeId) {
        for el in self.doc.element_descendants(root) {
            if !self.doc.is_attached(el) || self.http_bound.contains(&el) {
                continue;
            }
            let Some(url) = self.doc.attr(el, "x-http").map(str::to_string) else {
                continue;
            };
            self.http_bound.insert(el);
            self.bind_http_element(el, url);
        }
    }

    fn bind_http_element(&mut self, el: NodeId, url: String) {
        let is_form = self.doc.tag(el) == Some("form");

        let has_json = self.doc.has_attr(el, "x-json");
        let has_form = self.doc.has_attr(el, "x-form");
        if has_json && has_form {
            warn!("http: element has both x-json and x-form, not binding");
            return;
        }
        let body = if has_json {
            BodyStrategy::Json(self.body_map(el, "x-json"))
        } else if has_form {
            BodyStrategy::Form(self.body_map(el, "x-form"))
        } else {
            BodyStrategy::None
        };

        let method = self
            .doc
            .attr(el, "x-method")
            .map(str::to_string)
            .or_else(|| {
                if is_form {
                    self.doc.attr(el, "method").map(str::to_string)
                } else {
                    None
                }
            })
            .unwrap_or_else(|| "GET".to_string())
            .to_ascii_uppercase();

        let headers = self
            .doc
            .attr(el, "x-headers")
            .map(str::to_string)
            .and_then(|src| self.parse_json_map(&src))
            .map(|map| {
                map.into_iter()
                    .map(|(name, value)| (name, value.render()))
                    .collect()
            })
            .unwrap_or_default();

        let config = HttpConfig {
            el,
            url,
            method,
            swap: SwapMode::parse(self.doc.attr(el, "x-swap")),
            target: self.parse_selector_attr(el, "x-target"),
            error_target: self.parse_selector_attr(el, "x-target-error"),
            indicator: self.parse_selector_attr(el, "x-indicator"),
            confirm: self.doc.attr(el, "x-confirm").map(str::to_string),
            body,
            headers,
        };
        let trigger = parse_trigger(self.doc.attr(el, "x-trigger"), is_form);

        let idx = self.http.len();
        self.http.push(HttpBinding {
            config,
            trigger: trigger.clone(),
            debounce_timer: None,
            poll_timer: None,
            released: false,
        });

        match trigger {
            Trigger::Event { name, .. } => {
                self.http_listeners.entry((el, name)).or_default().push(idx);
            }
            Trigger::Load { delay_ms } => {
                self.scheduler.schedule(delay_ms, Task::HttpFire(idx));
            }
            Trigger::Every { interval_ms } => {
                let timer = self.scheduler.schedule(interval_ms, Task::HttpPoll(idx));
                self.http[idx].poll_timer = Some(timer);
            }
        }
    }

    /// `x-json` / `x-form` attribute body: empty → infer from the nearest
    /// form at request time; otherwise a literal JSON object.
    fn body_map(&mut self, el: NodeId, attr: &str) -> Option<BTreeMap<String, Value>> {
        let src = self.doc.attr(el, attr).unwrap_or("").trim().to_string();
        if src.is_empty() {
            return None;
        }
        Some(self.parse_json_map(&src).unwrap_or_default())
    }

    /// Parse a JSON-object attribute value, cached by source text.
    fn parse_json_map(&mut self, src: &str) -> Option<BTreeMap<String, Value>> {
        if let Some(cached) = self.json_cache.get(src) {
            return cached.clone();
        }
        let parsed = match serde_json::from_str::<serde_json::Value>(src) {
            Ok(json @ serde_json::Value::Object(_)) => match Value::from_json(&json) {
                Value::Map(map) => Some(map),
                _ => None,
            },
            Ok(_) => {
                warn!("http: attribute value is not a JSON object: {src}");
                None
            }
            Err(err) => {
                warn!("http: invalid JSON attribute value '{src}': {err}");
                None
            }
        };
        self.json_cache.insert(src.to_string(), parsed.clone());
        parsed
    }

    fn parse_selector_attr(&self, el: NodeId, attr: &str) -> Option<Selector> {
        let raw = self.doc.attr(el, attr)?;
        match Selector::parse(raw) {
            Ok(selector) => Some(selector),
            Err(err) => {
                warn!("http: {err}, ignoring {attr}");
                None
            }
        }
    }

    // ── Triggering ────────────────────────────────────────────────

    /// An event-triggered binding fired. Debounced triggers re-arm their
    /// timer; only the trailing call in the window sends.
    pub(crate) fn http_event_triggered(&mut self, idx: usize) {
        let (debounce, pending) = {
            let binding = &self.http[idx];
            if binding.released {
                return;
            }
            match &binding.trigger {
                Trigger::Event { debounce_ms, .. } => (*debounce_ms, binding.debounce_timer),
                _ => return,
            }
        };
        match debounce {
            None => self.send_request(idx),
            Some(ms) => {
                if let Some(timer) = pending {
                    self.scheduler.cancel(timer);
                }
                let timer = self.scheduler.schedule(ms, Task::HttpFire(idx));
                self.http[idx].debounce_timer = Some(timer);
            }
        }
    }

    /// A poll timer fired: send and re-arm, unless released meanwhile.
    pub(crate) fn http_poll_fired(&mut self, idx: usize) {
        let interval = {
            let binding = &self.http[idx];
            if binding.released {
                return;
            }
            match binding.trigger {
                Trigger::Every { interval_ms } => interval_ms,
                _ => return,
            }
        };
        self.send_request(idx);
        if !self.http[idx].released {
            let timer = self.scheduler.schedule(interval, Task::HttpPoll(idx));
            self.http[idx].poll_timer = Some(timer);
        }
    }

    // ── Execution ─────────────────────────────────────────────────

    pub(crate) fn send_request(&mut self, idx: usize) {
        let config = {
            let binding = &mut self.http[idx];
            if binding.released {
                return;
            }
            binding.debounce_timer = None;
            binding.config.clone()
        };

        if let Some(message) = &config.confirm {
            if !self.prompter.confirm(message) {
                return;
            }
        }

        let indicator = config
            .indicator
            .as_ref()
            .and_then(|sel| self.doc.select_first(sel))
            .map(|node| (node, self.doc.has_attr(node, "hidden")));
        if let Some((node, _)) = indicator {
            self.doc.remove_attr(node, "hidden");
        }

        let request = self.build_request(&config);
        let result = self.fetcher.fetch(&request);

        if let Some((node, was_hidden)) = indicator {
            if was_hidden {
                self.doc.set_attr(node, "hidden", "");
            }
        }

        let success_target = self.resolve_target(config.target.as_ref(), config.el);
        let error_target = match config.error_target.as_ref() {
            Some(sel) => self
                .doc
                .select_first(sel)
                .unwrap_or(success_target),
            None => success_target,
        };
        self.handle_http_result(&request, result, success_target, error_target, config.swap);
    }

    fn build_request(&mut self, config: &HttpConfig) -> HttpRequest {
        let params = self.collect_params(config);
        let mut url = config.url.clone();
        let mut body = None;
        let mut headers: Vec<(String, String)> = Vec::new();

        let query_method = matches!(config.method.as_str(), "GET" | "HEAD");
        match (&config.body, &params) {
            (_, None) => {}
            (_, Some(pairs)) if query_method => {
                if !pairs.is_empty() {
                    url.push(if url.contains('?') { '&' } else { '?' });
                    url.push_str(&encode_pairs(pairs));
                }
            }
            (BodyStrategy::Json(_), Some(pairs)) => {
                let map: BTreeMap<String, Value> = pairs.iter().cloned().collect();
                body = Some(Value::Map(map).to_json().to_string());
                headers.push(("content-type".to_string(), "application/json".to_string()));
            }
            (BodyStrategy::Form(_) | BodyStrategy::None, Some(pairs)) => {
                body = Some(encode_pairs(pairs));
                headers.push((
                    "content-type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                ));
            }
        }

        // x-headers merge last and win on name collision.
        for (name, value) in &config.headers {
            headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }

        HttpRequest {
            method: config.method.clone(),
            url,
            headers,
            body,
        }
    }

    /// Gather request parameters: the literal map with request-time
    /// selector-reference resolution, or the nearest form's entries.
    fn collect_params(&mut self, config: &HttpConfig) -> Option<Vec<(String, Value)>> {
        let map = match &config.body {
            // No declared strategy: an element on or inside a form still
            // sends the form's fields.
            BodyStrategy::None => {
                let form = self.doc.nearest_form(config.el)?;
                return Some(
                    self.doc
                        .form_entries(form)
                        .into_iter()
                        .map(|(name, value)| (name, Value::Str(value)))
                        .collect(),
                );
            }
            BodyStrategy::Json(map) | BodyStrategy::Form(map) => map,
        };
        Some(match map {
            Some(entries) => entries
                .iter()
                .map(|(name, value)| (name.clone(), self.resolve_param(value)))
                .collect(),
            None => match self.doc.nearest_form(config.el) {
                Some(form) => self
                    .doc
                    .form_entries(form)
                    .into_iter()
                    .map(|(name, value)| (name, Value::Str(value)))
                    .collect(),
                None => {
                    warn!("http: no enclosing form to infer parameters from");
                    Vec::new()
                }
            },
        })
    }

    /// Literal-map values beginning with `#` or `[` are DOM selector
    /// references read at request time; everything else passes through.
    fn resolve_param(&self, value: &Value) -> Value {
        let Value::Str(s) = value else {
            return value.clone();
        };
        if !s.starts_with('#') && !s.starts_with('[') {
            return value.clone();
        }
        let selector = match Selector::parse(s) {
            Ok(selector) => selector,
            Err(err) => {
                warn!("http: {err} in parameter reference");
                return Value::Null;
            }
        };
        match self.doc.select_first(&selector) {
            Some(node) => self.doc.element_value(node),
            None => {
                warn!("http: parameter reference '{s}' matched nothing");
                Value::Null
            }
        }
    }

    fn resolve_target(&self, selector: Option<&Selector>, el: NodeId) -> NodeId {
        match selector {
            None => el,
            Some(sel) => match self.doc.select_first(sel) {
                Some(node) => node,
                None => {
                    warn!("http: target selector matched nothing, using the bound element");
                    el
                }
            },
        }
    }

    // ── Response handling ─────────────────────────────────────────

    pub(crate) fn handle_http_result(
        &mut self,
        request: &HttpRequest,
        result: Result<HttpResponse, TransportError>,
        success_target: NodeId,
        error_target: NodeId,
        swap: SwapMode,
    ) {
        match result {
            Err(err) => {
                error!("http: {} {}: {err}", request.method, request.url);
                self.swap_markup(error_target, swap, "Error: NETWORK");
            }
            Ok(response) if (200..400).contains(&response.status) => {
                self.swap_markup(success_target, swap, &response.body);
            }
            Ok(response) => {
                // Structured JSON error bodies are logged, never rendered.
                match serde_json::from_str::<serde_json::Value>(&response.body) {
                    Ok(json) => {
                        error!(
                            "http: {} returned {}: {json}",
                            request.url, response.status
                        );
                        let message = format!("Error: {}", response.status);
                        self.swap_markup(error_target, swap, &message);
                    }
                    Err(_) => {
                        error!("http: {} returned {}", request.url, response.status);
                        self.swap_markup(error_target, swap, &response.body);
                    }
                }
            }
        }
    }

    /// Swap markup relative to `target` and re-run the directive pipeline
    /// over the inserted region. A target no longer in the document (the
    /// region was removed while a request was in flight) is a silent
    /// no-op.
    pub(crate) fn swap_markup(&mut self, target: NodeId, mode: SwapMode, markup: &str) {
        if !self.doc.is_attached(target) {
            return;
        }
        let roots = match mode {
            SwapMode::Inner => {
                for child in self.doc.children(target).to_vec() {
                    self.release_subtree(child);
                }
                self.doc.set_inner_html(target, markup)
            }
            SwapMode::Append => self.doc.insert_adjacent(target, InsertPosition::BeforeEnd, markup),
            SwapMode::Prepend => self.doc.insert_adjacent(target, InsertPosition::AfterBegin, markup),
            SwapMode::Before => self.doc.insert_adjacent(target, InsertPosition::BeforeBegin, markup),
            SwapMode::After => self.doc.insert_adjacent(target, InsertPosition::AfterEnd, markup),
            SwapMode::Outer => {
                let roots = self.doc.insert_adjacent(target, InsertPosition::BeforeBegin, markup);
                self.release_subtree(target);
                self.doc.detach(target);
                roots
            }
        };
        for root in roots {
            self.apply(root);
        }
    }
}

/// Form/query encoding of parameter pairs.
fn encode_pairs(pairs: &[(String, Value)]) -> String {
    let mut out = String::new();
    for (name, value) in pairs {
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str(&encode_component(name));
        out.push('=');
        out.push_str(&encode_component(&value.render()));
    }
    out
}

fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            other => {
                out.push('%');
                out.push_str(&format!("{other:02X}"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_grammar() {
        assert_eq!(
            parse_trigger(None, true),
            Trigger::Event {
                name: "submit".into(),
                debounce_ms: None
            }
        );
        assert_eq!(
            parse_trigger(None, false),
            Trigger::Event {
                name: "click".into(),
                debounce_ms: None
            }
        );
        assert_eq!(parse_trigger(Some("load"), false), Trigger::Load { delay_ms: 0 });
        assert_eq!(
            parse_trigger(Some("load:250"), false),
            Trigger::Load { delay_ms: 250 }
        );
        assert_eq!(
            parse_trigger(Some("every:500"), false),
            Trigger::Every { interval_ms: 500 }
        );
        assert_eq!(
            parse_trigger(Some("every:bogus"), false),
            Trigger::Every { interval_ms: 1000 }
        );
        assert_eq!(
            parse_trigger(Some("input:300"), false),
            Trigger::Event {
                name: "input".into(),
                debounce_ms: Some(300)
            }
        );
        assert_eq!(
            parse_trigger(Some("keyup"), false),
            Trigger::Event {
                name: "keyup".into(),
                debounce_ms: None
            }
        );
    }

    #[test]
    fn component_encoding() {
        assert_eq!(encode_component("a b&c"), "a%20b%26c");
        assert_eq!(encode_component("safe-._~"), "safe-._~");
    }

    #[test]
    fn pair_encoding() {
        let pairs = vec![
            ("q".to_string(), Value::Str("rust lang".into())),
            ("page".to_string(), Value::Num(2.0)),
        ];
        assert_eq!(encode_pairs(&pairs), "q=rust%20lang&page=2");
    }
}
