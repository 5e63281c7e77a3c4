//! Per-request state and the middleware chain cursor.
//!
//! A [`Context`] carries the request, the parameters extracted by the router,
//! the response being built and the chain of handlers selected for the
//! request. The chain is driven by a single shared `index`:
//!
//! ```text
//!  A: before ──► B: before ──► H ──► B: after ──► A: after
//! ```
//!
//! Code a middleware runs before calling [`Context::next`] executes on the way
//! in, code after it on the way out. [`Context::abort`] moves the cursor past
//! any feasible chain length, so no handler that has not started yet will run.

use crate::handler::HandlerFunc;
use crate::http::response::{APPLICATION_JSON, APPLICATION_XML, TEXT_HTML, TEXT_PLAIN};
use crate::http::{Request, Response};
use crate::static_files;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Cursor value that halts every `next` loop sharing this context.
pub const ABORT_INDEX: isize = isize::MAX / 2;

/// String-keyed map of dynamic values, handy for JSON bodies.
pub type H = Map<String, Value>;

#[derive(Default)]
pub struct Context {
    request: Request,
    params: HashMap<String, String>,
    response: Response,
    handlers: Vec<HandlerFunc>,
    index: isize,
    keys: HashMap<String, Value>,
}

impl Context {
    pub fn new(request: Request) -> Self {
        let mut ctx = Context::default();
        ctx.reset(request);
        ctx
    }

    pub(crate) fn reset(&mut self, request: Request) {
        self.request = request;
        self.params.clear();
        self.response.clear();
        self.handlers.clear();
        self.keys.clear();
        self.index = -1;
    }

    /// Drops everything tied to the last request before the context goes
    /// back to the pool.
    pub(crate) fn release(&mut self) {
        self.reset(Request::default());
    }

    pub(crate) fn take_response(&mut self) -> Response {
        std::mem::take(&mut self.response)
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    pub(crate) fn push_handler(&mut self, handler: HandlerFunc) {
        self.handlers.push(handler);
    }

    pub fn set_handlers(&mut self, handlers: Vec<HandlerFunc>) {
        self.handlers = handlers;
    }

    pub fn handlers_len(&self) -> usize {
        self.handlers.len()
    }

    /// Runs the remaining handlers of the chain.
    ///
    /// The cursor is shared, so returning without calling `next` does not
    /// stop the chain: the enclosing loop moves on to the following handler.
    /// A handler that answers the request early must call [`abort`](Self::abort),
    /// otherwise the route handler (or the not-found fallback) still runs and
    /// writes to the same response.
    pub fn next(&mut self) {
        self.index += 1;
        while self.index >= 0 && (self.index as usize) < self.handlers.len() {
            let handler = Arc::clone(&self.handlers[self.index as usize]);
            handler.handle(self);
            self.index += 1;
        }
    }

    /// Prevents every handler that has not started yet from running.
    pub fn abort(&mut self) {
        self.index = ABORT_INDEX;
    }

    pub fn abort_with_status(&mut self, code: u16) {
        self.status(code);
        self.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.index >= ABORT_INDEX
    }

    pub fn method(&self) -> &str {
        &self.request.method
    }

    pub fn path(&self) -> &str {
        &self.request.path
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Path parameter bound by the router, or `""` when unset.
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.request.get_query(key)
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.request.get_header(key)
    }

    pub fn body(&self) -> &[u8] {
        &self.request.body
    }

    /// Stores a value for later handlers of the same request.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.keys.insert(key.to_owned(), value);
            }
            Err(err) => tracing::warn!(key, %err, "context value is not serializable"),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.keys.get(key)
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Throws away whatever the chain wrote so far, status included.
    pub fn reset_response(&mut self) {
        self.response.clear();
    }

    pub fn status_code(&self) -> u16 {
        self.response.status
    }

    pub fn status(&mut self, code: u16) {
        if !self.response.write_header(code) {
            tracing::warn!(
                path = %self.request.path,
                current = self.response.status,
                ignored = code,
                "status already written"
            );
        }
    }

    pub fn set_header(&mut self, key: &str, value: &str) {
        self.response.header(key, value);
    }

    pub fn string<S: AsRef<str>>(&mut self, code: u16, text: S) {
        self.response.content_type_if_absent(TEXT_PLAIN);
        self.status(code);
        self.response.write(text.as_ref().as_bytes());
    }

    pub fn json<T: Serialize>(&mut self, code: u16, obj: &T) {
        match serde_json::to_vec(obj) {
            Ok(body) => {
                self.response.content_type_if_absent(APPLICATION_JSON);
                self.status(code);
                self.response.write(&body);
            }
            Err(err) => {
                tracing::error!(%err, "JSON serialization failed");
                self.string(500, err.to_string());
            }
        }
    }

    pub fn html<S: AsRef<str>>(&mut self, code: u16, html: S) {
        self.response.content_type_if_absent(TEXT_HTML);
        self.status(code);
        self.response.write(html.as_ref().as_bytes());
    }

    pub fn xml<T: Serialize>(&mut self, code: u16, obj: &T) {
        match quick_xml::se::to_string(obj) {
            Ok(body) => {
                self.response.content_type_if_absent(APPLICATION_XML);
                self.status(code);
                self.response.write(body.as_bytes());
            }
            Err(err) => {
                tracing::error!(%err, "XML serialization failed");
                self.string(500, err.to_string());
            }
        }
    }

    pub fn data(&mut self, code: u16, data: &[u8]) {
        self.status(code);
        self.response.write(data);
    }

    /// Sends the file at `path` as an attachment named `filename`, or the
    /// file's own name when `filename` is `None` or empty.
    pub fn download<P: AsRef<Path>>(&mut self, path: P, filename: Option<&str>) {
        let path = path.as_ref();
        let name = match filename {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let escaped = urlencoding::encode(&name);
        let disposition = if *escaped == *name {
            format!("attachment; filename={}", name)
        } else {
            format!("attachment; filename={}; filename*=utf-8''{}", name, escaped)
        };

        self.set_header("Content-Description", "File Transfer");
        self.set_header("Content-Transfer-Encoding", "binary");
        self.set_header("Expires", "0");
        self.set_header("Cache-Control", "must-revalidate");
        self.set_header("Pragma", "public");
        self.set_header("Content-Type", "application/octet-stream");
        self.set_header("Content-Disposition", &disposition);
        static_files::serve_file(self, path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_func;
    use std::sync::Mutex;

    type Trace = Arc<Mutex<Vec<&'static str>>>;

    fn mark(trace: &Trace, step: &'static str) {
        trace.lock().unwrap().push(step);
    }

    fn wrapping(trace: &Trace, before: &'static str, after: &'static str) -> HandlerFunc {
        let trace = Arc::clone(trace);
        handler_func(move |ctx: &mut Context| {
            mark(&trace, before);
            ctx.next();
            mark(&trace, after);
        })
    }

    fn plain(trace: &Trace, step: &'static str) -> HandlerFunc {
        let trace = Arc::clone(trace);
        handler_func(move |_: &mut Context| mark(&trace, step))
    }

    #[test]
    fn chain_runs_as_an_onion() {
        let trace = Trace::default();
        let mut ctx = Context::new(Request::new("GET", "/"));
        ctx.set_handlers(vec![
            wrapping(&trace, "a in", "a out"),
            wrapping(&trace, "b in", "b out"),
            plain(&trace, "h"),
        ]);
        ctx.next();

        assert_eq!(
            *trace.lock().unwrap(),
            vec!["a in", "b in", "h", "b out", "a out"]
        );
    }

    #[test]
    fn handlers_that_skip_next_still_let_the_loop_continue() {
        let trace = Trace::default();
        let mut ctx = Context::new(Request::new("GET", "/"));
        ctx.set_handlers(vec![plain(&trace, "a"), plain(&trace, "b"), plain(&trace, "h")]);
        ctx.next();

        assert_eq!(*trace.lock().unwrap(), vec!["a", "b", "h"]);
    }

    #[test]
    fn abort_stops_downstream_but_upstream_resumes() {
        let trace = Trace::default();
        let aborting = {
            let trace = Arc::clone(&trace);
            handler_func(move |ctx: &mut Context| {
                mark(&trace, "b");
                ctx.abort();
            })
        };
        let mut ctx = Context::new(Request::new("GET", "/"));
        ctx.set_handlers(vec![wrapping(&trace, "a in", "a out"), aborting, plain(&trace, "h")]);
        ctx.next();

        assert_eq!(*trace.lock().unwrap(), vec!["a in", "b", "a out"]);
        assert!(ctx.is_aborted());
    }

    #[test]
    fn abort_after_next_does_not_rerun_anything() {
        let trace = Trace::default();
        let late_abort = {
            let trace = Arc::clone(&trace);
            handler_func(move |ctx: &mut Context| {
                ctx.next();
                mark(&trace, "b out");
                ctx.abort();
            })
        };
        let mut ctx = Context::new(Request::new("GET", "/"));
        ctx.set_handlers(vec![wrapping(&trace, "a in", "a out"), late_abort, plain(&trace, "h")]);
        ctx.next();

        assert_eq!(*trace.lock().unwrap(), vec!["a in", "h", "b out", "a out"]);
    }

    #[test]
    fn param_defaults_to_empty() {
        let mut ctx = Context::new(Request::new("GET", "/user/7"));
        ctx.set_params(HashMap::from([("id".to_string(), "7".to_string())]));
        assert_eq!(ctx.param("id"), "7");
        assert_eq!(ctx.param("name"), "");
    }

    #[test]
    fn status_is_written_once() {
        let mut ctx = Context::new(Request::new("GET", "/"));
        ctx.string(201, "created");
        ctx.string(500, " twice");
        assert_eq!(ctx.status_code(), 201);
        assert_eq!(ctx.response().body_string(), "created twice");
    }

    #[test]
    fn renderers_set_content_type() {
        let mut ctx = Context::new(Request::new("GET", "/"));
        let mut body = H::new();
        body.insert("name".into(), Value::from("trellis"));
        ctx.json(200, &body);

        assert_eq!(ctx.response().get_header("Content-Type"), Some(APPLICATION_JSON));
        assert_eq!(ctx.response().body_string(), r#"{"name":"trellis"}"#);

        let mut ctx = Context::new(Request::new("GET", "/"));
        ctx.html(200, "<b>hi</b>");
        assert_eq!(ctx.response().get_header("Content-Type"), Some(TEXT_HTML));
    }

    #[derive(Serialize)]
    struct User {
        name: String,
        age: u32,
    }

    #[test]
    fn xml_renders_the_value() {
        let mut ctx = Context::new(Request::new("GET", "/"));
        let user = User {
            name: "ada".to_string(),
            age: 36,
        };
        ctx.xml(201, &user);

        assert_eq!(ctx.status_code(), 201);
        assert_eq!(ctx.response().get_header("Content-Type"), Some(APPLICATION_XML));
        assert_eq!(
            ctx.response().body_string(),
            "<User><name>ada</name><age>36</age></User>"
        );
    }

    #[test]
    fn reset_response_drops_partial_output() {
        let mut ctx = Context::new(Request::new("GET", "/"));
        ctx.set_header("X-Partial", "1");
        ctx.string(200, "partial");
        ctx.reset_response();
        ctx.string(500, "failed");

        assert_eq!(ctx.status_code(), 500);
        assert_eq!(ctx.response().body_string(), "failed");
        assert_eq!(ctx.response().get_header("X-Partial"), None);
    }

    #[test]
    fn keys_pass_values_between_handlers() {
        let mut ctx = Context::new(Request::new("GET", "/"));
        ctx.set("user", "alice");
        assert_eq!(ctx.get("user"), Some(&Value::from("alice")));
        assert_eq!(ctx.get("missing"), None);
    }

    #[test]
    fn reset_clears_previous_request() {
        let mut ctx = Context::new(Request::new("GET", "/a"));
        ctx.set_params(HashMap::from([("id".to_string(), "1".to_string())]));
        ctx.string(404, "gone");
        ctx.abort();

        ctx.reset(Request::new("POST", "/b"));
        assert_eq!(ctx.method(), "POST");
        assert_eq!(ctx.param("id"), "");
        assert!(!ctx.is_aborted());
        assert!(!ctx.response().is_committed());
        assert_eq!(ctx.handlers_len(), 0);
    }
}
