//! Engine is the main entry point of the crate.
//!
//! It owns the [`Router`], the flat list of route groups and the pool of
//! request contexts. Registration needs `&mut Engine`; dispatch only needs
//! `&Engine`, so a fully configured engine can be shared between threads.
//!
//! # Examples
//!
//! ```rust
//! use trellis::app::Engine;
//! use trellis::context::Context;
//! use trellis::http::Request;
//!
//! # fn main() -> trellis::error::ServerResult<()> {
//! let mut engine = Engine::new();
//! engine.get("/hello/:name", |ctx: &mut Context| {
//!     let greeting = format!("hello {}", ctx.param("name"));
//!     ctx.string(200, greeting);
//! })?;
//!
//! let response = engine.handle(Request::new("GET", "/hello/trellis"));
//! assert_eq!(response.body_string(), "hello trellis");
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::context::Context;
use crate::error::{ServerError, ServerResult};
use crate::group::{GroupRecord, RouterGroup};
use crate::handler::HandlerFunc;
use crate::http::{reason_phrase, Request, Response};
use crate::middleware::panic_message;
use crate::pool::ContextPool;
use crate::router::Router;
use std::io::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;

const ROOT_GROUP: usize = 0;

pub struct Engine {
    pub(crate) router: Router,
    /// Every group in creation order; index 0 is the root group.
    pub(crate) groups: Vec<GroupRecord>,
    pool: ContextPool,
    config: Config,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            router: Router::new(),
            groups: vec![GroupRecord::default()],
            pool: ContextPool::new(config.context_pool_capacity),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn max_connections(&mut self, max_connections: usize) -> &mut Self {
        self.config.max_connections = max_connections;
        self
    }

    pub fn max_body_size(&mut self, max_body_size: usize) -> &mut Self {
        self.config.max_body_size = max_body_size;
        self
    }

    pub fn context_pool_capacity(&mut self, capacity: usize) -> &mut Self {
        self.config.context_pool_capacity = capacity;
        self.pool.set_capacity(capacity);
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub(crate) fn push_group(&mut self, record: GroupRecord) -> usize {
        self.groups.push(record);
        self.groups.len() - 1
    }

    /// Prefixes of all groups, root first.
    pub fn group_prefixes(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.prefix.as_str()).collect()
    }

    /// Registration handle for the root group.
    pub fn root(&mut self) -> RouterGroup<'_> {
        RouterGroup::new(self, ROOT_GROUP)
    }

    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        let index = self.push_group(GroupRecord {
            prefix: prefix.to_owned(),
            middlewares: Vec::new(),
            parent: Some(ROOT_GROUP),
        });
        RouterGroup::new(self, index)
    }

    /// Adds a middleware to the root group, which applies to every request.
    pub fn middleware<F>(&mut self, middleware: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root().middleware(middleware);
        self
    }

    pub fn use_handler(&mut self, middleware: HandlerFunc) -> &mut Self {
        self.root().use_handler(middleware);
        self
    }

    pub fn add_route<F>(&mut self, method: &str, pattern: &str, handler: F) -> ServerResult<&mut Self>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.root().add_route(method, pattern, handler)?;
        Ok(self)
    }

    pub fn get<F>(&mut self, path: &str, handler: F) -> ServerResult<&mut Self>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route("GET", path, handler)
    }

    pub fn post<F>(&mut self, path: &str, handler: F) -> ServerResult<&mut Self>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route("POST", path, handler)
    }

    pub fn put<F>(&mut self, path: &str, handler: F) -> ServerResult<&mut Self>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route("PUT", path, handler)
    }

    pub fn patch<F>(&mut self, path: &str, handler: F) -> ServerResult<&mut Self>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route("PATCH", path, handler)
    }

    pub fn delete<F>(&mut self, path: &str, handler: F) -> ServerResult<&mut Self>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route("DELETE", path, handler)
    }

    pub fn static_dir<P: Into<PathBuf>>(&mut self, relative: &str, root: P) -> ServerResult<&mut Self> {
        self.root().static_dir(relative, root)?;
        Ok(self)
    }

    /// Middleware of every group whose prefix is a string prefix of `path`,
    /// in group creation order.
    fn middlewares_for(&self, path: &str) -> Vec<HandlerFunc> {
        self.groups
            .iter()
            .filter(|group| path.starts_with(group.prefix.as_str()))
            .flat_map(|group| group.middlewares.iter().cloned())
            .collect()
    }

    /// Dispatches one request and returns what its chain wrote.
    pub fn handle(&self, request: Request) -> Response {
        let mut ctx = self.pool.acquire(request);
        let middlewares = self.middlewares_for(ctx.path());
        ctx.set_handlers(middlewares);
        self.router.handle(&mut ctx);
        ctx.take_response()
    }

    /// Starts the HTTP server and blocks the current thread.
    ///
    /// # Arguments
    /// * `addr` - Address to listen on (e.g. "127.0.0.1:3000")
    pub fn run(self, addr: &str) -> ServerResult<()> {
        let runtime = Runtime::new()?;
        runtime.block_on(async {
            let listener = TcpListener::bind(addr).await?;
            tracing::info!("Server running on http://{}", addr);
            self.serve(listener).await
        })
    }

    /// Accepts connections from `listener` until it fails.
    pub async fn serve(self, listener: TcpListener) -> ServerResult<()> {
        let engine = Arc::new(self);
        let permits = Arc::new(Semaphore::new(engine.config.max_connections.max(1)));

        loop {
            let permit = Arc::clone(&permits)
                .acquire_owned()
                .await
                .map_err(|e| ServerError::InternalError(e.to_string()))?;

            match listener.accept().await {
                Ok((stream, peer)) => {
                    let engine = Arc::clone(&engine);
                    tokio::spawn(async move {
                        if let Err(e) = engine.handle_connection(stream).await {
                            tracing::warn!(%peer, "Connection error: {}", e);
                        }
                        drop(permit);
                    });
                }
                Err(e) => tracing::error!("Connection failed: {}", e),
            }
        }
    }

    async fn handle_connection<S>(self: Arc<Self>, mut stream: S) -> Result<(), Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let response = match self.read_request(&mut stream).await {
            Ok(Some(request)) => self.dispatch_blocking(request).await,
            Ok(None) => return Ok(()),
            Err(err) => Response::error(err),
        };
        write_response(&mut stream, &response).await
    }

    async fn read_request<S>(&self, stream: &mut S) -> ServerResult<Option<Request>>
    where
        S: AsyncRead + Unpin,
    {
        let mut buf_reader = BufReader::new(stream);
        let request_line = self.read_head_line(&mut buf_reader).await?;

        if request_line.trim().is_empty() {
            return Ok(None);
        }

        let mut parts = request_line.split_whitespace();
        let method = parts
            .next()
            .ok_or_else(|| ServerError::BadRequest("Invalid request line".to_string()))?;
        let target = parts
            .next()
            .ok_or_else(|| ServerError::BadRequest("Invalid request line".to_string()))?;
        let mut request = Request::new(method, target);

        loop {
            let line = self.read_head_line(&mut buf_reader).await?;
            if line.trim().is_empty() {
                break;
            }
            if request.headers.len() >= self.config.max_header_count {
                return Err(ServerError::BadRequest("Too many headers".to_string()));
            }
            if let Some((key, value)) = line.trim().split_once(':') {
                request
                    .headers
                    .insert(key.trim().to_lowercase(), value.trim().to_string());
            }
        }

        if let Some(length) = request.headers.get("content-length") {
            let length = length
                .parse::<usize>()
                .map_err(|_| ServerError::BadRequest("Invalid Content-Length".to_string()))?;
            if length > self.config.max_body_size {
                return Err(ServerError::PayloadTooLarge(length));
            }
            let mut body = Vec::with_capacity(length);
            buf_reader.take(length as u64).read_to_end(&mut body).await?;
            if body.len() < length {
                return Err(ServerError::BadRequest(format!(
                    "Body ended after {} of {} bytes",
                    body.len(),
                    length
                )));
            }
            request.body = body;
        }

        Ok(Some(request))
    }

    /// Reads one line of the request head, at most `max_line_length` bytes.
    async fn read_head_line<R>(&self, reader: &mut R) -> ServerResult<String>
    where
        R: AsyncBufRead + Unpin,
    {
        let limit = self.config.max_line_length;
        let mut line = Vec::new();
        reader
            .take(limit as u64 + 1)
            .read_until(b'\n', &mut line)
            .await?;
        if line.len() > limit {
            return Err(ServerError::BadRequest("Header line too long".to_string()));
        }
        String::from_utf8(line)
            .map_err(|_| ServerError::BadRequest("Request head is not valid UTF-8".to_string()))
    }

    // Handlers are synchronous and may block, so they run off the async
    // workers. A panic that escapes the chain surfaces as a JoinError.
    async fn dispatch_blocking(self: &Arc<Self>, request: Request) -> Response {
        let engine = Arc::clone(self);
        match tokio::task::spawn_blocking(move || engine.handle(request)).await {
            Ok(response) => response,
            Err(err) if err.is_panic() => {
                let message = panic_message(err.into_panic().as_ref());
                tracing::error!(panic = %message, "handler panicked");
                Response::error(ServerError::PanicError(message))
            }
            Err(err) => Response::error(ServerError::InternalError(err.to_string())),
        }
    }
}

async fn write_response<S>(stream: &mut S, response: &Response) -> Result<(), Error>
where
    S: AsyncWrite + Unpin,
{
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        response.status,
        reason_phrase(response.status)
    );
    for (name, value) in response.headers.iter() {
        if name.eq_ignore_ascii_case("content-length") || name.eq_ignore_ascii_case("connection") {
            continue;
        }
        head += &format!("{}: {}\r\n", name, value);
    }
    head += &format!(
        "Date: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        httpdate::fmt_http_date(std::time::SystemTime::now()),
        response.body.len()
    );

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&response.body).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parse(engine: &Engine, raw: &[u8]) -> ServerResult<Option<Request>> {
        let mut stream = raw;
        engine.read_request(&mut stream).await
    }

    #[tokio::test]
    async fn parses_head_and_body() {
        let engine = Engine::new();
        let request = parse(
            &engine,
            b"POST /echo?x=1 HTTP/1.1\r\nHost: test\r\nContent-Length: 3\r\n\r\nabc",
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/echo");
        assert_eq!(request.get_query("x"), Some("1"));
        assert_eq!(request.get_header("host"), Some("test"));
        assert_eq!(request.body, b"abc");
    }

    #[tokio::test]
    async fn empty_stream_yields_no_request() {
        let engine = Engine::new();
        assert!(parse(&engine, b"").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn overlong_lines_are_rejected() {
        let mut engine = Engine::new();
        engine.config.max_line_length = 32;
        let raw = format!("GET / HTTP/1.1\r\nX-Long: {}\r\n\r\n", "a".repeat(64));

        let err = parse(&engine, raw.as_bytes()).await.unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn non_utf8_head_is_a_bad_request() {
        let engine = Engine::new();
        let err = parse(&engine, b"GET /\xff\xfe HTTP/1.1\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }

    #[tokio::test]
    async fn short_body_is_rejected() {
        let engine = Engine::new();
        let err = parse(&engine, b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc")
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }

    #[tokio::test]
    async fn too_many_headers_is_a_bad_request() {
        let mut engine = Engine::new();
        engine.config.max_header_count = 1;
        let err = parse(&engine, b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\n\r\n")
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }
}
