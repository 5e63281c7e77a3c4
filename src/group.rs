//! Route groups: a shared path prefix plus the middleware applied to it.
//!
//! ```rust
//! use trellis::app::Engine;
//! use trellis::context::Context;
//!
//! # fn main() -> trellis::error::ServerResult<()> {
//! let mut engine = Engine::new();
//! let mut api = engine.group("/api");
//! api.middleware(|ctx: &mut Context| ctx.next());
//! api.get("/users/:id", |ctx: &mut Context| {
//!     let id = ctx.param("id").to_owned();
//!     ctx.string(200, id);
//! })?;
//!
//! let v2 = api.group("/v2");
//! assert_eq!(v2.prefix(), "/api/v2");
//! # Ok(())
//! # }
//! ```

use crate::app::Engine;
use crate::context::Context;
use crate::error::ServerResult;
use crate::handler::{handler_func, HandlerFunc};
use crate::static_files;
use std::path::PathBuf;

/// Group data owned by the [`Engine`]; groups are kept in creation order.
#[derive(Clone, Default)]
pub(crate) struct GroupRecord {
    pub(crate) prefix: String,
    pub(crate) middlewares: Vec<HandlerFunc>,
    /// Only used for diagnostics; dispatch never walks parent links.
    pub(crate) parent: Option<usize>,
}

/// Registration handle for one group of an [`Engine`].
pub struct RouterGroup<'e> {
    engine: &'e mut Engine,
    index: usize,
}

impl<'e> RouterGroup<'e> {
    pub(crate) fn new(engine: &'e mut Engine, index: usize) -> Self {
        Self { engine, index }
    }

    fn record(&self) -> &GroupRecord {
        &self.engine.groups[self.index]
    }

    /// Creates a child group whose prefix extends this one with `suffix`.
    ///
    /// The child starts without middleware; the parent's middleware still
    /// applies to it at dispatch time through prefix matching.
    pub fn group(&mut self, suffix: &str) -> RouterGroup<'_> {
        let prefix = format!("{}{}", self.record().prefix, suffix);
        let index = self.engine.push_group(GroupRecord {
            prefix,
            middlewares: Vec::new(),
            parent: Some(self.index),
        });
        RouterGroup {
            engine: &mut *self.engine,
            index,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.record().prefix
    }

    pub fn parent_prefix(&self) -> Option<&str> {
        let parent = self.record().parent?;
        Some(&self.engine.groups[parent].prefix)
    }

    /// Appends a middleware to this group only.
    pub fn middleware<F>(&mut self, middleware: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.use_handler(handler_func(middleware))
    }

    pub fn use_handler(&mut self, middleware: HandlerFunc) -> &mut Self {
        self.engine.groups[self.index].middlewares.push(middleware);
        self
    }

    pub fn middleware_count(&self) -> usize {
        self.record().middlewares.len()
    }

    pub fn add_route<F>(&mut self, method: &str, suffix: &str, handler: F) -> ServerResult<&mut Self>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.handle(method, suffix, handler_func(handler))
    }

    pub fn handle(&mut self, method: &str, suffix: &str, handler: HandlerFunc) -> ServerResult<&mut Self> {
        let pattern = format!("{}{}", self.record().prefix, suffix);
        tracing::debug!("Route {:>4} - {}", method, pattern);
        self.engine.router.add_route(method, &pattern, handler)?;
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

    pub fn head<F>(&mut self, path: &str, handler: F) -> ServerResult<&mut Self>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route("HEAD", path, handler)
    }

    pub fn options<F>(&mut self, path: &str, handler: F) -> ServerResult<&mut Self>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_route("OPTIONS", path, handler)
    }

    /// Serves files below `root` at `relative/*filepath`.
    pub fn static_dir<P: Into<PathBuf>>(&mut self, relative: &str, root: P) -> ServerResult<&mut Self> {
        let pattern = format!("{}/*filepath", relative.trim_end_matches('/'));
        self.handle("GET", &pattern, static_files::serve_dir(root.into()))
    }
}
