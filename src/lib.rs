//! # Trellis
//!
//! An embeddable HTTP request-dispatch engine.
//!
//! ## Features
//!
//! - Trie routing with `:name` and `*name` path parameters, one trie per method
//! - Route groups sharing a prefix and a middleware list
//! - Middleware chains driven by a shared cursor (`next` / `abort`)
//! - Pooled per-request contexts
//! - Text, JSON, XML, HTML and raw-bytes responses, file downloads and
//!   static directories
//! - A small tokio-based HTTP/1.1 listener
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use trellis::app::Engine;
//! use trellis::context::Context;
//! use trellis::json;
//!
//! fn main() -> Result<(), trellis::ServerError> {
//!     let mut app = Engine::new();
//!
//!     app.get("/", |ctx: &mut Context| {
//!         ctx.json(200, &json!({ "message": "Hello, World!" }));
//!     })?;
//!
//!     app.run("127.0.0.1:3000")
//! }
//! ```
//!
//! ## Middleware Usage
//!
//! ```rust
//! use trellis::app::Engine;
//! use trellis::context::Context;
//! use trellis::middleware::{logger, recovery};
//!
//! let mut app = Engine::new();
//! app.middleware(recovery()).middleware(logger());
//!
//! let mut admin = app.group("/admin");
//! admin.middleware(|ctx: &mut Context| {
//!     if ctx.header("authorization").is_none() {
//!         ctx.abort_with_status(401);
//!         return;
//!     }
//!     ctx.next();
//! });
//! ```

pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod group;
pub mod handler;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod pool;
pub mod router;
mod static_files;
pub extern crate serde_json;

// Reexport serde_json
pub use serde_json::{json, Value};

pub use app::Engine;
pub use context::{Context, H};
pub use error::{ServerError, ServerResult};
pub use group::RouterGroup;
pub use handler::{Handler, HandlerFunc};
pub use http::{Request, Response};
pub use router::Router;
