use crate::context::Context;
use std::sync::Arc;

/// Anything that can take part in a request chain.
///
/// Middleware and route handlers share this single shape: they receive the
/// request's [`Context`] and drive the rest of the chain through
/// [`Context::next`] or stop it with [`Context::abort`].
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, ctx: &mut Context);
}

impl<F> Handler for F
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    fn handle(&self, ctx: &mut Context) {
        (self)(ctx)
    }
}

pub type HandlerFunc = Arc<dyn Handler>;

pub(crate) fn handler_func<F>(handler: F) -> HandlerFunc
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Arc::new(handler)
}

/// Fallback appended to the chain when no route matches.
///
/// It runs after every selected middleware, including one that already wrote
/// a response without calling `next`. Middleware that answers a request on
/// its own should call [`Context::abort`] to keep this from appending a 404.
pub(crate) fn not_found(ctx: &mut Context) {
    let body = format!("404 NOT FOUND: {}\n", ctx.path());
    ctx.string(404, body);
}
