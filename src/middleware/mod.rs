//! Stock middlewares. Both are ordinary chain elements: register them with
//! [`RouterGroup::middleware`](crate::group::RouterGroup::middleware) or
//! [`Engine::middleware`](crate::app::Engine::middleware).

use crate::context::Context;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

/// Logs status, method, path and latency of every request.
pub fn logger() -> impl Fn(&mut Context) + Send + Sync + 'static {
    |ctx: &mut Context| {
        let start = Instant::now();
        ctx.next();
        tracing::info!(
            "[{}] {} {} in {:?}",
            ctx.status_code(),
            ctx.method(),
            ctx.path(),
            start.elapsed()
        );
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Turns a panic raised further down the chain into a `500` response.
///
/// Anything the chain wrote before panicking is discarded.
///
/// Register it first so it wraps everything else.
pub fn recovery() -> impl Fn(&mut Context) + Send + Sync + 'static {
    |ctx: &mut Context| {
        let result = panic::catch_unwind(AssertUnwindSafe(|| ctx.next()));
        if let Err(payload) = result {
            let message = panic_message(payload.as_ref());
            tracing::error!(path = %ctx.path(), panic = %message, "recovered from panic");
            ctx.abort();
            ctx.reset_response();
            ctx.string(500, "Internal Server Error");
        }
    }
}
