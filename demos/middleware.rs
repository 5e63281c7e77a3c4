//! Middleware example
//!
//! - Panic recovery and request logging on every route
//! - A token check that aborts the chain for the `/admin` group

use std::time::Instant;
use trellis::logging::init_logging;
use trellis::middleware::{logger, recovery};
use trellis::{json, Context, Engine};

// Records how long the rest of the chain took.
fn timing(ctx: &mut Context) {
    let start = Instant::now();
    ctx.next();
    let elapsed = format!("{}us", start.elapsed().as_micros());
    ctx.set_header("X-Response-Time", &elapsed);
}

fn require_token(ctx: &mut Context) {
    let authorized = ctx
        .header("authorization")
        .map_or(false, |token| token.starts_with("Bearer "));
    if !authorized {
        ctx.json(401, &json!({ "error": "Authentication required" }));
        ctx.abort();
        return;
    }
    ctx.next();
}

fn main() -> Result<(), trellis::ServerError> {
    init_logging();
    let mut app = Engine::new();

    app.middleware(recovery()).middleware(logger()).middleware(timing);

    app.get("/public", |ctx: &mut Context| {
        ctx.string(200, "This is a public endpoint");
    })?;

    let mut admin = app.group("/admin");
    admin.middleware(require_token);
    admin.get("/profile", |ctx: &mut Context| {
        ctx.json(200, &json!({ "name": "User", "email": "user@example.com" }));
    })?;

    app.run("127.0.0.1:3000")
}
