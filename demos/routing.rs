//! Routing example
//!
//! Shows literal routes, `:name` and `*name` parameters, query strings,
//! route groups and a static directory.

use trellis::logging::init_logging;
use trellis::{json, Context, Engine, H};

fn main() -> Result<(), trellis::ServerError> {
    init_logging();
    let mut app = Engine::new();

    app.get("/", |ctx: &mut Context| {
        ctx.html(200, "<h1>Welcome to trellis</h1>");
    })?;

    // Route with a path parameter
    app.get("/users/:id", |ctx: &mut Context| {
        let body = format!("User ID: {}", ctx.param("id"));
        ctx.string(200, body);
    })?;

    // Catch-all parameter and query string
    app.get("/files/*filepath", |ctx: &mut Context| {
        let mut body = H::new();
        body.insert("file".into(), json!(ctx.param("filepath")));
        body.insert("download".into(), json!(ctx.query("download").is_some()));
        ctx.json(200, &body);
    })?;

    // Group routes under /api
    {
        let mut api = app.group("/api");
        api.get("/status", |ctx: &mut Context| {
            ctx.json(200, &json!({ "status": "operational", "version": "0.1.0" }));
        })?;

        let mut v1 = api.group("/v1");
        v1.post("/users", |ctx: &mut Context| {
            let size = ctx.body().len();
            ctx.json(201, &json!({ "received_bytes": size }));
        })?;
    }

    app.static_dir("/assets", "./public")?;

    app.run("127.0.0.1:3000")
}
