//! A minimal "Hello, World!" server.
//!
//! Responds with "Hello, World!" on `GET /`; every other path gets the
//! built-in 404 response.

use trellis::logging::init_logging;
use trellis::{Context, Engine};

fn main() -> Result<(), trellis::ServerError> {
    init_logging();
    let mut app = Engine::new();

    app.get("/", |ctx: &mut Context| ctx.string(200, "Hello, World!"))?;

    app.run("127.0.0.1:3000")
}
