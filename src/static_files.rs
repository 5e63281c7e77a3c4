use crate::context::Context;
use crate::handler::{handler_func, HandlerFunc};
use httpdate::HttpDate;
use std::fs;
use std::path::{Path, PathBuf};

fn contains_dot_dot(path: &str) -> bool {
    path.contains("..") && path.split(['/', '\\']).any(|part| part == "..")
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}

/// Handler serving the file named by the `filepath` parameter from `root`.
pub(crate) fn serve_dir(root: PathBuf) -> HandlerFunc {
    handler_func(move |ctx: &mut Context| {
        let name = ctx.param("filepath").to_owned();
        if contains_dot_dot(ctx.path()) || contains_dot_dot(&name) {
            ctx.string(400, "invalid URL path\n");
            return;
        }
        serve_file(ctx, &root.join(&name));
    })
}

/// Writes the file at `path`, keeping a `Content-Type` chosen earlier.
pub(crate) fn serve_file(ctx: &mut Context, path: &Path) {
    let metadata = match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => {
            ctx.string(404, "404 page not found\n");
            return;
        }
    };

    let modified = metadata.modified().ok().map(HttpDate::from);
    let since = ctx
        .header("if-modified-since")
        .and_then(|value| value.parse::<HttpDate>().ok());
    if let (Some(modified), Some(since)) = (modified, since) {
        if modified <= since {
            ctx.status(304);
            return;
        }
    }

    match fs::read(path) {
        Ok(contents) => {
            ctx.response_mut().content_type_if_absent(content_type(path));
            if let Some(modified) = modified {
                ctx.set_header("Last-Modified", &modified.to_string());
            }
            ctx.data(200, &contents);
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "failed to read static file");
            ctx.string(500, "500 internal server error\n");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_dot_detection() {
        assert!(contains_dot_dot("/static/../secret"));
        assert!(contains_dot_dot("a\\..\\b"));
        assert!(!contains_dot_dot("/static/a..b.css"));
        assert!(!contains_dot_dot("/static/css/site.css"));
    }

    #[test]
    fn content_type_by_extension() {
        assert_eq!(content_type(Path::new("a/site.css")), "text/css; charset=utf-8");
        assert_eq!(content_type(Path::new("logo.png")), "image/png");
        assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
    }
}
