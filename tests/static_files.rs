use std::fs;
use std::time::{Duration, SystemTime};
use trellis::{Context, Engine, Request};

fn engine_for(dir: &std::path::Path) -> Engine {
    let mut engine = Engine::new();
    engine.static_dir("/assets", dir).unwrap();
    engine
}

#[test]
fn serves_files_below_the_root() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("css")).unwrap();
    fs::write(dir.path().join("css/site.css"), "body {}").unwrap();
    let engine = engine_for(dir.path());

    let response = engine.handle(Request::new("GET", "/assets/css/site.css"));
    assert_eq!(response.status, 200);
    assert_eq!(response.body_string(), "body {}");
    assert_eq!(
        response.get_header("Content-Type"),
        Some("text/css; charset=utf-8")
    );
    assert!(response.get_header("Last-Modified").is_some());
}

#[test]
fn missing_files_and_directories_are_404() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("css")).unwrap();
    let engine = engine_for(dir.path());

    assert_eq!(
        engine.handle(Request::new("GET", "/assets/missing.js")).status,
        404
    );
    assert_eq!(engine.handle(Request::new("GET", "/assets/css")).status, 404);
}

#[test]
fn parent_components_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_for(dir.path());

    let response = engine.handle(Request::new("GET", "/assets/../Cargo.toml"));
    assert_eq!(response.status, 400);
}

#[test]
fn fresh_copies_are_not_resent() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("app.js"), "run()").unwrap();
    let engine = engine_for(dir.path());

    let later = SystemTime::now() + Duration::from_secs(3600);
    let request = Request::new("GET", "/assets/app.js")
        .with_header("If-Modified-Since", &httpdate::fmt_http_date(later));
    let response = engine.handle(request);
    assert_eq!(response.status, 304);
    assert!(response.body.is_empty());

    let earlier = SystemTime::UNIX_EPOCH + Duration::from_secs(1);
    let request = Request::new("GET", "/assets/app.js")
        .with_header("If-Modified-Since", &httpdate::fmt_http_date(earlier));
    assert_eq!(engine.handle(request).status, 200);
}

#[test]
fn download_sends_an_attachment() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("data.csv");
    fs::write(&report, "a,b\n1,2\n").unwrap();

    let mut engine = Engine::new();
    let named = report.clone();
    engine
        .get("/report", move |ctx: &mut Context| {
            ctx.download(&named, Some("report 2024.csv"))
        })
        .unwrap();
    engine
        .get("/raw", move |ctx: &mut Context| ctx.download(&report, None))
        .unwrap();

    let response = engine.handle(Request::new("GET", "/report"));
    assert_eq!(response.status, 200);
    assert_eq!(response.body_string(), "a,b\n1,2\n");
    assert_eq!(
        response.get_header("Content-Type"),
        Some("application/octet-stream")
    );
    assert_eq!(
        response.get_header("Content-Disposition"),
        Some("attachment; filename=report 2024.csv; filename*=utf-8''report%202024.csv")
    );
    assert_eq!(response.get_header("Content-Transfer-Encoding"), Some("binary"));

    let response = engine.handle(Request::new("GET", "/raw"));
    assert_eq!(
        response.get_header("Content-Disposition"),
        Some("attachment; filename=data.csv")
    );
}

#[test]
fn download_of_missing_file_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone.bin");
    let mut engine = Engine::new();
    engine
        .get("/gone", move |ctx: &mut Context| ctx.download(&missing, None))
        .unwrap();

    assert_eq!(engine.handle(Request::new("GET", "/gone")).status, 404);
}
