//! File serving and rendering through full dispatch, including `Range`.

use litespeed::prelude::*;
use litespeed::testing::TestClient;
use litespeed::{App, FileServer, Renderer};
use std::collections::HashMap;
use std::path::PathBuf;

fn fixture_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("litespeed-it").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn media_app(root: PathBuf) -> TestClient {
    let app = App::builder()
        .route(
            RouteDef::new("media", move |req: &Request, args: &PathArgs| {
                let file = args
                    .get(0)
                    .ok_or_else(|| HandlerError::Failed("missing file".to_string()))?;
                FileServer::new(&root).serve(file, req.headers().get("range"))
            })
            .path(r"media/([\w\s./]+)")
            .methods([Method::Get])
            .no_end_slash(),
        )
        .build()
        .unwrap();
    TestClient::new(app)
}

fn get_with_range(client: &TestClient, target: &str, range: Option<&str>) -> u16 {
    let mut request = Request::new(Method::Get, target);
    if let Some(range) = range {
        request.headers_mut().insert("range", range);
    }
    client.send(&request).status()
}

#[test]
fn full_files_are_served_with_their_content_type() {
    let dir = fixture_dir("full");
    std::fs::write(dir.join("page.html"), "<h1>hi</h1>").unwrap();
    let client = media_app(dir);

    let response = client.get("/media/page.html");
    assert_eq!(response.status(), 200);
    assert_eq!(response.header("content-type"), Some("text/html"));
    assert_eq!(response.header("accept-ranges"), Some("bytes"));
    assert_eq!(response.text(), "<h1>hi</h1>");
}

#[test]
fn open_ended_ranges_answer_206_with_content_range() {
    let dir = fixture_dir("range");
    std::fs::write(dir.join("clip.bin"), (0..100u8).collect::<Vec<u8>>()).unwrap();
    let client = media_app(dir);

    let mut request = Request::new(Method::Get, "/media/clip.bin");
    request.headers_mut().insert("range", "bytes=10-");
    let response = client.send(&request);
    assert_eq!(response.status(), 206);
    assert_eq!(response.header("content-range"), Some("bytes 10-99/100"));
    assert_eq!(response.body().len(), 90);
    assert_eq!(response.body()[0], 10);
}

#[test]
fn closed_ranges_clamp_to_the_file_end() {
    let dir = fixture_dir("clamp");
    std::fs::write(dir.join("clip.bin"), vec![1u8; 50]).unwrap();
    let client = media_app(dir);

    let mut request = Request::new(Method::Get, "/media/clip.bin");
    request.headers_mut().insert("range", "bytes=40-200");
    let response = client.send(&request);
    assert_eq!(response.status(), 206);
    assert_eq!(response.header("content-range"), Some("bytes 40-49/50"));
    assert_eq!(response.body().len(), 10);
}

#[test]
fn unsatisfiable_ranges_answer_416() {
    let dir = fixture_dir("unsat");
    std::fs::write(dir.join("clip.bin"), vec![0u8; 100]).unwrap();
    let client = media_app(dir.clone());

    assert_eq!(
        get_with_range(&client, "/media/clip.bin", Some("bytes=500-")),
        416
    );
    assert_eq!(
        get_with_range(&client, "/media/clip.bin", Some("bytes=30-10")),
        416
    );
}

#[test]
fn malformed_and_multi_ranges_fall_back_to_the_full_file() {
    let dir = fixture_dir("malformed");
    std::fs::write(dir.join("clip.bin"), vec![0u8; 100]).unwrap();
    let client = media_app(dir);

    for range in ["bytes=0-10,20-30", "items=0-10", "bytes=oops-"] {
        let mut request = Request::new(Method::Get, "/media/clip.bin");
        request.headers_mut().insert("range", range);
        let response = client.send(&request);
        assert_eq!(response.status(), 200, "range {range:?}");
        assert_eq!(response.body().len(), 100);
    }
}

#[test]
fn missing_files_answer_404() {
    let dir = fixture_dir("missing");
    let client = media_app(dir);
    assert_eq!(client.get("/media/absent.bin").status(), 404);
}

#[test]
fn rendered_templates_substitute_tokens() {
    let dir = fixture_dir("render");
    std::fs::write(dir.join("page.html"), "<p>~~greeting~~, ~~who~~</p>").unwrap();
    let root = dir.clone();

    let app = App::builder()
        .route(RouteDef::new("page", move |req: &Request, _args: &PathArgs| {
            let mut vars = HashMap::new();
            vars.insert(
                "greeting".to_string(),
                req.query().get("greeting").unwrap_or("hello").to_string(),
            );
            Renderer::new(&root).render("page.html", &vars)
        }))
        .build()
        .unwrap();
    let client = TestClient::new(app);

    let response = client.get("/page/?greeting=howdy");
    assert_eq!(response.status(), 200);
    assert_eq!(response.header("content-type"), Some("text/html"));
    // substituted token replaced, unknown token untouched
    assert_eq!(response.text(), "<p>howdy, ~~who~~</p>");
}
