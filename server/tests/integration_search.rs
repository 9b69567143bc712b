use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use search_core::persist::{save_generation, IndexPaths, MetaFile};
use search_core::{CanonicalUrl, Corpus, Generation, RankConfig, Tokenizer};
use serde_json::Value;
use server::{router, AppState};
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

fn url(s: &str) -> CanonicalUrl {
    CanonicalUrl::parse(s).unwrap()
}

/// home links to rust and tour; tour links to rust. Both rust pages match "rust".
fn tiny_corpus(extra_page: bool) -> Corpus {
    let mut corpus = Corpus::new();
    let home = url("https://example.edu/");
    let rust = url("https://example.edu/rust");
    let tour = url("https://example.edu/tour");
    corpus.resolve(&home);
    corpus.record_page(0, "Home".into(), "department home page".into(), None);
    let (_, r, _) = corpus.add_link(&home, &rust);
    corpus.add_anchor_text(r, "rust course");
    let (_, t, _) = corpus.add_link(&home, &tour);
    corpus.add_link(&tour, &rust);
    corpus.record_page(r, "Rust".into(), "rust is great . rust systems programming".into(), None);
    corpus.record_page(t, "Tour".into(), "a tour of rust for beginners".into(), None);
    if extra_page {
        let news = url("https://example.edu/news");
        let (_, n, _) = corpus.add_link(&home, &news);
        corpus.record_page(n, "News".into(), "rust news".into(), None);
    }
    corpus
}

fn write_index(dir: &Path, corpus: Corpus) {
    let generation = Generation::build(corpus, &RankConfig::default());
    let meta = MetaFile::describe(&generation, Tokenizer::default(), "2024-01-01T00:00:00Z".into());
    save_generation(&IndexPaths::new(dir), &generation, &meta).unwrap();
}

fn app(dir: &Path, token: Option<&str>) -> Router {
    router(AppState::open(dir, token.map(str::to_string)).unwrap())
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Bytes) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn health_is_ok() {
    let dir = tempdir().unwrap();
    write_index(dir.path(), tiny_corpus(false));
    let (status, body) = get(app(dir.path(), None), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn search_returns_ranked_results_with_snippets() {
    let dir = tempdir().unwrap();
    write_index(dir.path(), tiny_corpus(false));

    let (status, body) = get(app(dir.path(), None), "/search?q=rust&k=2").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["query"], "rust");
    assert_eq!(json["total_hits"], 2);
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    // the rust page is both the stronger lexical match and the link target of tour
    assert_eq!(results[0]["url"], "https://example.edu/rust");
    assert_eq!(results[0]["rank"], 1);
    assert_eq!(results[1]["url"], "https://example.edu/tour");
    assert!(results[0]["score"].as_f64().unwrap() >= results[1]["score"].as_f64().unwrap());
    let snippet = results[0]["snippet"].as_str().unwrap();
    assert!(snippet.contains("<em>rust</em>"));
}

#[tokio::test]
async fn k_is_clamped_and_blank_queries_are_empty() {
    let dir = tempdir().unwrap();
    write_index(dir.path(), tiny_corpus(false));

    let (_, body) = get(app(dir.path(), None), "/search?q=rust&k=0").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"].as_array().unwrap().len(), 1);

    let (status, body) = get(app(dir.path(), None), "/search?q=").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_hits"], 0);
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn doc_endpoint() {
    let dir = tempdir().unwrap();
    write_index(dir.path(), tiny_corpus(false));

    let (status, body) = get(app(dir.path(), None), "/doc/0").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["title"], "Home");
    assert_eq!(json["links"].as_array().unwrap().len(), 2);

    let (status, _) = get(app(dir.path(), None), "/doc/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reload_requires_token_and_swaps_generation() {
    let dir = tempdir().unwrap();
    write_index(dir.path(), tiny_corpus(false));
    let app = app(dir.path(), Some("secret"));

    let (status, _) = send(app.clone(), Request::post("/index/reload").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let wrong = Request::post("/index/reload").header("X-ADMIN-TOKEN", "nope").body(Body::empty()).unwrap();
    assert_eq!(send(app.clone(), wrong).await.0, StatusCode::UNAUTHORIZED);

    write_index(dir.path(), tiny_corpus(true));
    let ok = Request::post("/index/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, body) = send(app.clone(), ok).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["num_docs"], 4);
    assert_eq!(json["index"]["documents"], 4);
    assert_eq!(json["index"]["edges"], 4);

    let (_, body) = get(app, "/search?q=rust&k=10").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_hits"], 3);
}

#[tokio::test]
async fn reload_without_configured_token_is_refused() {
    let dir = tempdir().unwrap();
    write_index(dir.path(), tiny_corpus(false));
    let req = Request::post("/index/reload").header("X-ADMIN-TOKEN", "").body(Body::empty()).unwrap();
    assert_eq!(send(app(dir.path(), None), req).await.0, StatusCode::UNAUTHORIZED);
}
