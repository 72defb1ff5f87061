use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use lexis_core::persist::{save_corpus, save_document, save_url_index, IndexPaths};
use lexis_core::{Corpus, Normalizer};
use serde_json::Value;
use std::collections::BTreeMap;
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_index(dir: &std::path::Path) {
    let paths = IndexPaths::new(dir);
    let normalizer = Normalizer::default();
    let mut urls = BTreeMap::new();
    urls.insert(1, "https://example.com/1".to_string());
    urls.insert(2, "https://example.com/2".to_string());
    let corpus = Corpus::from_documents(vec![
        normalizer.normalize(1, "Кот и собака дружат"),
        normalizer.normalize(2, "Кот спит"),
        normalizer.normalize(3, "Мышь ест сыр"),
    ])
    .with_urls(urls);

    for doc in corpus.documents() {
        save_document(&paths, doc).unwrap();
    }
    save_url_index(&paths, corpus.urls()).unwrap();
    save_corpus(&paths, &corpus).unwrap();
}

fn encode(query: &str) -> String {
    query
        .bytes()
        .map(|b| if b.is_ascii_alphanumeric() { (b as char).to_string() } else { format!("%{b:02X}") })
        .collect()
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    call(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

fn app() -> (tempfile::TempDir, Router) {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let app = lexis_server::build_app(dir.path().to_string_lossy().to_string()).unwrap();
    (dir, app)
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let (_dir, app) = app();
    let (status, json) = get(app, &format!("/search?query={}&k=5", encode("собаки"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 1);
    let hit = &json["results"][0];
    assert_eq!(hit["doc_id"], 1);
    assert_eq!(hit["url"], "https://example.com/1");
    assert!(hit["score"].as_f64().unwrap() > 0.0);
    assert!(hit["snippet"].as_str().unwrap().contains("Кот и собака"));
}

#[tokio::test]
async fn search_orders_by_similarity() {
    let (_dir, app) = app();
    let (status, json) = get(app, &format!("/search?query={}", encode("кот спит"))).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<u64> = json["results"].as_array().unwrap().iter().map(|h| h["doc_id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(json["results"][1]["snippet"], "<em>Кот</em> и собака дружат");
}

#[tokio::test]
async fn search_without_known_terms_is_empty() {
    let (_dir, app) = app();
    let (status, json) = get(app, &format!("/search?query={}", encode("жираф"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 0);
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let (_dir, app) = app();
    let (status, _) = get(app.clone(), "/search?query=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(app, "/boolean").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn boolean_search_returns_matching_set() {
    let (_dir, app) = app();
    let (status, json) = get(app, &format!("/boolean?query={}", encode("кот AND NOT собака"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 1);
    assert_eq!(json["results"][0]["doc_id"], 2);
    assert_eq!(json["results"][0]["url"], "https://example.com/2");
}

#[tokio::test]
async fn malformed_boolean_query_reports_reason() {
    let (_dir, app) = app();
    let (status, body) = get(app, &format!("/boolean?query={}", encode("(кот OR сыр"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.as_str().unwrap().contains("never closed"));
}

#[tokio::test]
async fn doc_lookup() {
    let (_dir, app) = app();
    let (status, json) = get(app.clone(), "/doc/3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["text"], "Мышь ест сыр");
    assert!(json["url"].is_null());
    let (status, _) = get(app, "/doc/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reload_requires_admin_token() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let app = lexis_server::build_app_with(dir.path().to_string_lossy().to_string(), None).unwrap();
    let req = Request::post("/reload").body(Body::empty()).unwrap();
    let (status, _) = call(app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn reload_swaps_in_rebuilt_corpus() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let app = lexis_server::build_app_with(dir.path().to_string_lossy().to_string(), Some("secret".into())).unwrap();

    let (status, json) = get(app.clone(), &format!("/boolean?query={}", encode("жираф"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 0);

    let normalizer = Normalizer::default();
    let rebuilt = Corpus::from_documents(vec![normalizer.normalize(4, "Жираф спит")]);
    save_corpus(&IndexPaths::new(dir.path()), &rebuilt).unwrap();

    let wrong = Request::post("/reload").header("X-ADMIN-TOKEN", "guess").body(Body::empty()).unwrap();
    let (status, _) = call(app.clone(), wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (_, json) = get(app.clone(), &format!("/boolean?query={}", encode("жираф"))).await;
    assert_eq!(json["total_hits"], 0);

    let req = Request::post("/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, json) = call(app.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["num_docs"], 1);

    let (status, json) = get(app.clone(), &format!("/boolean?query={}", encode("жираф"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 1);
    assert_eq!(json["results"][0]["doc_id"], 4);
    let (status, _) = get(app, "/doc/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
