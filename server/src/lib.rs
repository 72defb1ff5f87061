use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use lexis_core::persist::{open_index, IndexPaths};
use lexis_core::{DocId, Normalizer, Snapshot};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

type ApiError = (StatusCode, String);

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub url: Option<String>,
    /// Cosine similarity rounded to four decimals.
    pub score: f64,
    pub snippet: Option<String>,
}

#[derive(Serialize)]
pub struct BooleanResponse {
    pub query: String,
    pub total_hits: usize,
    pub results: Vec<BooleanHit>,
}

#[derive(Serialize)]
pub struct BooleanHit {
    pub doc_id: DocId,
    pub url: Option<String>,
}

/// A snapshot together with the normalizer its corpus was built with.
pub struct LoadedIndex {
    pub snapshot: Snapshot,
    pub normalizer: Normalizer,
}

impl LoadedIndex {
    pub fn open(paths: &IndexPaths) -> Result<Self> {
        let (snapshot, normalizer) = open_index(paths)?;
        Ok(Self { snapshot, normalizer })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub index_paths: IndexPaths,
    /// Readers clone the inner `Arc`; a reload swaps it whole.
    pub index: Arc<RwLock<Arc<LoadedIndex>>>,
    pub admin_token: Option<String>,
}

impl AppState {
    fn current(&self) -> Arc<LoadedIndex> {
        self.index.read().clone()
    }
}

/// Router over `index_dir`; `/reload` is authorized by the `ADMIN_TOKEN` env var.
pub fn build_app(index_dir: String) -> Result<Router> {
    build_app_with(index_dir, std::env::var("ADMIN_TOKEN").ok())
}

pub fn build_app_with(index_dir: String, admin_token: Option<String>) -> Result<Router> {
    let index_paths = IndexPaths::new(&index_dir);
    let loaded = LoadedIndex::open(&index_paths)?;
    tracing::info!(num_docs = loaded.snapshot.corpus().len(), index_dir, "index loaded");
    let app_state = AppState { index_paths, index: Arc::new(RwLock::new(Arc::new(loaded))), admin_token };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/boolean", get(boolean_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

fn require_query(query: &str) -> Result<&str, ApiError> {
    let query = query.trim();
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "query must not be empty".into()));
    }
    Ok(query)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let query = require_query(&params.query)?;
    let index = state.current();
    let corpus = index.snapshot.corpus();

    let ranking = index.snapshot.rank(query, &index.normalizer);
    let total_hits = ranking.len();
    let k = params.k.clamp(1, 100);
    // Surface forms for highlighting
    let terms = index.normalizer.tokenize(query);
    let results = ranking
        .take(k)
        .map(|hit| SearchHit {
            doc_id: hit.doc_id,
            url: corpus.url(hit.doc_id).map(str::to_string),
            score: (hit.score * 10_000.0).round() / 10_000.0,
            snippet: corpus.get(hit.doc_id).and_then(|d| snippet(&d.text, &terms)),
        })
        .collect();

    Ok(Json(SearchResponse { query: query.to_string(), took_s: start.elapsed().as_secs_f64(), total_hits, results }))
}

pub async fn boolean_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<BooleanResponse>, ApiError> {
    let query = require_query(&params.query)?;
    let index = state.current();
    let docs = index
        .snapshot
        .search(query)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let corpus = index.snapshot.corpus();
    let results: Vec<BooleanHit> = docs
        .into_iter()
        .map(|doc_id| BooleanHit { doc_id, url: corpus.url(doc_id).map(str::to_string) })
        .collect();
    Ok(Json(BooleanResponse { query: query.to_string(), total_hits: results.len(), results }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<serde_json::Value>, ApiError> {
    let index = state.current();
    let corpus = index.snapshot.corpus();
    let doc = corpus.get(doc_id).ok_or((StatusCode::NOT_FOUND, "not found".to_string()))?;
    Ok(Json(serde_json::json!({
        "doc_id": doc_id,
        "url": corpus.url(doc_id),
        "text": doc.text,
        "lemmas": doc.lemma_groups.len(),
    })))
}

async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let paths = state.index_paths.clone();
    let loaded = tokio::task::spawn_blocking(move || LoadedIndex::open(&paths))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?;
    let num_docs = loaded.snapshot.corpus().len();
    *state.index.write() = Arc::new(loaded);
    tracing::info!(num_docs, "index reloaded");
    Ok(Json(serde_json::json!({ "num_docs": num_docs })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

/// Up to 300 characters around the first matching term, terms wrapped in `<em>`.
fn snippet(text: &str, terms: &[String]) -> Option<String> {
    if text.is_empty() { return None; }
    let chars: Vec<char> = text.chars().collect();
    let first_idx = terms
        .iter()
        .filter(|t| !t.trim().is_empty())
        .find_map(|t| find_case_insensitive(text, t));
    let window: String = match first_idx {
        Some(idx) => {
            let end = (idx + 200).min(chars.len());
            let start = idx.saturating_sub(100).min(end);
            chars[start..end].iter().collect()
        }
        None => chars.iter().take(200).collect(),
    };
    Some(highlight_terms(&window, terms))
}

/// One char per char, so offsets line up with the original text.
fn fold_case(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Character offset of the first case-insensitive match.
fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let h: Vec<char> = haystack.chars().map(fold_case).collect();
    let n: Vec<char> = needle.chars().map(fold_case).collect();
    if n.is_empty() {
        return None;
    }
    h.windows(n.len()).position(|w| w == n.as_slice())
}

fn highlight_terms(snippet: &str, terms: &[String]) -> String {
    let mut s = snippet.to_string();
    for t in terms {
        if t.trim().is_empty() { continue; }
        let Ok(pat) = regex::RegexBuilder::new(&regex::escape(t)).case_insensitive(true).build() else {
            continue;
        };
        s = pat.replace_all(&s, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).to_string();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_centers_on_first_term() {
        let text = format!("{} Кот спит {}", "а".repeat(150), "б".repeat(300));
        let s = snippet(&text, &["кот".to_string()]).unwrap();
        // 100 characters of context before the match: 99 letters and a space
        assert!(s.starts_with(&format!("{} <em>Кот</em> спит", "а".repeat(99))));
        assert_eq!(s.chars().count(), 300 + "<em></em>".len());
    }

    #[test]
    fn match_offset_counts_original_chars() {
        // 'İ' lowercases to two chars
        assert_eq!(find_case_insensitive("İİ Кот", "кот"), Some(3));
        assert_eq!(find_case_insensitive("кот", ""), None);
        assert_eq!(find_case_insensitive("кот", "котики"), None);
        let text = format!("{}{} Кот", "İ".repeat(150), "а".repeat(10));
        let s = snippet(&text, &["кот".to_string()]).unwrap();
        assert!(s.starts_with(&format!("{}{} <em>Кот</em>", "İ".repeat(89), "а".repeat(10))));
    }

    #[test]
    fn snippet_without_match_takes_prefix() {
        let s = snippet("мышь ест сыр", &["кот".to_string()]).unwrap();
        assert_eq!(s, "мышь ест сыр");
        assert!(snippet("", &[]).is_none());
    }
}
