use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use regex::{Regex, RegexBuilder};
use search_core::persist::{open_engine, IndexPaths};
use search_core::{DocId, LiveEngine, RankConfig, SearchEngine, SearchError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const MAX_K: usize = 100;
const SNIPPET_BEFORE: usize = 100;
const SNIPPET_LEN: usize = 200;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    /// Candidates that survived reranking, before truncation to `k`.
    pub total_hits: usize,
    pub results: Vec<SearchResult>,
}

#[derive(Serialize)]
pub struct SearchResult {
    pub rank: usize,
    pub doc_id: DocId,
    pub title: String,
    pub url: String,
    pub score: f64,
    pub snippet: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LiveEngine>,
    pub index_dir: PathBuf,
    pub rank_config: RankConfig,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn open(index_dir: impl Into<PathBuf>, admin_token: Option<String>) -> Result<Self> {
        let index_dir = index_dir.into();
        let rank_config = RankConfig::default();
        let engine = open_engine(&IndexPaths::new(&index_dir), &rank_config)?;
        Ok(Self { engine: Arc::new(LiveEngine::new(engine)), index_dir, rank_config, admin_token })
    }
}

/// Size of the generation currently being served.
#[derive(Debug, Serialize)]
pub struct IndexSummary {
    pub documents: usize,
    pub indexed: u32,
    pub edges: usize,
}

impl IndexSummary {
    pub fn of(engine: &SearchEngine) -> Self {
        let generation = engine.generation();
        Self {
            documents: generation.corpus.len(),
            indexed: generation.num_indexed(),
            edges: generation.corpus.graph().len(),
        }
    }
}

/// Wires the routes. `CORS_ALLOW_ORIGIN` restricts origins.
pub fn router(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let k = params.k.clamp(1, MAX_K);
    // one generation for the whole request, even if a reload lands meanwhile
    let engine = state.engine.current();
    let ranked = engine.rank(&params.q).map_err(search_error)?;
    let total_hits = ranked.len();
    let hits = engine.hits(ranked, k);

    let highlighter = Highlighter::new(&params.q);
    let corpus = &engine.generation().corpus;
    let results = hits
        .into_iter()
        .enumerate()
        .map(|(i, hit)| {
            let snippet = corpus.get(hit.doc_id).and_then(|doc| highlighter.snippet(&doc.body_text));
            SearchResult { rank: i + 1, doc_id: hit.doc_id, title: hit.title, url: hit.url, score: hit.score, snippet }
        })
        .collect();

    let took_s = start.elapsed().as_secs_f64();
    tracing::info!(query = %params.q, k, total_hits, took_s, "search");
    Ok(Json(SearchResponse { query: params.q, took_s, total_hits, results }))
}

fn search_error(e: SearchError) -> (StatusCode, String) {
    match e {
        SearchError::IndexNotReady => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    }
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<DocId>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let engine = state.engine.current();
    let corpus = &engine.generation().corpus;
    let Some(doc) = corpus.get(doc_id) else {
        return Err((StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" }))));
    };
    let links: Vec<&str> = corpus
        .graph()
        .children(doc_id)
        .iter()
        .filter_map(|&c| corpus.get(c))
        .map(|d| d.url.as_str())
        .collect();
    Ok(Json(serde_json::json!({
        "doc_id": doc_id,
        "title": doc.title,
        "url": doc.url,
        "anchor_text": doc.anchor_text,
        "text": doc.body_text,
        "links": links,
        "duplicate_of": doc.duplicate_of,
    })))
}

/// Re-reads the index directory and swaps the new generation in. Queries
/// already running finish on the generation they started with.
async fn reload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let paths = IndexPaths::new(&state.index_dir);
    let config = state.rank_config.clone();
    let engine = tokio::task::spawn_blocking(move || open_engine(&paths, &config))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            tracing::warn!(error = %e, "reload failed, keeping current generation");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("reload failed: {e:#}"))
        })?;
    let summary = IndexSummary::of(&engine);
    let previous = state.engine.replace(engine);
    tracing::info!(
        documents = summary.documents,
        indexed = summary.indexed,
        edges = summary.edges,
        previous = previous.generation().num_indexed(),
        "index generation swapped"
    );
    Ok(Json(serde_json::json!({ "status": "reloaded", "num_docs": summary.indexed, "index": summary })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
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

/// Case-insensitive matcher for the raw query words.
struct Highlighter {
    pattern: Option<Regex>,
}

impl Highlighter {
    fn new(query: &str) -> Self {
        let alternatives: Vec<String> = query.split_whitespace().map(regex::escape).collect();
        let pattern = if alternatives.is_empty() {
            None
        } else {
            RegexBuilder::new(&alternatives.join("|")).case_insensitive(true).build().ok()
        };
        Self { pattern }
    }

    /// A window of `text` around the first match with every match wrapped in `<em>`.
    /// Falls back to the leading text when nothing matches.
    fn snippet(&self, text: &str) -> Option<String> {
        if text.is_empty() {
            return None;
        }
        let first = self.pattern.as_ref().and_then(|p| p.find(text)).map(|m| m.start());
        let window = match first {
            Some(idx) => {
                let start = floor_boundary(text, idx.saturating_sub(SNIPPET_BEFORE));
                let end = floor_boundary(text, (idx + SNIPPET_LEN).min(text.len()));
                &text[start..end]
            }
            None => &text[..floor_boundary(text, SNIPPET_LEN.min(text.len()))],
        };
        Some(self.highlight(window))
    }

    fn highlight(&self, s: &str) -> String {
        match &self.pattern {
            Some(p) => p.replace_all(s, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).into_owned(),
            None => s.to_string(),
        }
    }
}

fn floor_boundary(s: &str, mut idx: usize) -> usize {
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_centers_on_first_match() {
        let text = format!("{} rust systems programming {}", "x ".repeat(100), "y ".repeat(200));
        let h = Highlighter::new("Rust programming");
        let s = h.snippet(&text).unwrap();
        assert!(s.contains("<em>rust</em> systems <em>programming</em>"));
        assert!(s.len() < text.len());
    }

    #[test]
    fn snippet_without_match_uses_leading_text() {
        let h = Highlighter::new("absent");
        assert_eq!(h.snippet("short body").as_deref(), Some("short body"));
        assert_eq!(h.snippet(""), None);
        assert_eq!(Highlighter::new("   ").snippet("plain").as_deref(), Some("plain"));
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        let text = "é".repeat(300);
        let s = Highlighter::new("zzz").snippet(&text).unwrap();
        assert!(s.len() <= SNIPPET_LEN);
    }
}
