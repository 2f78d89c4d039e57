//! HTTP request handlers and shared application state.

use crate::api::errors::ApiError;
use crate::api::metrics;
use crate::api::models::*;
use crate::orchestrator::SearchPipeline;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use lexrag_core::config;
use lexrag_core::corpus::CorpusSnapshot;
use lexrag_core::search::types::SearchRequest;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state passed to every handler via Axum's `State`
/// extractor. Everything here is built once at startup and read-only.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SearchPipeline>,
    pub corpus: Arc<CorpusSnapshot>,
    pub prometheus_handle: PrometheusHandle,
    pub start_time: Instant,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        collections_count: state.corpus.counts().len(),
        total_documents: state.corpus.total_documents(),
    };
    (StatusCode::OK, Json(response))
}

/// `GET /api/search`
///
/// Query-string contract: `q`, `top_k`, `threshold`, plus the `hybrid`,
/// `self_healing`, `fitness_threshold`, and `max_retries` knobs. Always
/// answers with a (possibly empty) ranked list unless the lexical index
/// itself is unusable.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    if params.q.trim().is_empty() {
        return Err(ApiError::BadRequest("q must not be empty".into()));
    }
    if params.q.len() > config::MAX_QUERY_LEN {
        return Err(ApiError::BadRequest(format!(
            "q must be at most {} bytes",
            config::MAX_QUERY_LEN
        )));
    }
    if params.top_k == 0 || params.top_k > config::MAX_TOP_K {
        return Err(ApiError::BadRequest(format!(
            "top_k must be 1-{}",
            config::MAX_TOP_K
        )));
    }
    if !(0.0..=1.0).contains(&params.threshold) {
        return Err(ApiError::BadRequest("threshold must be in [0, 1]".into()));
    }

    let request = SearchRequest {
        query: params.q.clone(),
        top_k: params.top_k,
        score_threshold: params.threshold,
        use_hybrid: params.hybrid,
        use_self_healing: params.self_healing,
        fitness_threshold: params.fitness_threshold,
        max_retries: params.max_retries,
    };

    let outcome = state.pipeline.search(request).await?;

    let mode = match (params.hybrid, params.self_healing) {
        (true, true) => "hybrid+healing",
        (true, false) => "hybrid",
        (false, true) => "lexical+healing",
        (false, false) => "lexical",
    };
    metrics::record_search(
        mode,
        outcome.attempts,
        outcome.results.len(),
        outcome.low_confidence,
    );

    let items: Vec<SearchItem> = outcome
        .results
        .iter()
        .map(|r| SearchItem {
            text: r.document.text.clone(),
            metadata: metadata_to_json(&r.document.metadata),
            score: r.final_score,
        })
        .collect();

    Ok(Json(SearchResponse {
        query: params.q,
        count: items.len(),
        low_confidence: outcome.low_confidence,
        items,
    }))
}

/// `GET /api/collections`
pub async fn collections(State(state): State<AppState>) -> Json<CollectionsResponse> {
    let collections: Vec<CollectionInfo> = state
        .corpus
        .counts()
        .into_iter()
        .map(|(kind, count)| CollectionInfo {
            name: kind.as_str().to_string(),
            document_count: count,
        })
        .collect();
    Json(CollectionsResponse {
        total_documents: state.corpus.total_documents(),
        collections,
    })
}

/// `GET /metrics`
pub async fn metrics_endpoint(State(state): State<AppState>) -> String {
    state.prometheus_handle.render()
}
