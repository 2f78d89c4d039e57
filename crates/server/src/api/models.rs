//! Request and response data transfer objects for the REST API.
//!
//! All types derive `Serialize` and/or `Deserialize` for JSON marshalling
//! via Axum. Search parameters arrive as query-string fields.

use lexrag_core::config;
use lexrag_core::document::MetadataValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Convert typed document metadata to JSON for API responses.
pub fn metadata_to_json(
    map: &HashMap<String, MetadataValue>,
) -> HashMap<String, serde_json::Value> {
    map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
}

/// Query-string parameters of `GET /api/search`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Free-text query.
    pub q: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default = "default_hybrid")]
    pub hybrid: bool,
    #[serde(default)]
    pub self_healing: bool,
    #[serde(default = "default_fitness_threshold")]
    pub fitness_threshold: f32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_top_k() -> usize {
    config::DEFAULT_TOP_K
}
fn default_threshold() -> f32 {
    config::DEFAULT_SCORE_THRESHOLD
}
fn default_hybrid() -> bool {
    true
}
fn default_fitness_threshold() -> f32 {
    config::DEFAULT_FITNESS_THRESHOLD
}
fn default_max_retries() -> u32 {
    config::DEFAULT_MAX_RETRIES
}

/// One passage in a search response.
#[derive(Debug, Serialize)]
pub struct SearchItem {
    pub text: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub score: f32,
}

/// Response body for `GET /api/search`.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub count: usize,
    /// Set when self-healing ended below the fitness threshold; the caller
    /// should warn that results may be weak.
    pub low_confidence: bool,
    pub items: Vec<SearchItem>,
}

/// Summary info for a collection in stats responses.
#[derive(Debug, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub document_count: usize,
}

/// Response body for `GET /api/collections`.
#[derive(Debug, Serialize)]
pub struct CollectionsResponse {
    pub collections: Vec<CollectionInfo>,
    pub total_documents: usize,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub collections_count: usize,
    pub total_documents: usize,
}
