//! External lookup adapter for the authoritative law portal.
//!
//! The portal is strictly additive: it shares the query contract of the
//! lexical index but may fail, time out, or rate-limit. Transient failures
//! are retried inside the adapter with exponential backoff; permanent
//! failures are not. Either way the orchestrator degrades to "zero
//! candidates from this source" — the portal is never a hard dependency.

use async_trait::async_trait;
use lexrag_core::config;
use lexrag_core::document::{Document, MetadataValue, SourceKind};
use lexrag_core::search::types::Candidate;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure of a remote lookup.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Network-level or rate-limit failure; worth retrying.
    #[error("transient portal failure: {0}")]
    Transient(String),
    /// Bad request or malformed reply; retrying cannot help.
    #[error("permanent portal failure: {0}")]
    Permanent(String),
}

impl RemoteError {
    /// Returns `true` for failures the adapter may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Transient(_))
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            RemoteError::Transient(e.to_string())
        } else {
            RemoteError::Permanent(e.to_string())
        }
    }
}

/// Classify a non-success HTTP status. Rate limiting and server-side errors
/// are transient; everything else is permanent.
fn status_error(status: StatusCode) -> Option<RemoteError> {
    if status.is_success() {
        return None;
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Some(RemoteError::Transient(format!("portal returned {status}")))
    } else {
        Some(RemoteError::Permanent(format!("portal returned {status}")))
    }
}

/// A remote search source with the same query contract as the lexical
/// index.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Provenance name recorded by rank fusion.
    fn name(&self) -> &'static str;

    /// Ranked candidates for `text` in `collection`, at most `n`.
    async fn query(
        &self,
        collection: SourceKind,
        text: &str,
        n: usize,
    ) -> Result<Vec<Candidate>, RemoteError>;
}

#[derive(Debug, Deserialize)]
struct PortalItem {
    id: String,
    text: String,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PortalReply {
    #[serde(default)]
    items: Vec<PortalItem>,
}

/// HTTP client for the national law portal search API.
///
/// Queries `GET {base}/DRF/lawSearch.do` with `OC` (caller id), `target`,
/// `type=JSON`, `query`, and `display` parameters. Statutes map to
/// `target=law`, case law to `target=prec`; the portal has no platform-
/// policy corpus, so that collection short-circuits to zero candidates.
pub struct LawPortalClient {
    client: reqwest::Client,
    base_url: String,
    caller_id: String,
}

impl LawPortalClient {
    /// Creates a client for the portal at `base_url`.
    pub fn new(base_url: impl Into<String>, caller_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            caller_id: caller_id.into(),
        }
    }

    fn target(collection: SourceKind) -> Option<&'static str> {
        match collection {
            SourceKind::Statute => Some("law"),
            SourceKind::CaseLaw => Some("prec"),
            SourceKind::PlatformPolicy => None,
        }
    }

    async fn fetch_once(
        &self,
        target: &str,
        text: &str,
        n: usize,
    ) -> Result<PortalReply, RemoteError> {
        let url = format!("{}/DRF/lawSearch.do", self.base_url);
        let display = n.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("OC", self.caller_id.as_str()),
                ("target", target),
                ("type", "JSON"),
                ("query", text),
                ("display", display.as_str()),
            ])
            .timeout(Duration::from_secs(config::REMOTE_TIMEOUT_SECS))
            .send()
            .await
            .map_err(RemoteError::from_reqwest)?;

        if let Some(err) = status_error(response.status()) {
            return Err(err);
        }

        response
            .json::<PortalReply>()
            .await
            .map_err(|e| RemoteError::Permanent(format!("portal reply did not parse: {e}")))
    }
}

#[async_trait]
impl RemoteSource for LawPortalClient {
    fn name(&self) -> &'static str {
        "law-portal"
    }

    async fn query(
        &self,
        collection: SourceKind,
        text: &str,
        n: usize,
    ) -> Result<Vec<Candidate>, RemoteError> {
        let Some(target) = Self::target(collection) else {
            return Ok(Vec::new());
        };

        let mut attempt = 0u32;
        let reply = loop {
            attempt += 1;
            match self.fetch_once(target, text, n).await {
                Ok(reply) => break reply,
                Err(e) if e.is_transient() && attempt < config::REMOTE_MAX_ATTEMPTS => {
                    let backoff =
                        Duration::from_millis(config::REMOTE_BACKOFF_BASE_MS << (attempt - 1));
                    tracing::debug!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "transient portal failure, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        };

        Ok(reply
            .items
            .into_iter()
            .take(n)
            .enumerate()
            .map(|(i, item)| {
                let metadata: HashMap<String, MetadataValue> = item
                    .metadata
                    .into_iter()
                    .filter_map(|(k, v)| MetadataValue::from_json(v).map(|mv| (k, mv)))
                    .collect();
                Candidate {
                    document: Arc::new(Document::new(item.id, item.text, metadata, collection)),
                    rank: i + 1,
                    raw_score: item.score.unwrap_or_else(|| 1.0 / (i + 1) as f32),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Clone)]
    struct Script {
        hits: Arc<AtomicU32>,
        failures_before_success: u32,
        failure_status: StatusCode,
    }

    async fn portal_handler(State(script): State<Script>) -> axum::response::Response {
        let n = script.hits.fetch_add(1, Ordering::SeqCst);
        if n < script.failures_before_success {
            (script.failure_status, "unavailable").into_response()
        } else {
            Json(serde_json::json!({
                "items": [
                    {"id": "R1", "text": "판결요지: 저작권 침해", "score": 0.91,
                     "metadata": {"court": "대법원"}},
                    {"id": "R2", "text": "판결요지: 초상권"}
                ]
            }))
            .into_response()
        }
    }

    async fn spawn_portal(failures_before_success: u32, failure_status: StatusCode) -> (String, Arc<AtomicU32>) {
        let hits = Arc::new(AtomicU32::new(0));
        let script = Script {
            hits: hits.clone(),
            failures_before_success,
            failure_status,
        };
        let app = Router::new()
            .route("/DRF/lawSearch.do", get(portal_handler))
            .with_state(script);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), hits)
    }

    #[tokio::test]
    async fn test_query_parses_candidates() {
        let (base, hits) = spawn_portal(0, StatusCode::OK).await;
        let client = LawPortalClient::new(base, "tester");
        let candidates = client.query(SourceKind::CaseLaw, "저작권", 5).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].document.id, "R1");
        assert_eq!(candidates[0].rank, 1);
        assert!((candidates[0].raw_score - 0.91).abs() < 1e-6);
        assert_eq!(candidates[1].rank, 2);
        // Missing score falls back to reciprocal rank.
        assert!((candidates[1].raw_score - 0.5).abs() < 1e-6);
        assert_eq!(candidates[0].document.collection, SourceKind::CaseLaw);
    }

    #[tokio::test]
    async fn test_transient_failures_retried() {
        let (base, hits) = spawn_portal(2, StatusCode::INTERNAL_SERVER_ERROR).await;
        let client = LawPortalClient::new(base, "tester");
        let candidates = client.query(SourceKind::Statute, "저작권", 5).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3, "two failures then success");
        assert!(!candidates.is_empty());
    }

    #[tokio::test]
    async fn test_transient_failures_exhaust_attempts() {
        let (base, hits) = spawn_portal(10, StatusCode::TOO_MANY_REQUESTS).await;
        let client = LawPortalClient::new(base, "tester");
        let err = client.query(SourceKind::Statute, "저작권", 5).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(hits.load(Ordering::SeqCst), config::REMOTE_MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let (base, hits) = spawn_portal(10, StatusCode::BAD_REQUEST).await;
        let client = LawPortalClient::new(base, "tester");
        let err = client.query(SourceKind::Statute, "저작권", 5).await.unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_platform_policy_has_no_portal_target() {
        let client = LawPortalClient::new("http://127.0.0.1:1", "tester");
        let candidates = client
            .query(SourceKind::PlatformPolicy, "policy", 5)
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_status_classification() {
        assert!(status_error(StatusCode::OK).is_none());
        assert!(status_error(StatusCode::TOO_MANY_REQUESTS)
            .unwrap()
            .is_transient());
        assert!(status_error(StatusCode::BAD_GATEWAY).unwrap().is_transient());
        assert!(!status_error(StatusCode::NOT_FOUND).unwrap().is_transient());
        assert!(!status_error(StatusCode::BAD_REQUEST).unwrap().is_transient());
    }
}
