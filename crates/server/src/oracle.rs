//! Judgment oracles: context fitness evaluation and query expansion.
//!
//! Both oracles sit behind traits so the orchestrator never probes for
//! capabilities at runtime: the evaluator is an external judgment model
//! reached over HTTP, and the expander has two named variants — a
//! deterministic legal synonym table and an LLM-backed broadener sharing the
//! evaluator's HTTP plumbing. Oracle failures never fail a search call: the
//! orchestrator treats a failed evaluation as passing and a failed expansion
//! as the end of the retry loop.

use async_trait::async_trait;
use lexrag_core::config;
use lexrag_core::search::types::{FitnessVerdict, RankedResult};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure of a judgment-model call.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The endpoint was unreachable or returned a non-success status.
    #[error("judgment endpoint failure: {0}")]
    Endpoint(String),
    /// The model replied with something unparseable.
    #[error("malformed judgment reply: {0}")]
    Malformed(String),
}

/// Failure of a query expansion.
#[derive(Debug, Error)]
pub enum ExpandError {
    /// No variant distinct from every previously tried query exists. Ends
    /// the retry loop; not an error to the search caller.
    #[error("no further query expansion available")]
    NoExpansionAvailable,
    /// The LLM-backed expander's endpoint failed.
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// Judges the adequacy of a retrieved context relative to a query.
#[async_trait]
pub trait FitnessEvaluator: Send + Sync {
    /// Returns an adequacy scalar in `[0, 1]` with an optional rationale.
    async fn evaluate(
        &self,
        query: &str,
        results: &[RankedResult],
    ) -> Result<FitnessVerdict, OracleError>;
}

/// Produces a broadened query distinct from every query already tried.
#[async_trait]
pub trait QueryExpander: Send + Sync {
    /// `prior` holds every normalized query of this session, including
    /// `original`.
    async fn expand(&self, original: &str, prior: &HashSet<String>) -> Result<String, ExpandError>;
}

/// Chat-completions HTTP client shared by the LLM-backed oracles.
pub struct JudgmentClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl JudgmentClient {
    /// Creates a client for a chat-completions style endpoint.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    async fn complete(&self, system: &str, user: String) -> Result<String, OracleError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0.0,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(Duration::from_secs(config::ORACLE_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| OracleError::Endpoint(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Endpoint(format!(
                "judgment endpoint returned {status}"
            )));
        }

        #[derive(Deserialize)]
        struct Completion {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct Message {
            content: String,
        }

        let completion: Completion = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| OracleError::Malformed("reply carried no choices".into()))
    }
}

const EVALUATOR_SYSTEM: &str = "You judge whether retrieved legal passages \
are adequate to answer a question. Reply with a single JSON object \
{\"score\": <number between 0 and 1>, \"rationale\": <short string>} and \
nothing else.";

const EXPANDER_SYSTEM: &str = "You broaden legal search queries with \
synonyms and related terms. Reply with the broadened query on a single \
line and nothing else.";

/// Extract the first JSON object embedded in a model reply.
fn embedded_json(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Parse a fitness verdict out of a model reply.
fn parse_verdict(reply: &str) -> Result<FitnessVerdict, OracleError> {
    #[derive(Deserialize)]
    struct Reply {
        score: f32,
        #[serde(default)]
        rationale: Option<String>,
    }

    let json = embedded_json(reply)
        .ok_or_else(|| OracleError::Malformed(format!("no JSON object in reply: {reply:.80}")))?;
    let parsed: Reply =
        serde_json::from_str(json).map_err(|e| OracleError::Malformed(e.to_string()))?;
    Ok(FitnessVerdict {
        score: parsed.score.clamp(0.0, 1.0),
        rationale: parsed.rationale,
    })
}

/// LLM-backed fitness evaluator.
pub struct LlmEvaluator {
    client: Arc<JudgmentClient>,
}

impl LlmEvaluator {
    /// Wraps a judgment client.
    pub fn new(client: Arc<JudgmentClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FitnessEvaluator for LlmEvaluator {
    async fn evaluate(
        &self,
        query: &str,
        results: &[RankedResult],
    ) -> Result<FitnessVerdict, OracleError> {
        let passages = if results.is_empty() {
            "(no passages were retrieved)".to_string()
        } else {
            results
                .iter()
                .map(|r| {
                    let text: String = r.document.text.chars().take(400).collect();
                    format!("- [{}] {}", r.document.collection, text)
                })
                .collect::<Vec<_>>()
                .join("\n")
        };
        let user = format!("Question:\n{query}\n\nRetrieved passages:\n{passages}");
        let reply = self.client.complete(EVALUATOR_SYSTEM, user).await?;
        parse_verdict(&reply)
    }
}

/// LLM-backed query expander.
pub struct LlmExpander {
    client: Arc<JudgmentClient>,
}

impl LlmExpander {
    /// Wraps a judgment client.
    pub fn new(client: Arc<JudgmentClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueryExpander for LlmExpander {
    async fn expand(&self, original: &str, prior: &HashSet<String>) -> Result<String, ExpandError> {
        let tried = prior
            .iter()
            .map(|q| format!("- {q}"))
            .collect::<Vec<_>>()
            .join("\n");
        let user = format!(
            "Original query:\n{original}\n\nAlready tried (produce something different):\n{tried}"
        );
        let reply = self.client.complete(EXPANDER_SYSTEM, user).await?;
        let candidate = normalize_query(&reply);
        if candidate.is_empty() || prior.contains(&candidate) {
            return Err(ExpandError::NoExpansionAvailable);
        }
        Ok(candidate)
    }
}

/// Collapse internal whitespace and trim. Prior-query comparisons and the
/// orchestrator both work on this normal form.
pub fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Legal synonym table: term → broadening synonyms, in priority order.
const LEGAL_SYNONYMS: &[(&str, &[&str])] = &[
    ("인앱결제", &["앱 내 구매", "인앱 구매", "IAP"]),
    ("개인정보", &["사용자 데이터", "프라이버시"]),
    ("저작권", &["저작물", "지적재산권", "copyright"]),
    ("어린이", &["아동", "미성년자"]),
    ("구독", &["자동 갱신", "정기 결제"]),
    ("환불", &["취소", "반품"]),
    ("광고", &["애드", "advertisement"]),
    ("결제", &["구매", "payment"]),
    ("copyright", &["intellectual property", "licensing"]),
    ("privacy", &["personal data", "data protection"]),
    ("refund", &["cancellation", "chargeback"]),
    ("subscription", &["auto-renewal", "recurring billing"]),
    ("photo", &["image", "picture"]),
    ("payment", &["purchase", "billing"]),
];

/// Deterministic expander over the built-in legal synonym table.
///
/// Appends progressively more synonyms of the terms found in the original
/// query, returning the first variant not yet tried. Queries containing no
/// known term cannot be broadened.
#[derive(Debug, Default)]
pub struct SynonymExpander;

#[async_trait]
impl QueryExpander for SynonymExpander {
    async fn expand(&self, original: &str, prior: &HashSet<String>) -> Result<String, ExpandError> {
        let lowered = original.to_lowercase();
        let mut extras: Vec<&str> = Vec::new();
        for (term, synonyms) in LEGAL_SYNONYMS {
            if !lowered.contains(term) {
                continue;
            }
            for &synonym in *synonyms {
                if !lowered.contains(&synonym.to_lowercase()) && !extras.contains(&synonym) {
                    extras.push(synonym);
                }
            }
        }

        for depth in 1..=extras.len() {
            let candidate =
                normalize_query(&format!("{original} {}", extras[..depth].join(" ")));
            if !prior.contains(&candidate) {
                return Ok(candidate);
            }
        }
        Err(ExpandError::NoExpansionAvailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};
    use lexrag_core::document::{Document, SourceKind};
    use std::collections::HashMap;

    fn ranked(id: &str, text: &str) -> RankedResult {
        RankedResult {
            document: Arc::new(Document::new(
                id,
                text,
                HashMap::new(),
                SourceKind::Statute,
            )),
            final_score: 0.8,
            rank: 1,
        }
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  a   b\tc "), "a b c");
        assert_eq!(normalize_query(""), "");
    }

    #[test]
    fn test_parse_verdict_plain_json() {
        let v = parse_verdict(r#"{"score": 0.35, "rationale": "missing case law"}"#).unwrap();
        assert!((v.score - 0.35).abs() < 1e-6);
        assert_eq!(v.rationale.as_deref(), Some("missing case law"));
    }

    #[test]
    fn test_parse_verdict_wrapped_in_prose() {
        let v = parse_verdict("Sure, here is my judgment: {\"score\": 0.9} hope that helps").unwrap();
        assert!((v.score - 0.9).abs() < 1e-6);
        assert!(v.rationale.is_none());
    }

    #[test]
    fn test_parse_verdict_clamps_range() {
        assert!((parse_verdict(r#"{"score": 1.7}"#).unwrap().score - 1.0).abs() < 1e-6);
        assert!(parse_verdict(r#"{"score": -0.2}"#).unwrap().score == 0.0);
    }

    #[test]
    fn test_parse_verdict_rejects_garbage() {
        assert!(parse_verdict("no json here").is_err());
        assert!(parse_verdict("{not json}").is_err());
    }

    #[tokio::test]
    async fn test_synonym_expander_produces_distinct_variants() {
        let expander = SynonymExpander;
        let original = normalize_query("앱 저작권 침해");
        let mut prior: HashSet<String> = HashSet::from([original.clone()]);

        let first = expander.expand(&original, &prior).await.unwrap();
        assert_ne!(first, original);
        assert!(first.starts_with(&original));
        prior.insert(first.clone());

        let second = expander.expand(&original, &prior).await.unwrap();
        assert_ne!(second, first);
        assert!(!prior.contains(&second));
    }

    #[tokio::test]
    async fn test_synonym_expander_exhausts() {
        let expander = SynonymExpander;
        let original = normalize_query("환불 규정");
        let mut prior: HashSet<String> = HashSet::from([original.clone()]);

        // Drain every variant the table can produce.
        while let Ok(next) = expander.expand(&original, &prior).await {
            prior.insert(next);
            assert!(prior.len() < 16, "expansion must be finite");
        }
        let err = expander.expand(&original, &prior).await.unwrap_err();
        assert!(matches!(err, ExpandError::NoExpansionAvailable));
    }

    #[tokio::test]
    async fn test_synonym_expander_unknown_terms() {
        let expander = SynonymExpander;
        let prior = HashSet::from(["zebra stripes".to_string()]);
        let err = expander.expand("zebra stripes", &prior).await.unwrap_err();
        assert!(matches!(err, ExpandError::NoExpansionAvailable));
    }

    #[tokio::test]
    async fn test_synonym_expander_english_terms() {
        let expander = SynonymExpander;
        let original = normalize_query("user photo copyright");
        let prior = HashSet::from([original.clone()]);
        let next = expander.expand(&original, &prior).await.unwrap();
        assert!(next.len() > original.len());
    }

    async fn spawn_judgment_endpoint(reply: serde_json::Value) -> String {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move || {
                let reply = reply.clone();
                async move { Json(reply) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_llm_evaluator_parses_model_reply() {
        let base = spawn_judgment_endpoint(serde_json::json!({
            "choices": [{"message": {"role": "assistant",
                "content": "{\"score\": 0.42, \"rationale\": \"thin context\"}"}}]
        }))
        .await;
        let evaluator = LlmEvaluator::new(Arc::new(JudgmentClient::new(base, "key", "judge-1")));
        let verdict = evaluator
            .evaluate("copyright of user photos", &[ranked("L1", "statute text")])
            .await
            .unwrap();
        assert!((verdict.score - 0.42).abs() < 1e-6);
        assert_eq!(verdict.rationale.as_deref(), Some("thin context"));
    }

    #[tokio::test]
    async fn test_llm_expander_rejects_repeats() {
        let base = spawn_judgment_endpoint(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "copyright  law"}}]
        }))
        .await;
        let expander = LlmExpander::new(Arc::new(JudgmentClient::new(base, "key", "judge-1")));

        let fresh = expander
            .expand("copyright", &HashSet::from(["copyright".to_string()]))
            .await
            .unwrap();
        assert_eq!(fresh, "copyright law");

        let err = expander
            .expand(
                "copyright",
                &HashSet::from(["copyright".to_string(), "copyright law".to_string()]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExpandError::NoExpansionAvailable));
    }

    #[tokio::test]
    async fn test_evaluator_endpoint_failure_is_error() {
        // Nothing listens here; the orchestrator turns this into fail-open.
        let evaluator = LlmEvaluator::new(Arc::new(JudgmentClient::new(
            "http://127.0.0.1:1",
            "key",
            "judge-1",
        )));
        assert!(evaluator.evaluate("q", &[]).await.is_err());
    }
}
