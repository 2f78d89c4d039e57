//! Search orchestrator: fan-out, fusion, re-ranking, and the self-healing
//! loop.
//!
//! One [`SearchPipeline`] is constructed at startup around handles that are
//! built once (lexical indexes, remote client, oracles) and shared by every
//! call. A call walks an explicit bounded loop — retrieve, fuse, rerank,
//! evaluate, expand — so termination within `max_retries + 1` attempts is
//! structural, not a property of recursion depth. Per-collection retrieval
//! joins the CPU-bound lexical query with the remote lookup; collections run
//! through a bounded ordered stream so fusion sees them in fixed order.
//!
//! Degradation rules: remote errors shrink the source set, re-ranker errors
//! fall back to passthrough, evaluator errors pass fail-open, exhausted
//! expansion ends the loop. Only a missing lexical index fails the call.

use crate::oracle::{normalize_query, ExpandError, FitnessEvaluator, QueryExpander};
use crate::remote::RemoteSource;
use futures::stream::{self, StreamExt};
use lexrag_core::config;
use lexrag_core::document::SourceKind;
use lexrag_core::error::SearchError;
use lexrag_core::index::IndexRegistry;
use lexrag_core::rerank::{PassthroughReranker, Reranker};
use lexrag_core::search::fusion::reciprocal_rank_fusion;
use lexrag_core::search::types::{
    Candidate, FitnessVerdict, FusedResult, RankedResult, SearchOutcome, SearchRequest,
    SOURCE_LEXICAL,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-pipeline tuning, fixed at startup.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Overall per-call deadline.
    pub deadline: Duration,
    /// Fused candidate cap ahead of re-ranking.
    pub fan_in: usize,
    /// Candidates requested from each source per collection.
    pub per_source_fetch: usize,
    /// Concurrently processed collections.
    pub collection_workers: usize,
    /// Result cache TTL; zero disables caching.
    pub cache_ttl: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(config::SEARCH_DEADLINE_SECS),
            fan_in: config::FUSION_FAN_IN,
            per_source_fetch: config::PER_SOURCE_FETCH,
            collection_workers: config::COLLECTION_WORKERS,
            cache_ttl: Duration::from_secs(config::RESULT_CACHE_TTL_SECS),
        }
    }
}

struct CacheEntry {
    at: Instant,
    outcome: SearchOutcome,
}

/// The retrieval pipeline: the primary contract consumed by the
/// risk-analysis layer and the HTTP surface.
pub struct SearchPipeline {
    indexes: IndexRegistry,
    remote: Option<Arc<dyn RemoteSource>>,
    reranker: Arc<dyn Reranker>,
    fallback: PassthroughReranker,
    evaluator: Option<Arc<dyn FitnessEvaluator>>,
    expander: Option<Arc<dyn QueryExpander>>,
    config: PipelineConfig,
    cache: Mutex<HashMap<u64, CacheEntry>>,
}

impl SearchPipeline {
    /// Creates a pipeline over built indexes. Remote source and oracles are
    /// optional capabilities added with the `with_*` constructors.
    pub fn new(
        indexes: IndexRegistry,
        reranker: Arc<dyn Reranker>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            indexes,
            remote: None,
            reranker,
            fallback: PassthroughReranker,
            evaluator: None,
            expander: None,
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Attaches the remote authoritative source used by hybrid search.
    pub fn with_remote(mut self, remote: Arc<dyn RemoteSource>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Attaches the self-healing oracles.
    pub fn with_oracles(
        mut self,
        evaluator: Arc<dyn FitnessEvaluator>,
        expander: Arc<dyn QueryExpander>,
    ) -> Self {
        self.evaluator = Some(evaluator);
        self.expander = Some(expander);
        self
    }

    /// Runs one search call through the full pipeline.
    ///
    /// The returned outcome is always a (possibly empty) ranked list plus
    /// the low-confidence signal; the only hard failures are request
    /// validation and a missing lexical index.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchOutcome, SearchError> {
        request
            .validate()
            .map_err(SearchError::InvalidRequest)?;
        // Every collection must have a built index before any fan-out.
        for kind in SourceKind::ALL {
            self.indexes.get(kind)?;
        }

        let original = normalize_query(&request.query);
        let cache_key = self.cache_key(&original, &request);
        if !request.use_self_healing {
            if let Some(hit) = self.cache_lookup(cache_key) {
                tracing::debug!(query = %original, "result cache hit");
                return Ok(hit);
            }
        }

        let started = Instant::now();
        let deadline = started + self.config.deadline;
        let mut tried: HashSet<String> = HashSet::from([original.clone()]);
        let mut current = original.clone();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let results = self.retrieve_once(&current, &request).await;

            if !request.use_self_healing {
                let outcome = SearchOutcome {
                    results,
                    attempts,
                    low_confidence: false,
                    verdict: None,
                };
                self.cache_store(cache_key, &outcome);
                self.log_completion(&original, &outcome, started);
                return Ok(outcome);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(attempts, "deadline elapsed, returning best-effort results");
                let outcome = SearchOutcome {
                    results,
                    attempts,
                    low_confidence: true,
                    verdict: None,
                };
                self.log_completion(&original, &outcome, started);
                return Ok(outcome);
            }

            let verdict = match &self.evaluator {
                // No oracle configured: nothing to judge against, pass.
                None => FitnessVerdict::pass(),
                Some(evaluator) => {
                    match tokio::time::timeout(remaining, evaluator.evaluate(&original, &results))
                        .await
                    {
                        Ok(Ok(verdict)) => verdict,
                        Ok(Err(e)) => {
                            tracing::warn!(
                                error = %e,
                                "fitness evaluator failed, treating verdict as passing"
                            );
                            FitnessVerdict::pass()
                        }
                        Err(_) => {
                            tracing::warn!(attempts, "deadline elapsed during fitness evaluation");
                            let outcome = SearchOutcome {
                                results,
                                attempts,
                                low_confidence: true,
                                verdict: None,
                            };
                            self.log_completion(&original, &outcome, started);
                            return Ok(outcome);
                        }
                    }
                }
            };

            if verdict.score >= request.fitness_threshold {
                let outcome = SearchOutcome {
                    results,
                    attempts,
                    low_confidence: false,
                    verdict: Some(verdict),
                };
                self.log_completion(&original, &outcome, started);
                return Ok(outcome);
            }

            if attempts > request.max_retries {
                tracing::info!(
                    attempts,
                    fitness = verdict.score,
                    threshold = request.fitness_threshold,
                    "retries exhausted below fitness threshold"
                );
                let outcome = SearchOutcome {
                    results,
                    attempts,
                    low_confidence: true,
                    verdict: Some(verdict),
                };
                self.log_completion(&original, &outcome, started);
                return Ok(outcome);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let expansion = match &self.expander {
                None => Err(ExpandError::NoExpansionAvailable),
                Some(expander) => {
                    match tokio::time::timeout(remaining, expander.expand(&original, &tried)).await
                    {
                        Ok(result) => result,
                        Err(_) => {
                            tracing::warn!(attempts, "deadline elapsed during query expansion");
                            let outcome = SearchOutcome {
                                results,
                                attempts,
                                low_confidence: true,
                                verdict: Some(verdict),
                            };
                            self.log_completion(&original, &outcome, started);
                            return Ok(outcome);
                        }
                    }
                }
            };

            match expansion {
                Ok(next) => {
                    let next = normalize_query(&next);
                    if next.is_empty() || tried.contains(&next) {
                        tracing::info!("expander repeated a tried query, stopping retries");
                        let outcome = SearchOutcome {
                            results,
                            attempts,
                            low_confidence: true,
                            verdict: Some(verdict),
                        };
                        self.log_completion(&original, &outcome, started);
                        return Ok(outcome);
                    }
                    tracing::info!(from = %current, to = %next, "expanding query and retrying");
                    tried.insert(next.clone());
                    current = next;
                }
                Err(ExpandError::NoExpansionAvailable) => {
                    tracing::info!(attempts, "no expansion available, stopping retries");
                    let outcome = SearchOutcome {
                        results,
                        attempts,
                        low_confidence: true,
                        verdict: Some(verdict),
                    };
                    self.log_completion(&original, &outcome, started);
                    return Ok(outcome);
                }
                Err(ExpandError::Oracle(e)) => {
                    tracing::warn!(error = %e, "query expander failed, stopping retries");
                    let outcome = SearchOutcome {
                        results,
                        attempts,
                        low_confidence: true,
                        verdict: Some(verdict),
                    };
                    self.log_completion(&original, &outcome, started);
                    return Ok(outcome);
                }
            }
        }
    }

    /// One pass through retrieve → fuse → rerank → threshold.
    async fn retrieve_once(&self, query: &str, request: &SearchRequest) -> Vec<RankedResult> {
        let fused_per_collection: Vec<Vec<FusedResult>> = stream::iter(
            SourceKind::ALL
                .into_iter()
                .map(|kind| self.retrieve_collection(kind, query, request)),
        )
        .buffered(self.config.collection_workers.max(1))
        .collect()
        .await;

        // Fixed collection order, then the fan-in cap bounds reranker cost.
        let mut fused: Vec<FusedResult> = fused_per_collection.into_iter().flatten().collect();
        fused.truncate(self.config.fan_in);

        let ranked = match self.reranker.rerank(query, &fused, request.top_k) {
            Ok(ranked) => ranked,
            Err(e) => {
                tracing::warn!(
                    reranker = self.reranker.name(),
                    error = %e,
                    "reranker failed, falling back to passthrough"
                );
                self.fallback.rank(&fused, request.top_k)
            }
        };

        // Below-threshold results are dropped, never padded back in.
        let mut survivors: Vec<RankedResult> = ranked
            .into_iter()
            .filter(|r| r.final_score >= request.score_threshold)
            .collect();
        for (i, result) in survivors.iter_mut().enumerate() {
            result.rank = i + 1;
        }
        survivors
    }

    /// Fan out to both sources for one collection and fuse their lists.
    /// The lexical query is CPU-bound and synchronous; the remote lookup is
    /// the suspension point. Fusion starts only once both have returned or
    /// definitively failed.
    async fn retrieve_collection(
        &self,
        kind: SourceKind,
        query: &str,
        request: &SearchRequest,
    ) -> Vec<FusedResult> {
        let Ok(index) = self.indexes.get(kind) else {
            return Vec::new(); // pre-checked in search()
        };

        let lexical = async { index.query(query, self.config.per_source_fetch) };
        let remote = async {
            if !request.use_hybrid {
                return None;
            }
            let source = self.remote.as_ref()?;
            match source
                .query(kind, query, self.config.per_source_fetch)
                .await
            {
                Ok(candidates) => Some((source.name(), candidates)),
                Err(e) => {
                    tracing::warn!(
                        collection = %kind,
                        error = %e,
                        "external lookup failed, continuing with lexical results only"
                    );
                    None
                }
            }
        };
        let (lexical, remote) = tokio::join!(lexical, remote);

        let mut lists: Vec<(&str, Vec<Candidate>)> = vec![(SOURCE_LEXICAL, lexical)];
        if let Some((name, candidates)) = remote {
            if !candidates.is_empty() {
                lists.push((name, candidates));
            }
        }
        reciprocal_rank_fusion(&lists)
    }

    fn cache_key(&self, normalized_query: &str, request: &SearchRequest) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        normalized_query.hash(&mut hasher);
        request.top_k.hash(&mut hasher);
        request.score_threshold.to_bits().hash(&mut hasher);
        request.use_hybrid.hash(&mut hasher);
        hasher.finish()
    }

    fn cache_lookup(&self, key: u64) -> Option<SearchOutcome> {
        if self.config.cache_ttl.is_zero() {
            return None;
        }
        let mut cache = self.cache.lock();
        if let Some(entry) = cache.get(&key) {
            if entry.at.elapsed() < self.config.cache_ttl {
                return Some(entry.outcome.clone());
            }
            cache.remove(&key);
        }
        None
    }

    fn cache_store(&self, key: u64, outcome: &SearchOutcome) {
        if self.config.cache_ttl.is_zero() {
            return;
        }
        let mut cache = self.cache.lock();
        if cache.len() >= config::RESULT_CACHE_MAX_ENTRIES {
            let ttl = self.config.cache_ttl;
            cache.retain(|_, entry| entry.at.elapsed() < ttl);
            if cache.len() >= config::RESULT_CACHE_MAX_ENTRIES {
                cache.clear();
            }
        }
        cache.insert(
            key,
            CacheEntry {
                at: Instant::now(),
                outcome: outcome.clone(),
            },
        );
    }

    fn log_completion(&self, query: &str, outcome: &SearchOutcome, started: Instant) {
        tracing::info!(
            query = %query,
            results = outcome.results.len(),
            attempts = outcome.attempts,
            low_confidence = outcome.low_confidence,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleError;
    use crate::remote::RemoteError;
    use async_trait::async_trait;
    use lexrag_core::corpus::CorpusSnapshot;
    use lexrag_core::document::Document;
    use lexrag_core::rerank::{PairwiseReranker, RerankError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn corpus() -> CorpusSnapshot {
        CorpusSnapshot::from_documents(vec![
            Document::new(
                "L1",
                "copyright belongs to the creator of the work",
                HashMap::new(),
                SourceKind::Statute,
            ),
            Document::new(
                "L2",
                "refunds must be issued within fourteen days",
                HashMap::new(),
                SourceKind::Statute,
            ),
            Document::new(
                "P1",
                "the court found copyright infringement in the uploaded photos",
                HashMap::new(),
                SourceKind::CaseLaw,
            ),
            Document::new(
                "S1",
                "users keep copyright in content they upload to the store",
                HashMap::new(),
                SourceKind::PlatformPolicy,
            ),
        ])
    }

    fn pipeline_for(corpus: &CorpusSnapshot) -> SearchPipeline {
        SearchPipeline::new(
            IndexRegistry::build_all(corpus),
            Arc::new(PassthroughReranker),
            PipelineConfig {
                cache_ttl: Duration::ZERO,
                ..PipelineConfig::default()
            },
        )
    }

    struct FailingRemote;

    #[async_trait]
    impl RemoteSource for FailingRemote {
        fn name(&self) -> &'static str {
            "failing-portal"
        }
        async fn query(
            &self,
            _collection: SourceKind,
            _text: &str,
            _n: usize,
        ) -> Result<Vec<Candidate>, RemoteError> {
            Err(RemoteError::Transient("connection refused".into()))
        }
    }

    struct StaticRemote;

    #[async_trait]
    impl RemoteSource for StaticRemote {
        fn name(&self) -> &'static str {
            "static-portal"
        }
        async fn query(
            &self,
            collection: SourceKind,
            _text: &str,
            _n: usize,
        ) -> Result<Vec<Candidate>, RemoteError> {
            if collection != SourceKind::Statute {
                return Ok(Vec::new());
            }
            Ok(vec![Candidate {
                document: Arc::new(Document::new(
                    "R1",
                    "remote statute about copyright of photographs",
                    HashMap::new(),
                    collection,
                )),
                rank: 1,
                raw_score: 0.9,
            }])
        }
    }

    struct FixedEvaluator(f32);

    #[async_trait]
    impl FitnessEvaluator for FixedEvaluator {
        async fn evaluate(
            &self,
            _query: &str,
            _results: &[RankedResult],
        ) -> Result<FitnessVerdict, OracleError> {
            Ok(FitnessVerdict {
                score: self.0,
                rationale: None,
            })
        }
    }

    struct FailingEvaluator;

    #[async_trait]
    impl FitnessEvaluator for FailingEvaluator {
        async fn evaluate(
            &self,
            _query: &str,
            _results: &[RankedResult],
        ) -> Result<FitnessVerdict, OracleError> {
            Err(OracleError::Endpoint("oracle down".into()))
        }
    }

    struct CountingExpander {
        calls: AtomicU32,
    }

    impl CountingExpander {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl QueryExpander for CountingExpander {
        async fn expand(
            &self,
            original: &str,
            _prior: &HashSet<String>,
        ) -> Result<String, ExpandError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("{original} variant {n}"))
        }
    }

    struct ExhaustedExpander;

    #[async_trait]
    impl QueryExpander for ExhaustedExpander {
        async fn expand(
            &self,
            _original: &str,
            _prior: &HashSet<String>,
        ) -> Result<String, ExpandError> {
            Err(ExpandError::NoExpansionAvailable)
        }
    }

    struct FailingReranker;

    impl Reranker for FailingReranker {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn rerank(
            &self,
            _query: &str,
            _fused: &[FusedResult],
            _top_k: usize,
        ) -> Result<Vec<RankedResult>, RerankError> {
            Err(RerankError("model crashed".into()))
        }
    }

    fn request(query: &str) -> SearchRequest {
        SearchRequest {
            score_threshold: 0.1,
            ..SearchRequest::new(query)
        }
    }

    #[tokio::test]
    async fn test_lexical_only_when_remote_always_fails() {
        let corpus = corpus();
        let pipeline = pipeline_for(&corpus).with_remote(Arc::new(FailingRemote));
        let outcome = pipeline.search(request("copyright creator")).await.unwrap();
        assert!(!outcome.results.is_empty(), "hybrid must degrade, not fail");
        assert_eq!(outcome.attempts, 1);
        assert!(!outcome.low_confidence);
    }

    #[tokio::test]
    async fn test_remote_candidates_join_the_ranking() {
        let corpus = corpus();
        let pipeline = pipeline_for(&corpus).with_remote(Arc::new(StaticRemote));
        let outcome = pipeline
            .search(SearchRequest {
                top_k: 10,
                ..request("copyright photographs")
            })
            .await
            .unwrap();
        assert!(outcome
            .results
            .iter()
            .any(|r| r.document.id == "R1"));
    }

    #[tokio::test]
    async fn test_hybrid_disabled_skips_remote() {
        let corpus = corpus();
        let pipeline = pipeline_for(&corpus).with_remote(Arc::new(StaticRemote));
        let outcome = pipeline
            .search(SearchRequest {
                use_hybrid: false,
                top_k: 10,
                ..request("copyright photographs")
            })
            .await
            .unwrap();
        assert!(outcome.results.iter().all(|r| r.document.id != "R1"));
    }

    #[tokio::test]
    async fn test_all_results_meet_score_threshold() {
        let corpus = corpus();
        let pipeline = pipeline_for(&corpus);
        let outcome = pipeline
            .search(SearchRequest {
                score_threshold: 0.5,
                top_k: 10,
                ..SearchRequest::new("copyright")
            })
            .await
            .unwrap();
        for result in &outcome.results {
            assert!(result.final_score >= 0.5);
        }
    }

    #[tokio::test]
    async fn test_empty_corpus_returns_empty_results() {
        let corpus = CorpusSnapshot::empty();
        let pipeline = pipeline_for(&corpus);
        let outcome = pipeline.search(request("anything")).await.unwrap();
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn test_missing_index_is_a_hard_failure() {
        let corpus = corpus();
        let mut registry = IndexRegistry::new();
        registry.insert(lexrag_core::index::LexicalIndex::build(
            SourceKind::Statute,
            corpus.collection(SourceKind::Statute),
        ));
        let pipeline = SearchPipeline::new(
            registry,
            Arc::new(PassthroughReranker),
            PipelineConfig::default(),
        );
        let err = pipeline.search(request("copyright")).await.unwrap_err();
        assert!(matches!(err, SearchError::IndexUnavailable(_)));
    }

    #[tokio::test]
    async fn test_invalid_request_rejected() {
        let corpus = corpus();
        let pipeline = pipeline_for(&corpus);
        let err = pipeline
            .search(SearchRequest::new("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_reranker_failure_falls_back_to_passthrough() {
        let corpus = corpus();
        let pipeline = SearchPipeline::new(
            IndexRegistry::build_all(&corpus),
            Arc::new(FailingReranker),
            PipelineConfig {
                cache_ttl: Duration::ZERO,
                ..PipelineConfig::default()
            },
        );
        let outcome = pipeline.search(request("copyright creator")).await.unwrap();
        assert!(!outcome.results.is_empty());
    }

    #[tokio::test]
    async fn test_self_healing_retries_exactly_max_plus_one() {
        let corpus = corpus();
        let expander = CountingExpander::new();
        let pipeline = pipeline_for(&corpus)
            .with_oracles(Arc::new(FixedEvaluator(0.3)), expander.clone());
        let outcome = pipeline
            .search(SearchRequest {
                use_self_healing: true,
                fitness_threshold: 0.9,
                max_retries: 2,
                ..request("copyright creator")
            })
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 3, "initial attempt + 2 retries");
        assert!(outcome.low_confidence);
        assert_eq!(expander.calls.load(Ordering::SeqCst), 2);
        assert!(!outcome.results.is_empty(), "last attempt's results survive");
        let verdict = outcome.verdict.expect("verdict recorded");
        assert!((verdict.score - 0.3).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_self_healing_passing_verdict_stops_immediately() {
        let corpus = corpus();
        let pipeline = pipeline_for(&corpus).with_oracles(
            Arc::new(FixedEvaluator(0.95)),
            CountingExpander::new(),
        );
        let outcome = pipeline
            .search(SearchRequest {
                use_self_healing: true,
                ..request("copyright creator")
            })
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 1);
        assert!(!outcome.low_confidence);
        assert!(outcome.verdict.is_some());
    }

    #[tokio::test]
    async fn test_evaluator_failure_is_fail_open() {
        let corpus = corpus();
        let pipeline = pipeline_for(&corpus)
            .with_oracles(Arc::new(FailingEvaluator), CountingExpander::new());
        let outcome = pipeline
            .search(SearchRequest {
                use_self_healing: true,
                ..request("copyright creator")
            })
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 1);
        assert!(!outcome.low_confidence, "oracle outage never blocks results");
    }

    #[tokio::test]
    async fn test_no_expansion_available_ends_the_loop() {
        let corpus = corpus();
        let pipeline = pipeline_for(&corpus)
            .with_oracles(Arc::new(FixedEvaluator(0.1)), Arc::new(ExhaustedExpander));
        let outcome = pipeline
            .search(SearchRequest {
                use_self_healing: true,
                fitness_threshold: 0.9,
                max_retries: 5,
                ..request("copyright creator")
            })
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.low_confidence);
    }

    #[tokio::test]
    async fn test_self_healing_without_oracles_passes() {
        let corpus = corpus();
        let pipeline = pipeline_for(&corpus);
        let outcome = pipeline
            .search(SearchRequest {
                use_self_healing: true,
                ..request("copyright creator")
            })
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 1);
        assert!(!outcome.low_confidence);
    }

    #[tokio::test]
    async fn test_deadline_expiry_returns_best_effort() {
        let corpus = corpus();
        let pipeline = SearchPipeline::new(
            IndexRegistry::build_all(&corpus),
            Arc::new(PassthroughReranker),
            PipelineConfig {
                deadline: Duration::ZERO,
                cache_ttl: Duration::ZERO,
                ..PipelineConfig::default()
            },
        )
        .with_oracles(Arc::new(FixedEvaluator(0.0)), CountingExpander::new());
        let outcome = pipeline
            .search(SearchRequest {
                use_self_healing: true,
                max_retries: 5,
                ..request("copyright creator")
            })
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.low_confidence);
    }

    #[tokio::test]
    async fn test_idempotent_for_identical_requests() {
        let corpus = corpus();
        let pipeline = pipeline_for(&corpus).with_remote(Arc::new(StaticRemote));
        let req = SearchRequest {
            top_k: 10,
            ..request("copyright photographs")
        };
        let first = pipeline.search(req.clone()).await.unwrap();
        let second = pipeline.search(req).await.unwrap();
        assert_eq!(first.results.len(), second.results.len());
        for (a, b) in first.results.iter().zip(&second.results) {
            assert_eq!(a.document.id, b.document.id);
            assert_eq!(a.final_score, b.final_score);
            assert_eq!(a.rank, b.rank);
        }
    }

    #[tokio::test]
    async fn test_result_cache_serves_identical_outcome() {
        let corpus = corpus();
        let pipeline = SearchPipeline::new(
            IndexRegistry::build_all(&corpus),
            Arc::new(PassthroughReranker),
            PipelineConfig::default(),
        );
        let req = request("copyright creator");
        let first = pipeline.search(req.clone()).await.unwrap();
        let second = pipeline.search(req).await.unwrap();
        assert_eq!(first.results.len(), second.results.len());
        for (a, b) in first.results.iter().zip(&second.results) {
            assert_eq!(a.document.id, b.document.id);
            assert_eq!(a.final_score, b.final_score);
        }
    }

    #[tokio::test]
    async fn test_korean_statute_scenario() {
        let corpus = CorpusSnapshot::from_documents(vec![Document::new(
            "L1",
            "제2조 저작물은 창작한 사람에게 귀속된다",
            HashMap::from([(
                "source_type".to_string(),
                lexrag_core::document::MetadataValue::String("law".into()),
            )]),
            SourceKind::Statute,
        )]);
        let pipeline = SearchPipeline::new(
            IndexRegistry::build_all(&corpus),
            Arc::new(PairwiseReranker),
            PipelineConfig {
                cache_ttl: Duration::ZERO,
                ..PipelineConfig::default()
            },
        );
        let outcome = pipeline
            .search(SearchRequest {
                top_k: 1,
                score_threshold: 0.1,
                ..SearchRequest::new("사용자 사진 저작권")
            })
            .await
            .unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].document.id, "L1");
        assert!(outcome.results[0].final_score >= 0.1);
    }
}
