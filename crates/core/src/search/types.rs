//! Result and request types for the retrieval pipeline.
//!
//! Scores are deliberately kept in separate, non-comparable spaces:
//! `Candidate::raw_score` is source-specific, `FusedResult::fusion_score`
//! comes from rank fusion, and `RankedResult::final_score` is the calibrated
//! relevance in `[0, 1]` that thresholds and callers see.

use crate::config;
use crate::document::Document;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Provenance name of the local lexical index source.
pub const SOURCE_LEXICAL: &str = "lexical";

/// A document proposed by a single source.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The proposed passage (shared reference).
    pub document: Arc<Document>,
    /// 1-based rank within the proposing source's list.
    pub rank: usize,
    /// Source-specific score. Not comparable across sources — only the rank
    /// is a mutually meaningful signal.
    pub raw_score: f32,
}

/// A document after rank fusion across sources.
#[derive(Debug, Clone)]
pub struct FusedResult {
    /// The fused passage (shared reference).
    pub document: Arc<Document>,
    /// Reciprocal-rank-fusion score; defines the fused ranking.
    pub fusion_score: f32,
    /// Names of every source that proposed this document.
    pub provenance: BTreeSet<String>,
}

/// A document after re-ranking: the shape returned to callers.
#[derive(Debug, Clone)]
pub struct RankedResult {
    /// The ranked passage (shared reference).
    pub document: Arc<Document>,
    /// Calibrated relevance in `[0, 1]`, trust-weighted. Not comparable to
    /// `fusion_score`.
    pub final_score: f32,
    /// 1-based position in the final result list.
    pub rank: usize,
}

/// Adequacy judgment of a retrieved context relative to a query.
#[derive(Debug, Clone)]
pub struct FitnessVerdict {
    /// Adequacy in `[0, 1]`.
    pub score: f32,
    /// Optional free-text justification from the judgment oracle.
    pub rationale: Option<String>,
}

impl FitnessVerdict {
    /// The fail-open verdict used when the oracle itself is unavailable.
    pub fn pass() -> Self {
        Self {
            score: 1.0,
            rationale: None,
        }
    }
}

/// Parameters of one search call.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Free-text query.
    pub query: String,
    /// Number of results to return.
    pub top_k: usize,
    /// Minimum `final_score` for a result to be returned. Results below the
    /// threshold are dropped, never padded back in.
    pub score_threshold: f32,
    /// Also query the remote authoritative source.
    pub use_hybrid: bool,
    /// Gate results through the fitness evaluator and expand-and-retry loop.
    pub use_self_healing: bool,
    /// Adequacy score the retrieved context must reach.
    pub fitness_threshold: f32,
    /// Maximum number of expand-and-retry iterations after the initial
    /// attempt.
    pub max_retries: u32,
}

impl SearchRequest {
    /// A request for `query` with the documented defaults.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Validates parameter ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.query.trim().is_empty() {
            return Err("query must not be empty".into());
        }
        if self.query.len() > config::MAX_QUERY_LEN {
            return Err(format!(
                "query must be at most {} bytes",
                config::MAX_QUERY_LEN
            ));
        }
        if self.top_k == 0 || self.top_k > config::MAX_TOP_K {
            return Err(format!("top_k must be 1-{}", config::MAX_TOP_K));
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err("score_threshold must be in [0, 1]".into());
        }
        if !(0.0..=1.0).contains(&self.fitness_threshold) {
            return Err("fitness_threshold must be in [0, 1]".into());
        }
        Ok(())
    }
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            top_k: config::DEFAULT_TOP_K,
            score_threshold: config::DEFAULT_SCORE_THRESHOLD,
            use_hybrid: true,
            use_self_healing: false,
            fitness_threshold: config::DEFAULT_FITNESS_THRESHOLD,
            max_retries: config::DEFAULT_MAX_RETRIES,
        }
    }
}

/// The outcome of one search call: results plus enough signal for the
/// caller to warn about weak context instead of ever raising on degraded
/// retrieval.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Final ranked results; possibly empty — a valid outcome, not an error.
    pub results: Vec<RankedResult>,
    /// Number of retrieval attempts performed (1 unless self-healing
    /// retried).
    pub attempts: u32,
    /// `true` when self-healing ran and ended without meeting the fitness
    /// threshold (retries exhausted, no expansion available, or deadline).
    pub low_confidence: bool,
    /// Last fitness verdict, when self-healing evaluated one.
    pub verdict: Option<FitnessVerdict>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req = SearchRequest::new("copyright");
        assert_eq!(req.top_k, 5);
        assert!((req.score_threshold - 0.7).abs() < f32::EPSILON);
        assert!(req.use_hybrid);
        assert!(!req.use_self_healing);
        assert!((req.fitness_threshold - 0.6).abs() < f32::EPSILON);
        assert_eq!(req.max_retries, 2);
    }

    #[test]
    fn test_request_validation() {
        assert!(SearchRequest::new("copyright").validate().is_ok());
        assert!(SearchRequest::new("   ").validate().is_err());
        assert!(SearchRequest {
            top_k: 0,
            ..SearchRequest::new("q")
        }
        .validate()
        .is_err());
        assert!(SearchRequest {
            score_threshold: 1.5,
            ..SearchRequest::new("q")
        }
        .validate()
        .is_err());
        assert!(SearchRequest {
            fitness_threshold: -0.1,
            ..SearchRequest::new("q")
        }
        .validate()
        .is_err());
        assert!(SearchRequest {
            query: "q".repeat(config::MAX_QUERY_LEN + 1),
            ..SearchRequest::new("q")
        }
        .validate()
        .is_err());
    }
}
