//! Re-ranking of fused candidates.
//!
//! Implementations are selected by configuration behind the [`Reranker`]
//! trait so the rest of the pipeline is indifferent to which is active:
//!
//! - [`PairwiseReranker`] scores each (query, passage) pair independently
//!   with a lexical-agreement model and blends it with first-stage fusion
//!   evidence.
//! - [`PassthroughReranker`] renormalizes fusion scores into `[0, 1]` and
//!   truncates — the infallible fallback.
//!
//! Both multiply the collection trust weight into the final score before
//! callers apply their score threshold, so low-authority sources never
//! outrank statutes on equal evidence.

use crate::config;
use crate::index::tokenizer::{char_ngrams, tokenize};
use crate::search::types::{FusedResult, RankedResult};
use std::collections::HashSet;
use thiserror::Error;

/// Failure of a re-ranking implementation at call time.
///
/// Re-ranking is a quality enhancement, never a hard dependency: the
/// orchestrator reacts to this by falling back to [`PassthroughReranker`]
/// for the call.
#[derive(Debug, Error)]
#[error("reranker failed: {0}")]
pub struct RerankError(pub String);

/// Re-scores fused candidates against the original query.
pub trait Reranker: Send + Sync {
    /// Implementation name, for logs and metrics.
    fn name(&self) -> &'static str;

    /// Produces the final top-`top_k` ranking with calibrated scores in
    /// `[0, 1]`, descending, ties broken by document id.
    fn rerank(
        &self,
        query: &str,
        fused: &[FusedResult],
        top_k: usize,
    ) -> Result<Vec<RankedResult>, RerankError>;
}

/// Min-max normalization of fusion scores; a degenerate range maps to 1.0.
fn normalized_fusion_scores(fused: &[FusedResult]) -> Vec<f32> {
    let Some((min, max)) = fused
        .iter()
        .map(|f| f.fusion_score)
        .fold(None, |acc: Option<(f32, f32)>, s| match acc {
            None => Some((s, s)),
            Some((lo, hi)) => Some((lo.min(s), hi.max(s))),
        })
    else {
        return Vec::new();
    };

    let range = max - min;
    fused
        .iter()
        .map(|f| {
            if range < f32::EPSILON {
                1.0
            } else {
                (f.fusion_score - min) / range
            }
        })
        .collect()
}

/// Sort scored results descending, tie-break by id, truncate, assign ranks.
fn finalize(mut scored: Vec<(f32, &FusedResult)>, top_k: usize) -> Vec<RankedResult> {
    scored.sort_unstable_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.document.id.cmp(&b.1.document.id))
    });
    scored.truncate(top_k);
    scored
        .into_iter()
        .enumerate()
        .map(|(i, (score, fused))| RankedResult {
            document: std::sync::Arc::clone(&fused.document),
            final_score: score.clamp(0.0, 1.0),
            rank: i + 1,
        })
        .collect()
}

/// No-op re-ranker: fusion order survives, scores become comparable.
#[derive(Debug, Default)]
pub struct PassthroughReranker;

impl PassthroughReranker {
    /// Infallible implementation backing the trait; also the fallback path
    /// the orchestrator calls directly when the active re-ranker fails.
    pub fn rank(&self, fused: &[FusedResult], top_k: usize) -> Vec<RankedResult> {
        let normalized = normalized_fusion_scores(fused);
        let scored: Vec<(f32, &FusedResult)> = fused
            .iter()
            .zip(normalized)
            .map(|(f, norm)| (norm * f.document.collection.trust_weight(), f))
            .collect();
        finalize(scored, top_k)
    }
}

impl Reranker for PassthroughReranker {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn rerank(
        &self,
        _query: &str,
        fused: &[FusedResult],
        top_k: usize,
    ) -> Result<Vec<RankedResult>, RerankError> {
        Ok(self.rank(fused, top_k))
    }
}

/// Pairwise re-ranker: each (query, passage) pair is scored independently
/// by word and character n-gram agreement, blended with normalized fusion
/// evidence.
#[derive(Debug, Default)]
pub struct PairwiseReranker;

impl PairwiseReranker {
    /// Fraction of query terms found in the passage, per channel.
    fn agreement(query: &str, text: &str) -> f32 {
        let query_words: HashSet<String> = tokenize(query).iter().map(str::to_string).collect();
        let text_words: HashSet<String> = tokenize(text).iter().map(str::to_string).collect();
        let word = if query_words.is_empty() {
            0.0
        } else {
            query_words.intersection(&text_words).count() as f32 / query_words.len() as f32
        };

        let query_grams: HashSet<String> =
            char_ngrams(query, config::CHAR_NGRAM_MIN, config::CHAR_NGRAM_MAX)
                .into_iter()
                .collect();
        let text_grams: HashSet<String> =
            char_ngrams(text, config::CHAR_NGRAM_MIN, config::CHAR_NGRAM_MAX)
                .into_iter()
                .collect();
        let chars = if query_grams.is_empty() {
            0.0
        } else {
            query_grams.intersection(&text_grams).count() as f32 / query_grams.len() as f32
        };

        config::WORD_CHANNEL_WEIGHT * word + config::CHAR_CHANNEL_WEIGHT * chars
    }
}

impl Reranker for PairwiseReranker {
    fn name(&self) -> &'static str {
        "pairwise"
    }

    fn rerank(
        &self,
        query: &str,
        fused: &[FusedResult],
        top_k: usize,
    ) -> Result<Vec<RankedResult>, RerankError> {
        let normalized = normalized_fusion_scores(fused);
        let scored: Vec<(f32, &FusedResult)> = fused
            .iter()
            .zip(normalized)
            .map(|(f, norm)| {
                let pair = Self::agreement(query, &f.document.text);
                let blended = config::RERANK_FUSION_WEIGHT * norm
                    + config::RERANK_OVERLAP_WEIGHT * pair;
                (blended * f.document.collection.trust_weight(), f)
            })
            .collect();
        Ok(finalize(scored, top_k))
    }
}
