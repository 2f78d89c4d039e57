//! Reciprocal Rank Fusion over ranked candidate lists.
//!
//! RRF is rank-based, not score-based: the lexical index and the remote
//! portal score on incomparable scales (sparse cosine similarity vs. an
//! opaque external relevance metric), so rank position is the only mutually
//! meaningful signal. Each document scores `sum(1 / (k + rank_i))` over the
//! lists that contain it, with `k = 60` (see [`crate::config::RRF_K`]).

use crate::config;
use crate::search::types::{Candidate, FusedResult};
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;

/// Fuses one or more ranked lists for the same collection into a single
/// ranking.
///
/// Each list is a `(source_name, candidates)` pair; candidates carry their
/// 1-based rank within their source. Documents appearing in several lists
/// are deduplicated, accumulating score from every list; documents absent
/// from a list contribute nothing for it. The output is sorted by fusion
/// score descending, ties broken by document id, and is commutative in the
/// order of the input lists.
pub fn reciprocal_rank_fusion(lists: &[(&str, Vec<Candidate>)]) -> Vec<FusedResult> {
    // Accumulate in f64 so list order cannot perturb the f32 result.
    let mut merged: HashMap<&str, (Arc<crate::document::Document>, f64, BTreeSet<String>)> =
        HashMap::new();

    for (source, candidates) in lists {
        for candidate in candidates {
            let entry = merged
                .entry(candidate.document.id.as_str())
                .or_insert_with(|| (Arc::clone(&candidate.document), 0.0, BTreeSet::new()));
            entry.1 += 1.0 / (config::RRF_K as f64 + candidate.rank as f64);
            entry.2.insert((*source).to_string());
        }
    }

    let mut fused: Vec<FusedResult> = merged
        .into_values()
        .map(|(document, score, provenance)| FusedResult {
            document,
            fusion_score: score as f32,
            provenance,
        })
        .collect();

    fused.sort_unstable_by(|a, b| {
        b.fusion_score
            .partial_cmp(&a.fusion_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.document.id.cmp(&b.document.id))
    });
    fused
}
