//! Lexical index: term-weighted sparse vectors built at build time, cosine
//! ranking at query time.
//!
//! Each collection gets one [`LexicalIndex`] holding two analyzer channels —
//! word tokens and word-bounded character n-grams — blended 0.6/0.4 at query
//! time. Indexes are built once at startup and shared read-only; the
//! [`IndexRegistry`] is the lookup point that turns a missing index into
//! [`SearchError::IndexUnavailable`].

/// Weighted inverted index for one analyzer channel.
pub mod inverted;
/// Word tokenizer and character n-gram analyzer.
pub mod tokenizer;

use crate::config;
use crate::corpus::CorpusSnapshot;
use crate::document::{Document, SourceKind};
use crate::error::SearchError;
use crate::index::inverted::{count_terms, TermIndex};
use crate::index::tokenizer::{char_ngrams, tokenize};
use crate::search::types::Candidate;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

/// Sparse lexical index over one collection.
///
/// Invariant: `documents` is ordered by ascending document id (corpus
/// snapshots guarantee this), so internal u32 ids follow id order and
/// score ties resolve lexicographically.
#[derive(Debug)]
pub struct LexicalIndex {
    collection: SourceKind,
    documents: Vec<Arc<Document>>,
    word: TermIndex,
    chars: TermIndex,
}

impl LexicalIndex {
    /// Builds the index for a collection. Amortized: per-document term
    /// weighting happens here, queries only vectorize the query text.
    pub fn build(collection: SourceKind, documents: &[Arc<Document>]) -> Self {
        let word_counts: Vec<HashMap<String, u32>> = documents
            .iter()
            .map(|d| count_terms(tokenize(&d.text).iter().map(str::to_string)))
            .collect();
        let char_counts: Vec<HashMap<String, u32>> = documents
            .iter()
            .map(|d| {
                count_terms(char_ngrams(
                    &d.text,
                    config::CHAR_NGRAM_MIN,
                    config::CHAR_NGRAM_MAX,
                ))
            })
            .collect();

        Self {
            collection,
            documents: documents.to_vec(),
            word: TermIndex::build(&word_counts),
            chars: TermIndex::build(&char_counts),
        }
    }

    /// Ranks documents by blended cosine similarity against the query,
    /// descending, ties broken by document id. Returns at most `n`
    /// candidates; zero-score documents are dropped, so the result may be
    /// empty.
    pub fn query(&self, text: &str, n: usize) -> Vec<Candidate> {
        if n == 0 || self.documents.is_empty() {
            return Vec::new();
        }

        let word_query = count_terms(tokenize(text).iter().map(str::to_string));
        let char_query = count_terms(char_ngrams(
            text,
            config::CHAR_NGRAM_MIN,
            config::CHAR_NGRAM_MAX,
        ));

        let mut blended: HashMap<u32, f32> = HashMap::new();
        for (doc, score) in self.word.score(&word_query) {
            *blended.entry(doc).or_insert(0.0) += config::WORD_CHANNEL_WEIGHT * score;
        }
        for (doc, score) in self.chars.score(&char_query) {
            *blended.entry(doc).or_insert(0.0) += config::CHAR_CHANNEL_WEIGHT * score;
        }

        // Partial sort: O(n log k) via min-heap of size n. Reverse(id) makes
        // equal-score evictions drop the larger internal id first, keeping
        // tie-breaks lexicographic.
        let mut heap: BinaryHeap<Reverse<(OrderedFloat<f32>, Reverse<u32>)>> =
            BinaryHeap::with_capacity(n + 1);
        for (doc, score) in blended {
            if score <= 0.0 {
                continue;
            }
            heap.push(Reverse((OrderedFloat(score), Reverse(doc))));
            if heap.len() > n {
                heap.pop();
            }
        }

        let mut top: Vec<(u32, f32)> = heap
            .into_iter()
            .map(|Reverse((s, Reverse(doc)))| (doc, s.0))
            .collect();
        top.sort_unstable_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        top.into_iter()
            .enumerate()
            .map(|(i, (doc, score))| Candidate {
                document: Arc::clone(&self.documents[doc as usize]),
                rank: i + 1,
                raw_score: score,
            })
            .collect()
    }

    /// The collection this index was built over.
    pub fn collection(&self) -> SourceKind {
        self.collection
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if the collection was empty at build time.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Registry of built lexical indexes, constructed once at startup and
/// passed by handle into every search call.
#[derive(Debug, Default)]
pub struct IndexRegistry {
    indexes: HashMap<SourceKind, Arc<LexicalIndex>>,
}

impl IndexRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds indexes for every collection of the snapshot, including empty
    /// ones (an empty collection yields valid empty query results, not an
    /// error).
    pub fn build_all(corpus: &CorpusSnapshot) -> Self {
        let mut registry = Self::new();
        for kind in SourceKind::ALL {
            registry.insert(LexicalIndex::build(kind, corpus.collection(kind)));
        }
        registry
    }

    /// Registers a built index under its collection.
    pub fn insert(&mut self, index: LexicalIndex) {
        self.indexes.insert(index.collection(), Arc::new(index));
    }

    /// Looks up the index for a collection. Querying a collection that was
    /// never built is the one hard failure of the pipeline.
    pub fn get(&self, kind: SourceKind) -> Result<&Arc<LexicalIndex>, SearchError> {
        self.indexes
            .get(&kind)
            .ok_or_else(|| SearchError::IndexUnavailable(kind.as_str().to_string()))
    }

    /// Returns `true` if every collection in `kinds` has a built index.
    pub fn covers(&self, kinds: &[SourceKind]) -> bool {
        kinds.iter().all(|k| self.indexes.contains_key(k))
    }
}
