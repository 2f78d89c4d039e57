//! Weighted inverted index for one lexical channel.
//!
//! Maps terms to postings of L2-normalized sublinear-TF × IDF weights, so a
//! query is answered by accumulating dot products over postings lists —
//! cosine similarity without materializing document vectors. Documents are
//! identified by internal u32 ids (their position in the collection).

use std::collections::HashMap;

/// A single entry in a term's postings list.
#[derive(Debug, Clone)]
pub struct Posting {
    /// Internal u32 document id.
    pub doc: u32,
    /// L2-normalized TF-IDF weight of the term in this document.
    pub weight: f32,
}

#[derive(Debug)]
struct TermEntry {
    /// Smoothed inverse document frequency: `ln((1+N)/(1+df)) + 1`.
    idf: f32,
    postings: Vec<Posting>,
}

/// Inverted index of term weights for one analyzer channel.
#[derive(Debug, Default)]
pub struct TermIndex {
    terms: HashMap<String, TermEntry>,
    doc_count: u32,
}

/// Count term occurrences for one document or query.
pub fn count_terms<I>(terms: I) -> HashMap<String, u32>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: HashMap<String, u32> = HashMap::new();
    for term in terms {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}

impl TermIndex {
    /// Builds the index from per-document term counts. The position in
    /// `doc_term_counts` is the document's internal id.
    pub fn build(doc_term_counts: &[HashMap<String, u32>]) -> Self {
        let doc_count = doc_term_counts.len() as u32;

        let mut df: HashMap<&str, u32> = HashMap::new();
        for counts in doc_term_counts {
            for term in counts.keys() {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let mut terms: HashMap<String, TermEntry> = HashMap::with_capacity(df.len());
        for (term, df) in df {
            let idf = ((1.0 + doc_count as f32) / (1.0 + df as f32)).ln() + 1.0;
            terms.insert(
                term.to_string(),
                TermEntry {
                    idf,
                    postings: Vec::with_capacity(df as usize),
                },
            );
        }

        for (doc, counts) in doc_term_counts.iter().enumerate() {
            // Sublinear TF, then L2 normalization per document.
            let mut weights: Vec<(&str, f32)> = Vec::with_capacity(counts.len());
            let mut norm = 0.0f32;
            for (term, &tf) in counts {
                let entry = &terms[term.as_str()];
                let w = (1.0 + (tf as f32).ln()) * entry.idf;
                norm += w * w;
                weights.push((term.as_str(), w));
            }
            let norm = norm.sqrt();
            if norm == 0.0 {
                continue;
            }
            for (term, w) in weights {
                if let Some(entry) = terms.get_mut(term) {
                    entry.postings.push(Posting {
                        doc: doc as u32,
                        weight: w / norm,
                    });
                }
            }
        }

        Self { terms, doc_count }
    }

    /// Cosine similarity of the query against every document sharing at
    /// least one term, accumulated over postings lists. Terms outside the
    /// build-time vocabulary contribute nothing.
    pub fn score(&self, query_term_counts: &HashMap<String, u32>) -> HashMap<u32, f32> {
        let mut matched: Vec<(&TermEntry, f32)> = Vec::new();
        let mut norm = 0.0f32;
        for (term, &tf) in query_term_counts {
            if let Some(entry) = self.terms.get(term.as_str()) {
                let w = (1.0 + (tf as f32).ln()) * entry.idf;
                norm += w * w;
                matched.push((entry, w));
            }
        }
        let norm = norm.sqrt();
        if norm == 0.0 {
            return HashMap::new();
        }

        let mut scores: HashMap<u32, f32> = HashMap::with_capacity(64);
        for (entry, w) in matched {
            let qw = w / norm;
            for posting in &entry.postings {
                *scores.entry(posting.doc).or_insert(0.0) += qw * posting.weight;
            }
        }
        scores
    }

    /// Number of documents the index was built over.
    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }
}
