//! Read-only corpus snapshots.
//!
//! Ingestion (out of scope here) produces a JSON snapshot mapping document
//! id to `{"text": ..., "metadata": {"source_type": ..., ...}}`. This module
//! loads that snapshot once at startup and partitions it into collections by
//! `source_type`. A snapshot is immutable for its lifetime and shared
//! read-only across concurrent search calls — no locking required.

use crate::document::{Document, MetadataValue, SourceKind};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Failure to load a corpus snapshot.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// The snapshot file could not be read.
    #[error("failed to read corpus snapshot: {0}")]
    Io(#[from] std::io::Error),
    /// The snapshot is not the expected JSON mapping.
    #[error("malformed corpus snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct RawPassage {
    text: String,
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,
}

/// An immutable corpus of passages partitioned into collections.
///
/// Each collection is ordered by ascending document id — the invariant the
/// lexical index relies on for deterministic tie-breaking.
#[derive(Debug, Default)]
pub struct CorpusSnapshot {
    collections: HashMap<SourceKind, Vec<Arc<Document>>>,
    skipped: usize,
}

impl CorpusSnapshot {
    /// An empty corpus. Searching it yields empty results, not errors.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a snapshot from its JSON text.
    ///
    /// Entries with empty text, a missing or unknown `source_type`, or
    /// non-scalar metadata values are skipped (tracked in
    /// [`CorpusSnapshot::skipped`]) rather than failing the load.
    pub fn from_json_str(json: &str) -> Result<Self, CorpusError> {
        let raw: HashMap<String, RawPassage> = serde_json::from_str(json)?;

        let mut collections: HashMap<SourceKind, Vec<Arc<Document>>> = HashMap::new();
        let mut skipped = 0usize;

        for (id, passage) in raw {
            if passage.text.trim().is_empty() {
                skipped += 1;
                continue;
            }
            let kind = passage
                .metadata
                .get("source_type")
                .and_then(|v| v.as_str())
                .and_then(SourceKind::parse);
            let Some(kind) = kind else {
                skipped += 1;
                continue;
            };

            let metadata: HashMap<String, MetadataValue> = passage
                .metadata
                .into_iter()
                .filter_map(|(k, v)| MetadataValue::from_json(v).map(|mv| (k, mv)))
                .collect();

            collections
                .entry(kind)
                .or_default()
                .push(Arc::new(Document::new(id, passage.text, metadata, kind)));
        }

        for docs in collections.values_mut() {
            docs.sort_unstable_by(|a, b| a.id.cmp(&b.id));
        }

        Ok(Self {
            collections,
            skipped,
        })
    }

    /// Loads a snapshot from a file.
    pub fn from_file(path: &Path) -> Result<Self, CorpusError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Builds a snapshot directly from documents (fixtures and embedding
    /// callers). Collections are sorted by id.
    pub fn from_documents(documents: Vec<Document>) -> Self {
        let mut collections: HashMap<SourceKind, Vec<Arc<Document>>> = HashMap::new();
        for doc in documents {
            collections
                .entry(doc.collection)
                .or_default()
                .push(Arc::new(doc));
        }
        for docs in collections.values_mut() {
            docs.sort_unstable_by(|a, b| a.id.cmp(&b.id));
        }
        Self {
            collections,
            skipped: 0,
        }
    }

    /// Passages of one collection, ordered by id. Missing collections are
    /// empty, not errors.
    pub fn collection(&self, kind: SourceKind) -> &[Arc<Document>] {
        self.collections
            .get(&kind)
            .map(|docs| docs.as_slice())
            .unwrap_or(&[])
    }

    /// Per-collection document counts in fixed collection order.
    pub fn counts(&self) -> Vec<(SourceKind, usize)> {
        SourceKind::ALL
            .into_iter()
            .map(|kind| (kind, self.collection(kind).len()))
            .collect()
    }

    /// Total number of loaded passages.
    pub fn total_documents(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    /// Number of snapshot entries dropped during the load.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Returns `true` if no passages were loaded.
    pub fn is_empty(&self) -> bool {
        self.total_documents() == 0
    }
}
