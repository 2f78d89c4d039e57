//! Caller-facing error taxonomy.
//!
//! Only `IndexUnavailable` represents a hard failure of a search call:
//! every other fault in the pipeline (remote lookup errors, re-ranker
//! failure, oracle failure, exhausted expansion) degrades gracefully and is
//! never surfaced to the caller. Component-local error types live next to
//! their components (`rerank::RerankError`, the server's remote and oracle
//! errors).

use thiserror::Error;

/// Errors a search call can surface to its caller.
#[derive(Debug, Error)]
pub enum SearchError {
    /// No lexical index has been built for the named collection. The local
    /// index is the one hard dependency of the pipeline.
    #[error("lexical index unavailable for collection '{0}'")]
    IndexUnavailable(String),

    /// The request failed validation (empty query, zero `top_k`,
    /// out-of-range threshold).
    #[error("invalid search request: {0}")]
    InvalidRequest(String),
}
