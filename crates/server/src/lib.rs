//! lexrag-server — search orchestrator and HTTP server for lexrag.
//!
//! Provides the hybrid retrieval pipeline (remote lookup, judgment oracles,
//! self-healing orchestration) and the REST API surface. The lexical
//! engine itself lives in `lexrag-core`.

/// REST API layer: Axum router, HTTP handlers, models, metrics.
pub mod api;
/// Judgment oracles: fitness evaluation and query expansion.
pub mod oracle;
/// Search orchestrator: fan-out, fusion, re-ranking, self-healing loop.
pub mod orchestrator;
/// External lookup adapter for the authoritative law portal.
pub mod remote;
