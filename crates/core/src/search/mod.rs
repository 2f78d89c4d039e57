//! Search primitives shared across the pipeline.

/// Reciprocal rank fusion of ranked candidate lists.
pub mod fusion;
/// Candidate, fused, and ranked result types plus the search request shape.
pub mod types;
