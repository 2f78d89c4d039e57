//! Global configuration constants for lexrag.
//!
//! All tuning parameters, input validation limits, and server defaults are
//! defined here. These are compile-time constants; runtime configuration is
//! handled via CLI arguments and environment variables in `main.rs`.

/// Reciprocal Rank Fusion (RRF) constant `k`.
///
/// Used in the formula `1 / (k + rank)` to combine ranked lists.
/// Standard value is 60.0 (from the original RRF paper). It dampens the
/// influence of rank 1 vs rank 2 while still rewarding high placement.
pub const RRF_K: f32 = 60.0;

/// Weight of the word-token channel in lexical similarity scoring.
pub const WORD_CHANNEL_WEIGHT: f32 = 0.6;

/// Weight of the character n-gram channel in lexical similarity scoring.
///
/// Character n-grams give subword matching for agglutinative text where
/// whitespace tokens rarely align (e.g. Korean statute language).
pub const CHAR_CHANNEL_WEIGHT: f32 = 0.4;

/// Minimum character n-gram size for the character channel.
pub const CHAR_NGRAM_MIN: usize = 2;

/// Maximum character n-gram size for the character channel.
pub const CHAR_NGRAM_MAX: usize = 4;

/// Maximum number of fused candidates passed into the re-ranking stage.
///
/// Bounds re-ranker cost: fusion output across all collections is truncated
/// to this many candidates before pairwise scoring.
pub const FUSION_FAN_IN: usize = 20;

/// Number of candidates requested from each source per collection.
pub const PER_SOURCE_FETCH: usize = 20;

/// Weight of first-stage (fusion) evidence in the pairwise re-ranker.
pub const RERANK_FUSION_WEIGHT: f32 = 0.4;

/// Weight of pairwise query/passage agreement in the pairwise re-ranker.
pub const RERANK_OVERLAP_WEIGHT: f32 = 0.6;

/// Trust weight applied to statute passages (highest authority).
pub const TRUST_WEIGHT_STATUTE: f32 = 1.0;

/// Trust weight applied to case-law passages.
pub const TRUST_WEIGHT_CASE_LAW: f32 = 0.9;

/// Trust weight applied to platform-policy passages (advisory).
pub const TRUST_WEIGHT_PLATFORM_POLICY: f32 = 0.8;

/// Default number of results returned by a search call.
pub const DEFAULT_TOP_K: usize = 5;

/// Default minimum final score for a result to be returned.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.7;

/// Default adequacy threshold for the self-healing loop.
pub const DEFAULT_FITNESS_THRESHOLD: f32 = 0.6;

/// Default maximum number of expand-and-retry iterations.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Maximum `top_k` per search request.
pub const MAX_TOP_K: usize = 100;

/// Maximum query length in bytes.
pub const MAX_QUERY_LEN: usize = 1_000;

/// Maximum number of collections processed concurrently per search call.
pub const COLLECTION_WORKERS: usize = 3;

/// Overall per-call deadline in seconds. Expiry mid-retry returns the best
/// results gathered so far rather than blocking.
pub const SEARCH_DEADLINE_SECS: u64 = 30;

/// Time-to-live for cached search results, in seconds.
pub const RESULT_CACHE_TTL_SECS: u64 = 300;

/// Maximum number of cached search results before stale entries are swept.
pub const RESULT_CACHE_MAX_ENTRIES: usize = 1024;

/// Maximum number of attempts (initial + retries) against the remote portal
/// for a single lookup. Only transient failures are retried.
pub const REMOTE_MAX_ATTEMPTS: u32 = 3;

/// Base backoff between remote retry attempts, in milliseconds. Doubles per
/// attempt.
pub const REMOTE_BACKOFF_BASE_MS: u64 = 200;

/// Per-request timeout against the remote portal, in seconds.
pub const REMOTE_TIMEOUT_SECS: u64 = 10;

/// Per-request timeout against the judgment oracle, in seconds.
pub const ORACLE_TIMEOUT_SECS: u64 = 15;

/// Default HTTP server port.
pub const DEFAULT_PORT: u16 = 3050;

/// Default base URL of the authoritative law portal.
pub const DEFAULT_PORTAL_URL: &str = "https://www.law.go.kr";

/// Per-request timeout for the HTTP server, in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Maximum number of concurrent in-flight HTTP requests.
pub const MAX_CONCURRENT_REQUESTS: usize = 256;

/// Global rate limit in requests per second.
pub const RATE_LIMIT_RPS: u64 = 100;

/// Maximum HTTP request body size in bytes (64 KB — the API is query-string
/// driven, request bodies are not expected).
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;
