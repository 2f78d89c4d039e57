//! Prometheus metrics recording.

use lexrag_core::corpus::CorpusSnapshot;
use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Records HTTP request metrics.
pub fn record_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];
    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Records one completed search call.
pub fn record_search(mode: &str, attempts: u32, results: usize, low_confidence: bool) {
    counter!(
        "lexrag_search_total",
        "mode" => mode.to_string(),
        "low_confidence" => low_confidence.to_string()
    )
    .increment(1);
    histogram!("lexrag_search_attempts", "mode" => mode.to_string()).record(attempts as f64);
    histogram!("lexrag_search_results", "mode" => mode.to_string()).record(results as f64);
}

/// Sets corpus gauges once at startup; the snapshot never changes afterwards.
pub fn record_corpus(corpus: &CorpusSnapshot) {
    gauge!("lexrag_collections_total").set(corpus.counts().len() as f64);
    for (kind, count) in corpus.counts() {
        let labels = [("collection", kind.as_str().to_string())];
        gauge!("lexrag_documents_total", &labels).set(count as f64);
    }
}
