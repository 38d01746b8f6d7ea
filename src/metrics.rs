use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    pub searches: IntCounter,
    pub fallback_searches: IntCounter,
    pub process_timeouts: IntCounter,
    pub malformed_records: IntCounter,
    pub files_scanned: IntCounter,
    pub files_skipped: IntCounter,
    pub matches_found: IntCounter,
    pub chunks_rendered: IntCounter,
    pub content_cache_hits: IntCounter,
    pub content_cache_misses: IntCounter,
    pub search_duration: Histogram,
    pub slow_searches: IntCounter,
    registry: Arc<Registry>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::with_opts(Opts::new(name, help)).unwrap();
    registry.register(Box::new(counter.clone())).ok();
    counter
}

fn histogram(registry: &Registry, name: &str, help: &str) -> Histogram {
    let buckets = vec![0.005, 0.025, 0.1, 0.25, 0.5, 1.0, 2.5, 10.0];
    let histogram = Histogram::with_opts(HistogramOpts::new(name, help).buckets(buckets)).unwrap();
    registry.register(Box::new(histogram.clone())).ok();
    histogram
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        Metrics {
            searches: counter(&registry, "searches_total", "Number of search requests"),
            fallback_searches: counter(
                &registry,
                "fallback_searches_total",
                "Searches served by the in-process scanner",
            ),
            process_timeouts: counter(
                &registry,
                "process_timeouts_total",
                "External search processes killed by the timeout",
            ),
            malformed_records: counter(
                &registry,
                "malformed_records_total",
                "Output lines from the search tool that failed to parse",
            ),
            files_scanned: counter(&registry, "files_scanned", "Number of files scanned"),
            files_skipped: counter(
                &registry,
                "files_skipped",
                "Files skipped for size, encoding or read errors",
            ),
            matches_found: counter(&registry, "matches_found", "Number of matches found"),
            chunks_rendered: counter(
                &registry,
                "chunks_rendered",
                "Preview chunks written to a surface",
            ),
            content_cache_hits: counter(
                &registry,
                "content_cache_hits_total",
                "File content served from the cache",
            ),
            content_cache_misses: counter(
                &registry,
                "content_cache_misses_total",
                "File content read from disk",
            ),
            search_duration: histogram(
                &registry,
                "search_duration_seconds",
                "Wall time of a single strategy search",
            ),
            slow_searches: counter(
                &registry,
                "slow_searches_total",
                "Strategy searches that took 500ms or longer",
            ),
            registry: Arc::new(registry),
        }
    }

    pub fn gather(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_reports_counters() {
        let metrics = Metrics::new();
        metrics.searches.inc();
        metrics.fallback_searches.inc_by(2);

        let text = metrics.gather();
        assert!(text.contains("searches_total 1"));
        assert!(text.contains("fallback_searches_total 2"));
        assert!(text.contains("search_duration_seconds_count 0"));
    }
}
