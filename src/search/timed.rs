use super::{SearchQuery, SearchResultSet, SearchStrategy};
use crate::error::Result;
use crate::metrics::Metrics;
use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Searches slower than this are logged at info level.
const SLOW_SEARCH: Duration = Duration::from_millis(500);

/// Wraps a strategy so every search logs how long it took and observes the
/// duration in `search_duration_seconds`.
pub fn timed<S: SearchStrategy>(inner: S, metrics: Arc<Metrics>) -> Timed<S> {
    Timed { inner, metrics }
}

pub struct Timed<S> {
    inner: S,
    metrics: Arc<Metrics>,
}

impl<S> Timed<S> {
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: SearchStrategy> SearchStrategy for Timed<S> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn is_available(&self) -> bool {
        self.inner.is_available().await
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResultSet> {
        let start = Instant::now();
        let result = self.inner.search(query).await;
        let elapsed = start.elapsed();
        self.metrics.search_duration.observe(elapsed.as_secs_f64());

        let outcome = match &result {
            Ok(results) => format!("{} matches", results.len()),
            Err(e) => format!("error: {e}"),
        };
        if elapsed >= SLOW_SEARCH {
            self.metrics.slow_searches.inc();
            info!(
                "{} search for '{}' took {:.2?} ({})",
                self.inner.name(),
                query.pattern,
                elapsed,
                outcome
            );
        } else {
            debug!(
                "{} search for '{}' took {:.2?} ({})",
                self.inner.name(),
                query.pattern,
                elapsed,
                outcome
            );
        }
        result
    }
}
