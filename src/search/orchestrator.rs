use super::{
    IconRef, SearchQuery, SearchResultSet, SearchStrategy, MIN_PATTERN_CHARS, NO_RESULTS,
    NO_WORKSPACE, SEARCH_FAILED,
};
use super::registry::StrategyRegistry;
use crate::error::{Result, RfscopeError};
use crate::metrics::Metrics;
use log::{debug, error, warn};
use std::sync::Arc;

/// Runs a query against the preferred strategy and falls back to the second
/// one when the first is unavailable or fails. Always answers with a result
/// set; errors end up in its `message`.
pub struct SearchOrchestrator {
    primary: Arc<dyn SearchStrategy>,
    fallback: Arc<dyn SearchStrategy>,
    metrics: Arc<Metrics>,
}

impl SearchOrchestrator {
    pub fn new(primary: Arc<dyn SearchStrategy>, fallback: Arc<dyn SearchStrategy>) -> Self {
        Self {
            primary,
            fallback,
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn from_registry(registry: &StrategyRegistry, primary: &str, fallback: &str) -> Result<Self> {
        let lookup = |name: &str| {
            registry
                .get(name)
                .ok_or_else(|| RfscopeError::Config(format!("unknown search strategy '{name}'")))
        };
        Ok(Self::new(lookup(primary)?, lookup(fallback)?))
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub async fn search(&self, query: &SearchQuery) -> SearchResultSet {
        if query.pattern_chars() < MIN_PATTERN_CHARS {
            return SearchResultSet::empty(&query.pattern);
        }
        if query.scope_paths.is_empty() {
            return SearchResultSet::with_message(&query.pattern, NO_WORKSPACE);
        }
        self.metrics.searches.inc();

        match self.dispatch(query).await {
            Ok((results, strategy)) => normalize(results, query, strategy),
            Err(e) => {
                error!("Search for '{}' failed: {}", query.pattern, e);
                SearchResultSet::with_message(&query.pattern, SEARCH_FAILED)
            }
        }
    }

    async fn dispatch(&self, query: &SearchQuery) -> Result<(SearchResultSet, &'static str)> {
        if self.primary.is_available().await {
            match self.primary.search(query).await {
                Ok(results) => return Ok((results, self.primary.name())),
                // Pinned to a single strategy: nothing to fall back to.
                Err(e) if self.primary.name() == self.fallback.name() => return Err(e),
                Err(e) if e.is_strategy_failure() => {
                    warn!("{} failed, falling back: {}", self.primary.name(), e)
                }
                Err(e) => error!("{} failed, falling back: {}", self.primary.name(), e),
            }
        } else {
            debug!("{} unavailable, using {}", self.primary.name(), self.fallback.name());
        }

        self.metrics.fallback_searches.inc();
        let results = self.fallback.search(query).await?;
        Ok((results, self.fallback.name()))
    }
}

fn normalize(mut results: SearchResultSet, query: &SearchQuery, strategy: &str) -> SearchResultSet {
    results.matches.truncate(query.max_results);
    for found in &mut results.matches {
        found.preview = preview(&found.text, query.max_columns);
        found.icon = IconRef::for_path(&found.file);
    }

    results.query = query.pattern.clone();
    results.strategy = Some(strategy.to_string());
    if results.matches.is_empty() {
        results.message = Some(NO_RESULTS.to_string());
    }
    results
}

fn preview(text: &str, max_columns: usize) -> String {
    text.trim().chars().take(max_columns).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{MockSearchStrategy, SearchMatch};
    use std::path::PathBuf;

    fn hit(file: &str, line: usize) -> SearchMatch {
        SearchMatch::raw(PathBuf::from(file), line, 1, format!("   match on line {line}   "))
    }

    fn query(pattern: &str) -> SearchQuery {
        SearchQuery::new(pattern, vec![PathBuf::from("/work")])
    }

    fn strategy(name: &'static str) -> MockSearchStrategy {
        let mut mock = MockSearchStrategy::new();
        mock.expect_name().return_const(name);
        mock
    }

    #[tokio::test]
    async fn test_short_pattern_invokes_nothing() {
        let mut primary = strategy("ripgrep");
        primary.expect_is_available().never();
        primary.expect_search().never();
        let mut fallback = strategy("scan");
        fallback.expect_search().never();

        let orchestrator = SearchOrchestrator::new(Arc::new(primary), Arc::new(fallback));
        let results = orchestrator.search(&query("a")).await;
        assert!(results.is_empty());
        assert_eq!(results.message, None);
    }

    #[tokio::test]
    async fn test_missing_scope_reports_no_workspace() {
        let mut primary = strategy("ripgrep");
        primary.expect_search().never();
        let orchestrator = SearchOrchestrator::new(Arc::new(primary), Arc::new(strategy("scan")));

        let results = orchestrator.search(&SearchQuery::new("needle", vec![])).await;
        assert_eq!(results.message.as_deref(), Some(NO_WORKSPACE));
    }

    #[tokio::test]
    async fn test_process_failure_falls_back_exactly_once() {
        let mut primary = strategy("ripgrep");
        primary.expect_is_available().return_const(true);
        primary.expect_search().times(1).returning(|_| {
            Err(RfscopeError::ProcessExit {
                code: Some(2),
                stderr: "boom".to_string(),
            })
        });
        let mut fallback = strategy("scan");
        fallback
            .expect_search()
            .times(1)
            .returning(|q| Ok(SearchResultSet::from_matches(&q.pattern, vec![hit("/work/a.rs", 3)])));

        let metrics = Arc::new(Metrics::new());
        let orchestrator = SearchOrchestrator::new(Arc::new(primary), Arc::new(fallback))
            .with_metrics(Arc::clone(&metrics));
        let results = orchestrator.search(&query("needle")).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results.strategy.as_deref(), Some("scan"));
        assert_eq!(metrics.fallback_searches.get(), 1);
    }

    #[tokio::test]
    async fn test_pinned_strategy_is_not_retried() {
        let mut scan = strategy("scan");
        scan.expect_is_available().return_const(true);
        scan.expect_search()
            .times(1)
            .returning(|_| Err(RfscopeError::Other("unreadable".to_string())));

        let scan: Arc<dyn SearchStrategy> = Arc::new(scan);
        let metrics = Arc::new(Metrics::new());
        let orchestrator = SearchOrchestrator::new(Arc::clone(&scan), scan)
            .with_metrics(Arc::clone(&metrics));
        let results = orchestrator.search(&query("needle")).await;

        assert_eq!(results.message.as_deref(), Some(SEARCH_FAILED));
        assert_eq!(metrics.fallback_searches.get(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_primary_goes_straight_to_fallback() {
        let mut primary = strategy("ripgrep");
        primary.expect_is_available().return_const(false);
        primary.expect_search().never();
        let mut fallback = strategy("scan");
        fallback
            .expect_search()
            .times(1)
            .returning(|q| Ok(SearchResultSet::empty(&q.pattern)));

        let orchestrator = SearchOrchestrator::new(Arc::new(primary), Arc::new(fallback));
        let results = orchestrator.search(&query("needle")).await;
        assert_eq!(results.message.as_deref(), Some(NO_RESULTS));
    }

    #[tokio::test]
    async fn test_fallback_error_is_reported_not_propagated() {
        let mut primary = strategy("ripgrep");
        primary.expect_is_available().return_const(false);
        let mut fallback = strategy("scan");
        fallback
            .expect_search()
            .returning(|_| Err(RfscopeError::Other("disk on fire".to_string())));

        let orchestrator = SearchOrchestrator::new(Arc::new(primary), Arc::new(fallback));
        let results = orchestrator.search(&query("needle")).await;
        assert!(results.is_empty());
        assert_eq!(results.message.as_deref(), Some(SEARCH_FAILED));
    }

    #[tokio::test]
    async fn test_results_are_truncated_and_normalized() {
        let mut primary = strategy("ripgrep");
        primary.expect_is_available().return_const(true);
        primary.expect_search().returning(|q| {
            let matches = (1..=5).map(|n| hit("/work/src/lib.rs", n)).collect();
            Ok(SearchResultSet::from_matches(&q.pattern, matches))
        });

        let orchestrator = SearchOrchestrator::new(Arc::new(primary), Arc::new(strategy("scan")));
        let mut q = query("line").with_max_results(3);
        q.max_columns = 8;
        let results = orchestrator.search(&q).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results.strategy.as_deref(), Some("ripgrep"));
        assert_eq!(results.matches[0].preview, "match on");
        assert_eq!(results.matches[0].icon.as_str(), "rust");
        assert_eq!(results.message, None);
    }

    #[test]
    fn test_preview_counts_chars() {
        assert_eq!(preview("  héllo wörld  ", 7), "héllo w");
    }
}
