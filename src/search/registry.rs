//! Named search strategies, registered explicitly at startup.
use super::{timed, FallbackScanStrategy, ProcessSearchStrategy, SearchStrategy};
use crate::config::SearchSettings;
use crate::metrics::Metrics;
use std::collections::HashMap;
use std::sync::Arc;

pub const PROCESS_STRATEGY: &str = "ripgrep";
pub const SCAN_STRATEGY: &str = "scan";

#[derive(Default)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn SearchStrategy>>,
    by_name: HashMap<String, usize>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `strategy` under its own name, replacing any earlier entry
    /// with that name.
    pub fn register(&mut self, strategy: Arc<dyn SearchStrategy>) {
        let name = strategy.name().to_string();
        match self.by_name.get(&name) {
            Some(&index) => self.strategies[index] = strategy,
            None => {
                self.by_name.insert(name, self.strategies.len());
                self.strategies.push(strategy);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SearchStrategy>> {
        self.by_name
            .get(name)
            .map(|&index| Arc::clone(&self.strategies[index]))
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

/// Registers the process-backed and in-process strategies, each wrapped in
/// [`timed`].
pub fn register_builtin_strategies(
    registry: &mut StrategyRegistry,
    settings: &SearchSettings,
    metrics: &Arc<Metrics>,
) {
    registry.register(Arc::new(timed(
        ProcessSearchStrategy::new(settings).with_metrics(Arc::clone(metrics)),
        Arc::clone(metrics),
    )));
    registry.register(Arc::new(timed(
        FallbackScanStrategy::new(settings).with_metrics(Arc::clone(metrics)),
        Arc::clone(metrics),
    )));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::MockSearchStrategy;

    fn named(name: &'static str) -> Arc<dyn SearchStrategy> {
        let mut mock = MockSearchStrategy::new();
        mock.expect_name().return_const(name);
        Arc::new(mock)
    }

    #[test]
    fn test_builtin_registration() {
        let mut registry = StrategyRegistry::new();
        register_builtin_strategies(&mut registry, &SearchSettings::default(), &Arc::new(Metrics::new()));

        assert_eq!(registry.names(), vec![PROCESS_STRATEGY, SCAN_STRATEGY]);
        assert!(registry.get(SCAN_STRATEGY).is_some());
        assert!(registry.get("ack").is_none());
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = StrategyRegistry::new();
        registry.register(named("scan"));
        registry.register(named("scan"));
        registry.register(named("other"));
        assert_eq!(registry.len(), 2);
    }
}
