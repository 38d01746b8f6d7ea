use crate::cache::{highlight_key, ContentCache, FileContent, RenderedContentCache};
use crate::config::Config;
use crate::error::{Result, RfscopeError};
use crate::grammar::{
    language_id_for_path, GrammarAssetLoader, Highlighter, LanguageDefinition, RenderedDocument,
};
use crate::metrics::Metrics;
use crate::search::registry::{register_builtin_strategies, PROCESS_STRATEGY, SCAN_STRATEGY};
use crate::search::{
    SearchOrchestrator, SearchQuery, SearchResultSet, SearchStrategy, StrategyRegistry,
};
use crate::view::{
    ChunkedContentRenderer, DocumentSurface, FailurePanel, RenderOptions, RenderOutcome,
    RenderRequest,
};
use byte_unit::{Byte, UnitType};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Owns the single cache instances, the grammar loader and the search
/// orchestrator. Everything else borrows them from here.
pub struct RfscopeApp {
    config: Config,
    metrics: Arc<Metrics>,
    registry: StrategyRegistry,
    orchestrator: SearchOrchestrator,
    content_cache: Arc<ContentCache>,
    rendered_cache: Arc<RenderedContentCache<Arc<RenderedDocument>>>,
    loader: Arc<GrammarAssetLoader>,
}

impl RfscopeApp {
    /// Must be called inside a tokio runtime; the builtin asset host is
    /// spawned here.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_primary(config, PROCESS_STRATEGY)
    }

    /// Like [`RfscopeApp::new`], dispatching to `primary` first.
    pub fn with_primary(config: Config, primary: &str) -> Result<Self> {
        let metrics = Arc::new(Metrics::new());
        let mut registry = StrategyRegistry::new();
        register_builtin_strategies(&mut registry, &config.search, &metrics);
        info!("Registered search strategies: {:?}", registry.names());

        let orchestrator = SearchOrchestrator::from_registry(&registry, primary, SCAN_STRATEGY)?
            .with_metrics(Arc::clone(&metrics));
        Ok(Self::assemble(config, metrics, registry, orchestrator))
    }

    /// Wires explicit strategies in place of the registered ones.
    pub fn with_strategies(
        config: Config,
        primary: Arc<dyn SearchStrategy>,
        fallback: Arc<dyn SearchStrategy>,
    ) -> Self {
        let metrics = Arc::new(Metrics::new());
        let mut registry = StrategyRegistry::new();
        registry.register(Arc::clone(&primary));
        registry.register(Arc::clone(&fallback));

        let orchestrator =
            SearchOrchestrator::new(primary, fallback).with_metrics(Arc::clone(&metrics));
        Self::assemble(config, metrics, registry, orchestrator)
    }

    fn assemble(
        config: Config,
        metrics: Arc<Metrics>,
        registry: StrategyRegistry,
        orchestrator: SearchOrchestrator,
    ) -> Self {
        let policy = config.cache.eviction;
        let content_cache = Arc::new(
            ContentCache::new(config.cache.content_capacity, policy)
                .with_metrics(Arc::clone(&metrics)),
        );
        let rendered_cache = Arc::new(RenderedContentCache::new(
            config.cache.rendered_capacity,
            policy,
        ));
        let loader = Arc::new(GrammarAssetLoader::builtin(config.preview.asset_timeout()));

        Self {
            config,
            metrics,
            registry,
            orchestrator,
            content_cache,
            rendered_cache,
            loader,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn content_cache(&self) -> &Arc<ContentCache> {
        &self.content_cache
    }

    pub fn rendered_cache(&self) -> &Arc<RenderedContentCache<Arc<RenderedDocument>>> {
        &self.rendered_cache
    }

    pub fn loader(&self) -> &Arc<GrammarAssetLoader> {
        &self.loader
    }

    /// A query carrying the configured `[search]` defaults.
    pub fn query(&self, pattern: impl Into<String>, scope_paths: Vec<PathBuf>) -> SearchQuery {
        SearchQuery::from_settings(pattern, scope_paths, &self.config.search)
    }

    pub async fn search(&self, query: &SearchQuery) -> SearchResultSet {
        self.orchestrator.search(query).await
    }

    /// A renderer that shares this app's loader and metrics.
    pub fn renderer<S: DocumentSurface>(&self, surface: Arc<Mutex<S>>) -> ChunkedContentRenderer<S> {
        ChunkedContentRenderer::new(
            surface,
            Arc::clone(&self.loader),
            RenderOptions::from(&self.config.preview),
        )
        .with_metrics(Arc::clone(&self.metrics))
    }

    /// Opens `path` in `renderer`, focusing the zero-based `line`.
    ///
    /// Documents up to `preview.cache_max_lines` lines are highlighted in one
    /// pass and kept in the rendered cache; larger ones are highlighted chunk
    /// by chunk as they scroll into view.
    pub async fn preview<S: DocumentSurface>(
        &self,
        renderer: &ChunkedContentRenderer<S>,
        path: &Path,
        line: Option<usize>,
    ) -> RenderOutcome {
        let text = match self.content_cache.get(path).await {
            Ok(FileContent::Text(text)) => text,
            Ok(FileContent::Binary(bytes)) => {
                let size = Byte::from_u64(bytes.len() as u64).get_appropriate_unit(UnitType::Binary);
                let details = format!(
                    "{} is a binary file ({:.1} {})",
                    path.display(),
                    size.get_value(),
                    size.get_unit()
                );
                return fail(renderer, details);
            }
            Err(e) => {
                warn!("Cannot preview {}: {}", path.display(), e);
                return fail(renderer, e.to_string());
            }
        };

        let language = language_id_for_path(path);
        let line_count = memchr::memchr_iter(b'\n', text.as_bytes()).count() + 1;
        if line_count > self.config.preview.cache_max_lines {
            debug!("{} has {} lines, rendering in chunks", path.display(), line_count);
            return renderer
                .render(RenderRequest {
                    text,
                    highlight_line: line,
                    language: language.to_string(),
                })
                .await;
        }

        match self.highlighted(path, &text, language, line, &renderer.options().theme).await {
            Ok(document) => renderer.render_document(document).await,
            Err(e) => {
                warn!("Preview aborted: {e}");
                fail(renderer, e.to_string())
            }
        }
    }

    async fn highlighted(
        &self,
        path: &Path,
        text: &str,
        language: &str,
        line: Option<usize>,
        theme: &str,
    ) -> Result<Arc<RenderedDocument>> {
        let key = highlight_key(path, line);
        if let Some(document) = self.rendered_cache.get(&key) {
            return Ok(document);
        }

        let theme = self.loader.load_theme_if_needed(theme).await?;
        let language = self.loader.resolve_language(language).await;
        let plaintext = LanguageDefinition::plaintext();
        let language = language.as_language().unwrap_or(&plaintext);
        let theme = theme.as_theme().ok_or_else(|| RfscopeError::AssetLoad {
            id: theme.id.clone(),
            reason: "not a theme".to_string(),
        })?;

        self.rendered_cache.get_or_insert_with(&key, || {
            Ok(Arc::new(Highlighter::new(language, theme).render_document(text, line)))
        })
    }

    /// Drops every cached form of `path` after it changed on disk.
    pub fn on_file_saved(&self, path: &Path) {
        let content = self.content_cache.invalidate(path);
        let rendered = self.rendered_cache.invalidate_file(path);
        debug!(
            "Invalidated {} (content: {}, rendered entries: {})",
            path.display(),
            content,
            rendered
        );
    }

    /// Switches the preview theme; rendered documents carry the old colors,
    /// so they are dropped.
    pub fn set_theme(&mut self, theme: impl Into<String>) {
        self.config.preview.theme = theme.into();
        self.rendered_cache.clear();
    }
}

fn fail<S: DocumentSurface>(renderer: &ChunkedContentRenderer<S>, details: String) -> RenderOutcome {
    renderer.cancel();
    renderer.surface().lock().show_failure(FailurePanel::new(details.clone()));
    RenderOutcome::Failed(details)
}
