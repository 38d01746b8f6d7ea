//! Incremental preview rendering for large documents.
//!
//! A document is cut into fixed-size chunks. The chunk holding the line of
//! interest is written first, its neighbours are filled in on both sides,
//! and further chunks load as the surface scrolls near either edge. Every
//! render owns a cancellation token; writes from a superseded render are
//! discarded.
use super::frame::FrameThrottle;
use super::lines::LineSource;
use super::surface::{DocumentSurface, FailurePanel, RenderChunk};
use crate::config::PreviewSettings;
use crate::grammar::{GrammarAsset, GrammarAssetLoader, Highlighter, RenderedDocument};
use crate::metrics::Metrics;
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub chunk_size: usize,
    pub adjacent_chunks: usize,
    /// Distance from either edge, in lines, that triggers loading.
    pub load_threshold: usize,
    pub line_height: usize,
    pub lazy_threshold_bytes: usize,
    pub line_cache_capacity: usize,
    pub theme: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&PreviewSettings::default())
    }
}

impl From<&PreviewSettings> for RenderOptions {
    fn from(settings: &PreviewSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size.max(1),
            adjacent_chunks: settings.adjacent_chunks,
            load_threshold: settings.load_threshold,
            line_height: settings.line_height.max(1),
            lazy_threshold_bytes: settings.lazy_threshold_bytes,
            line_cache_capacity: settings.line_cache_capacity,
            theme: settings.theme.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub text: Arc<str>,
    /// Zero-based line to scroll to and emphasize.
    pub highlight_line: Option<usize>,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Chunk indices in the order they were written.
    Rendered { chunks: Vec<usize> },
    Failed(String),
    Cancelled,
}

enum ChunkSource {
    Text {
        lines: LineSource,
        language: Arc<GrammarAsset>,
        theme: Arc<GrammarAsset>,
    },
    Document(Arc<RenderedDocument>),
}

#[derive(Default)]
struct SessionState {
    loaded: BTreeSet<usize>,
    in_flight: HashSet<usize>,
    load_log: Vec<usize>,
}

struct RenderSession {
    token: CancellationToken,
    source: ChunkSource,
    highlight_line: Option<usize>,
    line_count: usize,
    chunk_size: usize,
    state: Mutex<SessionState>,
}

impl RenderSession {
    fn chunk_count(&self) -> usize {
        self.line_count.div_ceil(self.chunk_size)
    }

    fn build_chunk(&self, index: usize) -> RenderChunk {
        let start_line = index * self.chunk_size;
        let end_line = (start_line + self.chunk_size).min(self.line_count);

        let lines = match &self.source {
            ChunkSource::Document(document) => document.lines[start_line..end_line].to_vec(),
            ChunkSource::Text {
                lines,
                language,
                theme,
            } => {
                let (Some(language), Some(theme)) = (language.as_language(), theme.as_theme())
                else {
                    return RenderChunk {
                        index,
                        start_line,
                        end_line: start_line,
                        lines: Vec::new(),
                        loaded: false,
                    };
                };
                let highlighter = Highlighter::new(language, theme);
                lines
                    .get_lines(start_line, end_line)
                    .iter()
                    .enumerate()
                    .map(|(offset, text)| {
                        let line = start_line + offset;
                        highlighter.highlight_line(line + 1, text, Some(line) == self.highlight_line)
                    })
                    .collect()
            }
        };

        RenderChunk {
            index,
            start_line,
            end_line,
            lines,
            loaded: true,
        }
    }
}

pub struct ChunkedContentRenderer<S: DocumentSurface> {
    surface: Arc<Mutex<S>>,
    loader: Arc<GrammarAssetLoader>,
    options: RenderOptions,
    active: Mutex<CancellationToken>,
    session: Mutex<Option<Arc<RenderSession>>>,
    frame: FrameThrottle,
    metrics: Option<Arc<Metrics>>,
}

impl<S: DocumentSurface> ChunkedContentRenderer<S> {
    pub fn new(surface: Arc<Mutex<S>>, loader: Arc<GrammarAssetLoader>, options: RenderOptions) -> Self {
        Self {
            surface,
            loader,
            options,
            active: Mutex::new(CancellationToken::new()),
            session: Mutex::new(None),
            frame: FrameThrottle::new(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn surface(&self) -> &Arc<Mutex<S>> {
        &self.surface
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn set_theme(&mut self, theme: impl Into<String>) {
        self.options.theme = theme.into();
    }

    /// Renders `request.text`, superseding any render in progress.
    pub async fn render(&self, request: RenderRequest) -> RenderOutcome {
        let token = self.begin();

        let theme = match self.loader.load_theme_if_needed(&self.options.theme).await {
            Ok(theme) => theme,
            Err(e) => {
                if token.is_cancelled() {
                    return RenderOutcome::Cancelled;
                }
                warn!("Preview aborted: {e}");
                self.surface.lock().show_failure(FailurePanel::new(e.to_string()));
                return RenderOutcome::Failed(e.to_string());
            }
        };
        let language = self.loader.resolve_language(&request.language).await;
        if token.is_cancelled() {
            return RenderOutcome::Cancelled;
        }

        let lines = LineSource::new(
            request.text,
            self.options.lazy_threshold_bytes,
            self.options.line_cache_capacity,
        );
        let line_count = lines.line_count();
        let session = RenderSession {
            token,
            source: ChunkSource::Text {
                lines,
                language,
                theme,
            },
            highlight_line: request.highlight_line,
            line_count,
            chunk_size: self.options.chunk_size,
            state: Mutex::new(SessionState::default()),
        };
        self.run(Arc::new(session)).await
    }

    /// Renders an already highlighted document; no assets are resolved.
    pub async fn render_document(&self, document: Arc<RenderedDocument>) -> RenderOutcome {
        let token = self.begin();
        let session = RenderSession {
            token,
            highlight_line: document.highlight_line,
            line_count: document.line_count(),
            source: ChunkSource::Document(document),
            chunk_size: self.options.chunk_size,
            state: Mutex::new(SessionState::default()),
        };
        self.run(Arc::new(session)).await
    }

    /// Stops the current render and ignores scrolling until the next one.
    pub fn cancel(&self) {
        self.active.lock().cancel();
        self.session.lock().take();
    }

    pub fn on_scroll(&self) {
        self.frame.schedule();
    }

    /// Loads at most one chunk past each edge the viewport is close to.
    /// Returns the chunks written.
    pub async fn on_animation_frame(&self) -> Vec<usize> {
        if !self.frame.take() {
            return Vec::new();
        }
        let Some(session) = self.session.lock().clone() else {
            return Vec::new();
        };
        if session.token.is_cancelled() {
            return Vec::new();
        }

        let (near_top, near_bottom) = {
            let surface = self.surface.lock();
            let threshold = self.options.load_threshold * self.options.line_height;
            let top = surface.scroll_top();
            let bottom = top + surface.client_height();
            (
                top <= threshold,
                surface.scroll_height().saturating_sub(bottom) <= threshold,
            )
        };
        let (min_loaded, max_loaded) = {
            let state = session.state.lock();
            match (state.loaded.first(), state.loaded.last()) {
                (Some(&min), Some(&max)) => (min, max),
                _ => return Vec::new(),
            }
        };

        let mut written = Vec::new();
        if near_bottom && self.load_chunk(&session, max_loaded + 1).await {
            written.push(max_loaded + 1);
        }
        if near_top && min_loaded > 0 && self.load_chunk(&session, min_loaded - 1).await {
            written.push(min_loaded - 1);
        }
        written
    }

    /// Loaded chunk indices of the current render.
    pub fn loaded_chunks(&self) -> Vec<usize> {
        self.session
            .lock()
            .as_ref()
            .map(|session| session.state.lock().loaded.iter().copied().collect())
            .unwrap_or_default()
    }

    fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let previous = std::mem::replace(&mut *self.active.lock(), token.clone());
        previous.cancel();
        self.session.lock().take();
        token
    }

    async fn run(&self, session: Arc<RenderSession>) -> RenderOutcome {
        {
            let mut current = self.session.lock();
            if session.token.is_cancelled() {
                return RenderOutcome::Cancelled;
            }
            *current = Some(Arc::clone(&session));
        }
        {
            let mut surface = self.surface.lock();
            if session.token.is_cancelled() {
                return RenderOutcome::Cancelled;
            }
            surface.clear();
        }
        if session.line_count == 0 {
            return RenderOutcome::Rendered { chunks: Vec::new() };
        }

        let focus = session
            .highlight_line
            .map(|line| line.min(session.line_count - 1));
        let initial = focus.map_or(0, |line| line / session.chunk_size);
        debug!(
            "Rendering {} lines in {} chunks, starting at chunk {}",
            session.line_count,
            session.chunk_count(),
            initial
        );

        if !self.load_chunk(&session, initial).await {
            return RenderOutcome::Cancelled;
        }
        if let Some(line) = focus {
            let mut surface = self.surface.lock();
            if !session.token.is_cancelled() {
                let row = (line - initial * session.chunk_size) * self.options.line_height;
                let top = row.saturating_sub(surface.client_height() / 2);
                surface.set_scroll_top(top);
            }
        }

        let adjacent = self.options.adjacent_chunks;
        let after = async {
            for offset in 1..=adjacent {
                self.load_chunk(&session, initial + offset).await;
            }
        };
        let before = async {
            for offset in 1..=adjacent.min(initial) {
                self.load_chunk(&session, initial - offset).await;
            }
        };
        tokio::join!(after, before);

        if session.token.is_cancelled() {
            return RenderOutcome::Cancelled;
        }
        let chunks = session.state.lock().load_log.clone();
        RenderOutcome::Rendered { chunks }
    }

    /// Writes chunk `index` next to the loaded range. Chunks that are out of
    /// range, already loaded, in flight or not adjacent to the loaded range
    /// are skipped.
    async fn load_chunk(&self, session: &RenderSession, index: usize) -> bool {
        if session.token.is_cancelled() || index >= session.chunk_count() {
            return false;
        }
        {
            let mut state = session.state.lock();
            if state.loaded.contains(&index) || !state.in_flight.insert(index) {
                return false;
            }
        }

        let chunk = session.build_chunk(index);
        tokio::task::yield_now().await;

        let mut state = session.state.lock();
        state.in_flight.remove(&index);
        let mut surface = self.surface.lock();
        if session.token.is_cancelled() {
            return false;
        }

        match (state.loaded.first().copied(), state.loaded.last().copied()) {
            (None, _) => surface.append_block(chunk),
            (_, Some(max)) if index == max + 1 => surface.append_block(chunk),
            (Some(min), _) if index + 1 == min => {
                let height_before = surface.scroll_height();
                let top = surface.scroll_top();
                surface.prepend_block(chunk);
                let delta = surface.scroll_height() - height_before;
                surface.set_scroll_top(top + delta);
            }
            _ => {
                debug!("Chunk {index} is not adjacent to the loaded range, skipping");
                return false;
            }
        }

        state.loaded.insert(index);
        state.load_log.push(index);
        if let Some(metrics) = &self.metrics {
            metrics.chunks_rendered.inc();
        }
        true
    }
}
