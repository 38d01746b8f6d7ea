//! Scrollable display surfaces the renderers write into.
use crate::grammar::HighlightedLine;
use std::collections::VecDeque;

pub const PREVIEW_UNAVAILABLE: &str = "Preview unavailable";

/// A contiguous run of document lines, the unit the chunked renderer
/// inserts into a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderChunk {
    pub index: usize,
    /// Zero-based, inclusive.
    pub start_line: usize,
    /// Zero-based, exclusive.
    pub end_line: usize,
    pub lines: Vec<HighlightedLine>,
    pub loaded: bool,
}

impl RenderChunk {
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line
    }

    pub fn rendered(&self) -> String {
        self.lines
            .iter()
            .map(HighlightedLine::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailurePanel {
    pub title: String,
    pub details: Option<String>,
}

impl FailurePanel {
    pub fn new(details: impl Into<String>) -> Self {
        Self {
            title: PREVIEW_UNAVAILABLE.to_string(),
            details: Some(details.into()),
        }
    }
}

/// Heights and offsets are in rows of the host's smallest unit.
pub trait ScrollSurface {
    fn scroll_top(&self) -> usize;

    /// Implementations clamp to `[0, max_scroll_top()]`.
    fn set_scroll_top(&mut self, top: usize);

    fn client_height(&self) -> usize;

    fn scroll_height(&self) -> usize;

    fn max_scroll_top(&self) -> usize {
        self.scroll_height().saturating_sub(self.client_height())
    }
}

pub trait DocumentSurface: ScrollSurface + Send {
    fn clear(&mut self);

    fn append_block(&mut self, chunk: RenderChunk);

    /// Inserts above everything else. Does not touch the scroll position.
    fn prepend_block(&mut self, chunk: RenderChunk);

    fn show_failure(&mut self, panel: FailurePanel);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Cleared,
    Appended {
        chunk: usize,
        height: usize,
    },
    Prepended {
        chunk: usize,
        height: usize,
    },
    Scrolled {
        from: usize,
        to: usize,
    },
    Failed(FailurePanel),
}

/// In-memory surface used by the terminal preview pane and by tests. Keeps
/// a journal of every mutation.
#[derive(Debug)]
pub struct MemoryDocument {
    blocks: VecDeque<RenderChunk>,
    scroll_top: usize,
    client_height: usize,
    line_height: usize,
    failure: Option<FailurePanel>,
    events: Vec<SurfaceEvent>,
}

impl MemoryDocument {
    pub fn new(client_height: usize, line_height: usize) -> Self {
        Self {
            blocks: VecDeque::new(),
            scroll_top: 0,
            client_height,
            line_height: line_height.max(1),
            failure: None,
            events: Vec::new(),
        }
    }

    pub fn set_client_height(&mut self, height: usize) {
        self.client_height = height;
        let top = self.scroll_top;
        self.set_scroll_top(top);
    }

    pub fn blocks(&self) -> impl Iterator<Item = &RenderChunk> {
        self.blocks.iter()
    }

    pub fn chunk_indices(&self) -> Vec<usize> {
        self.blocks.iter().map(|b| b.index).collect()
    }

    pub fn failure(&self) -> Option<&FailurePanel> {
        self.failure.as_ref()
    }

    pub fn events(&self) -> &[SurfaceEvent] {
        &self.events
    }

    /// Empties the journal, returning what it held.
    pub fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn line_height(&self) -> usize {
        self.line_height
    }

    /// Lines currently inside the viewport.
    pub fn visible_lines(&self) -> Vec<&HighlightedLine> {
        let first = self.scroll_top / self.line_height;
        let count = self.client_height.div_ceil(self.line_height);
        self.blocks
            .iter()
            .flat_map(|block| block.lines.iter())
            .skip(first)
            .take(count)
            .collect()
    }

    fn block_height(&self, chunk: &RenderChunk) -> usize {
        chunk.lines.len() * self.line_height
    }
}

impl ScrollSurface for MemoryDocument {
    fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    fn set_scroll_top(&mut self, top: usize) {
        let clamped = top.min(self.max_scroll_top());
        if clamped != self.scroll_top {
            self.events.push(SurfaceEvent::Scrolled {
                from: self.scroll_top,
                to: clamped,
            });
        }
        self.scroll_top = clamped;
    }

    fn client_height(&self) -> usize {
        self.client_height
    }

    fn scroll_height(&self) -> usize {
        self.blocks.iter().map(|b| self.block_height(b)).sum()
    }
}

impl DocumentSurface for MemoryDocument {
    fn clear(&mut self) {
        self.blocks.clear();
        self.failure = None;
        self.scroll_top = 0;
        self.events.push(SurfaceEvent::Cleared);
    }

    fn append_block(&mut self, chunk: RenderChunk) {
        self.events.push(SurfaceEvent::Appended {
            chunk: chunk.index,
            height: self.block_height(&chunk),
        });
        self.blocks.push_back(chunk);
    }

    fn prepend_block(&mut self, chunk: RenderChunk) {
        self.events.push(SurfaceEvent::Prepended {
            chunk: chunk.index,
            height: self.block_height(&chunk),
        });
        self.blocks.push_front(chunk);
    }

    fn show_failure(&mut self, panel: FailurePanel) {
        self.blocks.clear();
        self.scroll_top = 0;
        self.events.push(SurfaceEvent::Failed(panel.clone()));
        self.failure = Some(panel);
    }
}
