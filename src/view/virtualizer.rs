//! Windowed rendering for long result lists.
//!
//! Lists at or below the threshold are materialized in full. Longer lists
//! only materialize the rows around the viewport, with spacer heights
//! standing in for everything else.
use super::frame::FrameThrottle;
use crate::config::ListSettings;
use crate::search::SearchMatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualizerOptions {
    pub threshold: usize,
    pub buffer_size: usize,
    pub item_height: usize,
}

impl Default for VirtualizerOptions {
    fn default() -> Self {
        Self::from(&ListSettings::default())
    }
}

impl From<&ListSettings> for VirtualizerOptions {
    fn from(settings: &ListSettings) -> Self {
        Self {
            threshold: settings.threshold,
            buffer_size: settings.buffer_size,
            item_height: settings.item_height.max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Empty,
    FullRender,
    Virtualized,
}

/// Half-open range of materialized rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VirtualWindow {
    pub start_index: usize,
    pub end_index: usize,
    pub item_height: usize,
    pub buffer_size: usize,
}

impl VirtualWindow {
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `[floor(top/h) - buffer, ceil((top+viewport)/h) + buffer)` clamped to
    /// `[0, count)`.
    pub fn compute(
        scroll_top: usize,
        viewport_height: usize,
        count: usize,
        item_height: usize,
        buffer_size: usize,
    ) -> Self {
        let h = item_height.max(1);
        let first = scroll_top / h;
        let last = (scroll_top + viewport_height).div_ceil(h);
        let end_index = (last + buffer_size).min(count);
        let start_index = first.saturating_sub(buffer_size).min(end_index);
        Self {
            start_index,
            end_index,
            item_height: h,
            buffer_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListViewport<R> {
    pub mode: RenderMode,
    pub window: VirtualWindow,
    /// Rows for `window.start_index..window.end_index`.
    pub rows: Vec<R>,
    pub top_spacer: usize,
    pub bottom_spacer: usize,
    pub scroll_top: usize,
}

pub trait Filterable {
    fn matches_filter(&self, filter: &str) -> bool;
}

impl Filterable for String {
    fn matches_filter(&self, filter: &str) -> bool {
        self.to_lowercase().contains(&filter.to_lowercase())
    }
}

impl Filterable for SearchMatch {
    fn matches_filter(&self, filter: &str) -> bool {
        let filter = filter.to_lowercase();
        self.text.to_lowercase().contains(&filter)
            || self.file.to_string_lossy().to_lowercase().contains(&filter)
    }
}

type ItemFactory<T, R> = Box<dyn FnMut(&T, usize, bool) -> R + Send>;

pub struct Virtualizer<T, R> {
    items: Vec<T>,
    visible: Vec<usize>,
    filter_text: String,
    options: VirtualizerOptions,
    mode: RenderMode,
    scroll_top: usize,
    viewport_height: usize,
    selected: Option<usize>,
    factory: Option<ItemFactory<T, R>>,
    frame: FrameThrottle,
}

impl<T: Filterable, R> Virtualizer<T, R> {
    pub fn new(options: VirtualizerOptions, viewport_height: usize) -> Self {
        Self {
            items: Vec::new(),
            visible: Vec::new(),
            filter_text: String::new(),
            options,
            mode: RenderMode::Empty,
            scroll_top: 0,
            viewport_height,
            selected: None,
            factory: None,
            frame: FrameThrottle::new(),
        }
    }

    /// Replaces the list. `item_factory` receives the item, its position in
    /// the filtered list, and whether it is selected.
    pub fn render_virtualized<F>(
        &mut self,
        items: Vec<T>,
        selected_index: Option<usize>,
        filter_text: &str,
        item_factory: F,
    ) -> ListViewport<R>
    where
        F: FnMut(&T, usize, bool) -> R + Send + 'static,
    {
        self.items = items;
        self.factory = Some(Box::new(item_factory));
        self.scroll_top = 0;
        self.selected = None;
        self.apply_filter(filter_text);
        match selected_index {
            Some(index) => {
                self.scroll_to_selected(index);
            }
            None => self.selected = None,
        }
        self.materialize()
    }

    /// Re-filters the current items. The selection follows the selected
    /// item when it still passes the filter and falls back to the first row
    /// otherwise.
    pub fn filter(&mut self, filter_text: &str) -> ListViewport<R> {
        self.apply_filter(filter_text);
        self.scroll_top = self.scroll_top.min(self.max_scroll_top());
        if let Some(position) = self.selected {
            self.scroll_to_selected(position);
        }
        self.materialize()
    }

    pub fn set_options(&mut self, options: VirtualizerOptions) -> ListViewport<R> {
        self.options = VirtualizerOptions {
            item_height: options.item_height.max(1),
            ..options
        };
        self.mode = self.evaluate_mode();
        self.scroll_top = self.scroll_top.min(self.max_scroll_top());
        self.materialize()
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        if height != self.viewport_height {
            self.viewport_height = height;
            self.scroll_top = self.scroll_top.min(self.max_scroll_top());
            self.frame.schedule();
        }
    }

    /// Records the new position; the window is recomputed on the next
    /// [`on_animation_frame`](Self::on_animation_frame).
    pub fn on_scroll(&mut self, scroll_top: usize) {
        self.scroll_top = scroll_top.min(self.max_scroll_top());
        self.frame.schedule();
    }

    pub fn on_animation_frame(&mut self) -> Option<ListViewport<R>> {
        if self.frame.take() {
            Some(self.materialize())
        } else {
            None
        }
    }

    /// Selects `index` and scrolls only if its row is not already inside the
    /// viewport less one row of margin on each side. Returns whether it
    /// scrolled.
    pub fn scroll_to_selected(&mut self, index: usize) -> bool {
        if self.visible.is_empty() {
            self.selected = None;
            return false;
        }
        let index = index.min(self.visible.len() - 1);
        self.selected = Some(index);

        let h = self.options.item_height;
        let margin = if self.viewport_height >= 3 * h { h } else { 0 };
        let row_top = index * h;
        let row_bottom = row_top + h;

        let target = if row_top < self.scroll_top + margin {
            row_top.saturating_sub(margin)
        } else if row_bottom + margin > self.scroll_top + self.viewport_height {
            (row_bottom + margin).saturating_sub(self.viewport_height)
        } else {
            return false;
        };

        let target = target.min(self.max_scroll_top());
        if target == self.scroll_top {
            return false;
        }
        self.scroll_top = target;
        self.frame.schedule();
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.visible.clear();
        self.filter_text.clear();
        self.factory = None;
        self.selected = None;
        self.scroll_top = 0;
        self.mode = RenderMode::Empty;
        self.frame.take();
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn window(&self) -> VirtualWindow {
        match self.mode {
            RenderMode::Empty => VirtualWindow {
                item_height: self.options.item_height,
                buffer_size: self.options.buffer_size,
                ..VirtualWindow::default()
            },
            RenderMode::FullRender => VirtualWindow {
                start_index: 0,
                end_index: self.visible.len(),
                item_height: self.options.item_height,
                buffer_size: self.options.buffer_size,
            },
            RenderMode::Virtualized => VirtualWindow::compute(
                self.scroll_top,
                self.viewport_height,
                self.visible.len(),
                self.options.item_height,
                self.options.buffer_size,
            ),
        }
    }

    pub fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&T> {
        self.selected
            .and_then(|index| self.visible.get(index))
            .map(|&item| &self.items[item])
    }

    /// Number of items that pass the current filter.
    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    pub fn total_height(&self) -> usize {
        self.visible.len() * self.options.item_height
    }

    fn max_scroll_top(&self) -> usize {
        self.total_height().saturating_sub(self.viewport_height)
    }

    fn apply_filter(&mut self, filter_text: &str) {
        let selected_item = self
            .selected
            .and_then(|position| self.visible.get(position).copied());
        self.filter_text = filter_text.to_string();
        self.visible = if filter_text.is_empty() {
            (0..self.items.len()).collect()
        } else {
            self.items
                .iter()
                .enumerate()
                .filter(|(_, item)| item.matches_filter(filter_text))
                .map(|(index, _)| index)
                .collect()
        };
        if let Some(item) = selected_item {
            self.selected = if self.visible.is_empty() {
                None
            } else {
                Some(self.visible.iter().position(|&i| i == item).unwrap_or(0))
            };
        }
        self.mode = self.evaluate_mode();
    }

    fn evaluate_mode(&self) -> RenderMode {
        match self.visible.len() {
            0 => RenderMode::Empty,
            n if n <= self.options.threshold => RenderMode::FullRender,
            _ => RenderMode::Virtualized,
        }
    }

    fn materialize(&mut self) -> ListViewport<R> {
        let window = self.window();
        let count = self.visible.len();
        let mut rows = Vec::with_capacity(window.len());
        if let Some(factory) = self.factory.as_mut() {
            for position in window.start_index..window.end_index {
                let item = &self.items[self.visible[position]];
                rows.push(factory(item, position, Some(position) == self.selected));
            }
        }

        ListViewport {
            mode: self.mode,
            window,
            rows,
            top_spacer: window.start_index * window.item_height,
            bottom_spacer: (count - window.end_index) * window.item_height,
            scroll_top: self.scroll_top,
        }
    }
}
