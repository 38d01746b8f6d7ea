//! Terminal host for `rfscope interactive`: a virtualized result list on the
//! left and a chunked preview of the selected match on the right.
use crate::app::RfscopeApp;
use crate::error::Result;
use crate::grammar::{GrammarAsset, HighlightedLine, Rgb};
use crate::search::{SearchMatch, SearchResultSet};
use crate::view::{
    ChunkedContentRenderer, ListViewport, MemoryDocument, ScrollSurface, Virtualizer,
    VirtualizerOptions,
};
use log::{debug, info};
use parking_lot::Mutex;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, List, ListItem, Paragraph, Wrap};
use ratatui::{DefaultTerminal, Frame};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    Quit,
}

pub struct InteractiveSession<'a> {
    app: &'a RfscopeApp,
    results: SearchResultSet,
    list: Virtualizer<SearchMatch, ListItem<'static>>,
    viewport: ListViewport<ListItem<'static>>,
    list_height: usize,
    surface: Arc<Mutex<MemoryDocument>>,
    renderer: ChunkedContentRenderer<MemoryDocument>,
    theme: Option<Arc<GrammarAsset>>,
    previewed: Option<(PathBuf, usize)>,
}

impl<'a> InteractiveSession<'a> {
    pub async fn new(
        app: &'a RfscopeApp,
        results: SearchResultSet,
        list_height: usize,
        preview_height: usize,
    ) -> Self {
        let surface = Arc::new(Mutex::new(MemoryDocument::new(
            preview_height,
            app.config().preview.line_height,
        )));
        let renderer = app.renderer(Arc::clone(&surface));
        let theme = app
            .loader()
            .load_theme_if_needed(&renderer.options().theme)
            .await
            .ok();

        let mut list = Virtualizer::new(VirtualizerOptions::from(&app.config().list), list_height);
        let selected = (!results.is_empty()).then_some(0);
        let viewport = list.render_virtualized(results.matches.clone(), selected, "", result_row);

        Self {
            app,
            results,
            list,
            viewport,
            list_height,
            surface,
            renderer,
            theme,
            previewed: None,
        }
    }

    pub fn selected(&self) -> Option<&SearchMatch> {
        self.list.selected_item()
    }

    pub fn surface(&self) -> &Arc<Mutex<MemoryDocument>> {
        &self.surface
    }

    pub fn handle_key(&mut self, code: KeyCode) -> KeyAction {
        let page = self.list_height.max(1);
        let current = self.list.selected().unwrap_or(0);
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return KeyAction::Quit,
            KeyCode::Down => self.select(current + 1),
            KeyCode::Up => self.select(current.saturating_sub(1)),
            KeyCode::PageDown => self.select(current + page),
            KeyCode::PageUp => self.select(current.saturating_sub(page)),
            KeyCode::Char('j') => self.scroll_preview(1),
            KeyCode::Char('k') => self.scroll_preview(-1),
            _ => {}
        }
        KeyAction::Continue
    }

    fn select(&mut self, index: usize) {
        if self.list.scroll_to_selected(index) {
            debug!("Result list scrolled to {}", self.list.scroll_top());
        }
    }

    fn scroll_preview(&mut self, rows: isize) {
        {
            let mut surface = self.surface.lock();
            let step = surface.line_height();
            let top = surface.scroll_top();
            let target = if rows < 0 {
                top.saturating_sub(step)
            } else {
                top + step
            };
            surface.set_scroll_top(target);
        }
        self.renderer.on_scroll();
    }

    /// One animation frame: pending list and preview work, then a new
    /// preview if the selection moved.
    pub async fn tick(&mut self) {
        if let Some(viewport) = self.list.on_animation_frame() {
            self.viewport = viewport;
        }
        self.renderer.on_animation_frame().await;
        self.surface.lock().drain_events();

        let Some(selected) = self.list.selected_item() else {
            return;
        };
        let target = (selected.file.clone(), selected.line);
        if self.previewed.as_ref() == Some(&target) {
            return;
        }
        let focus = target.1.saturating_sub(1);
        self.app
            .preview(&self.renderer, &target.0, Some(focus))
            .await;
        self.previewed = Some(target);
    }

    pub fn resize(&mut self, list_height: usize, preview_height: usize) {
        if list_height != self.list_height {
            self.list_height = list_height;
            self.list.set_viewport_height(list_height);
        }
        self.surface.lock().set_client_height(preview_height);
    }

    fn draw(&self, frame: &mut Frame) {
        let [body, status] =
            Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(frame.area());
        let [results, preview] =
            Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(body);

        self.draw_results(frame, results);
        self.draw_preview(frame, preview);
        frame.render_widget(Paragraph::new(self.status_line()), status);
    }

    fn draw_results(&self, frame: &mut Frame, area: Rect) {
        let window = self.viewport.window;
        let skip = (self.list.scroll_top() / window.item_height.max(1)).saturating_sub(window.start_index);
        let selected = self.list.selected();
        let rows: Vec<ListItem> = self
            .viewport
            .rows
            .iter()
            .enumerate()
            .skip(skip)
            .map(|(offset, row)| {
                if Some(window.start_index + offset) == selected {
                    row.clone().style(Style::default().add_modifier(Modifier::REVERSED))
                } else {
                    row.clone()
                }
            })
            .collect();

        let title = format!(" {} ", self.results.query);
        frame.render_widget(List::new(rows).block(Block::bordered().title(title)), area);
    }

    fn draw_preview(&self, frame: &mut Frame, area: Rect) {
        let surface = self.surface.lock();
        let block = Block::bordered().title(
            self.previewed
                .as_ref()
                .map(|(path, _)| format!(" {} ", path.display()))
                .unwrap_or_default(),
        );

        if let Some(failure) = surface.failure() {
            let mut lines = vec![Line::styled(failure.title.clone(), Style::default().fg(Color::Red))];
            if let Some(details) = &failure.details {
                lines.push(Line::raw(details.clone()));
            }
            frame.render_widget(
                Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
                area,
            );
            return;
        }

        let lines: Vec<Line> = surface
            .visible_lines()
            .into_iter()
            .map(|line| self.preview_line(line))
            .collect();
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn preview_line(&self, line: &HighlightedLine) -> Line<'static> {
        let theme = self.theme.as_ref().and_then(|asset| asset.as_theme());
        let mut spans = vec![Span::styled(
            format!("{:>5} ", line.number),
            Style::default().fg(Color::DarkGray),
        )];
        for segment in &line.segments {
            let mut style = Style::default();
            if let Some(theme) = theme {
                style = style.fg(rgb(theme.color(segment.kind)));
                if line.emphasized {
                    style = style.bg(rgb(theme.emphasis));
                }
            } else if line.emphasized {
                style = style.add_modifier(Modifier::REVERSED);
            }
            spans.push(Span::styled(segment.text.clone(), style));
        }
        Line::from(spans)
    }

    fn status_line(&self) -> String {
        let summary = match &self.results.message {
            Some(message) => message.clone(),
            None => format!("{} matches", self.results.len()),
        };
        let strategy = self.results.strategy.as_deref().unwrap_or("-");
        format!(" {summary} [{strategy}]  ↑↓ select  j/k scroll  q quit")
    }

    async fn event_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let size = terminal.size()?;
            let body = size.height.saturating_sub(1) as usize;
            self.resize(body.saturating_sub(2), body.saturating_sub(2));
            self.tick().await;
            terminal.draw(|frame| self.draw(frame))?;

            if !event::poll(TICK)? {
                continue;
            }
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && self.handle_key(key.code) == KeyAction::Quit {
                    return Ok(());
                }
            }
        }
    }
}

fn result_row(found: &SearchMatch, index: usize, _selected: bool) -> ListItem<'static> {
    Line::from(vec![
        Span::styled(format!("{:>4} ", index + 1), Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{}:{} ", found.file.display(), found.line),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(found.preview.clone()),
    ])
    .into()
}

fn rgb(Rgb(r, g, b): Rgb) -> Color {
    Color::Rgb(r, g, b)
}

/// Runs the interactive session until the user quits. The terminal is
/// restored on every exit path.
pub async fn run(app: &RfscopeApp, results: SearchResultSet) -> Result<()> {
    let mut terminal = ratatui::try_init()?;
    let size = terminal.size()?;
    let height = (size.height as usize).saturating_sub(3);
    info!("Interactive session with {} results", results.len());

    let mut session = InteractiveSession::new(app, results, height, height).await;
    let outcome = session.event_loop(&mut terminal).await;
    ratatui::restore();
    outcome
}
