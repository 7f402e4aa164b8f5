use crate::config::Config;
use crate::document::Document;
use crate::layout::{LayoutHost, TextLayout};
use crate::selection::{SelectionRange, SelectionTracker};
use crate::synonyms::{
    DatamuseClient, FETCH_ERROR_MESSAGE, FetchOutcome, QueryState, SynonymFetcher, SynonymPanel,
};
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Clear, List, ListItem, ListState, Paragraph};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

pub fn run_app(text: String, config: Config) -> Result<()> {
    let source = Arc::new(DatamuseClient::new(
        &config.api_base_url,
        config.max_suggestions,
        config.timeout_ms,
    ));
    let (fetcher, outcomes) = SynonymFetcher::new(source);
    let mut app = App::new(&text, &config, fetcher);

    let mut terminal = setup_terminal()?;
    let _guard = TerminalGuard;

    let tick_rate = Duration::from_millis(50);

    loop {
        let size = terminal.size()?;
        let layout = app.layout(size);
        app.refresh_text_layout(layout.text_inner.width);
        app.clamp_scroll(layout.text_inner.height);

        terminal.draw(|f| ui(f, &mut app, &layout))?;

        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Key(key) => {
                    if app.handle_key(key, &layout) {
                        break;
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse, &layout),
                _ => {}
            }
        }

        while let Ok(outcome) = outcomes.try_recv() {
            app.on_fetch_settled(outcome);
        }
    }

    Ok(())
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, DisableMouseCapture, LeaveAlternateScreen);
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    ColorPicker,
}

/// In-progress mouse selection: anchor and focus as (node, char offset)
/// pairs, plus whether the pointer moved between press and release.
#[derive(Debug, Clone, Copy)]
struct Drag {
    anchor: (usize, usize),
    focus: (usize, usize),
    moved: bool,
}

struct LayoutInfo {
    toolbar: Rect,
    text: Rect,
    text_inner: Rect,
    panel: Option<Rect>,
    status: Rect,
}

struct App {
    doc: Document,
    tracker: SelectionTracker,
    panel: SynonymPanel,
    fetcher: SynonymFetcher,
    swatches: Vec<(String, Color)>,
    text_layout: TextLayout,
    base_style: Style,
    scroll: usize,
    mode: Mode,
    picker_selected: usize,
    drag: Option<Drag>,
    panel_hits: Vec<(Rect, usize)>,
    status: Option<String>,
}

impl App {
    fn new(text: &str, config: &Config, fetcher: SynonymFetcher) -> Self {
        let doc = Document::new(text);
        let base_style = Style::default();
        let text_layout = TextLayout::build(&doc, u16::MAX, None, base_style);
        Self {
            doc,
            tracker: SelectionTracker::new(),
            panel: SynonymPanel::new(config.max_suggestions),
            fetcher,
            swatches: config.swatches(),
            text_layout,
            base_style,
            scroll: 0,
            mode: Mode::Normal,
            picker_selected: 0,
            drag: None,
            panel_hits: Vec::new(),
            status: None,
        }
    }

    fn layout(&self, size: Rect) -> LayoutInfo {
        let show_panel = self.tracker.selected().is_some();
        let mut constraints = vec![Constraint::Length(1), Constraint::Min(3)];
        if show_panel {
            constraints.push(Constraint::Length(4));
        }
        constraints.push(Constraint::Length(1));
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(size);

        let toolbar = chunks[0];
        let text = chunks[1];
        let panel = if show_panel { Some(chunks[2]) } else { None };
        let status = chunks[chunks.len() - 1];
        let text_inner = Rect {
            x: text.x.saturating_add(1),
            y: text.y.saturating_add(1),
            width: text.width.saturating_sub(2).max(1),
            height: text.height.saturating_sub(2).max(1),
        };

        LayoutInfo {
            toolbar,
            text,
            text_inner,
            panel,
            status,
        }
    }

    fn refresh_text_layout(&mut self, width: u16) {
        self.text_layout =
            TextLayout::build(&self.doc, width, self.tracker.selected(), self.base_style);
    }

    fn clamp_scroll(&mut self, height: u16) {
        let max_scroll = self
            .text_layout
            .line_count()
            .saturating_sub(height as usize);
        if self.scroll > max_scroll {
            self.scroll = max_scroll;
        }
    }

    /// Run a selection-change notification through the tracker and, if
    /// the selection moved, refresh the synonym panel.
    fn apply_range(&mut self, range: Option<SelectionRange>) {
        let picker_open = matches!(self.mode, Mode::ColorPicker);
        let host = LayoutHost::new(&self.doc, range, picker_open);
        if self.tracker.on_selection_change(&host) {
            self.sync_panel();
        }
    }

    fn sync_panel(&mut self) {
        let word = self
            .tracker
            .selected()
            .and_then(|i| self.doc.token(i))
            .map(|t| t.text.clone());
        if let Some(request) = self.panel.on_selection_change(word.as_deref()) {
            self.fetcher.spawn(request);
        }
    }

    fn on_fetch_settled(&mut self, outcome: FetchOutcome) {
        self.panel.on_fetch_settled(outcome);
    }

    fn handle_key(&mut self, key: KeyEvent, layout: &LayoutInfo) -> bool {
        match self.mode {
            Mode::ColorPicker => {
                self.handle_picker_key(key);
                false
            }
            Mode::Normal => self.handle_normal_key(key, layout),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent, layout: &LayoutInfo) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Esc => self.apply_range(None),
            KeyCode::Char('b') => self.toggle_bold(),
            KeyCode::Char('i') => self.toggle_italic(),
            KeyCode::Char('u') => self.toggle_underline(),
            KeyCode::Char('c') => self.open_picker(),
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                self.choose_synonym(index);
            }
            KeyCode::Left | KeyCode::Char('h') => self.select_adjacent_word(-1),
            KeyCode::Right | KeyCode::Char('l') => self.select_adjacent_word(1),
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll = self.scroll.saturating_add(1),
            KeyCode::PageUp => {
                self.scroll = self
                    .scroll
                    .saturating_sub(layout.text_inner.height as usize);
            }
            KeyCode::PageDown => {
                self.scroll = self
                    .scroll
                    .saturating_add(layout.text_inner.height as usize);
            }
            _ => {}
        }
        false
    }

    fn handle_picker_key(&mut self, key: KeyEvent) {
        let total = self.swatches.len();
        match key.code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Up => self.picker_selected = self.picker_selected.saturating_sub(1),
            KeyCode::Down => {
                if self.picker_selected + 1 < total {
                    self.picker_selected += 1;
                }
            }
            KeyCode::Enter => self.apply_swatch(self.picker_selected),
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, layout: &LayoutInfo) {
        if matches!(self.mode, Mode::ColorPicker) {
            self.handle_picker_mouse(mouse, layout);
            return;
        }
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if rect_contains(layout.toolbar, mouse.column, mouse.row) {
                    self.handle_toolbar_click(mouse.column, layout.toolbar);
                } else if let Some(index) = self.panel_hit(mouse.column, mouse.row, layout) {
                    // Picking a synonym never touches the selection.
                    self.choose_synonym(index);
                } else if rect_contains(layout.text_inner, mouse.column, mouse.row) {
                    match self.hit_at(mouse.column, mouse.row, layout) {
                        Some(hit) => {
                            self.drag = Some(Drag {
                                anchor: hit,
                                focus: hit,
                                moved: false,
                            });
                        }
                        None => {
                            self.drag = None;
                            self.apply_range(None);
                        }
                    }
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(hit) = self.hit_at(mouse.column, mouse.row, layout) {
                    if let Some(drag) = self.drag.as_mut() {
                        if hit != drag.focus {
                            drag.focus = hit;
                            drag.moved = true;
                        }
                    }
                    if let Some(drag) = self.drag {
                        if drag.moved {
                            self.apply_range(Some(drag_range(drag)));
                        }
                    }
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(drag) = self.drag.take() {
                    let range = if drag.moved {
                        drag_range(drag)
                    } else {
                        // A plain click selects the whole token under it.
                        let len = self
                            .doc
                            .token(drag.anchor.0)
                            .map_or(0, |t| t.text.chars().count());
                        SelectionRange::whole_node(drag.anchor.0, len)
                    };
                    self.apply_range(Some(range));
                }
            }
            MouseEventKind::ScrollUp => self.scroll = self.scroll.saturating_sub(1),
            MouseEventKind::ScrollDown => self.scroll = self.scroll.saturating_add(1),
            _ => {}
        }
    }

    fn handle_picker_mouse(&mut self, mouse: MouseEvent, layout: &LayoutInfo) {
        if !matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left)) {
            return;
        }
        let popup = self.picker_rect(layout);
        if !rect_contains(popup, mouse.column, mouse.row) {
            // Outside click closes without changing color and without
            // disturbing the word selection.
            self.mode = Mode::Normal;
            return;
        }
        let row = mouse.row.saturating_sub(popup.y);
        if row == 0 {
            return;
        }
        let index = (row - 1) as usize;
        if index < self.swatches.len() {
            self.apply_swatch(index);
        }
    }

    fn handle_toolbar_click(&mut self, column: u16, toolbar: Rect) {
        let rel = column.saturating_sub(toolbar.x) as usize;
        // Buttons render as " [B] [I] [U] [C]": button i covers
        // columns 1+4i..4+4i.
        for i in 0..4 {
            if rel >= 1 + 4 * i && rel < 4 + 4 * i {
                match i {
                    0 => self.toggle_bold(),
                    1 => self.toggle_italic(),
                    2 => self.toggle_underline(),
                    _ => self.open_picker(),
                }
                return;
            }
        }
    }

    fn hit_at(&self, column: u16, row: u16, layout: &LayoutInfo) -> Option<(usize, usize)> {
        let inner = layout.text_inner;
        if !rect_contains(inner, column, row) {
            return None;
        }
        let line = (row - inner.y) as usize + self.scroll;
        self.text_layout.hit_test(column - inner.x, line)
    }

    fn panel_hit(&self, column: u16, row: u16, layout: &LayoutInfo) -> Option<usize> {
        layout.panel?;
        self.panel_hits
            .iter()
            .find(|(rect, _)| rect_contains(*rect, column, row))
            .map(|(_, index)| *index)
    }

    fn toggle_bold(&mut self) {
        if let Some(index) = self.tracker.selected() {
            self.doc.toggle_bold(index);
        }
    }

    fn toggle_italic(&mut self) {
        if let Some(index) = self.tracker.selected() {
            self.doc.toggle_italic(index);
        }
    }

    fn toggle_underline(&mut self) {
        if let Some(index) = self.tracker.selected() {
            self.doc.toggle_underline(index);
        }
    }

    fn open_picker(&mut self) {
        if self.tracker.selected().is_some() {
            self.mode = Mode::ColorPicker;
            self.picker_selected = 0;
        }
    }

    fn apply_swatch(&mut self, index: usize) {
        if let (Some(token), Some((_, color))) =
            (self.tracker.selected(), self.swatches.get(index))
        {
            self.doc.set_color(token, *color);
        }
        self.mode = Mode::Normal;
    }

    fn choose_synonym(&mut self, index: usize) {
        let Some(token) = self.tracker.selected() else {
            return;
        };
        let Some(candidate) = self.panel.candidates().get(index).cloned() else {
            return;
        };
        self.doc.replace_text(token, &candidate);
        self.status = Some(format!("Replaced with \"{candidate}\""));
        // The selected word changed, so the panel fetches for it anew.
        self.sync_panel();
    }

    /// Move the selection to the next or previous word token, skipping
    /// separators.
    fn select_adjacent_word(&mut self, delta: isize) {
        let words: Vec<usize> = (0..self.doc.len()).filter(|&i| self.doc.is_word(i)).collect();
        if words.is_empty() {
            return;
        }
        let target = match self.tracker.selected() {
            None => {
                if delta >= 0 {
                    words[0]
                } else {
                    words[words.len() - 1]
                }
            }
            Some(current) => match words.binary_search(&current) {
                Ok(pos) => {
                    let next = if delta >= 0 {
                        (pos + 1).min(words.len() - 1)
                    } else {
                        pos.saturating_sub(1)
                    };
                    words[next]
                }
                // A separator is selected: jump to the nearest word.
                Err(insert) => {
                    if delta >= 0 {
                        words.get(insert).copied().unwrap_or(words[words.len() - 1])
                    } else {
                        words[insert.saturating_sub(1)]
                    }
                }
            },
        };
        let len = self.doc.token(target).map_or(0, |t| t.text.chars().count());
        self.apply_range(Some(SelectionRange::whole_node(target, len)));
    }

    fn picker_rect(&self, layout: &LayoutInfo) -> Rect {
        let area = layout.text;
        let height = (self.swatches.len() as u16 + 2).min(area.height);
        let width = 14u16.min(area.width);
        Rect {
            x: area.x + (area.width.saturating_sub(width)) / 2,
            y: area.y + (area.height.saturating_sub(height)) / 2,
            width,
            height,
        }
    }

    fn toolbar_line(&self) -> Line<'static> {
        let token = self.tracker.selected().and_then(|i| self.doc.token(i));
        let inert = Style::default().fg(Color::DarkGray);
        let accent = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);

        let flag_style = |active: bool| {
            if token.is_none() {
                inert
            } else if active {
                accent
            } else {
                Style::default()
            }
        };

        let color_style = match token {
            None => inert,
            Some(t) => match t.color {
                Some(color) => Style::default().fg(color).add_modifier(Modifier::BOLD),
                None => Style::default(),
            },
        };

        Line::from(vec![
            Span::raw(" "),
            Span::styled("[B]", flag_style(token.is_some_and(|t| t.bold))),
            Span::raw(" "),
            Span::styled("[I]", flag_style(token.is_some_and(|t| t.italic))),
            Span::raw(" "),
            Span::styled("[U]", flag_style(token.is_some_and(|t| t.underline))),
            Span::raw(" "),
            Span::styled("[C]", color_style),
        ])
    }

    fn status_line(&self) -> Line<'static> {
        let accent = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let muted = Style::default().fg(Color::DarkGray);

        let mut parts = vec![Span::styled("reword", accent)];
        parts.push(Span::styled(" | ", muted));
        match self.tracker.selected().and_then(|i| self.doc.token(i)) {
            Some(token) => parts.push(Span::styled(
                format!("\"{}\"", token.text),
                Style::default().fg(Color::Cyan),
            )),
            None => parts.push(Span::styled("no word selected", muted)),
        }
        parts.push(Span::styled(" | ", muted));
        parts.push(Span::styled(
            "click word  b/i/u style  c color  1-5 replace  q quit",
            muted,
        ));
        if let Some(msg) = &self.status {
            parts.push(Span::styled(" | ", muted));
            parts.push(Span::styled(msg.clone(), Style::default().fg(Color::Cyan)));
        }
        Line::from(parts)
    }
}

fn drag_range(drag: Drag) -> SelectionRange {
    let (anchor_node, anchor_char) = drag.anchor;
    let (focus_node, focus_char) = drag.focus;
    if anchor_node == focus_node {
        // Char positions become caret offsets: the range covers every
        // char between the two endpoints inclusive.
        let lo = anchor_char.min(focus_char);
        let hi = anchor_char.max(focus_char);
        SelectionRange {
            anchor: anchor_node,
            focus: focus_node,
            anchor_offset: lo,
            focus_offset: hi + 1,
        }
    } else {
        SelectionRange {
            anchor: anchor_node,
            focus: focus_node,
            anchor_offset: anchor_char,
            focus_offset: focus_char,
        }
    }
}

fn rect_contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x
        && column < rect.x.saturating_add(rect.width)
        && row >= rect.y
        && row < rect.y.saturating_add(rect.height)
}

fn ui(f: &mut ratatui::Frame, app: &mut App, layout: &LayoutInfo) {
    f.render_widget(Paragraph::new(app.toolbar_line()), layout.toolbar);

    let text_widget = Paragraph::new(Text::from(app.text_layout.lines().to_vec()))
        .block(Block::bordered().border_type(BorderType::Rounded))
        .scroll((app.scroll as u16, 0));
    f.render_widget(text_widget, layout.text);

    match layout.panel {
        Some(area) => render_panel(f, app, area),
        None => app.panel_hits.clear(),
    }

    f.render_widget(Paragraph::new(app.status_line()), layout.status);

    if matches!(app.mode, Mode::ColorPicker) {
        let popup = app.picker_rect(layout);
        f.render_widget(Clear, popup);
        let items: Vec<ListItem> = app
            .swatches
            .iter()
            .map(|(hex, color)| {
                ListItem::new(Line::from(vec![
                    Span::styled("■ ", Style::default().fg(*color)),
                    Span::raw(hex.clone()),
                ]))
            })
            .collect();
        let mut state = ListState::default();
        state.select(Some(app.picker_selected));
        let list = List::new(items)
            .block(Block::bordered().border_type(BorderType::Rounded))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        f.render_stateful_widget(list, popup, &mut state);
    }
}

fn render_panel(f: &mut ratatui::Frame, app: &mut App, area: Rect) {
    let block = Block::bordered()
        .title(" Synonyms ")
        .border_type(BorderType::Rounded);
    let inner = block.inner(area);
    f.render_widget(block, area);

    app.panel_hits.clear();
    match app.panel.state() {
        QueryState::Failed => {
            f.render_widget(Paragraph::new(FETCH_ERROR_MESSAGE), inner);
        }
        QueryState::Loaded(list) if !list.is_empty() => {
            let mut spans = Vec::new();
            let mut x = inner.x;
            for (index, word) in list.iter().enumerate() {
                let label = format!("[{}] {}", index + 1, word);
                let width = label.width() as u16;
                if index > 0 {
                    spans.push(Span::raw("  "));
                    x = x.saturating_add(2);
                }
                app.panel_hits.push((
                    Rect {
                        x,
                        y: inner.y,
                        width,
                        height: 1,
                    },
                    index,
                ));
                spans.push(Span::styled(label, Style::default().fg(Color::Cyan)));
                x = x.saturating_add(width);
            }
            f.render_widget(Paragraph::new(Line::from(spans)), inner);
        }
        // Idle, Loading, and an empty result all render nothing.
        _ => {}
    }
}
