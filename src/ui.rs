use anyhow::Result;
use chrono::{Local, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dashboard_analytics::{
    format_timestamp, lock, BadgeColor, Dashboard, FilterCoordinator, FilterCriteria,
    MetricDetail, MockDataSource, NoticeLevel, NotificationSink, RowAction, TableRow,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

/// Status bar clock refresh
const CLOCK_REFRESH: Duration = Duration::from_secs(60);
const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    DateFrom,
    DateTo,
    House,
    Table,
    Search,
}

impl Focus {
    pub fn next(&self) -> Self {
        match self {
            Focus::DateFrom => Focus::DateTo,
            Focus::DateTo => Focus::House,
            Focus::House => Focus::Table,
            Focus::Table | Focus::Search => Focus::DateFrom,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Focus::DateFrom => Focus::Table,
            Focus::DateTo => Focus::DateFrom,
            Focus::House => Focus::DateTo,
            Focus::Table | Focus::Search => Focus::House,
        }
    }
}

/// Text inputs of the filter bar, kept as typed
#[derive(Debug, Clone, Default)]
pub struct FilterForm {
    pub date_from: String,
    pub date_to: String,
    pub house: String,
}

impl FilterForm {
    pub fn month_to_date(today: NaiveDate) -> Self {
        let defaults = FilterCriteria::month_to_date(today);
        FilterForm {
            date_from: defaults.date_from.map(|d| d.to_string()).unwrap_or_default(),
            date_to: defaults.date_to.map(|d| d.to_string()).unwrap_or_default(),
            house: String::new(),
        }
    }

    /// Parse the inputs; blank fields are unset
    pub fn criteria(&self) -> Result<FilterCriteria, String> {
        Ok(FilterCriteria {
            date_from: parse_optional_date(&self.date_from)?,
            date_to: parse_optional_date(&self.date_to)?,
            house: Some(self.house.trim().to_string()).filter(|h| !h.is_empty()),
        })
    }

    fn field_mut(&mut self, focus: Focus) -> Option<&mut String> {
        match focus {
            Focus::DateFrom => Some(&mut self.date_from),
            Focus::DateTo => Some(&mut self.date_to),
            Focus::House => Some(&mut self.house),
            Focus::Table | Focus::Search => None,
        }
    }
}

fn parse_optional_date(value: &str) -> Result<Option<NaiveDate>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| format!("Invalid date '{}', use YYYY-MM-DD.", value))
}

pub struct App {
    pub dashboard: Dashboard,
    pub coordinator: Arc<FilterCoordinator<MockDataSource>>,
    runtime: Handle,
    pub form: FilterForm,
    pub focus: Focus,
    pub state: TableState,
    pub show_detail: bool,
    pub selected_metric: usize,
    pub metric_detail: Option<MetricDetail>,
    pub clock: String,
    clock_refreshed: Instant,
}

impl App {
    pub fn new(
        dashboard: Dashboard,
        coordinator: FilterCoordinator<MockDataSource>,
        runtime: Handle,
        today: NaiveDate,
    ) -> Self {
        let mut state = TableState::default();
        state.select(Some(0));

        Self {
            dashboard,
            coordinator: Arc::new(coordinator),
            runtime,
            form: FilterForm::month_to_date(today),
            focus: Focus::Table,
            state,
            show_detail: false,
            selected_metric: 0,
            metric_detail: None,
            clock: current_clock(),
            clock_refreshed: Instant::now(),
        }
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    /// Kick off a submission unless the apply control is busy
    pub fn apply_filters(&mut self) {
        if !lock(&self.dashboard.control).is_enabled() {
            return;
        }

        let criteria = match self.form.criteria() {
            Ok(criteria) => criteria,
            Err(message) => {
                lock(&self.dashboard.notices).notify(&message, NoticeLevel::Warning);
                return;
            }
        };

        // Claim the control before spawning so a second press is ignored.
        // Invalid ranges are rejected by submit without going busy.
        if criteria.validate().is_ok() && !lock(&self.dashboard.control).try_begin_busy() {
            return;
        }

        let coordinator = self.coordinator.clone();
        self.runtime.spawn(async move {
            // Outcome is already reflected in the views and notices
            let _ = coordinator.submit(criteria).await;
        });
        self.state.select(Some(0));
    }

    /// Index of the selected row within the searched rows
    fn selected_index(&self) -> Option<usize> {
        let table = lock(&self.dashboard.table);
        self.state
            .selected()
            .map(|i| table.page() * table.page_length() + i)
    }

    pub fn selected_row(&self) -> Option<TableRow> {
        let index = self.selected_index()?;
        let table = lock(&self.dashboard.table);
        table.visible().get(index).map(|row| (*row).clone())
    }

    pub fn trigger_row_action(&mut self, action: RowAction) {
        if let Some(index) = self.selected_index() {
            lock(&self.dashboard.table).trigger(action, index);
        }
    }

    pub fn click_metric(&mut self) {
        self.metric_detail = lock(&self.dashboard.metrics).click(self.selected_metric);
    }

    pub fn next_metric(&mut self) {
        let count = lock(&self.dashboard.metrics).cards().len().max(1);
        self.selected_metric = (self.selected_metric + 1) % count;
    }

    pub fn previous_metric(&mut self) {
        let count = lock(&self.dashboard.metrics).cards().len().max(1);
        self.selected_metric = (self.selected_metric + count - 1) % count;
    }

    fn page_row_count(&self) -> usize {
        lock(&self.dashboard.table).page_rows().len()
    }

    pub fn next(&mut self) {
        let len = self.page_row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.page_row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        lock(&self.dashboard.table).next_page();
        self.state.select(Some(0));
    }

    pub fn page_up(&mut self) {
        lock(&self.dashboard.table).previous_page();
        self.state.select(Some(0));
    }

    /// Timers that tick without input: clock, notice expiry, selection bounds
    pub fn tick(&mut self) {
        if self.clock_refreshed.elapsed() >= CLOCK_REFRESH {
            self.clock = current_clock();
            self.clock_refreshed = Instant::now();
        }

        lock(&self.dashboard.notices).prune(tokio::time::Instant::now());

        let len = self.page_row_count();
        match self.state.selected() {
            _ if len == 0 => self.state.select(None),
            Some(i) if i >= len => self.state.select(Some(len - 1)),
            None => self.state.select(Some(0)),
            _ => {}
        }
    }

    fn edit_search(&mut self, key: KeyCode) {
        let mut table = lock(&self.dashboard.table);
        let mut query = table.search().to_string();
        match key {
            KeyCode::Char(c) => query.push(c),
            KeyCode::Backspace => {
                query.pop();
            }
            _ => return,
        }
        table.set_search(&query);
    }

    /// Returns false when the app should quit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('f') {
            self.focus = Focus::Search;
            return true;
        }

        match key.code {
            KeyCode::F(5) => {
                self.apply_filters();
                return true;
            }
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return true;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.previous();
                return true;
            }
            _ => {}
        }

        if self.metric_detail.is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
                self.metric_detail = None;
            }
            return true;
        }

        match self.focus {
            Focus::Search => match key.code {
                KeyCode::Esc | KeyCode::Enter => self.focus = Focus::Table,
                code => self.edit_search(code),
            },
            Focus::DateFrom | Focus::DateTo | Focus::House => match key.code {
                KeyCode::Esc => self.focus = Focus::Table,
                KeyCode::Enter => self.apply_filters(),
                KeyCode::Backspace => {
                    if let Some(field) = self.form.field_mut(self.focus) {
                        field.pop();
                    }
                }
                KeyCode::Char(c) => {
                    if let Some(field) = self.form.field_mut(self.focus) {
                        field.push(c);
                    }
                }
                _ => {}
            },
            Focus::Table => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return false,
                KeyCode::Enter => self.toggle_detail(),
                KeyCode::Char('e') => self.trigger_row_action(RowAction::Edit),
                KeyCode::Char('v') => self.trigger_row_action(RowAction::View),
                KeyCode::Char('m') | KeyCode::Char(' ') => self.click_metric(),
                KeyCode::Left | KeyCode::Char('h') => self.previous_metric(),
                KeyCode::Right | KeyCode::Char('l') => self.next_metric(),
                KeyCode::Down | KeyCode::Char('j') => self.next(),
                KeyCode::Up | KeyCode::Char('k') => self.previous(),
                KeyCode::PageDown => self.page_down(),
                KeyCode::PageUp => self.page_up(),
                KeyCode::Home => self.state.select(Some(0)),
                KeyCode::End => {
                    let len = self.page_row_count();
                    if len > 0 {
                        self.state.select(Some(len - 1));
                    }
                }
                _ => {}
            },
        }

        true
    }
}

fn current_clock() -> String {
    format_timestamp(&Local::now().naive_local())
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        app.tick();
        terminal.draw(|f| ui(f, app))?;

        // Poll so that background submissions show up without a key press
        if !event::poll(TICK)? {
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if !app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with clock
            Constraint::Length(4), // Metric cards
            Constraint::Length(3), // Filter bar
            Constraint::Min(0),    // Table area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_metric_cards(f, chunks[1], app);
    render_filter_bar(f, chunks[2], app);

    if app.show_detail {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(65), // Record list
                Constraint::Percentage(35), // Detail panel
            ])
            .split(chunks[3]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        render_table(f, chunks[3], app);
    }

    render_status_bar(f, chunks[4], app);
    render_notices(f, app, f.size());

    if let Some(detail) = &app.metric_detail {
        render_metric_modal(f, f.size(), detail);
    }
}

fn badge_color(color: BadgeColor) -> Color {
    match color {
        BadgeColor::Danger => Color::Red,
        BadgeColor::Success => Color::Green,
        BadgeColor::Info => Color::Cyan,
        BadgeColor::Warning => Color::Yellow,
        BadgeColor::Primary => Color::Blue,
        BadgeColor::Secondary => Color::Gray,
    }
}

fn notice_color(level: NoticeLevel) -> Color {
    match level {
        NoticeLevel::Info => Color::Cyan,
        NoticeLevel::Success => Color::Green,
        NoticeLevel::Warning => Color::Yellow,
        NoticeLevel::Danger => Color::Red,
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let phase = app.coordinator.phase();

    let header_text = vec![Line::from(vec![
        Span::styled(
            "Dashboard Analytics",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(format!("{:?}", phase), Style::default().fg(Color::DarkGray)),
        Span::raw("  |  "),
        Span::styled(app.clock.clone(), Style::default().fg(Color::White)),
    ])];

    let header = Paragraph::new(header_text)
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_metric_cards(f: &mut Frame, area: Rect, app: &App) {
    let board = lock(&app.dashboard.metrics);
    let cards = board.cards();
    if cards.is_empty() {
        return;
    }

    let constraints: Vec<Constraint> = cards
        .iter()
        .map(|_| Constraint::Ratio(1, cards.len() as u32))
        .collect();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    let now = tokio::time::Instant::now();
    for (i, (card, column)) in cards.iter().zip(columns.iter()).enumerate() {
        let mut border = Style::default().fg(Color::DarkGray);
        if i == app.selected_metric {
            border = border.fg(Color::Yellow);
        }
        if card.is_pressed(now) {
            border = border.add_modifier(Modifier::REVERSED);
        }

        let value_style = if card.is_highlighted(now) {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        };

        let content = vec![
            Line::from(Span::styled(card.display.clone(), value_style)),
            Line::from(Span::styled(card.title.clone(), Style::default().fg(Color::DarkGray))),
        ];

        let widget = Paragraph::new(content)
            .block(Block::default().borders(Borders::ALL).border_style(border));
        f.render_widget(widget, *column);
    }
}

fn render_filter_bar(f: &mut Frame, area: Rect, app: &App) {
    let control = lock(&app.dashboard.control);

    let field = |label: &'static str, value: &str, focus: Focus| -> Vec<Span<'static>> {
        let style = if app.focus == focus {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::White)
        };
        vec![
            Span::styled(label, Style::default().fg(Color::Cyan)),
            Span::styled(format!("[{}]", value), style),
            Span::raw("  "),
        ]
    };

    let mut spans = Vec::new();
    spans.extend(field("From ", &app.form.date_from, Focus::DateFrom));
    spans.extend(field("To ", &app.form.date_to, Focus::DateTo));
    spans.extend(field("House ", &app.form.house, Focus::House));

    let button_style = if control.is_enabled() {
        Style::default().fg(Color::Black).bg(Color::Blue)
    } else {
        Style::default().fg(Color::Black).bg(Color::DarkGray)
    };
    spans.push(Span::styled(format!(" {} ", control.label()), button_style));

    let bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Filters "),
    );

    f.render_widget(bar, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let table_view = lock(&app.dashboard.table);

    let header_cells = ["ID", "Name", "House", "Date", "Amount", "Status"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows: Vec<Row> = table_view
        .page_rows()
        .into_iter()
        .map(|row| {
            let [id, name, house, date, amount, status] = row.display_cells();
            let cells = vec![
                Cell::from(id),
                Cell::from(truncate(&name, 24)),
                Cell::from(house).style(Style::default().fg(badge_color(row.category_color()))),
                Cell::from(date),
                Cell::from(amount).style(Style::default().add_modifier(Modifier::BOLD)),
                Cell::from(status).style(Style::default().fg(badge_color(row.status_color()))),
            ];
            Row::new(cells).height(1)
        })
        .collect();

    let search = if table_view.search().is_empty() && app.focus != Focus::Search {
        String::new()
    } else {
        format!(" | Search: {}", table_view.search())
    };
    let title = format!(
        " Records - page {}/{}{} ",
        table_view.page() + 1,
        table_view.page_count(),
        search
    );

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(26),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(16),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if app.focus == Focus::Search {
                Color::Yellow
            } else {
                Color::White
            }))
            .title(title),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    drop(table_view);
    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let (selected, total) = {
        let table = lock(&app.dashboard.table);
        let selected = app
            .state
            .selected()
            .map(|i| table.page() * table.page_length() + i + 1)
            .unwrap_or(0);
        (selected, table.visible().len())
    };

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, total),
        Style::default().fg(Color::Cyan),
    )];

    for (key, action) in [
        ("F5", " Apply | "),
        ("Tab", " Focus | "),
        ("Ctrl+F", " Search | "),
        ("e/v", " Edit/View | "),
        ("←/→ m", " Metric | "),
        ("PgUp/PgDn", " Page | "),
    ] {
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(action));
    }
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_notices(f: &mut Frame, app: &App, screen: Rect) {
    let notices = lock(&app.dashboard.notices);
    let active = notices.active(tokio::time::Instant::now());

    // Newest on top, stacked down the right edge
    let width = 46u16.min(screen.width);
    let mut y = screen.y + 1;
    for notice in active.iter().rev().take(4) {
        if y + 3 > screen.y + screen.height {
            break;
        }

        let area = Rect {
            x: screen.x + screen.width - width,
            y,
            width,
            height: 3,
        };
        let color = notice_color(notice.level);
        let widget = Paragraph::new(notice.message.clone())
            .style(Style::default().fg(color))
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(color)));

        f.render_widget(Clear, area);
        f.render_widget(widget, area);
        y += 3;
    }
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Record Details ");

    let row = match app.selected_row() {
        Some(row) => row,
        None => {
            f.render_widget(Paragraph::new("No record selected").block(block), area);
            return;
        }
    };

    let [id, name, house, date, amount, status] = row.display_cells();
    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let content = vec![
        Line::from(""),
        Line::from(vec![Span::styled("  ID: ", label), Span::raw(id)]),
        Line::from(""),
        Line::from(vec![Span::styled("  Name: ", label), Span::raw(name)]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  House: ", label),
            Span::styled(house, Style::default().fg(badge_color(row.category_color()))),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled("  Date: ", label), Span::raw(date)]),
        Line::from(""),
        Line::from(vec![Span::styled("  Amount: ", label), Span::raw(amount)]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Status: ", label),
            Span::styled(status, Style::default().fg(badge_color(row.status_color()))),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled(
            "  e edit | v view | Enter close",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )]),
    ];

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn render_metric_modal(f: &mut Frame, screen: Rect, detail: &MetricDetail) {
    let area = centered_rect(50, 9, screen);

    let content = vec![
        Line::from(""),
        Line::from(vec![
            Span::raw("  Current value: "),
            Span::styled(detail.value.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(""),
        Line::from(format!("  {}", detail.body)),
        Line::from(""),
        Line::from(Span::styled(
            "  Esc to close",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];

    let modal = Paragraph::new(content).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(format!(" {} ", detail.title)),
    );

    f.render_widget(Clear, area);
    f.render_widget(modal, area);
}

fn centered_rect(percent_x: u16, height: u16, screen: Rect) -> Rect {
    let width = screen.width * percent_x / 100;
    let height = height.min(screen.height);
    Rect {
        x: screen.x + (screen.width.saturating_sub(width)) / 2,
        y: screen.y + (screen.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
