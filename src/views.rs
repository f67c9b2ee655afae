// 🖼️ Display Sinks
// Metric cards, the data table, notices and the apply button.
// Each view exposes typed subscriptions instead of ambient listeners.

use crate::config::{DashboardConfig, MetricSlot, SortDirective};
use crate::format::{format_metric, MetricFormat};
use crate::model::{MetricSnapshot, TableRow};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

pub type RowActionHandler = Box<dyn Fn(RowAction, &TableRow) + Send>;
pub type MetricClickHandler = Box<dyn Fn(usize, &str) + Send>;

/// The `page`-th slice of `page_length` items; pages past the end are empty
pub fn page_slice<T>(items: &[T], page: usize, page_length: usize) -> &[T] {
    let start = page.saturating_mul(page_length).min(items.len());
    let end = start.saturating_add(page_length).min(items.len());
    &items[start..end]
}

/// Lock a shared view. A panicked writer leaves the view usable.
pub fn lock<T: ?Sized>(view: &Mutex<T>) -> MutexGuard<'_, T> {
    view.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// VIEW TRAITS
// ============================================================================

pub trait MetricView: Send {
    /// Replace every slot with the snapshot's values
    fn render(&mut self, snapshot: &MetricSnapshot);

    fn on_click(&mut self, handler: MetricClickHandler);
}

pub trait TableView: Send {
    /// Replace the table content; rows arrive raw and are formatted on display
    fn replace_rows(&mut self, rows: Vec<TableRow>);

    fn subscribe(&mut self, handler: RowActionHandler);
}

pub trait NotificationSink: Send {
    fn notify(&mut self, message: &str, level: NoticeLevel);
}

// ============================================================================
// METRIC BOARD
// ============================================================================

#[derive(Debug, Clone)]
pub struct MetricCard {
    pub title: String,
    pub format: MetricFormat,
    pub raw: i64,
    pub display: String,
    highlighted_until: Option<Instant>,
    pressed_until: Option<Instant>,
}

impl MetricCard {
    fn from_slot(slot: &MetricSlot) -> Self {
        let raw = slot.base.round() as i64;
        MetricCard {
            title: slot.title.clone(),
            format: slot.format,
            raw,
            display: format_metric(raw, slot.format),
            highlighted_until: None,
            pressed_until: None,
        }
    }

    /// Value changed recently
    pub fn is_highlighted(&self, now: Instant) -> bool {
        self.highlighted_until.map_or(false, |until| now < until)
    }

    /// Clicked recently
    pub fn is_pressed(&self, now: Instant) -> bool {
        self.pressed_until.map_or(false, |until| now < until)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDetail {
    pub title: String,
    pub value: String,
    pub body: String,
}

pub struct MetricBoard {
    cards: Vec<MetricCard>,
    highlight: Duration,
    click_feedback: Duration,
    click_handlers: Vec<MetricClickHandler>,
    last_changed: Vec<usize>,
}

impl MetricBoard {
    pub fn new(config: &DashboardConfig) -> Self {
        MetricBoard {
            cards: config.metrics.iter().map(MetricCard::from_slot).collect(),
            highlight: config.timing.highlight(),
            click_feedback: config.timing.click_feedback(),
            click_handlers: Vec::new(),
            last_changed: Vec::new(),
        }
    }

    pub fn cards(&self) -> &[MetricCard] {
        &self.cards
    }

    pub fn values(&self) -> Vec<i64> {
        self.cards.iter().map(|card| card.raw).collect()
    }

    /// Slots whose displayed text changed on the last render
    pub fn last_changed(&self) -> &[usize] {
        &self.last_changed
    }

    /// Press a card: brief visual feedback, subscribers notified, details returned
    pub fn click(&mut self, slot: usize) -> Option<MetricDetail> {
        let now = Instant::now();
        let card = self.cards.get_mut(slot)?;
        card.pressed_until = Some(now + self.click_feedback);

        let title = card.title.clone();
        for handler in &self.click_handlers {
            handler(slot, &title);
        }

        self.details(slot)
    }

    pub fn details(&self, slot: usize) -> Option<MetricDetail> {
        let card = self.cards.get(slot)?;
        Some(MetricDetail {
            title: format!("Details: {}", card.title),
            value: card.display.clone(),
            body: format!(
                "Charts, trends and comparisons for {} would be shown here.",
                card.title
            ),
        })
    }
}

impl MetricView for MetricBoard {
    fn render(&mut self, snapshot: &MetricSnapshot) {
        let now = Instant::now();
        self.last_changed.clear();

        for (slot, (card, value)) in self.cards.iter_mut().zip(snapshot.iter()).enumerate() {
            let display = format_metric(value, card.format);
            card.raw = value;

            if display != card.display {
                card.display = display;
                card.highlighted_until = Some(now + self.highlight);
                self.last_changed.push(slot);
            }
        }
    }

    fn on_click(&mut self, handler: MetricClickHandler) {
        self.click_handlers.push(handler);
    }
}

// ============================================================================
// DATA TABLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    Edit,
    View,
}

impl RowAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "edit" => Some(RowAction::Edit),
            "view" => Some(RowAction::View),
            _ => None,
        }
    }
}

pub struct DataTable {
    rows: Vec<TableRow>,
    sort: SortDirective,
    page_length: usize,
    page: usize,
    search: String,
    handlers: Vec<RowActionHandler>,
}

impl DataTable {
    pub fn new(config: &DashboardConfig) -> Self {
        DataTable {
            rows: Vec::new(),
            sort: config.table.default_sort,
            page_length: config.table.page_length.max(1),
            page: 0,
            search: String::new(),
            handlers: Vec::new(),
        }
    }

    pub fn with_rows(mut self, rows: Vec<TableRow>) -> Self {
        self.replace_rows(rows);
        self
    }

    pub fn sort(&self) -> SortDirective {
        self.sort
    }

    pub fn sort_by(&mut self, sort: SortDirective) {
        self.sort = sort;
        self.apply_sort();
    }

    fn apply_sort(&mut self) {
        match self.sort {
            SortDirective::DateDesc => self.rows.sort_by(|a, b| b.date.cmp(&a.date)),
            SortDirective::DateAsc => self.rows.sort_by(|a, b| a.date.cmp(&b.date)),
            SortDirective::AmountDesc => self.rows.sort_by(|a, b| b.amount.total_cmp(&a.amount)),
            SortDirective::AmountAsc => self.rows.sort_by(|a, b| a.amount.total_cmp(&b.amount)),
        }
    }

    /// All rows, sorted, ignoring the search box
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Sorted rows matching the search box
    pub fn visible(&self) -> Vec<&TableRow> {
        self.rows
            .iter()
            .filter(|row| row.matches_search(&self.search))
            .collect()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, query: &str) {
        self.search = query.to_string();
        self.page = 0;
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_length(&self) -> usize {
        self.page_length
    }

    pub fn page_count(&self) -> usize {
        let visible = self.visible().len();
        visible.div_ceil(self.page_length).max(1)
    }

    pub fn page_rows(&self) -> Vec<&TableRow> {
        let visible = self.visible();
        page_slice(&visible, self.page, self.page_length).to_vec()
    }

    pub fn next_page(&mut self) {
        if self.page + 1 < self.page_count() {
            self.page += 1;
        }
    }

    pub fn previous_page(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    /// Fire a row action on the visible row at `index`; returns the row acted on
    pub fn trigger(&self, action: RowAction, index: usize) -> Option<TableRow> {
        let row = self.visible().get(index).map(|row| (*row).clone())?;

        for handler in &self.handlers {
            handler(action, &row);
        }

        Some(row)
    }
}

impl TableView for DataTable {
    fn replace_rows(&mut self, rows: Vec<TableRow>) {
        self.rows = rows;
        self.page = 0;
        self.apply_sort();
    }

    fn subscribe(&mut self, handler: RowActionHandler) {
        self.handlers.push(handler);
    }
}

// ============================================================================
// NOTIFICATIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub id: u64,
    pub message: String,
    pub level: NoticeLevel,
    pub raised_at: Instant,
}

pub struct NotificationCenter {
    notices: Vec<Notice>,
    ttl: Duration,
    next_id: u64,
}

impl NotificationCenter {
    pub fn new(config: &DashboardConfig) -> Self {
        NotificationCenter {
            notices: Vec::new(),
            ttl: config.timing.notification_ttl(),
            next_id: 1,
        }
    }

    /// Notices not yet auto-dismissed at `now`
    pub fn active(&self, now: Instant) -> Vec<&Notice> {
        self.notices
            .iter()
            .filter(|notice| now < notice.raised_at + self.ttl)
            .collect()
    }

    pub fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.notices.retain(|notice| now < notice.raised_at + ttl);
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.notices.last()
    }

    /// Every notice raised and not yet pruned, oldest first
    pub fn history(&self) -> &[Notice] {
        &self.notices
    }
}

impl NotificationSink for NotificationCenter {
    fn notify(&mut self, message: &str, level: NoticeLevel) {
        let now = Instant::now();
        self.prune(now);
        self.notices.push(Notice {
            id: self.next_id,
            message: message.to_string(),
            level,
            raised_at: now,
        });
        self.next_id += 1;
    }
}

// ============================================================================
// TRIGGER CONTROL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlState {
    Ready,
    Busy,
    Applied,
}

/// The "Apply Filters" button and its busy indicator.
#[derive(Debug)]
pub struct TriggerControl {
    state: ControlState,
}

impl Default for TriggerControl {
    fn default() -> Self {
        TriggerControl {
            state: ControlState::Ready,
        }
    }
}

impl TriggerControl {
    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state == ControlState::Ready
    }

    pub fn label(&self) -> &'static str {
        match self.state {
            ControlState::Ready => "Apply Filters",
            ControlState::Busy => "Applying...",
            ControlState::Applied => "Applied!",
        }
    }

    pub fn begin_busy(&mut self) {
        self.state = ControlState::Busy;
    }

    /// Go busy only from Ready; false means a submission already holds the control
    pub fn try_begin_busy(&mut self) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.begin_busy();
        true
    }

    pub fn mark_applied(&mut self) {
        self.state = ControlState::Applied;
    }

    pub fn reset(&mut self) {
        self.state = ControlState::Ready;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn row(id: &str, name: &str, house: &str, day: u32, amount: f64) -> TableRow {
        let date = NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        TableRow::new(id, name, house, date, amount, "Active")
    }

    fn sample_rows() -> Vec<TableRow> {
        vec![
            row("#001", "Harry Potter", "Gryffindor", 10, 1250.0),
            row("#002", "Hermione Granger", "Gryffindor", 14, 2100.0),
            row("#004", "Draco Malfoy", "Slytherin", 12, 3200.0),
        ]
    }

    #[test]
    fn test_metric_board_starts_with_base_values() {
        let board = MetricBoard::new(&DashboardConfig::default());
        let displays: Vec<&str> = board.cards().iter().map(|c| c.display.as_str()).collect();

        assert_eq!(
            displays,
            vec!["1.247", "R$ 847K", "2.854", "18.0%", "45.2K", "5.0", "3m 42s", "94%"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_highlights_only_changed_slots() {
        let mut board = MetricBoard::new(&DashboardConfig::default());
        let snapshot = MetricSnapshot::new([1300, 847_000, 2854, 18, 45_200, 5, 230, 94]);

        board.render(&snapshot);

        assert_eq!(board.last_changed(), &[0, 6]);
        assert_eq!(board.cards()[0].display, "1.300");
        assert_eq!(board.cards()[6].display, "3m 50s");

        let now = Instant::now();
        assert!(board.cards()[0].is_highlighted(now));
        assert!(!board.cards()[1].is_highlighted(now));

        tokio::time::advance(Duration::from_millis(2001)).await;
        assert!(!board.cards()[0].is_highlighted(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_metric_click_notifies_and_returns_details() {
        let mut board = MetricBoard::new(&DashboardConfig::default());
        let clicks = Arc::new(Mutex::new(Vec::new()));
        let sink = clicks.clone();
        board.on_click(Box::new(move |slot: usize, title: &str| {
            sink.lock().unwrap().push((slot, title.to_string()));
        }));

        let detail = board.click(1).unwrap();

        assert_eq!(detail.title, "Details: Sales");
        assert_eq!(detail.value, "R$ 847K");
        assert_eq!(*clicks.lock().unwrap(), vec![(1, "Sales".to_string())]);
        assert!(board.cards()[1].is_pressed(Instant::now()));

        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(!board.cards()[1].is_pressed(Instant::now()));

        assert!(board.click(8).is_none());
    }

    #[test]
    fn test_table_sorts_by_date_descending_by_default() {
        let table = DataTable::new(&DashboardConfig::default()).with_rows(sample_rows());
        let ids: Vec<&str> = table.rows().iter().map(|r| r.id.as_str()).collect();

        assert_eq!(ids, vec!["#002", "#004", "#001"]);
    }

    #[test]
    fn test_table_sort_by_amount() {
        let mut table = DataTable::new(&DashboardConfig::default()).with_rows(sample_rows());
        table.sort_by(SortDirective::AmountAsc);

        let ids: Vec<&str> = table.rows().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["#001", "#002", "#004"]);
    }

    #[test]
    fn test_table_replace_is_total() {
        let mut table = DataTable::new(&DashboardConfig::default()).with_rows(sample_rows());
        table.replace_rows(vec![row("#009", "Hannah Abbott", "Hufflepuff", 4, 320.0)]);

        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.rows()[0].name, "Hannah Abbott");

        table.replace_rows(Vec::new());
        assert!(table.rows().is_empty());
    }

    #[test]
    fn test_table_pagination() {
        let mut config = DashboardConfig::default();
        config.table.page_length = 2;
        let mut table = DataTable::new(&config).with_rows(sample_rows());

        assert_eq!(table.page_count(), 2);
        assert_eq!(table.page_rows().len(), 2);

        table.next_page();
        assert_eq!(table.page(), 1);
        assert_eq!(table.page_rows().len(), 1);

        table.next_page();
        assert_eq!(table.page(), 1);

        table.previous_page();
        table.previous_page();
        assert_eq!(table.page(), 0);
    }

    #[test]
    fn test_page_slice_handles_out_of_range_pages() {
        let items = [1, 2, 3, 4, 5];

        assert_eq!(page_slice(&items, 0, 2), &[1, 2]);
        assert_eq!(page_slice(&items, 2, 2), &[5]);
        assert!(page_slice(&items, 3, 2).is_empty());
        assert!(page_slice(&items, usize::MAX, 2).is_empty());
        assert!(page_slice(&items, usize::MAX, usize::MAX).is_empty());
    }

    #[test]
    fn test_table_search_filters_visible_rows() {
        let mut table = DataTable::new(&DashboardConfig::default()).with_rows(sample_rows());
        table.set_search("slyth");

        let visible = table.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "Draco Malfoy");
        assert_eq!(table.rows().len(), 3);
    }

    #[test]
    fn test_row_actions_reach_subscribers_with_raw_row() {
        let mut table = DataTable::new(&DashboardConfig::default()).with_rows(sample_rows());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        table.subscribe(Box::new(move |action: RowAction, row: &TableRow| {
            sink.lock().unwrap().push((action, row.id.clone()));
        }));

        let acted = table.trigger(RowAction::Edit, 0).unwrap();
        table.trigger(RowAction::View, 2);

        assert_eq!(acted.name, "Hermione Granger");
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(RowAction::Edit, "#002".to_string()), (RowAction::View, "#001".to_string())]
        );
        assert!(table.trigger(RowAction::Edit, 5).is_none());
    }

    #[test]
    fn test_row_action_parse() {
        assert_eq!(RowAction::parse("EDIT"), Some(RowAction::Edit));
        assert_eq!(RowAction::parse("view"), Some(RowAction::View));
        assert_eq!(RowAction::parse("delete"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notices_auto_dismiss() {
        let mut center = NotificationCenter::new(&DashboardConfig::default());
        center.notify("Filters applied successfully!", NoticeLevel::Success);

        assert_eq!(center.active(Instant::now()).len(), 1);
        assert_eq!(center.latest().unwrap().level, NoticeLevel::Success);

        tokio::time::advance(Duration::from_millis(4999)).await;
        assert_eq!(center.active(Instant::now()).len(), 1);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(center.active(Instant::now()).is_empty());

        center.prune(Instant::now());
        assert!(center.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_notices_are_dropped_on_notify() {
        let mut center = NotificationCenter::new(&DashboardConfig::default());

        for _ in 0..1000 {
            center.notify("Filters applied successfully!", NoticeLevel::Success);
            tokio::time::advance(Duration::from_secs(6)).await;
        }

        assert!(center.active(Instant::now()).is_empty());
        assert_eq!(center.history().len(), 1);
        assert_eq!(center.latest().unwrap().id, 1000);
    }

    #[test]
    fn test_try_begin_busy_claims_once() {
        let mut control = TriggerControl::default();

        assert!(control.try_begin_busy());
        assert!(!control.try_begin_busy());
        assert_eq!(control.state(), ControlState::Busy);

        control.mark_applied();
        assert!(!control.try_begin_busy());

        control.reset();
        assert!(control.try_begin_busy());
    }

    #[test]
    fn test_trigger_control_states() {
        let mut control = TriggerControl::default();
        assert!(control.is_enabled());
        assert_eq!(control.label(), "Apply Filters");

        control.begin_busy();
        assert!(!control.is_enabled());
        assert_eq!(control.label(), "Applying...");

        control.mark_applied();
        assert!(!control.is_enabled());
        assert_eq!(control.label(), "Applied!");

        control.reset();
        assert_eq!(control.state(), ControlState::Ready);
    }
}
