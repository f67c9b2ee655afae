// Dashboard Analytics - Core Library
// Exposes all modules for use in the TUI, the API server, and tests

pub mod config;      // Explicit configuration (timings, mock policy, metric slots)
pub mod error;       // Validation and transient error taxonomy
pub mod format;      // pt-BR display formatting
pub mod model;       // Filter criteria, metric snapshots, table rows
pub mod source;      // Mock data source with latency and failure injection
pub mod views;       // Metric board, data table, notices, trigger control
pub mod coordinator; // Filter coordinator state machine

// Re-export commonly used types
pub use config::{
    DashboardConfig, MetricSlot, MockConfig, SortDirective, TableConfig, TimingConfig,
    METRIC_SLOTS,
};
pub use coordinator::{Dashboard, FilterCoordinator, Phase, Sinks};
pub use error::{SubmitError, TransientError, ValidationError};
pub use format::{format_currency, format_date, format_metric, format_timestamp, MetricFormat};
pub use model::{BadgeColor, FetchResult, FilterCriteria, MetricSnapshot, TableRow};
pub use source::{DataSource, MockDataSource};
pub use views::{
    lock, page_slice, ControlState, DataTable, MetricBoard, MetricCard, MetricDetail, MetricView, Notice,
    NoticeLevel, NotificationCenter, NotificationSink, RowAction, TableView, TriggerControl,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
