// Dashboard Analytics - Web Server
// JSON API over the same coordinator and views the TUI drives

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use dashboard_analytics::{
    lock, page_slice, BadgeColor, ControlState, Dashboard, DashboardConfig, FilterCoordinator,
    FilterCriteria, MockDataSource, NoticeLevel, Phase, RowAction, SubmitError, TableRow,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
struct AppState {
    dashboard: Dashboard,
    coordinator: Arc<FilterCoordinator<MockDataSource>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Metric card as displayed
#[derive(Serialize)]
struct MetricResponse {
    slot: usize,
    title: String,
    value: i64,
    display: String,
}

/// Table row, raw values plus display text and badge colors
#[derive(Serialize)]
struct RowResponse {
    id: String,
    name: String,
    category: String,
    category_color: BadgeColor,
    date: String,
    amount: f64,
    amount_display: String,
    status: String,
    status_color: BadgeColor,
}

impl From<&TableRow> for RowResponse {
    fn from(row: &TableRow) -> Self {
        let [_, _, _, date, amount_display, _] = row.display_cells();
        Self {
            id: row.id.clone(),
            name: row.name.clone(),
            category: row.category.clone(),
            category_color: row.category_color(),
            date,
            amount: row.amount,
            amount_display,
            status: row.status.clone(),
            status_color: row.status_color(),
        }
    }
}

#[derive(Serialize)]
struct RowsResponse {
    page: usize,
    page_count: usize,
    total: usize,
    rows: Vec<RowResponse>,
}

#[derive(Deserialize)]
struct RowsQuery {
    #[serde(default)]
    page: usize,
    #[serde(default)]
    search: String,
}

#[derive(Serialize)]
struct NoticeResponse {
    id: u64,
    message: String,
    level: NoticeLevel,
}

#[derive(Serialize)]
struct StatusResponse {
    phase: Phase,
    control: ControlState,
    label: &'static str,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/status - Coordinator phase and apply button state
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let control = lock(&state.dashboard.control);
    Json(ApiResponse::ok(StatusResponse {
        phase: state.coordinator.phase(),
        control: control.state(),
        label: control.label(),
    }))
}

/// GET /api/metrics - Current metric cards
async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let board = lock(&state.dashboard.metrics);
    let metrics: Vec<MetricResponse> = board
        .cards()
        .iter()
        .enumerate()
        .map(|(slot, card)| MetricResponse {
            slot,
            title: card.title.clone(),
            value: card.raw,
            display: card.display.clone(),
        })
        .collect();

    Json(ApiResponse::ok(metrics))
}

/// GET /api/metrics/:slot - Details for one card (also counts as a click)
async fn get_metric_detail(
    State(state): State<AppState>,
    Path(slot): Path<usize>,
) -> impl IntoResponse {
    match lock(&state.dashboard.metrics).click(slot) {
        Some(detail) => (StatusCode::OK, Json(ApiResponse::ok(detail))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::err(format!("No metric in slot {}", slot))),
        )
            .into_response(),
    }
}

/// GET /api/rows?page=&search= - Current table page
async fn get_rows(State(state): State<AppState>, Query(query): Query<RowsQuery>) -> impl IntoResponse {
    let table = lock(&state.dashboard.table);
    let matching: Vec<&TableRow> = table
        .rows()
        .iter()
        .filter(|row| row.matches_search(&query.search))
        .collect();

    Json(ApiResponse::ok(rows_page(&matching, query.page, table.page_length())))
}

fn rows_page(matching: &[&TableRow], page: usize, page_length: usize) -> RowsResponse {
    RowsResponse {
        page,
        page_count: matching.len().div_ceil(page_length).max(1),
        total: matching.len(),
        rows: page_slice(matching, page, page_length)
            .iter()
            .map(|row| RowResponse::from(*row))
            .collect(),
    }
}

/// POST /api/filters - Apply filter criteria
async fn apply_filters(
    State(state): State<AppState>,
    Json(criteria): Json<FilterCriteria>,
) -> impl IntoResponse {
    match state.coordinator.submit(criteria).await {
        Ok(result) => (StatusCode::OK, Json(ApiResponse::ok(result))).into_response(),
        Err(err @ SubmitError::Validation(_)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::<()>::err(err.to_string())),
        )
            .into_response(),
        Err(err @ SubmitError::Transient(_)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::<()>::err(err.to_string())),
        )
            .into_response(),
    }
}

/// POST /api/rows/:index/:action - Edit or view a row
async fn row_action(
    State(state): State<AppState>,
    Path((index, action)): Path<(usize, String)>,
) -> impl IntoResponse {
    let Some(action) = RowAction::parse(&action) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::err(format!("Unknown action: {}", action))),
        )
            .into_response();
    };

    match lock(&state.dashboard.table).trigger(action, index) {
        Some(row) => (StatusCode::OK, Json(ApiResponse::ok(RowResponse::from(&row)))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::err(format!("No row at index {}", index))),
        )
            .into_response(),
    }
}

/// GET /api/notifications - Notices not yet dismissed
async fn get_notifications(State(state): State<AppState>) -> impl IntoResponse {
    let mut notices = lock(&state.dashboard.notices);
    let now = tokio::time::Instant::now();
    notices.prune(now);

    let response: Vec<NoticeResponse> = notices
        .active(now)
        .into_iter()
        .map(|notice| NoticeResponse {
            id: notice.id,
            message: notice.message.clone(),
            level: notice.level,
        })
        .collect();

    Json(ApiResponse::ok(response))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("🌐 Dashboard Analytics - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = DashboardConfig::from_env()?;
    let dashboard = Dashboard::new(&config);
    let coordinator = FilterCoordinator::new(
        &config,
        MockDataSource::from_config(&config),
        dashboard.sinks(),
    );

    // Create shared state
    let state = AppState {
        dashboard,
        coordinator: Arc::new(coordinator),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/metrics", get(get_metrics))
        .route("/metrics/:slot", get(get_metric_detail))
        .route("/rows", get(get_rows))
        .route("/rows/:index/:action", post(row_action))
        .route("/filters", post(apply_filters))
        .route("/notifications", get(get_notifications))
        .with_state(state);

    // Build main router
    let app = Router::new()
        .nest("/api", api_routes)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    // Start server
    let addr = std::env::var("DASHBOARD_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/metrics", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_analytics::source::default_dataset;

    #[test]
    fn test_rows_page_slices_dataset() {
        let dataset = default_dataset();
        let matching: Vec<&TableRow> = dataset.iter().collect();

        let first = rows_page(&matching, 0, 10);
        assert_eq!(first.total, 12);
        assert_eq!(first.page_count, 2);
        assert_eq!(first.rows.len(), 10);

        let second = rows_page(&matching, 1, 10);
        assert_eq!(second.rows.len(), 2);
        assert_eq!(second.rows[0].id, dataset[10].id);
    }

    #[test]
    fn test_rows_page_past_the_end_is_empty() {
        let dataset = default_dataset();
        let matching: Vec<&TableRow> = dataset.iter().collect();

        let response = rows_page(&matching, usize::MAX, 10);
        assert_eq!(response.page, usize::MAX);
        assert_eq!(response.total, 12);
        assert!(response.rows.is_empty());
    }
}
