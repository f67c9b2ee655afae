// 🧭 Filter Coordinator
// Validates filter criteria, dispatches to the data source and pushes results
// into the display sinks. Failures leave the displayed data untouched.
//
// Idle -> Validating -> Rejected -> Idle
//                    -> Dispatching -> Succeeded -> Idle
//                                   -> Failed -> Idle

use crate::config::{DashboardConfig, TimingConfig};
use crate::error::SubmitError;
use crate::model::{FetchResult, FilterCriteria, TableRow};
use crate::source::{default_dataset, DataSource};
use crate::views::{
    lock, ControlState, DataTable, MetricBoard, MetricView, NoticeLevel, NotificationCenter,
    NotificationSink, RowAction, TableView, TriggerControl,
};
use serde::Serialize;
use std::sync::{Arc, Mutex};

pub const MSG_INVALID_RANGE: &str = "The start date must be before the end date.";
pub const MSG_APPLIED: &str = "Filters applied successfully!";
pub const MSG_FAILED: &str = "Error applying filters. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Validating,
    Rejected,
    Dispatching,
    Succeeded,
    Failed,
}

// ============================================================================
// SINKS
// ============================================================================

/// Shared handles to every view the coordinator writes to.
/// Concurrent submissions write unguarded; the last one to resolve wins.
#[derive(Clone)]
pub struct Sinks {
    pub metrics: Arc<Mutex<dyn MetricView>>,
    pub table: Arc<Mutex<dyn TableView>>,
    pub notices: Arc<Mutex<dyn NotificationSink>>,
    pub control: Arc<Mutex<TriggerControl>>,
}

/// The concrete in-memory views used by the TUI, the server and the CLI.
#[derive(Clone)]
pub struct Dashboard {
    pub metrics: Arc<Mutex<MetricBoard>>,
    pub table: Arc<Mutex<DataTable>>,
    pub notices: Arc<Mutex<NotificationCenter>>,
    pub control: Arc<Mutex<TriggerControl>>,
}

impl Dashboard {
    /// Cards at their base values and the table showing the full dataset
    pub fn new(config: &DashboardConfig) -> Self {
        Dashboard {
            metrics: Arc::new(Mutex::new(MetricBoard::new(config))),
            table: Arc::new(Mutex::new(DataTable::new(config).with_rows(default_dataset()))),
            notices: Arc::new(Mutex::new(NotificationCenter::new(config))),
            control: Arc::new(Mutex::new(TriggerControl::default())),
        }
    }

    pub fn sinks(&self) -> Sinks {
        Sinks {
            metrics: self.metrics.clone(),
            table: self.table.clone(),
            notices: self.notices.clone(),
            control: self.control.clone(),
        }
    }
}

// ============================================================================
// COORDINATOR
// ============================================================================

pub struct FilterCoordinator<S> {
    timing: TimingConfig,
    source: S,
    sinks: Sinks,
    phase: Mutex<Phase>,
}

impl<S: DataSource> FilterCoordinator<S> {
    /// Build the coordinator and wire view events to notices and logs
    pub fn new(config: &DashboardConfig, source: S, sinks: Sinks) -> Self {
        let notices = sinks.notices.clone();
        lock(&sinks.table).subscribe(Box::new(move |action: RowAction, row: &TableRow| {
            let message = match action {
                RowAction::Edit => format!("Editing record: {}", row.name),
                RowAction::View => format!("Viewing details of: {}", row.name),
            };
            log::info!("{} ({})", message, row.id);
            lock(&notices).notify(&message, NoticeLevel::Info);
        }));

        lock(&sinks.metrics).on_click(Box::new(|slot: usize, title: &str| {
            log::info!("Metric clicked: {} (slot {})", title, slot);
        }));

        FilterCoordinator {
            timing: config.timing.clone(),
            source,
            sinks,
            phase: Mutex::new(Phase::Idle),
        }
    }

    pub fn phase(&self) -> Phase {
        *lock(&self.phase)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn set_phase(&self, phase: Phase) {
        log::debug!("Filter coordinator -> {:?}", phase);
        *lock(&self.phase) = phase;
    }

    /// Validate, fetch and render. Every submission starts from Idle and
    /// returns to Idle; nothing carries over between submissions.
    pub async fn submit(&self, criteria: FilterCriteria) -> Result<FetchResult, SubmitError> {
        log::info!("Filters applied: {:?}", criteria);
        self.set_phase(Phase::Validating);

        if let Err(err) = criteria.validate() {
            log::warn!("Rejected filters: {}", err);
            self.set_phase(Phase::Rejected);
            lock(&self.sinks.notices).notify(MSG_INVALID_RANGE, NoticeLevel::Warning);
            self.set_phase(Phase::Idle);
            return Err(err.into());
        }

        lock(&self.sinks.control).begin_busy();
        self.set_phase(Phase::Dispatching);

        match self.source.fetch(&criteria).await {
            Ok(result) => {
                log::info!(
                    "Filtered data received: {} rows, metrics {:?}",
                    result.rows.len(),
                    result.metrics.values()
                );

                lock(&self.sinks.metrics).render(&result.metrics);
                lock(&self.sinks.table).replace_rows(result.rows.clone());
                lock(&self.sinks.notices).notify(MSG_APPLIED, NoticeLevel::Success);
                lock(&self.sinks.control).mark_applied();

                self.set_phase(Phase::Succeeded);
                self.schedule_revert();
                self.set_phase(Phase::Idle);
                Ok(result)
            }
            Err(err) => {
                log::error!("Failed to apply filters: {}", err);

                lock(&self.sinks.notices).notify(MSG_FAILED, NoticeLevel::Danger);
                lock(&self.sinks.control).reset();

                self.set_phase(Phase::Failed);
                self.set_phase(Phase::Idle);
                Err(err.into())
            }
        }
    }

    /// Return the trigger to its default look once the success delay passes.
    /// A submission that went busy in the meantime keeps its state.
    fn schedule_revert(&self) {
        let control = self.sinks.control.clone();
        let delay = self.timing.success_revert();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut control = lock(&control);
            if control.state() == ControlState::Applied {
                control.reset();
            }
        });
    }
}
