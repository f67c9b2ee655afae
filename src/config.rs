// ⚙️ Dashboard Configuration
// One explicit struct handed to the coordinator, the data source and the views.
// Loaded from JSON, every field optional and defaulted.

use crate::format::MetricFormat;
use anyhow::{bail, Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Number of metric cards on the dashboard.
pub const METRIC_SLOTS: usize = 8;

/// Environment variable pointing at a JSON config file.
pub const CONFIG_ENV: &str = "DASHBOARD_CONFIG";

// ============================================================================
// TABLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirective {
    DateDesc,
    DateAsc,
    AmountDesc,
    AmountAsc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub page_length: usize,
    pub default_sort: SortDirective,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            page_length: 10,
            default_sort: SortDirective::DateDesc,
        }
    }
}

// ============================================================================
// TIMING
// ============================================================================

/// All UI timing constants, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Simulated round trip of the mock API
    pub latency_ms: u64,
    /// How long the trigger shows "Applied!" before reverting
    pub success_revert_ms: u64,
    /// Pressed look of a metric card after a click
    pub click_feedback_ms: u64,
    /// Highlight on metric cards whose value changed
    pub highlight_ms: u64,
    /// Auto-dismiss of notices
    pub notification_ttl_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            latency_ms: 1500,
            success_revert_ms: 2000,
            click_feedback_ms: 150,
            highlight_ms: 2000,
            notification_ttl_ms: 5000,
        }
    }
}

impl TimingConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn success_revert(&self) -> Duration {
        Duration::from_millis(self.success_revert_ms)
    }

    pub fn click_feedback(&self) -> Duration {
        Duration::from_millis(self.click_feedback_ms)
    }

    pub fn highlight(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }
}

// ============================================================================
// MOCK DATA SOURCE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Probability that a fetch resolves as a transient error
    pub failure_rate: f64,
    /// Maximum relative perturbation applied to each base metric
    pub variation: f64,
    /// Fixed seed for reproducible sessions; entropy when unset
    pub seed: Option<u64>,
}

impl Default for MockConfig {
    fn default() -> Self {
        MockConfig {
            failure_rate: 0.05,
            variation: 0.15,
            seed: None,
        }
    }
}

// ============================================================================
// METRIC SLOTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSlot {
    pub title: String,
    pub base: f64,
    pub format: MetricFormat,
}

impl MetricSlot {
    fn new(title: &str, base: f64, format: MetricFormat) -> Self {
        MetricSlot {
            title: title.to_string(),
            base,
            format,
        }
    }
}

pub fn default_metric_slots() -> Vec<MetricSlot> {
    vec![
        MetricSlot::new("Students", 1247.0, MetricFormat::Count),
        MetricSlot::new("Sales", 847_000.0, MetricFormat::CurrencyThousands),
        MetricSlot::new("Orders", 2854.0, MetricFormat::Count),
        MetricSlot::new("Conversion Rate", 18.3, MetricFormat::Percent),
        MetricSlot::new("Page Views", 45_200.0, MetricFormat::Thousands),
        MetricSlot::new("Rating", 4.8, MetricFormat::Decimal),
        MetricSlot::new("Avg. Session", 222.0, MetricFormat::Duration),
        MetricSlot::new("Goals Reached", 94.0, MetricFormat::WholePercent),
    ]
}

// ============================================================================
// DASHBOARD CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub locale: String,
    pub table: TableConfig,
    pub timing: TimingConfig,
    pub mock: MockConfig,
    pub metrics: Vec<MetricSlot>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            locale: "pt-BR".to_string(),
            table: TableConfig::default(),
            timing: TimingConfig::default(),
            mock: MockConfig::default(),
            metrics: default_metric_slots(),
        }
    }
}

impl DashboardConfig {
    /// Load and validate a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: DashboardConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Config from `DASHBOARD_CONFIG` if set, defaults otherwise
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => {
                log::info!("Loading dashboard config from {}", path);
                Self::load(path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.metrics.len() != METRIC_SLOTS {
            bail!(
                "Expected {} metric slots, got {}",
                METRIC_SLOTS,
                self.metrics.len()
            );
        }

        if !(0.0..=1.0).contains(&self.mock.failure_rate) {
            bail!("failure_rate must be within [0, 1], got {}", self.mock.failure_rate);
        }

        if !(0.0..1.0).contains(&self.mock.variation) {
            bail!("variation must be within [0, 1), got {}", self.mock.variation);
        }

        if self.table.page_length == 0 {
            bail!("page_length must be positive");
        }

        Ok(())
    }

    pub fn base_metrics(&self) -> Vec<f64> {
        self.metrics.iter().map(|slot| slot.base).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DashboardConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.locale, "pt-BR");
        assert_eq!(
            config.base_metrics(),
            vec![1247.0, 847_000.0, 2854.0, 18.3, 45_200.0, 4.8, 222.0, 94.0]
        );
        assert_eq!(config.timing.latency(), Duration::from_millis(1500));
        assert_eq!(config.timing.notification_ttl(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "mock": { "failure_rate": 0.5 }, "timing": { "latency_ms": 10 } }"#;
        let config: DashboardConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.mock.failure_rate, 0.5);
        assert_eq!(config.mock.variation, 0.15);
        assert_eq!(config.timing.latency_ms, 10);
        assert_eq!(config.timing.success_revert_ms, 2000);
        assert_eq!(config.metrics.len(), METRIC_SLOTS);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = DashboardConfig::default();
        config.mock.failure_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.mock.variation = 1.0;
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.metrics.pop();
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.table.page_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "dashboard-config-{}.json",
            std::process::id()
        ));
        fs::write(&path, r#"{ "table": { "page_length": 25 } }"#).unwrap();

        let config = DashboardConfig::load(&path).unwrap();
        assert_eq!(config.table.page_length, 25);
        assert_eq!(config.table.default_sort, SortDirective::DateDesc);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = DashboardConfig::load("/nonexistent/dashboard.json");
        assert!(result.is_err());
    }
}
