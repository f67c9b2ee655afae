// 🎲 Mock Data Source
// Stands in for the analytics API: fixed latency, injected failures,
// perturbed metric values and house-filtered rows from an in-memory dataset.

use crate::config::{DashboardConfig, METRIC_SLOTS};
use crate::error::TransientError;
use crate::model::{FetchResult, FilterCriteria, MetricSnapshot, TableRow};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// DATA SOURCE TRAIT
// ============================================================================

/// Anything the coordinator can fetch filtered dashboard data from.
/// Resolves exactly once; there is no cancellation.
pub trait DataSource: Send + Sync {
    fn fetch(
        &self,
        criteria: &FilterCriteria,
    ) -> impl Future<Output = Result<FetchResult, TransientError>> + Send;
}

// ============================================================================
// MOCK DATA SOURCE
// ============================================================================

pub struct MockDataSource<R = StdRng> {
    rng: Mutex<R>,
    latency: Duration,
    failure_rate: f64,
    variation: f64,
    base_metrics: [f64; METRIC_SLOTS],
    dataset: Vec<TableRow>,
}

impl MockDataSource<StdRng> {
    /// Seeded from config when it carries a seed, from entropy otherwise
    pub fn from_config(config: &DashboardConfig) -> Self {
        match config.mock.seed {
            Some(seed) => Self::seeded(config, seed),
            None => Self::with_rng(config, StdRng::from_entropy()),
        }
    }

    pub fn seeded(config: &DashboardConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> MockDataSource<R> {
    pub fn with_rng(config: &DashboardConfig, rng: R) -> Self {
        let base_metrics =
            std::array::from_fn(|i| config.metrics.get(i).map(|slot| slot.base).unwrap_or_default());

        MockDataSource {
            rng: Mutex::new(rng),
            latency: config.timing.latency(),
            failure_rate: config.mock.failure_rate,
            variation: config.mock.variation,
            base_metrics,
            dataset: default_dataset(),
        }
    }

    /// Replace the in-memory rows the source filters from
    pub fn with_dataset(mut self, dataset: Vec<TableRow>) -> Self {
        self.dataset = dataset;
        self
    }

    pub fn dataset(&self) -> &[TableRow] {
        &self.dataset
    }

    /// Build the response and roll for failure, without the simulated delay.
    pub fn synthesize(&self, criteria: &FilterCriteria) -> Result<FetchResult, TransientError> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let values = std::array::from_fn(|i| perturb(self.base_metrics[i], self.variation, &mut *rng));
        let result = FetchResult {
            metrics: MetricSnapshot::new(values),
            rows: filter_rows(&self.dataset, criteria),
        };

        if rng.gen::<f64>() < self.failure_rate {
            log::debug!("Mock data source injecting a transient failure");
            return Err(TransientError::network());
        }

        Ok(result)
    }
}

impl<R: Rng + Send> DataSource for MockDataSource<R> {
    fn fetch(
        &self,
        criteria: &FilterCriteria,
    ) -> impl Future<Output = Result<FetchResult, TransientError>> + Send {
        async move {
            log::debug!("Mock fetch for {:?}, resolving in {:?}", criteria, self.latency);
            tokio::time::sleep(self.latency).await;
            self.synthesize(criteria)
        }
    }
}

// ============================================================================
// SYNTHESIS HELPERS
// ============================================================================

/// Apply a uniform relative change in [-variation, +variation) and round.
pub fn perturb<R: Rng + ?Sized>(base: f64, variation: f64, rng: &mut R) -> i64 {
    let change = (rng.gen::<f64>() - 0.5) * 2.0 * variation;
    (base * (1.0 + change)).round() as i64
}

/// Rows whose category contains the house filter, case-insensitively.
/// No house filter keeps every row.
pub fn filter_rows(rows: &[TableRow], criteria: &FilterCriteria) -> Vec<TableRow> {
    match criteria.house_filter() {
        Some(house) => {
            let needle = house.to_lowercase();
            rows.iter()
                .filter(|row| row.category.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        }
        None => rows.to_vec(),
    }
}

fn row(id: &str, name: &str, house: &str, (y, m, d): (i32, u32, u32), amount: f64, status: &str) -> Option<TableRow> {
    let Some(date) = NaiveDate::from_ymd_opt(y, m, d) else {
        log::warn!("Skipping dataset row {}: invalid date {}-{}-{}", id, y, m, d);
        return None;
    };
    Some(TableRow::new(id, name, house, date, amount, status))
}

pub fn default_dataset() -> Vec<TableRow> {
    [
        row("#001", "Harry Potter", "Gryffindor", (2024, 3, 15), 1250.0, "Active"),
        row("#002", "Hermione Granger", "Gryffindor", (2024, 3, 14), 2100.0, "Completed"),
        row("#003", "Ron Weasley", "Gryffindor", (2024, 3, 12), 480.5, "Pending"),
        row("#004", "Draco Malfoy", "Slytherin", (2024, 3, 13), 3200.0, "Active"),
        row("#005", "Pansy Parkinson", "Slytherin", (2024, 3, 8), 760.0, "Inactive"),
        row("#006", "Luna Lovegood", "Ravenclaw", (2024, 3, 11), 890.25, "Completed"),
        row("#007", "Cho Chang", "Ravenclaw", (2024, 3, 6), 1430.0, "Active"),
        row("#008", "Cedric Diggory", "Hufflepuff", (2024, 3, 10), 1675.0, "Completed"),
        row("#009", "Hannah Abbott", "Hufflepuff", (2024, 3, 4), 320.0, "Pending"),
        row("#010", "Neville Longbottom", "Gryffindor", (2024, 3, 2), 940.0, "Active"),
        row("#011", "Gregory Goyle", "Slytherin", (2024, 2, 28), 210.0, "Inactive"),
        row("#012", "Padma Patil", "Ravenclaw", (2024, 2, 26), 1150.0, "Pending"),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(failure_rate: f64) -> DashboardConfig {
        let mut config = DashboardConfig::default();
        config.mock.failure_rate = failure_rate;
        config
    }

    fn two_house_dataset() -> Vec<TableRow> {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        vec![
            TableRow::new("#001", "Harry Potter", "Gryffindor", date, 1250.0, "Active"),
            TableRow::new("#004", "Draco Malfoy", "Slytherin", date, 3200.0, "Active"),
        ]
    }

    #[test]
    fn test_perturb_stays_within_fifteen_percent() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..10_000 {
            let value = perturb(1247.0, 0.15, &mut rng);
            assert!((1060..=1434).contains(&value), "out of range: {}", value);
        }
    }

    #[test]
    fn test_perturb_without_variation_only_rounds() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(perturb(18.3, 0.0, &mut rng), 18);
        assert_eq!(perturb(4.8, 0.0, &mut rng), 5);
    }

    #[test]
    fn test_filter_rows_case_insensitive_substring() {
        let rows = two_house_dataset();
        let criteria = FilterCriteria::new(None, None, Some("gryff"));

        let filtered = filter_rows(&rows, &criteria);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].category, "Gryffindor");
    }

    #[test]
    fn test_filter_rows_without_house_returns_everything() {
        let rows = two_house_dataset();
        assert_eq!(filter_rows(&rows, &FilterCriteria::default()), rows);
    }

    #[test]
    fn test_filter_rows_no_fuzzy_matching() {
        let rows = two_house_dataset();
        let criteria = FilterCriteria::new(None, None, Some("gryfindor"));
        assert!(filter_rows(&rows, &criteria).is_empty());
    }

    #[test]
    fn test_dataset_row_rejects_invalid_date() {
        assert!(row("#099", "Nearly Headless Nick", "Gryffindor", (2024, 2, 30), 0.0, "Active").is_none());
        assert!(row("#099", "Nearly Headless Nick", "Gryffindor", (2024, 2, 29), 0.0, "Active").is_some());
    }

    #[test]
    fn test_default_dataset_covers_all_houses() {
        let dataset = default_dataset();
        assert_eq!(dataset.len(), 12);

        for house in ["Gryffindor", "Slytherin", "Ravenclaw", "Hufflepuff"] {
            assert!(dataset.iter().any(|r| r.category == house), "missing {}", house);
        }
    }

    #[test]
    fn test_failure_rate_converges() {
        let source = MockDataSource::seeded(&DashboardConfig::default(), 2024);
        let criteria = FilterCriteria::default();

        let failures = (0..1000)
            .filter(|_| source.synthesize(&criteria).is_err())
            .count();

        // 5% of 1000 with a generous sampling margin
        assert!((20..=80).contains(&failures), "failures: {}", failures);
    }

    #[test]
    fn test_failure_rate_extremes() {
        let criteria = FilterCriteria::default();

        let never = MockDataSource::seeded(&config_with(0.0), 3);
        assert!((0..200).all(|_| never.synthesize(&criteria).is_ok()));

        let always = MockDataSource::seeded(&config_with(1.0), 3);
        assert!((0..200).all(|_| always.synthesize(&criteria).is_err()));
    }

    #[test]
    fn test_same_seed_same_results() {
        let config = config_with(0.0);
        let a = MockDataSource::seeded(&config, 99);
        let b = MockDataSource::seeded(&config, 99);
        let criteria = FilterCriteria::default();

        assert_eq!(a.synthesize(&criteria), b.synthesize(&criteria));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_waits_for_latency() {
        let source = MockDataSource::seeded(&config_with(0.0), 11).with_dataset(two_house_dataset());
        let criteria = FilterCriteria::new(None, None, Some("SLYTHERIN"));

        let started = tokio::time::Instant::now();
        let result = source.fetch(&criteria).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].name, "Draco Malfoy");

        let bases = DashboardConfig::default().base_metrics();
        for (value, base) in result.metrics.iter().zip(bases) {
            let low = (base * 0.85).round() as i64;
            let high = (base * 1.15).round() as i64;
            assert!(value >= low && value <= high, "{} outside [{}, {}]", value, low, high);
        }
    }
}
