// 📦 Data Model
// Transient values recreated on every filter submission; nothing here is persisted.

use crate::config::METRIC_SLOTS;
use crate::error::ValidationError;
use crate::format::{format_currency, format_date};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// ============================================================================
// FILTER CRITERIA
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    #[serde(alias = "dateFrom")]
    pub date_from: Option<NaiveDate>,
    #[serde(alias = "dateTo")]
    pub date_to: Option<NaiveDate>,
    pub house: Option<String>,
}

impl FilterCriteria {
    pub fn new(date_from: Option<NaiveDate>, date_to: Option<NaiveDate>, house: Option<&str>) -> Self {
        FilterCriteria {
            date_from,
            date_to,
            house: house.map(|h| h.to_string()),
        }
    }

    /// First day of the current month up to today, no house
    pub fn month_to_date(today: NaiveDate) -> Self {
        FilterCriteria {
            date_from: today.with_day(1),
            date_to: Some(today),
            house: None,
        }
    }

    /// Reject a range whose start is after its end. Open ranges always pass.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.date_from, self.date_to) {
            (Some(date_from), Some(date_to)) if date_from > date_to => {
                Err(ValidationError { date_from, date_to })
            }
            _ => Ok(()),
        }
    }

    /// House filter, ignoring blank input
    pub fn house_filter(&self) -> Option<&str> {
        self.house
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }
}

// ============================================================================
// METRIC SNAPSHOT
// ============================================================================

/// Eight KPI values, replaced as a whole on every successful fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSnapshot([i64; METRIC_SLOTS]);

impl MetricSnapshot {
    pub fn new(values: [i64; METRIC_SLOTS]) -> Self {
        MetricSnapshot(values)
    }

    pub fn values(&self) -> &[i64; METRIC_SLOTS] {
        &self.0
    }

    pub fn get(&self, slot: usize) -> Option<i64> {
        self.0.get(slot).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }
}

// ============================================================================
// TABLE ROWS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub id: String,
    pub name: String,
    pub category: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub status: String,
}

impl TableRow {
    pub fn new(id: &str, name: &str, category: &str, date: NaiveDate, amount: f64, status: &str) -> Self {
        TableRow {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            date,
            amount,
            status: status.to_string(),
        }
    }

    /// Columns as shown: id, name, house, date, amount, status
    pub fn display_cells(&self) -> [String; 6] {
        [
            self.id.clone(),
            self.name.clone(),
            self.category.clone(),
            format_date(&self.date),
            format_currency(self.amount),
            self.status.clone(),
        ]
    }

    /// Case-insensitive match of `query` against any displayed column
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }

        self.display_cells()
            .iter()
            .any(|cell| cell.to_lowercase().contains(&query))
    }

    pub fn category_color(&self) -> BadgeColor {
        house_badge_color(&self.category)
    }

    pub fn status_color(&self) -> BadgeColor {
        status_badge_color(&self.status)
    }
}

// ============================================================================
// BADGES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeColor {
    Danger,
    Success,
    Info,
    Warning,
    Primary,
    Secondary,
}

pub fn house_badge_color(house: &str) -> BadgeColor {
    match house {
        "Gryffindor" => BadgeColor::Danger,
        "Slytherin" => BadgeColor::Success,
        "Ravenclaw" => BadgeColor::Info,
        "Hufflepuff" => BadgeColor::Warning,
        _ => BadgeColor::Secondary,
    }
}

pub fn status_badge_color(status: &str) -> BadgeColor {
    match status {
        "Active" => BadgeColor::Success,
        "Completed" => BadgeColor::Primary,
        "Pending" => BadgeColor::Warning,
        "Inactive" => BadgeColor::Secondary,
        _ => BadgeColor::Secondary,
    }
}

// ============================================================================
// FETCH RESULT
// ============================================================================

/// Metrics and rows produced together by a single fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub metrics: MetricSnapshot,
    pub rows: Vec<TableRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let criteria = FilterCriteria::new(Some(date(2024, 3, 31)), Some(date(2024, 3, 1)), None);
        let err = criteria.validate().unwrap_err();

        assert_eq!(err.date_from, date(2024, 3, 31));
        assert_eq!(err.date_to, date(2024, 3, 1));
    }

    #[test]
    fn test_validate_accepts_open_and_equal_ranges() {
        assert!(FilterCriteria::default().validate().is_ok());
        assert!(FilterCriteria::new(Some(date(2024, 3, 31)), None, None).validate().is_ok());
        assert!(FilterCriteria::new(None, Some(date(2024, 3, 1)), None).validate().is_ok());
        assert!(FilterCriteria::new(Some(date(2024, 3, 5)), Some(date(2024, 3, 5)), None)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_month_to_date() {
        let criteria = FilterCriteria::month_to_date(date(2026, 10, 19));

        assert_eq!(criteria.date_from, Some(date(2026, 10, 1)));
        assert_eq!(criteria.date_to, Some(date(2026, 10, 19)));
        assert_eq!(criteria.house, None);
    }

    #[test]
    fn test_blank_house_is_unset() {
        let criteria = FilterCriteria::new(None, None, Some("   "));
        assert_eq!(criteria.house_filter(), None);

        let criteria = FilterCriteria::new(None, None, Some(" gryff "));
        assert_eq!(criteria.house_filter(), Some("gryff"));
    }

    #[test]
    fn test_criteria_accepts_camel_case_json() {
        let json = r#"{ "dateFrom": "2024-03-01", "dateTo": "2024-03-31", "house": "Gryffindor" }"#;
        let criteria: FilterCriteria = serde_json::from_str(json).unwrap();

        assert_eq!(criteria.date_from, Some(date(2024, 3, 1)));
        assert_eq!(criteria.date_to, Some(date(2024, 3, 31)));
        assert_eq!(criteria.house.as_deref(), Some("Gryffindor"));
    }

    #[test]
    fn test_badge_colors_fall_back_to_secondary() {
        assert_eq!(house_badge_color("Gryffindor"), BadgeColor::Danger);
        assert_eq!(house_badge_color("Hufflepuff"), BadgeColor::Warning);
        assert_eq!(house_badge_color("Durmstrang"), BadgeColor::Secondary);
        assert_eq!(status_badge_color("Completed"), BadgeColor::Primary);
        assert_eq!(status_badge_color("Archived"), BadgeColor::Secondary);
    }

    #[test]
    fn test_row_display_and_search() {
        let row = TableRow::new("#001", "Harry Potter", "Gryffindor", date(2024, 3, 15), 1250.0, "Active");

        assert_eq!(
            row.display_cells(),
            [
                "#001".to_string(),
                "Harry Potter".to_string(),
                "Gryffindor".to_string(),
                "15/03/2024".to_string(),
                "R$ 1.250,00".to_string(),
                "Active".to_string(),
            ]
        );
        assert!(row.matches_search("potter"));
        assert!(row.matches_search("15/03"));
        assert!(row.matches_search(""));
        assert!(!row.matches_search("slytherin"));
    }
}
