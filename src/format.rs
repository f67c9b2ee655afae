// 🔤 Display Formatting - fixed pt-BR locale
// Metric card values, currency amounts and dates as the dashboard shows them.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ============================================================================
// METRIC FORMATS
// ============================================================================

/// How a metric card renders its raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricFormat {
    /// Raw count with thousands separators: 1.247
    Count,
    /// Currency in thousands: R$ 847K
    CurrencyThousands,
    /// Percentage with one decimal: 18.0%
    Percent,
    /// Plain thousands with one decimal: 45.2K
    Thousands,
    /// Number with one decimal: 4.0
    Decimal,
    /// Seconds as minutes and seconds: 3m 42s
    Duration,
    /// Whole percentage: 94%
    WholePercent,
}

pub fn format_metric(value: i64, format: MetricFormat) -> String {
    match format {
        MetricFormat::Count => group_thousands(value),
        MetricFormat::CurrencyThousands => {
            format!("R$ {}K", (value as f64 / 1000.0).round() as i64)
        }
        MetricFormat::Percent => format!("{:.1}%", value as f64),
        MetricFormat::Thousands => format!("{:.1}K", value as f64 / 1000.0),
        MetricFormat::Decimal => format!("{:.1}", value as f64),
        MetricFormat::Duration => {
            let minutes = value.div_euclid(60);
            let seconds = value.rem_euclid(60);
            format!("{}m {}s", minutes, seconds)
        }
        MetricFormat::WholePercent => format!("{}%", value),
    }
}

// ============================================================================
// NUMBERS, CURRENCY, DATES
// ============================================================================

/// Group digits with '.' the way pt-BR does: 847000 -> "847.000"
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Brazilian real with two decimals: 1250.0 -> "R$ 1.250,00"
pub fn format_currency(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let whole = group_thousands((cents / 100).abs());
    let fraction = (cents % 100).abs();

    if cents < 0 {
        format!("-R$ {},{:02}", whole, fraction)
    } else {
        format!("R$ {},{:02}", whole, fraction)
    }
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Clock text for the status bar.
pub fn format_timestamp(dt: &NaiveDateTime) -> String {
    dt.format("%d/%m/%Y, %H:%M:%S").to_string()
}
