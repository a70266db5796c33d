//! Data models for Searchlight.
//!
//! The central types are [`DailySample`] (one day of Search-Console-derived
//! metrics), [`PeriodSummary`] (the aggregated month with period-over-period
//! deltas), and [`InsightsBundle`] (the rule-engine output rendered to
//! clients).
//!
//! Wire naming follows the dashboard frontend's JSON contract
//! (`overall_analysis`, `next_month_clicks`, `expected_ctr`, ...), so the
//! serialized shapes are stable across regenerations.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One day of search performance metrics within a report window.
///
/// `ctr` is the click-through rate as a ratio in `[0, 1]`, not a percentage.
/// When a day had zero impressions the upstream exporter reports `ctr = 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySample {
    /// Calendar date of the sample (ISO `YYYY-MM-DD`).
    pub date: NaiveDate,

    /// Clicks recorded on this day.
    pub clicks: u64,

    /// Impressions recorded on this day. Always >= clicks for a valid sample.
    pub impressions: u64,

    /// Click-through rate for the day, in `[0, 1]`.
    pub ctr: f64,

    /// Average ranking position for the day. Positive; 1.0 is the top result.
    pub position: f64,
}

/// Aggregated metrics for one report window, plus period-over-period deltas.
///
/// Delta fields are `None` when no comparison is available (no prior period
/// stored, or the prior base value was zero). Absence is semantically
/// distinct from a `0.0` change and is preserved on the wire by omitting the
/// field entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    /// Sum of clicks over the window.
    pub total_clicks: u64,

    /// Sum of impressions over the window.
    pub total_impressions: u64,

    /// `total_clicks / total_impressions`, or exactly `0.0` when the window
    /// had no impressions.
    pub average_ctr: f64,

    /// Unweighted mean of the per-day positions.
    pub average_position: f64,

    /// Month-over-month clicks change, in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mom_clicks_change: Option<f64>,

    /// Month-over-month impressions change, in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mom_impressions_change: Option<f64>,

    /// Month-over-month CTR change, in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mom_ctr_change: Option<f64>,

    /// Year-over-year clicks change, in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yoy_clicks_change: Option<f64>,

    /// Year-over-year impressions change, in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yoy_impressions_change: Option<f64>,

    /// Year-over-year CTR change, in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yoy_ctr_change: Option<f64>,
}

/// A report month, serialized as the lexicographic `"YYYY-MM"` string.
///
/// Reports are keyed by `(client_id, report_id)` and the string form sorts
/// chronologically, which the archive listing relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportId {
    year: i32,
    month: u32,
}

impl ReportId {
    /// Build a report id from a year and a 1-based month.
    ///
    /// Returns `None` for months outside `1..=12` or non-positive years.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) && year > 0 {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The calendar month immediately preceding this one, rolling the year
    /// back across the January boundary.
    pub fn prior_month(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// The same calendar month, one year earlier.
    pub fn prior_year(&self) -> Self {
        Self {
            year: self.year - 1,
            month: self.month,
        }
    }

    /// The prior report id for the given comparison kind.
    pub fn prior(&self, kind: ComparisonKind) -> Self {
        match kind {
            ComparisonKind::MonthOverMonth => self.prior_month(),
            ComparisonKind::YearOverYear => self.prior_year(),
        }
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Error returned when parsing a malformed `"YYYY-MM"` report id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid report id '{0}', expected YYYY-MM")]
pub struct ParseReportIdError(pub String);

impl FromStr for ReportId {
    type Err = ParseReportIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseReportIdError(s.to_string());

        let (year_str, month_str) = s.split_once('-').ok_or_else(err)?;
        if year_str.len() != 4 || month_str.len() != 2 {
            return Err(err());
        }

        let year: i32 = year_str.parse().map_err(|_| err())?;
        let month: u32 = month_str.parse().map_err(|_| err())?;

        ReportId::new(year, month).ok_or_else(err)
    }
}

impl Serialize for ReportId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReportId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Which prior period a delta is computed against.
///
/// An explicit enumeration rather than a runtime field-name key, so the
/// MoM/YoY selection is always a two-branch match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonKind {
    /// Compare against the immediately preceding calendar month.
    MonthOverMonth,
    /// Compare against the same month one year earlier.
    YearOverYear,
}

/// A registered reporting client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientProfile {
    /// Stable client identifier used in report keys and URLs.
    pub client_id: String,

    /// Display name shown on reports.
    pub company_name: String,

    /// Primary contact address.
    pub contact_email: String,
}

// ============================================================================
// Insight types
// ============================================================================

/// Severity of a single keyed insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A metric materially outperformed its baseline.
    Success,
    /// A metric is below a benchmark and worth attention.
    Warning,
    /// A metric crossed a threshold that demands action.
    Critical,
    /// Neutral observation.
    Info,
}

/// Priority of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Direction of a metric trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
}

/// Qualitative status of a metric trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStatus {
    Good,
    Bad,
    Neutral,
    NeedsImprovement,
}

/// Confidence label attached to the forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// A single categorized observation derived from a threshold rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub severity: Severity,

    /// The metric the insight refers to ("CTR", "Position", "Clicks").
    pub metric: String,

    /// Human-readable message shown to the client.
    pub message: String,
}

/// A prioritized recommendation with expected impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub category: String,
    pub action: String,
    pub expected_impact: String,
}

/// Simple next-month forecast via fixed linear extrapolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub next_month_clicks: u64,
    pub next_month_impressions: u64,
    pub expected_ctr: f64,
    pub confidence: Confidence,
}

/// Trend entry for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTrend {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<TrendDirection>,

    /// Period-over-period change in percent, when a comparison exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,

    /// Current value of the metric, for metrics judged on level rather than
    /// movement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,

    pub status: TrendStatus,
}

/// Per-metric trend entries for the four dashboard KPIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTrends {
    pub clicks: MetricTrend,
    pub impressions: MetricTrend,
    pub ctr: MetricTrend,
    pub position: MetricTrend,
}

/// The full rule-engine output for one report.
///
/// A pure function of the [`PeriodSummary`] it was generated from:
/// regenerating from the same summary yields an identical bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsBundle {
    pub overall_analysis: String,
    pub key_insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
    pub predictions: Prediction,
    pub priority_actions: Vec<String>,
    pub metric_trends: MetricTrends,
}

/// An insights bundle as persisted: payload plus generation metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredInsights {
    pub client_id: String,
    pub report_id: ReportId,

    /// Bundle format version. Currently always `"1.0"`.
    pub version: String,

    /// Server-assigned generation timestamp (UTC).
    pub generated_at: DateTime<Utc>,

    pub insights: InsightsBundle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_id_parse_and_display() {
        let id: ReportId = "2025-10".parse().unwrap();
        assert_eq!(id.year(), 2025);
        assert_eq!(id.month(), 10);
        assert_eq!(id.to_string(), "2025-10");
    }

    #[test]
    fn test_report_id_rejects_malformed() {
        assert!("2025".parse::<ReportId>().is_err());
        assert!("2025-13".parse::<ReportId>().is_err());
        assert!("2025-00".parse::<ReportId>().is_err());
        assert!("25-10".parse::<ReportId>().is_err());
        assert!("2025-1".parse::<ReportId>().is_err());
        assert!("2025-10-01".parse::<ReportId>().is_err());
    }

    #[test]
    fn test_prior_month_rollover() {
        let january: ReportId = "2025-01".parse().unwrap();
        assert_eq!(january.prior_month().to_string(), "2024-12");

        let october: ReportId = "2025-10".parse().unwrap();
        assert_eq!(october.prior_month().to_string(), "2025-09");
    }

    #[test]
    fn test_prior_year() {
        let id: ReportId = "2025-10".parse().unwrap();
        assert_eq!(id.prior_year().to_string(), "2024-10");
        assert_eq!(id.prior(ComparisonKind::YearOverYear), id.prior_year());
        assert_eq!(id.prior(ComparisonKind::MonthOverMonth), id.prior_month());
    }

    #[test]
    fn test_report_id_serde_roundtrip() {
        let id: ReportId = "2024-02".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"2024-02\"");

        let back: ReportId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_absent_deltas_are_omitted_on_the_wire() {
        let summary = PeriodSummary {
            total_clicks: 10,
            total_impressions: 100,
            average_ctr: 0.1,
            average_position: 5.0,
            mom_clicks_change: None,
            mom_impressions_change: None,
            mom_ctr_change: None,
            yoy_clicks_change: None,
            yoy_impressions_change: None,
            yoy_ctr_change: None,
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("mom_clicks_change").is_none());
        assert!(json.get("yoy_ctr_change").is_none());
    }

    #[test]
    fn test_trend_status_wire_labels() {
        assert_eq!(
            serde_json::to_string(&TrendStatus::NeedsImprovement).unwrap(),
            "\"needs_improvement\""
        );
        assert_eq!(
            serde_json::to_string(&TrendStatus::Good).unwrap(),
            "\"good\""
        );
        assert_eq!(
            serde_json::to_string(&Severity::Critical).unwrap(),
            "\"critical\""
        );
    }
}
