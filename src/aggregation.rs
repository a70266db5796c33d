//! Aggregation of daily samples into a period summary.
//!
//! [`aggregate`] is a pure, single-pass computation: it sums clicks and
//! impressions, derives the window-level CTR and average position, and
//! computes month-over-month / year-over-year deltas against whichever prior
//! summaries the caller supplies. Locating the matching prior periods is the
//! storage layer's job; this module only consumes them.

use thiserror::Error;

use crate::model::{DailySample, PeriodSummary};

/// Errors from aggregating a report window.
#[derive(Debug, Error)]
pub enum AggregationError {
    /// The sample window was empty. A zero-filled summary is never returned.
    #[error("report window contains no samples")]
    EmptyWindow,

    /// A sample failed validation. The whole batch is rejected rather than
    /// clamped or skipped.
    #[error("malformed sample on {date}: {reason}")]
    MalformedSample {
        date: chrono::NaiveDate,
        reason: String,
    },
}

/// Prior-period summaries available for delta computation.
///
/// Either side may be absent; the corresponding deltas are then omitted from
/// the result rather than reported as zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct PriorPeriods<'a> {
    /// Summary of the immediately preceding calendar month.
    pub month_over_month: Option<&'a PeriodSummary>,

    /// Summary of the same month one year earlier.
    pub year_over_year: Option<&'a PeriodSummary>,
}

/// Aggregate one report window of daily samples into a [`PeriodSummary`].
///
/// # Errors
///
/// [`AggregationError::EmptyWindow`] if `samples` is empty, and
/// [`AggregationError::MalformedSample`] if any sample has more clicks than
/// impressions, a CTR outside `[0, 1]`, or a non-finite or non-positive
/// position.
pub fn aggregate(
    samples: &[DailySample],
    priors: PriorPeriods<'_>,
) -> Result<PeriodSummary, AggregationError> {
    if samples.is_empty() {
        return Err(AggregationError::EmptyWindow);
    }

    for sample in samples {
        validate_sample(sample)?;
    }

    let total_clicks: u64 = samples.iter().map(|s| s.clicks).sum();
    let total_impressions: u64 = samples.iter().map(|s| s.impressions).sum();

    // Zero impressions is a defined case, not an error: CTR is 0 by definition.
    let average_ctr = if total_impressions > 0 {
        total_clicks as f64 / total_impressions as f64
    } else {
        0.0
    };

    // Unweighted mean across days, regardless of impression volume.
    let average_position =
        samples.iter().map(|s| s.position).sum::<f64>() / samples.len() as f64;

    let mom = priors.month_over_month;
    let yoy = priors.year_over_year;

    Ok(PeriodSummary {
        total_clicks,
        total_impressions,
        average_ctr,
        average_position,
        mom_clicks_change: mom.and_then(|p| pct_change(total_clicks as f64, p.total_clicks as f64)),
        mom_impressions_change: mom
            .and_then(|p| pct_change(total_impressions as f64, p.total_impressions as f64)),
        mom_ctr_change: mom.and_then(|p| pct_change(average_ctr, p.average_ctr)),
        yoy_clicks_change: yoy.and_then(|p| pct_change(total_clicks as f64, p.total_clicks as f64)),
        yoy_impressions_change: yoy
            .and_then(|p| pct_change(total_impressions as f64, p.total_impressions as f64)),
        yoy_ctr_change: yoy.and_then(|p| pct_change(average_ctr, p.average_ctr)),
    })
}

/// Percentage change of `current` over `prior`, or `None` when the prior base
/// is not positive (no meaningful comparison).
fn pct_change(current: f64, prior: f64) -> Option<f64> {
    if prior > 0.0 {
        Some((current - prior) / prior * 100.0)
    } else {
        None
    }
}

fn validate_sample(sample: &DailySample) -> Result<(), AggregationError> {
    if sample.impressions < sample.clicks {
        return Err(AggregationError::MalformedSample {
            date: sample.date,
            reason: format!(
                "impressions ({}) less than clicks ({})",
                sample.impressions, sample.clicks
            ),
        });
    }

    if !sample.ctr.is_finite() || !(0.0..=1.0).contains(&sample.ctr) {
        return Err(AggregationError::MalformedSample {
            date: sample.date,
            reason: format!("ctr {} outside [0, 1]", sample.ctr),
        });
    }

    if !sample.position.is_finite() || sample.position <= 0.0 {
        return Err(AggregationError::MalformedSample {
            date: sample.date,
            reason: format!("position {} is not positive", sample.position),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample(day: u32, clicks: u64, impressions: u64, position: f64) -> DailySample {
        let ctr = if impressions > 0 {
            clicks as f64 / impressions as f64
        } else {
            0.0
        };
        DailySample {
            date: NaiveDate::from_ymd_opt(2025, 7, day).unwrap(),
            clicks,
            impressions,
            ctr,
            position,
        }
    }

    fn no_priors() -> PriorPeriods<'static> {
        PriorPeriods::default()
    }

    #[test]
    fn test_empty_window_is_an_error() {
        let result = aggregate(&[], no_priors());
        assert!(matches!(result, Err(AggregationError::EmptyWindow)));
    }

    #[test]
    fn test_totals_and_averages() {
        let samples = vec![
            sample(1, 10, 1000, 8.0),
            sample(2, 20, 1000, 6.0),
            sample(3, 30, 2000, 4.0),
        ];

        let summary = aggregate(&samples, no_priors()).unwrap();

        assert_eq!(summary.total_clicks, 60);
        assert_eq!(summary.total_impressions, 4000);
        assert_eq!(summary.average_ctr, 60.0 / 4000.0);
        // Mean of positions, unweighted by impressions.
        assert_eq!(summary.average_position, 6.0);
    }

    #[test]
    fn test_zero_impressions_yields_zero_ctr() {
        let samples = vec![sample(1, 0, 0, 12.0), sample(2, 0, 0, 14.0)];

        let summary = aggregate(&samples, no_priors()).unwrap();

        assert_eq!(summary.total_impressions, 0);
        assert_eq!(summary.average_ctr, 0.0);
    }

    #[test]
    fn test_average_ctr_exact_at_boundary() {
        // 3000 / 150000 must come out at 0.02 exactly.
        let samples = vec![sample(1, 1500, 75000, 5.0), sample(2, 1500, 75000, 5.0)];

        let summary = aggregate(&samples, no_priors()).unwrap();

        assert_eq!(summary.total_clicks, 3000);
        assert_eq!(summary.total_impressions, 150000);
        assert_eq!(summary.average_ctr, 0.02);
    }

    #[test]
    fn test_malformed_sample_rejects_whole_batch() {
        let samples = vec![sample(1, 10, 1000, 5.0), sample(2, 50, 40, 5.0)];

        let result = aggregate(&samples, no_priors());

        match result {
            Err(AggregationError::MalformedSample { date, .. }) => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2025, 7, 2).unwrap());
            }
            other => panic!("expected MalformedSample, got {other:?}"),
        }
    }

    #[test]
    fn test_nonpositive_position_is_malformed() {
        let samples = vec![sample(1, 1, 10, 0.0)];
        assert!(matches!(
            aggregate(&samples, no_priors()),
            Err(AggregationError::MalformedSample { .. })
        ));
    }

    #[test]
    fn test_deltas_absent_without_priors() {
        let summary = aggregate(&[sample(1, 100, 1000, 5.0)], no_priors()).unwrap();

        assert!(summary.mom_clicks_change.is_none());
        assert!(summary.mom_impressions_change.is_none());
        assert!(summary.yoy_clicks_change.is_none());
    }

    #[test]
    fn test_deltas_absent_when_prior_base_is_zero() {
        let prior = PeriodSummary {
            total_clicks: 0,
            total_impressions: 500,
            average_ctr: 0.0,
            average_position: 9.0,
            mom_clicks_change: None,
            mom_impressions_change: None,
            mom_ctr_change: None,
            yoy_clicks_change: None,
            yoy_impressions_change: None,
            yoy_ctr_change: None,
        };
        let priors = PriorPeriods {
            month_over_month: Some(&prior),
            year_over_year: None,
        };

        let summary = aggregate(&[sample(1, 100, 1000, 5.0)], priors).unwrap();

        // Prior clicks are zero: absent, not 0 or infinity.
        assert!(summary.mom_clicks_change.is_none());
        assert!(summary.mom_ctr_change.is_none());
        // Impressions had a positive base, so that delta exists.
        assert_eq!(summary.mom_impressions_change, Some(100.0));
    }

    #[test]
    fn test_mom_delta_twenty_percent() {
        let prior = PeriodSummary {
            total_clicks: 1000,
            total_impressions: 50000,
            average_ctr: 0.02,
            average_position: 8.0,
            mom_clicks_change: None,
            mom_impressions_change: None,
            mom_ctr_change: None,
            yoy_clicks_change: None,
            yoy_impressions_change: None,
            yoy_ctr_change: None,
        };
        let priors = PriorPeriods {
            month_over_month: Some(&prior),
            year_over_year: None,
        };

        let samples = vec![sample(1, 600, 25000, 7.0), sample(2, 600, 25000, 7.0)];
        let summary = aggregate(&samples, priors).unwrap();

        assert_eq!(summary.total_clicks, 1200);
        assert_eq!(summary.mom_clicks_change, Some(20.0));
        assert_eq!(summary.mom_impressions_change, Some(0.0));
    }

    #[test]
    fn test_yoy_deltas_independent_of_mom() {
        let yoy_prior = PeriodSummary {
            total_clicks: 800,
            total_impressions: 40000,
            average_ctr: 0.02,
            average_position: 10.0,
            mom_clicks_change: None,
            mom_impressions_change: None,
            mom_ctr_change: None,
            yoy_clicks_change: None,
            yoy_impressions_change: None,
            yoy_ctr_change: None,
        };
        let priors = PriorPeriods {
            month_over_month: None,
            year_over_year: Some(&yoy_prior),
        };

        let summary = aggregate(&[sample(1, 1000, 40000, 5.0)], priors).unwrap();

        assert!(summary.mom_clicks_change.is_none());
        assert_eq!(summary.yoy_clicks_change, Some(25.0));
        assert_eq!(summary.yoy_impressions_change, Some(0.0));
    }
}
