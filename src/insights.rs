//! Rule-based insight generation over a period summary.
//!
//! [`generate_insights`] evaluates a fixed set of threshold rules and
//! produces the analysis text, keyed insights, recommendations, forecast,
//! and metric trends shown on the client dashboard. The function is pure and
//! deterministic: the same summary always yields an identical bundle, so
//! regeneration is idempotent.
//!
//! The recommendation and priority-action lists are static content kept as
//! configuration tables, not derived from the data. The forecast is a fixed
//! linear extrapolation rather than a model; it is kept for behavioral
//! parity with the dashboard it replaces.

use crate::model::{
    Confidence, Insight, InsightsBundle, MetricTrend, MetricTrends, PeriodSummary, Prediction,
    Priority, Recommendation, Severity, TrendDirection, TrendStatus,
};

/// Bundle format version attached to every persisted insights record.
pub const INSIGHTS_VERSION: &str = "1.0";

/// MoM clicks change (percent) above which performance counts as strong.
const STRONG_GROWTH_PCT: f64 = 5.0;

/// MoM clicks change (percent) below which performance counts as declining.
const DECLINE_PCT: f64 = -5.0;

/// MoM clicks change (percent) above which the success insight fires.
const SUCCESS_GROWTH_PCT: f64 = 10.0;

/// CTR benchmark below which the warning insight fires.
const CTR_WARNING_THRESHOLD: f64 = 0.02;

/// CTR above which the trend status is "good".
const CTR_GOOD_THRESHOLD: f64 = 0.03;

/// Average position beyond which the critical insight fires (off page one).
const POSITION_CRITICAL_THRESHOLD: f64 = 10.0;

// Forecast multipliers. A placeholder extrapolation, not a model.
const CLICKS_FORECAST_FACTOR: f64 = 1.15;
const IMPRESSIONS_FORECAST_FACTOR: f64 = 1.08;
const CTR_FORECAST_FACTOR: f64 = 1.05;

/// Fixed placeholder for the impressions trend card.
const IMPRESSIONS_TREND_PCT: f64 = 8.5;

/// Static recommendation table: two high, two medium, one low, in display
/// order.
const RECOMMENDATIONS: &[(Priority, &str, &str, &str)] = &[
    (
        Priority::High,
        "Content Optimization",
        "Update meta titles and descriptions for your top 10 pages",
        "5-10% CTR improvement within a month",
    ),
    (
        Priority::High,
        "Technical SEO",
        "Fix crawl errors and improve page load speed",
        "Better rankings within 4-6 weeks",
    ),
    (
        Priority::Medium,
        "Content Creation",
        "Publish 2-3 new articles targeting long-tail keywords",
        "15-20% more impressions over 3 months",
    ),
    (
        Priority::Medium,
        "Link Building",
        "Reach out to 10 relevant sites for backlink opportunities",
        "Improved domain authority and rankings",
    ),
    (
        Priority::Low,
        "Schema Markup",
        "Add structured data to product and article pages",
        "Eligibility for rich results in search",
    ),
];

/// Static priority-action list, in display order.
const PRIORITY_ACTIONS: &[&str] = &[
    "Review and update meta descriptions for pages with high impressions but low CTR",
    "Improve content quality on pages ranking in positions 11-20",
    "Monitor Core Web Vitals and fix any failing metrics",
];

/// Generate the full insights bundle for a period summary.
///
/// All rules evaluate independently; none short-circuits another. In
/// particular a month with clicks growth above 10% produces both the
/// strong-performance analysis text and the success insight.
pub fn generate_insights(summary: &PeriodSummary) -> InsightsBundle {
    InsightsBundle {
        overall_analysis: overall_analysis(summary),
        key_insights: key_insights(summary),
        recommendations: recommendations(),
        predictions: predictions(summary),
        priority_actions: PRIORITY_ACTIONS.iter().map(|s| s.to_string()).collect(),
        metric_trends: metric_trends(summary),
    }
}

/// Rule 1: exactly one analysis branch fires. An absent MoM delta falls
/// through to the stable branch.
fn overall_analysis(summary: &PeriodSummary) -> String {
    match summary.mom_clicks_change {
        Some(change) if change > STRONG_GROWTH_PCT => format!(
            "Your SEO performance is strong this month, with clicks up {:.0}% \
             compared to the previous month. Keep building on what is working.",
            change.round()
        ),
        Some(change) if change < DECLINE_PCT => format!(
            "Your site saw declining performance this month, with clicks down {:.0}% \
             compared to the previous month. Review the recommendations below to \
             reverse the trend.",
            change.abs().round()
        ),
        _ => "Your SEO performance remained stable compared to the previous month. \
              Consistent visibility is a good base to grow from."
            .to_string(),
    }
}

fn key_insights(summary: &PeriodSummary) -> Vec<Insight> {
    let mut insights = Vec::new();

    // Rule 2: CTR below the 2% benchmark (strict).
    if summary.average_ctr < CTR_WARNING_THRESHOLD {
        insights.push(Insight {
            severity: Severity::Warning,
            metric: "CTR".to_string(),
            message: format!(
                "Your average CTR of {:.2}% is below the 2% benchmark. \
                 Stronger titles and meta descriptions could win more clicks \
                 from the impressions you already have.",
                summary.average_ctr * 100.0
            ),
        });
    }

    // Rule 3: average position off the first page (strict).
    if summary.average_position > POSITION_CRITICAL_THRESHOLD {
        insights.push(Insight {
            severity: Severity::Critical,
            metric: "Position".to_string(),
            message: format!(
                "Your average position of {:.1} is outside the top 10 results. \
                 Most searchers never scroll past the first page, so improving \
                 rankings should be the top priority.",
                summary.average_position
            ),
        });
    }

    // Rule 4: clicks growth above 10% (strict). Independent of rule 1.
    if let Some(change) = summary.mom_clicks_change {
        if change > SUCCESS_GROWTH_PCT {
            insights.push(Insight {
                severity: Severity::Success,
                metric: "Clicks".to_string(),
                message: format!(
                    "Clicks grew {:.0}% month-over-month, well ahead of typical \
                     growth. Recent optimizations are paying off.",
                    change.round()
                ),
            });
        }
    }

    insights
}

/// Rule 5: the static recommendation table, independent of summary values.
fn recommendations() -> Vec<Recommendation> {
    RECOMMENDATIONS
        .iter()
        .map(|(priority, category, action, expected_impact)| Recommendation {
            priority: *priority,
            category: category.to_string(),
            action: action.to_string(),
            expected_impact: expected_impact.to_string(),
        })
        .collect()
}

/// Rule 6: fixed-multiplier extrapolation with a fixed confidence label.
fn predictions(summary: &PeriodSummary) -> Prediction {
    Prediction {
        next_month_clicks: (summary.total_clicks as f64 * CLICKS_FORECAST_FACTOR).round() as u64,
        next_month_impressions: (summary.total_impressions as f64 * IMPRESSIONS_FORECAST_FACTOR)
            .round() as u64,
        expected_ctr: summary.average_ctr * CTR_FORECAST_FACTOR,
        confidence: Confidence::Medium,
    }
}

/// Rule 8: per-metric trend cards.
fn metric_trends(summary: &PeriodSummary) -> MetricTrends {
    // An absent MoM delta counts as zero change for direction and status;
    // the percentage itself stays omitted.
    let clicks_change = summary.mom_clicks_change.unwrap_or(0.0);

    let clicks = MetricTrend {
        direction: Some(if clicks_change > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        }),
        percentage: summary.mom_clicks_change,
        current: None,
        status: if clicks_change > STRONG_GROWTH_PCT {
            TrendStatus::Good
        } else if clicks_change < DECLINE_PCT {
            TrendStatus::Bad
        } else {
            TrendStatus::Neutral
        },
    };

    // Fixed placeholder card, not derived from data.
    let impressions = MetricTrend {
        direction: Some(TrendDirection::Increasing),
        percentage: Some(IMPRESSIONS_TREND_PCT),
        current: None,
        status: TrendStatus::Good,
    };

    let ctr = MetricTrend {
        direction: None,
        percentage: None,
        current: Some(summary.average_ctr),
        status: if summary.average_ctr > CTR_GOOD_THRESHOLD {
            TrendStatus::Good
        } else {
            TrendStatus::NeedsImprovement
        },
    };

    let position = MetricTrend {
        direction: None,
        percentage: None,
        current: Some(summary.average_position),
        status: if summary.average_position < POSITION_CRITICAL_THRESHOLD {
            TrendStatus::Good
        } else {
            TrendStatus::NeedsImprovement
        },
    };

    MetricTrends {
        clicks,
        impressions,
        ctr,
        position,
    }
}
