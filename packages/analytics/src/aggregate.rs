//! Classification dashboard.

use std::collections::{BTreeMap, BTreeSet};

use alerta_analytics_models::{
    AnalyticsSummary, ConfidenceDistribution, ConfidenceFacet, ImpactFacet, KeywordCount,
    NotificationFacet, NotificationReasons, Period, ProcessingFacet, ReclassificationFacet,
    UrgencyComparison, UrgencyCounts,
};
use alerta_classifier::{HIGH_THRESHOLD, keywords, urgency_for_score};
use alerta_report_models::{Classification, Report, ReportStatus, Sector, Urgency};
use chrono::{DateTime, Utc};

use crate::{hours_between, mean, minutes_between, percent, round_to};

/// Number of entries in the keyword ranking.
pub const TOP_KEYWORDS: usize = 10;

/// Durations at or beyond this many minutes are excluded from the
/// processing and notification averages.
const PIPELINE_OUTLIER_MINUTES: f64 = 30.0;

/// Resolution times at or beyond this many hours are excluded from the
/// response comparison.
const RESOLUTION_OUTLIER_HOURS: f64 = 72.0;

/// A report in scope together with its classification.
type Classified<'a> = (&'a Report, Classification);

/// Computes the analytics envelope for reports filed within `period`
/// (ending at `now`), optionally restricted to one sector.
///
/// Facets other than throughput are computed over the auto-classified
/// reports in scope.
#[must_use]
pub fn aggregate(
    reports: &[Report],
    period: Period,
    sector: Option<Sector>,
    now: DateTime<Utc>,
) -> AnalyticsSummary {
    let start = period.start(now);
    let in_scope: Vec<&Report> = reports
        .iter()
        .filter(|r| r.created_at >= start && sector.is_none_or(|s| r.sector == s))
        .collect();

    let classified: Vec<Classified<'_>> = in_scope
        .iter()
        .filter(|r| r.is_auto_classified)
        .filter_map(|r| r.classification.map(|c| (*r, c)))
        .collect();

    log::debug!(
        "Aggregating {} report(s) ({} classified) for period {period}",
        in_scope.len(),
        classified.len()
    );

    let reclassification = reclassification(&classified);
    let notified: Vec<&Classified<'_>> = classified
        .iter()
        .filter(|(r, _)| r.notification_sent())
        .collect();

    AnalyticsSummary {
        period,
        sector,
        date_range: period.range(now),
        processing: processing(in_scope.len(), &classified),
        classification: confidence(&classified),
        urgency_comparison: urgency_comparison(&classified),
        notifications: notifications(&notified, classified.len()),
        top_keywords: top_keywords(&classified),
        impact: ImpactFacet {
            reports_prioritized: reclassification.elevated,
            authorities_notified: notified
                .iter()
                .filter_map(|(r, _)| r.assigned_to.as_deref())
                .collect::<BTreeSet<_>>()
                .len(),
            avg_response_improvement: response_improvement(&classified),
        },
        reclassification,
    }
}

fn processing(total: usize, classified: &[Classified<'_>]) -> ProcessingFacet {
    let times: Vec<f64> = classified
        .iter()
        .map(|(r, _)| minutes_between(r.created_at, r.updated_at))
        .filter(|m| *m > 0.0 && *m < PIPELINE_OUTLIER_MINUTES)
        .collect();

    ProcessingFacet {
        total_reports: total,
        auto_classified: classified.len(),
        pending_classification: total - classified.len(),
        processing_rate: percent(classified.len(), total, 1),
        avg_processing_minutes: round_to(mean(&times), 1),
    }
}

fn confidence(classified: &[Classified<'_>]) -> ConfidenceFacet {
    let scores: Vec<f64> = classified.iter().map(|(_, c)| c.score).collect();
    let mut distribution = ConfidenceDistribution::default();
    for score in &scores {
        match urgency_for_score(*score) {
            Urgency::High => distribution.high += 1,
            Urgency::Medium => distribution.medium += 1,
            Urgency::Low => distribution.low += 1,
        }
    }

    ConfidenceFacet {
        avg_score: round_to(mean(&scores), 2),
        distribution,
    }
}

fn reclassification(classified: &[Classified<'_>]) -> ReclassificationFacet {
    let mut facet = ReclassificationFacet::default();

    for (report, c) in classified {
        let declared = report.declared_urgency;
        if c.urgency == declared {
            continue;
        }
        facet.total_reclassified += 1;
        if c.urgency.level() > declared.level() {
            facet.elevated += 1;
        } else {
            facet.reduced += 1;
        }
        *facet
            .transitions
            .entry(format!("{declared}_to_{}", c.urgency))
            .or_default() += 1;
    }

    facet.reclassification_rate = percent(facet.total_reclassified, classified.len(), 1);
    facet.elevation_rate = percent(facet.elevated, facet.total_reclassified, 1);
    facet
}

fn urgency_comparison(classified: &[Classified<'_>]) -> UrgencyComparison {
    let declared: UrgencyCounts = classified.iter().map(|(r, _)| r.declared_urgency).collect();
    let after: UrgencyCounts = classified.iter().map(|(_, c)| c.urgency).collect();

    UrgencyComparison {
        high_impact: high_impact_message(
            declared.get(Urgency::High),
            after.get(Urgency::High),
        ),
        declared,
        classified: after,
    }
}

/// Describes how classification changed the HIGH bucket.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn high_impact_message(declared_high: usize, classified_high: usize) -> String {
    if declared_high > 0 {
        let change =
            (classified_high as f64 - declared_high as f64) / declared_high as f64 * 100.0;
        let whole = change.trunc() as i64;
        if change > 0.0 {
            format!("+{whole}% more HIGH urgencies detected by classification")
        } else {
            format!("{whole}% change in HIGH urgencies")
        }
    } else if classified_high > 0 {
        format!("{classified_high} HIGH urgencies detected by classification")
    } else {
        "No HIGH urgencies in the period".to_string()
    }
}

fn notifications(notified: &[&Classified<'_>], classified: usize) -> NotificationFacet {
    let mut by_reason = NotificationReasons::default();
    for (_, c) in notified {
        if c.urgency == Urgency::High {
            by_reason.high_urgency += 1;
        } else if c.score >= HIGH_THRESHOLD {
            by_reason.high_confidence += 1;
        }
    }

    let times: Vec<f64> = notified
        .iter()
        .filter_map(|(r, _)| {
            r.notification_sent_at
                .map(|sent| minutes_between(r.created_at, sent))
        })
        .filter(|m| *m > 0.0 && *m < PIPELINE_OUTLIER_MINUTES)
        .collect();

    NotificationFacet {
        total_sent: notified.len(),
        notification_rate: percent(notified.len(), classified, 1),
        by_reason,
        avg_notification_minutes: round_to(mean(&times), 1),
    }
}

/// Ranks risk keywords by the number of descriptions containing them.
/// Ties keep keyword-table order.
fn top_keywords(classified: &[Classified<'_>]) -> Vec<KeywordCount> {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for (report, _) in classified {
        for (keyword, _) in keywords::matched_keywords(&report.description) {
            *counts.entry(keyword).or_default() += 1;
        }
    }

    let mut ranked: Vec<KeywordCount> = keywords::all_keywords()
        .filter_map(|(keyword, tier)| {
            counts.get(keyword).map(|count| KeywordCount {
                keyword: keyword.to_string(),
                count: *count,
                risk_level: tier.to_string(),
            })
        })
        .collect();

    // Stable sort preserves table order among equal counts.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(TOP_KEYWORDS);
    ranked
}

/// Compares mean resolution time of high-confidence reports against the
/// rest. Reported only when high-confidence reports resolve faster.
#[allow(clippy::cast_possible_truncation)]
fn response_improvement(classified: &[Classified<'_>]) -> String {
    let resolution_hours = |high_confidence: bool| -> Vec<f64> {
        classified
            .iter()
            .filter(|(r, c)| {
                r.status == ReportStatus::Resolved && (c.score >= HIGH_THRESHOLD) == high_confidence
            })
            .filter_map(|(r, _)| r.resolved_at.map(|at| hours_between(r.created_at, at)))
            .filter(|h| *h > 0.0 && *h < RESOLUTION_OUTLIER_HOURS)
            .collect()
    };

    let high = resolution_hours(true);
    let low = resolution_hours(false);
    if high.is_empty() || low.is_empty() {
        return "N/A".to_string();
    }

    let avg_low = mean(&low);
    let improvement = (avg_low - mean(&high)) / avg_low * 100.0;
    if improvement > 0.0 {
        format!("{}%", improvement.trunc() as i64)
    } else {
        "N/A".to_string()
    }
}
