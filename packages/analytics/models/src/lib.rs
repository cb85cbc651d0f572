#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types for classification analytics and role statistics.
//!
//! Everything here is a plain serializable value; the computations live
//! in `alerta_analytics`.

use std::collections::BTreeMap;

use alerta_report_models::{ReportStatus, Sector, Urgency};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Reporting window, always ending at "now".
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Period {
    /// Since midnight UTC.
    Today,
    /// The last 7 days.
    #[default]
    Week,
    /// The last 30 days.
    Month,
    /// The last 365 days.
    Year,
}

impl Period {
    /// Parses a period name, falling back to [`Period::Week`] for missing
    /// or unknown values.
    #[must_use]
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value.and_then(|v| v.trim().parse().ok()).unwrap_or_default()
    }

    /// Start of the window ending at `now`.
    #[must_use]
    pub fn start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Today => now.date_naive().and_time(NaiveTime::MIN).and_utc(),
            Self::Week => now - Duration::days(7),
            Self::Month => now - Duration::days(30),
            Self::Year => now - Duration::days(365),
        }
    }

    /// The window as a [`DateRange`].
    #[must_use]
    pub fn range(self, now: DateTime<Utc>) -> DateRange {
        DateRange {
            from: self.start(now),
            to: now,
        }
    }
}

/// Inclusive time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Report counts per urgency level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct UrgencyCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl UrgencyCounts {
    /// Counts one report at `urgency`.
    pub const fn add(&mut self, urgency: Urgency) {
        match urgency {
            Urgency::Low => self.low += 1,
            Urgency::Medium => self.medium += 1,
            Urgency::High => self.high += 1,
        }
    }

    /// Count at `urgency`.
    #[must_use]
    pub const fn get(&self, urgency: Urgency) -> usize {
        match urgency {
            Urgency::Low => self.low,
            Urgency::Medium => self.medium,
            Urgency::High => self.high,
        }
    }

    /// Sum of all levels.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.low + self.medium + self.high
    }
}

impl FromIterator<Urgency> for UrgencyCounts {
    fn from_iter<I: IntoIterator<Item = Urgency>>(iter: I) -> Self {
        let mut counts = Self::default();
        for urgency in iter {
            counts.add(urgency);
        }
        counts
    }
}

/// Report counts per lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub resolved: usize,
}

impl StatusCounts {
    /// Counts one report in `status`.
    pub const fn add(&mut self, status: ReportStatus) {
        match status {
            ReportStatus::Pending => self.pending += 1,
            ReportStatus::InProgress => self.in_progress += 1,
            ReportStatus::Resolved => self.resolved += 1,
        }
    }

    /// Sum of all statuses.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.pending + self.in_progress + self.resolved
    }
}

impl FromIterator<ReportStatus> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = ReportStatus>>(iter: I) -> Self {
        let mut counts = Self::default();
        for status in iter {
            counts.add(status);
        }
        counts
    }
}

// ── Classification analytics ────────────────────────────────────

/// Full analytics envelope for one period and optional sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub period: Period,
    pub sector: Option<Sector>,
    pub date_range: DateRange,
    pub processing: ProcessingFacet,
    pub classification: ConfidenceFacet,
    pub reclassification: ReclassificationFacet,
    pub urgency_comparison: UrgencyComparison,
    pub notifications: NotificationFacet,
    /// Most frequent risk keywords, at most ten.
    pub top_keywords: Vec<KeywordCount>,
    pub impact: ImpactFacet,
}

/// Classification throughput.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingFacet {
    pub total_reports: usize,
    pub auto_classified: usize,
    pub pending_classification: usize,
    /// Percentage of reports auto-classified, one decimal.
    pub processing_rate: f64,
    /// Mean minutes from filing to classification, one decimal.
    pub avg_processing_minutes: f64,
}

/// Score buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceDistribution {
    /// `score >= 0.70`
    pub high: usize,
    /// `0.40 <= score < 0.70`
    pub medium: usize,
    /// `score < 0.40`
    pub low: usize,
}

/// Confidence distribution of classified reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceFacet {
    /// Mean score, two decimals.
    pub avg_score: f64,
    pub distribution: ConfidenceDistribution,
}

/// Declared-vs-classified urgency changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReclassificationFacet {
    pub total_reclassified: usize,
    /// Percentage of classified reports whose class differs from the
    /// declared urgency.
    pub reclassification_rate: f64,
    pub elevated: usize,
    pub reduced: usize,
    /// Percentage of reclassified reports that were elevated.
    pub elevation_rate: f64,
    /// Counts keyed `"{DECLARED}_to_{CLASSIFIED}"`.
    pub transitions: BTreeMap<String, usize>,
}

/// Urgency distribution before and after classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrgencyComparison {
    pub declared: UrgencyCounts,
    pub classified: UrgencyCounts,
    /// Human-readable change in the HIGH bucket.
    pub high_impact: String,
}

/// Alert counts split by trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationReasons {
    pub high_urgency: usize,
    pub high_confidence: usize,
}

/// Notification effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFacet {
    pub total_sent: usize,
    pub notification_rate: f64,
    pub by_reason: NotificationReasons,
    pub avg_notification_minutes: f64,
}

/// One entry of the keyword ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordCount {
    pub keyword: String,
    /// Number of descriptions containing the keyword.
    pub count: usize,
    /// `"high"` or `"medium"`.
    pub risk_level: String,
}

/// Operational impact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactFacet {
    /// Reports whose urgency was elevated by classification.
    pub reports_prioritized: usize,
    /// Distinct assignees among notified reports.
    pub authorities_notified: usize,
    /// `"NN%"` when high-confidence reports resolve faster, else `"N/A"`.
    pub avg_response_improvement: String,
}

// ── Role statistics ─────────────────────────────────────────────

/// Statistics for the caller's role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum RoleStats {
    Student(StudentStats),
    Authority(AuthorityStats),
    Admin(AdminStats),
}

/// A student's own reports plus a system overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStats {
    pub period: Period,
    pub date_range: DateRange,
    pub my_reports: OwnReports,
    pub system_overview: SystemOverview,
}

/// Reports filed by the caller, over all time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnReports {
    pub total: usize,
    pub in_period: usize,
    pub by_status: StatusCounts,
    pub by_urgency: UrgencyCounts,
}

/// System-wide activity in the period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemOverview {
    pub total_in_period: usize,
    pub by_urgency: UrgencyCounts,
}

/// An authority's sector and personal workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityStats {
    pub sector: Sector,
    pub period: Period,
    pub date_range: DateRange,
    pub my_sector: SectorReports,
    pub my_assigned: AssignedReports,
}

/// Reports routed to one sector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorReports {
    pub total: usize,
    pub in_period: usize,
    /// Over all time.
    pub by_status: StatusCounts,
    /// Within the period.
    pub by_urgency: UrgencyCounts,
}

/// Reports assigned to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedReports {
    pub total: usize,
    pub by_status: StatusCounts,
}

/// System-wide view for administrators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub period: Period,
    pub date_range: DateRange,
    pub summary: AdminSummary,
    /// Within the period.
    pub by_urgency: UrgencyCounts,
    pub by_sector: SectorBreakdown,
    pub performance: Performance,
}

/// Totals over all time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSummary {
    pub total: usize,
    pub in_period: usize,
    pub by_status: StatusCounts,
    pub unassigned: usize,
}

/// Report counts per sector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorBreakdown {
    pub total: BTreeMap<Sector, usize>,
    pub in_period: BTreeMap<Sector, usize>,
}

/// Resolution performance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    /// Mean hours from filing to resolution, two decimals. `None` when
    /// nothing has been resolved.
    pub avg_resolution_hours: Option<f64>,
    /// Percentage of all reports that are resolved, two decimals.
    pub resolution_rate: f64,
}

/// Counts for reports filed in the last 24 hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub generated_at: DateTime<Utc>,
    pub date_range: DateRange,
    pub total: usize,
    pub by_place_type: BTreeMap<String, usize>,
    pub by_place: BTreeMap<String, usize>,
    pub by_status: StatusCounts,
    pub by_urgency: UrgencyCounts,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn period_parsing_falls_back_to_week() {
        assert_eq!(Period::parse_or_default(Some("today")), Period::Today);
        assert_eq!(Period::parse_or_default(Some("MONTH")), Period::Month);
        assert_eq!(Period::parse_or_default(Some("fortnight")), Period::Week);
        assert_eq!(Period::parse_or_default(None), Period::Week);
    }

    #[test]
    fn period_start_boundaries() {
        let now = Utc.with_ymd_and_hms(2025, 11, 20, 15, 30, 0).unwrap();
        assert_eq!(
            Period::Today.start(now),
            Utc.with_ymd_and_hms(2025, 11, 20, 0, 0, 0).unwrap()
        );
        assert_eq!(
            Period::Week.start(now),
            Utc.with_ymd_and_hms(2025, 11, 13, 15, 30, 0).unwrap()
        );
        assert_eq!(
            Period::Month.start(now),
            Utc.with_ymd_and_hms(2025, 10, 21, 15, 30, 0).unwrap()
        );
    }

    #[test]
    fn counts_collect_from_iterators() {
        let urgencies: UrgencyCounts = [Urgency::High, Urgency::Low, Urgency::High]
            .into_iter()
            .collect();
        assert_eq!(urgencies.get(Urgency::High), 2);
        assert_eq!(urgencies.total(), 3);

        let statuses: StatusCounts = [ReportStatus::Resolved, ReportStatus::Pending]
            .into_iter()
            .collect();
        assert_eq!(statuses.resolved, 1);
        assert_eq!(statuses.total(), 2);
    }

    #[test]
    fn counts_serialize_with_enum_style_keys() {
        let json = serde_json::to_value(UrgencyCounts {
            low: 1,
            medium: 2,
            high: 3,
        })
        .unwrap();
        assert_eq!(json["HIGH"], 3);

        let json = serde_json::to_value(StatusCounts::default()).unwrap();
        assert_eq!(json["IN_PROGRESS"], 0);
    }
}
