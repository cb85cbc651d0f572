//! Per-role statistics and the daily activity report.
//!
//! Urgency counts here use the author's declared urgency.

use std::collections::BTreeMap;

use alerta_analytics_models::{
    AdminStats, AdminSummary, AssignedReports, AuthorityStats, DailyReport, DateRange,
    OwnReports, Performance, Period, RoleStats, SectorBreakdown, SectorReports, StudentStats,
    SystemOverview,
};
use alerta_report_models::{Identity, Report, ReportStatus, Role, Sector};
use chrono::{DateTime, Duration, Utc};

use crate::{hours_between, mean, percent, round_to};

fn in_period<'a>(
    reports: &'a [Report],
    period: Period,
    now: DateTime<Utc>,
) -> impl Iterator<Item = &'a Report> {
    let start = period.start(now);
    reports.iter().filter(move |r| r.created_at >= start)
}

/// A student's own reports plus system-wide urgency counts in the period.
#[must_use]
pub fn student_stats(
    user_id: &str,
    reports: &[Report],
    period: Period,
    now: DateTime<Utc>,
) -> StudentStats {
    let mine: Vec<&Report> = reports.iter().filter(|r| r.author_id == user_id).collect();
    let start = period.start(now);

    StudentStats {
        period,
        date_range: period.range(now),
        my_reports: OwnReports {
            total: mine.len(),
            in_period: mine.iter().filter(|r| r.created_at >= start).count(),
            by_status: mine.iter().map(|r| r.status).collect(),
            by_urgency: mine.iter().map(|r| r.declared_urgency).collect(),
        },
        system_overview: SystemOverview {
            total_in_period: in_period(reports, period, now).count(),
            by_urgency: in_period(reports, period, now)
                .map(|r| r.declared_urgency)
                .collect(),
        },
    }
}

/// Sector totals for an authority plus the reports assigned to them.
#[must_use]
pub fn authority_stats(
    user_id: &str,
    sector: Sector,
    reports: &[Report],
    period: Period,
    now: DateTime<Utc>,
) -> AuthorityStats {
    let sector_reports: Vec<&Report> = reports.iter().filter(|r| r.sector == sector).collect();
    let start = period.start(now);
    let assigned: Vec<&Report> = sector_reports
        .iter()
        .copied()
        .filter(|r| r.assigned_to.as_deref() == Some(user_id))
        .collect();

    AuthorityStats {
        sector,
        period,
        date_range: period.range(now),
        my_sector: SectorReports {
            total: sector_reports.len(),
            in_period: sector_reports
                .iter()
                .filter(|r| r.created_at >= start)
                .count(),
            by_status: sector_reports.iter().map(|r| r.status).collect(),
            by_urgency: sector_reports
                .iter()
                .filter(|r| r.created_at >= start)
                .map(|r| r.declared_urgency)
                .collect(),
        },
        my_assigned: AssignedReports {
            total: assigned.len(),
            by_status: assigned.iter().map(|r| r.status).collect(),
        },
    }
}

/// System-wide view for administrators.
#[must_use]
pub fn admin_stats(reports: &[Report], period: Period, now: DateTime<Utc>) -> AdminStats {
    let by_status: alerta_analytics_models::StatusCounts =
        reports.iter().map(|r| r.status).collect();

    let mut by_sector = SectorBreakdown::default();
    for report in reports {
        *by_sector.total.entry(report.sector).or_default() += 1;
    }
    for report in in_period(reports, period, now) {
        *by_sector.in_period.entry(report.sector).or_default() += 1;
    }

    let resolution_hours: Vec<f64> = reports
        .iter()
        .filter(|r| r.status == ReportStatus::Resolved)
        .filter_map(|r| r.resolved_at.map(|at| hours_between(r.created_at, at)))
        .collect();

    AdminStats {
        period,
        date_range: period.range(now),
        summary: AdminSummary {
            total: reports.len(),
            in_period: in_period(reports, period, now).count(),
            by_status,
            unassigned: reports.iter().filter(|r| r.assigned_to.is_none()).count(),
        },
        by_urgency: in_period(reports, period, now)
            .map(|r| r.declared_urgency)
            .collect(),
        by_sector,
        performance: Performance {
            avg_resolution_hours: (!resolution_hours.is_empty())
                .then(|| round_to(mean(&resolution_hours), 2)),
            resolution_rate: percent(by_status.resolved, reports.len(), 2),
        },
    }
}

/// Statistics for whoever is asking. `None` for an authority without a
/// sector.
#[must_use]
pub fn role_stats(
    identity: &Identity,
    reports: &[Report],
    period: Period,
    now: DateTime<Utc>,
) -> Option<RoleStats> {
    match identity.role {
        Role::Student => Some(RoleStats::Student(student_stats(
            &identity.id,
            reports,
            period,
            now,
        ))),
        Role::Authority => identity.sector.map(|sector| {
            RoleStats::Authority(authority_stats(&identity.id, sector, reports, period, now))
        }),
        Role::Admin => Some(RoleStats::Admin(admin_stats(reports, period, now))),
    }
}

/// Counts of reports filed in the 24 hours before `now`.
#[must_use]
pub fn daily_report(reports: &[Report], now: DateTime<Utc>) -> DailyReport {
    let from = now - Duration::days(1);
    let recent: Vec<&Report> = reports.iter().filter(|r| r.created_at > from).collect();

    let mut by_place_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_place: BTreeMap<String, usize> = BTreeMap::new();
    for report in &recent {
        *by_place_type
            .entry(report.place.place_type.to_lowercase())
            .or_default() += 1;
        *by_place.entry(report.place.name.clone()).or_default() += 1;
    }

    DailyReport {
        generated_at: now,
        date_range: DateRange { from, to: now },
        total: recent.len(),
        by_place_type,
        by_place,
        by_status: recent.iter().map(|r| r.status).collect(),
        by_urgency: recent.iter().map(|r| r.declared_urgency).collect(),
    }
}

#[cfg(test)]
mod tests {
    use alerta_report_models::{PlaceSnapshot, Urgency};

    use super::*;

    fn report(
        id: &str,
        author: &str,
        sector: Sector,
        urgency: Urgency,
        created_at: DateTime<Utc>,
    ) -> Report {
        Report {
            id: id.to_string(),
            place: PlaceSnapshot {
                id: format!("p-{id}"),
                name: format!("Place {sector}"),
                place_type: match sector {
                    Sector::Security => "parking".to_string(),
                    _ => "restroom".to_string(),
                },
                building: None,
                floor: None,
            },
            description: "something".to_string(),
            declared_urgency: urgency,
            classification: None,
            is_auto_classified: false,
            status: ReportStatus::Pending,
            sector,
            assigned_to: None,
            author_id: author.to_string(),
            image_ref: None,
            notification_sent_at: None,
            created_at,
            updated_at: created_at,
            resolved_at: None,
        }
    }

    fn fixture(now: DateTime<Utc>) -> Vec<Report> {
        let mut taken = report("b", "s-2", Sector::Maintenance, Urgency::High, now - Duration::hours(2));
        taken.status = ReportStatus::InProgress;
        taken.assigned_to = Some("a-1".to_string());

        let mut done = report("c", "s-1", Sector::Maintenance, Urgency::Low, now - Duration::days(20));
        done.status = ReportStatus::Resolved;
        done.assigned_to = Some("a-1".to_string());
        done.resolved_at = Some(done.created_at + Duration::hours(6));

        vec![
            report("a", "s-1", Sector::Security, Urgency::Medium, now - Duration::hours(3)),
            taken,
            done,
        ]
    }

    #[test]
    fn student_sees_own_reports_and_overview() {
        let now = Utc::now();
        let stats = student_stats("s-1", &fixture(now), Period::Week, now);

        assert_eq!(stats.my_reports.total, 2);
        assert_eq!(stats.my_reports.in_period, 1);
        assert_eq!(stats.my_reports.by_status.pending, 1);
        assert_eq!(stats.my_reports.by_status.resolved, 1);
        assert_eq!(stats.system_overview.total_in_period, 2);
        assert_eq!(stats.system_overview.by_urgency.high, 1);
    }

    #[test]
    fn authority_sees_sector_and_assignments() {
        let now = Utc::now();
        let stats = authority_stats("a-1", Sector::Maintenance, &fixture(now), Period::Week, now);

        assert_eq!(stats.my_sector.total, 2);
        assert_eq!(stats.my_sector.in_period, 1);
        assert_eq!(stats.my_sector.by_status.in_progress, 1);
        assert_eq!(stats.my_sector.by_urgency.total(), 1);
        assert_eq!(stats.my_assigned.total, 2);
        assert_eq!(stats.my_assigned.by_status.resolved, 1);
    }

    #[test]
    fn admin_performance_and_breakdown() {
        let now = Utc::now();
        let stats = admin_stats(&fixture(now), Period::Month, now);

        assert_eq!(stats.summary.total, 3);
        assert_eq!(stats.summary.in_period, 3);
        assert_eq!(stats.summary.unassigned, 1);
        assert_eq!(stats.by_sector.total.get(&Sector::Maintenance), Some(&2));
        assert_eq!(stats.performance.avg_resolution_hours, Some(6.0));
        assert!((stats.performance.resolution_rate - 33.33).abs() < 1e-9);
    }

    #[test]
    fn admin_stats_on_empty_input() {
        let stats = admin_stats(&[], Period::Week, Utc::now());
        assert_eq!(stats.performance.avg_resolution_hours, None);
        assert!(stats.performance.resolution_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn role_stats_dispatches_on_role() {
        let now = Utc::now();
        let reports = fixture(now);

        assert!(matches!(
            role_stats(&Identity::student("s-1"), &reports, Period::Week, now),
            Some(RoleStats::Student(_))
        ));
        assert!(matches!(
            role_stats(&Identity::admin("root"), &reports, Period::Week, now),
            Some(RoleStats::Admin(_))
        ));

        let sectorless = Identity {
            id: "a-2".to_string(),
            role: Role::Authority,
            sector: None,
        };
        assert!(role_stats(&sectorless, &reports, Period::Week, now).is_none());
    }

    #[test]
    fn daily_report_counts_last_day() {
        let now = Utc::now();
        let daily = daily_report(&fixture(now), now);

        assert_eq!(daily.total, 2);
        assert_eq!(daily.by_place_type.get("parking"), Some(&1));
        assert_eq!(daily.by_place_type.get("restroom"), Some(&1));
        assert_eq!(daily.by_status.in_progress, 1);
        assert_eq!(daily.by_urgency.medium, 1);

        let json = serde_json::to_value(&daily).unwrap();
        assert_eq!(json["byStatus"]["PENDING"], 1);
    }
}
