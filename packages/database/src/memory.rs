//! In-process report store.
//!
//! Every operation holds the map's mutex for its full duration, so the
//! condition check and the write inside [`ReportStore::update`] form a
//! single compare-and-set step.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use alerta_report_models::Report;
use async_trait::async_trait;

use crate::{ReportPatch, ReportStore, ScanFilter, StoreError, WriteCondition};

/// A [`ReportStore`] backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    reports: Mutex<BTreeMap<String, Report>>,
}

impl MemoryReportStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `reports`.
    #[must_use]
    pub fn with_reports(reports: impl IntoIterator<Item = Report>) -> Self {
        Self {
            reports: Mutex::new(reports.into_iter().map(|r| (r.id.clone(), r)).collect()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Report>>, StoreError> {
        self.reports.lock().map_err(|_| StoreError::Database {
            message: "report store mutex poisoned".to_string(),
        })
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn get(&self, id: &str) -> Result<Option<Report>, StoreError> {
        Ok(self.lock()?.get(id).cloned())
    }

    async fn insert(&self, report: &Report) -> Result<(), StoreError> {
        let mut reports = self.lock()?;
        if reports.contains_key(&report.id) {
            return Err(StoreError::AlreadyExists {
                id: report.id.clone(),
            });
        }
        reports.insert(report.id.clone(), report.clone());
        drop(reports);
        Ok(())
    }

    async fn update(
        &self,
        id: &str,
        patch: &ReportPatch,
        condition: Option<WriteCondition>,
    ) -> Result<Report, StoreError> {
        let mut reports = self.lock()?;
        let stored = reports
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        if let Some(condition) = condition
            && !condition.holds(stored)
        {
            return Err(StoreError::ConditionFailed {
                id: id.to_string(),
                condition,
            });
        }

        patch.apply(stored);
        Ok(stored.clone())
    }

    async fn scan(&self, filter: &ScanFilter) -> Result<Vec<Report>, StoreError> {
        let reports = self.lock()?;
        let mut matched: Vec<Report> = reports
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        drop(reports);

        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alerta_report_models::ReportStatus;
    use chrono::{Duration, Utc};

    use super::*;
    use crate::test_support::report;

    #[tokio::test]
    async fn insert_then_get() {
        let store = MemoryReportStore::new();
        let r = report("r-1", Utc::now());
        store.insert(&r).await.unwrap();
        assert_eq!(store.get("r-1").await.unwrap(), Some(r));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = MemoryReportStore::new();
        let r = report("r-1", Utc::now());
        store.insert(&r).await.unwrap();
        assert!(matches!(
            store.insert(&r).await,
            Err(StoreError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn conditional_update_checks_stored_value() {
        let store = MemoryReportStore::with_reports([report("r-1", Utc::now())]);
        let claim = ReportPatch {
            status: Some(ReportStatus::InProgress),
            assigned_to: Some("auth-1".to_string()),
            ..ReportPatch::default()
        };
        let pending = Some(WriteCondition::StatusIs(ReportStatus::Pending));

        let updated = store.update("r-1", &claim, pending).await.unwrap();
        assert_eq!(updated.status, ReportStatus::InProgress);

        let second = ReportPatch {
            assigned_to: Some("auth-2".to_string()),
            ..claim
        };
        assert!(matches!(
            store.update("r-1", &second, pending).await,
            Err(StoreError::ConditionFailed { .. })
        ));

        let stored = store.get("r-1").await.unwrap().unwrap();
        assert_eq!(stored.assigned_to.as_deref(), Some("auth-1"));
    }

    #[tokio::test]
    async fn update_of_missing_report_is_not_found() {
        let store = MemoryReportStore::new();
        assert!(matches!(
            store.update("nope", &ReportPatch::default(), None).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn scan_orders_by_creation_and_limits() {
        let now = Utc::now();
        let store = MemoryReportStore::with_reports([
            report("b", now - Duration::minutes(1)),
            report("a", now - Duration::minutes(5)),
            report("c", now),
        ]);

        let all = store.scan(&ScanFilter::default()).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let limited = store
            .scan(&ScanFilter {
                limit: Some(2),
                ..ScanFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_conditional_updates_have_one_winner() {
        let store = Arc::new(MemoryReportStore::with_reports([report("r-1", Utc::now())]));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let patch = ReportPatch {
                        status: Some(ReportStatus::InProgress),
                        assigned_to: Some(format!("auth-{i}")),
                        ..ReportPatch::default()
                    };
                    store
                        .update(
                            "r-1",
                            &patch,
                            Some(WriteCondition::StatusIs(ReportStatus::Pending)),
                        )
                        .await
                })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in handles {
            if let Ok(report) = handle.await.unwrap() {
                winners.push(report.assigned_to.unwrap());
            }
        }

        assert_eq!(winners.len(), 1);
        let stored = store.get("r-1").await.unwrap().unwrap();
        assert_eq!(stored.assigned_to.as_ref(), winners.first());
    }
}
