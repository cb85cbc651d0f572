//! Periodic classification sweep.
//!
//! Each pass scans open reports that have not been auto-classified,
//! classifies them and writes the result guarded by "not yet
//! auto-classified". Urgent results fire a one-time alert whose
//! bookkeeping write is guarded by "notification not yet sent", so
//! overlapping sweeps neither double-classify nor double-notify.

use std::sync::Arc;
use std::time::Duration;

use alerta_classifier::{HIGH_THRESHOLD, classify};
use alerta_database::{ReportPatch, ReportStore, ScanFilter, StoreError, WriteCondition};
use alerta_report_models::{Classification, Report, ReportStatus, Urgency};
use chrono::Utc;
use serde::Serialize;

use crate::LifecycleError;
use crate::notify::{AlertReason, EventPublisher, NotificationEvent};

/// Counters for one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepOutcome {
    /// Candidates returned by the scan.
    pub scanned: usize,
    /// Classifications written by this pass.
    pub classified: usize,
    /// Alerts delivered and recorded by this pass.
    pub notified: usize,
    /// Per-report write or publish failures.
    pub failed: usize,
}

/// Returns why a classification warrants an alert, if it does.
#[must_use]
pub fn alert_reason(classification: &Classification) -> Option<AlertReason> {
    if classification.urgency == Urgency::High {
        Some(AlertReason::HighUrgency)
    } else if classification.score >= HIGH_THRESHOLD {
        Some(AlertReason::HighConfidence)
    } else {
        None
    }
}

/// Classifies pending work and fires threshold alerts.
#[derive(Clone)]
pub struct ClassificationSweep {
    store: Arc<dyn ReportStore>,
    publisher: Arc<dyn EventPublisher>,
    batch_limit: Option<usize>,
}

impl ClassificationSweep {
    #[must_use]
    pub fn new(store: Arc<dyn ReportStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            store,
            publisher,
            batch_limit: None,
        }
    }

    /// Caps the number of reports processed per pass.
    #[must_use]
    pub const fn with_batch_limit(mut self, limit: Option<usize>) -> Self {
        self.batch_limit = limit;
        self
    }

    /// The sweep's selection predicate: open and not yet auto-classified.
    #[must_use]
    pub fn candidate_filter(&self) -> ScanFilter {
        ScanFilter {
            statuses: vec![ReportStatus::Pending, ReportStatus::InProgress],
            auto_classified: Some(false),
            limit: self.batch_limit,
            ..ScanFilter::default()
        }
    }

    /// Runs one pass.
    ///
    /// Per-report failures are logged and counted; only a failed scan
    /// aborts the pass.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] if the candidate scan fails.
    pub async fn run_once(&self) -> Result<SweepOutcome, LifecycleError> {
        let candidates = self
            .store
            .scan(&self.candidate_filter())
            .await
            .map_err(LifecycleError::Store)?;

        let mut outcome = SweepOutcome {
            scanned: candidates.len(),
            ..SweepOutcome::default()
        };

        for report in &candidates {
            self.process(report, &mut outcome).await;
        }

        log::info!(
            "Classification sweep: scanned={} classified={} notified={} failed={}",
            outcome.scanned,
            outcome.classified,
            outcome.notified,
            outcome.failed
        );
        Ok(outcome)
    }

    /// Runs [`Self::run_once`] every `period`, forever.
    pub async fn run_every(&self, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(e) = self.run_once().await {
                log::error!("Classification sweep failed: {e}");
            }
        }
    }

    async fn process(&self, report: &Report, outcome: &mut SweepOutcome) {
        let classification = classify(report);
        let patch = ReportPatch {
            classification: Some(classification),
            updated_at: Some(Utc::now().max(report.updated_at)),
            ..ReportPatch::default()
        };

        let classified = match self
            .store
            .update(&report.id, &patch, Some(WriteCondition::AwaitingClassification))
            .await
        {
            Ok(updated) => updated,
            Err(StoreError::ConditionFailed { .. }) => {
                log::debug!(
                    "Report {} was classified or closed since the scan",
                    report.id
                );
                return;
            }
            Err(e) => {
                log::error!("Failed to store classification for {}: {e}", report.id);
                outcome.failed += 1;
                return;
            }
        };
        outcome.classified += 1;

        log::debug!(
            "Report {} classified {} (score {:.2}, declared {})",
            report.id,
            classification.urgency,
            classification.score,
            report.declared_urgency
        );

        let Some(reason) = alert_reason(&classification) else {
            return;
        };
        if classified.notification_sent() {
            return;
        }

        let now = Utc::now();
        let event = NotificationEvent::ClassificationAlert {
            report_id: classified.id.clone(),
            declared_urgency: classified.declared_urgency,
            classified_urgency: classification.urgency,
            score: classification.score,
            reason,
            description: classified.description.clone(),
            place_name: classified.place.name.clone(),
            sector: classified.sector,
            status: classified.status,
            timestamp: now,
        };

        if let Err(e) = self.publisher.publish(&event).await {
            log::error!("Failed to publish alert for {}: {e}", classified.id);
            outcome.failed += 1;
            return;
        }

        let mark = ReportPatch {
            notification_sent_at: Some(now),
            ..ReportPatch::default()
        };
        match self
            .store
            .update(
                &classified.id,
                &mark,
                Some(WriteCondition::NotificationPending),
            )
            .await
        {
            Ok(_) => outcome.notified += 1,
            Err(StoreError::ConditionFailed { .. }) => {
                log::debug!("Alert for {} already recorded", classified.id);
            }
            Err(e) => {
                log::error!("Failed to record alert for {}: {e}", classified.id);
                outcome.failed += 1;
            }
        }
    }
}
