#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Storage collaborators for incident reports and attached images.
//!
//! [`ReportStore`] is a key/scan store with a conditional-update
//! primitive: [`ReportStore::update`] applies a [`ReportPatch`] only if
//! the supplied [`WriteCondition`] holds against the stored record, and
//! the check and the write happen atomically inside the backend.
//!
//! Two backends are provided:
//! - [`memory::MemoryReportStore`] guards a map with a mutex
//! - [`sqlite::SqliteReportStore`] uses `switchy_database` over `SQLite`,
//!   folding the condition into the `UPDATE ... WHERE` clause

pub mod blob;
pub mod memory;
pub mod paths;
pub mod sqlite;

use alerta_report_models::{Classification, Report, ReportStatus, Sector};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record with the given id.
    #[error("Report not found: {id}")]
    NotFound {
        /// Requested report id.
        id: String,
    },

    /// The write condition did not hold against the stored record.
    #[error("Condition failed for report {id}: {condition}")]
    ConditionFailed {
        /// Report id.
        id: String,
        /// The condition that was checked.
        condition: WriteCondition,
    },

    /// A record with the same id already exists.
    #[error("Report already exists: {id}")]
    AlreadyExists {
        /// Report id.
        id: String,
    },

    /// Database query error.
    #[error("Database error: {message}")]
    Database {
        /// Description of what went wrong.
        message: String,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// I/O error (blob files, database directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<switchy_database::DatabaseError> for StoreError {
    fn from(e: switchy_database::DatabaseError) -> Self {
        Self::Database {
            message: e.to_string(),
        }
    }
}

/// Predicate over the stored record that must hold for a conditional
/// update to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCondition {
    /// Stored status equals the given status.
    StatusIs(ReportStatus),
    /// The report is still open and has not been processed by the
    /// classification sweep.
    AwaitingClassification,
    /// The threshold notification has not fired yet.
    NotificationPending,
}

impl WriteCondition {
    /// Evaluates the condition against a stored record.
    #[must_use]
    pub fn holds(self, report: &Report) -> bool {
        match self {
            Self::StatusIs(status) => report.status == status,
            Self::AwaitingClassification => report.status.is_open() && !report.is_auto_classified,
            Self::NotificationPending => report.notification_sent_at.is_none(),
        }
    }
}

impl std::fmt::Display for WriteCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StatusIs(status) => write!(f, "status = {status}"),
            Self::AwaitingClassification => write!(f, "open and not auto-classified"),
            Self::NotificationPending => write!(f, "notification not sent"),
        }
    }
}

/// A partial update to a stored report. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportPatch {
    /// New lifecycle status.
    pub status: Option<ReportStatus>,
    /// New assignee.
    pub assigned_to: Option<String>,
    /// Classifier result. Setting it also marks the report auto-classified.
    pub classification: Option<Classification>,
    /// When the threshold notification fired.
    pub notification_sent_at: Option<DateTime<Utc>>,
    /// New modification time.
    pub updated_at: Option<DateTime<Utc>>,
    /// `Some(Some(t))` sets the resolution time, `Some(None)` clears it.
    pub resolved_at: Option<Option<DateTime<Utc>>>,
}

impl ReportPatch {
    /// Applies this patch to a report in place.
    pub fn apply(&self, report: &mut Report) {
        if let Some(status) = self.status {
            report.status = status;
        }
        if let Some(assigned_to) = &self.assigned_to {
            report.assigned_to = Some(assigned_to.clone());
        }
        if let Some(classification) = self.classification {
            report.classification = Some(classification);
            report.is_auto_classified = true;
        }
        if let Some(sent_at) = self.notification_sent_at {
            report.notification_sent_at = Some(sent_at);
        }
        if let Some(updated_at) = self.updated_at {
            report.updated_at = updated_at;
        }
        if let Some(resolved_at) = self.resolved_at {
            report.resolved_at = resolved_at;
        }
    }

    /// Whether the patch would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Filter for [`ReportStore::scan`]. Empty/`None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanFilter {
    /// Allowed statuses.
    pub statuses: Vec<ReportStatus>,
    /// Required value of `is_auto_classified`.
    pub auto_classified: Option<bool>,
    /// Required sector.
    pub sector: Option<Sector>,
    /// Only reports created at or after this instant.
    pub created_since: Option<DateTime<Utc>>,
    /// Maximum number of reports to return, oldest first.
    pub limit: Option<usize>,
}

impl ScanFilter {
    /// Evaluates every predicate except `limit` against a report.
    #[must_use]
    pub fn matches(&self, report: &Report) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&report.status))
            && self
                .auto_classified
                .is_none_or(|flag| report.is_auto_classified == flag)
            && self.sector.is_none_or(|sector| report.sector == sector)
            && self
                .created_since
                .is_none_or(|since| report.created_at >= since)
    }
}

/// Record store for incident reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Fetches a report by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    async fn get(&self, id: &str) -> Result<Option<Report>, StoreError>;

    /// Inserts a new report.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if the id is taken, or another
    /// [`StoreError`] if the backend fails.
    async fn insert(&self, report: &Report) -> Result<(), StoreError>;

    /// Applies `patch` to the report, atomically checking `condition`
    /// against the stored record first. Returns the updated report.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the report does not exist and
    /// [`StoreError::ConditionFailed`] if the condition does not hold.
    async fn update(
        &self,
        id: &str,
        patch: &ReportPatch,
        condition: Option<WriteCondition>,
    ) -> Result<Report, StoreError>;

    /// Returns reports matching `filter`, ordered by creation time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    async fn scan(&self, filter: &ScanFilter) -> Result<Vec<Report>, StoreError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use alerta_report_models::{PlaceSnapshot, Report, ReportStatus, Sector, Urgency};
    use chrono::{DateTime, Utc};

    pub fn report(id: &str, created_at: DateTime<Utc>) -> Report {
        Report {
            id: id.to_string(),
            place: PlaceSnapshot {
                id: "p-1".to_string(),
                name: "Restroom 2B".to_string(),
                place_type: "restroom".to_string(),
                building: Some("Tower A".to_string()),
                floor: Some(2),
            },
            description: "water leak".to_string(),
            declared_urgency: Urgency::Medium,
            classification: None,
            is_auto_classified: false,
            status: ReportStatus::Pending,
            sector: Sector::Maintenance,
            assigned_to: None,
            author_id: "student-1".to_string(),
            image_ref: None,
            notification_sent_at: None,
            created_at,
            updated_at: created_at,
            resolved_at: None,
        }
    }
}
