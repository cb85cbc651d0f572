//! Report submission and lifecycle transitions.
//!
//! Transitions are field-level patches, so a transition never overwrites
//! classification fields written concurrently by the sweep. Only
//! [`ReportService::claim`] carries a write condition; manual assignment
//! and status updates are last-writer-wins.

use std::sync::Arc;

use alerta_classifier::route_sector;
use alerta_database::{ReportPatch, ReportStore, WriteCondition, blob::BlobStore};
use alerta_report_models::{Identity, NewReport, Report, ReportStatus, Role};
use chrono::{DateTime, Utc};

use crate::LifecycleError;
use crate::notify::{EventPublisher, NotificationEvent};

/// Entry point for every report mutation.
#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn ReportStore>,
    blobs: Arc<dyn BlobStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl ReportService {
    #[must_use]
    pub fn new(
        store: Arc<dyn ReportStore>,
        blobs: Arc<dyn BlobStore>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            blobs,
            publisher,
        }
    }

    /// The underlying record store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ReportStore> {
        &self.store
    }

    /// Files a new report on behalf of `author`.
    ///
    /// The sector is routed from the place type, any attached image is
    /// written to the blob store first, and a `ReportCreated` event is
    /// published after the insert.
    ///
    /// # Errors
    ///
    /// * [`LifecycleError::Forbidden`] if `author` is an authority
    /// * [`LifecycleError::Validation`] if the description or place is empty
    /// * [`LifecycleError::Store`] if the image or record cannot be written
    pub async fn submit(
        &self,
        author: &Identity,
        new_report: NewReport,
    ) -> Result<Report, LifecycleError> {
        if !matches!(author.role, Role::Student | Role::Admin) {
            return Err(LifecycleError::forbidden(format!(
                "role {} cannot file reports",
                author.role
            )));
        }

        let description = new_report.description.trim();
        if description.is_empty() {
            return Err(LifecycleError::validation("description must not be empty"));
        }
        if new_report.place.id.trim().is_empty() || new_report.place.name.trim().is_empty() {
            return Err(LifecycleError::validation("place id and name are required"));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let image_ref = match &new_report.image {
            Some(image) => Some(
                self.blobs
                    .put(&id, &image.bytes, &image.content_type)
                    .await
                    .map_err(LifecycleError::Store)?,
            ),
            None => None,
        };

        let now = Utc::now();
        let report = Report {
            id,
            sector: route_sector(&new_report.place.place_type),
            place: new_report.place,
            description: description.to_string(),
            declared_urgency: new_report.urgency,
            classification: None,
            is_auto_classified: false,
            status: ReportStatus::Pending,
            assigned_to: None,
            author_id: author.id.clone(),
            image_ref,
            notification_sent_at: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        };

        self.store.insert(&report).await?;
        log::info!(
            "Report {} filed by {} at '{}' -> sector {}",
            report.id,
            report.author_id,
            report.place.name,
            report.sector
        );

        self.notify(NotificationEvent::ReportCreated {
            report_id: report.id.clone(),
            author_id: report.author_id.clone(),
            sector: report.sector,
            urgency: report.declared_urgency,
            place_name: report.place.name.clone(),
            timestamp: now,
        })
        .await;

        Ok(report)
    }

    /// Fetches a report.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] if no report has this id.
    pub async fn get(&self, report_id: &str) -> Result<Report, LifecycleError> {
        self.store
            .get(report_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound {
                id: report_id.to_string(),
            })
    }

    /// Self-assigns a pending report to an authority of the same sector.
    ///
    /// The commit is conditioned on the stored status still being
    /// `PENDING`, so of any number of concurrent claims at most one wins.
    ///
    /// # Errors
    ///
    /// * [`LifecycleError::NotFound`] if the report does not exist
    /// * [`LifecycleError::Forbidden`] if the actor is not an authority of
    ///   the report's sector, or the report is no longer pending
    /// * [`LifecycleError::Conflict`] if another claim committed first
    pub async fn claim(
        &self,
        report_id: &str,
        actor: &Identity,
        comment: Option<String>,
    ) -> Result<Report, LifecycleError> {
        let actor_sector = match (actor.role, actor.sector) {
            (Role::Authority, Some(sector)) => sector,
            _ => {
                return Err(LifecycleError::forbidden(
                    "only sector authorities can take reports",
                ));
            }
        };

        let report = self.get(report_id).await?;
        if report.sector != actor_sector {
            return Err(LifecycleError::forbidden(format!(
                "report belongs to sector {}, not {actor_sector}",
                report.sector
            )));
        }
        if report.status != ReportStatus::Pending {
            return Err(LifecycleError::forbidden(format!(
                "report is {}, only PENDING reports can be taken",
                report.status
            )));
        }

        let patch = ReportPatch {
            status: Some(ReportStatus::InProgress),
            assigned_to: Some(actor.id.clone()),
            updated_at: Some(commit_time(&report)),
            ..ReportPatch::default()
        };

        let updated = self
            .store
            .update(
                report_id,
                &patch,
                Some(WriteCondition::StatusIs(ReportStatus::Pending)),
            )
            .await
            .map_err(|e| {
                let e = LifecycleError::from(e);
                if matches!(e, LifecycleError::Conflict { .. }) {
                    log::warn!("Claim of report {report_id} by {} lost the race", actor.id);
                }
                e
            })?;

        log::info!("Report {report_id} taken by {}", actor.id);
        self.notify(NotificationEvent::status_changed(
            &updated,
            report.status,
            &actor.id,
            comment,
        ))
        .await;

        Ok(updated)
    }

    /// Administrative assignment of a report to an authority, with any
    /// target status.
    ///
    /// # Errors
    ///
    /// * [`LifecycleError::Validation`] if `new_status` is not a status
    /// * [`LifecycleError::Forbidden`] if the caller is not an admin, the
    ///   target is not an authority, or the target's sector differs from
    ///   the report's
    /// * [`LifecycleError::NotFound`] if the report does not exist
    pub async fn manual_assign(
        &self,
        report_id: &str,
        admin: &Identity,
        target: &Identity,
        new_status: &str,
        comment: Option<String>,
    ) -> Result<Report, LifecycleError> {
        let new_status = parse_status(new_status)?;

        if admin.role != Role::Admin {
            return Err(LifecycleError::forbidden(
                "only administrators can assign reports",
            ));
        }
        if target.role != Role::Authority {
            return Err(LifecycleError::forbidden(format!(
                "assignee {} is not an authority",
                target.id
            )));
        }

        let report = self.get(report_id).await?;
        if target.sector != Some(report.sector) {
            return Err(LifecycleError::forbidden(format!(
                "assignee {} does not belong to sector {}",
                target.id, report.sector
            )));
        }

        let updated = self
            .transition(&report, new_status, &target.id)
            .await?;

        log::info!(
            "Report {report_id} assigned to {} by {} ({} -> {new_status})",
            target.id,
            admin.id,
            report.status
        );
        self.notify(NotificationEvent::status_changed(
            &updated,
            report.status,
            &admin.id,
            comment,
        ))
        .await;

        Ok(updated)
    }

    /// Sets the status of a report and assigns it to the caller.
    ///
    /// Any status may follow any other. Leaving `RESOLVED` clears
    /// `resolved_at`.
    ///
    /// # Errors
    ///
    /// * [`LifecycleError::Validation`] if `new_status` is not a status
    /// * [`LifecycleError::Forbidden`] if the caller is a student
    /// * [`LifecycleError::NotFound`] if the report does not exist
    pub async fn update_status(
        &self,
        report_id: &str,
        actor: &Identity,
        new_status: &str,
        comment: Option<String>,
    ) -> Result<Report, LifecycleError> {
        let new_status = parse_status(new_status)?;

        if !matches!(actor.role, Role::Authority | Role::Admin) {
            return Err(LifecycleError::forbidden(
                "only authorities and administrators can update status",
            ));
        }

        let report = self.get(report_id).await?;
        let updated = self.transition(&report, new_status, &actor.id).await?;

        log::info!(
            "Report {report_id} status {} -> {new_status} by {}",
            report.status,
            actor.id
        );
        self.notify(NotificationEvent::status_changed(
            &updated,
            report.status,
            &actor.id,
            comment,
        ))
        .await;

        Ok(updated)
    }

    /// Unconditional status + assignee write shared by manual assignment
    /// and status updates.
    async fn transition(
        &self,
        report: &Report,
        new_status: ReportStatus,
        assignee: &str,
    ) -> Result<Report, LifecycleError> {
        let now = commit_time(report);
        let patch = ReportPatch {
            status: Some(new_status),
            assigned_to: Some(assignee.to_string()),
            updated_at: Some(now),
            resolved_at: Some((new_status == ReportStatus::Resolved).then_some(now)),
            ..ReportPatch::default()
        };

        Ok(self.store.update(&report.id, &patch, None).await?)
    }

    async fn notify(&self, event: NotificationEvent) {
        if let Err(e) = self.publisher.publish(&event).await {
            log::error!(
                "Failed to publish {} for report {}: {e}",
                event.kind(),
                event.report_id()
            );
        }
    }
}

fn parse_status(value: &str) -> Result<ReportStatus, LifecycleError> {
    value
        .trim()
        .parse()
        .map_err(|_| LifecycleError::validation(format!("invalid status '{value}'")))
}

/// Commit timestamp for a transition, never earlier than the report's
/// last modification.
fn commit_time(report: &Report) -> DateTime<Utc> {
    Utc::now().max(report.updated_at)
}
