//! Change notifications.
//!
//! Publishing is best-effort: callers log a [`PublishError`] and carry on,
//! the state change that triggered the event has already committed.

use alerta_report_models::{Identity, Report, ReportStatus, Role, Sector, Urgency};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use tokio::sync::broadcast;

/// Why a classification alert fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertReason {
    /// The classifier put the report in the HIGH class.
    HighUrgency,
    /// The score crossed the HIGH threshold without a HIGH class.
    HighConfidence,
}

/// An event pushed to the notification channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEvent {
    /// A new report was filed.
    #[serde(rename_all = "camelCase")]
    ReportCreated {
        report_id: String,
        author_id: String,
        sector: Sector,
        urgency: Urgency,
        place_name: String,
        timestamp: DateTime<Utc>,
    },

    /// A lifecycle transition committed.
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        report_id: String,
        old_status: ReportStatus,
        new_status: ReportStatus,
        actor_id: String,
        sector: Sector,
        urgency: Urgency,
        place_name: String,
        timestamp: DateTime<Utc>,
        comment: Option<String>,
        author_id: String,
        assigned_to: Option<String>,
    },

    /// The sweep classified a report as urgent.
    #[serde(rename_all = "camelCase")]
    ClassificationAlert {
        report_id: String,
        declared_urgency: Urgency,
        classified_urgency: Urgency,
        score: f64,
        reason: AlertReason,
        description: String,
        place_name: String,
        sector: Sector,
        status: ReportStatus,
        timestamp: DateTime<Utc>,
    },
}

impl NotificationEvent {
    /// Builds a [`Self::StatusChanged`] event from the committed report.
    #[must_use]
    pub fn status_changed(
        report: &Report,
        old_status: ReportStatus,
        actor_id: &str,
        comment: Option<String>,
    ) -> Self {
        Self::StatusChanged {
            report_id: report.id.clone(),
            old_status,
            new_status: report.status,
            actor_id: actor_id.to_string(),
            sector: report.sector,
            urgency: report.classified_urgency().unwrap_or(report.declared_urgency),
            place_name: report.place.name.clone(),
            timestamp: report.updated_at,
            comment,
            author_id: report.author_id.clone(),
            assigned_to: report.assigned_to.clone(),
        }
    }

    /// The report this event is about.
    #[must_use]
    pub fn report_id(&self) -> &str {
        match self {
            Self::ReportCreated { report_id, .. }
            | Self::StatusChanged { report_id, .. }
            | Self::ClassificationAlert { report_id, .. } => report_id,
        }
    }

    /// Sector of the report this event is about.
    #[must_use]
    pub const fn sector(&self) -> Sector {
        match self {
            Self::ReportCreated { sector, .. }
            | Self::StatusChanged { sector, .. }
            | Self::ClassificationAlert { sector, .. } => *sector,
        }
    }

    /// Whether `identity` should receive this event.
    ///
    /// Admins receive everything and authorities receive events for their
    /// own sector. Students only hear about status changes to reports they
    /// filed.
    #[must_use]
    pub fn visible_to(&self, identity: &Identity) -> bool {
        match identity.role {
            Role::Admin => true,
            Role::Authority => identity.sector == Some(self.sector()),
            Role::Student => match self {
                Self::StatusChanged { author_id, .. } => *author_id == identity.id,
                Self::ReportCreated { .. } | Self::ClassificationAlert { .. } => false,
            },
        }
    }

    /// Short event kind, as used in the serialized `type` tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ReportCreated { .. } => "REPORT_CREATED",
            Self::StatusChanged { .. } => "STATUS_CHANGED",
            Self::ClassificationAlert { .. } => "CLASSIFICATION_ALERT",
        }
    }
}

/// Errors delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The event could not be encoded.
    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The channel rejected the event.
    #[error("Delivery failed: {message}")]
    Delivery {
        /// Description of what went wrong.
        message: String,
    },
}

/// Fire-and-forget event sink.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes one event.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] if the event could not be delivered.
    async fn publish(&self, event: &NotificationEvent) -> Result<(), PublishError>;
}

/// Writes every event to the log as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: &NotificationEvent) -> Result<(), PublishError> {
        let body = serde_json::to_string(event)?;
        log::info!("[notify] {} {body}", event.kind());
        Ok(())
    }
}

/// Fans events out to in-process subscribers over a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<NotificationEvent>,
}

impl BroadcastPublisher {
    /// Creates a publisher whose subscribers may lag by up to `capacity`
    /// events before dropping the oldest.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribes to every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl EventPublisher for BroadcastPublisher {
    async fn publish(&self, event: &NotificationEvent) -> Result<(), PublishError> {
        match self.tx.send(event.clone()) {
            Ok(n) => log::debug!("[notify] {} delivered to {n} subscriber(s)", event.kind()),
            // No subscribers is not a failure.
            Err(_) => log::debug!("[notify] {} had no subscribers", event.kind()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created() -> NotificationEvent {
        NotificationEvent::ReportCreated {
            report_id: "r-1".to_string(),
            author_id: "s-1".to_string(),
            sector: Sector::Security,
            urgency: Urgency::High,
            place_name: "Main gate".to_string(),
            timestamp: Utc::now(),
        }
    }

    fn status_changed() -> NotificationEvent {
        NotificationEvent::StatusChanged {
            report_id: "r-1".to_string(),
            old_status: ReportStatus::Pending,
            new_status: ReportStatus::InProgress,
            actor_id: "a-1".to_string(),
            sector: Sector::Security,
            urgency: Urgency::High,
            place_name: "Main gate".to_string(),
            timestamp: Utc::now(),
            comment: None,
            author_id: "s-1".to_string(),
            assigned_to: Some("a-1".to_string()),
        }
    }

    fn alert() -> NotificationEvent {
        NotificationEvent::ClassificationAlert {
            report_id: "r-1".to_string(),
            declared_urgency: Urgency::Low,
            classified_urgency: Urgency::High,
            score: 0.75,
            reason: AlertReason::HighUrgency,
            description: "theft at the gate".to_string(),
            place_name: "Main gate".to_string(),
            sector: Sector::Security,
            status: ReportStatus::Pending,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn report_created_reaches_sector_authorities_and_admins() {
        let event = created();
        assert!(event.visible_to(&Identity::admin("adm")));
        assert!(event.visible_to(&Identity::authority("a-1", Sector::Security)));
        assert!(!event.visible_to(&Identity::authority("a-2", Sector::Cleaning)));
        assert!(!event.visible_to(&Identity::student("s-1")));
        assert!(!event.visible_to(&Identity::student("s-2")));
    }

    #[test]
    fn status_changed_reaches_author_but_not_other_students() {
        let event = status_changed();
        assert!(event.visible_to(&Identity::admin("adm")));
        assert!(event.visible_to(&Identity::authority("a-1", Sector::Security)));
        assert!(!event.visible_to(&Identity::authority("a-2", Sector::Cleaning)));
        assert!(event.visible_to(&Identity::student("s-1")));
        assert!(!event.visible_to(&Identity::student("s-2")));
    }

    #[test]
    fn classification_alert_is_staff_only() {
        let event = alert();
        assert!(event.visible_to(&Identity::admin("adm")));
        assert!(event.visible_to(&Identity::authority("a-1", Sector::Security)));
        assert!(!event.visible_to(&Identity::authority("a-2", Sector::Services)));
        assert!(!event.visible_to(&Identity::student("s-1")));
    }

    #[test]
    fn authority_without_sector_sees_nothing() {
        let orphan = Identity {
            id: "a-9".to_string(),
            role: Role::Authority,
            sector: None,
        };
        assert!(!created().visible_to(&orphan));
        assert!(!status_changed().visible_to(&orphan));
        assert!(!alert().visible_to(&orphan));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(created()).unwrap();
        assert_eq!(json["type"], "REPORT_CREATED");
        assert_eq!(json["reportId"], "r-1");
        assert_eq!(json["urgency"], "HIGH");
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_ok() {
        let publisher = BroadcastPublisher::new(4);
        assert_eq!(publisher.subscriber_count(), 0);
        publisher.publish(&created()).await.unwrap();
    }

    #[tokio::test]
    async fn broadcast_reaches_subscribers() {
        let publisher = BroadcastPublisher::new(4);
        let mut rx = publisher.subscribe();
        publisher.publish(&created()).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.report_id(), "r-1");
        assert_eq!(event.kind(), "REPORT_CREATED");
    }
}
