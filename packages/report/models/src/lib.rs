#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Incident report types shared across the `AlertaUTEC` backend.
//!
//! A [`Report`] is filed by a student against a campus place, routed to a
//! responsible [`Sector`], classified by urgency and moved through the
//! [`ReportStatus`] lifecycle by authorities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Urgency of an incident, ordered `Low < Medium < High`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Urgency {
    /// Can wait for routine handling.
    Low,
    /// Needs attention within the day.
    Medium,
    /// Needs an immediate response.
    High,
}

impl Urgency {
    /// Returns the ordinal level of this urgency (1-3).
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    /// Returns all variants of this enum, lowest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High]
    }
}

/// Lifecycle status of a report.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ReportStatus {
    /// Filed and waiting for an authority.
    Pending,
    /// Claimed or assigned and being worked on.
    InProgress,
    /// Closed out by an authority.
    Resolved,
}

impl ReportStatus {
    /// Returns all variants of this enum in lifecycle order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Pending, Self::InProgress, Self::Resolved]
    }

    /// Whether a report in this status is still waiting on someone.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

/// Organizational unit responsible for responding to a report.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Sector {
    /// Building maintenance (restrooms, classrooms, labs).
    Maintenance,
    /// Campus security (entrances, parking).
    Security,
    /// Grounds and cleaning staff.
    Cleaning,
    /// Student services (cafeteria, library).
    Services,
    /// Fallback for places with no dedicated sector.
    General,
}

impl Sector {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Maintenance,
            Self::Security,
            Self::Cleaning,
            Self::Services,
            Self::General,
        ]
    }
}

/// Role carried by a verified identity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
    /// Files reports.
    Student,
    /// Works reports for a single sector.
    Authority,
    /// Oversees every sector and may reassign reports.
    Admin,
}

/// A verified caller, as returned by the credential-verification
/// collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Opaque user identifier.
    pub id: String,
    /// Role granted to this user.
    pub role: Role,
    /// Sector for authorities, `None` for everyone else.
    pub sector: Option<Sector>,
}

impl Identity {
    /// Creates an authority identity bound to `sector`.
    #[must_use]
    pub fn authority(id: impl Into<String>, sector: Sector) -> Self {
        Self {
            id: id.into(),
            role: Role::Authority,
            sector: Some(sector),
        }
    }

    /// Creates a student identity.
    #[must_use]
    pub fn student(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Student,
            sector: None,
        }
    }

    /// Creates an administrator identity.
    #[must_use]
    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Admin,
            sector: None,
        }
    }
}

/// Denormalized copy of a place, taken when the report is filed.
///
/// Later edits to the place record are not reflected here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceSnapshot {
    /// Place identifier.
    pub id: String,
    /// Display name (e.g. `"Restroom 3A"`).
    pub name: String,
    /// Place type (e.g. `"restroom"`, `"parking"`).
    pub place_type: String,
    /// Building or tower the place belongs to.
    pub building: Option<String>,
    /// Floor within the building.
    pub floor: Option<i32>,
}

/// Output of the urgency classifier: class plus confidence in `[0, 1]`.
///
/// Stored as a unit on the report so the class and score are always set
/// together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// Machine-assigned urgency.
    pub urgency: Urgency,
    /// Confidence score, rounded to two decimals.
    pub score: f64,
}

/// A filed incident report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Unique identifier, immutable.
    pub id: String,
    /// Place the incident happened at.
    pub place: PlaceSnapshot,
    /// Author-supplied free text.
    pub description: String,
    /// Urgency chosen by the author. Never changes after creation.
    pub declared_urgency: Urgency,
    /// Classifier result, `None` until the sweep has processed the report.
    pub classification: Option<Classification>,
    /// Set once the classification sweep has processed this report.
    pub is_auto_classified: bool,
    /// Current lifecycle status.
    pub status: ReportStatus,
    /// Responsible sector, routed from the place type at creation.
    pub sector: Sector,
    /// Authority currently handling the report.
    pub assigned_to: Option<String>,
    /// Identity that filed the report.
    pub author_id: String,
    /// Reference to an attached image in the blob store.
    pub image_ref: Option<String>,
    /// When the threshold notification fired, if it did.
    pub notification_sent_at: Option<DateTime<Utc>>,
    /// When the report was filed.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// When the report reached [`ReportStatus::Resolved`].
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Report {
    /// Whether the classification-threshold notification has fired.
    #[must_use]
    pub const fn notification_sent(&self) -> bool {
        self.notification_sent_at.is_some()
    }

    /// The classified urgency, if the report has been classified.
    #[must_use]
    pub fn classified_urgency(&self) -> Option<Urgency> {
        self.classification.map(|c| c.urgency)
    }

    /// The classification score, if the report has been classified.
    #[must_use]
    pub fn classification_score(&self) -> Option<f64> {
        self.classification.map(|c| c.score)
    }
}

/// Image attached to a new report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Raw image bytes.
    pub bytes: Vec<u8>,
    /// MIME type (e.g. `"image/jpeg"`).
    pub content_type: String,
}

/// Author-supplied fields for a new report.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    /// Place the incident happened at.
    pub place: PlaceSnapshot,
    /// Free text describing the incident.
    pub description: String,
    /// Self-declared urgency.
    pub urgency: Urgency,
    /// Optional attached image.
    pub image: Option<ImageUpload>,
}
