#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report lifecycle for `AlertaUTEC`.
//!
//! [`ReportService`] files reports and runs the `PENDING -> IN_PROGRESS ->
//! RESOLVED` transitions; [`ClassificationSweep`] attaches machine urgency
//! to open reports and raises alerts. Both publish [`NotificationEvent`]s
//! through an [`EventPublisher`] on a best-effort basis.

mod error;
pub mod notify;
pub mod service;
pub mod sweep;

pub use error::LifecycleError;
pub use notify::{BroadcastPublisher, EventPublisher, LogPublisher, NotificationEvent};
pub use service::ReportService;
pub use sweep::{ClassificationSweep, SweepOutcome};
