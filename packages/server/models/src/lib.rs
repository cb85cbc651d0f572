#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the `AlertaUTEC` server.
//!
//! These are kept apart from the domain types so the wire contract can
//! evolve independently. Responses that are plain domain values (reports,
//! analytics) serialize those types directly.

use alerta_report_models::{PlaceSnapshot, Sector, Urgency};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

/// Image attached to a new report, base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiImage {
    /// MIME type, e.g. `image/jpeg`.
    pub content_type: String,
    /// Standard base64 of the image bytes.
    pub data: String,
}

/// `POST /api/reports` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub place: PlaceSnapshot,
    pub description: String,
    pub urgency: Urgency,
    pub image: Option<ApiImage>,
}

/// `POST /api/reports/{id}/take` body. May be omitted entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeReportRequest {
    pub comment: Option<String>,
}

/// `POST /api/reports/{id}/assign` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignReportRequest {
    /// Authority receiving the report.
    pub target_id: String,
    /// Sector of that authority.
    pub target_sector: Sector,
    /// Status to set; validated server-side.
    pub status: String,
    pub comment: Option<String>,
}

/// `POST /api/reports/{id}/status` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    /// Status to set; validated server-side.
    pub status: String,
    pub comment: Option<String>,
}

/// `GET /api/analytics` query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsQueryParams {
    /// `today`, `week`, `month` or `year`. Defaults to `week`.
    pub period: Option<String>,
    /// Sector filter, ignored for authorities.
    pub sector: Option<String>,
}

/// `GET /api/stats` query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsQueryParams {
    pub period: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_parses_camel_case() {
        let body = r#"{
            "place": {"id": "p-1", "name": "Gate 1", "placeType": "entrance"},
            "description": "broken lock",
            "urgency": "HIGH",
            "image": {"contentType": "image/png", "data": "AAEC"}
        }"#;
        let req: CreateReportRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.place.place_type, "entrance");
        assert!(req.place.floor.is_none());
        assert_eq!(req.urgency, Urgency::High);
        assert_eq!(req.image.unwrap().content_type, "image/png");
    }

    #[test]
    fn assign_request_reads_sector() {
        let body = r#"{"targetId": "a-1", "targetSector": "Security", "status": "IN_PROGRESS"}"#;
        let req: AssignReportRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.target_sector, Sector::Security);
        assert!(req.comment.is_none());
    }
}
