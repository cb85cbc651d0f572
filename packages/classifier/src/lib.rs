#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Heuristic urgency classifier and sector router.
//!
//! [`classify`] scores a report from its description keywords, its place
//! type and the author's declared urgency, then maps the score to an
//! [`Urgency`] class. Scoring is done in integer hundredths so thresholds
//! are exact and the result is reproducible bit-for-bit.

pub mod keywords;
pub mod router;

use alerta_report_models::{Classification, Report, Urgency};

pub use router::route_sector;

/// Score at or above which a report is classified [`Urgency::High`].
pub const HIGH_THRESHOLD: f64 = 0.70;

/// Score at or above which a report is classified [`Urgency::Medium`].
pub const MEDIUM_THRESHOLD: f64 = 0.40;

const HIGH_THRESHOLD_POINTS: u32 = 70;
const MEDIUM_THRESHOLD_POINTS: u32 = 40;
const MAX_POINTS: u32 = 100;

/// Attributes the classifier looks at.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationInput<'a> {
    /// Urgency chosen by the author.
    pub declared_urgency: Urgency,
    /// Free-text description.
    pub description: &'a str,
    /// Place type of the incident location.
    pub place_type: &'a str,
}

impl<'a> From<&'a Report> for ClassificationInput<'a> {
    fn from(report: &'a Report) -> Self {
        Self {
            declared_urgency: report.declared_urgency,
            description: &report.description,
            place_type: &report.place.place_type,
        }
    }
}

/// Classifies a report.
#[must_use]
pub fn classify(report: &Report) -> Classification {
    classify_input(&ClassificationInput::from(report))
}

/// Classifies raw incident attributes.
///
/// The score is the sum of keyword hits, a place-type bonus and a prior
/// from the declared urgency, clamped to `[0, 1]`.
#[must_use]
pub fn classify_input(input: &ClassificationInput<'_>) -> Classification {
    let keyword_points: u32 = keywords::matched_keywords(input.description)
        .iter()
        .map(|(_, tier)| tier.points())
        .sum();

    let points = (keyword_points
        + place_bonus_points(input.place_type)
        + declared_prior_points(input.declared_urgency))
    .min(MAX_POINTS);

    Classification {
        urgency: urgency_for_points(points),
        score: f64::from(points) / 100.0,
    }
}

/// Maps a score in `[0, 1]` to its urgency class.
#[must_use]
pub fn urgency_for_score(score: f64) -> Urgency {
    if score >= HIGH_THRESHOLD {
        Urgency::High
    } else if score >= MEDIUM_THRESHOLD {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

const fn urgency_for_points(points: u32) -> Urgency {
    if points >= HIGH_THRESHOLD_POINTS {
        Urgency::High
    } else if points >= MEDIUM_THRESHOLD_POINTS {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

fn place_bonus_points(place_type: &str) -> u32 {
    match router::normalize_place_type(place_type).as_str() {
        "restroom" | "kitchen" => 10,
        "entrance" | "parking" => 15,
        _ => 0,
    }
}

const fn declared_prior_points(declared: Urgency) -> u32 {
    match declared {
        Urgency::High => 40,
        Urgency::Medium => 20,
        Urgency::Low => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(
        declared_urgency: Urgency,
        description: &'a str,
        place_type: &'a str,
    ) -> ClassificationInput<'a> {
        ClassificationInput {
            declared_urgency,
            description,
            place_type,
        }
    }

    #[test]
    fn declared_high_alone_lands_on_medium_boundary() {
        let c = classify_input(&input(Urgency::High, "projector flickers", "classroom"));
        assert!((c.score - 0.40).abs() < f64::EPSILON);
        assert_eq!(c.urgency, Urgency::Medium);
    }

    #[test]
    fn two_high_keywords_without_prior_stay_medium() {
        let c = classify_input(&input(
            Urgency::Low,
            "theft and violence reported",
            "classroom",
        ));
        assert!((c.score - 0.60).abs() < f64::EPSILON);
        assert_eq!(c.urgency, Urgency::Medium);
    }

    #[test]
    fn place_bonus_and_prior_reach_high() {
        // fire (30) + parking (15) + MEDIUM prior (20) = 65 -> MEDIUM
        let c = classify_input(&input(Urgency::Medium, "small fire", "parking"));
        assert!((c.score - 0.65).abs() < f64::EPSILON);
        assert_eq!(c.urgency, Urgency::Medium);

        // fire (30) + parking (15) + HIGH prior (40) = 85 -> HIGH
        let c = classify_input(&input(Urgency::High, "small fire", "parking"));
        assert!((c.score - 0.85).abs() < f64::EPSILON);
        assert_eq!(c.urgency, Urgency::High);
    }

    #[test]
    fn medium_keywords_and_restroom_bonus() {
        // leak (15) + water (15) + restroom (10) = 40 -> MEDIUM, exactly on threshold
        let c = classify_input(&input(Urgency::Low, "Water leak under sink", "Restroom"));
        assert!((c.score - 0.40).abs() < f64::EPSILON);
        assert_eq!(c.urgency, Urgency::Medium);
    }

    #[test]
    fn score_is_clamped_to_one() {
        let c = classify_input(&input(
            Urgency::Low,
            "theft violence security fire smoke emergency",
            "entrance",
        ));
        assert!((c.score - 1.0).abs() < f64::EPSILON);
        assert_eq!(c.urgency, Urgency::High);

        let c = classify_input(&input(
            Urgency::High,
            "theft violence security fire",
            "parking",
        ));
        assert!((c.score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn neutral_low_report_scores_zero() {
        let c = classify_input(&input(Urgency::Low, "chair is wobbly", "library"));
        assert!(c.score.abs() < f64::EPSILON);
        assert_eq!(c.urgency, Urgency::Low);
    }

    #[test]
    fn classification_is_deterministic() {
        let samples = [
            input(Urgency::Low, "broken window, water everywhere", "restroom"),
            input(Urgency::Medium, "security guard absent", "entrance"),
            input(Urgency::High, "", ""),
        ];
        for sample in &samples {
            let first = classify_input(sample);
            for _ in 0..10 {
                assert_eq!(classify_input(sample), first);
            }
        }
    }

    #[test]
    fn scores_always_in_range_with_two_decimals() {
        let descriptions = ["", "fire", "leak water damage", "theft fire system broken"];
        let places = ["restroom", "parking", "garden", "unknown"];
        for declared in Urgency::all() {
            for description in descriptions {
                for place in places {
                    let c = classify_input(&input(*declared, description, place));
                    assert!((0.0..=1.0).contains(&c.score));
                    let scaled = c.score * 100.0;
                    assert!((scaled - scaled.round()).abs() < 1e-9);
                    assert_eq!(c.urgency, urgency_for_score(c.score));
                }
            }
        }
    }

    #[test]
    fn classify_reads_report_fields() {
        use alerta_report_models::{PlaceSnapshot, ReportStatus, Sector};

        let now = chrono::Utc::now();
        let report = Report {
            id: "r-1".to_string(),
            place: PlaceSnapshot {
                id: "p-1".to_string(),
                name: "Main gate".to_string(),
                place_type: "entrance".to_string(),
                building: None,
                floor: None,
            },
            description: "Emergency: smoke near the gate".to_string(),
            declared_urgency: Urgency::Medium,
            classification: None,
            is_auto_classified: false,
            status: ReportStatus::Pending,
            sector: Sector::Security,
            assigned_to: None,
            author_id: "s-1".to_string(),
            image_ref: None,
            notification_sent_at: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        };

        // smoke (30) + emergency (30) + entrance (15) + MEDIUM prior (20) = 95
        let c = classify(&report);
        assert!((c.score - 0.95).abs() < f64::EPSILON);
        assert_eq!(c.urgency, Urgency::High);
    }
}
