#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Read-only analytics over incident reports.
//!
//! [`aggregate::aggregate`] computes the classification dashboard and
//! [`stats`] the per-role statistics. Both take an already-fetched slice
//! of reports, never mutate it, and define a neutral value for every
//! empty denominator so they cannot fail.

pub mod aggregate;
pub mod stats;

use chrono::{DateTime, Utc};

pub use aggregate::aggregate;

/// Elapsed minutes from `from` to `to`.
#[allow(clippy::cast_precision_loss)]
fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}

/// Elapsed hours from `from` to `to`.
fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    minutes_between(from, to) / 60.0
}

/// Arithmetic mean, `0.0` for an empty slice.
#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// `part / whole` as a percentage with `decimals` places, `0.0` when
/// `whole` is zero.
#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, whole: usize, decimals: i32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round_to(part as f64 / whole as f64 * 100.0, decimals)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_guards_zero_denominator() {
        assert!(percent(3, 0, 1).abs() < f64::EPSILON);
        assert!((percent(1, 3, 1) - 33.3).abs() < 1e-9);
        assert!((percent(2, 3, 2) - 66.67).abs() < 1e-9);
    }

    #[test]
    fn mean_of_nothing_is_zero() {
        assert!(mean(&[]).abs() < f64::EPSILON);
        assert!((mean(&[1.0, 2.0]) - 1.5).abs() < f64::EPSILON);
    }
}
