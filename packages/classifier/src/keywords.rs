//! Risk keyword tables used by the classifier and keyword analytics.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Keywords that indicate a threat to people or property.
pub const HIGH_RISK_KEYWORDS: &[&str] = &[
    "theft",
    "violence",
    "security",
    "fire",
    "smoke",
    "emergency",
];

/// Keywords that indicate infrastructure damage.
pub const MEDIUM_RISK_KEYWORDS: &[&str] = &[
    "leak",
    "water",
    "electricity",
    "damage",
    "broken",
    "system",
];

/// Which keyword table a keyword belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskTier {
    /// From [`HIGH_RISK_KEYWORDS`].
    High,
    /// From [`MEDIUM_RISK_KEYWORDS`].
    Medium,
}

impl RiskTier {
    /// Score contribution of one matched keyword, in hundredths.
    #[must_use]
    pub const fn points(self) -> u32 {
        match self {
            Self::High => 30,
            Self::Medium => 15,
        }
    }
}

/// Iterates every known keyword with its tier, high-risk table first.
pub fn all_keywords() -> impl Iterator<Item = (&'static str, RiskTier)> {
    HIGH_RISK_KEYWORDS
        .iter()
        .map(|kw| (*kw, RiskTier::High))
        .chain(MEDIUM_RISK_KEYWORDS.iter().map(|kw| (*kw, RiskTier::Medium)))
}

/// Returns the keywords found as substrings of `description`.
///
/// Matching is case-insensitive. Each keyword is reported at most once,
/// in table order.
#[must_use]
pub fn matched_keywords(description: &str) -> Vec<(&'static str, RiskTier)> {
    let lower = description.to_lowercase();
    all_keywords()
        .filter(|(kw, _)| lower.contains(kw))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_do_not_overlap() {
        for kw in HIGH_RISK_KEYWORDS {
            assert!(
                !MEDIUM_RISK_KEYWORDS.contains(kw),
                "{kw} appears in both tables"
            );
        }
    }

    #[test]
    fn matches_are_case_insensitive_substrings() {
        let found = matched_keywords("Water LEAK near the Fire exit");
        assert_eq!(
            found,
            vec![
                ("fire", RiskTier::High),
                ("leak", RiskTier::Medium),
                ("water", RiskTier::Medium),
            ]
        );
    }

    #[test]
    fn repeated_keyword_is_reported_once() {
        let found = matched_keywords("fire fire fire");
        assert_eq!(found, vec![("fire", RiskTier::High)]);
    }

    #[test]
    fn no_matches_for_neutral_text() {
        assert!(matched_keywords("the projector needs a new bulb").is_empty());
    }
}
