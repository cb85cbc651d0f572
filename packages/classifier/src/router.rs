//! Place-type to sector routing.
//!
//! Called exactly once per report, when it is filed. The mapping is a
//! fixed table with [`Sector::General`] as the fallback, so routing never
//! fails.

use alerta_report_models::Sector;

/// Maps a place type to the sector responsible for responding.
///
/// Matching ignores case and surrounding whitespace, and treats `_` and
/// spaces as `-` so `"Meeting Room"` and `"meeting_room"` both route like
/// `"meeting-room"`.
#[must_use]
pub fn route_sector(place_type: &str) -> Sector {
    let normalized = normalize_place_type(place_type);

    match normalized.as_str() {
        "restroom" | "classroom" | "lab" | "auditorium" | "meeting-room" => Sector::Maintenance,
        "parking" | "entrance" => Sector::Security,
        "courtyard" | "garden" => Sector::Cleaning,
        "cafeteria" | "library" => Sector::Services,
        _ => Sector::General,
    }
}

/// Lower-cases and trims a place type, folding `_` and spaces into `-`.
#[must_use]
pub fn normalize_place_type(place_type: &str) -> String {
    place_type
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '_' || c.is_whitespace() { '-' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_known_types() {
        assert_eq!(route_sector("restroom"), Sector::Maintenance);
        assert_eq!(route_sector("lab"), Sector::Maintenance);
        assert_eq!(route_sector("parking"), Sector::Security);
        assert_eq!(route_sector("entrance"), Sector::Security);
        assert_eq!(route_sector("garden"), Sector::Cleaning);
        assert_eq!(route_sector("library"), Sector::Services);
    }

    #[test]
    fn routing_ignores_case_and_separators() {
        assert_eq!(route_sector("  RESTROOM "), Sector::Maintenance);
        assert_eq!(route_sector("Meeting Room"), Sector::Maintenance);
        assert_eq!(route_sector("meeting_room"), Sector::Maintenance);
    }

    #[test]
    fn unknown_fallback() {
        assert_eq!(route_sector("unknown_type_xyz"), Sector::General);
        assert_eq!(route_sector(""), Sector::General);
        assert_eq!(route_sector("kitchen"), Sector::General);
    }
}
