//! Closed sport enumeration and the mapping from external sport tags.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Sport a canonical route belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    RaceBike,
    MountainBike,
    GravelBike,
    TouringBike,
    Hike,
    Run,
    Other,
}

/// External (Komoot) sport tags and the sport they map to.
static KOMOOT_SPORTS: Lazy<HashMap<&'static str, Sport>> = Lazy::new(|| {
    HashMap::from([
        ("racebike", Sport::RaceBike),
        ("mtb", Sport::MountainBike),
        ("mtb_easy", Sport::GravelBike),
        ("touringbicycle", Sport::TouringBike),
        ("hike", Sport::Hike),
        ("run", Sport::Run),
        ("jogging", Sport::Run),
    ])
});

impl Sport {
    pub const ALL: [Sport; 7] = [
        Sport::RaceBike,
        Sport::MountainBike,
        Sport::GravelBike,
        Sport::TouringBike,
        Sport::Hike,
        Sport::Run,
        Sport::Other,
    ];

    /// Stable slug used in the store and in track directories.
    pub fn slug(&self) -> &'static str {
        match self {
            Sport::RaceBike => "race_bike",
            Sport::MountainBike => "mountain_bike",
            Sport::GravelBike => "gravel_bike",
            Sport::TouringBike => "touring_bike",
            Sport::Hike => "hike",
            Sport::Run => "run",
            Sport::Other => "other",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Sport> {
        Sport::ALL.into_iter().find(|s| s.slug() == slug)
    }

    /// Map an external sport tag. Unknown tags fall back to `default`.
    pub fn from_komoot(tag: &str, default: Sport) -> Sport {
        KOMOOT_SPORTS
            .get(tag.trim().to_ascii_lowercase().as_str())
            .copied()
            .unwrap_or(default)
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_komoot_mapping() {
        assert_eq!(Sport::from_komoot("racebike", Sport::Other), Sport::RaceBike);
        assert_eq!(Sport::from_komoot("mtb_easy", Sport::Other), Sport::GravelBike);
        assert_eq!(Sport::from_komoot("touringbicycle", Sport::Other), Sport::TouringBike);
        assert_eq!(Sport::from_komoot("MTB", Sport::Other), Sport::MountainBike);
    }

    #[test]
    fn test_unknown_tag_uses_default() {
        assert_eq!(Sport::from_komoot("skitour", Sport::Other), Sport::Other);
        assert_eq!(Sport::from_komoot("", Sport::Hike), Sport::Hike);
    }

    #[test]
    fn test_slug_round_trip() {
        for sport in Sport::ALL {
            assert_eq!(Sport::from_slug(sport.slug()), Some(sport));
        }
        assert_eq!(Sport::from_slug("unicycle"), None);
    }

    #[test]
    fn test_serde_uses_slug() {
        let json = serde_json::to_string(&Sport::GravelBike).unwrap();
        assert_eq!(json, "\"gravel_bike\"");
    }
}
