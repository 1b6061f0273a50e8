//! External tour records as returned by the tour source.
//!
//! Records are read-only input to the reconciler. Every field except the id is
//! optional, because listings omit fields freely; the reconciler decides which
//! ones are required.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Planned routes versus recorded activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TourType {
    #[serde(rename = "tour_planned")]
    Planned,
    #[serde(rename = "tour_recorded")]
    Recorded,
    #[serde(other)]
    Unknown,
}

impl TourType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TourType::Planned => "tour_planned",
            TourType::Recorded => "tour_recorded",
            TourType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TourStatus {
    Public,
    Private,
    /// Anything else the source reports, e.g. `friends`.
    #[serde(other)]
    Unknown,
}

impl TourStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TourStatus::Public => "public",
            TourStatus::Private => "private",
            TourStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartPoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub alt: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Difficulty {
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub explanation_technical: Option<String>,
    #[serde(default)]
    pub explanation_fitness: Option<String>,
}

/// Share of a surface or way type along the tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryShare {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TourSummary {
    #[serde(default)]
    pub surfaces: Vec<SummaryShare>,
    #[serde(default)]
    pub way_types: Vec<SummaryShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// Planner waypoint along the tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub location: Location,
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub end_index: Option<u32>,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Embedded {
    #[serde(default)]
    pub creator: Option<Creator>,
}

/// One tour as returned by a source listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub tour_type: Option<TourType>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub status: Option<TourStatus>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub changed_at: Option<DateTime<Utc>>,
    /// Metres
    #[serde(default)]
    pub distance: Option<f64>,
    /// Seconds
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub elevation_up: Option<f64>,
    #[serde(default)]
    pub elevation_down: Option<f64>,
    #[serde(default)]
    pub start_point: Option<StartPoint>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub summary: Option<TourSummary>,
    #[serde(default)]
    pub path: Vec<Waypoint>,
    #[serde(rename = "_embedded", default, skip_serializing_if = "Option::is_none")]
    pub embedded: Option<Embedded>,
    /// Set when the listing entry could not be decoded. Such records carry
    /// only their id and are reported as failed imports.
    #[serde(skip)]
    pub decode_error: Option<String>,
}

impl TourRecord {
    /// Minimal record, mostly useful for tests and fakes.
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            tour_type: None,
            name: name.map(str::to_string),
            sport: None,
            status: None,
            date: None,
            changed_at: None,
            distance: None,
            duration: None,
            elevation_up: None,
            elevation_down: None,
            start_point: None,
            difficulty: None,
            summary: None,
            path: Vec::new(),
            embedded: None,
            decode_error: None,
        }
    }

    /// Decode one raw listing entry.
    ///
    /// Never fails: an undecodable entry becomes a placeholder record keyed by
    /// whatever id the entry has (empty if none), with `decode_error` set.
    pub fn from_value(value: Value) -> Self {
        let id = match value.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        match serde_json::from_value::<TourRecord>(value) {
            Ok(record) => record,
            Err(e) => {
                warn!("[TourRecord] Cannot decode tour '{}': {}", id, e);
                let mut record = TourRecord::new(id, None);
                record.decode_error = Some(e.to_string());
                record
            }
        }
    }

    pub fn creator_username(&self) -> Option<&str> {
        self.embedded
            .as_ref()
            .and_then(|e| e.creator.as_ref())
            .map(|c| c.username.as_str())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOUR_JSON: &str = r#"{
        "id": 1234567,
        "type": "tour_planned",
        "name": "Gravel rondje Utrecht",
        "source": "api",
        "status": "public",
        "date": "2024-04-13T09:12:44.000Z",
        "changed_at": "2024-04-14T18:00:00.000+02:00",
        "distance": 84213.5,
        "duration": 14820,
        "elevation_up": 212.0,
        "elevation_down": 209.5,
        "sport": "mtb_easy",
        "start_point": {"lat": 52.09, "lng": 5.12, "alt": 4.0},
        "difficulty": {"grade": "moderate", "explanation_technical": "t", "explanation_fitness": "f"},
        "summary": {
            "surfaces": [{"type": "sf#asphalt", "amount": 0.6}],
            "way_types": [{"type": "wt#cycleway", "amount": 0.4}]
        },
        "path": [{"location": {"lat": 52.09, "lng": 5.12}, "index": 0}],
        "_embedded": {"creator": {"username": "751970492203", "display_name": "Gravelritten"}}
    }"#;

    #[test]
    fn test_deserialize_full_record() {
        let tour: TourRecord = serde_json::from_str(TOUR_JSON).unwrap();
        assert_eq!(tour.id, "1234567");
        assert_eq!(tour.tour_type, Some(TourType::Planned));
        assert_eq!(tour.status, Some(TourStatus::Public));
        assert_eq!(tour.sport.as_deref(), Some("mtb_easy"));
        assert_eq!(tour.distance, Some(84213.5));
        assert_eq!(tour.creator_username(), Some("751970492203"));
        assert_eq!(tour.path.len(), 1);
        assert_eq!(tour.summary.unwrap().surfaces[0].kind, "sf#asphalt");
        assert!(tour.changed_at.unwrap() > tour.date.unwrap());
    }

    #[test]
    fn test_deserialize_sparse_record() {
        let tour: TourRecord = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(tour.id, "abc");
        assert!(tour.name.is_none());
        assert!(tour.path.is_empty());
        assert!(tour.creator_username().is_none());
    }

    #[test]
    fn test_missing_id_is_rejected() {
        assert!(serde_json::from_str::<TourRecord>(r#"{"name": "x"}"#).is_err());
    }

    #[test]
    fn test_unknown_status_and_type_decode() {
        let tour: TourRecord =
            serde_json::from_str(r#"{"id": 2, "status": "friends", "type": "tour_shared"}"#)
                .unwrap();
        assert_eq!(tour.status, Some(TourStatus::Unknown));
        assert_eq!(tour.tour_type, Some(TourType::Unknown));
        assert!(tour.decode_error.is_none());
    }

    #[test]
    fn test_mixed_page_decodes_per_entry() {
        let entries: Vec<Value> = serde_json::from_str(
            r#"[
                {"id": 1, "name": "A", "status": "public"},
                {"id": 2, "name": "B", "status": "friends"},
                {"name": "no id"},
                {"id": 4, "name": "D", "distance": "far"}
            ]"#,
        )
        .unwrap();
        let tours: Vec<TourRecord> = entries.into_iter().map(TourRecord::from_value).collect();

        assert_eq!(tours.len(), 4);
        assert!(tours[0].decode_error.is_none());
        assert_eq!(tours[1].status, Some(TourStatus::Unknown));
        assert!(tours[1].decode_error.is_none());

        assert_eq!(tours[2].id, "");
        assert!(tours[2].decode_error.is_some());
        assert_eq!(tours[3].id, "4");
        assert!(tours[3].name.is_none());
        assert!(tours[3].decode_error.is_some());
    }
}
