//! # Canonical Route Store
//!
//! SQLite-backed store for canonical routes, collections and derived segments.
//!
//! ## Tables
//!
//! - `routes`: one row per canonical route. `external_id` is unique when
//!   present; the bounding box columns are either all set or all NULL.
//! - `tours`: raw payload of the last seen external record, keyed by external id.
//! - `collections` / `collection_routes`: many-to-many memberships by integer key.
//! - `route_segments`: the last persisted segmentation result.
//!
//! Query helpers take a `&Connection` so they run unchanged inside a batch
//! transaction or an item savepoint.

use std::collections::HashSet;
use std::path::Path;

use log::info;
use rstar::{RTree, RTreeObject, AABB};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteError};
use crate::segments::{segment_routes, RouteSegment, RouteTrack, SegmentConfig};
use crate::sport::Sport;
use crate::tour::TourRecord;
use crate::transaction::BatchScope;
use crate::{Bounds, Track};

// ============================================================================
// Types
// ============================================================================

/// The persisted route entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CanonicalRoute {
    /// `None` until inserted
    pub id: Option<i64>,
    pub external_id: Option<String>,
    pub name: Option<String>,
    pub sport: Option<Sport>,
    /// Metres
    pub distance: Option<f64>,
    pub elevation_up: Option<f64>,
    pub elevation_down: Option<f64>,
    pub track_file: Option<String>,
    pub track: Track,
    pub bounds: Option<Bounds>,
}

/// Filters for route queries. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteFilter {
    pub sport: Option<Sport>,
    /// Routes in any of these collections
    pub collections: Vec<String>,
    /// Metres
    pub min_distance: Option<f64>,
    /// Metres
    pub max_distance: Option<f64>,
    /// Routes whose bounds intersect this box. Routes without bounds never match.
    pub bounds: Option<Bounds>,
    pub limit: Option<usize>,
}

/// Route bounds entry for the in-memory R-tree.
#[derive(Debug, Clone)]
struct RouteBoundsEntry {
    position: usize,
    bounds: Bounds,
}

impl RTreeObject for RouteBoundsEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        bounds_envelope(&self.bounds)
    }
}

fn bounds_envelope(b: &Bounds) -> AABB<[f64; 2]> {
    AABB::from_corners([b.min_lng, b.min_lat], [b.max_lng, b.max_lat])
}

// ============================================================================
// Store
// ============================================================================

/// Canonical store owning one SQLite connection.
pub struct RouteStore {
    db: Connection,
}

impl RouteStore {
    // ========================================================================
    // Initialization
    // ========================================================================

    /// Open (or create) the store at `db_path`.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db = Connection::open(db_path)?;
        Self::init_schema(&db)?;
        Ok(Self { db })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        Self::init_schema(&db)?;
        Ok(Self { db })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            -- Canonical routes
            CREATE TABLE IF NOT EXISTS routes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id TEXT UNIQUE,
                name TEXT,
                sport TEXT,
                distance REAL,
                elevation_up REAL,
                elevation_down REAL,
                track_file TEXT,
                track BLOB,
                min_lat REAL,
                max_lat REAL,
                min_lng REAL,
                max_lng REAL,
                CHECK (
                    (min_lat IS NULL AND max_lat IS NULL AND min_lng IS NULL AND max_lng IS NULL)
                    OR (min_lat IS NOT NULL AND max_lat IS NOT NULL AND min_lng IS NOT NULL AND max_lng IS NOT NULL)
                )
            );

            -- Raw external records, last seen version
            CREATE TABLE IF NOT EXISTS tours (
                external_id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                changed_at TEXT
            );

            CREATE TABLE IF NOT EXISTS collections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS collection_routes (
                collection_id INTEGER NOT NULL,
                route_id INTEGER NOT NULL,
                PRIMARY KEY (collection_id, route_id),
                FOREIGN KEY (collection_id) REFERENCES collections(id) ON DELETE CASCADE,
                FOREIGN KEY (route_id) REFERENCES routes(id) ON DELETE CASCADE
            );

            -- Persisted segmentation result
            CREATE TABLE IF NOT EXISTS route_segments (
                id INTEGER PRIMARY KEY,
                route_id INTEGER NOT NULL,
                start_point TEXT NOT NULL,
                end_point TEXT NOT NULL,
                geometry TEXT NOT NULL,
                FOREIGN KEY (route_id) REFERENCES routes(id) ON DELETE CASCADE
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_routes_sport ON routes(sport);
            CREATE INDEX IF NOT EXISTS idx_collection_routes_route ON collection_routes(route_id);
            CREATE INDEX IF NOT EXISTS idx_route_segments_route ON route_segments(route_id);

            -- Enable foreign keys
            PRAGMA foreign_keys = ON;
        "#,
        )?;
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.db
    }

    /// Mutable access for callers that manage their own transactions.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.db
    }

    /// Start the outer transaction of an import batch.
    pub fn begin_batch(&mut self) -> Result<BatchScope<'_>> {
        BatchScope::begin(&mut self.db)
    }

    // ========================================================================
    // Routes
    // ========================================================================

    pub fn route(&self, id: i64) -> Result<Option<CanonicalRoute>> {
        get_route(&self.db, id)
    }

    pub fn route_by_external_id(&self, external_id: &str) -> Result<Option<CanonicalRoute>> {
        find_route_by_external_id(&self.db, external_id)
    }

    pub fn route_count(&self) -> Result<usize> {
        let count: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM routes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Delete a route with its memberships and segments.
    pub fn delete_route(&self, id: i64) -> Result<bool> {
        let changed = self.db.execute("DELETE FROM routes WHERE id = ?", params![id])?;
        Ok(changed > 0)
    }

    /// Routes matching `filter`, ordered by id.
    pub fn find_routes(&self, filter: &RouteFilter) -> Result<Vec<CanonicalRoute>> {
        let mut sql = format!("SELECT {} FROM routes r WHERE 1 = 1", ROUTE_COLUMNS);
        let mut values: Vec<Value> = Vec::new();

        if let Some(sport) = filter.sport {
            sql.push_str(" AND r.sport = ?");
            values.push(Value::Text(sport.slug().to_string()));
        }
        if let Some(min) = filter.min_distance {
            sql.push_str(" AND r.distance >= ?");
            values.push(Value::Real(min));
        }
        if let Some(max) = filter.max_distance {
            sql.push_str(" AND r.distance <= ?");
            values.push(Value::Real(max));
        }
        if !filter.collections.is_empty() {
            let placeholders = vec!["?"; filter.collections.len()].join(", ");
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM collection_routes cr \
                 JOIN collections c ON c.id = cr.collection_id \
                 WHERE cr.route_id = r.id AND c.slug IN ({}))",
                placeholders
            ));
            values.extend(filter.collections.iter().cloned().map(Value::Text));
        }
        sql.push_str(" ORDER BY r.id");

        let mut stmt = self.db.prepare(&sql)?;
        let mut routes: Vec<CanonicalRoute> = stmt
            .query_map(params_from_iter(values), route_from_row)?
            .collect::<std::result::Result<_, _>>()?;

        if let Some(bounds) = filter.bounds {
            routes = retain_intersecting(routes, &bounds);
        }
        if let Some(limit) = filter.limit {
            routes.truncate(limit);
        }
        Ok(routes)
    }

    /// Geometry of routes matching `filter`, for segmentation.
    pub fn route_tracks(&self, filter: &RouteFilter) -> Result<Vec<RouteTrack>> {
        Ok(self
            .find_routes(filter)?
            .into_iter()
            .filter_map(|r| match r.id {
                Some(id) if !r.track.is_empty() => Some(RouteTrack::new(id, r.track)),
                _ => None,
            })
            .collect())
    }

    // ========================================================================
    // Collections
    // ========================================================================

    pub fn create_collection(&self, slug: &str, name: &str) -> Result<i64> {
        create_collection(&self.db, slug, name)
    }

    pub fn collection_id(&self, slug: &str) -> Result<Option<i64>> {
        collection_id(&self.db, slug)
    }

    /// Slugs of the collections a route belongs to.
    pub fn collection_slugs(&self, route_id: i64) -> Result<Vec<String>> {
        let mut stmt = self.db.prepare(
            "SELECT c.slug FROM collections c
             JOIN collection_routes cr ON cr.collection_id = c.id
             WHERE cr.route_id = ? ORDER BY c.slug",
        )?;
        let slugs = stmt
            .query_map(params![route_id], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        Ok(slugs)
    }

    /// Raw payload stored for an external record.
    pub fn tour_payload(&self, external_id: &str) -> Result<Option<TourRecord>> {
        let payload: Option<String> = self
            .db
            .query_row(
                "SELECT payload FROM tours WHERE external_id = ?",
                params![external_id],
                |row| row.get(0),
            )
            .optional()?;
        payload
            .map(|p| serde_json::from_str(&p).map_err(RouteError::from))
            .transpose()
    }

    // ========================================================================
    // Segments
    // ========================================================================

    /// Segment the routes matching `filter`.
    pub fn compute_segments(
        &self,
        filter: &RouteFilter,
        config: &SegmentConfig,
    ) -> Result<Vec<RouteSegment>> {
        let tracks = self.route_tracks(filter)?;
        Ok(segment_routes(&tracks, config))
    }

    /// Replace the persisted segment set with `segments`.
    pub fn save_segments(&mut self, segments: &[RouteSegment]) -> Result<()> {
        let tx = self.db.transaction()?;
        tx.execute("DELETE FROM route_segments", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO route_segments (id, route_id, start_point, end_point, geometry)
                 VALUES (?, ?, ?, ?, ?)",
            )?;
            for segment in segments {
                stmt.execute(params![
                    segment.id as i64,
                    segment.route_id,
                    serde_json::to_string(&segment.start_point)?,
                    serde_json::to_string(&segment.end_point)?,
                    serde_json::to_string(&segment.geometry)?,
                ])?;
            }
        }
        tx.commit()?;
        info!("[RouteStore] Saved {} segments", segments.len());
        Ok(())
    }

    pub fn segments(&self) -> Result<Vec<RouteSegment>> {
        let mut stmt = self.db.prepare(
            "SELECT id, route_id, start_point, end_point, geometry FROM route_segments ORDER BY id",
        )?;
        let rows: Vec<(i64, i64, String, String, String)> = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|(id, route_id, start, end, geometry)| -> Result<RouteSegment> {
                Ok(RouteSegment {
                    id: id as u64,
                    route_id,
                    start_point: serde_json::from_str(&start)?,
                    end_point: serde_json::from_str(&end)?,
                    geometry: serde_json::from_str(&geometry)?,
                })
            })
            .collect()
    }
}

fn retain_intersecting(routes: Vec<CanonicalRoute>, area: &Bounds) -> Vec<CanonicalRoute> {
    let entries: Vec<RouteBoundsEntry> = routes
        .iter()
        .enumerate()
        .filter_map(|(position, r)| r.bounds.map(|bounds| RouteBoundsEntry { position, bounds }))
        .collect();
    let tree = RTree::bulk_load(entries);

    let hits: HashSet<usize> = tree
        .locate_in_envelope_intersecting(&bounds_envelope(area))
        .map(|e| e.position)
        .collect();

    routes
        .into_iter()
        .enumerate()
        .filter(|(position, _)| hits.contains(position))
        .map(|(_, r)| r)
        .collect()
}

// ============================================================================
// Queries
// ============================================================================

const ROUTE_COLUMNS: &str = "r.id, r.external_id, r.name, r.sport, r.distance, r.elevation_up, \
     r.elevation_down, r.track_file, r.track, r.min_lat, r.max_lat, r.min_lng, r.max_lng";

fn route_from_row(row: &Row<'_>) -> rusqlite::Result<CanonicalRoute> {
    let sport: Option<String> = row.get(3)?;
    let blob: Option<Vec<u8>> = row.get(8)?;
    let track: Track = match blob {
        Some(bytes) => rmp_serde::from_slice(&bytes)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Blob, Box::new(e)))?,
        None => Vec::new(),
    };

    let corners: (Option<f64>, Option<f64>, Option<f64>, Option<f64>) =
        (row.get(9)?, row.get(10)?, row.get(11)?, row.get(12)?);
    let bounds = match corners {
        (Some(min_lat), Some(max_lat), Some(min_lng), Some(max_lng)) => Some(Bounds {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }),
        _ => None,
    };

    Ok(CanonicalRoute {
        id: Some(row.get(0)?),
        external_id: row.get(1)?,
        name: row.get(2)?,
        sport: sport.as_deref().and_then(Sport::from_slug),
        distance: row.get(4)?,
        elevation_up: row.get(5)?,
        elevation_down: row.get(6)?,
        track_file: row.get(7)?,
        track,
        bounds,
    })
}

fn encode_track(track: &Track) -> Result<Option<Vec<u8>>> {
    if track.is_empty() {
        return Ok(None);
    }
    Ok(Some(rmp_serde::to_vec(track)?))
}

pub fn get_route(conn: &Connection, id: i64) -> Result<Option<CanonicalRoute>> {
    let sql = format!("SELECT {} FROM routes r WHERE r.id = ?", ROUTE_COLUMNS);
    Ok(conn.query_row(&sql, params![id], route_from_row).optional()?)
}

pub fn find_route_by_external_id(
    conn: &Connection,
    external_id: &str,
) -> Result<Option<CanonicalRoute>> {
    let sql = format!("SELECT {} FROM routes r WHERE r.external_id = ?", ROUTE_COLUMNS);
    Ok(conn
        .query_row(&sql, params![external_id], route_from_row)
        .optional()?)
}

/// Insert a new route and return its id.
pub fn insert_route(conn: &Connection, route: &CanonicalRoute) -> Result<i64> {
    let b = route.bounds;
    conn.execute(
        "INSERT INTO routes (external_id, name, sport, distance, elevation_up, elevation_down,
                             track_file, track, min_lat, max_lat, min_lng, max_lng)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            route.external_id,
            route.name,
            route.sport.map(|s| s.slug()),
            route.distance,
            route.elevation_up,
            route.elevation_down,
            route.track_file,
            encode_track(&route.track)?,
            b.map(|b| b.min_lat),
            b.map(|b| b.max_lat),
            b.map(|b| b.min_lng),
            b.map(|b| b.max_lng),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite every column of an existing route.
pub fn update_route(conn: &Connection, route: &CanonicalRoute) -> Result<()> {
    let id = route
        .id
        .ok_or_else(|| RouteError::reconcile(route.external_id.clone().unwrap_or_default(), "route has no id"))?;
    let b = route.bounds;
    conn.execute(
        "UPDATE routes SET external_id = ?, name = ?, sport = ?, distance = ?, elevation_up = ?,
                elevation_down = ?, track_file = ?, track = ?, min_lat = ?, max_lat = ?,
                min_lng = ?, max_lng = ?
         WHERE id = ?",
        params![
            route.external_id,
            route.name,
            route.sport.map(|s| s.slug()),
            route.distance,
            route.elevation_up,
            route.elevation_down,
            route.track_file,
            encode_track(&route.track)?,
            b.map(|b| b.min_lat),
            b.map(|b| b.max_lat),
            b.map(|b| b.min_lng),
            b.map(|b| b.max_lng),
            id,
        ],
    )?;
    Ok(())
}

pub fn collection_id(conn: &Connection, slug: &str) -> Result<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT id FROM collections WHERE slug = ?",
            params![slug],
            |row| row.get(0),
        )
        .optional()?)
}

/// Create a collection unless the slug exists. Returns its id.
pub fn create_collection(conn: &Connection, slug: &str, name: &str) -> Result<i64> {
    conn.execute(
        "INSERT OR IGNORE INTO collections (slug, name) VALUES (?, ?)",
        params![slug, name],
    )?;
    let id = conn.query_row(
        "SELECT id FROM collections WHERE slug = ?",
        params![slug],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn membership_exists(conn: &Connection, route_id: i64, collection_id: i64) -> Result<bool> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM collection_routes WHERE collection_id = ? AND route_id = ?",
            params![collection_id, route_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    Ok(exists)
}

pub fn add_membership(conn: &Connection, route_id: i64, collection_id: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO collection_routes (collection_id, route_id) VALUES (?, ?)",
        params![collection_id, route_id],
    )?;
    Ok(())
}

/// Store the raw record, replacing any earlier version.
pub fn upsert_tour(conn: &Connection, record: &TourRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO tours (external_id, payload, changed_at) VALUES (?, ?, ?)
         ON CONFLICT(external_id) DO UPDATE SET
             payload = excluded.payload,
             changed_at = excluded.changed_at",
        params![
            record.id,
            serde_json::to_string(record)?,
            record.changed_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeoPoint;

    fn sample_route(external_id: &str, lat: f64) -> CanonicalRoute {
        let track: Track = (0..20)
            .map(|i| GeoPoint::new(lat + i as f64 * 0.001, 5.10 + i as f64 * 0.0005, 3.0))
            .collect();
        CanonicalRoute {
            external_id: Some(external_id.to_string()),
            name: Some(format!("Route {}", external_id)),
            sport: Some(Sport::GravelBike),
            distance: Some(2500.0),
            bounds: Bounds::from_points(&track),
            track,
            ..CanonicalRoute::default()
        }
    }

    #[test]
    fn test_create_store() {
        let store = RouteStore::in_memory().unwrap();
        assert_eq!(store.route_count().unwrap(), 0);
    }

    #[test]
    fn test_insert_and_read_back() {
        let store = RouteStore::in_memory().unwrap();
        let mut route = sample_route("100", 52.0);
        let id = insert_route(store.connection(), &route).unwrap();
        route.id = Some(id);

        assert_eq!(store.route(id).unwrap(), Some(route.clone()));
        assert_eq!(store.route_by_external_id("100").unwrap(), Some(route));
        assert!(store.route_by_external_id("404").unwrap().is_none());
    }

    #[test]
    fn test_route_without_geometry() {
        let store = RouteStore::in_memory().unwrap();
        let route = CanonicalRoute {
            external_id: Some("7".to_string()),
            name: Some("Bare".to_string()),
            ..CanonicalRoute::default()
        };
        let id = insert_route(store.connection(), &route).unwrap();
        let loaded = store.route(id).unwrap().unwrap();
        assert!(loaded.track.is_empty());
        assert!(loaded.bounds.is_none());
    }

    #[test]
    fn test_external_id_is_unique() {
        let store = RouteStore::in_memory().unwrap();
        insert_route(store.connection(), &sample_route("1", 52.0)).unwrap();
        assert!(insert_route(store.connection(), &sample_route("1", 52.0)).is_err());
    }

    #[test]
    fn test_collections() {
        let store = RouteStore::in_memory().unwrap();
        let route_id = insert_route(store.connection(), &sample_route("1", 52.0)).unwrap();
        let c1 = store.create_collection("gravelritten", "Gravelritten").unwrap();
        let again = store.create_collection("gravelritten", "Renamed").unwrap();
        assert_eq!(c1, again);

        assert!(!membership_exists(store.connection(), route_id, c1).unwrap());
        add_membership(store.connection(), route_id, c1).unwrap();
        assert!(membership_exists(store.connection(), route_id, c1).unwrap());
        assert_eq!(store.collection_slugs(route_id).unwrap(), vec!["gravelritten"]);
        assert!(store.collection_id("unknown").unwrap().is_none());
    }

    #[test]
    fn test_find_routes_filters() {
        let store = RouteStore::in_memory().unwrap();
        let a = insert_route(store.connection(), &sample_route("a", 52.0)).unwrap();
        let mut far = sample_route("b", 40.0);
        far.sport = Some(Sport::Hike);
        far.distance = Some(12_000.0);
        let b = insert_route(store.connection(), &far).unwrap();
        let bare = CanonicalRoute {
            external_id: Some("c".to_string()),
            ..CanonicalRoute::default()
        };
        insert_route(store.connection(), &bare).unwrap();

        let collection = store.create_collection("weekend", "Weekend").unwrap();
        add_membership(store.connection(), b, collection).unwrap();

        let ids = |filter: RouteFilter| -> Vec<i64> {
            store
                .find_routes(&filter)
                .unwrap()
                .into_iter()
                .filter_map(|r| r.id)
                .collect()
        };

        assert_eq!(ids(RouteFilter::default()).len(), 3);
        assert_eq!(
            ids(RouteFilter {
                sport: Some(Sport::Hike),
                ..RouteFilter::default()
            }),
            vec![b]
        );
        assert_eq!(
            ids(RouteFilter {
                min_distance: Some(5_000.0),
                ..RouteFilter::default()
            }),
            vec![b]
        );
        assert_eq!(
            ids(RouteFilter {
                collections: vec!["weekend".to_string()],
                ..RouteFilter::default()
            }),
            vec![b]
        );
        assert_eq!(
            ids(RouteFilter {
                bounds: Some(Bounds {
                    min_lat: 51.9,
                    max_lat: 52.005,
                    min_lng: 5.0,
                    max_lng: 5.2,
                }),
                ..RouteFilter::default()
            }),
            vec![a]
        );
        assert_eq!(
            ids(RouteFilter {
                limit: Some(1),
                ..RouteFilter::default()
            }),
            vec![a]
        );
    }

    #[test]
    fn test_segments_round_trip_and_cascade() {
        let mut store = RouteStore::in_memory().unwrap();
        let id = insert_route(store.connection(), &sample_route("1", 52.0)).unwrap();
        let other = insert_route(store.connection(), &sample_route("2", 53.0)).unwrap();
        let segment = RouteSegment {
            id: 1,
            route_id: id,
            start_point: [52.0, 5.1],
            end_point: [52.01, 5.105],
            geometry: [[52.0, 5.1], [52.01, 5.105]],
        };
        let kept = RouteSegment {
            id: 2,
            route_id: other,
            start_point: [53.0, 5.1],
            end_point: [53.01, 5.105],
            geometry: [[53.0, 5.1], [53.01, 5.105]],
        };
        store.save_segments(&[segment.clone(), kept.clone()]).unwrap();
        assert_eq!(store.segments().unwrap(), vec![segment, kept.clone()]);

        // Deleting a route takes its segments with it
        assert!(store.delete_route(id).unwrap());
        assert_eq!(store.route_count().unwrap(), 1);
        assert_eq!(store.segments().unwrap(), vec![kept]);

        assert!(store.delete_route(other).unwrap());
        assert!(store.segments().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_tour() {
        let store = RouteStore::in_memory().unwrap();
        let mut record = TourRecord::new("55", Some("First"));
        upsert_tour(store.connection(), &record).unwrap();
        record.name = Some("Second".to_string());
        upsert_tour(store.connection(), &record).unwrap();

        let stored = store.tour_payload("55").unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("Second"));
        assert!(store.tour_payload("56").unwrap().is_none());
    }

    #[test]
    fn test_reopen_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.db");
        {
            let store = RouteStore::new(&path).unwrap();
            insert_route(store.connection(), &sample_route("1", 52.0)).unwrap();
        }
        let store = RouteStore::new(&path).unwrap();
        assert_eq!(store.route_count().unwrap(), 1);
    }
}
