//! # Import Reconciler
//!
//! Turns one external tour record into a canonical route.
//!
//! ## Steps
//! 1. Look up the route by external id, or start a new one
//! 2. Merge the record into it, filling only fields that are still empty
//! 3. If the route has no track yet, load one under the stored track file name
//!    and populate the track and bounds from it
//! 4. Insert or update the route and mirror the raw record
//! 5. Link the route to the requested collection if the slug is known
//!
//! Everything runs on the connection it is given, so the caller decides the
//! unit of work (an item savepoint during bulk imports, or
//! [`reconcile_and_commit`] for a single record).

use log::{debug, warn};
use rusqlite::Connection;

use crate::config::ReconcileConfig;
use crate::error::{OptionExt, Result, RouteError};
use crate::geo_utils::polyline_length;
use crate::gpx::parse_track;
use crate::import::ImportStatus;
use crate::persistence::{self, CanonicalRoute, RouteStore};
use crate::sport::Sport;
use crate::tour::TourRecord;
use crate::tracks::track_file_name;
use crate::Bounds;

/// Validated route fields taken from one tour record.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDraft {
    pub external_id: String,
    pub name: String,
    pub sport: Sport,
    pub distance: Option<f64>,
    pub elevation_up: Option<f64>,
    pub elevation_down: Option<f64>,
    pub track_file: String,
}

impl RouteDraft {
    /// Validate a record. `id` and `name` are required.
    pub fn from_record(record: &TourRecord, config: &ReconcileConfig) -> Result<Self> {
        let external_id = record.id.trim();
        if let Some(error) = &record.decode_error {
            let id = if external_id.is_empty() { "<unknown>" } else { external_id };
            return Err(RouteError::reconcile(id, format!("undecodable record: {}", error)));
        }
        if external_id.is_empty() {
            return Err(RouteError::reconcile("<unknown>", "missing field `id`"));
        }

        let name = record
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_missing_field(external_id, "name")?;

        let sport = record
            .sport
            .as_deref()
            .map(|tag| Sport::from_komoot(tag, config.default_sport))
            .unwrap_or(config.default_sport);

        Ok(Self {
            external_id: external_id.to_string(),
            name: name.to_string(),
            sport,
            distance: record.distance.filter(|d| d.is_finite()),
            elevation_up: record.elevation_up.filter(|e| e.is_finite()),
            elevation_down: record.elevation_down.filter(|e| e.is_finite()),
            track_file: track_file_name(name, &config.track_extension),
        })
    }
}

/// Fill every empty field of `existing` from `draft`. Populated fields win.
pub fn merge_route(existing: &CanonicalRoute, draft: &RouteDraft) -> CanonicalRoute {
    let mut merged = existing.clone();
    merged
        .external_id
        .get_or_insert_with(|| draft.external_id.clone());
    merged.name.get_or_insert_with(|| draft.name.clone());
    merged.sport.get_or_insert(draft.sport);
    if merged.distance.is_none() {
        merged.distance = draft.distance;
    }
    if merged.elevation_up.is_none() {
        merged.elevation_up = draft.elevation_up;
    }
    if merged.elevation_down.is_none() {
        merged.elevation_down = draft.elevation_down;
    }
    merged
        .track_file
        .get_or_insert_with(|| draft.track_file.clone());
    merged
}

/// Result of reconciling one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub route_id: i64,
    pub status: ImportStatus,
    pub membership_created: bool,
}

/// Reconcile `record` on `conn` with track text that is already at hand.
///
/// A track that fails to parse is logged and skipped; the route is still
/// reconciled. An unknown `collection` slug is ignored.
pub fn reconcile_tour(
    conn: &Connection,
    record: &TourRecord,
    track_text: Option<&str>,
    collection: Option<&str>,
    config: &ReconcileConfig,
) -> Result<Reconciled> {
    reconcile_tour_with(conn, record, collection, config, |_| {
        Ok(track_text.map(str::to_string))
    })
}

/// Reconcile `record` on `conn`, loading its track lazily.
///
/// `load_track` receives the route's stored track file name and is called only
/// when the route has no track yet, so a complete route never triggers a
/// lookup. An error from `load_track` fails the record.
pub fn reconcile_tour_with<F>(
    conn: &Connection,
    record: &TourRecord,
    collection: Option<&str>,
    config: &ReconcileConfig,
    load_track: F,
) -> Result<Reconciled>
where
    F: FnOnce(&str) -> Result<Option<String>>,
{
    let draft = RouteDraft::from_record(record, config)?;
    let existing = persistence::find_route_by_external_id(conn, &draft.external_id)?;

    let mut route = merge_route(existing.as_ref().unwrap_or(&CanonicalRoute::default()), &draft);
    if route.track.is_empty() {
        let file_name = route
            .track_file
            .clone()
            .unwrap_or_else(|| draft.track_file.clone());
        if let Some(text) = load_track(&file_name)? {
            populate_geometry(&mut route, &text, &draft.external_id);
        }
    }

    let (route_id, mut status) = match &existing {
        None => (persistence::insert_route(conn, &route)?, ImportStatus::Imported),
        Some(previous) => {
            let id = previous
                .id
                .ok_or_else(|| RouteError::reconcile(&draft.external_id, "stored route has no id"))?;
            if &route != previous {
                persistence::update_route(conn, &route)?;
                (id, ImportStatus::Updated)
            } else {
                (id, ImportStatus::Skipped)
            }
        }
    };

    persistence::upsert_tour(conn, record)?;

    let membership_created = match collection {
        Some(slug) => link_collection(conn, route_id, slug)?,
        None => false,
    };
    if membership_created && status == ImportStatus::Skipped {
        status = ImportStatus::Updated;
    }

    debug!(
        "[Reconciler] Tour {} -> route {} ({:?})",
        draft.external_id, route_id, status
    );

    Ok(Reconciled {
        route_id,
        status,
        membership_created,
    })
}

/// Reconcile one record as its own transaction.
pub fn reconcile_and_commit(
    store: &mut RouteStore,
    record: &TourRecord,
    track_text: Option<&str>,
    collection: Option<&str>,
    config: &ReconcileConfig,
) -> Result<Reconciled> {
    let tx = store.connection_mut().transaction()?;
    let result = reconcile_tour(&tx, record, track_text, collection, config)?;
    tx.commit()?;
    Ok(result)
}

fn populate_geometry(route: &mut CanonicalRoute, text: &str, external_id: &str) {
    let track = match parse_track(text) {
        Ok(track) => track,
        Err(e) => {
            warn!("[Reconciler] Skipping track for tour {}: {}", external_id, e);
            return;
        }
    };

    let Some(bounds) = Bounds::from_points(&track) else {
        debug!("[Reconciler] Track for tour {} has no points", external_id);
        return;
    };

    if route.distance.is_none() {
        route.distance = Some(polyline_length(&track));
    }
    route.bounds = Some(bounds);
    route.track = track;
}

/// Returns whether a new membership was created.
fn link_collection(conn: &Connection, route_id: i64, slug: &str) -> Result<bool> {
    let Some(collection_id) = persistence::collection_id(conn, slug)? else {
        debug!("[Reconciler] Unknown collection '{}', not linking", slug);
        return Ok(false);
    };
    if persistence::membership_exists(conn, route_id, collection_id)? {
        return Ok(false);
    }
    persistence::add_membership(conn, route_id, collection_id)?;
    Ok(true)
}
