//! # Routebook
//!
//! Route ingestion and geospatial segmentation for cycling and hiking tours.
//!
//! This library provides:
//! - Track file parsing into normalized geo-points
//! - Idempotent reconciliation of external tour records into a canonical SQLite store
//! - Bulk imports with per-record savepoint isolation
//! - Pairwise route intersection segmentation
//!
//! ## Features
//!
//! - **`parallel`** - Segment route pairs in parallel with rayon
//! - **`http`** - Enable the Komoot HTTP tour source
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use routebook::{segment_routes, GeoPoint, RouteTrack, SegmentConfig};
//!
//! let a = RouteTrack::new(1, vec![GeoPoint::new(0.0, 0.0, 0.0), GeoPoint::new(0.001, 0.0, 0.0)]);
//! let b = RouteTrack::new(
//!     2,
//!     vec![
//!         GeoPoint::new(0.0002, -0.0001, 0.0),
//!         GeoPoint::new(0.0004, 0.0001, 0.0),
//!         GeoPoint::new(0.0006, -0.0001, 0.0),
//!     ],
//! );
//!
//! let segments = segment_routes(&[a, b], &SegmentConfig::default());
//! assert_eq!(segments.len(), 2);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, RouteError};

// Geographic utilities (distance, degree conversion)
pub mod geo_utils;

// Sport enumeration and external tag mapping
pub mod sport;
pub use sport::Sport;

// External tour record model
pub mod tour;
pub use tour::{TourRecord, TourStatus, TourType};

// Track file parsing
pub mod gpx;
pub use gpx::parse_track;

// Configuration values
pub mod config;
pub use config::{Credentials, ImportConfig, ReconcileConfig, SourceConfig};

// Tour source contract and pagination
pub mod source;
pub use source::{
    apply_filter, collect_pages, CreatorFilter, TourFilter, TourOwner, TourPage, TourSource,
};

// Track file lookup and caching
pub mod tracks;
pub use tracks::{track_file_name, CachedTracks, TrackDirectory, TrackProvider};

// Canonical SQLite store
pub mod persistence;
pub use persistence::{CanonicalRoute, RouteFilter, RouteStore};

// Batch and per-item transaction scopes
pub mod transaction;
pub use transaction::{BatchScope, ItemScope};

// Import reconciler
pub mod reconcile;
pub use reconcile::{
    merge_route, reconcile_and_commit, reconcile_tour, reconcile_tour_with, Reconciled, RouteDraft,
};

// Bulk import orchestrator
pub mod import;
pub use import::{
    import_tours, run_import, BatchSummary, ImportBatch, ImportOutcome, ImportReport,
    ImportStatus, ReportStatus,
};
#[cfg(feature = "http")]
pub use import::import_from_komoot;

// Route intersection segmentation
pub mod segments;
pub use segments::{segment_routes, RouteSegment, RouteTrack, SegmentConfig};

// HTTP tour source
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::KomootClient;

// ============================================================================
// Core Types
// ============================================================================

/// A track point with latitude, longitude and elevation.
///
/// # Example
/// ```
/// use routebook::GeoPoint;
/// let point = GeoPoint::new(52.3731, 4.8922, 2.0); // Amsterdam
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    pub elevation: f64,
}

impl GeoPoint {
    /// Create a new geo point.
    pub fn new(lat: f64, lng: f64, elevation: f64) -> Self {
        Self {
            lat,
            lng,
            elevation,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat >= -90.0
            && self.lat <= 90.0
            && self.lng >= -180.0
            && self.lng <= 180.0
    }
}

impl From<[f64; 3]> for GeoPoint {
    fn from(p: [f64; 3]) -> Self {
        GeoPoint::new(p[0], p[1], p[2])
    }
}

/// Ordered sequence of points describing a path.
pub type Track = Vec<GeoPoint>;

/// Bounding box for a track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from track points. Returns `None` for an empty track.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.lat);
            max_lat = max_lat.max(p.lat);
            min_lng = min_lng.min(p.lng);
            max_lng = max_lng.max(p.lng);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Whether two boxes share any area or edge.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
            && self.min_lng <= other.max_lng
            && self.max_lng >= other.min_lng
    }

    /// Grow the box by `margin` degrees on every side.
    pub fn expand(&self, margin: f64) -> Bounds {
        Bounds {
            min_lat: self.min_lat - margin,
            max_lat: self.max_lat + margin,
            min_lng: self.min_lng - margin,
            max_lng: self.max_lng + margin,
        }
    }
}
