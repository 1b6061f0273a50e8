//! # Route Intersection Segmentation
//!
//! Splits routes into segments bounded by the points where they cross other
//! routes.
//!
//! ## Algorithm
//! 1. Treat each track as a planar polyline with x = latitude, y = longitude
//! 2. For every unordered pair of routes with overlapping bounds, intersect
//!    the two polylines (R-tree over edges, finite points only)
//! 3. Keep crossings within `tolerance_meters` of the route being split
//! 4. Sort the kept points by x (then y) and emit one segment per consecutive pair
//!
//! Routes with fewer than `min_points` crossings against a partner get no
//! segments from that pair, so a single touch never bounds a segment.
//!
//! ## Limitations
//! - Pairwise comparison is O(n²) in the number of routes.
//! - Sorting by x is not an along-track ordering. A route that doubles back in
//!   latitude can yield segments joining points that are not adjacent on the path.
//! - Planar degrees are an approximation, fine at city or regional scale.

mod intersect;
mod rtree;

pub use intersect::{find_crossings, within_buffer, Crossings};

use geo::{Coord, LineString};
use log::{debug, info};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geo_utils::{meters_to_degrees, METERS_PER_DEGREE};
use crate::{Bounds, GeoPoint, Track};

/// Configuration for segmentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Crossings further than this from a route are ignored for it (meters)
    pub tolerance_meters: f64,
    /// Minimum crossings a route needs against one partner to be split
    pub min_points: usize,
    /// Planar conversion factor
    pub meters_per_degree: f64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            tolerance_meters: 10.0,
            min_points: 2,
            meters_per_degree: METERS_PER_DEGREE,
        }
    }
}

impl SegmentConfig {
    fn tolerance_degrees(&self) -> f64 {
        meters_to_degrees(self.tolerance_meters, self.meters_per_degree)
    }
}

/// A persisted route's id and geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTrack {
    pub route_id: i64,
    pub points: Track,
}

impl RouteTrack {
    pub fn new(route_id: i64, points: Track) -> Self {
        Self { route_id, points }
    }
}

/// Part of a route between two consecutive crossings with another route.
///
/// Coordinates are `[lat, lng]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub id: u64,
    pub route_id: i64,
    pub start_point: [f64; 2],
    pub end_point: [f64; 2],
    pub geometry: [[f64; 2]; 2],
}

struct Polyline {
    route_id: i64,
    line: LineString<f64>,
    bounds: Option<Bounds>,
}

impl Polyline {
    fn from_track(track: &RouteTrack) -> Self {
        let finite: Vec<GeoPoint> = track
            .points
            .iter()
            .copied()
            .filter(|p| p.lat.is_finite() && p.lng.is_finite())
            .collect();
        Self {
            route_id: track.route_id,
            line: track
                .points
                .iter()
                .map(|p| Coord { x: p.lat, y: p.lng })
                .collect(),
            bounds: Bounds::from_points(&finite),
        }
    }
}

/// Segment every pair of routes. Ids start at 1 and follow pair order.
pub fn segment_routes(routes: &[RouteTrack], config: &SegmentConfig) -> Vec<RouteSegment> {
    let polylines: Vec<Polyline> = routes.iter().map(Polyline::from_track).collect();
    let margin = config.tolerance_degrees();

    let pairs: Vec<(usize, usize)> = (0..polylines.len())
        .flat_map(|i| ((i + 1)..polylines.len()).map(move |j| (i, j)))
        .filter(|&(i, j)| match (&polylines[i].bounds, &polylines[j].bounds) {
            (Some(a), Some(b)) => a.expand(margin).intersects(b),
            _ => false,
        })
        .collect();

    debug!(
        "[Segmenter] {} routes, {} candidate pairs",
        polylines.len(),
        pairs.len()
    );

    #[cfg(feature = "parallel")]
    let per_pair: Vec<Vec<(i64, [f64; 2], [f64; 2])>> = pairs
        .par_iter()
        .map(|&(i, j)| segment_pair_or_empty(&polylines[i], &polylines[j], config))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let per_pair: Vec<Vec<(i64, [f64; 2], [f64; 2])>> = pairs
        .iter()
        .map(|&(i, j)| segment_pair_or_empty(&polylines[i], &polylines[j], config))
        .collect();

    let segments: Vec<RouteSegment> = per_pair
        .into_iter()
        .flatten()
        .zip(1u64..)
        .map(|((route_id, start, end), id)| RouteSegment {
            id,
            route_id,
            start_point: start,
            end_point: end,
            geometry: [start, end],
        })
        .collect();

    info!(
        "[Segmenter] Produced {} segments from {} pairs",
        segments.len(),
        pairs.len()
    );
    segments
}

fn segment_pair_or_empty(
    a: &Polyline,
    b: &Polyline,
    config: &SegmentConfig,
) -> Vec<(i64, [f64; 2], [f64; 2])> {
    match segment_pair(a, b, config) {
        Ok(segments) => segments,
        Err(e) => {
            debug!(
                "[Segmenter] Routes {} and {}: {}, treating as no intersection",
                a.route_id, b.route_id, e
            );
            Vec::new()
        }
    }
}

fn segment_pair(
    a: &Polyline,
    b: &Polyline,
    config: &SegmentConfig,
) -> Result<Vec<(i64, [f64; 2], [f64; 2])>> {
    let crossings = find_crossings(&a.line, &b.line)?.into_points();
    if crossings.is_empty() {
        return Ok(Vec::new());
    }

    let radius = config.tolerance_degrees();
    let mut out = Vec::new();
    for route in [a, b] {
        let mut points: Vec<Coord<f64>> = crossings
            .iter()
            .copied()
            .filter(|p| within_buffer(&route.line, *p, radius))
            .collect();

        if points.len() < config.min_points.max(2) {
            continue;
        }

        points.sort_by(|p, q| p.x.total_cmp(&q.x).then(p.y.total_cmp(&q.y)));
        out.extend(
            points
                .windows(2)
                .map(|w| (route.route_id, [w[0].x, w[0].y], [w[1].x, w[1].y])),
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: i64, coords: &[(f64, f64)]) -> RouteTrack {
        RouteTrack::new(
            id,
            coords
                .iter()
                .map(|&(lat, lng)| GeoPoint::new(lat, lng, 0.0))
                .collect(),
        )
    }

    fn straight() -> RouteTrack {
        track(1, &[(0.0, 0.0), (10.0, 0.0)])
    }

    fn zigzag() -> RouteTrack {
        track(2, &[(1.0, -1.0), (2.0, 1.0), (3.0, -1.0), (4.0, 1.0)])
    }

    #[test]
    fn test_single_touch_produces_nothing() {
        let a = track(1, &[(0.0, 0.0), (1.0, 1.0)]);
        let b = track(2, &[(1.0, 1.0), (2.0, 0.0)]);
        assert!(segment_routes(&[a, b], &SegmentConfig::default()).is_empty());
    }

    #[test]
    fn test_zigzag_crossings() {
        let segments = segment_routes(&[straight(), zigzag()], &SegmentConfig::default());

        // Three crossings at x = 1.5, 2.5, 3.5 give two segments per route
        assert_eq!(segments.len(), 4);
        assert_eq!(
            segments.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );

        let first: Vec<_> = segments.iter().filter(|s| s.route_id == 1).collect();
        assert_eq!(first.len(), 2);
        assert!((first[0].start_point[0] - 1.5).abs() < 1e-9);
        assert!((first[0].end_point[0] - 2.5).abs() < 1e-9);
        assert!((first[1].end_point[0] - 3.5).abs() < 1e-9);
        assert_eq!(first[0].geometry, [first[0].start_point, first[0].end_point]);

        assert_eq!(segments.iter().filter(|s| s.route_id == 2).count(), 2);
    }

    #[test]
    fn test_non_finite_vertices_never_leak() {
        let b = track(
            2,
            &[(1.0, -1.0), (2.0, 1.0), (f64::NAN, f64::NAN), (3.0, -1.0), (4.0, 1.0)],
        );
        let segments = segment_routes(&[straight(), b], &SegmentConfig::default());

        assert!(!segments.is_empty());
        for s in &segments {
            for c in s.start_point.iter().chain(s.end_point.iter()) {
                assert!(c.is_finite());
            }
        }
    }

    #[test]
    fn test_degenerate_route_is_skipped() {
        let lonely = track(3, &[(2.0, 0.0)]);
        let segments = segment_routes(&[straight(), lonely, zigzag()], &SegmentConfig::default());
        // The pair without the degenerate route is unaffected
        assert_eq!(segments.len(), 4);
    }

    #[test]
    fn test_collinear_overlap_bounds_a_segment() {
        let b = track(2, &[(2.0, 0.0), (5.0, 0.0)]);
        let segments = segment_routes(&[straight(), b], &SegmentConfig::default());
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start_point, [2.0, 0.0]);
        assert_eq!(segments[0].end_point, [5.0, 0.0]);
    }

    #[test]
    fn test_disjoint_routes() {
        let far = track(2, &[(50.0, 50.0), (51.0, 51.0)]);
        assert!(segment_routes(&[straight(), far], &SegmentConfig::default()).is_empty());
        assert!(segment_routes(&[], &SegmentConfig::default()).is_empty());
    }
}
