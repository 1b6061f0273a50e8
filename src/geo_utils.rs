//! Geographic utilities shared by the reconciler and the segmenter.

use geo::{Distance, Haversine, Point};

use crate::GeoPoint;

/// Default metres per degree for the planar approximation.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Convert a distance in metres to planar degrees.
#[inline]
pub fn meters_to_degrees(meters: f64, meters_per_degree: f64) -> f64 {
    meters / meters_per_degree
}

/// Great-circle distance between two points in metres.
pub fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let a = Point::new(p1.lng, p1.lat);
    let b = Point::new(p2.lng, p2.lat);
    Haversine::distance(a, b)
}

/// Length of a track in metres, ignoring elevation.
pub fn polyline_length(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}
