//! Pairwise polyline intersection in planar coordinates.

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Closest, ClosestPoint, Coord, LineString, Point};
use super::rtree::{build_line_index, is_finite_line, line_envelope};
use crate::error::{Result, RouteError};

/// Shape of an intersection result.
#[derive(Debug, Clone, PartialEq)]
pub enum Crossings {
    None,
    Single(Coord<f64>),
    Multiple(Vec<Coord<f64>>),
}

impl Crossings {
    fn classify(mut points: Vec<Coord<f64>>) -> Self {
        match points.len() {
            0 => Crossings::None,
            1 => Crossings::Single(points.remove(0)),
            _ => Crossings::Multiple(points),
        }
    }

    pub fn into_points(self) -> Vec<Coord<f64>> {
        match self {
            Crossings::None => Vec::new(),
            Crossings::Single(p) => vec![p],
            Crossings::Multiple(points) => points,
        }
    }
}

/// Finite, de-duplicated intersection points of two polylines.
///
/// A collinear overlap contributes both of its endpoints. Inputs with fewer
/// than two vertices are a [`RouteError::Geometry`].
pub fn find_crossings(a: &LineString<f64>, b: &LineString<f64>) -> Result<Crossings> {
    if a.0.len() < 2 || b.0.len() < 2 {
        return Err(RouteError::Geometry {
            message: format!(
                "polylines need at least 2 vertices (got {} and {})",
                a.0.len(),
                b.0.len()
            ),
        });
    }

    let index = build_line_index(b);
    let mut points: Vec<Coord<f64>> = Vec::new();

    for edge in a.lines().filter(is_finite_line) {
        let envelope = line_envelope(&edge);
        for candidate in index.locate_in_envelope_intersecting(&envelope) {
            match line_intersection(edge, candidate.line) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    points.push(intersection);
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    points.push(intersection.start);
                    points.push(intersection.end);
                }
                None => {}
            }
        }
    }

    points.retain(|p| p.x.is_finite() && p.y.is_finite());
    Ok(Crossings::classify(dedup_points(points)))
}

/// Crossings at shared vertices show up once per adjacent edge.
fn dedup_points(points: Vec<Coord<f64>>) -> Vec<Coord<f64>> {
    const EPS: f64 = 1e-12;
    let mut unique: Vec<Coord<f64>> = Vec::with_capacity(points.len());
    for p in points {
        if !unique
            .iter()
            .any(|q| (q.x - p.x).abs() <= EPS && (q.y - p.y).abs() <= EPS)
        {
            unique.push(p);
        }
    }
    unique
}

/// Whether `point` lies within `radius` planar units of any finite edge.
pub fn within_buffer(polyline: &LineString<f64>, point: Coord<f64>, radius: f64) -> bool {
    let p = Point::from(point);
    polyline
        .lines()
        .filter(is_finite_line)
        .any(|edge| match edge.closest_point(&p) {
            Closest::Intersection(q) | Closest::SinglePoint(q) => {
                (q.x() - p.x()).hypot(q.y() - p.y()) <= radius
            }
            Closest::Indeterminate => false,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_crossing() {
        let a = LineString::from(vec![(0.0, 0.0), (2.0, 2.0)]);
        let b = LineString::from(vec![(0.0, 2.0), (2.0, 0.0)]);
        assert_eq!(
            find_crossings(&a, &b).unwrap(),
            Crossings::Single(Coord { x: 1.0, y: 1.0 })
        );
    }

    #[test]
    fn test_no_crossing() {
        let a = LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]);
        let b = LineString::from(vec![(0.0, 1.0), (1.0, 1.0)]);
        assert_eq!(find_crossings(&a, &b).unwrap(), Crossings::None);
    }

    #[test]
    fn test_shared_vertex_counted_once() {
        // b passes exactly through a's middle vertex
        let a = LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let b = LineString::from(vec![(1.0, -1.0), (1.0, 1.0)]);
        assert_eq!(
            find_crossings(&a, &b).unwrap(),
            Crossings::Single(Coord { x: 1.0, y: 0.0 })
        );
    }

    #[test]
    fn test_collinear_overlap_endpoints() {
        let a = LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]);
        let b = LineString::from(vec![(2.0, 0.0), (5.0, 0.0)]);
        let points = find_crossings(&a, &b).unwrap().into_points();
        assert_eq!(points.len(), 2);
        assert!(points.contains(&Coord { x: 2.0, y: 0.0 }));
        assert!(points.contains(&Coord { x: 5.0, y: 0.0 }));
    }

    #[test]
    fn test_degenerate_input_is_geometry_error() {
        let a = LineString::from(vec![(0.0, 0.0)]);
        let b = LineString::from(vec![(0.0, 1.0), (1.0, 1.0)]);
        assert!(matches!(
            find_crossings(&a, &b),
            Err(RouteError::Geometry { .. })
        ));
    }

    #[test]
    fn test_within_buffer() {
        let line = LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]);
        assert!(within_buffer(&line, Coord { x: 0.5, y: 0.00005 }, 0.0001));
        assert!(!within_buffer(&line, Coord { x: 0.5, y: 0.01 }, 0.0001));
        assert!(!within_buffer(&line, Coord { x: 2.0, y: 0.0 }, 0.0001));
    }
}
