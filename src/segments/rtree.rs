//! R-tree over the edges of a polyline.

use geo::{Line, LineString};
use rstar::{RTree, RTreeObject, AABB};

/// One polyline edge with its position in the line.
#[derive(Debug, Clone, Copy)]
pub struct IndexedLine {
    pub idx: usize,
    pub line: Line<f64>,
}

impl RTreeObject for IndexedLine {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        line_envelope(&self.line)
    }
}

pub fn line_envelope(line: &Line<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([line.start.x, line.start.y], [line.end.x, line.end.y])
}

pub fn is_finite_line(line: &Line<f64>) -> bool {
    line.start.x.is_finite()
        && line.start.y.is_finite()
        && line.end.x.is_finite()
        && line.end.y.is_finite()
}

/// Index every finite edge. Edges touching a non-finite vertex are left out.
pub fn build_line_index(polyline: &LineString<f64>) -> RTree<IndexedLine> {
    let edges: Vec<IndexedLine> = polyline
        .lines()
        .enumerate()
        .filter(|(_, line)| is_finite_line(line))
        .map(|(idx, line)| IndexedLine { idx, line })
        .collect();
    RTree::bulk_load(edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_non_finite_edges() {
        let ls = LineString::from(vec![(0.0, 0.0), (1.0, 1.0), (f64::NAN, 2.0), (3.0, 3.0)]);
        let tree = build_line_index(&ls);
        assert_eq!(tree.size(), 1);
        assert_eq!(tree.iter().next().unwrap().idx, 0);
    }
}
