//! Point-in-polygon containment over explicit rings (winding number).

use geo::{Coord, LineString, MultiPolygon, Polygon};

/// Where a point lies relative to a ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingPosition {
    Inside,
    Outside,
    OnBoundary,
}

/// > 0 if `p` is left of the directed line a→b, < 0 if right, 0 if collinear
#[inline]
fn is_left(a: Coord<f64>, b: Coord<f64>, p: Coord<f64>) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (p.x - a.x) * (b.y - a.y)
}

#[inline]
fn on_segment(a: Coord<f64>, b: Coord<f64>, p: Coord<f64>) -> bool {
    is_left(a, b, p) == 0.0
        && p.x >= a.x.min(b.x)
        && p.x <= a.x.max(b.x)
        && p.y >= a.y.min(b.y)
        && p.y <= a.y.max(b.y)
}

/// Classify `p` against a ring. Unclosed rings are treated as closed.
pub fn ring_position(ring: &LineString<f64>, p: Coord<f64>) -> RingPosition {
    let coords = &ring.0;
    if coords.len() < 3 {
        return RingPosition::Outside;
    }

    let closing = match (coords.first(), coords.last()) {
        (Some(first), Some(last)) if first != last => Some((*last, *first)),
        _ => None,
    };
    let edges = coords
        .windows(2)
        .map(|w| (w[0], w[1]))
        .chain(closing);

    let mut winding = 0i32;
    for (a, b) in edges {
        if on_segment(a, b, p) {
            return RingPosition::OnBoundary;
        }
        if a.y <= p.y {
            if b.y > p.y && is_left(a, b, p) > 0.0 {
                winding += 1;
            }
        } else if b.y <= p.y && is_left(a, b, p) < 0.0 {
            winding -= 1;
        }
    }

    if winding != 0 {
        RingPosition::Inside
    } else {
        RingPosition::Outside
    }
}

/// Strict interior test: boundary points of the exterior or any hole are outside.
pub fn polygon_contains(polygon: &Polygon<f64>, p: Coord<f64>) -> bool {
    if ring_position(polygon.exterior(), p) != RingPosition::Inside {
        return false;
    }
    polygon
        .interiors()
        .iter()
        .all(|hole| ring_position(hole, p) == RingPosition::Outside)
}

pub fn multipolygon_contains(geometry: &MultiPolygon<f64>, p: Coord<f64>) -> bool {
    geometry.iter().any(|polygon| polygon_contains(polygon, p))
}
