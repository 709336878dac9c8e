//! Signed distance from a point to a polygon boundary, in the planar units of
//! the polygon's CRS (metres for the projected regional grids).
//!
//! Negative means the point is inside the boundary. Recursive over polygon
//! complexity: a multi-part polygon reports the minimum over its parts; a
//! polygon with holes resolves against whichever boundary (outer edge or
//! nearest hole edge) is closer, and a point sitting inside a hole is
//! reported as a positive outside-distance.

use geo::Contains;
use geo_types::{LineString, MultiPolygon, Point, Polygon};

/// Signed distance from `point` to the boundary of `polygon`.
#[must_use]
pub fn signed_distance(point: Point<f64>, polygon: &MultiPolygon<f64>) -> f64 {
    polygon
        .0
        .iter()
        .map(|part| part_signed_distance(point, part))
        .fold(f64::INFINITY, f64::min)
}

fn part_signed_distance(point: Point<f64>, polygon: &Polygon<f64>) -> f64 {
    let exterior = ring_signed_distance(point, polygon.exterior());
    if polygon.interiors().is_empty() || exterior >= 0.0 {
        return exterior;
    }

    // Inside the outer shape; holes can still put the point outside, or be
    // the nearest boundary.
    let min_interior = polygon
        .interiors()
        .iter()
        .map(|hole| ring_signed_distance(point, hole))
        .fold(f64::INFINITY, f64::min);

    if min_interior < 0.0 {
        // Inside a hole: not really inside this shape at all.
        -min_interior
    } else {
        // Both candidates are <= 0; the larger one is closer in magnitude.
        exterior.max(-min_interior)
    }
}

/// A ring treated as a standalone simple polygon: perpendicular distance to
/// the ring's line, negated when the ring contains the point.
fn ring_signed_distance(point: Point<f64>, ring: &LineString<f64>) -> f64 {
    let boundary = ring
        .lines()
        .map(|segment| {
            point_segment_distance(
                point.x(),
                point.y(),
                segment.start.x,
                segment.start.y,
                segment.end.x,
                segment.end.y,
            )
        })
        .fold(f64::INFINITY, f64::min);

    let shell = Polygon::new(ring.clone(), vec![]);
    if shell.contains(&point) {
        -boundary
    } else {
        boundary
    }
}

/// Distance from (px, py) to the segment (ax, ay)–(bx, by).
fn point_segment_distance(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let (dx, dy) = (bx - ax, by - ay);
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0)
    };
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}
