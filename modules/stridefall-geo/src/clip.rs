//! Polygon clipping primitives over the `geo` crate.
//!
//! Territories are stored as a single exterior ring of lat/lng coordinates;
//! clipping results that come back as MultiPolygons are reduced with the
//! largest-spherical-area piece policy.

use geo::{BooleanOps, Contains, Coord, LineString, MultiPolygon, Polygon};

use crate::spherical::spherical_polygon_area;
use stridefall_common::Coordinate;

/// Build a closed `geo` polygon from a lat/lng path. The ring is closed by
/// repeating the first vertex when needed.
pub fn to_polygon(path: &[Coordinate]) -> Polygon<f64> {
    let mut coords: Vec<Coord<f64>> = path.iter().map(|c| Coord { x: c.lng, y: c.lat }).collect();
    if let (Some(first), Some(last)) = (coords.first().copied(), coords.last().copied()) {
        if first != last {
            coords.push(first);
        }
    }
    Polygon::new(LineString::new(coords), vec![])
}

/// Exterior ring of a polygon as lat/lng coordinates (closed).
pub fn ring_coordinates(poly: &Polygon<f64>) -> Vec<Coordinate> {
    poly.exterior()
        .0
        .iter()
        .map(|c| Coordinate::new(c.y, c.x))
        .collect()
}

/// Spherical area (m²) of a polygon's exterior ring.
pub fn polygon_area_m2(poly: &Polygon<f64>) -> f64 {
    spherical_polygon_area(&ring_coordinates(poly))
}

/// Reduce a MultiPolygon to its largest piece by spherical area.
pub fn largest_piece(mp: MultiPolygon<f64>) -> Option<Polygon<f64>> {
    mp.0.into_iter()
        .filter(|p| p.exterior().0.len() >= 4)
        .max_by(|a, b| {
            polygon_area_m2(a)
                .partial_cmp(&polygon_area_m2(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// Total spherical overlap area between two polygons, m². Zero when disjoint.
pub fn intersection_area_m2(a: &Polygon<f64>, b: &Polygon<f64>) -> f64 {
    a.intersection(b).0.iter().map(polygon_area_m2).sum()
}

/// Largest piece of the intersection, if any.
pub fn intersection_largest(a: &Polygon<f64>, b: &Polygon<f64>) -> Option<Polygon<f64>> {
    largest_piece(a.intersection(b))
}

/// True when `outer` fully contains `inner`.
pub fn contains(outer: &Polygon<f64>, inner: &Polygon<f64>) -> bool {
    outer.contains(inner)
}

/// `a − b`, reduced to the largest remaining piece. `None` when nothing
/// meaningful remains.
pub fn difference_largest(a: &Polygon<f64>, b: &Polygon<f64>) -> Option<Polygon<f64>> {
    largest_piece(a.difference(b))
}

/// `a ∪ b` only when the result is one connected polygon; disjoint unions
/// return `None` so callers can fall back.
pub fn union_if_single(a: &Polygon<f64>, b: &Polygon<f64>) -> Option<Polygon<f64>> {
    let mut pieces = a.union(b).0;
    if pieces.len() == 1 {
        pieces.pop()
    } else {
        None
    }
}

/// Union of many polygons into one MultiPolygon.
pub fn union_all(polys: &[Polygon<f64>]) -> MultiPolygon<f64> {
    let mut iter = polys.iter();
    let Some(first) = iter.next() else {
        return MultiPolygon::new(vec![]);
    };
    let mut acc = MultiPolygon::new(vec![first.clone()]);
    for p in iter {
        acc = acc.union(&MultiPolygon::new(vec![p.clone()]));
    }
    acc
}

/// Remove the footprint of every polygon in `cuts` from `candidate`, keeping
/// the largest remaining piece.
pub fn carve_largest(candidate: &Polygon<f64>, cuts: &[Polygon<f64>]) -> Option<Polygon<f64>> {
    if cuts.is_empty() {
        return Some(candidate.clone());
    }
    let cut_union = union_all(cuts);
    largest_piece(MultiPolygon::new(vec![candidate.clone()]).difference(&cut_union))
}
