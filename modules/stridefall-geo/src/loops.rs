//! Path closure and self-intersecting loop handling.

use tracing::debug;

use crate::clip::{ring_coordinates, to_polygon, union_if_single};
use stridefall_common::Coordinate;

/// True when the path's first and last points are within `threshold_m` of
/// each other and the path has enough points to enclose anything.
pub fn is_path_closed(path: &[Coordinate], threshold_m: f64) -> bool {
    if path.len() < 3 {
        return false;
    }
    let (first, last) = (&path[0], &path[path.len() - 1]);
    crate::spherical::haversine_distance(first, last) <= threshold_m
}

/// Scan for sub-loops: places where the path comes back within `threshold_m`
/// of an earlier point, with at least three points in between. Each hit
/// yields the enclosed sub-path closed by repeating its first point; only
/// the first (nearest) closing point per start index is reported.
///
/// O(n²) over the path; fine for paths in the low thousands of points. The
/// contract allows swapping in a sweep-line scan without changing callers.
pub fn find_closed_loops(path: &[Coordinate], threshold_m: f64) -> Vec<Vec<Coordinate>> {
    let mut loops = Vec::new();
    if path.len() < 4 {
        return loops;
    }

    for i in 0..path.len() - 3 {
        for j in (i + 3)..path.len() {
            if crate::spherical::haversine_distance(&path[i], &path[j]) <= threshold_m {
                let mut sub: Vec<Coordinate> = path[i..=j].to_vec();
                if sub.len() >= 4 {
                    sub.push(sub[0]);
                    loops.push(sub);
                }
                break;
            }
        }
    }

    loops
}

/// Union each detected loop into the main polygon. Best-effort: a loop whose
/// union fails (or would split the shape into disjoint pieces) is ignored
/// rather than aborting the claim.
pub fn merge_loops(main_path: &[Coordinate], loops: &[Vec<Coordinate>]) -> Vec<Coordinate> {
    if loops.is_empty() {
        return main_path.to_vec();
    }

    let mut merged = to_polygon(main_path);
    for (idx, sub) in loops.iter().enumerate() {
        if sub.len() < 4 {
            continue;
        }
        match union_if_single(&merged, &to_polygon(sub)) {
            Some(unified) => merged = unified,
            None => debug!(loop_index = idx, "skipping loop that does not merge cleanly"),
        }
    }

    ring_coordinates(&merged)
}
