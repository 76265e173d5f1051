//! Path normalization: raw GPS trace → one valid closed polygon.

use stridefall_common::{ClaimError, Coordinate, POLYGON_CLOSURE_M, SELF_LOOP_M};
use stridefall_geo::{find_closed_loops, is_path_closed, merge_loops};

/// A validated claim polygon plus the untouched raw trace. Distance, pace,
/// and duration accounting always use `raw`; geometry uses `polygon`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPath {
    pub polygon: Vec<Coordinate>,
    pub raw: Vec<Coordinate>,
}

/// Fold self-intersecting loops into the main shape, then require the
/// result to close. Pure — rejects `InvalidPath` before any I/O happens.
pub fn normalize_path(path: &[Coordinate]) -> Result<NormalizedPath, ClaimError> {
    if path.len() < 4 {
        return Err(ClaimError::InvalidPath);
    }

    let loops = find_closed_loops(path, SELF_LOOP_M);
    let polygon = merge_loops(path, &loops);

    if !is_path_closed(&polygon, POLYGON_CLOSURE_M) {
        return Err(ClaimError::InvalidPath);
    }

    Ok(NormalizedPath {
        polygon,
        raw: path.to_vec(),
    })
}
