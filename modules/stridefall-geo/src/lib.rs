//! Geometry kernel: spherical measurements, polygon clipping, and
//! self-intersecting loop handling for run paths.
//!
//! All distances are meters, areas are m², coordinates are WGS84 lat/lng.
//! The spherical formulas use the small-area approximation that the scoring
//! constants were tuned against; `geo`'s planar area is only used to compare
//! clipping outputs, never for scoring.

pub mod clip;
pub mod loops;
pub mod spherical;

pub use clip::{
    carve_largest, contains, difference_largest, intersection_area_m2, intersection_largest,
    largest_piece, polygon_area_m2, ring_coordinates, to_polygon, union_all, union_if_single,
};
pub use loops::{find_closed_loops, is_path_closed, merge_loops};
pub use spherical::{
    average_pace_min_per_km, haversine_distance, path_length, perimeter, spherical_polygon_area,
};
