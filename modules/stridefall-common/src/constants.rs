//! Game balance constants. These values are wire-compatible with the
//! original deployment — changing any of them changes scoring or conquest
//! behavior for every player.

/// Mean Earth radius in meters, used by all spherical geometry.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Smallest polygon area (m²) that can become a territory.
pub const MINIMUM_AREA_M2: f64 = 50.0;

/// Flat per-claim area cap (m²). The level-scaled cap was never enabled.
pub const MAX_AREA_M2: f64 = 5_000_000.0;

/// Overlap ratio (intersection / existing area) at or above which a claim
/// targets the whole existing territory (steal or reinforce).
pub const STEAL_OVERLAP_THRESHOLD: f64 = 0.8;

/// Overlap ratio above which a foreign territory participates in
/// partial-carve handling but below the steal threshold.
pub const PARTIAL_OVERLAP_THRESHOLD: f64 = 0.1;

/// Max distance (m) between first and last point for a path to count as a
/// closed polygon.
pub const POLYGON_CLOSURE_M: f64 = 50.0;

/// Max distance (m) between two non-adjacent path points for the segment
/// between them to count as a self-intersecting loop.
pub const SELF_LOOP_M: f64 = 30.0;

/// How long a territory stays protected after a successful claim.
pub const PROTECTION_DURATION_MS: i64 = 24 * 60 * 60 * 1000;

/// Minimum wait between steal attempts on the same territory.
pub const STEAL_COOLDOWN_MS: i64 = 6 * 60 * 60 * 1000;

/// Base points for taking over foreign ground (steal or interior conquest).
pub const STEAL_BONUS_POINTS: i64 = 75;

/// Base points for claiming unowned ground.
pub const NEW_TERRITORY_BONUS_POINTS: i64 = 50;

/// Points per kilometer of run distance.
pub const DISTANCE_POINTS_PER_KM: f64 = 10.0;

/// Square meters of area per point.
pub const AREA_POINTS_DIVISOR: f64 = 2000.0;

/// Fastest required pace a defender can impose (min/km).
pub const REQUIRED_PACE_FLOOR: f64 = 2.5;
