//! Player level system and the pace gates derived from it.

use crate::constants::{MAX_AREA_M2, REQUIRED_PACE_FLOOR};

/// Total points needed to reach each level, index 0 = level 1.
pub const LEVEL_THRESHOLDS: [i64; 20] = [
    0, 100, 250, 500, 850, 1300, 1900, 2600, 3400, 4300, 5300, 6500, 7900, 9500, 11300, 13300,
    15500, 18000, 20800, 24000,
];

/// Points per level past the top of the table.
const OVERFLOW_POINTS_PER_LEVEL: i64 = 3000;

pub fn level_for_points(total_points: i64) -> u32 {
    let mut level = 1u32;
    for (i, threshold) in LEVEL_THRESHOLDS.iter().enumerate() {
        if total_points >= *threshold {
            level = i as u32 + 1;
        } else {
            break;
        }
    }
    if level as usize >= LEVEL_THRESHOLDS.len() {
        let past_top = total_points - LEVEL_THRESHOLDS[LEVEL_THRESHOLDS.len() - 1];
        level = LEVEL_THRESHOLDS.len() as u32 + (past_top / OVERFLOW_POINTS_PER_LEVEL) as u32;
    }
    level
}

/// Minutes/km shaved off the pace an attacker must beat, earned by the
/// defender's level.
pub fn defense_bonus_minutes(level: u32) -> f64 {
    if level >= 11 {
        1.0
    } else if level >= 6 {
        0.75
    } else {
        0.5
    }
}

/// Slowest pace (min/km) an attacker may run and still steal a territory
/// whose claiming run averaged `territory_pace`.
pub fn required_pace(territory_pace: f64, owner_level: u32) -> f64 {
    let required = territory_pace - defense_bonus_minutes(owner_level);
    required.max(REQUIRED_PACE_FLOOR)
}

/// Largest claimable area for a level. Flat for now; the level-scaled
/// formula never shipped.
pub fn max_area_for_level(_level: u32) -> f64 {
    MAX_AREA_M2
}
