//! Point rewards for an accepted claim.

use stridefall_common::{
    AREA_POINTS_DIVISOR, DISTANCE_POINTS_PER_KM, NEW_TERRITORY_BONUS_POINTS, STEAL_BONUS_POINTS,
};

use crate::plan::ClaimAction;

/// Base points for a claim: distance points plus area points plus the
/// action bonus. Reinforcing awards nothing — the value of a reinforce is
/// the refreshed polygon, not points.
pub fn base_points(action: ClaimAction, distance_m: f64, area_m2: f64) -> i64 {
    if action == ClaimAction::Reinforced {
        return 0;
    }
    let distance_points = ((distance_m / 1_000.0) * DISTANCE_POINTS_PER_KM).floor() as i64;
    let area_points = (area_m2 / AREA_POINTS_DIVISOR).floor() as i64;
    distance_points + area_points + action_bonus(action)
}

fn action_bonus(action: ClaimAction) -> i64 {
    match action {
        ClaimAction::Stolen | ClaimAction::InteriorConquest => STEAL_BONUS_POINTS,
        ClaimAction::New => NEW_TERRITORY_BONUS_POINTS,
        ClaimAction::Reinforced => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_territory_points() {
        // 1 km run over 10,000 m²: 10 + 5 + 50.
        assert_eq!(base_points(ClaimAction::New, 1_000.0, 10_000.0), 65);
        // 2.5 km run: 25 + 5 + 50.
        assert_eq!(base_points(ClaimAction::New, 2_500.0, 10_000.0), 80);
    }

    #[test]
    fn steal_carries_the_larger_bonus() {
        assert_eq!(base_points(ClaimAction::Stolen, 1_000.0, 4_000.0), 10 + 2 + 75);
    }

    #[test]
    fn interior_conquest_counts_as_a_steal() {
        assert_eq!(
            base_points(ClaimAction::InteriorConquest, 0.0, 0.0),
            STEAL_BONUS_POINTS
        );
    }

    #[test]
    fn reinforce_awards_nothing() {
        assert_eq!(base_points(ClaimAction::Reinforced, 5_000.0, 50_000.0), 0);
    }

    #[test]
    fn fractions_floor_not_round() {
        // 1.99 km → 19 points, 3999 m² → 1 point.
        assert_eq!(base_points(ClaimAction::New, 1_990.0, 3_999.0), 19 + 1 + 50);
    }
}
