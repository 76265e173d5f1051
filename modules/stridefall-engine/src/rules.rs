//! Conquest rules: turn a classified claim into writes, or reject it.
//!
//! `decide` is pure — every durable fact it needs (snapshot, profiles,
//! shields, cooldown history) is loaded by the service and passed in, so the
//! whole rule set is testable without a store.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use stridefall_common::{
    level_for_points, required_pace, ClaimError, Coordinate, EventKind, EventResult,
    NotificationIntent, Profile, Shield, Territory, TerritoryEvent, TerritoryStatus,
    PROTECTION_DURATION_MS, STEAL_COOLDOWN_MS,
};
use stridefall_geo::{
    difference_largest, perimeter, ring_coordinates, spherical_polygon_area, to_polygon,
};

use crate::plan::{ClaimAction, ProfileDelta, TerritoryWrite};
use crate::resolve::Classification;
use crate::rewards::base_points;

/// Run measurements that gate and score the claim. Always computed from the
/// raw trace, never the merged polygon.
#[derive(Debug, Clone, Copy)]
pub struct ClaimMetrics {
    pub distance_m: f64,
    pub duration_seconds: f64,
    /// min/km.
    pub avg_pace: f64,
}

/// Everything the rules read besides the classification itself.
pub struct RuleInput<'a> {
    pub attacker: &'a Profile,
    /// Owner of the targeted territory, when one exists and could be loaded.
    pub defender: Option<&'a Profile>,
    /// Final candidate polygon (carved, for New claims).
    pub polygon: &'a [Coordinate],
    pub metrics: ClaimMetrics,
    /// Unexpired shields only.
    pub shields: &'a [Shield],
    /// Last recorded attempt by this attacker against the target.
    pub last_attempt: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
}

/// An accepted claim, expressed as writes plus the success event. The
/// service wraps this into a [`crate::plan::ClaimPlan`] after side effects.
#[derive(Debug, Clone)]
pub struct Decision {
    pub action: ClaimAction,
    /// The attacker's resulting territory (created or updated).
    pub territory: Territory,
    pub territory_writes: Vec<TerritoryWrite>,
    pub clear_shields: Vec<Uuid>,
    pub profile_deltas: Vec<ProfileDelta>,
    pub base_points: i64,
    pub territories_conquered: u32,
    pub territories_stolen: u32,
    /// `points_awarded` here is the base; the service overwrites it with the
    /// final total once challenge and mission bonuses are known.
    pub event: TerritoryEvent,
    pub defender_notice: Option<NotificationIntent>,
}

/// A refused claim. Refusals against a concrete target leave audit rows and
/// a push to the defender; pure validation failures leave nothing.
#[derive(Debug, Clone)]
pub struct Rejection {
    pub error: ClaimError,
    pub events: Vec<TerritoryEvent>,
    pub defender_notice: Option<NotificationIntent>,
}

impl Rejection {
    fn bare(error: ClaimError) -> Self {
        Self {
            error,
            events: vec![],
            defender_notice: None,
        }
    }
}

pub fn decide(
    classification: &Classification,
    territories: &[Territory],
    input: &RuleInput<'_>,
) -> Result<Decision, Rejection> {
    match classification {
        Classification::New { polygon, .. } => Ok(decide_new(polygon, input)),
        Classification::Reinforce {
            target_id,
            overlap_ratio,
        } => {
            let target = find_territory(territories, *target_id)?;
            Ok(decide_reinforce(target, *overlap_ratio, input))
        }
        Classification::Steal {
            target_id,
            overlap_ratio,
        } => {
            let target = find_territory(territories, *target_id)?;
            decide_steal(target, *overlap_ratio, input)
        }
        Classification::InteriorConquest {
            target_id,
            overlap_ratio,
        } => {
            let target = find_territory(territories, *target_id)?;
            decide_interior(target, *overlap_ratio, input)
        }
    }
}

fn find_territory(territories: &[Territory], id: Uuid) -> Result<&Territory, Rejection> {
    territories.iter().find(|t| t.id == id).ok_or_else(|| {
        Rejection::bare(ClaimError::Persistence(format!(
            "territory {id} missing from snapshot"
        )))
    })
}

fn protection_window(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::milliseconds(PROTECTION_DURATION_MS)
}

fn event(
    territory_id: Uuid,
    input: &RuleInput<'_>,
    defender_id: Option<Uuid>,
    kind: EventKind,
    result: EventResult,
    overlap_ratio: f64,
    area: f64,
    points: i64,
) -> TerritoryEvent {
    TerritoryEvent {
        id: Uuid::new_v4(),
        territory_id,
        attacker_id: input.attacker.id,
        defender_id,
        kind,
        result,
        overlap_ratio,
        pace: input.metrics.avg_pace,
        area,
        points_awarded: points,
        created_at: input.now,
    }
}

fn decide_new(polygon: &[Coordinate], input: &RuleInput<'_>) -> Decision {
    let area = spherical_polygon_area(polygon);
    let points = base_points(ClaimAction::New, input.metrics.distance_m, area);
    let level = level_for_points(input.attacker.total_points);

    let territory = Territory {
        id: Uuid::new_v4(),
        user_id: input.attacker.id,
        coordinates: polygon.to_vec(),
        area,
        perimeter: perimeter(polygon),
        avg_pace: input.metrics.avg_pace,
        required_pace: required_pace(input.metrics.avg_pace, level),
        protected_until: Some(protection_window(input.now)),
        cooldown_until: Some(input.now + Duration::milliseconds(STEAL_COOLDOWN_MS)),
        status: TerritoryStatus::Protected,
        points,
        conquest_points: points,
        last_attacker_id: None,
        last_defender_id: None,
        last_attack_at: None,
        tags: vec![],
        poi_summary: None,
        version: 1,
    };

    let mut delta = ProfileDelta::new(input.attacker.id);
    delta.points = points;
    delta.territories = 1;
    delta.distance_m = input.metrics.distance_m;

    Decision {
        action: ClaimAction::New,
        event: event(
            territory.id,
            input,
            None,
            EventKind::Conquest,
            EventResult::Success,
            1.0,
            area,
            points,
        ),
        territory_writes: vec![TerritoryWrite::Create(territory.clone())],
        territory,
        clear_shields: vec![],
        profile_deltas: vec![delta],
        base_points: points,
        territories_conquered: 1,
        territories_stolen: 0,
        defender_notice: None,
    }
}

fn decide_reinforce(target: &Territory, overlap_ratio: f64, input: &RuleInput<'_>) -> Decision {
    let area = spherical_polygon_area(input.polygon);
    let level = level_for_points(input.attacker.total_points);

    // Points and cooldown stay; the reinforce refreshes shape, pace, and
    // protection.
    let mut updated = target.clone();
    updated.coordinates = input.polygon.to_vec();
    updated.area = area;
    updated.perimeter = perimeter(input.polygon);
    updated.avg_pace = input.metrics.avg_pace;
    updated.required_pace = required_pace(input.metrics.avg_pace, level);
    updated.protected_until = Some(protection_window(input.now));
    updated.status = TerritoryStatus::Protected;

    let mut delta = ProfileDelta::new(input.attacker.id);
    delta.distance_m = input.metrics.distance_m;

    Decision {
        action: ClaimAction::Reinforced,
        event: event(
            target.id,
            input,
            None,
            EventKind::Reinforce,
            EventResult::Success,
            overlap_ratio,
            area,
            0,
        ),
        territory_writes: vec![TerritoryWrite::Update {
            expected_version: target.version,
            territory: updated.clone(),
        }],
        territory: updated,
        clear_shields: vec![],
        profile_deltas: vec![delta],
        base_points: 0,
        territories_conquered: 0,
        territories_stolen: 0,
        defender_notice: None,
    }
}

/// Gate order is fixed: pace, protection, cooldown, shield. The attacker
/// always learns the cheapest reason first.
fn attack_gates(
    target: &Territory,
    input: &RuleInput<'_>,
    failure_kind: EventKind,
    overlap_ratio: f64,
) -> Result<(), Rejection> {
    let failed_event = || {
        event(
            target.id,
            input,
            Some(target.user_id),
            failure_kind,
            EventResult::Failed,
            overlap_ratio,
            target.area,
            0,
        )
    };
    let reject_with_event = |error: ClaimError| Rejection {
        error,
        events: vec![failed_event()],
        defender_notice: Some(NotificationIntent {
            user_id: target.user_id,
            title: "Attack repelled!".to_string(),
            body: format!(
                "{} tried to take one of your territories",
                input.attacker.username
            ),
            tag: Some("territory-attacked".to_string()),
            url: None,
        }),
    };

    // Pace gate uses the defender's live level, not the one frozen at claim
    // time.
    if failure_kind == EventKind::Steal {
        let defender_level = input
            .defender
            .map(|p| level_for_points(p.total_points))
            .unwrap_or(1);
        let required = required_pace(target.avg_pace, defender_level);
        if input.metrics.avg_pace > required {
            return Err(reject_with_event(ClaimError::PaceInsufficient {
                required_pace: required,
            }));
        }
    }

    if let Some(until) = target.protected_until {
        if until > input.now {
            return Err(reject_with_event(ClaimError::TerritoryProtected));
        }
    }

    if failure_kind == EventKind::Steal {
        let mut remaining_ms = 0i64;
        if let Some(until) = target.cooldown_until {
            remaining_ms = remaining_ms.max((until - input.now).num_milliseconds());
        }
        if let Some(last) = input.last_attempt {
            let until = last + Duration::milliseconds(STEAL_COOLDOWN_MS);
            remaining_ms = remaining_ms.max((until - input.now).num_milliseconds());
        }
        if remaining_ms > 0 {
            return Err(reject_with_event(ClaimError::CooldownActive { remaining_ms }));
        }
    }

    // A shield block is both a failed attempt (it feeds the attacker's
    // cooldown history) and a successful defense.
    if input.shields.iter().any(|s| s.territory_id == target.id) {
        return Err(Rejection {
            error: ClaimError::ShieldActive,
            events: vec![
                failed_event(),
                event(
                    target.id,
                    input,
                    Some(target.user_id),
                    EventKind::Defense,
                    EventResult::Success,
                    overlap_ratio,
                    target.area,
                    0,
                ),
            ],
            defender_notice: Some(NotificationIntent {
                user_id: target.user_id,
                title: "Territory defended!".to_string(),
                body: format!(
                    "Your shield blocked an attack by {}",
                    input.attacker.username
                ),
                tag: Some("territory-defended".to_string()),
                url: None,
            }),
        });
    }

    Ok(())
}

fn decide_steal(
    target: &Territory,
    overlap_ratio: f64,
    input: &RuleInput<'_>,
) -> Result<Decision, Rejection> {
    attack_gates(target, input, EventKind::Steal, overlap_ratio)?;

    let area = spherical_polygon_area(input.polygon);
    let points = base_points(ClaimAction::Stolen, input.metrics.distance_m, area);
    let level = level_for_points(input.attacker.total_points);
    let old_owner = target.user_id;

    let mut updated = target.clone();
    updated.user_id = input.attacker.id;
    updated.coordinates = input.polygon.to_vec();
    updated.area = area;
    updated.perimeter = perimeter(input.polygon);
    updated.avg_pace = input.metrics.avg_pace;
    updated.required_pace = required_pace(input.metrics.avg_pace, level);
    updated.protected_until = Some(protection_window(input.now));
    updated.cooldown_until = Some(input.now + Duration::milliseconds(STEAL_COOLDOWN_MS));
    updated.status = TerritoryStatus::Protected;
    updated.last_attacker_id = Some(input.attacker.id);
    updated.last_defender_id = Some(old_owner);
    updated.last_attack_at = Some(input.now);
    updated.points = points;
    updated.conquest_points = points;

    let mut attacker_delta = ProfileDelta::new(input.attacker.id);
    attacker_delta.points = points;
    attacker_delta.territories = 1;
    attacker_delta.distance_m = input.metrics.distance_m;

    // The loser forfeits what the territory earned them when they took it.
    let mut defender_delta = ProfileDelta::new(old_owner);
    defender_delta.points = -target.conquest_points;
    defender_delta.territories = -1;

    Ok(Decision {
        action: ClaimAction::Stolen,
        event: event(
            target.id,
            input,
            Some(old_owner),
            EventKind::Steal,
            EventResult::Success,
            overlap_ratio,
            area,
            points,
        ),
        territory_writes: vec![TerritoryWrite::Update {
            expected_version: target.version,
            territory: updated.clone(),
        }],
        territory: updated,
        clear_shields: input
            .shields
            .iter()
            .filter(|s| s.territory_id == target.id)
            .map(|s| s.id)
            .collect(),
        profile_deltas: vec![attacker_delta, defender_delta],
        base_points: points,
        territories_conquered: 0,
        territories_stolen: 1,
        defender_notice: Some(NotificationIntent {
            user_id: old_owner,
            title: "Territory stolen!".to_string(),
            body: format!("{} took one of your territories", input.attacker.username),
            tag: Some("territory-stolen".to_string()),
            url: None,
        }),
    })
}

fn decide_interior(
    target: &Territory,
    overlap_ratio: f64,
    input: &RuleInput<'_>,
) -> Result<Decision, Rejection> {
    attack_gates(target, input, EventKind::Conquest, overlap_ratio)?;

    let candidate_area = spherical_polygon_area(input.polygon);
    let target_poly = to_polygon(&target.coordinates);
    let candidate_poly = to_polygon(input.polygon);

    // Shrink the host. A strict-interior carve leaves a ring with a hole;
    // the single-ring model keeps the outer shape then and only adjusts the
    // bookkeeping area.
    let (new_coords, new_perimeter, new_area) =
        match difference_largest(&target_poly, &candidate_poly) {
            Some(piece) if piece.interiors().is_empty() => {
                let ring = ring_coordinates(&piece);
                let area = spherical_polygon_area(&ring);
                let perim = perimeter(&ring);
                (ring, perim, area)
            }
            _ => (
                target.coordinates.clone(),
                target.perimeter,
                (target.area - candidate_area).max(0.0),
            ),
        };

    let scale = if target.area > 0.0 {
        new_area / target.area
    } else {
        0.0
    };
    let mut shrunk = target.clone();
    shrunk.coordinates = new_coords;
    shrunk.perimeter = new_perimeter;
    shrunk.area = new_area;
    shrunk.points = ((target.points as f64) * scale).floor() as i64;
    shrunk.conquest_points = ((target.conquest_points as f64) * scale).floor() as i64;
    shrunk.last_attacker_id = Some(input.attacker.id);
    shrunk.last_defender_id = Some(target.user_id);
    shrunk.last_attack_at = Some(input.now);

    let points = base_points(
        ClaimAction::InteriorConquest,
        input.metrics.distance_m,
        candidate_area,
    );
    let level = level_for_points(input.attacker.total_points);

    let carved = Territory {
        id: Uuid::new_v4(),
        user_id: input.attacker.id,
        coordinates: input.polygon.to_vec(),
        area: candidate_area,
        perimeter: perimeter(input.polygon),
        avg_pace: input.metrics.avg_pace,
        required_pace: required_pace(input.metrics.avg_pace, level),
        protected_until: Some(protection_window(input.now)),
        cooldown_until: Some(input.now + Duration::milliseconds(STEAL_COOLDOWN_MS)),
        status: TerritoryStatus::Protected,
        points,
        conquest_points: points,
        last_attacker_id: None,
        last_defender_id: None,
        last_attack_at: None,
        tags: vec![],
        poi_summary: None,
        version: 1,
    };

    let mut attacker_delta = ProfileDelta::new(input.attacker.id);
    attacker_delta.points = points;
    attacker_delta.territories = 1;
    attacker_delta.distance_m = input.metrics.distance_m;

    Ok(Decision {
        action: ClaimAction::InteriorConquest,
        event: event(
            carved.id,
            input,
            Some(target.user_id),
            EventKind::Conquest,
            EventResult::Success,
            overlap_ratio,
            candidate_area,
            points,
        ),
        territory_writes: vec![
            TerritoryWrite::Update {
                expected_version: target.version,
                territory: shrunk,
            },
            TerritoryWrite::Create(carved.clone()),
        ],
        territory: carved,
        clear_shields: vec![],
        profile_deltas: vec![attacker_delta],
        base_points: points,
        territories_conquered: 1,
        territories_stolen: 0,
        defender_notice: Some(NotificationIntent {
            user_id: target.user_id,
            title: "Territory breached!".to_string(),
            body: format!(
                "{} claimed ground inside one of your territories",
                input.attacker.username
            ),
            tag: Some("territory-breached".to_string()),
            url: None,
        }),
    })
}
