//! Claim side effects: POI tagging, map challenges, missions, and clan
//! contributions. All pure functions over preloaded catalog snapshots; the
//! service stitches the results into the plan.

use geo::{Contains, Point};
use uuid::Uuid;

use stridefall_common::{
    ClanMembership, ClanMission, Coordinate, MapChallenge, Mission, MissionProgress, Poi, PoiTag,
    Profile,
};
use stridefall_geo::{intersection_area_m2, to_polygon};

use crate::plan::{ClaimAction, ClanUpdate, MissionAdvance, MissionRewards};

/// POIs whose footprint overlaps the claimed polygon, as territory tags.
/// Point POIs (fewer than 3 vertices) are tested by containment.
pub fn tag_pois(polygon: &[Coordinate], pois: &[Poi]) -> (Vec<PoiTag>, Option<String>) {
    let claim = to_polygon(polygon);
    let mut tags = Vec::new();
    for poi in pois {
        let hit = if poi.coordinates.len() >= 3 {
            intersection_area_m2(&claim, &to_polygon(&poi.coordinates)) > 0.0
        } else if let Some(point) = poi.coordinates.first() {
            claim.contains(&Point::new(point.lng, point.lat))
        } else {
            false
        };
        if hit {
            let tag = PoiTag {
                category: poi.category.clone(),
                name: poi.name.clone(),
            };
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    let summary = summarize(&tags);
    (tags, summary)
}

/// "Mill Park, Corner Cafe" — the matched POI names, in tag order.
fn summarize(tags: &[PoiTag]) -> Option<String> {
    if tags.is_empty() {
        return None;
    }
    Some(
        tags.iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    )
}

#[derive(Debug, Clone, Default)]
pub struct ChallengeOutcome {
    pub claimed: Vec<Uuid>,
    pub points: i64,
    /// Human labels for the claim report.
    pub labels: Vec<String>,
}

/// Active challenges whose marker lies inside the claimed polygon and that
/// this user has not claimed before.
pub fn claim_challenges(
    polygon: &[Coordinate],
    challenges: &[MapChallenge],
    already_claimed: &[Uuid],
) -> ChallengeOutcome {
    let claim = to_polygon(polygon);
    let mut outcome = ChallengeOutcome::default();
    for challenge in challenges {
        if already_claimed.contains(&challenge.id) {
            continue;
        }
        if claim.contains(&Point::new(challenge.longitude, challenge.latitude)) {
            outcome.claimed.push(challenge.id);
            outcome.points += challenge.reward_points;
            outcome
                .labels
                .push(format!("{} (+{})", challenge.name, challenge.reward_points));
        }
    }
    outcome
}

#[derive(Debug, Clone, Default)]
pub struct MissionOutcome {
    pub updates: Vec<MissionAdvance>,
    pub completed_titles: Vec<String>,
    pub rewards: MissionRewards,
}

/// Advance each mission by the number of newly tagged POIs matching its
/// type. Rewards are granted only on the transition to completed.
pub fn advance_missions(
    tags: &[PoiTag],
    missions: &[Mission],
    progress: &[MissionProgress],
) -> MissionOutcome {
    let mut outcome = MissionOutcome::default();
    for mission in missions {
        let hits = tags
            .iter()
            .filter(|t| t.category == mission.mission_type)
            .count() as u32;
        if hits == 0 {
            continue;
        }
        let prior = progress.iter().find(|p| p.mission_id == mission.id);
        if prior.map(|p| p.completed).unwrap_or(false) {
            continue;
        }
        let new_progress =
            (prior.map(|p| p.progress).unwrap_or(0) + hits).min(mission.target_count);
        let completed = new_progress >= mission.target_count;
        if completed {
            outcome.completed_titles.push(mission.title.clone());
            outcome.rewards.points += mission.reward_points;
            outcome.rewards.shields += mission.reward_shields;
        }
        outcome.updates.push(MissionAdvance {
            mission_id: mission.id,
            progress: new_progress,
            completed,
        });
    }
    outcome
}

/// Per-clan contribution from one accepted claim: points, the territory
/// delta, a feed line, and clan mission advances.
pub fn clan_contributions(
    user: &Profile,
    action: ClaimAction,
    total_points: i64,
    tags: &[PoiTag],
    memberships: &[ClanMembership],
    clan_missions: &[ClanMission],
) -> (Vec<ClanUpdate>, Vec<String>) {
    let territory_delta = match action {
        ClaimAction::New | ClaimAction::Stolen | ClaimAction::InteriorConquest => 1,
        ClaimAction::Reinforced => 0,
    };
    let mut completed_titles = Vec::new();
    let updates = memberships
        .iter()
        .map(|membership| {
            let missions = clan_missions
                .iter()
                .filter(|m| m.clan_id == membership.clan_id && m.active && !is_done(m))
                .filter_map(|m| {
                    let hits = tags
                        .iter()
                        .filter(|t| t.category == m.mission_type)
                        .count() as u32;
                    if hits == 0 {
                        return None;
                    }
                    let progress = (m.current_progress + hits).min(m.target_count);
                    let completed = progress >= m.target_count;
                    if completed {
                        completed_titles.push(m.title.clone());
                    }
                    Some(MissionAdvance {
                        mission_id: m.id,
                        progress,
                        completed,
                    })
                })
                .collect();
            ClanUpdate {
                clan_id: membership.clan_id,
                points: total_points,
                territories: territory_delta,
                feed_entry: Some(format!(
                    "{} {} a territory (+{} pts)",
                    user.username,
                    feed_verb(action),
                    total_points
                )),
                missions,
            }
        })
        .collect();
    (updates, completed_titles)
}

fn is_done(mission: &ClanMission) -> bool {
    mission.current_progress >= mission.target_count
}

fn feed_verb(action: ClaimAction) -> &'static str {
    match action {
        ClaimAction::New => "claimed",
        ClaimAction::Reinforced => "reinforced",
        ClaimAction::Stolen => "stole",
        ClaimAction::InteriorConquest => "conquered",
    }
}
