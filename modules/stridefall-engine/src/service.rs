//! Claim orchestration: validate, resolve, decide, enrich, commit, notify.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use stridefall_common::{
    level_for_points, max_area_for_level, ClaimError, ClaimRequest, Coordinate, Profile, Run,
    MINIMUM_AREA_M2, STEAL_COOLDOWN_MS,
};
use stridefall_geo::{average_pace_min_per_km, path_length, spherical_polygon_area};

use crate::effects;
use crate::normalize::normalize_path;
use crate::plan::{ApplyOutcome, ClaimPlan, ClaimReport, PoiTagUpdate};
use crate::ports::{Notifier, TerritoryStore};
use crate::resolve::{resolve, Classification};
use crate::rules::{decide, ClaimMetrics, RuleInput};

/// One retry after a version conflict; past that the map is too hot and the
/// runner can resubmit.
const MAX_COMMIT_ATTEMPTS: u32 = 2;

pub struct ClaimService {
    store: Arc<dyn TerritoryStore>,
    notifier: Arc<dyn Notifier>,
}

impl ClaimService {
    pub fn new(store: Arc<dyn TerritoryStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Process one claim end to end. Everything before `apply_claim` is
    /// read-only; rejections leave at most an audit row and a push.
    pub async fn process_claim(
        &self,
        user_id: Uuid,
        request: &ClaimRequest,
        now: DateTime<Utc>,
    ) -> Result<ClaimReport, ClaimError> {
        if request.duration_seconds <= 0.0 {
            return Err(ClaimError::InvalidDuration);
        }
        let normalized = normalize_path(&request.path)?;

        let distance_m = path_length(&normalized.raw);
        let metrics = ClaimMetrics {
            distance_m,
            duration_seconds: request.duration_seconds,
            avg_pace: average_pace_min_per_km(distance_m, request.duration_seconds),
        };

        let attacker = self
            .store
            .load_profile(user_id)
            .await
            .map_err(persistence)?
            .ok_or(ClaimError::AuthFailure)?;

        // Size gates run on the merged polygon before any carving.
        let raw_area = spherical_polygon_area(&normalized.polygon);
        if raw_area < MINIMUM_AREA_M2 {
            return Err(ClaimError::TerritoryTooSmall { area_m2: raw_area });
        }
        let max_m2 = max_area_for_level(level_for_points(attacker.total_points));
        if raw_area > max_m2 {
            return Err(ClaimError::AreaTooLarge {
                area_m2: raw_area,
                max_m2,
            });
        }

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            match self
                .evaluate_and_commit(&attacker, &normalized.polygon, &normalized.raw, metrics, now)
                .await?
            {
                CommitResult::Done(report) => return Ok(report),
                CommitResult::Conflict => {
                    warn!(user_id = %user_id, attempt, "claim hit a version conflict; re-evaluating");
                }
            }
        }
        Err(ClaimError::Persistence(
            "map changed concurrently, claim could not be committed".to_string(),
        ))
    }

    async fn evaluate_and_commit(
        &self,
        attacker: &Profile,
        polygon: &[Coordinate],
        raw_path: &[Coordinate],
        metrics: ClaimMetrics,
        now: DateTime<Utc>,
    ) -> Result<CommitResult, ClaimError> {
        let territories = self
            .store
            .load_territories_snapshot()
            .await
            .map_err(persistence)?;
        let shields = self.store.load_shields(now).await.map_err(persistence)?;

        let classification = resolve(polygon, attacker.id, &territories);

        // Steal and interior conquest need the defender's live profile and,
        // for steals, this attacker's attempt history.
        let (defender, last_attempt) = match &classification {
            Classification::Steal { target_id, .. }
            | Classification::InteriorConquest { target_id, .. } => {
                let owner = territories
                    .iter()
                    .find(|t| t.id == *target_id)
                    .map(|t| t.user_id);
                let defender = match owner {
                    Some(owner_id) => self
                        .store
                        .load_profile(owner_id)
                        .await
                        .map_err(persistence)?,
                    None => None,
                };
                let last_attempt = if matches!(classification, Classification::Steal { .. }) {
                    self.store
                        .last_attack_attempt(*target_id, attacker.id)
                        .await
                        .map_err(persistence)?
                } else {
                    None
                };
                (defender, last_attempt)
            }
            _ => (None, None),
        };

        let claim_polygon: &[Coordinate] = match &classification {
            Classification::New { polygon, .. } => polygon,
            _ => polygon,
        };
        let input = RuleInput {
            attacker,
            defender: defender.as_ref(),
            polygon: claim_polygon,
            metrics,
            shields: &shields,
            last_attempt,
            now,
        };

        let mut decision = match decide(&classification, &territories, &input) {
            Ok(decision) => decision,
            Err(rejection) => {
                for event in &rejection.events {
                    if let Err(e) = self.store.record_event(event).await {
                        warn!(error = %e, "failed to record claim event");
                    }
                }
                if let Some(notice) = &rejection.defender_notice {
                    if let Err(e) = self.notifier.notify(notice).await {
                        warn!(error = %e, "failed to deliver defense notification");
                    }
                }
                return Err(rejection.error);
            }
        };

        // Catalog enrichment. None of these loads may fail the claim.
        let pois = self.store.load_pois().await.unwrap_or_else(|e| {
            warn!(error = %e, "poi catalog unavailable");
            vec![]
        });
        let (tags, poi_summary) = effects::tag_pois(&decision.territory.coordinates, &pois);

        let challenges = self
            .store
            .load_active_map_challenges(now)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "challenge catalog unavailable");
                vec![]
            });
        let claimed_before = self
            .store
            .load_challenge_claims(attacker.id)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "challenge claims unavailable");
                vec![]
            });
        let challenge_outcome =
            effects::claim_challenges(&decision.territory.coordinates, &challenges, &claimed_before);

        let mut mission_types: Vec<String> = tags.iter().map(|t| t.category.clone()).collect();
        mission_types.sort();
        mission_types.dedup();
        let missions = if mission_types.is_empty() {
            vec![]
        } else {
            self.store
                .load_missions(&mission_types, now)
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "mission catalog unavailable");
                    vec![]
                })
        };
        let mission_ids: Vec<Uuid> = missions.iter().map(|m| m.id).collect();
        let progress = if mission_ids.is_empty() {
            vec![]
        } else {
            self.store
                .load_mission_progress(attacker.id, &mission_ids)
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "mission progress unavailable");
                    vec![]
                })
        };
        let mission_outcome = effects::advance_missions(&tags, &missions, &progress);

        let memberships = self
            .store
            .load_clan_memberships(attacker.id)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "clan memberships unavailable");
                vec![]
            });
        let mut clan_missions = Vec::new();
        for membership in &memberships {
            match self.store.load_clan_missions(membership.clan_id).await {
                Ok(mut missions) => clan_missions.append(&mut missions),
                Err(e) => warn!(error = %e, clan_id = %membership.clan_id, "clan missions unavailable"),
            }
        }

        let total_points =
            decision.base_points + challenge_outcome.points + mission_outcome.rewards.points;
        let (clan_updates, clan_missions_completed) = effects::clan_contributions(
            attacker,
            decision.action,
            total_points,
            &tags,
            &memberships,
            &clan_missions,
        );

        // Fold the bonus points and earned shields into the attacker's delta.
        if let Some(delta) = decision
            .profile_deltas
            .iter_mut()
            .find(|d| d.user_id == attacker.id)
        {
            delta.points += challenge_outcome.points + mission_outcome.rewards.points;
            delta.shield_charges += mission_outcome.rewards.shields as i32;
        }
        decision.event.points_awarded = total_points;

        let run = Run {
            id: Uuid::new_v4(),
            user_id: attacker.id,
            path: raw_path.to_vec(),
            distance: metrics.distance_m,
            duration_seconds: metrics.duration_seconds,
            avg_pace: metrics.avg_pace,
            territories_conquered: decision.territories_conquered,
            territories_stolen: decision.territories_stolen,
            territories_lost: 0,
            points_gained: total_points,
            created_at: now,
        };

        let plan = ClaimPlan {
            user_id: attacker.id,
            action: decision.action,
            primary_territory_id: decision.territory.id,
            territory_writes: decision.territory_writes.clone(),
            clear_shields: decision.clear_shields.clone(),
            run: run.clone(),
            events: vec![decision.event.clone()],
            profile_deltas: decision.profile_deltas.clone(),
            poi_update: (!tags.is_empty()).then(|| PoiTagUpdate {
                territory_id: decision.territory.id,
                tags: tags.clone(),
                summary: poi_summary,
            }),
            challenge_claims: challenge_outcome.claimed.clone(),
            mission_updates: mission_outcome.updates.clone(),
            clan_updates,
        };

        match self.store.apply_claim(&plan).await.map_err(persistence)? {
            ApplyOutcome::VersionConflict => Ok(CommitResult::Conflict),
            ApplyOutcome::Applied {
                territory_id,
                run_id,
            } => {
                info!(
                    user_id = %attacker.id,
                    action = %decision.action,
                    territory_id = %territory_id,
                    points = total_points,
                    "claim accepted"
                );
                if let Some(notice) = &decision.defender_notice {
                    if let Err(e) = self.notifier.notify(notice).await {
                        warn!(error = %e, "failed to deliver defender notification");
                    }
                }
                for label in &challenge_outcome.labels {
                    self.push_to(attacker.id, "Challenge complete!", label).await;
                }
                for title in &mission_outcome.completed_titles {
                    self.push_to(attacker.id, "Mission complete!", title).await;
                }
                Ok(CommitResult::Done(ClaimReport {
                    action: decision.action,
                    territory_id,
                    run_id,
                    points_gained: total_points,
                    territories_conquered: decision.territories_conquered,
                    territories_stolen: decision.territories_stolen,
                    territories_lost: 0,
                    protected_until: decision.territory.protected_until.unwrap_or(now),
                    cooldown_duration_ms: STEAL_COOLDOWN_MS,
                    poi_tags: tags,
                    challenge_rewards: challenge_outcome.labels,
                    missions_completed: mission_outcome.completed_titles,
                    mission_rewards: mission_outcome.rewards,
                    clan_missions_completed,
                }))
            }
        }
    }
}

impl ClaimService {
    async fn push_to(&self, user_id: Uuid, title: &str, body: &str) {
        let intent = stridefall_common::NotificationIntent {
            user_id,
            title: title.to_string(),
            body: body.to_string(),
            tag: None,
            url: None,
        };
        if let Err(e) = self.notifier.notify(&intent).await {
            warn!(error = %e, "failed to deliver notification");
        }
    }
}

enum CommitResult {
    Done(ClaimReport),
    Conflict,
}

fn persistence(e: anyhow::Error) -> ClaimError {
    ClaimError::Persistence(e.to_string())
}
