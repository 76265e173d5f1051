//! In-memory store and notifier for tests and local development. Same
//! atomicity contract as a real backend: `apply_claim` verifies every
//! expected version before touching anything.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use stridefall_common::{
    ClanMembership, ClanMission, MapChallenge, Mission, MissionProgress, NotificationIntent, Poi,
    Profile, Run, Shield, Territory, TerritoryEvent,
};

use crate::plan::{ApplyOutcome, ClaimPlan, TerritoryWrite};
use crate::ports::{Authenticator, Notifier, TerritoryStore};

#[derive(Default)]
struct Inner {
    territories: HashMap<Uuid, Territory>,
    profiles: HashMap<Uuid, Profile>,
    shields: Vec<Shield>,
    events: Vec<TerritoryEvent>,
    runs: Vec<Run>,
    pois: Vec<Poi>,
    challenges: Vec<MapChallenge>,
    /// (user, challenge) pairs already claimed.
    challenge_claims: HashSet<(Uuid, Uuid)>,
    missions: Vec<Mission>,
    mission_progress: HashMap<(Uuid, Uuid), MissionProgress>,
    clan_memberships: Vec<ClanMembership>,
    clan_missions: Vec<ClanMission>,
    clan_feed: Vec<(Uuid, String)>,
    /// Per-clan running totals: (points, territories).
    clan_stats: HashMap<Uuid, (i64, i32)>,
    tokens: HashMap<String, Uuid>,
    /// Test hook: force this many applies to report a version conflict.
    forced_conflicts: u32,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- seeding ---

    pub fn insert_profile(&self, profile: Profile) {
        self.inner
            .lock()
            .unwrap()
            .profiles
            .insert(profile.id, profile);
    }

    pub fn insert_territory(&self, territory: Territory) {
        self.inner
            .lock()
            .unwrap()
            .territories
            .insert(territory.id, territory);
    }

    pub fn insert_shield(&self, shield: Shield) {
        self.inner.lock().unwrap().shields.push(shield);
    }

    pub fn insert_poi(&self, poi: Poi) {
        self.inner.lock().unwrap().pois.push(poi);
    }

    pub fn insert_challenge(&self, challenge: MapChallenge) {
        self.inner.lock().unwrap().challenges.push(challenge);
    }

    pub fn insert_mission(&self, mission: Mission) {
        self.inner.lock().unwrap().missions.push(mission);
    }

    pub fn insert_mission_progress(&self, progress: MissionProgress) {
        self.inner
            .lock()
            .unwrap()
            .mission_progress
            .insert((progress.user_id, progress.mission_id), progress);
    }

    pub fn insert_clan_membership(&self, membership: ClanMembership) {
        self.inner.lock().unwrap().clan_memberships.push(membership);
    }

    pub fn insert_clan_mission(&self, mission: ClanMission) {
        self.inner.lock().unwrap().clan_missions.push(mission);
    }

    pub fn insert_token(&self, token: &str, user_id: Uuid) {
        self.inner
            .lock()
            .unwrap()
            .tokens
            .insert(token.to_string(), user_id);
    }

    /// Make the next `n` applies fail with a version conflict.
    pub fn force_version_conflicts(&self, n: u32) {
        self.inner.lock().unwrap().forced_conflicts = n;
    }

    // --- assertion helpers ---

    pub fn territory(&self, id: Uuid) -> Option<Territory> {
        self.inner.lock().unwrap().territories.get(&id).cloned()
    }

    pub fn territories(&self) -> Vec<Territory> {
        self.inner
            .lock()
            .unwrap()
            .territories
            .values()
            .cloned()
            .collect()
    }

    pub fn profile(&self, id: Uuid) -> Option<Profile> {
        self.inner.lock().unwrap().profiles.get(&id).cloned()
    }

    pub fn events(&self) -> Vec<TerritoryEvent> {
        self.inner.lock().unwrap().events.clone()
    }

    pub fn runs(&self) -> Vec<Run> {
        self.inner.lock().unwrap().runs.clone()
    }

    pub fn clan_feed(&self) -> Vec<(Uuid, String)> {
        self.inner.lock().unwrap().clan_feed.clone()
    }

    /// (points, territories) accumulated by a clan.
    pub fn clan_stats(&self, clan_id: Uuid) -> (i64, i32) {
        self.inner
            .lock()
            .unwrap()
            .clan_stats
            .get(&clan_id)
            .copied()
            .unwrap_or((0, 0))
    }

    pub fn clan_membership(&self, clan_id: Uuid, user_id: Uuid) -> Option<ClanMembership> {
        self.inner
            .lock()
            .unwrap()
            .clan_memberships
            .iter()
            .find(|m| m.clan_id == clan_id && m.user_id == user_id)
            .cloned()
    }

    pub fn mission_progress(&self, user_id: Uuid, mission_id: Uuid) -> Option<MissionProgress> {
        self.inner
            .lock()
            .unwrap()
            .mission_progress
            .get(&(user_id, mission_id))
            .cloned()
    }

    pub fn challenge_claimed(&self, user_id: Uuid, challenge_id: Uuid) -> bool {
        self.inner
            .lock()
            .unwrap()
            .challenge_claims
            .contains(&(user_id, challenge_id))
    }
}

#[async_trait]
impl TerritoryStore for MemoryStore {
    async fn load_territories_snapshot(&self) -> Result<Vec<Territory>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .territories
            .values()
            .cloned()
            .collect())
    }

    async fn load_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        Ok(self.inner.lock().unwrap().profiles.get(&user_id).cloned())
    }

    async fn load_shields(&self, now: DateTime<Utc>) -> Result<Vec<Shield>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .shields
            .iter()
            .filter(|s| s.expires_at > now)
            .cloned()
            .collect())
    }

    async fn last_attack_attempt(
        &self,
        territory_id: Uuid,
        attacker_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| {
                e.territory_id == territory_id
                    && e.attacker_id == attacker_id
                    && e.kind == stridefall_common::EventKind::Steal
            })
            .map(|e| e.created_at)
            .max())
    }

    async fn record_event(&self, event: &TerritoryEvent) -> Result<()> {
        self.inner.lock().unwrap().events.push(event.clone());
        Ok(())
    }

    async fn apply_claim(&self, plan: &ClaimPlan) -> Result<ApplyOutcome> {
        let mut inner = self.inner.lock().unwrap();

        if inner.forced_conflicts > 0 {
            inner.forced_conflicts -= 1;
            return Ok(ApplyOutcome::VersionConflict);
        }

        // Verify everything before writing anything.
        for write in &plan.territory_writes {
            match write {
                TerritoryWrite::Create(territory) => {
                    if inner.territories.contains_key(&territory.id) {
                        return Ok(ApplyOutcome::VersionConflict);
                    }
                }
                TerritoryWrite::Update {
                    expected_version,
                    territory,
                } => match inner.territories.get(&territory.id) {
                    Some(current) if current.version == *expected_version => {}
                    _ => return Ok(ApplyOutcome::VersionConflict),
                },
            }
        }

        for write in &plan.territory_writes {
            match write {
                TerritoryWrite::Create(territory) => {
                    let mut territory = territory.clone();
                    territory.version = 1;
                    inner.territories.insert(territory.id, territory);
                }
                TerritoryWrite::Update {
                    expected_version,
                    territory,
                } => {
                    let mut territory = territory.clone();
                    territory.version = expected_version + 1;
                    inner.territories.insert(territory.id, territory);
                }
            }
        }

        inner
            .shields
            .retain(|s| !plan.clear_shields.contains(&s.id));
        inner.runs.push(plan.run.clone());
        inner.events.extend(plan.events.iter().cloned());

        for delta in &plan.profile_deltas {
            if let Some(profile) = inner.profiles.get_mut(&delta.user_id) {
                profile.total_points = (profile.total_points + delta.points).max(0);
                profile.season_points = (profile.season_points + delta.points).max(0);
                profile.historical_points = (profile.historical_points + delta.points).max(0);
                profile.total_territories =
                    (profile.total_territories as i64 + delta.territories as i64).max(0) as u32;
                profile.total_distance += delta.distance_m;
                profile.shield_charges =
                    (profile.shield_charges as i64 + delta.shield_charges as i64).max(0) as u32;
            }
        }

        if let Some(update) = &plan.poi_update {
            if let Some(territory) = inner.territories.get_mut(&update.territory_id) {
                territory.tags = update.tags.clone();
                territory.poi_summary = update.summary.clone();
            }
        }

        for challenge_id in &plan.challenge_claims {
            inner.challenge_claims.insert((plan.user_id, *challenge_id));
        }

        for advance in &plan.mission_updates {
            let entry = inner
                .mission_progress
                .entry((plan.user_id, advance.mission_id))
                .or_insert(MissionProgress {
                    mission_id: advance.mission_id,
                    user_id: plan.user_id,
                    progress: 0,
                    completed: false,
                    completed_at: None,
                });
            entry.progress = advance.progress;
            if advance.completed && !entry.completed {
                entry.completed = true;
                entry.completed_at = Some(plan.run.created_at);
            }
        }

        for update in &plan.clan_updates {
            let stats = inner.clan_stats.entry(update.clan_id).or_insert((0, 0));
            stats.0 += update.points;
            stats.1 = (stats.1 + update.territories).max(0);
            if let Some(membership) = inner
                .clan_memberships
                .iter_mut()
                .find(|m| m.clan_id == update.clan_id && m.user_id == plan.user_id)
            {
                membership.contribution_points += update.points;
            }
            if let Some(entry) = &update.feed_entry {
                inner.clan_feed.push((update.clan_id, entry.clone()));
            }
            for advance in &update.missions {
                if let Some(mission) = inner
                    .clan_missions
                    .iter_mut()
                    .find(|m| m.id == advance.mission_id)
                {
                    mission.current_progress = advance.progress;
                }
            }
        }

        Ok(ApplyOutcome::Applied {
            territory_id: plan.primary_territory_id,
            run_id: plan.run.id,
        })
    }

    async fn load_pois(&self) -> Result<Vec<Poi>> {
        Ok(self.inner.lock().unwrap().pois.clone())
    }

    async fn load_active_map_challenges(&self, now: DateTime<Utc>) -> Result<Vec<MapChallenge>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .challenges
            .iter()
            .filter(|c| c.active && c.start_date <= now && c.end_date >= now)
            .cloned()
            .collect())
    }

    async fn load_challenge_claims(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .challenge_claims
            .iter()
            .filter(|(user, _)| *user == user_id)
            .map(|(_, challenge)| *challenge)
            .collect())
    }

    async fn load_missions(
        &self,
        mission_types: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<Mission>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .missions
            .iter()
            .filter(|m| {
                m.active
                    && m.start_date <= now
                    && m.end_date >= now
                    && mission_types.contains(&m.mission_type)
            })
            .cloned()
            .collect())
    }

    async fn load_mission_progress(
        &self,
        user_id: Uuid,
        mission_ids: &[Uuid],
    ) -> Result<Vec<MissionProgress>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .mission_progress
            .values()
            .filter(|p| p.user_id == user_id && mission_ids.contains(&p.mission_id))
            .cloned()
            .collect())
    }

    async fn load_clan_memberships(&self, user_id: Uuid) -> Result<Vec<ClanMembership>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .clan_memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn load_clan_missions(&self, clan_id: Uuid) -> Result<Vec<ClanMission>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .clan_missions
            .iter()
            .filter(|m| m.clan_id == clan_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Authenticator for MemoryStore {
    async fn resolve_user(&self, token: &str) -> Result<Option<Uuid>> {
        Ok(self.inner.lock().unwrap().tokens.get(token).copied())
    }
}

/// Collects every intent instead of delivering it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<NotificationIntent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<NotificationIntent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, intent: &NotificationIntent) -> Result<()> {
        self.sent.lock().unwrap().push(intent.clone());
        Ok(())
    }
}
