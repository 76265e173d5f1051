// Trait abstractions for everything durable or deliverable.
//
// TerritoryStore — reads are snapshot loads, the only write entrypoints are
//   `record_event` (failed-attempt audit rows) and `apply_claim` (the atomic
//   commit boundary for an accepted claim).
// Notifier — push intents, fire-and-forget.
// Authenticator — token → player resolution; the real identity provider is
//   external.
//
// These enable deterministic testing with MemoryStore and RecordingNotifier:
// no database, no push gateway, `cargo test` in seconds.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use stridefall_common::{
    ClanMembership, ClanMission, MapChallenge, Mission, MissionProgress, NotificationIntent, Poi,
    Profile, Shield, Territory, TerritoryEvent,
};

use crate::plan::{ApplyOutcome, ClaimPlan};

#[async_trait]
pub trait TerritoryStore: Send + Sync {
    // --- Claim evaluation reads (one consistent snapshot per claim) ---

    /// All live territories with their current versions.
    async fn load_territories_snapshot(&self) -> Result<Vec<Territory>>;

    async fn load_profile(&self, user_id: Uuid) -> Result<Option<Profile>>;

    /// Shields that have not expired as of `now`.
    async fn load_shields(&self, now: DateTime<Utc>) -> Result<Vec<Shield>>;

    /// When this attacker last attempted anything against this territory.
    async fn last_attack_attempt(
        &self,
        territory_id: Uuid,
        attacker_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>>;

    // --- Writes ---

    /// Append one audit row. Used for rejected steal/interior attempts;
    /// accepted claims carry their event inside the plan instead.
    async fn record_event(&self, event: &TerritoryEvent) -> Result<()>;

    /// Apply an accepted claim atomically. Must reject the whole plan with
    /// [`ApplyOutcome::VersionConflict`] if any territory the plan read has
    /// since moved.
    async fn apply_claim(&self, plan: &ClaimPlan) -> Result<ApplyOutcome>;

    // --- External catalogs (read-only; failures here are non-fatal) ---

    async fn load_pois(&self) -> Result<Vec<Poi>>;

    async fn load_active_map_challenges(&self, now: DateTime<Utc>) -> Result<Vec<MapChallenge>>;

    /// Challenge ids this user has already claimed.
    async fn load_challenge_claims(&self, user_id: Uuid) -> Result<Vec<Uuid>>;

    /// Active missions whose type matches one of the given POI categories.
    async fn load_missions(
        &self,
        mission_types: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<Mission>>;

    async fn load_mission_progress(
        &self,
        user_id: Uuid,
        mission_ids: &[Uuid],
    ) -> Result<Vec<MissionProgress>>;

    async fn load_clan_memberships(&self, user_id: Uuid) -> Result<Vec<ClanMembership>>;

    async fn load_clan_missions(&self, clan_id: Uuid) -> Result<Vec<ClanMission>>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one push intent. Failures are logged by callers and never
    /// affect the claim result.
    async fn notify(&self, intent: &NotificationIntent) -> Result<()>;
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve a bearer token to a player id. `None` means unauthenticated.
    async fn resolve_user(&self, token: &str) -> Result<Option<Uuid>>;
}
