//! The claim plan — the single atomic write set an accepted claim commits
//! through — and the report returned to the caller.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stridefall_common::{PoiTag, Run, Territory, TerritoryEvent};

/// What an accepted claim did. Wire values match the original client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClaimAction {
    New,
    Reinforced,
    Stolen,
    #[serde(rename = "inner_conquest")]
    InteriorConquest,
}

impl std::fmt::Display for ClaimAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimAction::New => write!(f, "new"),
            ClaimAction::Reinforced => write!(f, "reinforced"),
            ClaimAction::Stolen => write!(f, "stolen"),
            ClaimAction::InteriorConquest => write!(f, "inner_conquest"),
        }
    }
}

/// One territory row mutation inside a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TerritoryWrite {
    /// Insert a brand-new territory (version starts at 1).
    Create(Territory),
    /// Replace an existing row. `expected_version` is the version the claim
    /// evaluation read; a mismatch fails the whole plan.
    Update {
        expected_version: u64,
        territory: Territory,
    },
}

/// Signed adjustments to a player's aggregates. Points apply to all three
/// buckets (total/season/historical); negative results floor at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDelta {
    pub user_id: Uuid,
    pub points: i64,
    pub territories: i32,
    pub distance_m: f64,
    pub shield_charges: i32,
}

impl ProfileDelta {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            points: 0,
            territories: 0,
            distance_m: 0.0,
            shield_charges: 0,
        }
    }
}

/// POI labels to stamp onto the claimed territory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoiTagUpdate {
    pub territory_id: Uuid,
    pub tags: Vec<PoiTag>,
    pub summary: Option<String>,
}

/// Progress bump for one mission (user- or clan-scoped).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionAdvance {
    pub mission_id: Uuid,
    pub progress: u32,
    pub completed: bool,
}

/// Per-clan contribution from an accepted claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClanUpdate {
    pub clan_id: Uuid,
    pub points: i64,
    pub territories: i32,
    pub feed_entry: Option<String>,
    pub missions: Vec<MissionAdvance>,
}

/// Everything an accepted claim writes, applied atomically by the store.
/// Partial application must never be observable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimPlan {
    pub user_id: Uuid,
    pub action: ClaimAction,
    /// The territory reported back to the caller (the created or mutated one).
    pub primary_territory_id: Uuid,
    pub territory_writes: Vec<TerritoryWrite>,
    /// Territories whose shields are consumed by this claim.
    pub clear_shields: Vec<Uuid>,
    pub run: Run,
    pub events: Vec<TerritoryEvent>,
    pub profile_deltas: Vec<ProfileDelta>,
    pub poi_update: Option<PoiTagUpdate>,
    /// Challenge ids newly claimed by this user.
    pub challenge_claims: Vec<Uuid>,
    pub mission_updates: Vec<MissionAdvance>,
    pub clan_updates: Vec<ClanUpdate>,
}

/// Result of the atomic commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied { territory_id: Uuid, run_id: Uuid },
    /// Some territory in the plan moved since it was read; the claim must be
    /// re-evaluated against a fresh snapshot.
    VersionConflict,
}

/// Bonus points and shield charges earned from missions this claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MissionRewards {
    pub points: i64,
    pub shields: u32,
}

/// Success payload returned to the claiming runner.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClaimReport {
    pub action: ClaimAction,
    pub territory_id: Uuid,
    pub run_id: Uuid,
    pub points_gained: i64,
    pub territories_conquered: u32,
    pub territories_stolen: u32,
    pub territories_lost: u32,
    pub protected_until: DateTime<Utc>,
    pub cooldown_duration_ms: i64,
    pub poi_tags: Vec<PoiTag>,
    pub challenge_rewards: Vec<String>,
    pub missions_completed: Vec<String>,
    pub mission_rewards: MissionRewards,
    pub clan_missions_completed: Vec<String>,
}
