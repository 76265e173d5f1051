use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Geo types ---

/// A single GPS fix from a run trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            accuracy: None,
            timestamp: None,
        }
    }
}

// --- Territories ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TerritoryStatus {
    Idle,
    Protected,
    Contested,
}

impl std::fmt::Display for TerritoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerritoryStatus::Idle => write!(f, "idle"),
            TerritoryStatus::Protected => write!(f, "protected"),
            TerritoryStatus::Contested => write!(f, "contested"),
        }
    }
}

/// A POI label attached to a territory. Serialized as `{type, name}` for
/// client compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PoiTag {
    #[serde(rename = "type")]
    pub category: String,
    pub name: String,
}

/// One owned polygon on the shared map. Exactly one live row per id;
/// ownership transfers mutate in place.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Territory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub coordinates: Vec<Coordinate>,
    /// m², spherical.
    pub area: f64,
    /// m.
    pub perimeter: f64,
    /// min/km of the claiming run.
    pub avg_pace: f64,
    /// Slowest pace (min/km) an attacker may run and still steal this.
    pub required_pace: f64,
    pub protected_until: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub status: TerritoryStatus,
    /// Points currently carried by the territory.
    pub points: i64,
    /// Points awarded for the conquest that produced the current ownership;
    /// removed from the owner's aggregates if the territory is lost.
    pub conquest_points: i64,
    pub last_attacker_id: Option<Uuid>,
    pub last_defender_id: Option<Uuid>,
    pub last_attack_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<PoiTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poi_summary: Option<String>,
    /// Optimistic-concurrency stamp; bumped on every store write.
    #[serde(default)]
    pub version: u64,
}

/// An unexpired shield blocks theft and interior conquest outright.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Shield {
    pub id: Uuid,
    pub territory_id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

// --- Players ---

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub total_points: i64,
    pub season_points: i64,
    pub historical_points: i64,
    pub total_territories: u32,
    /// Accumulated run distance in meters.
    pub total_distance: f64,
    /// Consumable shields earned from missions.
    pub shield_charges: u32,
}

// --- Claims ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClaimSource {
    #[default]
    Live,
    Import,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClaimRequest {
    pub path: Vec<Coordinate>,
    pub duration_seconds: f64,
    #[serde(default)]
    pub source: ClaimSource,
}

// --- Audit trail ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Conquest,
    Steal,
    Reinforce,
    Defense,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Conquest => write!(f, "conquest"),
            EventKind::Steal => write!(f, "steal"),
            EventKind::Reinforce => write!(f, "reinforce"),
            EventKind::Defense => write!(f, "defense"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventResult {
    Success,
    Failed,
    Neutral,
}

/// Append-only record of one claim attempt against a territory, including
/// rejected attacks. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TerritoryEvent {
    pub id: Uuid,
    pub territory_id: Uuid,
    pub attacker_id: Uuid,
    pub defender_id: Option<Uuid>,
    pub kind: EventKind,
    pub result: EventResult,
    pub overlap_ratio: f64,
    pub pace: f64,
    pub area: f64,
    pub points_awarded: i64,
    pub created_at: DateTime<Utc>,
}

/// Immutable record of the run derived from a claim request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Run {
    pub id: Uuid,
    pub user_id: Uuid,
    pub path: Vec<Coordinate>,
    /// Meters, over the raw (not loop-merged) path.
    pub distance: f64,
    pub duration_seconds: f64,
    pub avg_pace: f64,
    pub territories_conquered: u32,
    pub territories_stolen: u32,
    pub territories_lost: u32,
    pub points_gained: i64,
    pub created_at: DateTime<Utc>,
}

// --- External catalogs (read-only snapshots) ---

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Poi {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub coordinates: Vec<Coordinate>,
}

/// A map bonus with a marker point; claimable once per user while active.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MapChallenge {
    pub id: Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub reward_points: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub active: bool,
}

/// A rotation-scoped mission advanced by running through matching POIs.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Mission {
    pub id: Uuid,
    pub title: String,
    pub mission_type: String,
    pub target_count: u32,
    pub reward_points: i64,
    pub reward_shields: u32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MissionProgress {
    pub mission_id: Uuid,
    pub user_id: Uuid,
    pub progress: u32,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClanRole {
    Founder,
    Officer,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClanMembership {
    pub clan_id: Uuid,
    pub clan_name: String,
    pub user_id: Uuid,
    pub role: ClanRole,
    pub contribution_points: i64,
}

/// A clan-scoped mission; progress is shared by all members.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClanMission {
    pub id: Uuid,
    pub clan_id: Uuid,
    pub title: String,
    pub mission_type: String,
    pub target_count: u32,
    pub current_progress: u32,
    pub reward_points: i64,
    pub reward_shields: u32,
    pub active: bool,
}

// --- Notifications ---

/// A push notification the engine wants delivered. Delivery transport is
/// external; intents are fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationIntent {
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}
