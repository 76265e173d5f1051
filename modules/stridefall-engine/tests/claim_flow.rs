//! End-to-end claim flows against the in-memory store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use stridefall_common::{
    ClaimError, ClaimRequest, ClaimSource, ClanMembership, ClanMission, ClanRole, Coordinate,
    EventKind, EventResult, MapChallenge, Mission, Poi, Profile, Shield, Territory,
    TerritoryStatus,
};
use stridefall_engine::{ClaimAction, ClaimService, MemoryStore, RecordingNotifier};
use stridefall_geo::spherical_polygon_area;

const DEG_100M: f64 = 100.0 / 111_194.93;
// Sides ~101 m keep distance and area safely above their floor() boundaries
// when a test pins an exact point total.
const CLAIM_SIDE: f64 = 1.01 * DEG_100M;

fn square(lat0: f64, lng0: f64, side_deg: f64) -> Vec<Coordinate> {
    vec![
        Coordinate::new(lat0, lng0),
        Coordinate::new(lat0 + side_deg, lng0),
        Coordinate::new(lat0 + side_deg, lng0 + side_deg),
        Coordinate::new(lat0, lng0 + side_deg),
        Coordinate::new(lat0, lng0),
    ]
}

fn profile(name: &str, points: i64) -> Profile {
    Profile {
        id: Uuid::new_v4(),
        username: name.to_string(),
        total_points: points,
        season_points: points,
        historical_points: points,
        total_territories: 0,
        total_distance: 0.0,
        shield_charges: 0,
    }
}

fn territory(owner: Uuid, coords: Vec<Coordinate>, avg_pace: f64) -> Territory {
    let area = spherical_polygon_area(&coords);
    Territory {
        id: Uuid::new_v4(),
        user_id: owner,
        coordinates: coords,
        area,
        perimeter: 400.0,
        avg_pace,
        required_pace: avg_pace - 0.5,
        protected_until: None,
        cooldown_until: None,
        status: TerritoryStatus::Idle,
        points: 200,
        conquest_points: 150,
        last_attacker_id: None,
        last_defender_id: None,
        last_attack_at: None,
        tags: vec![],
        poi_summary: None,
        version: 1,
    }
}

/// Duration that yields `pace` min/km over the standard 400 m square run.
fn duration_for_pace(distance_m: f64, pace: f64) -> f64 {
    pace * 60.0 * distance_m / 1_000.0
}

fn request(path: Vec<Coordinate>, pace: f64) -> ClaimRequest {
    ClaimRequest {
        path,
        duration_seconds: duration_for_pace(400.0, pace),
        source: ClaimSource::Live,
    }
}

fn setup() -> (Arc<MemoryStore>, Arc<RecordingNotifier>, ClaimService) {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let service = ClaimService::new(store.clone(), notifier.clone());
    (store, notifier, service)
}

// --- new claims ---

#[tokio::test]
async fn new_claim_creates_territory_and_updates_profile() {
    let (store, _, service) = setup();
    let runner = profile("ada", 0);
    store.insert_profile(runner.clone());

    let now = Utc::now();
    let report = service
        .process_claim(runner.id, &request(square(0.0, 0.0, CLAIM_SIDE), 5.0), now)
        .await
        .expect("claim accepted");

    assert_eq!(report.action, ClaimAction::New);
    // ~404 m → 4 points, ~10,200 m² → 5 points, new bonus 50.
    assert_eq!(report.points_gained, 59);
    assert_eq!(report.territories_conquered, 1);
    assert!(report.protected_until > now);

    let stored = store.territory(report.territory_id).expect("stored");
    assert_eq!(stored.user_id, runner.id);
    assert_eq!(stored.status, TerritoryStatus::Protected);
    assert!(stored.cooldown_until.unwrap() > now);
    assert_eq!(stored.version, 1);

    let updated = store.profile(runner.id).expect("profile");
    assert_eq!(updated.total_points, 59);
    assert_eq!(updated.total_territories, 1);
    assert!((updated.total_distance - 404.0).abs() < 5.0);

    assert_eq!(store.runs().len(), 1);
    assert_eq!(store.events().len(), 1);
    assert_eq!(store.events()[0].kind, EventKind::Conquest);
    assert_eq!(store.events()[0].result, EventResult::Success);
}

#[tokio::test]
async fn tiny_polygon_is_rejected() {
    let (store, _, service) = setup();
    let runner = profile("ada", 0);
    store.insert_profile(runner.clone());

    // ~5 m square, well under the 50 m² floor.
    let err = service
        .process_claim(
            runner.id,
            &request(square(0.0, 0.0, DEG_100M / 20.0), 5.0),
            Utc::now(),
        )
        .await
        .expect_err("rejected");
    assert!(matches!(err, ClaimError::TerritoryTooSmall { .. }));
    assert!(store.territories().is_empty());
}

#[tokio::test]
async fn zero_duration_is_rejected() {
    let (store, _, service) = setup();
    let runner = profile("ada", 0);
    store.insert_profile(runner.clone());

    let err = service
        .process_claim(
            runner.id,
            &ClaimRequest {
                path: square(0.0, 0.0, DEG_100M),
                duration_seconds: 0.0,
                source: ClaimSource::Live,
            },
            Utc::now(),
        )
        .await
        .expect_err("rejected");
    assert_eq!(err, ClaimError::InvalidDuration);
}

#[tokio::test]
async fn unknown_user_is_rejected() {
    let (_, _, service) = setup();
    let err = service
        .process_claim(
            Uuid::new_v4(),
            &request(square(0.0, 0.0, DEG_100M), 5.0),
            Utc::now(),
        )
        .await
        .expect_err("rejected");
    assert_eq!(err, ClaimError::AuthFailure);
}

// --- steal ---

#[tokio::test]
async fn steal_transfers_territory_and_notifies_defender() {
    let (store, notifier, service) = setup();
    let attacker = profile("ada", 0);
    let defender = profile("bo", 200);
    store.insert_profile(attacker.clone());
    store.insert_profile(defender.clone());
    let target = territory(defender.id, square(0.0, 0.0, DEG_100M), 6.0);
    store.insert_territory(target.clone());

    let now = Utc::now();
    let report = service
        .process_claim(attacker.id, &request(square(0.0, 0.0, CLAIM_SIDE), 4.0), now)
        .await
        .expect("steal accepted");

    assert_eq!(report.action, ClaimAction::Stolen);
    assert_eq!(report.territories_stolen, 1);
    // 4 + 5 + 75.
    assert_eq!(report.points_gained, 84);

    let stored = store.territory(target.id).expect("territory");
    assert_eq!(stored.user_id, attacker.id);
    assert_eq!(stored.version, 2);
    assert!(stored.cooldown_until.unwrap() > now);

    // Defender forfeits the conquest points, floored at zero territories.
    let loser = store.profile(defender.id).expect("profile");
    assert_eq!(loser.total_points, 200 - 150);
    assert_eq!(loser.total_territories, 0);

    let pushes = notifier.sent();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].user_id, defender.id);
    assert!(pushes[0].title.contains("stolen"));
}

#[tokio::test]
async fn slow_attacker_cannot_steal() {
    let (store, _, service) = setup();
    let attacker = profile("ada", 0);
    let defender = profile("bo", 0);
    store.insert_profile(attacker.clone());
    store.insert_profile(defender.clone());
    let target = territory(defender.id, square(0.0, 0.0, DEG_100M), 6.0);
    store.insert_territory(target.clone());

    // Level-1 defender: required pace 5.5; attacker runs 5.8.
    let err = service
        .process_claim(
            attacker.id,
            &request(square(0.0, 0.0, DEG_100M), 5.8),
            Utc::now(),
        )
        .await
        .expect_err("rejected");
    assert!(matches!(err, ClaimError::PaceInsufficient { .. }));

    // The failed attempt is on the audit trail and arms the cooldown.
    let events = store.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Steal);
    assert_eq!(events[0].result, EventResult::Failed);

    let err = service
        .process_claim(
            attacker.id,
            &request(square(0.0, 0.0, DEG_100M), 4.0),
            Utc::now(),
        )
        .await
        .expect_err("cooldown");
    assert!(err.cooldown_remaining_ms().is_some());
}

#[tokio::test]
async fn shield_blocks_the_steal() {
    let (store, notifier, service) = setup();
    let attacker = profile("ada", 0);
    let defender = profile("bo", 0);
    store.insert_profile(attacker.clone());
    store.insert_profile(defender.clone());
    let target = territory(defender.id, square(0.0, 0.0, DEG_100M), 6.0);
    store.insert_territory(target.clone());
    store.insert_shield(Shield {
        id: Uuid::new_v4(),
        territory_id: target.id,
        user_id: defender.id,
        expires_at: Utc::now() + Duration::hours(2),
    });

    let now = Utc::now();
    let err = service
        .process_claim(attacker.id, &request(square(0.0, 0.0, DEG_100M), 4.0), now)
        .await
        .expect_err("rejected");
    assert_eq!(err, ClaimError::ShieldActive);

    // Ownership unchanged; the failed steal and the defense are both
    // logged, and the defender is told.
    assert_eq!(store.territory(target.id).unwrap().user_id, defender.id);
    let events = store.events();
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .any(|e| e.kind == EventKind::Steal && e.result == EventResult::Failed));
    assert!(events
        .iter()
        .any(|e| e.kind == EventKind::Defense && e.result == EventResult::Success));
    assert_eq!(notifier.sent()[0].user_id, defender.id);

    // The blocked attempt armed the cooldown: the attacker cannot just
    // wait out the shield and strike again.
    let err = service
        .process_claim(
            attacker.id,
            &request(square(0.0, 0.0, DEG_100M), 4.0),
            now_plus(now, 3),
        )
        .await
        .expect_err("rejected");
    assert!(err.cooldown_remaining_ms().is_some());
}

#[tokio::test]
async fn cooldown_rejection_still_leaves_an_audit_row() {
    let (store, notifier, service) = setup();
    let attacker = profile("ada", 0);
    let defender = profile("bo", 0);
    store.insert_profile(attacker.clone());
    store.insert_profile(defender.clone());
    let mut target = territory(defender.id, square(0.0, 0.0, DEG_100M), 6.0);
    target.cooldown_until = Some(Utc::now() + Duration::hours(3));
    store.insert_territory(target.clone());

    let err = service
        .process_claim(
            attacker.id,
            &request(square(0.0, 0.0, DEG_100M), 4.0),
            Utc::now(),
        )
        .await
        .expect_err("rejected");
    assert!(err.cooldown_remaining_ms().is_some());

    let events = store.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Steal);
    assert_eq!(events[0].result, EventResult::Failed);
    assert_eq!(notifier.sent().len(), 1);
    assert_eq!(notifier.sent()[0].user_id, defender.id);
}

#[tokio::test]
async fn expired_shield_does_not_block() {
    let (store, _, service) = setup();
    let attacker = profile("ada", 0);
    let defender = profile("bo", 0);
    store.insert_profile(attacker.clone());
    store.insert_profile(defender.clone());
    let target = territory(defender.id, square(0.0, 0.0, DEG_100M), 6.0);
    store.insert_territory(target.clone());
    store.insert_shield(Shield {
        id: Uuid::new_v4(),
        territory_id: target.id,
        user_id: defender.id,
        expires_at: Utc::now() - Duration::hours(1),
    });

    let report = service
        .process_claim(
            attacker.id,
            &request(square(0.0, 0.0, DEG_100M), 4.0),
            Utc::now(),
        )
        .await
        .expect("accepted");
    assert_eq!(report.action, ClaimAction::Stolen);
}

// --- reinforce ---

#[tokio::test]
async fn reinforcing_own_territory_awards_no_points() {
    let (store, _, service) = setup();
    let runner = profile("ada", 500);
    store.insert_profile(runner.clone());
    let own = territory(runner.id, square(0.0, 0.0, DEG_100M), 6.0);
    store.insert_territory(own.clone());

    let now = Utc::now();
    let report = service
        .process_claim(runner.id, &request(square(0.0, 0.0, DEG_100M), 5.0), now)
        .await
        .expect("accepted");

    assert_eq!(report.action, ClaimAction::Reinforced);
    assert_eq!(report.points_gained, 0);
    assert!(report.protected_until > now);

    let stored = store.territory(own.id).expect("territory");
    assert_eq!(stored.points, own.points);
    assert!((stored.avg_pace - 5.0).abs() < 0.05);
    assert_eq!(store.profile(runner.id).unwrap().total_points, 500);
    // Distance still counts toward the runner's aggregates.
    assert!(store.profile(runner.id).unwrap().total_distance > 390.0);
}

// --- interior conquest ---

#[tokio::test]
async fn interior_conquest_splits_area_between_both_territories() {
    let (store, notifier, service) = setup();
    let attacker = profile("ada", 0);
    let defender = profile("bo", 1_000);
    store.insert_profile(attacker.clone());
    store.insert_profile(defender.clone());
    let host = territory(defender.id, square(0.0, 0.0, 5.0 * DEG_100M), 6.0);
    let host_area = host.area;
    store.insert_territory(host.clone());

    // Slow run, strictly inside the host: pace gate does not apply.
    let report = service
        .process_claim(
            attacker.id,
            &request(square(2.0 * DEG_100M, 2.0 * DEG_100M, DEG_100M), 9.0),
            Utc::now(),
        )
        .await
        .expect("accepted");

    assert_eq!(report.action, ClaimAction::InteriorConquest);
    let carved = store.territory(report.territory_id).expect("carved");
    let shrunk = store.territory(host.id).expect("host");
    assert_eq!(carved.user_id, attacker.id);
    assert_eq!(shrunk.user_id, defender.id);
    assert!(
        (carved.area + shrunk.area - host_area).abs() / host_area < 0.02,
        "{} + {} vs {}",
        carved.area,
        shrunk.area,
        host_area
    );
    assert!(shrunk.points < host.points);
    // The defender keeps their profile points.
    assert_eq!(store.profile(defender.id).unwrap().total_points, 1_000);
    assert_eq!(notifier.sent()[0].user_id, defender.id);
}

// --- concurrency ---

#[tokio::test]
async fn version_conflict_is_retried_once() {
    let (store, _, service) = setup();
    let runner = profile("ada", 0);
    store.insert_profile(runner.clone());
    store.force_version_conflicts(1);

    let report = service
        .process_claim(
            runner.id,
            &request(square(0.0, 0.0, DEG_100M), 5.0),
            Utc::now(),
        )
        .await
        .expect("retried and accepted");
    assert_eq!(report.action, ClaimAction::New);
}

#[tokio::test]
async fn repeated_conflicts_fail_the_claim() {
    let (store, _, service) = setup();
    let runner = profile("ada", 0);
    store.insert_profile(runner.clone());
    store.force_version_conflicts(2);

    let err = service
        .process_claim(
            runner.id,
            &request(square(0.0, 0.0, DEG_100M), 5.0),
            Utc::now(),
        )
        .await
        .expect_err("gave up");
    assert!(matches!(err, ClaimError::Persistence(_)));
}

// --- catalogs: pois, challenges, missions, clans ---

fn park(lat: f64, lng: f64) -> Poi {
    Poi {
        id: Uuid::new_v4(),
        name: "Mill Park".to_string(),
        category: "park".to_string(),
        coordinates: square(lat, lng, DEG_100M / 4.0),
    }
}

#[tokio::test]
async fn claim_collects_challenges_and_completes_missions() {
    let (store, notifier, service) = setup();
    let runner = profile("ada", 0);
    store.insert_profile(runner.clone());
    store.insert_poi(park(DEG_100M / 4.0, DEG_100M / 4.0));

    let now = Utc::now();
    let challenge = MapChallenge {
        id: Uuid::new_v4(),
        name: "Dawn Patrol".to_string(),
        latitude: DEG_100M / 2.0,
        longitude: DEG_100M / 2.0,
        reward_points: 100,
        start_date: now - Duration::days(1),
        end_date: now + Duration::days(1),
        active: true,
    };
    store.insert_challenge(challenge.clone());
    let mission = Mission {
        id: Uuid::new_v4(),
        title: "Park ranger".to_string(),
        mission_type: "park".to_string(),
        target_count: 1,
        reward_points: 200,
        reward_shields: 1,
        start_date: now - Duration::days(1),
        end_date: now + Duration::days(1),
        active: true,
    };
    store.insert_mission(mission.clone());

    let report = service
        .process_claim(runner.id, &request(square(0.0, 0.0, CLAIM_SIDE), 5.0), now)
        .await
        .expect("accepted");

    // Base 59 + challenge 100 + mission 200.
    assert_eq!(report.points_gained, 359);
    assert_eq!(report.poi_tags.len(), 1);
    assert_eq!(report.challenge_rewards, vec!["Dawn Patrol (+100)"]);
    assert_eq!(report.missions_completed, vec!["Park ranger"]);
    assert_eq!(report.mission_rewards.points, 200);
    assert_eq!(report.mission_rewards.shields, 1);

    assert!(store.challenge_claimed(runner.id, challenge.id));
    let progress = store
        .mission_progress(runner.id, mission.id)
        .expect("progress");
    assert!(progress.completed);

    let updated = store.profile(runner.id).expect("profile");
    assert_eq!(updated.total_points, 359);
    assert_eq!(updated.shield_charges, 1);

    let stored = store.territory(report.territory_id).expect("territory");
    assert_eq!(stored.tags.len(), 1);
    assert_eq!(stored.poi_summary.as_deref(), Some("Mill Park"));

    // One push for the challenge, one for the completed mission.
    let pushes = notifier.sent();
    assert_eq!(pushes.len(), 2);
    assert!(pushes.iter().any(|p| p.title.contains("Challenge")));
    assert!(pushes.iter().any(|p| p.title.contains("Mission")));
}

#[tokio::test]
async fn challenge_is_claimable_only_once() {
    let (store, _, service) = setup();
    let runner = profile("ada", 0);
    store.insert_profile(runner.clone());

    let now = Utc::now();
    let challenge = MapChallenge {
        id: Uuid::new_v4(),
        name: "Dawn Patrol".to_string(),
        latitude: DEG_100M / 2.0,
        longitude: DEG_100M / 2.0,
        reward_points: 100,
        start_date: now - Duration::days(1),
        end_date: now + Duration::days(1),
        active: true,
    };
    store.insert_challenge(challenge);

    let first = service
        .process_claim(runner.id, &request(square(0.0, 0.0, DEG_100M), 5.0), now)
        .await
        .expect("accepted");
    assert_eq!(first.challenge_rewards.len(), 1);

    // Reinforce over the same ground: the challenge does not pay again.
    let second = service
        .process_claim(runner.id, &request(square(0.0, 0.0, DEG_100M), 5.0), now)
        .await
        .expect("accepted");
    assert_eq!(second.action, ClaimAction::Reinforced);
    assert!(second.challenge_rewards.is_empty());
}

#[tokio::test]
async fn clan_members_feed_their_clan() {
    let (store, _, service) = setup();
    let runner = profile("ada", 0);
    store.insert_profile(runner.clone());
    store.insert_poi(park(DEG_100M / 4.0, DEG_100M / 4.0));

    let clan_id = Uuid::new_v4();
    store.insert_clan_membership(ClanMembership {
        clan_id,
        clan_name: "Night Owls".to_string(),
        user_id: runner.id,
        role: ClanRole::Member,
        contribution_points: 10,
    });
    store.insert_clan_mission(ClanMission {
        id: Uuid::new_v4(),
        clan_id,
        title: "Parks together".to_string(),
        mission_type: "park".to_string(),
        target_count: 2,
        current_progress: 0,
        reward_points: 500,
        reward_shields: 0,
        active: true,
    });

    let report = service
        .process_claim(
            runner.id,
            &request(square(0.0, 0.0, DEG_100M), 5.0),
            Utc::now(),
        )
        .await
        .expect("accepted");
    assert!(report.clan_missions_completed.is_empty());

    let feed = store.clan_feed();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].0, clan_id);
    assert!(feed[0].1.contains("ada"));

    // Clan totals and member contribution both move by the claim's points.
    assert_eq!(store.clan_stats(clan_id), (report.points_gained, 1));
    assert_eq!(
        store
            .clan_membership(clan_id, runner.id)
            .unwrap()
            .contribution_points,
        10 + report.points_gained
    );
}

// --- protection lifecycle ---

#[tokio::test]
async fn protection_expires_and_the_territory_becomes_stealable() {
    let (store, _, service) = setup();
    let attacker = profile("ada", 0);
    let defender = profile("bo", 0);
    store.insert_profile(attacker.clone());
    store.insert_profile(defender.clone());
    let mut target = territory(defender.id, square(0.0, 0.0, DEG_100M), 6.0);
    target.protected_until = Some(Utc::now() - Duration::minutes(1));
    store.insert_territory(target.clone());

    let report = service
        .process_claim(
            attacker.id,
            &request(square(0.0, 0.0, DEG_100M), 4.0),
            Utc::now(),
        )
        .await
        .expect("accepted");
    assert_eq!(report.action, ClaimAction::Stolen);
}

fn now_plus(dt: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    dt + Duration::hours(hours)
}

#[tokio::test]
async fn freshly_stolen_territory_is_protected_from_counterattack() {
    let (store, _, service) = setup();
    let attacker = profile("ada", 0);
    let defender = profile("bo", 0);
    store.insert_profile(attacker.clone());
    store.insert_profile(defender.clone());
    let target = territory(defender.id, square(0.0, 0.0, DEG_100M), 6.0);
    store.insert_territory(target.clone());

    let now = Utc::now();
    service
        .process_claim(attacker.id, &request(square(0.0, 0.0, DEG_100M), 4.0), now)
        .await
        .expect("stolen");

    // The old owner strikes back an hour later: still protected.
    let err = service
        .process_claim(
            defender.id,
            &request(square(0.0, 0.0, DEG_100M), 3.0),
            now_plus(now, 1),
        )
        .await
        .expect_err("rejected");
    assert_eq!(err, ClaimError::TerritoryProtected);
}
