//! Hit resolution: projectile collisions, lag-compensated hitscan raycasts
//! and melee arcs.

use rand::Rng;
use smallvec::SmallVec;
use std::time::Duration;

use crate::game::constants::{arena, combat, player_max, player_min};
use crate::game::history::PositionHistory;
use crate::game::player::{Player, PlayerId};
use crate::game::projectile::ProjectileManager;
use crate::game::weapons::{WeaponConfig, WeaponState};
use crate::game::world::World;
use crate::net::ping::PingRegistry;
use crate::util::vec2::Vec2;

/// One resolved hit, before kill bookkeeping.
#[derive(Debug, Clone)]
pub struct HitRecord {
    pub attacker_id: PlayerId,
    pub victim_id: PlayerId,
    /// Absent for hitscan and melee hits
    pub projectile_id: Option<u64>,
    pub damage: i32,
    pub remaining_health: i32,
}

/// A hitscan shot accepted by the intent handler, waiting to be resolved
/// inside the tick against tick-aligned position history.
#[derive(Debug, Clone)]
pub struct QueuedShot {
    pub shooter_id: PlayerId,
    /// Aim angle with recoil and spread already applied
    pub aim_angle: f64,
    pub weapon: WeaponConfig,
    pub fired_at: Duration,
}

/// Result of a melee swing.
#[derive(Debug, Clone, Default)]
pub struct MeleeOutcome {
    pub hits: Vec<HitRecord>,
    pub knockback_applied: bool,
}

/// Ranged damage falloff: full damage through the near portion of the
/// weapon's range, then linear decay toward the minimum multiplier at
/// maximum range.
pub fn damage_falloff(base: i32, distance: f64, range: f64) -> i32 {
    if range <= 0.0 {
        return base;
    }
    let knee = range * combat::FALLOFF_START_RATIO;
    if distance <= knee {
        return base;
    }
    let t = ((distance - knee) / (range - knee)).clamp(0.0, 1.0);
    let multiplier = 1.0 - t * (1.0 - combat::FALLOFF_MIN_MULTIPLIER);
    (base as f64 * multiplier).round() as i32
}

/// Point-vs-hitbox test against the fixed player hitbox.
#[inline]
pub fn point_in_hitbox(point: Vec2, center: Vec2) -> bool {
    (point.x - center.x).abs() <= arena::HITBOX_WIDTH / 2.0
        && (point.y - center.y).abs() <= arena::HITBOX_HEIGHT / 2.0
}

/// Whether a player can currently be hit.
fn is_hittable(player: &Player, now: Duration) -> bool {
    player.is_alive() && !player.invulnerable_at(now) && !player.in_roll_iframes(now)
}

/// Test every active projectile against every player. Each projectile hits
/// at most one player; the projectile deactivates on hit.
pub fn projectile_collisions(
    world: &World,
    projectiles: &ProjectileManager,
    now: Duration,
) -> Vec<HitRecord> {
    let mut records = Vec::new();
    let players = world.players();

    for projectile in projectiles.get_active() {
        if projectile.travelled() > projectile.range {
            continue;
        }
        for player in &players {
            if player.id() == &projectile.owner_id || !is_hittable(player, now) {
                continue;
            }
            if !point_in_hitbox(projectile.position, player.position()) {
                continue;
            }
            let damage = damage_falloff(projectile.damage, projectile.travelled(), projectile.range);
            let remaining_health = player.take_damage(damage, now);
            projectiles.deactivate(projectile.id);
            records.push(HitRecord {
                attacker_id: projectile.owner_id.clone(),
                victim_id: player.id().clone(),
                projectile_id: Some(projectile.id),
                damage,
                remaining_health,
            });
            break;
        }
    }

    records
}

/// Resolve a queued hitscan shot with lag compensation: rewind every
/// potential victim by the shooter's RTT (capped), raycast along the aim and
/// hit the nearest victim whose rewound position intersects the ray.
pub fn execute_hitscan(
    world: &World,
    history: &PositionHistory,
    pings: &PingRegistry,
    now: Duration,
    shot: &QueuedShot,
) -> Option<HitRecord> {
    let shooter = world.get_player(&shot.shooter_id)?;
    let shooter_pos = shooter.position();

    let rewind = pings
        .get_rtt(&shot.shooter_id)
        .min(Duration::from_millis(combat::MAX_REWIND_MS));
    let query_time = now.saturating_sub(rewind);

    let direction = Vec2::from_angle(shot.aim_angle);
    let mut best: Option<(f64, std::sync::Arc<Player>)> = None;

    for victim in world.players() {
        if victim.id() == &shot.shooter_id || !is_hittable(&victim, now) {
            continue;
        }
        // Sample where the shooter saw the victim; fall back to the live
        // position when no history exists yet.
        let victim_pos = history
            .query(victim.id(), query_time)
            .unwrap_or_else(|| victim.position());

        let to_victim = victim_pos - shooter_pos;
        let along = to_victim.dot(direction);
        if along < 0.0 || along > shot.weapon.range {
            continue;
        }
        let perpendicular = (to_victim - direction * along).length();
        if perpendicular > combat::HITSCAN_TARGET_RADIUS {
            continue;
        }
        let closer = match &best {
            Some((closest, _)) => along < *closest,
            None => true,
        };
        if closer {
            best = Some((along, victim));
        }
    }

    let (distance, victim) = best?;
    let damage = damage_falloff(shot.weapon.damage, distance, shot.weapon.range);
    let remaining_health = victim.take_damage(damage, now);
    Some(HitRecord {
        attacker_id: shot.shooter_id.clone(),
        victim_id: victim.id().clone(),
        projectile_id: None,
        damage,
        remaining_health,
    })
}

/// Swing a melee weapon: every living player within range and inside the
/// swing arc is hit, with knockback away from the attacker where the weapon
/// carries any.
pub fn melee_attack(
    world: &World,
    attacker: &Player,
    aim_angle: f64,
    weapon: &WeaponConfig,
    now: Duration,
) -> MeleeOutcome {
    let mut outcome = MeleeOutcome::default();
    let attacker_pos = attacker.position();
    let half_arc = weapon.arc_degrees / 2.0;

    for victim in world.players() {
        if victim.id() == attacker.id() || !is_hittable(&victim, now) {
            continue;
        }
        let victim_pos = victim.position();
        let distance = attacker_pos.distance_to(victim_pos);
        if distance > weapon.range {
            continue;
        }
        if angle_difference_degrees(aim_angle, (victim_pos - attacker_pos).angle()) > half_arc {
            continue;
        }

        let remaining_health = victim.take_damage(weapon.damage, now);
        if weapon.knockback_distance > 0.0 && distance > 0.0 {
            let push = (victim_pos - attacker_pos).normalize() * weapon.knockback_distance;
            victim.set_position((victim_pos + push).clamp_rect(player_min(), player_max()));
            outcome.knockback_applied = true;
        }
        outcome.hits.push(HitRecord {
            attacker_id: attacker.id().clone(),
            victim_id: victim.id().clone(),
            projectile_id: None,
            damage: weapon.damage,
            remaining_health,
        });
    }

    outcome
}

/// Absolute angular difference in degrees, folded into [0, 180].
fn angle_difference_degrees(a: f64, b: f64) -> f64 {
    let diff = (a - b).to_degrees().rem_euclid(360.0);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Apply recoil and movement spread to a base aim angle for the next shot.
pub fn effective_aim_angle<R: Rng>(
    base: f64,
    state: &WeaponState,
    now: Duration,
    moving: bool,
    sprinting: bool,
    rng: &mut R,
) -> f64 {
    let mut angle = base;
    let config = state.config();

    if let Some(recoil) = config.recoil {
        angle -= state.accumulated_recoil(now).to_radians();
        if recoil.horizontal_per_shot > 0.0 {
            angle += rng
                .gen_range(-recoil.horizontal_per_shot..=recoil.horizontal_per_shot)
                .to_radians();
        }
    }

    if moving && config.spread_degrees > 0.0 {
        let mut spread = config.spread_degrees;
        if sprinting {
            spread *= combat::SPRINT_SPREAD_MULTIPLIER;
        }
        angle += rng.gen_range(-spread..=spread).to_radians();
    }

    angle
}

/// Pellet directions for a shotgun blast: evenly spaced across the spread
/// arc with a little jitter on each pellet.
pub fn pellet_angles<R: Rng>(
    base: f64,
    spread_degrees: f64,
    rng: &mut R,
) -> SmallVec<[f64; combat::SHOTGUN_PELLETS]> {
    let count = combat::SHOTGUN_PELLETS;
    let spread = spread_degrees.to_radians();
    let spacing = spread / (count - 1) as f64;
    let jitter = spacing * combat::PELLET_JITTER_RATIO;
    let start = base - spread / 2.0;

    (0..count)
        .map(|i| {
            let centered = start + spacing * i as f64;
            centered + rng.gen_range(-jitter..=jitter)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::weapons::WeaponCatalog;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn pistol() -> WeaponConfig {
        WeaponCatalog::default().get("pistol").unwrap().clone()
    }

    fn bat() -> WeaponConfig {
        WeaponCatalog::default().get("bat").unwrap().clone()
    }

    fn setup_duel(shooter_pos: Vec2, victim_pos: Vec2) -> (World, Arc<Player>, Arc<Player>) {
        let world = World::new();
        let shooter = world.add_player("shooter".to_string(), shooter_pos);
        let victim = world.add_player("victim".to_string(), victim_pos);
        (world, shooter, victim)
    }

    fn queued_shot(aim: f64, weapon: WeaponConfig) -> QueuedShot {
        QueuedShot {
            shooter_id: "shooter".to_string(),
            aim_angle: aim,
            weapon,
            fired_at: secs(0.0),
        }
    }

    // === damage falloff ===

    #[test]
    fn test_falloff_full_damage_near() {
        assert_eq!(damage_falloff(25, 0.0, 800.0), 25);
        assert_eq!(damage_falloff(25, 480.0, 800.0), 25);
    }

    #[test]
    fn test_falloff_half_damage_at_max_range() {
        assert_eq!(damage_falloff(25, 800.0, 800.0), 13);
        assert_eq!(damage_falloff(100, 800.0, 800.0), 50);
    }

    #[test]
    fn test_falloff_monotone() {
        let mut last = i32::MAX;
        for d in [0.0, 200.0, 480.0, 600.0, 700.0, 800.0] {
            let dmg = damage_falloff(100, d, 800.0);
            assert!(dmg <= last);
            last = dmg;
        }
    }

    #[test]
    fn test_falloff_zero_range_is_identity() {
        assert_eq!(damage_falloff(35, 10.0, 0.0), 35);
    }

    // === hitbox ===

    #[test]
    fn test_point_in_hitbox_bounds() {
        let center = Vec2::new(100.0, 100.0);
        assert!(point_in_hitbox(Vec2::new(116.0, 100.0), center));
        assert!(!point_in_hitbox(Vec2::new(116.1, 100.0), center));
        assert!(point_in_hitbox(Vec2::new(100.0, 132.0), center));
        assert!(!point_in_hitbox(Vec2::new(100.0, 132.1), center));
    }

    // === projectile collisions ===

    fn spawn_pellet(
        projectiles: &ProjectileManager,
        owner: &str,
        position: Vec2,
        range: f64,
    ) -> u64 {
        projectiles
            .create(
                owner.to_string(),
                "shotgun".to_string(),
                10,
                range,
                position,
                Vec2::new(900.0, 0.0),
                secs(0.0),
            )
            .id
    }

    #[test]
    fn test_projectile_hits_player() {
        let (world, _, victim) = setup_duel(Vec2::new(100.0, 100.0), Vec2::new(300.0, 100.0));
        let projectiles = ProjectileManager::new();
        spawn_pellet(&projectiles, "shooter", Vec2::new(290.0, 100.0), 400.0);

        let records = projectile_collisions(&world, &projectiles, secs(1.0));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].victim_id, "victim");
        assert_eq!(records[0].damage, 10);
        assert_eq!(victim.health(), 90);
        assert!(projectiles.get_active().is_empty());
    }

    #[test]
    fn test_projectile_skips_owner() {
        let (world, shooter, _) = setup_duel(Vec2::new(100.0, 100.0), Vec2::new(900.0, 900.0));
        let projectiles = ProjectileManager::new();
        spawn_pellet(&projectiles, "shooter", shooter.position(), 400.0);

        let records = projectile_collisions(&world, &projectiles, secs(1.0));
        assert!(records.is_empty());
        assert_eq!(shooter.health(), 100);
    }

    #[test]
    fn test_projectile_skips_dead_and_invulnerable() {
        let (world, _, victim) = setup_duel(Vec2::new(100.0, 100.0), Vec2::new(300.0, 100.0));
        let projectiles = ProjectileManager::new();

        victim.respawn(victim.position(), secs(0.0)); // grants spawn invuln
        spawn_pellet(&projectiles, "shooter", victim.position(), 400.0);
        assert!(projectile_collisions(&world, &projectiles, secs(1.0)).is_empty());

        victim.mark_dead(secs(1.0));
        assert!(projectile_collisions(&world, &projectiles, secs(3.0)).is_empty());
    }

    #[test]
    fn test_projectile_skips_roll_iframes() {
        let (world, _, victim) = setup_duel(Vec2::new(100.0, 100.0), Vec2::new(300.0, 100.0));
        let projectiles = ProjectileManager::new();
        spawn_pellet(&projectiles, "shooter", victim.position(), 400.0);

        victim.try_start_roll(secs(1.0), Vec2::RIGHT);
        // Inside the i-frame window: untouchable.
        assert!(projectile_collisions(&world, &projectiles, secs(1.1)).is_empty());
        // Past the i-frames (roll still active): hittable again.
        let records = projectile_collisions(&world, &projectiles, secs(1.35));
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_projectile_one_victim_per_tick() {
        let world = World::new();
        world.add_player("shooter".to_string(), Vec2::new(100.0, 100.0));
        // Two overlapping victims; only one may be hit by a single pellet.
        world.add_player("v1".to_string(), Vec2::new(300.0, 100.0));
        world.add_player("v2".to_string(), Vec2::new(305.0, 100.0));
        let projectiles = ProjectileManager::new();
        spawn_pellet(&projectiles, "shooter", Vec2::new(300.0, 100.0), 400.0);

        let records = projectile_collisions(&world, &projectiles, secs(1.0));
        assert_eq!(records.len(), 1);
    }

    // === hitscan ===

    #[test]
    fn test_hitscan_boundary_hit_and_miss() {
        let (world, _, victim) = setup_duel(Vec2::new(0.0, 0.0), Vec2::new(100.0, 16.0));
        let history = PositionHistory::new();
        let pings = PingRegistry::new();

        let hit = execute_hitscan(&world, &history, &pings, secs(1.0), &queued_shot(0.0, pistol()));
        assert!(hit.is_some(), "perpendicular distance 16 should hit");
        assert_eq!(victim.health(), 75);

        victim.set_position(Vec2::new(100.0, 17.0));
        let miss = execute_hitscan(&world, &history, &pings, secs(2.0), &queued_shot(0.0, pistol()));
        assert!(miss.is_none(), "perpendicular distance 17 should miss");
    }

    #[test]
    fn test_hitscan_never_hits_behind() {
        let (world, _, victim) = setup_duel(Vec2::new(500.0, 500.0), Vec2::new(400.0, 500.0));
        let history = PositionHistory::new();
        let pings = PingRegistry::new();

        let miss = execute_hitscan(&world, &history, &pings, secs(1.0), &queued_shot(0.0, pistol()));
        assert!(miss.is_none());
        assert_eq!(victim.health(), 100);
    }

    #[test]
    fn test_hitscan_respects_range() {
        let (world, _, _) = setup_duel(Vec2::new(0.0, 0.0), Vec2::new(900.0, 0.0));
        let history = PositionHistory::new();
        let pings = PingRegistry::new();

        // Pistol range is 800; victim at 900 is out of reach.
        let miss = execute_hitscan(&world, &history, &pings, secs(1.0), &queued_shot(0.0, pistol()));
        assert!(miss.is_none());
    }

    #[test]
    fn test_hitscan_selects_nearest() {
        let world = World::new();
        world.add_player("shooter".to_string(), Vec2::new(0.0, 100.0));
        world.add_player("far".to_string(), Vec2::new(600.0, 100.0));
        world.add_player("near".to_string(), Vec2::new(200.0, 100.0));
        let history = PositionHistory::new();
        let pings = PingRegistry::new();

        let hit = execute_hitscan(&world, &history, &pings, secs(1.0), &queued_shot(0.0, pistol()))
            .expect("shot should land");
        assert_eq!(hit.victim_id, "near");
    }

    #[test]
    fn test_hitscan_rewinds_with_history() {
        let (world, _, victim) = setup_duel(Vec2::new(100.0, 100.0), Vec2::new(200.0, 100.0));
        let history = PositionHistory::new();
        let pings = PingRegistry::new();

        // Victim was on the aim line 50 ms ago, then strafed away.
        history.record("victim", Vec2::new(200.0, 100.0), secs(0.95));
        history.record("victim", Vec2::new(200.0, 100.0), secs(1.0));
        victim.set_position(Vec2::new(200.0, 300.0));
        history.record("victim", Vec2::new(200.0, 300.0), secs(1.05));
        pings.record("shooter", Duration::from_millis(50));

        let hit = execute_hitscan(
            &world,
            &history,
            &pings,
            secs(1.05),
            &queued_shot(0.0, pistol()),
        );
        assert!(hit.is_some(), "rewound position should be on the ray");
        assert_eq!(victim.health(), 75);
    }

    #[test]
    fn test_hitscan_falls_back_to_live_position() {
        let (world, _, victim) = setup_duel(Vec2::new(100.0, 100.0), Vec2::new(300.0, 100.0));
        let history = PositionHistory::new();
        let pings = PingRegistry::new();
        pings.record("shooter", Duration::from_millis(120));

        // No recorded history: the live position is used and still hit.
        let hit = execute_hitscan(&world, &history, &pings, secs(1.0), &queued_shot(0.0, pistol()));
        assert!(hit.is_some());
        assert_eq!(victim.health(), 75);
    }

    #[test]
    fn test_hitscan_applies_falloff_past_knee() {
        let (world, _, victim) = setup_duel(Vec2::new(0.0, 0.0), Vec2::new(800.0, 0.0));
        let history = PositionHistory::new();
        let pings = PingRegistry::new();

        let hit = execute_hitscan(&world, &history, &pings, secs(1.0), &queued_shot(0.0, pistol()))
            .expect("at exactly max range the shot lands");
        assert_eq!(hit.damage, 13);
        assert_eq!(victim.health(), 87);
    }

    // === melee ===

    #[test]
    fn test_melee_hits_in_arc() {
        let (world, attacker, victim) =
            setup_duel(Vec2::new(500.0, 500.0), Vec2::new(540.0, 500.0));
        let outcome = melee_attack(&world, &attacker, 0.0, &bat(), secs(1.0));
        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(victim.health(), 65);
        assert!(outcome.knockback_applied);
        // Knocked straight back along the attack line.
        assert_eq!(victim.position(), Vec2::new(620.0, 500.0));
    }

    #[test]
    fn test_melee_out_of_range() {
        let (world, attacker, victim) =
            setup_duel(Vec2::new(500.0, 500.0), Vec2::new(560.0, 500.0));
        let outcome = melee_attack(&world, &attacker, 0.0, &bat(), secs(1.0));
        assert!(outcome.hits.is_empty());
        assert_eq!(victim.health(), 100);
    }

    #[test]
    fn test_melee_outside_arc() {
        // Victim is in range but behind the attacker's swing.
        let (world, attacker, victim) =
            setup_duel(Vec2::new(500.0, 500.0), Vec2::new(460.0, 500.0));
        let outcome = melee_attack(&world, &attacker, 0.0, &bat(), secs(1.0));
        assert!(outcome.hits.is_empty());
        assert_eq!(victim.health(), 100);
    }

    #[test]
    fn test_melee_arc_edge() {
        let bat = bat(); // 90 degree arc: +/- 45 degrees
        let world = World::new();
        let attacker = world.add_player("attacker".to_string(), Vec2::new(500.0, 500.0));
        // 44 degrees off-aim: inside. 46 degrees: outside.
        let inside = Vec2::new(500.0, 500.0)
            + Vec2::from_angle(44.0_f64.to_radians()) * 40.0;
        let outside = Vec2::new(500.0, 500.0)
            + Vec2::from_angle(46.0_f64.to_radians()) * 40.0;
        world.add_player("inside".to_string(), inside);
        world.add_player("outside".to_string(), outside);

        let outcome = melee_attack(&world, &attacker, 0.0, &bat, secs(1.0));
        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(outcome.hits[0].victim_id, "inside");
    }

    #[test]
    fn test_melee_aoe_hits_all_in_arc() {
        let world = World::new();
        let attacker = world.add_player("attacker".to_string(), Vec2::new(500.0, 500.0));
        world.add_player("v1".to_string(), Vec2::new(530.0, 500.0));
        world.add_player("v2".to_string(), Vec2::new(540.0, 510.0));
        let outcome = melee_attack(&world, &attacker, 0.0, &bat(), secs(1.0));
        assert_eq!(outcome.hits.len(), 2);
    }

    #[test]
    fn test_melee_no_knockback_weapon() {
        let katana = WeaponCatalog::default().get("katana").unwrap().clone();
        let (world, attacker, victim) =
            setup_duel(Vec2::new(500.0, 500.0), Vec2::new(540.0, 500.0));
        let outcome = melee_attack(&world, &attacker, 0.0, &katana, secs(1.0));
        assert_eq!(outcome.hits.len(), 1);
        assert!(!outcome.knockback_applied);
        assert_eq!(victim.position(), Vec2::new(540.0, 500.0));
    }

    #[test]
    fn test_melee_zero_distance_no_knockback() {
        let (world, attacker, victim) =
            setup_duel(Vec2::new(500.0, 500.0), Vec2::new(500.0, 500.0));
        let outcome = melee_attack(&world, &attacker, 0.0, &bat(), secs(1.0));
        // Overlapping players: the hit lands but nobody is displaced.
        assert_eq!(outcome.hits.len(), 1);
        assert!(!outcome.knockback_applied);
        assert_eq!(victim.position(), Vec2::new(500.0, 500.0));
    }

    #[test]
    fn test_melee_knockback_clamped_to_arena() {
        let world = World::new();
        let attacker = world.add_player("attacker".to_string(), Vec2::new(1850.0, 500.0));
        let victim = world.add_player("victim".to_string(), Vec2::new(1890.0, 500.0));
        melee_attack(&world, &attacker, 0.0, &bat(), secs(1.0));
        assert_eq!(victim.position().x, player_max().x);
    }

    // === aim modifiers ===

    #[test]
    fn test_effective_aim_stationary_no_recoil() {
        let state = WeaponState::new(pistol());
        let mut rng = SmallRng::seed_from_u64(1);
        // No accumulated recoil and not moving: horizontal recoil is the
        // only deviation, bounded by the config.
        let angle = effective_aim_angle(0.0, &state, secs(0.0), false, false, &mut rng);
        let max_dev = pistol().recoil.unwrap().horizontal_per_shot.to_radians();
        assert!(angle.abs() <= max_dev + 1e-12);
    }

    #[test]
    fn test_effective_aim_moving_adds_spread() {
        let state = WeaponState::new(pistol());
        let cfg = pistol();
        let bound_stationary = cfg.recoil.unwrap().horizontal_per_shot.to_radians();
        let bound_moving = bound_stationary + cfg.spread_degrees.to_radians();
        let bound_sprinting = bound_stationary
            + (cfg.spread_degrees * combat::SPRINT_SPREAD_MULTIPLIER).to_radians();

        let mut rng = SmallRng::seed_from_u64(2);
        for _ in 0..100 {
            let a = effective_aim_angle(0.0, &state, secs(0.0), true, false, &mut rng);
            assert!(a.abs() <= bound_moving + 1e-12);
            let a = effective_aim_angle(0.0, &state, secs(0.0), true, true, &mut rng);
            assert!(a.abs() <= bound_sprinting + 1e-12);
        }
    }

    #[test]
    fn test_effective_aim_melee_unchanged() {
        let state = WeaponState::new(bat());
        let mut rng = SmallRng::seed_from_u64(3);
        let angle = effective_aim_angle(1.0, &state, secs(0.0), true, true, &mut rng);
        assert_eq!(angle, 1.0);
    }

    #[test]
    fn test_pellet_angles_cover_arc() {
        let mut rng = SmallRng::seed_from_u64(4);
        let spread = 24.0_f64;
        let angles = pellet_angles(0.0, spread, &mut rng);
        assert_eq!(angles.len(), combat::SHOTGUN_PELLETS);

        let half = spread.to_radians() / 2.0;
        let spacing = spread.to_radians() / (combat::SHOTGUN_PELLETS - 1) as f64;
        let jitter = spacing * combat::PELLET_JITTER_RATIO;
        for (i, angle) in angles.iter().enumerate() {
            let expected = -half + spacing * i as f64;
            assert!(
                (angle - expected).abs() <= jitter + 1e-12,
                "pellet {i} strayed: {angle} vs {expected}"
            );
        }
        // First and last pellets sit near the arc edges.
        assert!(angles[0] < angles[combat::SHOTGUN_PELLETS - 1]);
    }

    #[test]
    fn test_angle_difference_wraps() {
        // 0.2 rad apart is ~11.5 degrees.
        assert!(angle_difference_degrees(0.1, -0.1) < 12.0);
        // 6 rad apart is ~344 degrees raw, folding to ~16.
        let d = angle_difference_degrees(3.0, -3.0);
        assert!(d < 20.0);
        assert!(d > 10.0);
    }
}
