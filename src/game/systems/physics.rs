//! Fixed-step movement integration, bounds enforcement and validation.

use std::time::Duration;
use tracing::{error, warn};

use crate::anticheat::movement::{over_correction_threshold, MovementValidator};
use crate::game::constants::{movement, pickups, player_max, player_min};
use crate::game::pickups::{CrateId, WeaponCrateManager};
use crate::game::player::{Player, PlayerId, RollEndReason};
use crate::game::world::World;
use crate::util::vec2::Vec2;

/// Roll terminations produced by one physics step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollEnd {
    pub player_id: PlayerId,
    pub reason: RollEndReason,
}

struct Motion {
    roll_ended: Option<RollEndReason>,
    sanitized: bool,
    fault: Option<&'static str>,
    correction_rate: f64,
}

/// Integrate every player over `dt` seconds: consume input into velocity,
/// advance positions, clamp to the arena, sanitize, validate. Returns the
/// rolls that ended this step so the loop can emit events.
pub fn step(world: &World, validator: &MovementValidator, now: Duration, dt: f64) -> Vec<RollEnd> {
    let mut roll_ends = Vec::new();

    for player in world.players() {
        start_triggered_roll(&player, now);

        let Some(motion) = integrate_player(&player, validator, now, dt) else {
            continue;
        };

        if motion.sanitized {
            error!(player = %player.id(), "non-finite vector sanitized to zero");
        }
        if let Some(reason) = motion.fault {
            warn!(player = %player.id(), reason, "movement failed validation");
            if over_correction_threshold(motion.correction_rate) {
                warn!(
                    player = %player.id(),
                    rate = motion.correction_rate,
                    "correction rate over threshold"
                );
            }
        }
        if let Some(reason) = motion.roll_ended {
            roll_ends.push(RollEnd {
                player_id: player.id().clone(),
                reason,
            });
        }
    }

    roll_ends
}

/// Consume a pending roll trigger. Direction comes from the held movement
/// keys, falling back to the aim direction.
fn start_triggered_roll(player: &Player, now: Duration) {
    let direction = player.with_read(|s| {
        if s.death_time.is_some() || s.roll.is_some() || !s.input.roll {
            return None;
        }
        let dir = if s.input.any_direction() {
            s.input.direction()
        } else {
            Vec2::from_angle(s.aim_angle)
        };
        Some(dir)
    });
    if let Some(direction) = direction {
        player.try_start_roll(now, direction);
    }
}

fn integrate_player(
    player: &Player,
    validator: &MovementValidator,
    now: Duration,
    dt: f64,
) -> Option<Motion> {
    player.with_mut(|s| {
        if s.death_time.is_some() {
            s.velocity = Vec2::ZERO;
            return None;
        }

        let old = s.position;
        let mut roll_ended = None;

        // Rolls end by duration here; by wall collision below.
        if let Some(roll) = s.roll {
            if now.saturating_sub(roll.start_time).as_secs_f64() >= movement::ROLL_DURATION {
                s.roll = None;
                roll_ended = Some(RollEndReason::Completed);
            }
        }

        let rolling = s.roll.is_some();
        let sprinting = s.input.sprint && s.input.any_direction();

        if let Some(roll) = s.roll {
            s.velocity = roll.direction * movement::ROLL_VELOCITY;
        } else {
            let target = if s.input.any_direction() {
                let speed = if s.input.sprint {
                    movement::SPRINT_SPEED
                } else {
                    movement::MOVE_SPEED
                };
                s.input.direction() * speed
            } else {
                Vec2::ZERO
            };
            let gain = if s.input.any_direction() {
                movement::ACCELERATION
            } else {
                movement::DECELERATION
            };
            s.velocity = s.velocity.lerp(target, (gain * dt).min(1.0));
        }

        s.position += s.velocity * dt;

        // Clamp to the arena inset by half the hitbox. A displaced roll is a
        // wall collision; the velocity component into the wall dies with it.
        let min = player_min();
        let max = player_max();
        let clamped = s.position.clamp_rect(min, max);
        if clamped != s.position {
            if clamped.x != s.position.x {
                s.velocity.x = 0.0;
            }
            if clamped.y != s.position.y {
                s.velocity.y = 0.0;
            }
            s.position = clamped;
            if s.roll.is_some() {
                s.roll = None;
                roll_ended = Some(RollEndReason::WallCollision);
            }
        }

        // NaN/Inf must never reach stored state.
        let (pos, pos_fixed) = s.position.sanitized();
        let (vel, vel_fixed) = s.velocity.sanitized();
        let sanitized = pos_fixed || vel_fixed;
        s.position = pos.clamp_rect(min, max);
        s.velocity = vel;

        let fault = validator
            .validate(old, s.position, s.velocity, dt, rolling, sprinting)
            .err();
        s.corrections.total_updates += 1;
        if fault.is_some() {
            s.corrections.total_corrections += 1;
        }

        Some(Motion {
            roll_ended,
            sanitized,
            fault: fault.map(|f| f.as_str()),
            correction_rate: s.corrections.rate(),
        })
    })
}

/// Pickup eligibility: the player is alive, the crate is available, and the
/// player stands within the pickup radius.
pub fn can_pick_up(player: &Player, crates: &WeaponCrateManager, crate_id: CrateId) -> bool {
    if !player.is_alive() {
        return false;
    }
    let Some(c) = crates.get(crate_id) else {
        return false;
    };
    c.is_available && c.position.distance_to(player.position()) <= pickups::PICKUP_RADIUS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::{arena_center, timing};
    use crate::game::player::InputState;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn world_with_player() -> (World, std::sync::Arc<Player>) {
        let world = World::new();
        let player = world.add_player("p1".to_string(), arena_center());
        (world, player)
    }

    fn hold(input: InputState, player: &Player, seq: u64) {
        player.set_input(input, seq);
    }

    fn run_ticks(world: &World, validator: &MovementValidator, from: f64, ticks: u32) -> Duration {
        let mut now = secs(from);
        for _ in 0..ticks {
            now += Duration::from_secs_f64(timing::DT);
            step(world, validator, now, timing::DT);
        }
        now
    }

    #[test]
    fn test_idle_player_stays_put() {
        let (world, player) = world_with_player();
        let validator = MovementValidator::default();
        run_ticks(&world, &validator, 0.0, 10);
        assert_eq!(player.position(), arena_center());
        assert_eq!(player.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_input_accelerates_toward_move_speed() {
        let (world, player) = world_with_player();
        let validator = MovementValidator::default();
        hold(
            InputState {
                right: true,
                ..Default::default()
            },
            &player,
            1,
        );
        run_ticks(&world, &validator, 0.0, 30);
        let speed = player.velocity().length();
        assert!(speed > movement::MOVE_SPEED * 0.9, "speed {speed}");
        assert!(speed <= movement::MOVE_SPEED + 1e-6);
        assert!(player.position().x > arena_center().x);
    }

    #[test]
    fn test_sprint_reaches_sprint_speed() {
        let (world, player) = world_with_player();
        let validator = MovementValidator::default();
        hold(
            InputState {
                right: true,
                sprint: true,
                ..Default::default()
            },
            &player,
            1,
        );
        run_ticks(&world, &validator, 0.0, 60);
        assert!(player.velocity().length() > movement::MOVE_SPEED);
    }

    #[test]
    fn test_release_decelerates_to_zero() {
        let (world, player) = world_with_player();
        let validator = MovementValidator::default();
        hold(
            InputState {
                right: true,
                ..Default::default()
            },
            &player,
            1,
        );
        run_ticks(&world, &validator, 0.0, 30);
        hold(InputState::default(), &player, 2);
        run_ticks(&world, &validator, 0.5, 60);
        assert!(player.velocity().length() < 1.0);
    }

    #[test]
    fn test_diagonal_not_faster() {
        let (world, player) = world_with_player();
        let validator = MovementValidator::default();
        hold(
            InputState {
                right: true,
                down: true,
                ..Default::default()
            },
            &player,
            1,
        );
        run_ticks(&world, &validator, 0.0, 60);
        assert!(player.velocity().length() <= movement::MOVE_SPEED + 1e-6);
    }

    #[test]
    fn test_clamped_to_arena() {
        let (world, player) = world_with_player();
        let validator = MovementValidator::default();
        player.set_position(Vec2::new(20.0, 540.0));
        hold(
            InputState {
                left: true,
                ..Default::default()
            },
            &player,
            1,
        );
        run_ticks(&world, &validator, 0.0, 30);
        assert_eq!(player.position().x, player_min().x);
    }

    #[test]
    fn test_dead_player_not_integrated() {
        let (world, player) = world_with_player();
        let validator = MovementValidator::default();
        hold(
            InputState {
                right: true,
                ..Default::default()
            },
            &player,
            1,
        );
        player.set_velocity(Vec2::new(100.0, 0.0));
        player.mark_dead(secs(0.0));
        let pos = player.position();
        run_ticks(&world, &validator, 0.0, 10);
        assert_eq!(player.position(), pos);
        assert_eq!(player.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_roll_trigger_overrides_velocity() {
        let (world, player) = world_with_player();
        let validator = MovementValidator::default();
        hold(
            InputState {
                right: true,
                roll: true,
                ..Default::default()
            },
            &player,
            1,
        );
        step(&world, &validator, secs(timing::DT), timing::DT);
        assert!(player.is_rolling());
        let vel = player.velocity();
        assert!((vel.length() - movement::ROLL_VELOCITY).abs() < 1e-9);
        assert!(vel.x > 0.0);
    }

    #[test]
    fn test_roll_ends_by_duration() {
        let (world, player) = world_with_player();
        let validator = MovementValidator::default();
        hold(
            InputState {
                right: true,
                roll: true,
                ..Default::default()
            },
            &player,
            1,
        );
        let ticks = (movement::ROLL_DURATION / timing::DT) as u32 + 2;
        run_ticks(&world, &validator, 0.0, ticks);
        assert!(!player.is_rolling());
        // Roll covered its configured distance before ending.
        let travelled = player.position().x - arena_center().x;
        assert!(
            (travelled - movement::ROLL_DISTANCE).abs() < 10.0,
            "travelled {travelled}"
        );
    }

    #[test]
    fn test_roll_ends_on_wall() {
        let (world, player) = world_with_player();
        let validator = MovementValidator::default();
        player.set_position(Vec2::new(player_max().x - 5.0, 540.0));
        hold(
            InputState {
                right: true,
                roll: true,
                ..Default::default()
            },
            &player,
            1,
        );
        let ends = {
            let mut collected = Vec::new();
            let mut now = Duration::ZERO;
            for _ in 0..6 {
                now += Duration::from_secs_f64(timing::DT);
                collected.extend(step(&world, &validator, now, timing::DT));
            }
            collected
        };
        assert!(!player.is_rolling());
        assert!(ends
            .iter()
            .any(|e| e.reason == RollEndReason::WallCollision));
        assert_eq!(player.position().x, player_max().x);
    }

    #[test]
    fn test_roll_without_movement_uses_aim() {
        let (world, player) = world_with_player();
        let validator = MovementValidator::default();
        hold(
            InputState {
                roll: true,
                aim_angle: std::f64::consts::PI, // aiming left
                ..Default::default()
            },
            &player,
            1,
        );
        step(&world, &validator, secs(timing::DT), timing::DT);
        assert!(player.is_rolling());
        assert!(player.velocity().x < 0.0);
    }

    #[test]
    fn test_clean_movement_records_no_corrections() {
        let (world, player) = world_with_player();
        let validator = MovementValidator::default();
        hold(
            InputState {
                right: true,
                ..Default::default()
            },
            &player,
            1,
        );
        run_ticks(&world, &validator, 0.0, 60);
        let stats = player.correction_stats();
        assert_eq!(stats.total_updates, 60);
        assert_eq!(stats.total_corrections, 0);
    }

    #[test]
    fn test_can_pick_up() {
        let (_, player) = world_with_player();
        let crates = WeaponCrateManager::new();
        let uzi = crates.get(1).unwrap();

        player.set_position(uzi.position + Vec2::new(10.0, 0.0));
        assert!(can_pick_up(&player, &crates, 1));

        player.set_position(uzi.position + Vec2::new(100.0, 0.0));
        assert!(!can_pick_up(&player, &crates, 1));

        player.set_position(uzi.position);
        player.mark_dead(secs(0.0));
        assert!(!can_pick_up(&player, &crates, 1));
    }

    #[test]
    fn test_can_pick_up_unavailable_crate() {
        let (_, player) = world_with_player();
        let crates = WeaponCrateManager::new();
        let uzi = crates.get(1).unwrap();
        player.set_position(uzi.position);
        crates.pickup(1, secs(0.0));
        assert!(!can_pick_up(&player, &crates, 1));
    }
}
