//! Authoritative per-player state.
//!
//! Every mutable field lives behind the player's own `RwLock`. The world map
//! lock is never held while a player lock is taken; callers snapshot
//! `Arc<Player>` pointers first and then operate per player.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::constants::health;
use crate::game::constants::movement;
use crate::util::vec2::Vec2;

/// Stable player identifier for the lifetime of the connection.
pub type PlayerId = String;

/// Client input captured per sequence number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Aim angle in radians
    pub aim_angle: f64,
    pub sprint: bool,
    /// Roll trigger; consumed when a roll starts
    pub roll: bool,
    pub shoot: bool,
    pub melee: bool,
    pub reload: bool,
}

impl InputState {
    /// Normalized movement direction from the held directional keys.
    pub fn direction(&self) -> Vec2 {
        let mut dir = Vec2::ZERO;
        if self.up {
            dir.y -= 1.0;
        }
        if self.down {
            dir.y += 1.0;
        }
        if self.left {
            dir.x -= 1.0;
        }
        if self.right {
            dir.x += 1.0;
        }
        dir.normalize()
    }

    pub fn any_direction(&self) -> bool {
        self.up || self.down || self.left || self.right
    }
}

/// An in-progress dodge roll.
#[derive(Debug, Clone, Copy)]
pub struct RollState {
    pub start_time: Duration,
    pub direction: Vec2,
}

/// Why a roll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollEndReason {
    Completed,
    WallCollision,
}

/// Movement-validation bookkeeping exposed as a soft anti-cheat signal.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CorrectionStats {
    pub total_updates: u64,
    pub total_corrections: u64,
}

impl CorrectionStats {
    pub fn rate(&self) -> f64 {
        if self.total_updates == 0 {
            return 0.0;
        }
        self.total_corrections as f64 / self.total_updates as f64
    }
}

/// Tolerates accumulated f64 rounding when flushing whole HP from the
/// regeneration accumulator.
const REGEN_FLUSH_EPSILON: f64 = 1e-9;

/// The mutable half of a player, guarded by `Player`'s lock.
#[derive(Debug)]
pub(crate) struct PlayerState {
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) aim_angle: f64,
    pub(crate) health: i32,
    pub(crate) is_invulnerable: bool,
    pub(crate) invulnerability_end: Duration,
    pub(crate) death_time: Option<Duration>,
    pub(crate) kills: u32,
    pub(crate) deaths: u32,
    pub(crate) xp: u64,
    pub(crate) is_regenerating: bool,
    pub(crate) last_damage_time: Option<Duration>,
    pub(crate) regen_accumulator: f64,
    pub(crate) input: InputState,
    pub(crate) input_sequence: Option<u64>,
    pub(crate) roll: Option<RollState>,
    pub(crate) last_roll_start: Option<Duration>,
    pub(crate) corrections: CorrectionStats,
}

/// One connected player. Cheap to share as `Arc<Player>`.
pub struct Player {
    id: PlayerId,
    state: RwLock<PlayerState>,
}

impl Player {
    pub fn new(id: PlayerId, spawn: Vec2) -> Self {
        Self {
            id,
            state: RwLock::new(PlayerState {
                position: spawn,
                velocity: Vec2::ZERO,
                aim_angle: 0.0,
                health: health::MAX_HP,
                is_invulnerable: false,
                invulnerability_end: Duration::ZERO,
                death_time: None,
                kills: 0,
                deaths: 0,
                xp: 0,
                is_regenerating: false,
                last_damage_time: None,
                regen_accumulator: 0.0,
                input: InputState::default(),
                input_sequence: None,
                roll: None,
                last_roll_start: None,
                corrections: CorrectionStats::default(),
            }),
        }
    }

    pub fn id(&self) -> &PlayerId {
        &self.id
    }

    /// Run `f` with shared access to the state. For systems code that reads
    /// several fields under one lock acquisition.
    pub(crate) fn with_read<R>(&self, f: impl FnOnce(&PlayerState) -> R) -> R {
        f(&self.state.read())
    }

    /// Run `f` with exclusive access to the state. For systems code that
    /// mutates several fields under one lock acquisition.
    pub(crate) fn with_mut<R>(&self, f: impl FnOnce(&mut PlayerState) -> R) -> R {
        f(&mut self.state.write())
    }

    // === basic accessors ===

    pub fn position(&self) -> Vec2 {
        self.state.read().position
    }

    pub fn set_position(&self, pos: Vec2) {
        self.state.write().position = pos;
    }

    pub fn velocity(&self) -> Vec2 {
        self.state.read().velocity
    }

    pub fn set_velocity(&self, vel: Vec2) {
        self.state.write().velocity = vel;
    }

    pub fn aim_angle(&self) -> f64 {
        self.state.read().aim_angle
    }

    pub fn set_aim_angle(&self, angle: f64) {
        self.state.write().aim_angle = angle;
    }

    pub fn health(&self) -> i32 {
        self.state.read().health
    }

    pub fn is_alive(&self) -> bool {
        let s = self.state.read();
        s.health > 0 && s.death_time.is_none()
    }

    pub fn death_time(&self) -> Option<Duration> {
        self.state.read().death_time
    }

    pub fn kills(&self) -> u32 {
        self.state.read().kills
    }

    pub fn deaths(&self) -> u32 {
        self.state.read().deaths
    }

    pub fn xp(&self) -> u64 {
        self.state.read().xp
    }

    pub fn input(&self) -> InputState {
        self.state.read().input.clone()
    }

    pub fn input_sequence(&self) -> u64 {
        self.state.read().input_sequence.unwrap_or(0)
    }

    // === input ===

    /// Apply a client input if its sequence number advances the last
    /// accepted one. Returns false for stale or replayed sequences.
    pub fn set_input(&self, input: InputState, sequence: u64) -> bool {
        let mut s = self.state.write();
        if let Some(last) = s.input_sequence {
            if sequence <= last {
                return false;
            }
        }
        s.aim_angle = input.aim_angle;
        s.input = input;
        s.input_sequence = Some(sequence);
        true
    }

    // === damage, death, respawn ===

    /// Subtract damage, clamping at zero. Resets regeneration bookkeeping.
    /// Returns the remaining health.
    pub fn take_damage(&self, amount: i32, now: Duration) -> i32 {
        let mut s = self.state.write();
        s.health = (s.health - amount).max(0);
        s.last_damage_time = Some(now);
        s.is_regenerating = false;
        s.regen_accumulator = 0.0;
        s.health
    }

    /// Stamp the death time and force health to zero.
    pub fn mark_dead(&self, now: Duration) {
        let mut s = self.state.write();
        s.health = 0;
        s.death_time = Some(now);
        s.roll = None;
        s.velocity = Vec2::ZERO;
    }

    /// Dead long enough to be eligible for respawn.
    pub fn can_respawn(&self, now: Duration) -> bool {
        let s = self.state.read();
        match s.death_time {
            Some(died) => now.saturating_sub(died).as_secs_f64() >= health::RESPAWN_DELAY,
            None => false,
        }
    }

    /// Restore the player at `pos` with full health, spawn invulnerability
    /// and regeneration held off for a full delay window.
    pub fn respawn(&self, pos: Vec2, now: Duration) {
        let mut s = self.state.write();
        s.position = pos;
        s.velocity = Vec2::ZERO;
        s.health = health::MAX_HP;
        s.death_time = None;
        s.is_invulnerable = true;
        s.invulnerability_end = now + Duration::from_secs_f64(health::SPAWN_INVULN);
        s.is_regenerating = false;
        s.regen_accumulator = 0.0;
        s.last_damage_time = Some(now);
        s.roll = None;
    }

    // === invulnerability ===

    pub fn invulnerable_at(&self, now: Duration) -> bool {
        let s = self.state.read();
        s.is_invulnerable && now < s.invulnerability_end
    }

    /// Clear the invulnerability flag once its deadline passes.
    pub fn update_invulnerability(&self, now: Duration) {
        let mut s = self.state.write();
        if s.is_invulnerable && now >= s.invulnerability_end {
            s.is_invulnerable = false;
        }
    }

    // === regeneration ===

    pub fn can_regenerate(&self, now: Duration) -> bool {
        let s = self.state.read();
        if s.death_time.is_some() || s.health <= 0 || s.health >= health::MAX_HP {
            return false;
        }
        match s.last_damage_time {
            Some(t) => now.saturating_sub(t).as_secs_f64() >= health::REGEN_DELAY,
            None => true,
        }
    }

    /// Integrate fractional regeneration. Whole HP is flushed from the
    /// accumulator so the 10 HP/s rate survives 60 Hz integer health.
    pub fn apply_regeneration(&self, dt: f64) {
        let mut s = self.state.write();
        if s.health >= health::MAX_HP {
            return;
        }
        s.is_regenerating = true;
        s.regen_accumulator += health::REGEN_RATE * dt;
        let whole = (s.regen_accumulator + REGEN_FLUSH_EPSILON).floor();
        if whole >= 1.0 {
            s.health += whole as i32;
            s.regen_accumulator -= whole;
        }
        if s.health >= health::MAX_HP {
            s.health = health::MAX_HP;
            s.regen_accumulator = 0.0;
            s.is_regenerating = false;
        }
    }

    pub fn is_regenerating(&self) -> bool {
        self.state.read().is_regenerating
    }

    // === rolling ===

    /// Begin a dodge roll if alive, not already rolling, and off cooldown.
    /// Consumes the input roll trigger.
    pub fn try_start_roll(&self, now: Duration, direction: Vec2) -> bool {
        let mut s = self.state.write();
        if s.death_time.is_some() || s.roll.is_some() {
            return false;
        }
        if let Some(last) = s.last_roll_start {
            if now.saturating_sub(last).as_secs_f64() < movement::ROLL_COOLDOWN {
                s.input.roll = false;
                return false;
            }
        }
        s.roll = Some(RollState {
            start_time: now,
            direction,
        });
        s.last_roll_start = Some(now);
        s.input.roll = false;
        true
    }

    pub fn roll_state(&self) -> Option<RollState> {
        self.state.read().roll
    }

    pub fn is_rolling(&self) -> bool {
        self.state.read().roll.is_some()
    }

    /// Within the invulnerability frames at the start of a roll.
    pub fn in_roll_iframes(&self, now: Duration) -> bool {
        let s = self.state.read();
        match s.roll {
            Some(roll) => {
                now.saturating_sub(roll.start_time).as_secs_f64() <= movement::ROLL_IFRAMES
            }
            None => false,
        }
    }

    /// End the roll if one is active. Returns true when a roll was ended.
    pub fn end_roll(&self) -> bool {
        self.state.write().roll.take().is_some()
    }

    // === stats ===

    pub fn increment_kills(&self) {
        self.state.write().kills += 1;
    }

    pub fn increment_deaths(&self) {
        self.state.write().deaths += 1;
    }

    pub fn add_xp(&self, amount: u64) {
        self.state.write().xp += amount;
    }

    /// Kill/death ratio; returns the kill count when the player has no deaths.
    pub fn kd_ratio(&self) -> f64 {
        let s = self.state.read();
        if s.deaths == 0 {
            s.kills as f64
        } else {
            s.kills as f64 / s.deaths as f64
        }
    }

    // === anti-cheat bookkeeping ===

    /// Record one movement-validation outcome and return the updated rate.
    pub fn record_movement_update(&self, corrected: bool) -> f64 {
        let mut s = self.state.write();
        s.corrections.total_updates += 1;
        if corrected {
            s.corrections.total_corrections += 1;
        }
        s.corrections.rate()
    }

    pub fn correction_stats(&self) -> CorrectionStats {
        self.state.read().corrections
    }
}
