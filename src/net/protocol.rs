//! Snapshot and server-message types handed to the wire layer.
//!
//! The core never touches a socket; it produces these values and the room
//! manager's sink encodes them as JSON envelopes for the connection writers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::events::HitEvent;
use crate::game::match_state::{MatchEndReason, PlayerScore};
use crate::game::pickups::WeaponCrate;
use crate::game::player::{Player, RollEndReason};
use crate::game::projectile::Projectile;
use crate::game::weapons::WeaponState;
use crate::util::vec2::Vec2;

/// Immutable copy of a player's public state, published at 20 Hz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: String,
    pub position: Vec2,
    pub velocity: Vec2,
    pub aim_angle: f64,
    pub health: i32,
    pub is_invulnerable: bool,
    pub is_dead: bool,
    pub is_rolling: bool,
    pub is_regenerating: bool,
    pub kills: u32,
    pub deaths: u32,
    pub xp: u64,
    pub input_sequence: u64,
    pub weapon: String,
    pub ammo: u32,
    pub is_reloading: bool,
    /// Soft anti-cheat signal for higher layers
    pub correction_rate: f64,
}

impl PlayerSnapshot {
    /// Build from a player and their equipped weapon state, taking the
    /// player's lock once.
    pub fn from_player(player: &Player, weapon: Option<&WeaponState>) -> Self {
        let (weapon_name, ammo, is_reloading) = match weapon {
            Some(w) => (w.config().name.clone(), w.ammo(), w.is_reloading()),
            None => (String::new(), 0, false),
        };
        player.with_read(|s| Self {
            id: player.id().clone(),
            position: s.position,
            velocity: s.velocity,
            aim_angle: s.aim_angle,
            health: s.health,
            is_invulnerable: s.is_invulnerable,
            is_dead: s.death_time.is_some(),
            is_rolling: s.roll.is_some(),
            is_regenerating: s.is_regenerating,
            kills: s.kills,
            deaths: s.deaths,
            xp: s.xp,
            input_sequence: s.input_sequence.unwrap_or(0),
            weapon: weapon_name,
            ammo,
            is_reloading,
            correction_rate: s.corrections.rate(),
        })
    }
}

/// Wire copy of an in-flight projectile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub id: u64,
    pub owner_id: String,
    pub weapon: String,
    pub position: Vec2,
    pub velocity: Vec2,
}

impl ProjectileSnapshot {
    pub fn from_projectile(p: &Projectile) -> Self {
        Self {
            id: p.id,
            owner_id: p.owner_id.clone(),
            weapon: p.weapon.clone(),
            position: p.position,
            velocity: p.velocity,
        }
    }
}

/// Messages from the core to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    RoomJoined {
        room_id: Uuid,
        player_id: String,
        players: Vec<PlayerSnapshot>,
        crates: Vec<WeaponCrate>,
    },
    PlayerLeft {
        player_id: String,
    },
    Snapshot {
        players: Vec<PlayerSnapshot>,
    },
    Hit(HitEvent),
    ReloadComplete {
        player_id: String,
    },
    Respawn {
        player_id: String,
        position: Vec2,
    },
    RollEnd {
        player_id: String,
        reason: RollEndReason,
    },
    WeaponPickup {
        player_id: String,
        crate_id: u32,
        weapon_type: String,
        respawn_secs: f64,
    },
    WeaponRespawn {
        #[serde(rename = "crate")]
        weapon_crate: WeaponCrate,
    },
    MatchStarted {
        kill_target: u32,
        time_limit_secs: u64,
    },
    MatchTimer {
        remaining_seconds: u64,
    },
    MatchEnded {
        reason: MatchEndReason,
        winners: Vec<String>,
        scores: Vec<PlayerScore>,
    },
}

/// Encode a server message as a JSON envelope.
pub fn encode(message: &ServerMessage) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(message)
}
