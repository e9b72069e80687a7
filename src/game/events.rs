//! Events emitted by the simulation through an injected sink.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::game::match_state::{MatchEndReason, PlayerScore};
use crate::game::pickups::WeaponCrate;
use crate::game::player::{PlayerId, RollEndReason};
use crate::net::protocol::PlayerSnapshot;
use crate::util::vec2::Vec2;

/// A confirmed hit. `projectile_id` is absent for hitscan and melee hits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitEvent {
    pub projectile_id: Option<u64>,
    pub attacker_id: PlayerId,
    pub victim_id: PlayerId,
    pub damage: i32,
}

/// Receiver for everything the simulation reports outward. The room manager
/// installs a sink that frames these as wire messages; tests install
/// recording sinks. Implementations must not block: they are called from the
/// tick loop.
#[allow(unused_variables)]
pub trait EventSink: Send + Sync {
    /// Player snapshots at the broadcast cadence.
    fn broadcast(&self, room_id: Uuid, snapshots: &[PlayerSnapshot]) {}

    fn on_hit(&self, room_id: Uuid, event: &HitEvent) {}

    fn on_reload_complete(&self, room_id: Uuid, player_id: &str) {}

    fn on_respawn(&self, room_id: Uuid, player_id: &str, position: Vec2) {}

    fn on_roll_end(&self, room_id: Uuid, player_id: &str, reason: RollEndReason) {}

    fn on_weapon_pickup(
        &self,
        room_id: Uuid,
        player_id: &str,
        crate_id: u32,
        weapon_type: &str,
        respawn_in: Duration,
    ) {
    }

    fn on_weapon_respawn(&self, room_id: Uuid, weapon_crate: &WeaponCrate) {}

    fn on_match_timer(&self, room_id: Uuid, remaining_seconds: u64) {}

    fn on_match_end(
        &self,
        room_id: Uuid,
        reason: MatchEndReason,
        winners: &[PlayerId],
        scores: &[PlayerScore],
    ) {
    }
}

/// Sink that discards everything.
pub struct NullSink;

impl EventSink for NullSink {}
