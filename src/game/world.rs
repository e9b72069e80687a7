//! Per-room player registry and spawn-point selection.

use hashbrown::HashMap;
use parking_lot::RwLock;
use rand::Rng;
use std::sync::Arc;

use crate::game::constants::{arena, arena_center};
use crate::game::player::{InputState, Player, PlayerId};
use crate::net::protocol::PlayerSnapshot;
use crate::util::vec2::Vec2;

/// The set of players in one room. The map lock is only ever held to look up
/// or copy `Arc<Player>` pointers, never across a call into a player method.
pub struct World {
    players: RwLock<HashMap<PlayerId, Arc<Player>>>,
}

impl World {
    pub fn new() -> Self {
        Self {
            players: RwLock::new(HashMap::new()),
        }
    }

    /// Create and register a player at `spawn`. Replaces any player already
    /// registered under the same id.
    pub fn add_player(&self, id: PlayerId, spawn: Vec2) -> Arc<Player> {
        let player = Arc::new(Player::new(id.clone(), spawn));
        self.players.write().insert(id, player.clone());
        player
    }

    pub fn remove_player(&self, id: &str) -> Option<Arc<Player>> {
        self.players.write().remove(id)
    }

    pub fn get_player(&self, id: &str) -> Option<Arc<Player>> {
        self.players.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.players.read().contains_key(id)
    }

    pub fn player_count(&self) -> usize {
        self.players.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.read().is_empty()
    }

    /// Snapshot of the player pointers. Taken under the map lock and released
    /// before any per-player lock is acquired.
    pub fn players(&self) -> Vec<Arc<Player>> {
        self.players.read().values().cloned().collect()
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.read().keys().cloned().collect()
    }

    /// Snapshots of every player, weapon fields left blank. The room core
    /// merges loadout state when it builds broadcast snapshots.
    pub fn snapshot_all(&self) -> Vec<PlayerSnapshot> {
        self.players()
            .iter()
            .map(|p| PlayerSnapshot::from_player(p, None))
            .collect()
    }

    /// Apply a client input to a player. Returns false when the player is
    /// unknown or the sequence number is stale.
    pub fn update_player_input(&self, id: &str, input: InputState, sequence: u64) -> bool {
        match self.get_player(id) {
            Some(player) => player.set_input(input, sequence),
            None => false,
        }
    }

    /// Positions of living players, excluding `excluded_id`.
    pub fn living_positions(&self, excluded_id: Option<&str>) -> Vec<Vec2> {
        self.players()
            .iter()
            .filter(|p| excluded_id != Some(p.id().as_str()))
            .filter(|p| p.is_alive())
            .map(|p| p.position())
            .collect()
    }

    /// Pick a spawn point far from living enemies: sample candidates inside
    /// the margin-inset arena and keep the one whose nearest enemy is
    /// furthest. Falls back to the arena center with nobody else alive.
    pub fn balanced_spawn_point<R: Rng>(&self, excluded_id: Option<&str>, rng: &mut R) -> Vec2 {
        let enemies = self.living_positions(excluded_id);
        if enemies.is_empty() {
            return arena_center();
        }

        let min_x = arena::SPAWN_MARGIN;
        let max_x = arena::WIDTH - arena::SPAWN_MARGIN;
        let min_y = arena::SPAWN_MARGIN;
        let max_y = arena::HEIGHT - arena::SPAWN_MARGIN;

        let mut best = arena_center();
        let mut best_dist = f64::NEG_INFINITY;
        for _ in 0..arena::SPAWN_CANDIDATES {
            let candidate = Vec2::new(rng.gen_range(min_x..max_x), rng.gen_range(min_y..max_y));
            let nearest = enemies
                .iter()
                .map(|e| candidate.distance_sq_to(*e))
                .fold(f64::INFINITY, f64::min);
            if nearest > best_dist {
                best_dist = nearest;
                best = candidate;
            }
        }
        best
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
