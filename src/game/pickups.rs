//! Weapon-crate spawn points and respawn timers.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::constants::pickups;
use crate::util::vec2::Vec2;

pub type CrateId = u32;

/// A weapon pickup placed on the map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponCrate {
    pub id: CrateId,
    pub position: Vec2,
    pub weapon_type: String,
    pub is_available: bool,
    /// When an unavailable crate becomes available again
    #[serde(skip)]
    pub respawn_time: Option<Duration>,
}

/// Per-room crate manager with the fixed crate placement.
pub struct WeaponCrateManager {
    crates: Mutex<Vec<WeaponCrate>>,
}

impl WeaponCrateManager {
    /// The five fixed crates: uzi top-center, ak47 left-mid, shotgun
    /// right-mid, katana bottom-center, bat top-left.
    pub fn new() -> Self {
        let placements = [
            (1, "uzi", Vec2::new(960.0, 150.0)),
            (2, "ak47", Vec2::new(200.0, 540.0)),
            (3, "shotgun", Vec2::new(1720.0, 540.0)),
            (4, "katana", Vec2::new(960.0, 930.0)),
            (5, "bat", Vec2::new(200.0, 150.0)),
        ];
        let crates = placements
            .into_iter()
            .map(|(id, weapon, position)| WeaponCrate {
                id,
                position,
                weapon_type: weapon.to_string(),
                is_available: true,
                respawn_time: None,
            })
            .collect();
        Self {
            crates: Mutex::new(crates),
        }
    }

    /// Collect a crate. Succeeds only while the crate is available; marks it
    /// unavailable and schedules its respawn.
    pub fn pickup(&self, crate_id: CrateId, now: Duration) -> bool {
        let mut crates = self.crates.lock();
        let Some(c) = crates.iter_mut().find(|c| c.id == crate_id) else {
            return false;
        };
        if !c.is_available {
            return false;
        }
        c.is_available = false;
        c.respawn_time = Some(now + Duration::from_secs_f64(pickups::WEAPON_RESPAWN));
        true
    }

    /// Flip crates whose respawn time has passed back to available and
    /// return their ids.
    pub fn update_respawns(&self, now: Duration) -> Vec<CrateId> {
        let mut crates = self.crates.lock();
        let mut respawned = Vec::new();
        for c in crates.iter_mut() {
            if let Some(at) = c.respawn_time {
                if now >= at {
                    c.is_available = true;
                    c.respawn_time = None;
                    respawned.push(c.id);
                }
            }
        }
        respawned
    }

    pub fn get(&self, crate_id: CrateId) -> Option<WeaponCrate> {
        self.crates.lock().iter().find(|c| c.id == crate_id).cloned()
    }

    pub fn all(&self) -> Vec<WeaponCrate> {
        self.crates.lock().clone()
    }

    /// Whether `position` is close enough to collect the crate.
    pub fn in_pickup_range(&self, crate_id: CrateId, position: Vec2) -> bool {
        self.get(crate_id)
            .map(|c| c.position.distance_to(position) <= pickups::PICKUP_RADIUS)
            .unwrap_or(false)
    }
}

impl Default for WeaponCrateManager {
    fn default() -> Self {
        Self::new()
    }
}
