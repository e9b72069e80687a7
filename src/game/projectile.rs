//! In-flight projectile lifecycle.

use hashbrown::HashMap;
use parking_lot::Mutex;
use std::time::Duration;

use crate::game::constants::{arena, combat};
use crate::game::player::PlayerId;
use crate::util::vec2::Vec2;

/// Entity id for projectiles, unique within a room.
pub type ProjectileId = u64;

/// One in-flight projectile (or shotgun pellet).
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: ProjectileId,
    pub owner_id: PlayerId,
    /// Weapon that fired this projectile
    pub weapon: String,
    pub damage: i32,
    /// Maximum travel from `spawn_position`
    pub range: f64,
    pub position: Vec2,
    pub spawn_position: Vec2,
    pub velocity: Vec2,
    pub created_at: Duration,
    pub active: bool,
}

impl Projectile {
    pub fn travelled(&self) -> f64 {
        self.position.distance_to(self.spawn_position)
    }

    fn expired(&self, now: Duration) -> bool {
        now.saturating_sub(self.created_at).as_secs_f64() >= combat::PROJECTILE_LIFETIME
    }

    fn out_of_bounds(&self) -> bool {
        self.position.x < 0.0
            || self.position.x > arena::WIDTH
            || self.position.y < 0.0
            || self.position.y > arena::HEIGHT
    }
}

struct ManagerInner {
    projectiles: HashMap<ProjectileId, Projectile>,
    next_id: ProjectileId,
}

/// Per-room projectile manager. One lock over the id map.
pub struct ProjectileManager {
    inner: Mutex<ManagerInner>,
}

impl ProjectileManager {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ManagerInner {
                projectiles: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Spawn a projectile and return a copy of it.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        owner_id: PlayerId,
        weapon: String,
        damage: i32,
        range: f64,
        position: Vec2,
        velocity: Vec2,
        now: Duration,
    ) -> Projectile {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        let projectile = Projectile {
            id,
            owner_id,
            weapon,
            damage,
            range,
            position,
            spawn_position: position,
            velocity,
            created_at: now,
            active: true,
        };
        inner.projectiles.insert(id, projectile.clone());
        projectile
    }

    /// Advance all projectiles by `dt` and drop the ones that are finished:
    /// deactivated, past their lifetime, out of the arena, or past their
    /// weapon's range.
    pub fn update(&self, dt: f64, now: Duration) {
        let mut inner = self.inner.lock();
        for projectile in inner.projectiles.values_mut() {
            projectile.position += projectile.velocity * dt;
        }
        inner.projectiles.retain(|_, p| {
            p.active && !p.expired(now) && !p.out_of_bounds() && p.travelled() <= p.range
        });
    }

    /// Copies of all active projectiles.
    pub fn get_active(&self) -> Vec<Projectile> {
        self.inner
            .lock()
            .projectiles
            .values()
            .filter(|p| p.active)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: ProjectileId) -> Option<Projectile> {
        self.inner.lock().projectiles.get(&id).cloned()
    }

    /// Mark a projectile spent (e.g. it hit someone). It is removed on the
    /// next update.
    pub fn deactivate(&self, id: ProjectileId) {
        if let Some(p) = self.inner.lock().projectiles.get_mut(&id) {
            p.active = false;
        }
    }

    pub fn remove(&self, id: ProjectileId) -> Option<Projectile> {
        self.inner.lock().projectiles.remove(&id)
    }

    pub fn count(&self) -> usize {
        self.inner.lock().projectiles.len()
    }

    pub fn clear(&self) {
        self.inner.lock().projectiles.clear();
    }
}

impl Default for ProjectileManager {
    fn default() -> Self {
        Self::new()
    }
}
