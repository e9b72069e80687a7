//! Gameplay constants shared bit-identically between server and client.

/// Arena bounds and hitbox dimensions
pub mod arena {
    /// Arena width in pixels
    pub const WIDTH: f64 = 1920.0;
    /// Arena height in pixels
    pub const HEIGHT: f64 = 1080.0;
    /// Player hitbox width
    pub const HITBOX_WIDTH: f64 = 32.0;
    /// Player hitbox height
    pub const HITBOX_HEIGHT: f64 = 64.0;
    /// Margin kept clear of walls when sampling spawn candidates
    pub const SPAWN_MARGIN: f64 = 100.0;
    /// Number of random candidates sampled for a balanced spawn
    pub const SPAWN_CANDIDATES: usize = 10;
    /// Arena center, the spawn point when no enemies are alive
    pub const CENTER_X: f64 = WIDTH / 2.0;
    pub const CENTER_Y: f64 = HEIGHT / 2.0;
}

/// Movement and dodge-roll constants
pub mod movement {
    /// Base movement speed in px/s
    pub const MOVE_SPEED: f64 = 200.0;
    /// Sprint movement speed in px/s
    pub const SPRINT_SPEED: f64 = 300.0;
    /// Velocity interpolation factor toward the input target (per second)
    pub const ACCELERATION: f64 = 50.0;
    /// Velocity interpolation factor toward zero when input stops (per second)
    pub const DECELERATION: f64 = 50.0;
    /// Roll duration in seconds
    pub const ROLL_DURATION: f64 = 0.4;
    /// Total roll travel in pixels
    pub const ROLL_DISTANCE: f64 = 100.0;
    /// Roll velocity in px/s (ROLL_DISTANCE / ROLL_DURATION gives 250)
    pub const ROLL_VELOCITY: f64 = 250.0;
    /// Cooldown between roll starts in seconds
    pub const ROLL_COOLDOWN: f64 = 3.0;
    /// Invulnerability window at the start of a roll in seconds
    pub const ROLL_IFRAMES: f64 = 0.2;
}

/// Health, damage and regeneration constants
pub mod health {
    /// Maximum (and spawn) health
    pub const MAX_HP: i32 = 100;
    /// Seconds a player stays dead before becoming respawnable
    pub const RESPAWN_DELAY: f64 = 3.0;
    /// Spawn invulnerability window in seconds
    pub const SPAWN_INVULN: f64 = 2.0;
    /// Seconds without damage before regeneration starts
    pub const REGEN_DELAY: f64 = 5.0;
    /// Regeneration rate in HP per second
    pub const REGEN_RATE: f64 = 10.0;
    /// XP awarded per kill
    pub const KILL_XP: u64 = 100;
}

/// Combat tuning constants
pub mod combat {
    /// Radius of the hitscan target disk in pixels
    pub const HITSCAN_TARGET_RADIUS: f64 = 16.0;
    /// Hard cap on lag-compensation rewind in milliseconds
    pub const MAX_REWIND_MS: u64 = 150;
    /// Spread multiplier while sprinting
    pub const SPRINT_SPREAD_MULTIPLIER: f64 = 1.5;
    /// Pellets per shotgun shot
    pub const SHOTGUN_PELLETS: usize = 8;
    /// Jitter applied to each pellet as a fraction of inter-pellet spacing
    pub const PELLET_JITTER_RATIO: f64 = 0.1;
    /// Wall-clock projectile lifetime backstop in seconds
    pub const PROJECTILE_LIFETIME: f64 = 2.0;
    /// Fraction of weapon range with no damage falloff
    pub const FALLOFF_START_RATIO: f64 = 0.6;
    /// Damage multiplier at maximum range
    pub const FALLOFF_MIN_MULTIPLIER: f64 = 0.5;
}

/// Weapon-crate pickup constants
pub mod pickups {
    /// Seconds before a collected crate respawns
    pub const WEAPON_RESPAWN: f64 = 30.0;
    /// Pickup eligibility radius in pixels
    pub const PICKUP_RADIUS: f64 = 32.0;
}

/// Simulation cadence constants
pub mod timing {
    /// Simulation tick rate in Hz
    pub const TICK_RATE: u32 = 60;
    /// Snapshot broadcast rate in Hz
    pub const BROADCAST_RATE: u32 = 20;
    /// Nominal delta time per tick in seconds
    pub const DT: f64 = 1.0 / TICK_RATE as f64;
    /// Tick duration in milliseconds
    pub const TICK_DURATION_MS: u64 = 1000 / TICK_RATE as u64;
    /// Broadcast interval in milliseconds
    pub const BROADCAST_DURATION_MS: u64 = 1000 / BROADCAST_RATE as u64;
    /// Position history depth (covers ~1 s at 60 Hz)
    pub const POSITION_HISTORY_LEN: usize = 60;
    /// RTT samples retained per connection
    pub const PING_SAMPLES: usize = 5;
}

/// Match rules
pub mod rules {
    /// Kills needed to win
    pub const KILL_TARGET: u32 = 20;
    /// Match time limit in seconds
    pub const TIME_LIMIT_SECS: u64 = 420;
    /// Kill target under TEST_MODE
    pub const TEST_KILL_TARGET: u32 = 3;
    /// Time limit under TEST_MODE
    pub const TEST_TIME_LIMIT_SECS: u64 = 60;
    /// Players required to form a room
    pub const ROOM_START_PLAYERS: usize = 2;
    /// Maximum players per room
    pub const ROOM_MAX_PLAYERS: usize = 8;
}

/// Movement validation thresholds
pub mod validation {
    /// Tolerance multiplier on the speed cap
    pub const SPEED_TOLERANCE: f64 = 1.05;
    /// Relative tolerance for the position-consistency check
    pub const CONSISTENCY_TOLERANCE: f64 = 0.05;
    /// Displacement below which the consistency check is skipped
    pub const CONSISTENCY_MIN_DISPLACEMENT: f64 = 0.1;
    /// Correction rate above which an anti-cheat warning is logged
    pub const CORRECTION_WARN_RATE: f64 = 0.2;
}

/// Minimum x/y a player center may occupy (arena inset by half the hitbox)
#[inline]
pub fn player_min() -> crate::util::vec2::Vec2 {
    crate::util::vec2::Vec2::new(arena::HITBOX_WIDTH / 2.0, arena::HITBOX_HEIGHT / 2.0)
}

/// Maximum x/y a player center may occupy
#[inline]
pub fn player_max() -> crate::util::vec2::Vec2 {
    crate::util::vec2::Vec2::new(
        arena::WIDTH - arena::HITBOX_WIDTH / 2.0,
        arena::HEIGHT - arena::HITBOX_HEIGHT / 2.0,
    )
}

/// Arena center point
#[inline]
pub fn arena_center() -> crate::util::vec2::Vec2 {
    crate::util::vec2::Vec2::new(arena::CENTER_X, arena::CENTER_Y)
}

/// Whether a player center position lies inside the inset arena
#[inline]
pub fn in_bounds(pos: crate::util::vec2::Vec2) -> bool {
    let min = player_min();
    let max = player_max();
    pos.x >= min.x && pos.x <= max.x && pos.y >= min.y && pos.y <= max.y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::vec2::Vec2;

    #[test]
    fn test_tick_rate() {
        assert_eq!(timing::TICK_RATE, 60);
        assert!((timing::DT - 1.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_broadcast_slower_than_tick() {
        assert!(timing::BROADCAST_RATE < timing::TICK_RATE);
        assert_eq!(timing::BROADCAST_DURATION_MS, 50);
    }

    #[test]
    fn test_roll_distance_consistent() {
        let travelled = movement::ROLL_VELOCITY * movement::ROLL_DURATION;
        assert!((travelled - movement::ROLL_DISTANCE).abs() < 1e-9);
    }

    #[test]
    fn test_player_bounds_inset() {
        let min = player_min();
        let max = player_max();
        assert_eq!(min, Vec2::new(16.0, 32.0));
        assert_eq!(max, Vec2::new(1904.0, 1048.0));
    }

    #[test]
    fn test_arena_center() {
        assert_eq!(arena_center(), Vec2::new(960.0, 540.0));
    }

    #[test]
    fn test_in_bounds() {
        assert!(in_bounds(arena_center()));
        assert!(in_bounds(Vec2::new(16.0, 32.0)));
        assert!(!in_bounds(Vec2::new(15.9, 500.0)));
        assert!(!in_bounds(Vec2::new(500.0, 1048.1)));
    }

    #[test]
    fn test_sprint_faster_than_walk() {
        assert!(movement::SPRINT_SPEED > movement::MOVE_SPEED);
    }

    #[test]
    fn test_history_covers_rewind_cap() {
        // 60 entries at 60 Hz is 1 s of history, far above the 150 ms cap.
        let history_secs = timing::POSITION_HISTORY_LEN as f64 * timing::DT;
        assert!(history_secs * 1000.0 > combat::MAX_REWIND_MS as f64);
    }

    #[test]
    fn test_falloff_bounds() {
        assert!(combat::FALLOFF_START_RATIO > 0.0 && combat::FALLOFF_START_RATIO < 1.0);
        assert!(combat::FALLOFF_MIN_MULTIPLIER > 0.0 && combat::FALLOFF_MIN_MULTIPLIER <= 1.0);
    }
}
