//! Weapon definitions and per-player weapon state.
//!
//! Definitions load from a JSON file at startup (`{version, weapons: {...}}`)
//! and fall back to the built-in set when the file is missing or malformed.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Recoil tuning for automatic weapons, in degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RecoilConfig {
    pub vertical_per_shot: f64,
    pub horizontal_per_shot: f64,
    /// Seconds without firing before accumulated recoil resets
    pub recovery_time: f64,
    /// Cap on accumulated vertical recoil
    pub max_accumulation: f64,
}

/// Static definition of one weapon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeaponConfig {
    pub name: String,
    pub damage: i32,
    /// Shots per second
    pub fire_rate: f64,
    pub magazine_size: u32,
    /// Seconds to refill the magazine
    pub reload_time: f64,
    /// Pixels per second; zero for hitscan and melee weapons
    pub projectile_speed: f64,
    /// Maximum effective range in pixels
    pub range: f64,
    /// Swing arc for melee weapons, in degrees
    pub arc_degrees: f64,
    /// Knockback displacement applied to melee victims, in pixels
    pub knockback_distance: f64,
    #[serde(default)]
    pub recoil: Option<RecoilConfig>,
    pub spread_degrees: f64,
    pub is_hitscan: bool,
}

impl WeaponConfig {
    /// A weapon is melee iff it has no magazine and no projectile speed.
    pub fn is_melee(&self) -> bool {
        self.magazine_size == 0 && self.projectile_speed == 0.0
    }

    /// Seconds between shots.
    pub fn cooldown(&self) -> f64 {
        if self.fire_rate > 0.0 {
            1.0 / self.fire_rate
        } else {
            0.0
        }
    }
}

/// On-disk weapon catalog schema.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    version: u32,
    weapons: HashMap<String, WeaponConfig>,
}

const CATALOG_SCHEMA_VERSION: u32 = 1;

/// The default starting weapon.
pub const DEFAULT_WEAPON: &str = "pistol";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read weapon catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse weapon catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported weapon catalog version {0}")]
    UnsupportedVersion(u32),
    #[error("weapon catalog is missing the default weapon \"{DEFAULT_WEAPON}\"")]
    MissingDefault,
}

/// All weapon definitions for a server instance.
#[derive(Debug, Clone)]
pub struct WeaponCatalog {
    weapons: HashMap<String, WeaponConfig>,
}

impl WeaponCatalog {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let file: CatalogFile = serde_json::from_str(&raw)?;
        if file.version != CATALOG_SCHEMA_VERSION {
            return Err(CatalogError::UnsupportedVersion(file.version));
        }
        if !file.weapons.contains_key(DEFAULT_WEAPON) {
            return Err(CatalogError::MissingDefault);
        }
        Ok(Self {
            weapons: file.weapons,
        })
    }

    /// Load from a JSON file, falling back to the built-in definitions.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("weapon catalog {}: {e}; using built-in defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&WeaponConfig> {
        self.weapons.get(name)
    }

    pub fn default_weapon(&self) -> &WeaponConfig {
        &self.weapons[DEFAULT_WEAPON]
    }

    pub fn names(&self) -> Vec<&str> {
        self.weapons.keys().map(String::as_str).collect()
    }
}

impl Default for WeaponCatalog {
    fn default() -> Self {
        let mut weapons = HashMap::new();
        weapons.insert(
            "pistol".to_string(),
            WeaponConfig {
                name: "pistol".to_string(),
                damage: 25,
                fire_rate: 3.0,
                magazine_size: 12,
                reload_time: 1.5,
                projectile_speed: 0.0,
                range: 800.0,
                arc_degrees: 0.0,
                knockback_distance: 0.0,
                recoil: Some(RecoilConfig {
                    vertical_per_shot: 0.5,
                    horizontal_per_shot: 0.3,
                    recovery_time: 0.3,
                    max_accumulation: 3.0,
                }),
                spread_degrees: 2.0,
                is_hitscan: true,
            },
        );
        weapons.insert(
            "uzi".to_string(),
            WeaponConfig {
                name: "uzi".to_string(),
                damage: 10,
                fire_rate: 10.0,
                magazine_size: 30,
                reload_time: 2.0,
                projectile_speed: 0.0,
                range: 600.0,
                arc_degrees: 0.0,
                knockback_distance: 0.0,
                recoil: Some(RecoilConfig {
                    vertical_per_shot: 0.8,
                    horizontal_per_shot: 0.6,
                    recovery_time: 0.25,
                    max_accumulation: 8.0,
                }),
                spread_degrees: 6.0,
                is_hitscan: true,
            },
        );
        weapons.insert(
            "ak47".to_string(),
            WeaponConfig {
                name: "ak47".to_string(),
                damage: 20,
                fire_rate: 6.0,
                magazine_size: 30,
                reload_time: 2.5,
                projectile_speed: 0.0,
                range: 900.0,
                arc_degrees: 0.0,
                knockback_distance: 0.0,
                recoil: Some(RecoilConfig {
                    vertical_per_shot: 1.2,
                    horizontal_per_shot: 0.5,
                    recovery_time: 0.35,
                    max_accumulation: 10.0,
                }),
                spread_degrees: 4.0,
                is_hitscan: true,
            },
        );
        weapons.insert(
            "shotgun".to_string(),
            WeaponConfig {
                name: "shotgun".to_string(),
                damage: 80,
                fire_rate: 1.25,
                magazine_size: 6,
                reload_time: 3.0,
                projectile_speed: 900.0,
                range: 400.0,
                arc_degrees: 0.0,
                knockback_distance: 0.0,
                recoil: Some(RecoilConfig {
                    vertical_per_shot: 2.0,
                    horizontal_per_shot: 1.0,
                    recovery_time: 0.5,
                    max_accumulation: 6.0,
                }),
                spread_degrees: 24.0,
                is_hitscan: false,
            },
        );
        weapons.insert(
            "bat".to_string(),
            WeaponConfig {
                name: "bat".to_string(),
                damage: 35,
                fire_rate: 1.5,
                magazine_size: 0,
                reload_time: 0.0,
                projectile_speed: 0.0,
                range: 50.0,
                arc_degrees: 90.0,
                knockback_distance: 80.0,
                recoil: None,
                spread_degrees: 0.0,
                is_hitscan: false,
            },
        );
        weapons.insert(
            "katana".to_string(),
            WeaponConfig {
                name: "katana".to_string(),
                damage: 50,
                fire_rate: 1.2,
                magazine_size: 0,
                reload_time: 0.0,
                projectile_speed: 0.0,
                range: 60.0,
                arc_degrees: 60.0,
                knockback_distance: 0.0,
                recoil: None,
                spread_degrees: 0.0,
                is_hitscan: false,
            },
        );
        Self { weapons }
    }
}

/// Why a fire attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireBlock {
    Reloading,
    Cooldown,
    Empty,
}

/// Per-player ammo, reload, cooldown and recoil accumulation for the
/// currently equipped weapon.
#[derive(Debug, Clone)]
pub struct WeaponState {
    config: WeaponConfig,
    current_ammo: u32,
    is_reloading: bool,
    reload_start: Duration,
    last_shot_time: Option<Duration>,
    shots_fired: u32,
}

impl WeaponState {
    pub fn new(config: WeaponConfig) -> Self {
        let current_ammo = config.magazine_size;
        Self {
            config,
            current_ammo,
            is_reloading: false,
            reload_start: Duration::ZERO,
            last_shot_time: None,
            shots_fired: 0,
        }
    }

    pub fn config(&self) -> &WeaponConfig {
        &self.config
    }

    pub fn ammo(&self) -> u32 {
        self.current_ammo
    }

    pub fn is_reloading(&self) -> bool {
        self.is_reloading
    }

    fn cooldown_ready(&self, now: Duration) -> bool {
        match self.last_shot_time {
            Some(last) => now.saturating_sub(last).as_secs_f64() >= self.config.cooldown(),
            None => true,
        }
    }

    /// Check whether a shot may fire right now. Melee weapons bypass ammo
    /// and reload gating but still respect the fire-rate cooldown.
    pub fn check_fire(&self, now: Duration) -> Result<(), FireBlock> {
        if !self.cooldown_ready(now) {
            return Err(FireBlock::Cooldown);
        }
        if self.config.is_melee() {
            return Ok(());
        }
        if self.is_reloading {
            return Err(FireBlock::Reloading);
        }
        if self.current_ammo == 0 {
            return Err(FireBlock::Empty);
        }
        Ok(())
    }

    pub fn can_shoot(&self, now: Duration) -> bool {
        self.check_fire(now).is_ok()
    }

    /// Commit a shot: spend ammo for non-melee weapons and stamp the shot
    /// time. Recoil accumulation resets after the recovery window.
    pub fn record_shot(&mut self, now: Duration) {
        if let (Some(recoil), Some(last)) = (self.config.recoil, self.last_shot_time) {
            if now.saturating_sub(last).as_secs_f64() >= recoil.recovery_time {
                self.shots_fired = 0;
            }
        }
        if !self.config.is_melee() {
            self.current_ammo = self.current_ammo.saturating_sub(1);
        }
        self.last_shot_time = Some(now);
        self.shots_fired += 1;
    }

    /// Begin a reload. No-op for melee weapons, a full magazine, or an
    /// already-running reload. Returns whether a reload was started.
    pub fn start_reload(&mut self, now: Duration) -> bool {
        if self.config.is_melee()
            || self.is_reloading
            || self.current_ammo >= self.config.magazine_size
        {
            return false;
        }
        self.is_reloading = true;
        self.reload_start = now;
        true
    }

    /// Complete a finished reload. Returns true exactly on the tick the
    /// reload finishes so the loop can dispatch a single completion event.
    pub fn check_reload_complete(&mut self, now: Duration) -> bool {
        if !self.is_reloading {
            return false;
        }
        if now.saturating_sub(self.reload_start).as_secs_f64() >= self.config.reload_time {
            self.current_ammo = self.config.magazine_size;
            self.is_reloading = false;
            return true;
        }
        false
    }

    /// Abort a reload, e.g. when the weapon is swapped away.
    pub fn cancel_reload(&mut self) {
        self.is_reloading = false;
    }

    /// Accumulated vertical recoil in degrees for the next shot.
    pub fn accumulated_recoil(&self, now: Duration) -> f64 {
        let Some(recoil) = self.config.recoil else {
            return 0.0;
        };
        if let Some(last) = self.last_shot_time {
            if now.saturating_sub(last).as_secs_f64() >= recoil.recovery_time {
                return 0.0;
            }
        }
        (self.shots_fired as f64 * recoil.vertical_per_shot).min(recoil.max_accumulation)
    }
}
