//! Per-room simulation: the authoritative tick pipeline, the intent
//! handlers called from connection workers, and the two scheduled loops.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use hashbrown::HashMap;
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::anticheat::movement::MovementValidator;
use crate::game::constants::{health, pickups, timing};
use crate::game::events::{EventSink, HitEvent};
use crate::game::history::PositionHistory;
use crate::game::match_state::{Match, MatchConfig, MatchEndReason, MatchPhase};
use crate::game::pickups::{CrateId, WeaponCrateManager};
use crate::game::player::{InputState, Player, PlayerId};
use crate::game::projectile::ProjectileManager;
use crate::game::systems::combat::{self, HitRecord, QueuedShot};
use crate::game::systems::physics;
use crate::game::weapons::{FireBlock, WeaponCatalog, WeaponState};
use crate::game::world::World;
use crate::net::ping::PingRegistry;
use crate::net::protocol::{PlayerSnapshot, ProjectileSnapshot};
use crate::util::clock::Clock;
use crate::util::vec2::Vec2;

/// Queued hitscan shots waiting for the next tick.
const SHOT_QUEUE_CAPACITY: usize = 256;

/// Why an intent was refused. Structured return values, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentRejection {
    NoPlayer,
    Cooldown,
    Empty,
    Reloading,
    NotMelee,
    PlayerDead,
    NoWeapon,
}

/// Outcome of a shoot intent.
#[derive(Debug, Clone)]
pub struct ShootResult {
    pub success: bool,
    pub reason: Option<IntentRejection>,
    /// Spawned projectiles (pellets included); empty for hitscan weapons
    pub projectiles: Vec<ProjectileSnapshot>,
}

impl ShootResult {
    fn rejected(reason: IntentRejection) -> Self {
        Self {
            success: false,
            reason: Some(reason),
            projectiles: Vec::new(),
        }
    }
}

/// Outcome of a melee intent.
#[derive(Debug, Clone)]
pub struct MeleeResult {
    pub success: bool,
    pub reason: Option<IntentRejection>,
    pub hit_players: Vec<PlayerId>,
    pub knockback_applied: bool,
}

impl MeleeResult {
    fn rejected(reason: IntentRejection) -> Self {
        Self {
            success: false,
            reason: Some(reason),
            hit_players: Vec::new(),
            knockback_applied: false,
        }
    }
}

/// Authoritative state and logic for one room. Shared as `Arc<RoomCore>`
/// between the scheduled loops and the per-connection intent handlers.
///
/// Lock conventions: the world map lock is released before any player lock
/// is taken; the loadout map lock may be taken before player locks but
/// never the other way around.
pub struct RoomCore {
    room_id: Uuid,
    clock: Arc<dyn Clock>,
    catalog: Arc<WeaponCatalog>,
    events: Arc<dyn EventSink>,
    pub(crate) world: World,
    pub(crate) projectiles: ProjectileManager,
    pub(crate) history: PositionHistory,
    pub(crate) pings: PingRegistry,
    pub(crate) crates: WeaponCrateManager,
    match_state: Match,
    validator: MovementValidator,
    rng: Mutex<SmallRng>,
    loadouts: Mutex<HashMap<PlayerId, WeaponState>>,
    shot_tx: Sender<QueuedShot>,
    shot_rx: Receiver<QueuedShot>,
    last_tick: Mutex<Option<Duration>>,
    last_timer_seconds: Mutex<Option<u64>>,
}

impl RoomCore {
    pub fn new(
        room_id: Uuid,
        clock: Arc<dyn Clock>,
        catalog: Arc<WeaponCatalog>,
        events: Arc<dyn EventSink>,
        match_config: MatchConfig,
        rng_seed: u64,
    ) -> Self {
        let (shot_tx, shot_rx) = bounded(SHOT_QUEUE_CAPACITY);
        Self {
            room_id,
            clock,
            catalog,
            events,
            world: World::new(),
            projectiles: ProjectileManager::new(),
            history: PositionHistory::new(),
            pings: PingRegistry::new(),
            crates: WeaponCrateManager::new(),
            match_state: Match::new(match_config),
            validator: MovementValidator::default(),
            rng: Mutex::new(SmallRng::seed_from_u64(rng_seed)),
            loadouts: Mutex::new(HashMap::new()),
            shot_tx,
            shot_rx,
            last_tick: Mutex::new(None),
            last_timer_seconds: Mutex::new(None),
        }
    }

    pub fn room_id(&self) -> Uuid {
        self.room_id
    }

    pub fn match_state(&self) -> &Match {
        &self.match_state
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn crates(&self) -> &WeaponCrateManager {
        &self.crates
    }

    /// Copy of a player's equipped weapon state.
    pub fn equipped_weapon(&self, player_id: &str) -> Option<WeaponState> {
        self.loadouts.lock().get(player_id).cloned()
    }

    // === intents (callable from connection workers) ===

    /// Register a player at a balanced spawn point with the default weapon.
    pub fn add_player(&self, id: PlayerId) -> Arc<Player> {
        let spawn = {
            let mut rng = self.rng.lock();
            self.world.balanced_spawn_point(None, &mut *rng)
        };
        let player = self.world.add_player(id.clone(), spawn);
        self.loadouts.lock().insert(
            id.clone(),
            WeaponState::new(self.catalog.default_weapon().clone()),
        );
        self.match_state.register_player(&id);
        debug!(room = %self.room_id, player = %id, ?spawn, "player joined room");
        player
    }

    /// Remove a player and all per-player bookkeeping.
    pub fn remove_player(&self, id: &str) -> bool {
        let removed = self.world.remove_player(id).is_some();
        if removed {
            self.loadouts.lock().remove(id);
            self.history.remove_player(id);
            self.pings.remove_player(id);
            debug!(room = %self.room_id, player = %id, "player left room");
        }
        removed
    }

    pub fn update_player_input(&self, id: &str, input: InputState, sequence: u64) -> bool {
        self.world.update_player_input(id, input, sequence)
    }

    pub fn ping_rtt(&self, id: &str, rtt: Duration) {
        self.pings.record(id, rtt);
    }

    /// Fire the equipped weapon. Hitscan shots are queued and resolved inside
    /// the next tick against tick-aligned history; projectile weapons spawn
    /// their projectiles immediately.
    pub fn player_shoot(
        &self,
        id: &str,
        aim_angle: f64,
        _client_timestamp_ms: u64,
    ) -> ShootResult {
        let Some(player) = self.world.get_player(id) else {
            return ShootResult::rejected(IntentRejection::NoPlayer);
        };
        if !player.is_alive() {
            return ShootResult::rejected(IntentRejection::PlayerDead);
        }
        let now = self.clock.now();

        // Player-derived spread inputs, read before the loadout lock.
        let (position, velocity, sprint_held) =
            player.with_read(|s| (s.position, s.velocity, s.input.sprint));
        let moving = velocity.length() > 1.0;
        let sprinting = sprint_held && moving;

        let mut loadouts = self.loadouts.lock();
        let Some(state) = loadouts.get_mut(id) else {
            return ShootResult::rejected(IntentRejection::NoWeapon);
        };

        match state.check_fire(now) {
            Err(FireBlock::Cooldown) => return ShootResult::rejected(IntentRejection::Cooldown),
            Err(FireBlock::Reloading) => return ShootResult::rejected(IntentRejection::Reloading),
            Err(FireBlock::Empty) => {
                // Dry fire starts the reload automatically.
                state.start_reload(now);
                return ShootResult::rejected(IntentRejection::Empty);
            }
            Ok(()) => {}
        }

        let config = state.config().clone();
        if config.is_melee() {
            return ShootResult::rejected(IntentRejection::NoWeapon);
        }

        let mut rng = self.rng.lock();
        let aim = combat::effective_aim_angle(aim_angle, state, now, moving, sprinting, &mut *rng);
        state.record_shot(now);

        if config.is_hitscan {
            let shot = QueuedShot {
                shooter_id: id.to_string(),
                aim_angle: aim,
                weapon: config,
                fired_at: now,
            };
            match self.shot_tx.try_send(shot) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                    warn!(room = %self.room_id, player = %id, "hitscan queue unavailable; shot dropped");
                }
            }
            return ShootResult {
                success: true,
                reason: None,
                projectiles: Vec::new(),
            };
        }

        // Projectile weapon: a pellet fan when it has spread, one otherwise.
        let angles: Vec<f64> = if config.spread_degrees > 0.0 {
            combat::pellet_angles(aim, config.spread_degrees, &mut *rng).to_vec()
        } else {
            vec![aim]
        };
        let pellet_damage = config.damage / angles.len() as i32;
        let projectiles = angles
            .iter()
            .map(|&angle| {
                let projectile = self.projectiles.create(
                    id.to_string(),
                    config.name.clone(),
                    pellet_damage,
                    config.range,
                    position,
                    Vec2::from_angle(angle) * config.projectile_speed,
                    now,
                );
                ProjectileSnapshot::from_projectile(&projectile)
            })
            .collect();

        ShootResult {
            success: true,
            reason: None,
            projectiles,
        }
    }

    /// Swing the equipped melee weapon. Resolved immediately against live
    /// positions; melee reach is too short for lag compensation to matter.
    pub fn player_melee(&self, id: &str, aim_angle: f64) -> MeleeResult {
        let Some(player) = self.world.get_player(id) else {
            return MeleeResult::rejected(IntentRejection::NoPlayer);
        };
        if !player.is_alive() {
            return MeleeResult::rejected(IntentRejection::PlayerDead);
        }
        let now = self.clock.now();

        let config = {
            let mut loadouts = self.loadouts.lock();
            let Some(state) = loadouts.get_mut(id) else {
                return MeleeResult::rejected(IntentRejection::NoWeapon);
            };
            let config = state.config().clone();
            if !config.is_melee() {
                return MeleeResult::rejected(IntentRejection::NotMelee);
            }
            if state.check_fire(now).is_err() {
                return MeleeResult::rejected(IntentRejection::Cooldown);
            }
            state.record_shot(now);
            config
        };

        let outcome = combat::melee_attack(&self.world, &player, aim_angle, &config, now);
        let hit_players: Vec<PlayerId> =
            outcome.hits.iter().map(|h| h.victim_id.clone()).collect();
        self.process_hits(outcome.hits, now);

        MeleeResult {
            success: true,
            reason: None,
            hit_players,
            knockback_applied: outcome.knockback_applied,
        }
    }

    /// Begin reloading the equipped weapon.
    pub fn player_reload(&self, id: &str) -> bool {
        let Some(player) = self.world.get_player(id) else {
            return false;
        };
        if !player.is_alive() {
            return false;
        }
        let now = self.clock.now();
        match self.loadouts.lock().get_mut(id) {
            Some(state) => state.start_reload(now),
            None => false,
        }
    }

    /// Collect a weapon crate. The old weapon's reload is cancelled before
    /// the swap.
    pub fn pickup(&self, id: &str, crate_id: CrateId) -> bool {
        let Some(player) = self.world.get_player(id) else {
            return false;
        };
        if !physics::can_pick_up(&player, &self.crates, crate_id) {
            return false;
        }
        let now = self.clock.now();
        if !self.crates.pickup(crate_id, now) {
            return false;
        }
        let Some(weapon_type) = self.crates.get(crate_id).map(|c| c.weapon_type) else {
            return false;
        };
        let Some(config) = self.catalog.get(&weapon_type).cloned() else {
            warn!(room = %self.room_id, weapon = %weapon_type, "crate weapon missing from catalog");
            return false;
        };

        {
            let mut loadouts = self.loadouts.lock();
            if let Some(old) = loadouts.get_mut(id) {
                old.cancel_reload();
            }
            loadouts.insert(id.to_string(), WeaponState::new(config));
        }

        self.events.on_weapon_pickup(
            self.room_id,
            id,
            crate_id,
            &weapon_type,
            Duration::from_secs_f64(pickups::WEAPON_RESPAWN),
        );
        true
    }

    // === tick pipeline ===

    /// One simulation step. Runs from the 60 Hz loop; callable directly with
    /// a manual clock in tests.
    pub fn tick(&self) {
        let now = self.clock.now();
        let dt = {
            let mut last = self.last_tick.lock();
            let dt = match *last {
                Some(prev) => now.saturating_sub(prev).as_secs_f64(),
                None => timing::DT,
            };
            *last = Some(now);
            dt
        };

        // 1. Movement, bounds, validation.
        let roll_ends = physics::step(&self.world, &self.validator, now, dt);
        for end in &roll_ends {
            self.events
                .on_roll_end(self.room_id, &end.player_id, end.reason);
        }

        // 2. Queued hitscan shots fire against history recorded up to the
        // previous tick, never against samples taken after the trigger pull.
        while let Ok(shot) = self.shot_rx.try_recv() {
            if let Some(record) =
                combat::execute_hitscan(&self.world, &self.history, &self.pings, now, &shot)
            {
                self.process_hits(vec![record], now);
            }
        }

        // 3. Record this tick's positions for future rewinds.
        for player in self.world.players() {
            if player.is_alive() {
                self.history.record(player.id(), player.position(), now);
            }
        }

        // 4. Projectiles advance, then collide.
        self.projectiles.update(dt, now);
        let records = combat::projectile_collisions(&self.world, &self.projectiles, now);
        self.process_hits(records, now);

        // 5. Reload completions, one event per transition.
        let completed: Vec<PlayerId> = {
            let mut loadouts = self.loadouts.lock();
            loadouts
                .iter_mut()
                .filter_map(|(id, state)| state.check_reload_complete(now).then(|| id.clone()))
                .collect()
        };
        for id in completed {
            self.events.on_reload_complete(self.room_id, &id);
        }

        // 6. Respawns reset position, health and weapon.
        for player in self.world.players() {
            if player.can_respawn(now) {
                let spawn = {
                    let mut rng = self.rng.lock();
                    self.world
                        .balanced_spawn_point(Some(player.id().as_str()), &mut *rng)
                };
                player.respawn(spawn, now);
                self.loadouts.lock().insert(
                    player.id().clone(),
                    WeaponState::new(self.catalog.default_weapon().clone()),
                );
                self.events.on_respawn(self.room_id, player.id(), spawn);
            }
        }

        // 7. Timed status effects.
        for player in self.world.players() {
            player.update_invulnerability(now);
            if player.can_regenerate(now) {
                player.apply_regeneration(dt);
            }
        }

        // 8. Crate respawns.
        for crate_id in self.crates.update_respawns(now) {
            if let Some(weapon_crate) = self.crates.get(crate_id) {
                self.events.on_weapon_respawn(self.room_id, &weapon_crate);
            }
        }

        // 9. Match clock and win conditions.
        self.update_match(now);
    }

    /// Apply hit consequences: events, death, kill credit.
    fn process_hits(&self, records: Vec<HitRecord>, now: Duration) {
        for record in records {
            self.events.on_hit(
                self.room_id,
                &HitEvent {
                    projectile_id: record.projectile_id,
                    attacker_id: record.attacker_id.clone(),
                    victim_id: record.victim_id.clone(),
                    damage: record.damage,
                },
            );

            if record.remaining_health > 0 {
                continue;
            }
            let Some(victim) = self.world.get_player(&record.victim_id) else {
                continue;
            };
            if victim.death_time().is_some() {
                continue;
            }
            victim.mark_dead(now);
            victim.increment_deaths();
            if let Some(attacker) = self.world.get_player(&record.attacker_id) {
                attacker.increment_kills();
                attacker.add_xp(health::KILL_XP);
            }
            self.match_state.add_kill(&record.attacker_id);
            info!(
                room = %self.room_id,
                attacker = %record.attacker_id,
                victim = %record.victim_id,
                "kill"
            );
        }
    }

    fn update_match(&self, now: Duration) {
        if self.match_state.phase() != MatchPhase::Active {
            return;
        }

        if let Some(remaining) = self.match_state.remaining(now) {
            let seconds = remaining.as_secs();
            let mut last = self.last_timer_seconds.lock();
            if *last != Some(seconds) {
                *last = Some(seconds);
                self.events.on_match_timer(self.room_id, seconds);
            }
        }

        let reason = if self.match_state.check_kill_target() {
            Some(MatchEndReason::KillTarget)
        } else if self.match_state.check_time_limit(now) {
            Some(MatchEndReason::TimeLimit)
        } else {
            None
        };

        if let Some(reason) = reason {
            if self.match_state.end_match(reason) {
                let winners = self.match_state.determine_winners();
                let scores = self.match_state.final_scores(&self.world);
                info!(room = %self.room_id, ?reason, ?winners, "match ended");
                self.events
                    .on_match_end(self.room_id, reason, &winners, &scores);
            }
        }
    }

    // === broadcast ===

    /// Snapshot every player under their own lock.
    pub fn snapshot_players(&self) -> Vec<PlayerSnapshot> {
        let players = self.world.players();
        let loadouts = self.loadouts.lock();
        players
            .iter()
            .map(|p| PlayerSnapshot::from_player(p, loadouts.get(p.id())))
            .collect()
    }

    /// One broadcast step; skipped entirely for an empty room.
    pub fn broadcast_once(&self) {
        let snapshots = self.snapshot_players();
        if !snapshots.is_empty() {
            self.events.broadcast(self.room_id, &snapshots);
        }
    }
}

/// Handles for a room's two scheduled loops.
pub struct SimulationLoop {
    shutdown: watch::Sender<bool>,
    tick_handle: JoinHandle<()>,
    broadcast_handle: JoinHandle<()>,
}

impl SimulationLoop {
    /// Spawn the 60 Hz tick task and the 20 Hz broadcast task for a room.
    pub fn start(core: Arc<RoomCore>) -> Self {
        let (shutdown, mut tick_rx) = watch::channel(false);
        let mut broadcast_rx = shutdown.subscribe();

        let tick_core = core.clone();
        let tick_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs_f64(timing::DT));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => tick_core.tick(),
                    _ = tick_rx.changed() => break,
                }
            }
            debug!(room = %tick_core.room_id(), "tick loop stopped");
        });

        let broadcast_core = core;
        let broadcast_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(
                timing::BROADCAST_DURATION_MS,
            ));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => broadcast_core.broadcast_once(),
                    _ = broadcast_rx.changed() => break,
                }
            }
            debug!(room = %broadcast_core.room_id(), "broadcast loop stopped");
        });

        Self {
            shutdown,
            tick_handle,
            broadcast_handle,
        }
    }

    /// Signal both loops and wait for them to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.tick_handle.await;
        let _ = self.broadcast_handle.await;
    }

    /// Signal both loops without waiting.
    pub fn signal_stop(&self) {
        let _ = self.shutdown.send(true);
    }
}
