//! Room manager: pairs waiting players into rooms, routes intents to the
//! right room, and frames simulation events as wire messages.

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::game::constants::rules;
use crate::game::events::{EventSink, HitEvent};
use crate::game::match_state::{MatchConfig, MatchEndReason, PlayerScore};
use crate::game::pickups::WeaponCrate;
use crate::game::player::{InputState, PlayerId, RollEndReason};
use crate::game::simulation::{IntentRejection, MeleeResult, RoomCore, ShootResult};
use crate::game::weapons::WeaponCatalog;
use crate::lobby::room::GameRoom;
use crate::net::protocol::{encode, PlayerSnapshot, ServerMessage};
use crate::util::clock::Clock;
use crate::util::vec2::Vec2;

/// Outbound byte queue for one connection. The writer worker drains it.
pub type OutboundSender = mpsc::Sender<Vec<u8>>;

/// Suggested outbound queue depth per connection.
pub const OUTBOUND_QUEUE_DEPTH: usize = 64;

/// A connected player as seen by the room manager.
#[derive(Clone)]
pub struct PlayerConnection {
    pub id: PlayerId,
    pub sender: OutboundSender,
}

/// Per-room event sink that frames events as JSON messages and pushes them
/// into connection queues. Sends never block: a full or closed queue drops
/// the message and the client re-syncs from the next snapshot.
struct WireSink {
    connections: RwLock<HashMap<PlayerId, OutboundSender>>,
}

impl WireSink {
    fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    fn add_connection(&self, conn: PlayerConnection) {
        self.connections.write().insert(conn.id.clone(), conn.sender);
    }

    fn remove_connection(&self, player_id: &str) {
        self.connections.write().remove(player_id);
    }

    fn send_bytes(sender: &OutboundSender, player_id: &str, bytes: Vec<u8>) -> bool {
        match sender.try_send(bytes) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(player = %player_id, "outbound queue full; message dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(player = %player_id, "outbound queue closed; message dropped");
                false
            }
        }
    }

    fn send_to(&self, player_id: &str, message: &ServerMessage) -> bool {
        let Some(sender) = self.connections.read().get(player_id).cloned() else {
            return false;
        };
        match encode(message) {
            Ok(bytes) => Self::send_bytes(&sender, player_id, bytes),
            Err(e) => {
                warn!(player = %player_id, "failed to encode message: {e}");
                false
            }
        }
    }

    fn broadcast_message(&self, message: &ServerMessage) {
        let bytes = match encode(message) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to encode broadcast: {e}");
                return;
            }
        };
        let connections = self.connections.read();
        for (player_id, sender) in connections.iter() {
            Self::send_bytes(sender, player_id, bytes.clone());
        }
    }
}

impl EventSink for WireSink {
    fn broadcast(&self, _room_id: Uuid, snapshots: &[PlayerSnapshot]) {
        self.broadcast_message(&ServerMessage::Snapshot {
            players: snapshots.to_vec(),
        });
    }

    fn on_hit(&self, _room_id: Uuid, event: &HitEvent) {
        self.broadcast_message(&ServerMessage::Hit(event.clone()));
    }

    fn on_reload_complete(&self, _room_id: Uuid, player_id: &str) {
        self.send_to(
            player_id,
            &ServerMessage::ReloadComplete {
                player_id: player_id.to_string(),
            },
        );
    }

    fn on_respawn(&self, _room_id: Uuid, player_id: &str, position: Vec2) {
        self.broadcast_message(&ServerMessage::Respawn {
            player_id: player_id.to_string(),
            position,
        });
    }

    fn on_roll_end(&self, _room_id: Uuid, player_id: &str, reason: RollEndReason) {
        self.broadcast_message(&ServerMessage::RollEnd {
            player_id: player_id.to_string(),
            reason,
        });
    }

    fn on_weapon_pickup(
        &self,
        _room_id: Uuid,
        player_id: &str,
        crate_id: u32,
        weapon_type: &str,
        respawn_in: Duration,
    ) {
        self.broadcast_message(&ServerMessage::WeaponPickup {
            player_id: player_id.to_string(),
            crate_id,
            weapon_type: weapon_type.to_string(),
            respawn_secs: respawn_in.as_secs_f64(),
        });
    }

    fn on_weapon_respawn(&self, _room_id: Uuid, weapon_crate: &WeaponCrate) {
        self.broadcast_message(&ServerMessage::WeaponRespawn {
            weapon_crate: weapon_crate.clone(),
        });
    }

    fn on_match_timer(&self, _room_id: Uuid, remaining_seconds: u64) {
        self.broadcast_message(&ServerMessage::MatchTimer { remaining_seconds });
    }

    fn on_match_end(
        &self,
        _room_id: Uuid,
        reason: MatchEndReason,
        winners: &[PlayerId],
        scores: &[PlayerScore],
    ) {
        self.broadcast_message(&ServerMessage::MatchEnded {
            reason,
            winners: winners.to_vec(),
            scores: scores.to_vec(),
        });
    }
}

struct RoomEntry {
    room: GameRoom,
    sink: Arc<WireSink>,
}

struct ManagerInner {
    rooms: HashMap<Uuid, RoomEntry>,
    player_rooms: HashMap<PlayerId, Uuid>,
    waiting: Vec<PlayerConnection>,
    rooms_created: u64,
}

/// Groups players into rooms and dispatches intents and sends.
pub struct RoomManager {
    clock: Arc<dyn Clock>,
    catalog: Arc<WeaponCatalog>,
    match_config: MatchConfig,
    rng_seed: u64,
    inner: Mutex<ManagerInner>,
}

impl RoomManager {
    pub fn new(
        clock: Arc<dyn Clock>,
        catalog: Arc<WeaponCatalog>,
        match_config: MatchConfig,
        rng_seed: u64,
    ) -> Self {
        Self {
            clock,
            catalog,
            match_config,
            rng_seed,
            inner: Mutex::new(ManagerInner {
                rooms: HashMap::new(),
                player_rooms: HashMap::new(),
                waiting: Vec::new(),
                rooms_created: 0,
            }),
        }
    }

    pub fn room_count(&self) -> usize {
        self.inner.lock().rooms.len()
    }

    pub fn waiting_count(&self) -> usize {
        self.inner.lock().waiting.len()
    }

    /// The room a player currently plays in.
    pub fn player_room(&self, player_id: &str) -> Option<Uuid> {
        self.inner.lock().player_rooms.get(player_id).copied()
    }

    fn room_core(&self, player_id: &str) -> Option<Arc<RoomCore>> {
        let inner = self.inner.lock();
        let room_id = inner.player_rooms.get(player_id)?;
        inner
            .rooms
            .get(room_id)
            .map(|entry| entry.room.core().clone())
    }

    /// Queue a player for matching. When enough players wait, a room forms,
    /// both are moved in, `room_joined` goes out and the match starts.
    /// Must run inside a tokio runtime (room loops are spawned here).
    pub fn add_player(&self, conn: PlayerConnection) {
        let mut inner = self.inner.lock();
        if inner.player_rooms.contains_key(&conn.id)
            || inner.waiting.iter().any(|c| c.id == conn.id)
        {
            warn!(player = %conn.id, "duplicate join ignored");
            return;
        }
        info!(player = %conn.id, "queued for matching");
        inner.waiting.push(conn);

        if inner.waiting.len() >= rules::ROOM_START_PLAYERS {
            let members: Vec<PlayerConnection> =
                inner.waiting.drain(..rules::ROOM_START_PLAYERS).collect();
            self.create_room(&mut inner, members);
        }
    }

    fn create_room(&self, inner: &mut ManagerInner, members: Vec<PlayerConnection>) {
        let room_id = Uuid::new_v4();
        let sink = Arc::new(WireSink::new());
        inner.rooms_created += 1;
        let seed = self.rng_seed.wrapping_add(inner.rooms_created);

        let events: Arc<dyn EventSink> = sink.clone();
        let core = Arc::new(RoomCore::new(
            room_id,
            self.clock.clone(),
            self.catalog.clone(),
            events,
            self.match_config,
            seed,
        ));

        for member in &members {
            sink.add_connection(member.clone());
            core.add_player(member.id.clone());
            inner.player_rooms.insert(member.id.clone(), room_id);
        }

        // Joined + match-start notifications go out before the loops start
        // broadcasting snapshots.
        let players = core.snapshot_players();
        let crates = core.crates().all();
        for member in &members {
            sink.send_to(
                &member.id,
                &ServerMessage::RoomJoined {
                    room_id,
                    player_id: member.id.clone(),
                    players: players.clone(),
                    crates: crates.clone(),
                },
            );
        }
        let config = core.match_state().config();
        sink.broadcast_message(&ServerMessage::MatchStarted {
            kill_target: config.kill_target,
            time_limit_secs: config.time_limit.as_secs(),
        });

        let mut room = GameRoom::new(core);
        room.start(self.clock.now());
        info!(room = %room_id, players = members.len(), "room created, match started");

        inner.rooms.insert(room_id, RoomEntry { room, sink });
    }

    /// Remove a player from the waiting list or their room. Empty rooms are
    /// destroyed and their loops shut down.
    pub fn remove_player(&self, player_id: &str) {
        let mut inner = self.inner.lock();

        if let Some(idx) = inner.waiting.iter().position(|c| c.id == player_id) {
            inner.waiting.remove(idx);
            info!(player = %player_id, "left while waiting");
            return;
        }

        let Some(room_id) = inner.player_rooms.remove(player_id) else {
            return;
        };
        let Some(entry) = inner.rooms.get_mut(&room_id) else {
            return;
        };

        entry.room.core().remove_player(player_id);
        entry.sink.remove_connection(player_id);
        entry.sink.broadcast_message(&ServerMessage::PlayerLeft {
            player_id: player_id.to_string(),
        });

        if entry.room.is_empty() {
            let mut entry = inner.rooms.remove(&room_id).expect("entry exists");
            info!(room = %room_id, "room empty, shutting down");
            entry.room.signal_stop();
            if let Some(sim) = entry.room.take_sim() {
                tokio::spawn(async move { sim.stop().await });
            }
        }
    }

    /// Targeted send: the player's room connection first, then the waiting
    /// list. Never blocks.
    pub fn send_to_player(&self, player_id: &str, bytes: Vec<u8>) -> bool {
        let inner = self.inner.lock();
        if let Some(room_id) = inner.player_rooms.get(player_id) {
            if let Some(entry) = inner.rooms.get(room_id) {
                if let Some(sender) = entry.sink.connections.read().get(player_id).cloned() {
                    return WireSink::send_bytes(&sender, player_id, bytes);
                }
            }
        }
        if let Some(conn) = inner.waiting.iter().find(|c| c.id == player_id) {
            return WireSink::send_bytes(&conn.sender, player_id, bytes);
        }
        false
    }

    // === intent dispatch ===
    //
    // One malformed input must not take down a room: every handler runs
    // under a panic guard and falls back to a rejection.

    fn guarded<T>(&self, player_id: &str, fallback: T, f: impl FnOnce() -> T) -> T {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => value,
            Err(_) => {
                error!(player = %player_id, "intent handler panicked; input discarded");
                fallback
            }
        }
    }

    pub fn update_player_input(&self, player_id: &str, input: InputState, sequence: u64) -> bool {
        let Some(core) = self.room_core(player_id) else {
            return false;
        };
        self.guarded(player_id, false, || {
            core.update_player_input(player_id, input, sequence)
        })
    }

    pub fn player_shoot(
        &self,
        player_id: &str,
        aim_angle: f64,
        client_timestamp_ms: u64,
    ) -> ShootResult {
        let Some(core) = self.room_core(player_id) else {
            return ShootResult {
                success: false,
                reason: Some(IntentRejection::NoPlayer),
                projectiles: Vec::new(),
            };
        };
        self.guarded(
            player_id,
            ShootResult {
                success: false,
                reason: Some(IntentRejection::NoPlayer),
                projectiles: Vec::new(),
            },
            || core.player_shoot(player_id, aim_angle, client_timestamp_ms),
        )
    }

    pub fn player_melee(&self, player_id: &str, aim_angle: f64) -> MeleeResult {
        let Some(core) = self.room_core(player_id) else {
            return MeleeResult {
                success: false,
                reason: Some(IntentRejection::NoPlayer),
                hit_players: Vec::new(),
                knockback_applied: false,
            };
        };
        self.guarded(
            player_id,
            MeleeResult {
                success: false,
                reason: Some(IntentRejection::NoPlayer),
                hit_players: Vec::new(),
                knockback_applied: false,
            },
            || core.player_melee(player_id, aim_angle),
        )
    }

    pub fn player_reload(&self, player_id: &str) -> bool {
        let Some(core) = self.room_core(player_id) else {
            return false;
        };
        self.guarded(player_id, false, || core.player_reload(player_id))
    }

    pub fn pickup(&self, player_id: &str, crate_id: u32) -> bool {
        let Some(core) = self.room_core(player_id) else {
            return false;
        };
        self.guarded(player_id, false, || core.pickup(player_id, crate_id))
    }

    pub fn ping_rtt(&self, player_id: &str, rtt: Duration) {
        if let Some(core) = self.room_core(player_id) {
            core.ping_rtt(player_id, rtt);
        }
    }

    /// Stop every room and wait for their loops.
    pub async fn shutdown_all(&self) {
        let entries: Vec<RoomEntry> = {
            let mut inner = self.inner.lock();
            inner.player_rooms.clear();
            inner.waiting.clear();
            inner.rooms.drain().map(|(_, entry)| entry).collect()
        };
        for mut entry in entries {
            entry.room.stop().await;
        }
        info!("all rooms stopped");
    }
}
