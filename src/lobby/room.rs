//! One game room: an owned simulation core plus its scheduled loops.

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::game::match_state::MatchPhase;
use crate::game::simulation::{RoomCore, SimulationLoop};

/// A room couples a `RoomCore` with the two loops driving it. Rooms share
/// nothing with each other; a slow tick in one cannot stall another.
pub struct GameRoom {
    core: Arc<RoomCore>,
    sim: Option<SimulationLoop>,
}

impl GameRoom {
    pub fn new(core: Arc<RoomCore>) -> Self {
        Self { core, sim: None }
    }

    pub fn id(&self) -> Uuid {
        self.core.room_id()
    }

    pub fn core(&self) -> &Arc<RoomCore> {
        &self.core
    }

    pub fn player_count(&self) -> usize {
        self.core.world().player_count()
    }

    pub fn is_empty(&self) -> bool {
        self.core.world().is_empty()
    }

    pub fn phase(&self) -> MatchPhase {
        self.core.match_state().phase()
    }

    /// Start the match and both loops. Must run inside a tokio runtime.
    pub fn start(&mut self, now: Duration) {
        if self.sim.is_some() {
            return;
        }
        self.core.match_state().start(now);
        self.sim = Some(SimulationLoop::start(self.core.clone()));
    }

    pub fn is_running(&self) -> bool {
        self.sim.is_some()
    }

    /// Ask both loops to stop without waiting for them.
    pub fn signal_stop(&self) {
        if let Some(sim) = &self.sim {
            sim.signal_stop();
        }
    }

    /// Stop both loops and wait until they have exited.
    pub async fn stop(&mut self) {
        if let Some(sim) = self.sim.take() {
            sim.stop().await;
        }
    }

    /// Detach the loop handles for a fire-and-forget shutdown.
    pub(crate) fn take_sim(&mut self) -> Option<SimulationLoop> {
        self.sim.take()
    }
}
