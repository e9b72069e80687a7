//! Per-player position history for lag-compensated hit detection.

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::game::constants::timing;
use crate::game::player::PlayerId;
use crate::util::vec2::Vec2;

/// One recorded position sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSnapshot {
    pub position: Vec2,
    pub timestamp: Duration,
}

/// Bounded ring of samples, oldest first.
#[derive(Debug, Default)]
struct Ring {
    samples: VecDeque<PositionSnapshot>,
}

impl Ring {
    fn record(&mut self, snapshot: PositionSnapshot) {
        if self.samples.len() == timing::POSITION_HISTORY_LEN {
            self.samples.pop_front();
        }
        self.samples.push_back(snapshot);
    }

    fn query(&self, t: Duration) -> Option<Vec2> {
        let oldest = self.samples.front()?;
        let newest = self.samples.back()?;
        if t < oldest.timestamp || t > newest.timestamp {
            return None;
        }

        // Find the bracketing pair and interpolate. Samples are recorded
        // once per tick so this walk is at most 60 entries.
        let mut prev = *oldest;
        for sample in self.samples.iter() {
            if sample.timestamp == t {
                return Some(sample.position);
            }
            if sample.timestamp > t {
                let span = (sample.timestamp - prev.timestamp).as_secs_f64();
                if span <= 0.0 {
                    return Some(sample.position);
                }
                let frac = (t - prev.timestamp).as_secs_f64() / span;
                return Some(prev.position.lerp(sample.position, frac));
            }
            prev = *sample;
        }
        Some(newest.position)
    }
}

/// History of recent positions for every player in a room.
///
/// Lock order: the outer map lock is taken first to fetch the ring handle,
/// released, and only then is the ring's own lock taken.
pub struct PositionHistory {
    rings: RwLock<HashMap<PlayerId, Arc<Mutex<Ring>>>>,
}

impl PositionHistory {
    pub fn new() -> Self {
        Self {
            rings: RwLock::new(HashMap::new()),
        }
    }

    fn ring(&self, player_id: &str) -> Option<Arc<Mutex<Ring>>> {
        self.rings.read().get(player_id).cloned()
    }

    fn ring_or_insert(&self, player_id: &str) -> Arc<Mutex<Ring>> {
        if let Some(ring) = self.ring(player_id) {
            return ring;
        }
        self.rings
            .write()
            .entry(player_id.to_string())
            .or_default()
            .clone()
    }

    /// Record a player's position at `timestamp`.
    pub fn record(&self, player_id: &str, position: Vec2, timestamp: Duration) {
        let ring = self.ring_or_insert(player_id);
        ring.lock().record(PositionSnapshot {
            position,
            timestamp,
        });
    }

    /// Sample a player's position at time `t`. Exact timestamps return the
    /// recorded sample; times between samples interpolate linearly; times
    /// outside the retained window return `None`.
    pub fn query(&self, player_id: &str, t: Duration) -> Option<Vec2> {
        let ring = self.ring(player_id)?;
        let guard = ring.lock();
        guard.query(t)
    }

    /// Drop all history for a departed player.
    pub fn remove_player(&self, player_id: &str) {
        self.rings.write().remove(player_id);
    }

    pub fn sample_count(&self, player_id: &str) -> usize {
        self.ring(player_id)
            .map(|ring| ring.lock().samples.len())
            .unwrap_or(0)
    }
}

impl Default for PositionHistory {
    fn default() -> Self {
        Self::new()
    }
}
