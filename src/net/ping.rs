//! Per-connection round-trip-time tracking.

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::game::constants::timing;
use crate::game::player::PlayerId;

/// Moving average over the last few RTT measurements of one connection.
pub struct PingTracker {
    samples: Mutex<VecDeque<Duration>>,
}

impl PingTracker {
    pub fn new() -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(timing::PING_SAMPLES)),
        }
    }

    pub fn record(&self, rtt: Duration) {
        let mut samples = self.samples.lock();
        if samples.len() == timing::PING_SAMPLES {
            samples.pop_front();
        }
        samples.push_back(rtt);
    }

    /// Arithmetic mean of the retained samples; zero with no samples yet.
    pub fn get_rtt(&self) -> Duration {
        let samples = self.samples.lock();
        if samples.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = samples.iter().sum();
        total / samples.len() as u32
    }
}

impl Default for PingTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Room-scoped registry of per-connection trackers.
pub struct PingRegistry {
    trackers: RwLock<HashMap<PlayerId, Arc<PingTracker>>>,
}

impl PingRegistry {
    pub fn new() -> Self {
        Self {
            trackers: RwLock::new(HashMap::new()),
        }
    }

    pub fn record(&self, player_id: &str, rtt: Duration) {
        let tracker = {
            let trackers = self.trackers.read();
            trackers.get(player_id).cloned()
        };
        let tracker = match tracker {
            Some(t) => t,
            None => self
                .trackers
                .write()
                .entry(player_id.to_string())
                .or_default()
                .clone(),
        };
        tracker.record(rtt);
    }

    pub fn get_rtt(&self, player_id: &str) -> Duration {
        self.trackers
            .read()
            .get(player_id)
            .map(|t| t.get_rtt())
            .unwrap_or(Duration::ZERO)
    }

    pub fn remove_player(&self, player_id: &str) {
        self.trackers.write().remove(player_id);
    }
}

impl Default for PingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_empty_tracker_reads_zero() {
        let tracker = PingTracker::new();
        assert_eq!(tracker.get_rtt(), Duration::ZERO);
    }

    #[test]
    fn test_mean_of_samples() {
        let tracker = PingTracker::new();
        tracker.record(ms(10));
        tracker.record(ms(20));
        tracker.record(ms(30));
        assert_eq!(tracker.get_rtt(), ms(20));
    }

    #[test]
    fn test_repeated_value_is_identity() {
        let tracker = PingTracker::new();
        for _ in 0..7 {
            tracker.record(ms(42));
        }
        assert_eq!(tracker.get_rtt(), ms(42));
    }

    #[test]
    fn test_window_evicts_oldest() {
        let tracker = PingTracker::new();
        tracker.record(ms(1000));
        for _ in 0..timing::PING_SAMPLES {
            tracker.record(ms(50));
        }
        // The 1000 ms outlier has rolled out of the window.
        assert_eq!(tracker.get_rtt(), ms(50));
    }

    #[test]
    fn test_registry_per_player() {
        let registry = PingRegistry::new();
        registry.record("p1", ms(40));
        registry.record("p2", ms(80));
        assert_eq!(registry.get_rtt("p1"), ms(40));
        assert_eq!(registry.get_rtt("p2"), ms(80));
        assert_eq!(registry.get_rtt("p3"), Duration::ZERO);
    }

    #[test]
    fn test_registry_remove() {
        let registry = PingRegistry::new();
        registry.record("p1", ms(40));
        registry.remove_player("p1");
        assert_eq!(registry.get_rtt("p1"), Duration::ZERO);
    }
}
