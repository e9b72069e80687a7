//! Match lifecycle: kill tracking, win conditions and end-of-match scoring.

use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::constants::rules;
use crate::game::player::PlayerId;
use crate::game::world::World;

/// Match phase progression: waiting -> active -> ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    Waiting,
    Active,
    Ended,
}

/// Why the match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchEndReason {
    KillTarget,
    TimeLimit,
}

/// Win-condition configuration.
#[derive(Debug, Clone, Copy)]
pub struct MatchConfig {
    pub kill_target: u32,
    pub time_limit: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            kill_target: rules::KILL_TARGET,
            time_limit: Duration::from_secs(rules::TIME_LIMIT_SECS),
        }
    }
}

impl MatchConfig {
    /// Shortened config for integration tests.
    pub fn test_mode() -> Self {
        Self {
            kill_target: rules::TEST_KILL_TARGET,
            time_limit: Duration::from_secs(rules::TEST_TIME_LIMIT_SECS),
        }
    }

    /// Honors `TEST_MODE=true` in the environment.
    pub fn from_env() -> Self {
        match std::env::var("TEST_MODE") {
            Ok(v) if v.eq_ignore_ascii_case("true") => Self::test_mode(),
            _ => Self::default(),
        }
    }
}

/// Final per-player score line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerScore {
    pub id: PlayerId,
    pub kills: u32,
    pub deaths: u32,
    pub xp: u64,
}

#[derive(Debug)]
struct MatchInner {
    phase: MatchPhase,
    start_time: Option<Duration>,
    end_reason: Option<MatchEndReason>,
    player_kills: HashMap<PlayerId, u32>,
}

/// One room's match state machine.
pub struct Match {
    config: MatchConfig,
    inner: Mutex<MatchInner>,
}

impl Match {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(MatchInner {
                phase: MatchPhase::Waiting,
                start_time: None,
                end_reason: None,
                player_kills: HashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> MatchConfig {
        self.config
    }

    pub fn phase(&self) -> MatchPhase {
        self.inner.lock().phase
    }

    pub fn start_time(&self) -> Option<Duration> {
        self.inner.lock().start_time
    }

    pub fn end_reason(&self) -> Option<MatchEndReason> {
        self.inner.lock().end_reason
    }

    /// Enter the kill tracker even with zero kills, so final scores and
    /// winner ties cover everyone who played.
    pub fn register_player(&self, id: &str) {
        self.inner
            .lock()
            .player_kills
            .entry(id.to_string())
            .or_insert(0);
    }

    /// Begin the match. Idempotent; only the first call stamps the start.
    pub fn start(&self, now: Duration) {
        let mut inner = self.inner.lock();
        if inner.phase == MatchPhase::Waiting {
            inner.phase = MatchPhase::Active;
            inner.start_time = Some(now);
        }
    }

    pub fn add_kill(&self, attacker_id: &str) {
        let mut inner = self.inner.lock();
        *inner
            .player_kills
            .entry(attacker_id.to_string())
            .or_insert(0) += 1;
    }

    pub fn kills(&self, player_id: &str) -> u32 {
        self.inner
            .lock()
            .player_kills
            .get(player_id)
            .copied()
            .unwrap_or(0)
    }

    /// Any player at or past the kill target.
    pub fn check_kill_target(&self) -> bool {
        let inner = self.inner.lock();
        inner
            .player_kills
            .values()
            .any(|&kills| kills >= self.config.kill_target)
    }

    /// Match has run past its time limit.
    pub fn check_time_limit(&self, now: Duration) -> bool {
        let inner = self.inner.lock();
        match (inner.phase, inner.start_time) {
            (MatchPhase::Active, Some(start)) => now.saturating_sub(start) >= self.config.time_limit,
            _ => false,
        }
    }

    /// Seconds left on the match clock while active.
    pub fn remaining(&self, now: Duration) -> Option<Duration> {
        let inner = self.inner.lock();
        match (inner.phase, inner.start_time) {
            (MatchPhase::Active, Some(start)) => {
                Some(self.config.time_limit.saturating_sub(now.saturating_sub(start)))
            }
            _ => None,
        }
    }

    /// End the match. First call wins; later calls are no-ops. Returns true
    /// when this call performed the transition.
    pub fn end_match(&self, reason: MatchEndReason) -> bool {
        let mut inner = self.inner.lock();
        if inner.phase == MatchPhase::Ended {
            return false;
        }
        inner.phase = MatchPhase::Ended;
        inner.end_reason = Some(reason);
        true
    }

    /// All players tied at the maximum kill count.
    pub fn determine_winners(&self) -> Vec<PlayerId> {
        let inner = self.inner.lock();
        let Some(&max) = inner.player_kills.values().max() else {
            return Vec::new();
        };
        let mut winners: Vec<PlayerId> = inner
            .player_kills
            .iter()
            .filter(|(_, &kills)| kills == max)
            .map(|(id, _)| id.clone())
            .collect();
        winners.sort();
        winners
    }

    /// Score lines for every player registered in the match or present in
    /// the world, zero-kill players included.
    pub fn final_scores(&self, world: &World) -> Vec<PlayerScore> {
        let mut scores: HashMap<PlayerId, PlayerScore> = HashMap::new();
        {
            let inner = self.inner.lock();
            for (id, &kills) in inner.player_kills.iter() {
                scores.insert(
                    id.clone(),
                    PlayerScore {
                        id: id.clone(),
                        kills,
                        deaths: 0,
                        xp: 0,
                    },
                );
            }
        }
        for player in world.players() {
            let entry = scores
                .entry(player.id().clone())
                .or_insert_with(|| PlayerScore {
                    id: player.id().clone(),
                    kills: 0,
                    deaths: 0,
                    xp: 0,
                });
            entry.kills = entry.kills.max(player.kills());
            entry.deaths = player.deaths();
            entry.xp = player.xp();
        }
        let mut out: Vec<PlayerScore> = scores.into_values().collect();
        out.sort_by(|a, b| b.kills.cmp(&a.kills).then_with(|| a.id.cmp(&b.id)));
        out
    }
}
