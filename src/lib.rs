//! Rumble Arena Server Library
//!
//! Authoritative realtime simulation core for a 2D top-down multiplayer
//! arena shooter: fixed-rate physics and combat, lag-compensated hit
//! detection, movement anti-cheat, and per-room match lifecycle. The
//! connection layer feeds intents in and receives snapshots and events out;
//! no socket handling lives in this crate.

pub mod anticheat;
pub mod config;
pub mod game;
pub mod lobby;
pub mod net;
pub mod util;
