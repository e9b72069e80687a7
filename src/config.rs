use std::net::IpAddr;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the connection layer binds to
    pub bind_address: IpAddr,
    /// Port the connection layer listens on
    pub port: u16,
    /// Maximum number of concurrent game rooms
    pub max_rooms: usize,
    /// Path to the weapon definition file
    pub weapons_path: PathBuf,
    /// Fixed RNG seed; random when unset
    pub rng_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".parse().unwrap(),
            port: 8080,
            max_rooms: 100,
            weapons_path: PathBuf::from("config/weapons.json"),
            rng_seed: None,
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("BIND_ADDRESS") {
            if let Ok(parsed) = addr.parse() {
                config.bind_address = parsed;
            }
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(parsed) = port.parse() {
                config.port = parsed;
            }
        }

        if let Ok(max_rooms) = std::env::var("MAX_ROOMS") {
            if let Ok(parsed) = max_rooms.parse() {
                config.max_rooms = parsed;
            }
        }

        if let Ok(path) = std::env::var("WEAPONS_PATH") {
            config.weapons_path = PathBuf::from(path);
        }

        if let Ok(seed) = std::env::var("RNG_SEED") {
            if let Ok(parsed) = seed.parse() {
                config.rng_seed = Some(parsed);
            }
        }

        config
    }
}
