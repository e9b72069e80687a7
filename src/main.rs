use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rumble_arena_server::config::ServerConfig;
use rumble_arena_server::game::match_state::MatchConfig;
use rumble_arena_server::game::weapons::WeaponCatalog;
use rumble_arena_server::lobby::manager::RoomManager;
use rumble_arena_server::util::clock::SystemClock;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Rumble Arena Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ServerConfig::load_or_default();
    info!(
        "Configuration loaded: {}:{}, max_rooms={}",
        config.bind_address, config.port, config.max_rooms
    );

    let catalog = Arc::new(WeaponCatalog::load_or_default(&config.weapons_path));
    let match_config = MatchConfig::from_env();
    info!(
        "Match rules: kill_target={}, time_limit={}s",
        match_config.kill_target,
        match_config.time_limit.as_secs()
    );

    let seed = config.rng_seed.unwrap_or_else(rand::random);
    let clock = Arc::new(SystemClock::new());
    let manager = Arc::new(RoomManager::new(clock, catalog, match_config, seed));

    // The connection layer (WebSocket acceptor, reader/writer workers) hangs
    // player connections onto the manager; the simulation core is ready as
    // soon as the manager exists.
    info!(
        "Simulation core ready on {}:{}; waiting for the connection layer",
        config.bind_address, config.port
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    manager.shutdown_all().await;
    info!("Server stopped");

    Ok(())
}
