mod config;
mod kalah;
mod network;
mod search;
mod session;

use anyhow::Context;
use log::info;

use config::PlayerConfig;
use network::BroadcastHub;
use search::{RotatingEvaluator, Strategy};
use session::SessionController;

fn main() -> anyhow::Result<()> {
    let config = PlayerConfig::parse();

    env_logger::Builder::new()
        .target(env_logger::Target::Stdout)
        .filter_level(config.log_level())
        .parse_default_env()
        .init();

    let engine = config.strategy.create(config.depth);
    info!(
        "Using strategy '{}' (depth {}) ...",
        engine.name(),
        Strategy::effective_depth(config.depth)
    );

    let mut controller = SessionController::new(
        config.session(),
        config.opening_position(),
        engine,
        Box::new(RotatingEvaluator::default()),
    );

    let mut hub = BroadcastHub::listen(config.listen_port)?;
    info!("Listening for peers on port {}", hub.local_port());

    // before dialing, so the remote side gets our opening move as catch-up
    if config.start {
        controller.open(config.opening_position(), &mut hub);
    }

    if let Some((host, port)) = &config.remote {
        hub.dial(host, *port)?;
    }

    hub.run(&mut controller).context("Session ended with an error")?;

    info!("Bye");

    Ok(())
}
