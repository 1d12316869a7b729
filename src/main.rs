//! `igdb-relay` binary: loads configuration, then serves until Ctrl-C.

// crates.io
use color_eyre::Result;
// self
use igdb_relay::{config::RelayConfig, obs, server::RelayServer};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	obs::init_tracing();

	let config = RelayConfig::from_env()?;
	let server = RelayServer::new(config)?;

	server.run().await?;

	Ok(())
}
