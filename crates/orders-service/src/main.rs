//! Main entry point for the orders service.
//!
//! Loads configuration, opens the configured order store, seeds it when
//! empty and serves the orders HTTP API until interrupted. The store is
//! closed on the way out whether or not the server stopped cleanly.

use clap::Parser;
use orders_config::Config;
use orders_types::initial_orders;
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod factory_registry;
mod server;


/// Command-line arguments for the orders service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started orders service");

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let storage = Arc::new(factory_registry::build_storage(&config.storage).await?);

	if config.storage.seed_initial_data {
		storage.seed_if_empty(initial_orders()).await?;
	}

	let api_config = config.api_or_default();
	let result = if api_config.enabled {
		server::start_server(api_config, Arc::clone(&storage), shutdown_signal()).await
	} else {
		tracing::info!("API server disabled, nothing to serve");
		Ok(())
	};

	if let Err(e) = storage.close().await {
		tracing::error!("Failed to close storage: {}", e);
	}

	tracing::info!("Stopped orders service");
	result
}

/// Resolves once Ctrl-C is received.
async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!("Failed to listen for shutdown signal: {}", e);
		// Without a signal handler, run until the process is killed
		std::future::pending::<()>().await;
	}
	tracing::info!("Shutdown signal received");
}
