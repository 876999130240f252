// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Quarry crash reporting server binary.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quarry_server::{config, create_app_state, create_router, db};

/// Quarry server - crash report grouping and symbolication task queue.
#[derive(Parser, Debug)]
#[command(name = "quarry-server", about = "Quarry crash reporting server", version)]
struct Args {
	/// Path to a TOML configuration file.
	#[arg(long, env = "QUARRY_SERVER_CONFIG")]
	config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// Parse CLI arguments
	let args = Args::parse();

	// Load .env file if present
	dotenvy::dotenv().ok();

	// Load configuration
	let config = config::load_config(args.config.as_deref())?;

	// Setup tracing
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	tracing::info!(
			host = %config.http.host,
			port = config.http.port,
			database = %config.database.url,
			auth = config.auth.is_some(),
			"starting quarry-server"
	);

	// Create database pool and run migrations
	let pool = db::create_pool(&config.database.url).await?;
	db::run_migrations(&pool).await?;

	let state = create_app_state(pool);
	let router = create_router(state, config.auth.clone());

	let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
	tracing::info!(addr = %listener.local_addr()?, "listening");

	axum::serve(listener, router).await?;

	Ok(())
}
