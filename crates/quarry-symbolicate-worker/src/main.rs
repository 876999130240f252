// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Quarry symbolication worker binary.
//!
//! Polls the server's todo list, symbolicates each crash with a local
//! external tool, and uploads the results. Runs one cycle per invocation by
//! default (cron-friendly); pass `--interval-secs` to poll continuously.
//! Multiple instances may run against the same server: delivery is
//! at-least-once and submissions are idempotent.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quarry_symbolicate_worker::{Credentials, Runner, TaskQueueClient};

/// Quarry symbolication worker.
#[derive(Parser, Debug)]
#[command(
	name = "quarry-symbolicate-worker",
	about = "Symbolicates crash logs from a Quarry server",
	version
)]
struct Args {
	/// Base URL of the Quarry server, e.g. `https://crashes.example.com`.
	#[arg(long, env = "QUARRY_WORKER_SERVER_URL")]
	server_url: String,

	/// Basic auth username (requires --password).
	#[arg(long, env = "QUARRY_WORKER_USERNAME")]
	username: Option<String>,

	/// Basic auth password (requires --username).
	#[arg(long, env = "QUARRY_WORKER_PASSWORD")]
	password: Option<String>,

	/// Path to the external symbolication tool.
	#[arg(long, env = "QUARRY_WORKER_TOOL", default_value = "symbolicatecrash")]
	tool: PathBuf,

	/// Timeout for each HTTP request, in seconds.
	#[arg(long, env = "QUARRY_WORKER_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
	request_timeout_secs: u64,

	/// Timeout for one tool invocation, in seconds. A stuck tool is killed.
	#[arg(long, env = "QUARRY_WORKER_TOOL_TIMEOUT_SECS", default_value_t = 300)]
	tool_timeout_secs: u64,

	/// Poll continuously at this interval instead of exiting after one cycle.
	#[arg(long, env = "QUARRY_WORKER_INTERVAL_SECS")]
	interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	dotenvy::dotenv().ok();

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "info".into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	let credentials = match (args.username, args.password) {
		(None, None) => None,
		(Some(username), Some(password)) => Some(Credentials { username, password }),
		_ => return Err("basic auth requires both --username and --password".into()),
	};

	let client = TaskQueueClient::new(
		&args.server_url,
		credentials,
		Duration::from_secs(args.request_timeout_secs),
	)?;
	let runner = Runner::new(
		client,
		args.tool,
		Duration::from_secs(args.tool_timeout_secs),
	);

	tracing::info!(
		server_url = %args.server_url,
		interval_secs = args.interval_secs,
		"starting quarry-symbolicate-worker"
	);

	match args.interval_secs {
		None => {
			runner.run_cycle().await?;
		}
		Some(secs) => loop {
			// In watch mode a failed cycle is logged and retried at the next
			// tick; the todo list naturally re-offers unfinished work.
			if let Err(err) = runner.run_cycle().await {
				tracing::error!(error = %err, "cycle failed");
			}

			tokio::select! {
				_ = tokio::time::sleep(Duration::from_secs(secs)) => {}
				_ = tokio::signal::ctrl_c() => {
					tracing::info!("shutting down");
					break;
				}
			}
		},
	}

	Ok(())
}
