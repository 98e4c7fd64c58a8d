// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cinder secret sharing server binary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cinder_server::jobs::SecretSweepJob;
use cinder_server::{create_app_state, create_router, open_store};
use cinder_server_config::LogFormat;
use cinder_server_jobs::{JobScheduler, RunHistory, TriggerSource};
use clap::{Parser, Subcommand};
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Cinder server - burn-after-read secret sharing.
#[derive(Parser, Debug)]
#[command(name = "cinder-server", about = "Burn-after-read secret sharing server", version)]
struct Args {
	/// TOML config file; defaults to /etc/cinder/server.toml when present
	#[arg(long, env = "CINDER_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("cinder-server version: {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => cinder_server_config::load_config_with_file(path)?,
		None => cinder_server_config::load_config()?,
	};

	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| config.logging.level.clone().into());
	match config.logging.format {
		LogFormat::Json => tracing_subscriber::registry()
			.with(filter)
			.with(tracing_subscriber::fmt::layer().json())
			.init(),
		LogFormat::Text => tracing_subscriber::registry()
			.with(filter)
			.with(tracing_subscriber::fmt::layer())
			.init(),
	}

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		backend = %config.storage.backend,
		"starting cinder-server"
	);

	let store = open_store(&config.storage).await?;
	let mut state = create_app_state(store, &config)?;

	let mut scheduler = JobScheduler::new(Arc::new(RunHistory::default()));
	if config.jobs.sweep_enabled {
		scheduler.register_periodic(
			Arc::new(SecretSweepJob::new(Arc::clone(&state.manager))),
			Duration::from_secs(config.jobs.sweep_interval_secs),
		);
		tracing::info!(
			interval_secs = config.jobs.sweep_interval_secs,
			"Registered secret sweep background job"
		);
	}

	let scheduler = Arc::new(scheduler);
	state.job_scheduler = Some(Arc::clone(&scheduler));

	scheduler.start().await;

	// Clear out whatever expired while the server was down.
	if config.jobs.sweep_enabled {
		let scheduler = Arc::clone(&scheduler);
		tokio::spawn(async move {
			if let Err(e) = scheduler
				.trigger_job(cinder_server::jobs::SECRET_SWEEP_JOB_ID, TriggerSource::Manual)
				.await
			{
				tracing::warn!(error = %e, "startup sweep failed");
			}
		});
	}

	let app = create_router(state)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		);

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr).await?;

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
			scheduler.shutdown().await;
		}
	}

	tracing::info!("Server shutdown complete");
	Ok(())
}
