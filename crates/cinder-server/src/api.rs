// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router construction.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use cinder_server_config::{SecretPolicyConfig, ServerConfig};
use cinder_server_jobs::JobScheduler;
use cinder_server_secrets::{DurationTable, PolicyConfig, SecretManager, SecretStore};

use crate::error::ServerError;
use crate::routes;

/// Room for base64 expansion of the ciphertext plus the JSON around it.
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
	pub manager: Arc<SecretManager>,
	pub job_scheduler: Option<Arc<JobScheduler>>,
}

/// Creates the application state. The scheduler is attached separately once
/// its jobs are registered.
pub fn create_app_state(
	store: Arc<dyn SecretStore>,
	config: &ServerConfig,
) -> Result<AppState, ServerError> {
	let policy = policy_from_config(&config.policy)?;
	Ok(AppState {
		manager: Arc::new(SecretManager::new(store, policy)),
		job_scheduler: None,
	})
}

pub fn policy_from_config(config: &SecretPolicyConfig) -> Result<PolicyConfig, ServerError> {
	let durations = DurationTable::parse(&config.durations).map_err(ServerError::Policy)?;
	Ok(PolicyConfig {
		max_secret_bytes: config.max_secret_bytes,
		durations,
		require_burn: config.require_burn,
		require_password: config.require_password,
		deny_slow_burn: config.deny_slow_burn,
		max_slow_burn_reads: config.max_slow_burn_reads,
		slow_burn_window: config.slow_burn_window(),
	})
}

pub fn create_router(state: AppState) -> Router {
	let max_secret_bytes = usize::try_from(state.manager.policy().max_secret_bytes).unwrap_or(usize::MAX);
	let body_limit = max_secret_bytes
		.saturating_mul(4)
		.saturating_div(3)
		.saturating_add(BODY_OVERHEAD_BYTES);

	Router::new()
		.route("/health", get(routes::health::health_check))
		.route("/secret", post(routes::secrets::create_secret))
		.route(
			"/secret/{id}",
			get(routes::secrets::get_secret_metadata)
				.post(routes::secrets::read_secret)
				.delete(routes::secrets::delete_secret),
		)
		.route("/api/openapi.json", get(routes::docs::openapi_json))
		.layer(DefaultBodyLimit::max(body_limit))
		.with_state(state)
}
