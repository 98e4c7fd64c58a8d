// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health HTTP handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use cinder_server_api::{aggregate_status, HealthResponse, HealthStatus};

use crate::{api::AppState, health};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Server is healthy or degraded", body = HealthResponse),
        (status = 503, description = "Server is unhealthy", body = HealthResponse)
    ),
    tag = "health"
)]
/// GET /health - Storage reachability and background job status.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let (storage, (jobs_status, jobs)) = tokio::join!(
		health::check_storage(state.manager.store()),
		health::check_jobs(state.job_scheduler.as_ref()),
	);

	let status = aggregate_status([storage.status, jobs_status]);
	let response = HealthResponse {
		status,
		timestamp: chrono::Utc::now(),
		version: env!("CARGO_PKG_VERSION").to_string(),
		storage,
		jobs,
	};

	let http_status = match status {
		HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
		HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
	};

	(http_status, Json(response))
}
