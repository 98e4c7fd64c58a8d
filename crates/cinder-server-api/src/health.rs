// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use cinder_server_jobs::{HealthState, JobHealthStatus};
use serde::Serialize;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Health status for components and overall system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
	Healthy,
	Degraded,
	Unhealthy,
}

impl From<HealthState> for HealthStatus {
	fn from(state: HealthState) -> Self {
		match state {
			HealthState::Healthy => HealthStatus::Healthy,
			HealthState::Degraded => HealthStatus::Degraded,
			HealthState::Unhealthy => HealthStatus::Unhealthy,
		}
	}
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StorageHealth {
	pub status: HealthStatus,
	pub backend: String,
	pub latency_ms: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct LastRunInfo {
	pub run_id: String,
	pub status: String,
	pub started_at: DateTime<Utc>,
	pub duration_ms: Option<i64>,
	pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct JobInfo {
	pub id: String,
	pub name: String,
	pub status: HealthStatus,
	pub last_run: Option<LastRunInfo>,
	pub consecutive_failures: u32,
}

impl From<JobHealthStatus> for JobInfo {
	fn from(status: JobHealthStatus) -> Self {
		Self {
			id: status.job_id,
			name: status.name,
			status: status.status.into(),
			last_run: status.last_run.map(|r| LastRunInfo {
				run_id: r.run_id,
				status: r.status.as_str().to_string(),
				started_at: r.started_at,
				duration_ms: r.duration_ms,
				error: r.error,
			}),
			consecutive_failures: status.consecutive_failures,
		}
	}
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct HealthResponse {
	pub status: HealthStatus,
	pub timestamp: DateTime<Utc>,
	pub version: String,
	pub storage: StorageHealth,
	pub jobs: Vec<JobInfo>,
}

/// The worst of the component statuses.
pub fn aggregate_status(statuses: impl IntoIterator<Item = HealthStatus>) -> HealthStatus {
	statuses
		.into_iter()
		.fold(HealthStatus::Healthy, |worst, s| match (worst, s) {
			(HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
			(HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
			_ => HealthStatus::Healthy,
		})
}
