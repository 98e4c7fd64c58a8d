// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::types::JobStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct JobHealthStatus {
	pub job_id: String,
	pub name: String,
	pub status: HealthState,
	pub last_run: Option<LastRunInfo>,
	pub consecutive_failures: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastRunInfo {
	pub run_id: String,
	pub status: JobStatus,
	pub started_at: DateTime<Utc>,
	pub duration_ms: Option<i64>,
	pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
	Healthy,
	Degraded,
	Unhealthy,
}

/// Consecutive failed runs before a job reports [`HealthState::Unhealthy`].
/// A single failure already makes it [`HealthState::Degraded`].
pub const UNHEALTHY_AFTER_FAILURES: u32 = 3;

impl HealthState {
	/// Health of a job from the status of its latest run and the failed runs
	/// before it.
	pub fn assess(last_run: Option<JobStatus>, consecutive_failures: u32) -> HealthState {
		match last_run {
			None | Some(JobStatus::Succeeded) | Some(JobStatus::Cancelled) => HealthState::Healthy,
			// A run in flight says nothing new; judge by the runs before it.
			Some(JobStatus::Running) | Some(JobStatus::Failed) => match consecutive_failures {
				0 => HealthState::Healthy,
				n if n >= UNHEALTHY_AFTER_FAILURES => HealthState::Unhealthy,
				_ => HealthState::Degraded,
			},
		}
	}

	/// The worse of two states.
	pub fn worst(self, other: HealthState) -> HealthState {
		match (self, other) {
			(HealthState::Unhealthy, _) | (_, HealthState::Unhealthy) => HealthState::Unhealthy,
			(HealthState::Degraded, _) | (_, HealthState::Degraded) => HealthState::Degraded,
			_ => HealthState::Healthy,
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct JobsHealthStatus {
	pub status: HealthState,
	pub jobs: Vec<JobHealthStatus>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn finished_runs_are_healthy() {
		assert_eq!(HealthState::assess(None, 0), HealthState::Healthy);
		assert_eq!(HealthState::assess(Some(JobStatus::Succeeded), 0), HealthState::Healthy);
		assert_eq!(HealthState::assess(Some(JobStatus::Cancelled), 0), HealthState::Healthy);
	}

	#[test]
	fn failures_cross_thresholds() {
		let failed = Some(JobStatus::Failed);
		assert_eq!(HealthState::assess(failed, 0), HealthState::Healthy);
		assert_eq!(HealthState::assess(failed, 1), HealthState::Degraded);
		assert_eq!(HealthState::assess(failed, 2), HealthState::Degraded);
		assert_eq!(HealthState::assess(failed, 3), HealthState::Unhealthy);
		assert_eq!(HealthState::assess(failed, 5), HealthState::Unhealthy);
	}

	#[test]
	fn running_keeps_prior_failures() {
		assert_eq!(HealthState::assess(Some(JobStatus::Running), 0), HealthState::Healthy);
		assert_eq!(HealthState::assess(Some(JobStatus::Running), 3), HealthState::Unhealthy);
	}

	#[test]
	fn worst_prefers_unhealthy() {
		assert_eq!(HealthState::Healthy.worst(HealthState::Degraded), HealthState::Degraded);
		assert_eq!(HealthState::Unhealthy.worst(HealthState::Degraded), HealthState::Unhealthy);
		assert_eq!(HealthState::Healthy.worst(HealthState::Healthy), HealthState::Healthy);
	}
}
