// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background job that removes expired and exhausted secrets.
//!
//! Reads and metadata probes already refuse dead secrets; this job makes sure
//! their ciphertext does not linger on disk when nobody asks for them again.

use std::sync::Arc;

use async_trait::async_trait;
use cinder_server_jobs::{Job, JobContext, JobError, JobOutput};
use cinder_server_secrets::{GarbageCollector, SecretManager};
use tracing::{info, instrument, warn};

pub const SECRET_SWEEP_JOB_ID: &str = "secret-sweep";

pub struct SecretSweepJob {
	manager: Arc<SecretManager>,
	collector: GarbageCollector,
}

impl SecretSweepJob {
	pub fn new(manager: Arc<SecretManager>) -> Self {
		Self {
			collector: GarbageCollector::new(manager.clone()),
			manager,
		}
	}
}

#[async_trait]
impl Job for SecretSweepJob {
	fn id(&self) -> &str {
		SECRET_SWEEP_JOB_ID
	}

	fn name(&self) -> &str {
		"Secret Sweep"
	}

	fn description(&self) -> &str {
		"Delete expired and exhausted secrets"
	}

	#[instrument(skip(self, ctx), fields(job_id = SECRET_SWEEP_JOB_ID, run_id = %ctx.run_id))]
	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
		if ctx.cancellation_token.is_cancelled() {
			return Err(JobError::Cancelled);
		}

		// A store that cannot be reached is a failed run. Bad entries inside
		// a reachable store are counted and skipped.
		self.manager
			.store()
			.ping()
			.await
			.map_err(|e| JobError::Failed {
				message: format!("storage unavailable: {e}"),
				retryable: true,
			})?;

		let report = self.collector.sweep().await;
		let metadata = serde_json::to_value(report).ok();

		if report.delete_errors > 0 {
			return Err(JobError::Failed {
				message: format!("sweep incomplete: {} delete errors", report.delete_errors),
				retryable: true,
			});
		}

		if report.list_errors > 0 {
			warn!(list_errors = report.list_errors, "secret sweep skipped unreadable entries");
		}
		info!(deleted = report.deleted, scanned = report.scanned, "secret sweep completed");

		Ok(JobOutput {
			message: format!("Deleted {} of {} secrets", report.deleted, report.scanned),
			metadata,
		})
	}
}
