// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Interval scheduling for registered jobs.

use crate::context::{CancellationToken, JobContext};
use crate::error::{JobError, Result};
use crate::health::{HealthState, JobHealthStatus, JobsHealthStatus, LastRunInfo};
use crate::history::RunHistory;
use crate::job::Job;
use crate::types::{JobRun, JobStatus, TriggerSource};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Retries after the first attempt of a run.
const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(60);

/// One registered job and everything needed to run it.
struct Runner {
	job: Arc<dyn Job>,
	interval: Duration,
	history: Arc<RunHistory>,
	// Held for a whole run, retries included.
	exclusive: Mutex<()>,
	cancellation_token: CancellationToken,
}

impl Runner {
	/// One logical run: a single history entry however many attempts it takes.
	async fn run(&self, triggered_by: TriggerSource) -> Result<String> {
		let _exclusive = self.exclusive.lock().await;
		let job_id = self.job.id();
		let run_id = uuid::Uuid::new_v4().to_string();

		self
			.history
			.record_run_start(&JobRun {
				id: run_id.clone(),
				job_id: job_id.to_string(),
				status: JobStatus::Running,
				started_at: Utc::now(),
				completed_at: None,
				duration_ms: None,
				error_message: None,
				retry_count: 0,
				triggered_by,
				metadata: None,
			})
			.await;

		let mut attempt = 0u32;
		let outcome = loop {
			let ctx = JobContext {
				run_id: run_id.clone(),
				triggered_by: if attempt == 0 {
					triggered_by
				} else {
					TriggerSource::Retry
				},
				cancellation_token: self.cancellation_token.clone(),
			};

			match self.job.run(&ctx).await {
				Err(JobError::Failed {
					message,
					retryable: true,
				}) if attempt < MAX_RETRIES && !self.cancellation_token.is_cancelled() => {
					attempt += 1;
					let delay = backoff_delay(attempt);
					warn!(
						job_id,
						run_id = %run_id,
						attempt,
						delay_secs = delay.as_secs(),
						error = %message,
						"job failed, retrying"
					);
					tokio::time::sleep(delay).await;
				}
				other => break other,
			}
		};

		match outcome {
			Ok(output) => {
				self
					.history
					.record_run_complete(job_id, &run_id, JobStatus::Succeeded, None, output.metadata)
					.await;
				info!(job_id, run_id = %run_id, message = %output.message, "job completed");
				Ok(run_id)
			}
			Err(JobError::Cancelled) => {
				self
					.history
					.record_run_complete(job_id, &run_id, JobStatus::Cancelled, None, None)
					.await;
				info!(job_id, run_id = %run_id, "job cancelled");
				Err(JobError::Cancelled)
			}
			Err(e) => {
				let message = match &e {
					JobError::Failed { message, .. } => message.clone(),
					other => other.to_string(),
				};
				self
					.history
					.record_run_complete(job_id, &run_id, JobStatus::Failed, Some(message.clone()), None)
					.await;
				warn!(job_id, run_id = %run_id, error = %message, attempts = attempt + 1, "job failed");
				Err(e)
			}
		}
	}

	async fn status(&self) -> JobHealthStatus {
		let job_id = self.job.id();
		let last_run = self.history.get_last_run(job_id).await;
		let consecutive_failures = self.history.count_consecutive_failures(job_id).await;

		JobHealthStatus {
			job_id: job_id.to_string(),
			name: self.job.name().to_string(),
			status: HealthState::assess(last_run.as_ref().map(|r| r.status), consecutive_failures),
			last_run: last_run.map(|r| LastRunInfo {
				run_id: r.id,
				status: r.status,
				started_at: r.started_at,
				duration_ms: r.duration_ms,
				error: r.error_message,
			}),
			consecutive_failures,
		}
	}
}

/// Doubles from one second per retry, capped at a minute.
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
	let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
	RETRY_BASE_DELAY.saturating_mul(factor).min(RETRY_MAX_DELAY)
}

/// Runs each registered job every `interval`, measured from the end of the
/// previous run, so runs of one job never overlap.
pub struct JobScheduler {
	runners: BTreeMap<String, Arc<Runner>>,
	history: Arc<RunHistory>,
	shutdown_tx: watch::Sender<bool>,
	handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for JobScheduler {
	fn default() -> Self {
		Self::new(Arc::new(RunHistory::default()))
	}
}

impl JobScheduler {
	pub fn new(history: Arc<RunHistory>) -> Self {
		let (shutdown_tx, _) = watch::channel(false);
		Self {
			runners: BTreeMap::new(),
			history,
			shutdown_tx,
			handles: Mutex::new(Vec::new()),
		}
	}

	pub fn history(&self) -> &Arc<RunHistory> {
		&self.history
	}

	/// Registering a second job with the same id replaces the first.
	pub fn register_periodic(&mut self, job: Arc<dyn Job>, interval: Duration) {
		let runner = Runner {
			job,
			interval,
			history: Arc::clone(&self.history),
			exclusive: Mutex::new(()),
			cancellation_token: CancellationToken::new(),
		};
		self
			.runners
			.insert(runner.job.id().to_string(), Arc::new(runner));
	}

	#[instrument(skip(self))]
	pub async fn start(&self) {
		let mut handles = self.handles.lock().await;

		for (job_id, runner) in &self.runners {
			let runner = Arc::clone(runner);
			let job_id = job_id.clone();
			let mut shutdown_rx = self.shutdown_tx.subscribe();

			handles.push(tokio::spawn(async move {
				loop {
					tokio::select! {
						_ = tokio::time::sleep(runner.interval) => {
							// Outcome is already in the run history.
							let _ = runner.run(TriggerSource::Schedule).await;
						}
						_ = shutdown_rx.changed() => {
							info!(job_id = %job_id, "stopping periodic job");
							break;
						}
					}
				}
			}));
		}

		info!(job_count = handles.len(), "job scheduler started");
	}

	/// Runs a job now and waits for it. If a run of the same job is already
	/// in progress, waits for that run to finish first.
	#[instrument(skip(self))]
	pub async fn trigger_job(&self, job_id: &str, triggered_by: TriggerSource) -> Result<String> {
		let runner = self
			.runners
			.get(job_id)
			.ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
		runner.run(triggered_by).await
	}

	/// Stops the interval loops and cancels every job, then waits for the
	/// loops to exit. Jobs that check their token stop early.
	#[instrument(skip(self))]
	pub async fn shutdown(&self) {
		let _ = self.shutdown_tx.send(true);
		for runner in self.runners.values() {
			runner.cancellation_token.cancel();
		}

		let mut handles = self.handles.lock().await;
		for handle in handles.drain(..) {
			let _ = handle.await;
		}

		info!("job scheduler shut down");
	}

	/// Sorted.
	pub fn job_ids(&self) -> Vec<String> {
		self.runners.keys().cloned().collect()
	}

	pub async fn job_status(&self, job_id: &str) -> Option<JobHealthStatus> {
		Some(self.runners.get(job_id)?.status().await)
	}

	pub async fn health_status(&self) -> JobsHealthStatus {
		let mut jobs = Vec::with_capacity(self.runners.len());
		let mut status = HealthState::Healthy;

		for runner in self.runners.values() {
			let job = runner.status().await;
			status = status.worst(job.status);
			jobs.push(job);
		}

		JobsHealthStatus { status, jobs }
	}
}
