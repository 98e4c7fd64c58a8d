// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process record of recent job runs. History is not persisted; a
//! restarted server reports every job as healthy until it runs again.

use crate::types::{JobRun, JobStatus};
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

/// Runs kept per job.
pub const DEFAULT_RUNS_PER_JOB: usize = 20;

#[derive(Debug)]
pub struct RunHistory {
	runs: Mutex<HashMap<String, VecDeque<JobRun>>>,
	capacity: usize,
}

impl Default for RunHistory {
	fn default() -> Self {
		Self::new(DEFAULT_RUNS_PER_JOB)
	}
}

impl RunHistory {
	pub fn new(capacity: usize) -> Self {
		Self {
			runs: Mutex::new(HashMap::new()),
			capacity: capacity.max(1),
		}
	}

	pub async fn record_run_start(&self, run: &JobRun) {
		let mut runs = self.runs.lock().await;
		let entries = runs.entry(run.job_id.clone()).or_default();
		entries.push_back(run.clone());
		while entries.len() > self.capacity {
			entries.pop_front();
		}
	}

	/// Marks a run finished. Unknown run ids are ignored.
	pub async fn record_run_complete(
		&self,
		job_id: &str,
		run_id: &str,
		status: JobStatus,
		error_message: Option<String>,
		metadata: Option<serde_json::Value>,
	) {
		let mut runs = self.runs.lock().await;
		let Some(run) = runs
			.get_mut(job_id)
			.and_then(|entries| entries.iter_mut().rev().find(|r| r.id == run_id))
		else {
			return;
		};

		let now = Utc::now();
		run.status = status;
		run.completed_at = Some(now);
		run.duration_ms = Some((now - run.started_at).num_milliseconds());
		run.error_message = error_message;
		run.metadata = metadata;
	}

	pub async fn get_last_run(&self, job_id: &str) -> Option<JobRun> {
		self
			.runs
			.lock()
			.await
			.get(job_id)
			.and_then(|entries| entries.back().cloned())
	}

	/// Newest first.
	pub async fn recent_runs(&self, job_id: &str) -> Vec<JobRun> {
		self
			.runs
			.lock()
			.await
			.get(job_id)
			.map(|entries| entries.iter().rev().cloned().collect())
			.unwrap_or_default()
	}

	/// Failed runs since the last run that did not fail. Runs still in
	/// progress are skipped.
	pub async fn count_consecutive_failures(&self, job_id: &str) -> u32 {
		let runs = self.runs.lock().await;
		let Some(entries) = runs.get(job_id) else {
			return 0;
		};
		entries
			.iter()
			.rev()
			.filter(|r| r.status != JobStatus::Running)
			.take_while(|r| r.status == JobStatus::Failed)
			.count() as u32
	}
}
