// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background job scheduler for the cinder server.
//!
//! Jobs run on a fixed interval or on demand, with retries for transient
//! failures. Runs of the same job never overlap, and the outcome of recent
//! runs feeds the server's health report.

pub mod context;
pub mod error;
pub mod health;
pub mod history;
pub mod job;
pub mod scheduler;
pub mod types;

pub use context::{CancellationToken, JobContext};
pub use error::{JobError, Result};
pub use health::{
	HealthState, JobHealthStatus, JobsHealthStatus, LastRunInfo, UNHEALTHY_AFTER_FAILURES,
};
pub use history::RunHistory;
pub use job::Job;
pub use scheduler::JobScheduler;
pub use types::{JobOutput, JobRun, JobStatus, TriggerSource};
