// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Component health checks.

use std::sync::Arc;
use std::time::Duration;

use cinder_server_api::{HealthStatus, JobInfo, StorageHealth};
use cinder_server_jobs::JobScheduler;
use cinder_server_secrets::SecretStore;
use tokio::time::{timeout, Instant};

const STORAGE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Ping the storage backend and measure how long it takes.
pub async fn check_storage(store: &Arc<dyn SecretStore>) -> StorageHealth {
	let start = Instant::now();

	let result = timeout(STORAGE_CHECK_TIMEOUT, store.ping()).await;
	let latency_ms = start.elapsed().as_millis() as u64;
	let backend = store.backend_name().to_string();

	match result {
		Ok(Ok(())) => StorageHealth {
			status: HealthStatus::Healthy,
			backend,
			latency_ms,
			error: None,
		},
		Ok(Err(e)) => {
			tracing::warn!(backend = %backend, error = %e, "storage health check failed");
			StorageHealth {
				status: HealthStatus::Unhealthy,
				backend,
				latency_ms,
				error: Some("storage backend unreachable".to_string()),
			}
		}
		Err(_) => StorageHealth {
			status: HealthStatus::Unhealthy,
			backend,
			latency_ms,
			error: Some("storage health check timed out".to_string()),
		},
	}
}

/// Job health, or healthy with no jobs when no scheduler is running.
pub async fn check_jobs(scheduler: Option<&Arc<JobScheduler>>) -> (HealthStatus, Vec<JobInfo>) {
	let Some(scheduler) = scheduler else {
		return (HealthStatus::Healthy, Vec::new());
	};

	let health = scheduler.health_status().await;
	let jobs = health.jobs.into_iter().map(JobInfo::from).collect();
	(health.status.into(), jobs)
}

#[cfg(test)]
mod tests {
	use super::*;
	use cinder_server_secrets::{FileSecretStore, MemorySecretStore};

	#[tokio::test]
	async fn memory_store_is_healthy() {
		let store: Arc<dyn SecretStore> = Arc::new(MemorySecretStore::new());
		let health = check_storage(&store).await;
		assert_eq!(health.status, HealthStatus::Healthy);
		assert_eq!(health.backend, "memory");
		assert!(health.error.is_none());
	}

	#[tokio::test]
	async fn missing_file_store_directory_is_unhealthy() {
		let dir = tempfile::tempdir().unwrap();
		let file_store = FileSecretStore::open(dir.path().join("secrets")).await.unwrap();
		tokio::fs::remove_dir(file_store.dir()).await.unwrap();
		let store: Arc<dyn SecretStore> = Arc::new(file_store);

		let health = check_storage(&store).await;
		assert_eq!(health.status, HealthStatus::Unhealthy);
		assert_eq!(health.backend, "file");
		assert!(!health.error.unwrap().contains(dir.path().to_str().unwrap()));
	}

	#[tokio::test]
	async fn no_scheduler_is_healthy() {
		let (status, jobs) = check_jobs(None).await;
		assert_eq!(status, HealthStatus::Healthy);
		assert!(jobs.is_empty());
	}
}
