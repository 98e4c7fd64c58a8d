// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sweep that removes expired and exhausted secrets.

use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::manager::SecretManager;
use crate::types::SecretId;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
	/// Entries the listing produced.
	pub scanned: u64,
	/// Secrets this sweep deleted.
	pub deleted: u64,
	/// Candidates that vanished before they could be deleted.
	pub already_gone: u64,
	/// Listing entries that could not be read.
	pub list_errors: u64,
	/// Candidates whose deletion failed.
	pub delete_errors: u64,
}

impl SweepReport {
	pub fn is_clean(&self) -> bool {
		self.list_errors == 0 && self.delete_errors == 0
	}
}

pub struct GarbageCollector {
	manager: Arc<SecretManager>,
}

impl GarbageCollector {
	pub fn new(manager: Arc<SecretManager>) -> Self {
		Self { manager }
	}

	/// One pass over the store. Per-item failures are logged and counted, never
	/// propagated, so one bad entry cannot block collection of the rest.
	#[instrument(skip(self), fields(backend = self.manager.store().backend_name()))]
	pub async fn sweep(&self) -> SweepReport {
		let mut report = SweepReport::default();
		let now = self.manager.now();

		// Collect first so deletions never run against an open listing.
		let mut candidates: Vec<SecretId> = Vec::new();
		let mut listing = self.manager.store().list();
		while let Some(item) = listing.next().await {
			match item {
				Ok(metadata) => {
					report.scanned += 1;
					if metadata.is_collectable(now) {
						candidates.push(metadata.id);
					}
				}
				Err(e) => {
					report.list_errors += 1;
					warn!(error = %e, "skipping unreadable entry during sweep");
				}
			}
		}
		drop(listing);

		for id in candidates {
			match self.manager.purge(id).await {
				Ok(true) => report.deleted += 1,
				Ok(false) => report.already_gone += 1,
				Err(e) => {
					report.delete_errors += 1;
					warn!(secret_id = %id, error = %e, "failed to delete secret during sweep");
				}
			}
		}

		info!(
			scanned = report.scanned,
			deleted = report.deleted,
			list_errors = report.list_errors,
			delete_errors = report.delete_errors,
			"sweep complete"
		);
		report
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::clock::ManualClock;
	use crate::policy::PolicyConfig;
	use crate::store::{MemorySecretStore, MetadataUpdate, SecretStore};
	use crate::types::{BurnMode, Submission};
	use chrono::Duration;
	use cinder_common_envelope::{CipherAlgorithm, Envelope, KeyAlgorithm};
	use std::collections::BTreeMap;

	fn submission(duration: &str, burn_mode: BurnMode) -> Submission {
		Submission {
			envelope: Envelope::new(
				CipherAlgorithm::Aes256Gcm,
				KeyAlgorithm::Pbkdf2,
				BTreeMap::new(),
				vec![0; 4],
			)
			.unwrap(),
			attachments: Vec::new(),
			duration: duration.to_string(),
			burn_mode,
			password_protected: false,
		}
	}

	#[tokio::test]
	async fn sweeps_only_expired_and_exhausted() {
		let store = Arc::new(MemorySecretStore::new());
		let clock = Arc::new(ManualClock::default());
		let manager = Arc::new(SecretManager::with_clock(
			store.clone(),
			PolicyConfig::default(),
			clock.clone(),
		));

		let short = manager.submit(submission("1h", BurnMode::Unlimited)).await.unwrap();
		let long = manager.submit(submission("1w", BurnMode::Unlimited)).await.unwrap();
		let exhausted = manager.submit(submission("1w", BurnMode::SlowBurn(2))).await.unwrap();
		store
			.update_metadata(
				exhausted,
				MetadataUpdate {
					remaining_reads: Some(0),
					..Default::default()
				},
			)
			.await
			.unwrap();

		clock.advance(Duration::hours(2));
		let report = GarbageCollector::new(manager.clone()).sweep().await;

		assert_eq!(report.scanned, 3);
		assert_eq!(report.deleted, 2);
		assert!(report.is_clean());
		assert!(!store.exists(short).await.unwrap());
		assert!(!store.exists(exhausted).await.unwrap());
		assert!(store.exists(long).await.unwrap());
	}

	#[tokio::test]
	async fn empty_store_sweeps_cleanly() {
		let manager = Arc::new(SecretManager::new(
			Arc::new(MemorySecretStore::new()),
			PolicyConfig::default(),
		));
		let report = GarbageCollector::new(manager).sweep().await;
		assert_eq!(report, SweepReport::default());
	}
}
