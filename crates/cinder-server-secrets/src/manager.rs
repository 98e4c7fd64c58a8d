// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret lifecycle orchestration.
//!
//! [`SecretManager`] is the only component that decides when a secret stops
//! being readable. It holds no per-secret state: every decision is made
//! against the store, and every mutation is conditional on the state it was
//! decided from.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{SecretsError, SecretsResult, StoreError};
use crate::policy::PolicyConfig;
use crate::store::{MetadataUpdate, SecretStore};
use crate::types::{Secret, SecretId, SecretMetadata, Submission, ValidatedSubmission};

pub struct SecretManager {
	store: Arc<dyn SecretStore>,
	policy: PolicyConfig,
	clock: Arc<dyn Clock>,
}

impl SecretManager {
	pub fn new(store: Arc<dyn SecretStore>, policy: PolicyConfig) -> Self {
		Self::with_clock(store, policy, Arc::new(SystemClock))
	}

	pub fn with_clock(store: Arc<dyn SecretStore>, policy: PolicyConfig, clock: Arc<dyn Clock>) -> Self {
		Self {
			store,
			policy,
			clock,
		}
	}

	pub fn store(&self) -> &Arc<dyn SecretStore> {
		&self.store
	}

	pub fn policy(&self) -> &PolicyConfig {
		&self.policy
	}

	pub fn now(&self) -> DateTime<Utc> {
		self.clock.now()
	}

	/// Validate against policy, then create.
	pub async fn submit(&self, submission: Submission) -> SecretsResult<SecretId> {
		let validated = self.policy.validate_submission(submission)?;
		self.create(validated).await
	}

	/// Store a validated submission under a fresh id. Not retried on failure.
	#[instrument(skip(self, submission), fields(remaining_reads = submission.remaining_reads))]
	pub async fn create(&self, submission: ValidatedSubmission) -> SecretsResult<SecretId> {
		let now = self.clock.now();
		let lifetime = Duration::from_std(submission.lifetime)
			.map_err(|e| SecretsError::InvalidDuration(e.to_string()))?;
		let expires_at = now
			.checked_add_signed(lifetime)
			.ok_or_else(|| SecretsError::InvalidDuration("lifetime overflows".to_string()))?;

		let secret = Secret {
			id: SecretId::generate(),
			envelope: submission.envelope,
			attachments: submission.attachments,
			password_protected: submission.password_protected,
			remaining_reads: submission.remaining_reads,
			created_at: now,
			expires_at,
		};

		self.store.insert(&secret).await.map_err(|e| {
			let err = SecretsError::from(e);
			tracing::error!(error = %err, backend = self.store.backend_name(), "failed to store secret");
			err
		})?;

		info!(secret_id = %secret.id, expires_at = %expires_at, "secret created");
		Ok(secret.id)
	}

	/// Hand out a secret, consuming one read.
	///
	/// Burn secrets are deleted before they are returned; whoever deletes the
	/// row owns the read. Slow-burn secrets are decremented with a
	/// compare-and-swap and retried if another reader got there first.
	///
	/// Retries are unbounded: a conflict means another reader consumed a
	/// read, so after at most `remaining_reads` conflicts the secret is gone.
	#[instrument(skip(self), fields(secret_id = %id))]
	pub async fn read(&self, id: SecretId) -> SecretsResult<Secret> {
		loop {
			let mut secret = self.store.get(id).await.map_err(|e| self.log_medium(e))?;
			let now = self.clock.now();

			if !secret.is_readable(now) {
				self.purge_quietly(id).await;
				return Err(SecretsError::NotFound);
			}

			match secret.remaining_reads {
				r if r < 0 => return Ok(secret),
				1 => {
					return match self.store.delete(id).await {
						Ok(()) => {
							secret.remaining_reads = 0;
							info!(secret_id = %id, "secret burned");
							Ok(secret)
						}
						Err(StoreError::NotFound(_)) => Err(SecretsError::NotFound),
						Err(e) => Err(self.log_medium(e)),
					};
				}
				remaining => {
					let mut update = MetadataUpdate::decrement_from(remaining);
					let window_end = Duration::from_std(self.policy.slow_burn_window)
						.ok()
						.and_then(|window| now.checked_add_signed(window));
					if let Some(window_end) = window_end {
						if window_end < secret.expires_at {
							update = update.with_expires_at(window_end);
						}
					}

					match self.store.update_metadata(id, update).await {
						Ok(()) => {
							update.apply_to(&mut secret);
							debug!(secret_id = %id, remaining = secret.remaining_reads, "slow burn read");
							return Ok(secret);
						}
						Err(StoreError::Conflict(_)) => {
							debug!(secret_id = %id, "read raced, retrying");
							continue;
						}
						Err(StoreError::NotFound(_)) => return Err(SecretsError::NotFound),
						Err(e) => return Err(self.log_medium(e)),
					}
				}
			}
		}
	}

	/// Metadata without consuming a read.
	#[instrument(skip(self), fields(secret_id = %id))]
	pub async fn get_metadata(&self, id: SecretId) -> SecretsResult<SecretMetadata> {
		let metadata = self.store.get_metadata(id).await.map_err(|e| self.log_medium(e))?;
		if metadata.is_collectable(self.clock.now()) {
			self.purge_quietly(id).await;
			return Err(SecretsError::NotFound);
		}
		Ok(metadata)
	}

	/// User-initiated deletion. A missing, expired or exhausted secret is
	/// reported as `NotFound`.
	#[instrument(skip(self), fields(secret_id = %id))]
	pub async fn delete(&self, id: SecretId) -> SecretsResult<()> {
		let metadata = self.store.get_metadata(id).await.map_err(|e| self.log_medium(e))?;
		let collectable = metadata.is_collectable(self.clock.now());

		match self.store.delete(id).await {
			Ok(()) if collectable => Err(SecretsError::NotFound),
			Ok(()) => {
				info!(secret_id = %id, "secret deleted");
				Ok(())
			}
			Err(StoreError::NotFound(_)) => Err(SecretsError::NotFound),
			Err(e) => Err(self.log_medium(e)),
		}
	}

	/// Remove a secret regardless of state. Returns `false` if it was already
	/// gone.
	#[instrument(skip(self), fields(secret_id = %id))]
	pub async fn purge(&self, id: SecretId) -> SecretsResult<bool> {
		match self.store.delete(id).await {
			Ok(()) => {
				debug!(secret_id = %id, "secret purged");
				Ok(true)
			}
			Err(StoreError::NotFound(_)) => Ok(false),
			Err(e) => Err(self.log_medium(e)),
		}
	}

	async fn purge_quietly(&self, id: SecretId) {
		if let Err(e) = self.purge(id).await {
			warn!(secret_id = %id, error = %e, "failed to purge dead secret, leaving it to the sweep");
		}
	}

	fn log_medium(&self, err: StoreError) -> SecretsError {
		let err = SecretsError::from(err);
		if err.is_internal() {
			tracing::error!(error = %err, backend = self.store.backend_name(), "storage failure");
		}
		err
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::clock::ManualClock;
	use crate::store::MemorySecretStore;
	use crate::types::BurnMode;
	use cinder_common_envelope::{CipherAlgorithm, Envelope, KeyAlgorithm};
	use std::collections::BTreeMap;

	fn envelope() -> Envelope {
		Envelope::new(
			CipherAlgorithm::Aes256Gcm,
			KeyAlgorithm::Pbkdf2,
			BTreeMap::new(),
			vec![1, 2, 3],
		)
		.unwrap()
	}

	fn submission(burn_mode: BurnMode) -> Submission {
		Submission {
			envelope: envelope(),
			attachments: Vec::new(),
			duration: "1d".to_string(),
			burn_mode,
			password_protected: false,
		}
	}

	fn manager() -> (SecretManager, Arc<MemorySecretStore>, Arc<ManualClock>) {
		let store = Arc::new(MemorySecretStore::new());
		let clock = Arc::new(ManualClock::default());
		let manager = SecretManager::with_clock(store.clone(), PolicyConfig::default(), clock.clone());
		(manager, store, clock)
	}

	#[tokio::test]
	async fn create_sets_expiry_from_duration() {
		let (manager, _, clock) = manager();
		let id = manager.submit(submission(BurnMode::Burn)).await.unwrap();
		let metadata = manager.get_metadata(id).await.unwrap();
		assert_eq!(metadata.created_at, clock.now());
		assert_eq!(metadata.expires_at, clock.now() + Duration::days(1));
		assert_eq!(metadata.remaining_reads, 1);
	}

	#[tokio::test]
	async fn metadata_probe_does_not_consume() {
		let (manager, _, _) = manager();
		let id = manager.submit(submission(BurnMode::Burn)).await.unwrap();
		for _ in 0..3 {
			manager.get_metadata(id).await.unwrap();
		}
		manager.read(id).await.unwrap();
		assert_eq!(manager.read(id).await.unwrap_err(), SecretsError::NotFound);
	}

	#[tokio::test]
	async fn slow_burn_clamps_expiry_to_window() {
		let (manager, _, clock) = manager();
		let id = manager.submit(submission(BurnMode::SlowBurn(3))).await.unwrap();

		let first = manager.read(id).await.unwrap();
		assert_eq!(first.remaining_reads, 2);
		assert_eq!(first.expires_at, clock.now() + Duration::minutes(5));

		clock.advance(Duration::minutes(6));
		assert_eq!(manager.read(id).await.unwrap_err(), SecretsError::NotFound);
	}

	#[tokio::test]
	async fn expired_read_purges_secret() {
		let (manager, store, clock) = manager();
		let id = manager.submit(submission(BurnMode::Unlimited)).await.unwrap();
		clock.advance(Duration::days(2));

		assert_eq!(manager.read(id).await.unwrap_err(), SecretsError::NotFound);
		assert!(store.is_empty().await);
	}

	#[tokio::test]
	async fn delete_reports_missing_and_expired_as_not_found() {
		let (manager, store, clock) = manager();
		let id = manager.submit(submission(BurnMode::Unlimited)).await.unwrap();
		manager.delete(id).await.unwrap();
		assert_eq!(manager.delete(id).await.unwrap_err(), SecretsError::NotFound);

		let expired = manager.submit(submission(BurnMode::Unlimited)).await.unwrap();
		clock.advance(Duration::days(2));
		assert_eq!(manager.delete(expired).await.unwrap_err(), SecretsError::NotFound);
		assert!(store.is_empty().await);
	}

	#[tokio::test]
	async fn purge_is_idempotent() {
		let (manager, _, _) = manager();
		let id = manager.submit(submission(BurnMode::Burn)).await.unwrap();
		assert!(manager.purge(id).await.unwrap());
		assert!(!manager.purge(id).await.unwrap());
	}
}
