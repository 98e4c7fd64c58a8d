// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Every storage backend must behave identically behind [`SecretManager`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use cinder_common_envelope::{CipherAlgorithm, Envelope, KeyAlgorithm};
use cinder_server_secrets::{
	BurnMode, FileSecretStore, GarbageCollector, ManualClock, MemorySecretStore, MetadataUpdate,
	PolicyConfig, Secret, SecretId, SecretManager, SecretStore, SecretsError, SqliteSecretStore,
	StoreError, Submission,
};
use futures::TryStreamExt;
use tempfile::TempDir;

enum Backend {
	Sqlite,
	Memory,
	File,
}

struct Harness {
	store: Arc<dyn SecretStore>,
	clock: Arc<ManualClock>,
	manager: Arc<SecretManager>,
	_dir: Option<TempDir>,
}

impl Harness {
	async fn new(backend: Backend) -> Self {
		Self::with_policy(backend, PolicyConfig::default()).await
	}

	async fn with_policy(backend: Backend, policy: PolicyConfig) -> Self {
		let (store, dir): (Arc<dyn SecretStore>, Option<TempDir>) = match backend {
			Backend::Sqlite => {
				let dir = tempfile::tempdir().unwrap();
				let url = format!("sqlite:{}", dir.path().join("cinder.db").display());
				let pool = cinder_server_db::create_pool(&url, 8).await.unwrap();
				cinder_server_db::run_migrations(&pool).await.unwrap();
				(Arc::new(SqliteSecretStore::new(pool)), Some(dir))
			}
			Backend::Memory => (Arc::new(MemorySecretStore::new()), None),
			Backend::File => {
				let dir = tempfile::tempdir().unwrap();
				let store = FileSecretStore::open(dir.path().join("secrets")).await.unwrap();
				(Arc::new(store), Some(dir))
			}
		};
		let clock = Arc::new(ManualClock::new(Utc::now()));
		let manager = Arc::new(SecretManager::with_clock(store.clone(), policy, clock.clone()));
		Self {
			store,
			clock,
			manager,
			_dir: dir,
		}
	}
}

fn envelope(ciphertext: &[u8]) -> Envelope {
	let mut parameters = BTreeMap::new();
	parameters.insert("salt".to_string(), "c2FsdHNhbHRzYWx0c2FsdA".to_string());
	parameters.insert("nonce".to_string(), "bm9uY2Vub25jZW5v".to_string());
	Envelope::new(
		CipherAlgorithm::Aes256Gcm,
		KeyAlgorithm::Pbkdf2,
		parameters,
		ciphertext.to_vec(),
	)
	.unwrap()
}

fn submission(burn_mode: BurnMode) -> Submission {
	Submission {
		envelope: envelope(b"ciphertext"),
		attachments: vec![envelope(b"attachment")],
		duration: "1d".to_string(),
		burn_mode,
		password_protected: true,
	}
}

fn raw_secret(remaining_reads: i64) -> Secret {
	let now = Utc::now();
	Secret {
		id: SecretId::generate(),
		envelope: envelope(b"raw"),
		attachments: Vec::new(),
		password_protected: false,
		remaining_reads,
		created_at: now,
		expires_at: now + Duration::hours(1),
	}
}

async fn store_contract(backend: Backend) {
	let h = Harness::new(backend).await;
	let secret = raw_secret(3);

	assert!(!h.store.exists(secret.id).await.unwrap());
	assert!(matches!(h.store.get(secret.id).await, Err(StoreError::NotFound(_))));
	assert!(matches!(h.store.get_metadata(secret.id).await, Err(StoreError::NotFound(_))));
	assert!(matches!(h.store.delete(secret.id).await, Err(StoreError::NotFound(_))));
	assert!(matches!(
		h.store.update_metadata(secret.id, MetadataUpdate::default()).await,
		Err(StoreError::NotFound(_))
	));

	h.store.insert(&secret).await.unwrap();
	assert!(matches!(
		h.store.insert(&secret).await,
		Err(StoreError::AlreadyExists(_))
	));
	assert!(h.store.exists(secret.id).await.unwrap());

	let fetched = h.store.get(secret.id).await.unwrap();
	assert_eq!(fetched.id, secret.id);
	assert_eq!(fetched.envelope, secret.envelope);
	assert_eq!(fetched.remaining_reads, 3);
	assert_eq!(
		fetched.expires_at.timestamp_micros(),
		secret.expires_at.timestamp_micros()
	);

	h.store
		.update_metadata(secret.id, MetadataUpdate::decrement_from(3))
		.await
		.unwrap();
	assert!(matches!(
		h.store
			.update_metadata(secret.id, MetadataUpdate::decrement_from(3))
			.await,
		Err(StoreError::Conflict(_))
	));
	let metadata = h.store.get_metadata(secret.id).await.unwrap();
	assert_eq!(metadata.remaining_reads, 2);
	assert_eq!(metadata.attachment_count, 0);

	let listed: Vec<_> = h.store.list().try_collect().await.unwrap();
	assert_eq!(listed.len(), 1);
	assert_eq!(listed[0].id, secret.id);

	h.store.delete(secret.id).await.unwrap();
	assert!(!h.store.exists(secret.id).await.unwrap());
	let listed: Vec<_> = h.store.list().try_collect().await.unwrap();
	assert!(listed.is_empty());
	h.store.ping().await.unwrap();
}

async fn burn_after_read(backend: Backend) {
	let h = Harness::new(backend).await;
	let id = h.manager.submit(submission(BurnMode::Burn)).await.unwrap();

	let secret = h.manager.read(id).await.unwrap();
	assert_eq!(secret.envelope, envelope(b"ciphertext"));
	assert_eq!(secret.attachments, vec![envelope(b"attachment")]);
	assert!(secret.password_protected);

	assert_eq!(h.manager.read(id).await.unwrap_err(), SecretsError::NotFound);
	assert_eq!(h.manager.get_metadata(id).await.unwrap_err(), SecretsError::NotFound);
	assert!(!h.store.exists(id).await.unwrap());
}

async fn slow_burn(backend: Backend) {
	let h = Harness::new(backend).await;
	let id = h.manager.submit(submission(BurnMode::SlowBurn(3))).await.unwrap();

	let mut envelopes = Vec::new();
	for expected_remaining in [2, 1, 0] {
		let secret = h.manager.read(id).await.unwrap();
		assert_eq!(secret.remaining_reads, expected_remaining);
		envelopes.push(secret.envelope);
	}
	assert!(envelopes.iter().all(|e| *e == envelopes[0]));
	assert_eq!(h.manager.read(id).await.unwrap_err(), SecretsError::NotFound);
}

async fn expiry(backend: Backend) {
	let h = Harness::new(backend).await;
	let expiring = h.manager.submit(submission(BurnMode::Unlimited)).await.unwrap();
	let swept = h.manager.submit(submission(BurnMode::Burn)).await.unwrap();

	h.clock.advance(Duration::days(1));

	assert_eq!(h.manager.read(expiring).await.unwrap_err(), SecretsError::NotFound);
	assert!(h.store.exists(swept).await.unwrap());

	let report = GarbageCollector::new(h.manager.clone()).sweep().await;
	assert_eq!(report.deleted, 1);
	assert!(report.is_clean());
	assert!(!h.store.exists(swept).await.unwrap());
}

async fn policy_rejects_before_write(backend: Backend) {
	let h = Harness::with_policy(
		backend,
		PolicyConfig {
			require_burn: true,
			max_secret_bytes: 32,
			..Default::default()
		},
	)
	.await;

	let err = h.manager.submit(submission(BurnMode::Unlimited)).await.unwrap_err();
	assert!(matches!(err, SecretsError::PolicyViolation(_)));

	let mut oversized = submission(BurnMode::Burn);
	oversized.envelope = envelope(&[0u8; 64]);
	let err = h.manager.submit(oversized).await.unwrap_err();
	assert!(matches!(err, SecretsError::SizeLimit { .. }));

	let listed: Vec<_> = h.store.list().try_collect().await.unwrap();
	assert!(listed.is_empty());
}

async fn concurrent_burn_has_one_winner(backend: Backend) {
	const READERS: usize = 16;
	let h = Harness::new(backend).await;
	let id = h.manager.submit(submission(BurnMode::Burn)).await.unwrap();

	let tasks: Vec<_> = (0..READERS)
		.map(|_| {
			let manager = h.manager.clone();
			tokio::spawn(async move { manager.read(id).await })
		})
		.collect();

	let mut successes = 0;
	let mut not_found = 0;
	for task in tasks {
		match task.await.unwrap() {
			Ok(_) => successes += 1,
			Err(SecretsError::NotFound) => not_found += 1,
			Err(other) => panic!("unexpected error: {other}"),
		}
	}
	assert_eq!(successes, 1);
	assert_eq!(not_found, READERS - 1);
}

async fn concurrent_slow_burn_has_exact_winners(backend: Backend) {
	const READERS: usize = 12;
	const READS: u32 = 4;
	let h = Harness::new(backend).await;
	let id = h.manager.submit(submission(BurnMode::SlowBurn(READS))).await.unwrap();

	let tasks: Vec<_> = (0..READERS)
		.map(|_| {
			let manager = h.manager.clone();
			tokio::spawn(async move { manager.read(id).await })
		})
		.collect();

	let mut successes = 0;
	for task in tasks {
		match task.await.unwrap() {
			Ok(_) => successes += 1,
			Err(SecretsError::NotFound) => {}
			Err(other) => panic!("unexpected error: {other}"),
		}
	}
	assert_eq!(successes, READS as usize);
	assert!(!h.store.exists(id).await.unwrap());
}

/// More readers than reads, and more reads than any reader could win in a
/// short retry budget. Every read must still be served.
async fn heavy_contention_serves_every_read(backend: Backend) {
	const READERS: usize = 48;
	const READS: u32 = 32;
	let policy = PolicyConfig {
		max_slow_burn_reads: 64,
		..PolicyConfig::default()
	};
	let h = Harness::with_policy(backend, policy).await;
	let id = h.manager.submit(submission(BurnMode::SlowBurn(READS))).await.unwrap();

	let tasks: Vec<_> = (0..READERS)
		.map(|_| {
			let manager = h.manager.clone();
			tokio::spawn(async move { manager.read(id).await })
		})
		.collect();

	let mut successes = 0;
	for task in tasks {
		match task.await.unwrap() {
			Ok(_) => successes += 1,
			Err(SecretsError::NotFound) => {}
			Err(other) => panic!("unexpected error: {other}"),
		}
	}
	assert_eq!(successes, READS as usize);
	assert!(!h.store.exists(id).await.unwrap());
}

macro_rules! backend_suite {
	($module:ident, $backend:expr) => {
		mod $module {
			use super::*;

			#[tokio::test]
			async fn store_contract() {
				super::store_contract($backend).await;
			}

			#[tokio::test]
			async fn burn_after_read() {
				super::burn_after_read($backend).await;
			}

			#[tokio::test]
			async fn slow_burn() {
				super::slow_burn($backend).await;
			}

			#[tokio::test]
			async fn expiry() {
				super::expiry($backend).await;
			}

			#[tokio::test]
			async fn policy_rejects_before_write() {
				super::policy_rejects_before_write($backend).await;
			}

			#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
			async fn concurrent_burn_has_one_winner() {
				super::concurrent_burn_has_one_winner($backend).await;
			}

			#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
			async fn concurrent_slow_burn_has_exact_winners() {
				super::concurrent_slow_burn_has_exact_winners($backend).await;
			}

			#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
			async fn heavy_contention_serves_every_read() {
				super::heavy_contention_serves_every_read($backend).await;
			}
		}
	};
}

backend_suite!(sqlite, Backend::Sqlite);
backend_suite!(memory, Backend::Memory);
backend_suite!(file, Backend::File);
