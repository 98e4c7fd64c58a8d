// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret storage.
//!
//! [`SecretStore`] is the single contract every medium implements:
//!
//! - [`SqliteSecretStore`]: relational table, the default
//! - [`MemorySecretStore`]: in-process key-value map
//! - [`FileSecretStore`]: one JSON document per secret in a directory
//!
//! Only `remaining_reads` and `expires_at` are ever mutated after insert, and
//! only through [`SecretStore::update_metadata`].

mod file;
mod memory;
mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::error::StoreResult;
use crate::types::{Secret, SecretId, SecretMetadata};

pub use file::FileSecretStore;
pub use memory::MemorySecretStore;
pub use sqlite::SqliteSecretStore;

/// Partial update of a secret's mutable fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetadataUpdate {
	pub expires_at: Option<DateTime<Utc>>,
	pub remaining_reads: Option<i64>,
	/// Apply only if the stored counter still equals this value; otherwise
	/// fail with `StoreError::Conflict`.
	pub expect_remaining_reads: Option<i64>,
}

impl MetadataUpdate {
	/// Compare-and-swap of the read counter.
	pub fn decrement_from(current: i64) -> Self {
		Self {
			expires_at: None,
			remaining_reads: Some(current - 1),
			expect_remaining_reads: Some(current),
		}
	}

	pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
		self.expires_at = Some(expires_at);
		self
	}

	pub(crate) fn apply_to(&self, secret: &mut Secret) {
		if let Some(expires_at) = self.expires_at {
			secret.expires_at = expires_at;
		}
		if let Some(remaining_reads) = self.remaining_reads {
			secret.remaining_reads = remaining_reads;
		}
	}

	pub(crate) fn precondition_holds(&self, stored_remaining_reads: i64) -> bool {
		self.expect_remaining_reads
			.map_or(true, |expected| expected == stored_remaining_reads)
	}
}

/// Trait for secret storage operations.
#[async_trait]
pub trait SecretStore: Send + Sync {
	/// Short name of the medium, for logs and health output.
	fn backend_name(&self) -> &'static str;

	async fn exists(&self, id: SecretId) -> StoreResult<bool>;

	/// Fails with `StoreError::NotFound` if absent.
	async fn get(&self, id: SecretId) -> StoreResult<Secret>;

	/// Like [`SecretStore::get`] without the envelopes. Never counts as a read.
	async fn get_metadata(&self, id: SecretId) -> StoreResult<SecretMetadata>;

	/// Metadata of every stored secret. Each call starts a fresh pass.
	fn list(&self) -> BoxStream<'_, StoreResult<SecretMetadata>>;

	/// Fails with `StoreError::AlreadyExists` if the id is taken.
	async fn insert(&self, secret: &Secret) -> StoreResult<()>;

	/// Fails with `StoreError::NotFound` if absent and `StoreError::Conflict`
	/// if the update's precondition does not hold.
	async fn update_metadata(&self, id: SecretId, update: MetadataUpdate) -> StoreResult<()>;

	/// Fails with `StoreError::NotFound` if already absent.
	async fn delete(&self, id: SecretId) -> StoreResult<()>;

	/// Cheap reachability probe for health checks.
	async fn ping(&self) -> StoreResult<()>;
}
