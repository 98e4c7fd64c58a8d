// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret storage with SQLite backend.

use async_trait::async_trait;
use cinder_common_envelope::Envelope;
use cinder_server_db::{DbError, MetadataPatch, SecretMetadataRow, SecretRow, SecretsRepository};
use futures::stream::{BoxStream, StreamExt};
use sqlx::SqlitePool;
use tracing::instrument;

use super::{MetadataUpdate, SecretStore};
use crate::error::{StoreError, StoreResult};
use crate::types::{Secret, SecretId, SecretMetadata};

/// SQLite implementation of [`SecretStore`].
///
/// Read-decrement is a single `UPDATE ... WHERE remaining_reads = ?`, so it is
/// atomic across every process sharing the database file.
#[derive(Clone)]
pub struct SqliteSecretStore {
	repo: SecretsRepository,
}

impl SqliteSecretStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			repo: SecretsRepository::new(pool),
		}
	}
}

fn medium(wrap: fn(String) -> StoreError, err: DbError) -> StoreError {
	match err {
		DbError::NotFound(id) => StoreError::NotFound(id),
		DbError::Conflict(id) => StoreError::Conflict(id),
		other => wrap(other.to_string()),
	}
}

fn secret_from_row(row: SecretRow) -> StoreResult<Secret> {
	let id = row
		.id
		.parse::<SecretId>()
		.map_err(|e| StoreError::Read(format!("corrupt secret id '{}': {e}", row.id)))?;
	let envelope = Envelope::decode(&row.envelope)
		.map_err(|e| StoreError::Read(format!("corrupt envelope for {id}: {e}")))?;
	let attachments = row
		.attachments
		.iter()
		.map(|a| Envelope::decode(a))
		.collect::<Result<Vec<_>, _>>()
		.map_err(|e| StoreError::Read(format!("corrupt attachment for {id}: {e}")))?;

	Ok(Secret {
		id,
		envelope,
		attachments,
		password_protected: row.password_protected,
		remaining_reads: row.remaining_reads,
		created_at: row.created_at,
		expires_at: row.expires_at,
	})
}

fn metadata_from_row(row: SecretMetadataRow, wrap: fn(String) -> StoreError) -> StoreResult<SecretMetadata> {
	let id = row
		.id
		.parse::<SecretId>()
		.map_err(|e| wrap(format!("corrupt secret id '{}': {e}", row.id)))?;
	let attachment_count = usize::try_from(row.attachment_count)
		.map_err(|_| wrap(format!("corrupt attachment count {} for {id}", row.attachment_count)))?;
	Ok(SecretMetadata {
		id,
		attachment_count,
		password_protected: row.password_protected,
		remaining_reads: row.remaining_reads,
		created_at: row.created_at,
		expires_at: row.expires_at,
	})
}

#[async_trait]
impl SecretStore for SqliteSecretStore {
	fn backend_name(&self) -> &'static str {
		"sqlite"
	}

	#[instrument(skip(self), fields(secret_id = %id))]
	async fn exists(&self, id: SecretId) -> StoreResult<bool> {
		self
			.repo
			.exists(&id.to_string())
			.await
			.map_err(|e| medium(StoreError::Read, e))
	}

	#[instrument(skip(self), fields(secret_id = %id))]
	async fn get(&self, id: SecretId) -> StoreResult<Secret> {
		let row = self
			.repo
			.get(&id.to_string())
			.await
			.map_err(|e| medium(StoreError::Read, e))?
			.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
		secret_from_row(row)
	}

	#[instrument(skip(self), fields(secret_id = %id))]
	async fn get_metadata(&self, id: SecretId) -> StoreResult<SecretMetadata> {
		let row = self
			.repo
			.get_metadata(&id.to_string())
			.await
			.map_err(|e| medium(StoreError::Read, e))?
			.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
		metadata_from_row(row, StoreError::Read)
	}

	fn list(&self) -> BoxStream<'_, StoreResult<SecretMetadata>> {
		self
			.repo
			.list_metadata()
			.map(|row| {
				row
					.map_err(|e| StoreError::List(e.to_string()))
					.and_then(|r| metadata_from_row(r, StoreError::List))
			})
			.boxed()
	}

	#[instrument(skip(self, secret), fields(secret_id = %secret.id))]
	async fn insert(&self, secret: &Secret) -> StoreResult<()> {
		let row = SecretRow {
			id: secret.id.to_string(),
			envelope: secret.envelope.encode(),
			attachments: secret.attachments.iter().map(Envelope::encode).collect(),
			password_protected: secret.password_protected,
			remaining_reads: secret.remaining_reads,
			created_at: secret.created_at,
			expires_at: secret.expires_at,
		};

		self.repo.insert(&row).await.map_err(|e| match e {
			DbError::Conflict(id) => StoreError::AlreadyExists(id),
			other => StoreError::Write(other.to_string()),
		})
	}

	#[instrument(skip(self, update), fields(secret_id = %id))]
	async fn update_metadata(&self, id: SecretId, update: MetadataUpdate) -> StoreResult<()> {
		let patch = MetadataPatch {
			expires_at: update.expires_at,
			remaining_reads: update.remaining_reads,
			expect_remaining_reads: update.expect_remaining_reads,
		};
		self
			.repo
			.update_metadata(&id.to_string(), &patch)
			.await
			.map_err(|e| medium(StoreError::Write, e))
	}

	#[instrument(skip(self), fields(secret_id = %id))]
	async fn delete(&self, id: SecretId) -> StoreResult<()> {
		let deleted = self
			.repo
			.delete(&id.to_string())
			.await
			.map_err(|e| medium(StoreError::Delete, e))?;
		if deleted {
			Ok(())
		} else {
			Err(StoreError::NotFound(id.to_string()))
		}
	}

	async fn ping(&self) -> StoreResult<()> {
		sqlx::query("SELECT 1")
			.execute(self.repo.pool())
			.await
			.map(|_| ())
			.map_err(|e| StoreError::Read(e.to_string()))
	}
}
