// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secrets repository for database operations.
//!
//! One row per secret. The envelope and attachment envelopes are stored as
//! opaque text; the server never interprets them beyond structural checks
//! made before they reach this layer.

use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use sqlx::{
	sqlite::{SqlitePool, SqliteRow},
	Row,
};

use crate::error::DbError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRow {
	pub id: String,
	pub envelope: String,
	pub attachments: Vec<String>,
	pub password_protected: bool,
	pub remaining_reads: i64,
	pub created_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretMetadataRow {
	pub id: String,
	pub attachment_count: i64,
	pub password_protected: bool,
	pub remaining_reads: i64,
	pub created_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
}

/// Partial update of the two mutable columns.
///
/// When `expect_remaining_reads` is set the update only applies if the stored
/// counter still holds that value, which makes read-decrement a single
/// compare-and-swap statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataPatch {
	pub expires_at: Option<DateTime<Utc>>,
	pub remaining_reads: Option<i64>,
	pub expect_remaining_reads: Option<i64>,
}

#[derive(Clone)]
pub struct SecretsRepository {
	pool: SqlitePool,
}

impl SecretsRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	#[tracing::instrument(skip(self), fields(secret_id = %id))]
	pub async fn exists(&self, id: &str) -> Result<bool, DbError> {
		let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM secrets WHERE id = ?")
			.bind(id)
			.fetch_optional(&self.pool)
			.await?;
		Ok(row.is_some())
	}

	/// Insert a new secret.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if a secret with the same id already exists.
	#[tracing::instrument(skip(self, row), fields(secret_id = %row.id))]
	pub async fn insert(&self, row: &SecretRow) -> Result<(), DbError> {
		let attachments = serde_json::to_string(&row.attachments)?;

		let result = sqlx::query(
			r#"
			INSERT INTO secrets (
				id, envelope, attachments, attachment_count, password_protected,
				remaining_reads, created_at, expires_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&row.id)
		.bind(&row.envelope)
		.bind(&attachments)
		.bind(row.attachments.len() as i64)
		.bind(row.password_protected)
		.bind(row.remaining_reads)
		.bind(row.created_at.to_rfc3339())
		.bind(row.expires_at.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(DbError::from);

		match result {
			Ok(_) => {
				tracing::debug!(secret_id = %row.id, "secret inserted");
				Ok(())
			}
			Err(e) if e.is_unique_violation() => Err(DbError::Conflict(row.id.clone())),
			Err(e) => Err(e),
		}
	}

	#[tracing::instrument(skip(self), fields(secret_id = %id))]
	pub async fn get(&self, id: &str) -> Result<Option<SecretRow>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, envelope, attachments, password_protected, remaining_reads,
			       created_at, expires_at
			FROM secrets
			WHERE id = ?
			"#,
		)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| parse_secret_row(&r)).transpose()
	}

	#[tracing::instrument(skip(self), fields(secret_id = %id))]
	pub async fn get_metadata(&self, id: &str) -> Result<Option<SecretMetadataRow>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, attachment_count, password_protected, remaining_reads,
			       created_at, expires_at
			FROM secrets
			WHERE id = ?
			"#,
		)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| parse_metadata_row(&r)).transpose()
	}

	/// Stream metadata for every stored secret. Rows are fetched lazily as
	/// the stream is polled.
	pub fn list_metadata(&self) -> BoxStream<'_, Result<SecretMetadataRow, DbError>> {
		sqlx::query(
			r#"
			SELECT id, attachment_count, password_protected, remaining_reads,
			       created_at, expires_at
			FROM secrets
			ORDER BY expires_at
			"#,
		)
		.fetch(&self.pool)
		.map(|row| row.map_err(DbError::from).and_then(|r| parse_metadata_row(&r)))
		.boxed()
	}

	/// Apply a [`MetadataPatch`].
	///
	/// # Errors
	/// - `DbError::NotFound` if no secret has this id.
	/// - `DbError::Conflict` if `expect_remaining_reads` did not match.
	#[tracing::instrument(skip(self, patch), fields(secret_id = %id))]
	pub async fn update_metadata(&self, id: &str, patch: &MetadataPatch) -> Result<(), DbError> {
		let result = sqlx::query(
			r#"
			UPDATE secrets
			SET expires_at = COALESCE(?, expires_at),
			    remaining_reads = COALESCE(?, remaining_reads)
			WHERE id = ? AND (? IS NULL OR remaining_reads = ?)
			"#,
		)
		.bind(patch.expires_at.map(|t| t.to_rfc3339()))
		.bind(patch.remaining_reads)
		.bind(id)
		.bind(patch.expect_remaining_reads)
		.bind(patch.expect_remaining_reads)
		.execute(&self.pool)
		.await?;

		if result.rows_affected() > 0 {
			tracing::debug!(secret_id = %id, "secret metadata updated");
			return Ok(());
		}

		if self.exists(id).await? {
			Err(DbError::Conflict(id.to_string()))
		} else {
			Err(DbError::NotFound(id.to_string()))
		}
	}

	/// Delete a secret. Returns `false` if nothing was deleted.
	#[tracing::instrument(skip(self), fields(secret_id = %id))]
	pub async fn delete(&self, id: &str) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM secrets WHERE id = ?")
			.bind(id)
			.execute(&self.pool)
			.await?;

		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::debug!(secret_id = %id, "secret deleted");
		}
		Ok(deleted)
	}
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, DbError> {
	let raw: String = row.get(column);
	DateTime::parse_from_rfc3339(&raw)
		.map(|t| t.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
}

fn parse_secret_row(row: &SqliteRow) -> Result<SecretRow, DbError> {
	let attachments: String = row.get("attachments");
	Ok(SecretRow {
		id: row.get("id"),
		envelope: row.get("envelope"),
		attachments: serde_json::from_str(&attachments)?,
		password_protected: row.get::<i64, _>("password_protected") != 0,
		remaining_reads: row.get("remaining_reads"),
		created_at: parse_timestamp(row, "created_at")?,
		expires_at: parse_timestamp(row, "expires_at")?,
	})
}

fn parse_metadata_row(row: &SqliteRow) -> Result<SecretMetadataRow, DbError> {
	Ok(SecretMetadataRow {
		id: row.get("id"),
		attachment_count: row.get("attachment_count"),
		password_protected: row.get::<i64, _>("password_protected") != 0,
		remaining_reads: row.get("remaining_reads"),
		created_at: parse_timestamp(row, "created_at")?,
		expires_at: parse_timestamp(row, "expires_at")?,
	})
}
