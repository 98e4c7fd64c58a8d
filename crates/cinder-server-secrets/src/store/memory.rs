// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process key-value storage. Contents do not survive a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::RwLock;

use super::{MetadataUpdate, SecretStore};
use crate::error::{StoreError, StoreResult};
use crate::types::{Secret, SecretId, SecretMetadata};

#[derive(Debug, Default)]
pub struct MemorySecretStore {
	secrets: RwLock<HashMap<SecretId, Secret>>,
}

impl MemorySecretStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn len(&self) -> usize {
		self.secrets.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.secrets.read().await.is_empty()
	}
}

#[async_trait]
impl SecretStore for MemorySecretStore {
	fn backend_name(&self) -> &'static str {
		"memory"
	}

	async fn exists(&self, id: SecretId) -> StoreResult<bool> {
		Ok(self.secrets.read().await.contains_key(&id))
	}

	async fn get(&self, id: SecretId) -> StoreResult<Secret> {
		self
			.secrets
			.read()
			.await
			.get(&id)
			.cloned()
			.ok_or_else(|| StoreError::NotFound(id.to_string()))
	}

	async fn get_metadata(&self, id: SecretId) -> StoreResult<SecretMetadata> {
		self
			.secrets
			.read()
			.await
			.get(&id)
			.map(Secret::metadata)
			.ok_or_else(|| StoreError::NotFound(id.to_string()))
	}

	fn list(&self) -> BoxStream<'_, StoreResult<SecretMetadata>> {
		stream::once(async move {
			let snapshot: Vec<StoreResult<SecretMetadata>> = self
				.secrets
				.read()
				.await
				.values()
				.map(|s| Ok(s.metadata()))
				.collect();
			stream::iter(snapshot)
		})
		.flatten()
		.boxed()
	}

	async fn insert(&self, secret: &Secret) -> StoreResult<()> {
		let mut secrets = self.secrets.write().await;
		if secrets.contains_key(&secret.id) {
			return Err(StoreError::AlreadyExists(secret.id.to_string()));
		}
		secrets.insert(secret.id, secret.clone());
		tracing::debug!(secret_id = %secret.id, "secret inserted");
		Ok(())
	}

	async fn update_metadata(&self, id: SecretId, update: MetadataUpdate) -> StoreResult<()> {
		let mut secrets = self.secrets.write().await;
		let secret = secrets
			.get_mut(&id)
			.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
		if !update.precondition_holds(secret.remaining_reads) {
			return Err(StoreError::Conflict(id.to_string()));
		}
		update.apply_to(secret);
		Ok(())
	}

	async fn delete(&self, id: SecretId) -> StoreResult<()> {
		self
			.secrets
			.write()
			.await
			.remove(&id)
			.map(|_| ())
			.ok_or_else(|| StoreError::NotFound(id.to_string()))
	}

	async fn ping(&self) -> StoreResult<()> {
		Ok(())
	}
}
