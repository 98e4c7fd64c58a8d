// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage backend selection.

use std::sync::Arc;

use cinder_server_config::{StorageBackend, StorageConfig};
use cinder_server_secrets::{FileSecretStore, MemorySecretStore, SecretStore, SqliteSecretStore};

use crate::error::ServerError;

/// Opens the configured backend. SQLite databases are migrated before use.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn SecretStore>, ServerError> {
	let store: Arc<dyn SecretStore> = match config.backend {
		StorageBackend::Sqlite => {
			let pool = cinder_server_db::create_pool(&config.database_url, config.max_connections).await?;
			cinder_server_db::run_migrations(&pool).await?;
			Arc::new(SqliteSecretStore::new(pool))
		}
		StorageBackend::File => Arc::new(FileSecretStore::open(&config.file_dir).await?),
		StorageBackend::Memory => {
			tracing::warn!("memory storage selected, secrets will not survive a restart");
			Arc::new(MemorySecretStore::new())
		}
	};

	tracing::info!(backend = store.backend_name(), "storage backend ready");
	Ok(store)
}
