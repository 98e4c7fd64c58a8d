// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Flat-file storage: one JSON document per secret, named `<id>.json`.
//!
//! Documents are never written in place. New secrets are written to a
//! temporary file and hard-linked into place, which fails if the id is
//! taken; updates are written to a temporary file and renamed over the
//! original. Mutations are serialized through a lock so the conditional
//! read-decrement holds within the process that owns the directory.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{MetadataUpdate, SecretStore};
use crate::error::{StoreError, StoreResult};
use crate::types::{Secret, SecretId, SecretMetadata};

const EXTENSION: &str = "json";

#[derive(Debug)]
pub struct FileSecretStore {
	dir: PathBuf,
	write_lock: Mutex<()>,
}

impl FileSecretStore {
	/// Opens `dir`, creating it if needed.
	pub async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
		let dir = dir.into();
		tokio::fs::create_dir_all(&dir)
			.await
			.map_err(|e| StoreError::Write(format!("create {}: {e}", dir.display())))?;
		Ok(Self {
			dir,
			write_lock: Mutex::new(()),
		})
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn path_for(&self, id: SecretId) -> PathBuf {
		self.dir.join(format!("{id}.{EXTENSION}"))
	}

	fn temp_path(&self) -> PathBuf {
		self.dir.join(format!(".tmp-{}", Uuid::new_v4()))
	}

	async fn write_temp(&self, secret: &Secret) -> StoreResult<PathBuf> {
		let bytes = serde_json::to_vec(secret)
			.map_err(|e| StoreError::Write(format!("serialize {}: {e}", secret.id)))?;
		let temp = self.temp_path();
		tokio::fs::write(&temp, bytes)
			.await
			.map_err(|e| StoreError::Write(format!("write {}: {e}", temp.display())))?;
		Ok(temp)
	}
}

/// Secret id encoded in a document file name, if it is one.
fn id_from_path(path: &Path) -> Option<SecretId> {
	if path.extension()? != EXTENSION {
		return None;
	}
	path.file_stem()?.to_str()?.parse().ok()
}

async fn read_secret(path: &Path, wrap: fn(String) -> StoreError) -> StoreResult<Secret> {
	let bytes = match tokio::fs::read(path).await {
		Ok(bytes) => bytes,
		Err(e) if e.kind() == io::ErrorKind::NotFound => {
			return Err(StoreError::NotFound(path.display().to_string()))
		}
		Err(e) => return Err(wrap(format!("read {}: {e}", path.display()))),
	};
	serde_json::from_slice(&bytes).map_err(|e| wrap(format!("parse {}: {e}", path.display())))
}

enum ListState {
	Start(PathBuf),
	Reading(tokio::fs::ReadDir),
	Done,
}

#[async_trait]
impl SecretStore for FileSecretStore {
	fn backend_name(&self) -> &'static str {
		"file"
	}

	async fn exists(&self, id: SecretId) -> StoreResult<bool> {
		tokio::fs::try_exists(self.path_for(id))
			.await
			.map_err(|e| StoreError::Read(e.to_string()))
	}

	async fn get(&self, id: SecretId) -> StoreResult<Secret> {
		read_secret(&self.path_for(id), StoreError::Read)
			.await
			.map_err(|e| match e {
				StoreError::NotFound(_) => StoreError::NotFound(id.to_string()),
				other => other,
			})
	}

	async fn get_metadata(&self, id: SecretId) -> StoreResult<SecretMetadata> {
		self.get(id).await.map(|s| s.metadata())
	}

	fn list(&self) -> BoxStream<'_, StoreResult<SecretMetadata>> {
		stream::unfold(ListState::Start(self.dir.clone()), |state| async move {
			let mut entries = match state {
				ListState::Start(dir) => match tokio::fs::read_dir(&dir).await {
					Ok(entries) => entries,
					Err(e) => {
						let err = StoreError::List(format!("read {}: {e}", dir.display()));
						return Some((Err(err), ListState::Done));
					}
				},
				ListState::Reading(entries) => entries,
				ListState::Done => return None,
			};

			loop {
				let entry = match entries.next_entry().await {
					Ok(Some(entry)) => entry,
					Ok(None) => return None,
					Err(e) => return Some((Err(StoreError::List(e.to_string())), ListState::Done)),
				};
				let path = entry.path();
				if id_from_path(&path).is_none() {
					continue;
				}
				match read_secret(&path, StoreError::List).await {
					// Deleted between listing and reading.
					Err(StoreError::NotFound(_)) => continue,
					result => {
						return Some((result.map(|s| s.metadata()), ListState::Reading(entries)));
					}
				}
			}
		})
		.boxed()
	}

	async fn insert(&self, secret: &Secret) -> StoreResult<()> {
		let _guard = self.write_lock.lock().await;
		let temp = self.write_temp(secret).await?;
		let target = self.path_for(secret.id);

		let linked = tokio::fs::hard_link(&temp, &target).await;
		let _ = tokio::fs::remove_file(&temp).await;

		match linked {
			Ok(()) => {
				tracing::debug!(secret_id = %secret.id, "secret written");
				Ok(())
			}
			Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
				Err(StoreError::AlreadyExists(secret.id.to_string()))
			}
			Err(e) => Err(StoreError::Write(format!("link {}: {e}", target.display()))),
		}
	}

	async fn update_metadata(&self, id: SecretId, update: MetadataUpdate) -> StoreResult<()> {
		let _guard = self.write_lock.lock().await;
		let path = self.path_for(id);
		let mut secret = read_secret(&path, StoreError::Write)
			.await
			.map_err(|e| match e {
				StoreError::NotFound(_) => StoreError::NotFound(id.to_string()),
				other => other,
			})?;

		if !update.precondition_holds(secret.remaining_reads) {
			return Err(StoreError::Conflict(id.to_string()));
		}
		update.apply_to(&mut secret);

		let temp = self.write_temp(&secret).await?;
		if let Err(e) = tokio::fs::rename(&temp, &path).await {
			let _ = tokio::fs::remove_file(&temp).await;
			return Err(StoreError::Write(format!("rename {}: {e}", path.display())));
		}
		Ok(())
	}

	async fn delete(&self, id: SecretId) -> StoreResult<()> {
		let _guard = self.write_lock.lock().await;
		match tokio::fs::remove_file(self.path_for(id)).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(id.to_string())),
			Err(e) => Err(StoreError::Delete(e.to_string())),
		}
	}

	async fn ping(&self) -> StoreResult<()> {
		tokio::fs::metadata(&self.dir)
			.await
			.map(|_| ())
			.map_err(|e| StoreError::Read(format!("{}: {e}", self.dir.display())))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::TryStreamExt;

	#[test]
	fn only_document_names_parse() {
		let id = SecretId::generate();
		assert_eq!(id_from_path(Path::new(&format!("/x/{id}.json"))), Some(id));
		assert_eq!(id_from_path(Path::new(&format!("/x/{id}.txt"))), None);
		assert_eq!(id_from_path(Path::new("/x/.tmp-abc")), None);
		assert_eq!(id_from_path(Path::new("/x/readme.json")), None);
	}

	#[tokio::test]
	async fn corrupt_document_does_not_stop_listing() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileSecretStore::open(dir.path()).await.unwrap();
		tokio::fs::write(dir.path().join(format!("{}.json", SecretId::generate())), b"{")
			.await
			.unwrap();
		tokio::fs::write(dir.path().join("unrelated.txt"), b"hi").await.unwrap();

		let items: Vec<StoreResult<SecretMetadata>> = store.list().collect().await;
		assert_eq!(items.len(), 1);
		assert!(matches!(items[0], Err(StoreError::List(_))));
	}

	#[tokio::test]
	async fn missing_directory_fails_listing() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileSecretStore::open(dir.path().join("secrets")).await.unwrap();
		tokio::fs::remove_dir(store.dir()).await.unwrap();

		let err = store.list().try_collect::<Vec<_>>().await.unwrap_err();
		assert!(matches!(err, StoreError::List(_)));
		assert!(store.ping().await.is_err());
	}
}
