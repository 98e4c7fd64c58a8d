// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage backend configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

const DEFAULT_DATABASE_URL: &str = "sqlite:./cinder.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_FILE_DIR: &str = "./secrets";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
	#[default]
	Sqlite,
	File,
	Memory,
}

impl StorageBackend {
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageBackend::Sqlite => "sqlite",
			StorageBackend::File => "file",
			StorageBackend::Memory => "memory",
		}
	}
}

impl fmt::Display for StorageBackend {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for StorageBackend {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"sqlite" => Ok(StorageBackend::Sqlite),
			"file" => Ok(StorageBackend::File),
			"memory" => Ok(StorageBackend::Memory),
			other => Err(format!("unknown storage backend '{other}'")),
		}
	}
}

/// Storage configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct StorageConfig {
	pub backend: StorageBackend,
	pub database_url: String,
	pub max_connections: u32,
	pub file_dir: PathBuf,
}

impl Default for StorageConfig {
	fn default() -> Self {
		StorageConfigLayer::default().finalize()
	}
}

/// Storage configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfigLayer {
	#[serde(default)]
	pub backend: Option<StorageBackend>,
	#[serde(default)]
	pub database_url: Option<String>,
	#[serde(default)]
	pub max_connections: Option<u32>,
	#[serde(default)]
	pub file_dir: Option<PathBuf>,
}

impl StorageConfigLayer {
	pub fn merge(&mut self, other: StorageConfigLayer) {
		if other.backend.is_some() {
			self.backend = other.backend;
		}
		if other.database_url.is_some() {
			self.database_url = other.database_url;
		}
		if other.max_connections.is_some() {
			self.max_connections = other.max_connections;
		}
		if other.file_dir.is_some() {
			self.file_dir = other.file_dir;
		}
	}

	pub fn finalize(self) -> StorageConfig {
		StorageConfig {
			backend: self.backend.unwrap_or_default(),
			database_url: self
				.database_url
				.unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
			max_connections: self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
			file_dir: self.file_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_DIR)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = StorageConfig::default();
		assert_eq!(config.backend, StorageBackend::Sqlite);
		assert_eq!(config.database_url, "sqlite:./cinder.db");
		assert_eq!(config.max_connections, 8);
		assert_eq!(config.file_dir, PathBuf::from("./secrets"));
	}

	#[test]
	fn test_backend_parse() {
		assert_eq!("FILE".parse::<StorageBackend>(), Ok(StorageBackend::File));
		assert_eq!("memory".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
		assert!("postgres".parse::<StorageBackend>().is_err());
	}

	#[test]
	fn test_deserialize_layer_partial() {
		let layer: StorageConfigLayer = toml::from_str(
			r#"
backend = "file"
file_dir = "/var/lib/cinder"
"#,
		)
		.unwrap();
		assert_eq!(layer.backend, Some(StorageBackend::File));
		assert_eq!(layer.file_dir, Some(PathBuf::from("/var/lib/cinder")));
		assert!(layer.database_url.is_none());
	}
}
