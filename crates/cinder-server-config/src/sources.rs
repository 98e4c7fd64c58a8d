// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	HttpConfigLayer, JobsConfigLayer, LoggingConfigLayer, PolicyConfigLayer, StorageBackend,
	StorageConfigLayer,
};

/// Default location of the server config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/cinder/server.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `CINDER_SERVER_<FIELD>`. Empty values count as unset.
pub struct EnvSource {
	vars: Option<HashMap<String, String>>,
}

impl EnvSource {
	/// Reads the process environment.
	pub fn process() -> Self {
		Self { vars: None }
	}

	/// Reads from a fixed set of variables instead of the process environment.
	pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			vars: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
		}
	}

	fn var(&self, name: &str) -> Option<String> {
		let value = match &self.vars {
			Some(vars) => vars.get(name).cloned(),
			None => std::env::var(name).ok(),
		};
		value.filter(|s| !s.is_empty())
	}

	fn bool(&self, name: &str) -> Option<bool> {
		self
			.var(name)
			.map(|v| v.eq_ignore_ascii_case("true") || v == "1")
	}

	fn parsed<T>(&self, name: &str) -> Result<Option<T>, ConfigError>
	where
		T: FromStr,
		T::Err: std::fmt::Display,
	{
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|e| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid value '{v}': {e}"),
			}),
			None => Ok(None),
		}
	}

	fn list(&self, name: &str) -> Option<Vec<String>> {
		self.var(name).map(|s| {
			s.split(',')
				.map(|s| s.trim().to_string())
				.filter(|s| !s.is_empty())
				.collect()
		})
	}

	fn load_http(&self) -> Result<HttpConfigLayer, ConfigError> {
		Ok(HttpConfigLayer {
			host: self.var("CINDER_SERVER_HOST"),
			port: self.parsed("CINDER_SERVER_PORT")?,
		})
	}

	fn load_storage(&self) -> Result<StorageConfigLayer, ConfigError> {
		Ok(StorageConfigLayer {
			backend: self.parsed::<StorageBackend>("CINDER_SERVER_STORAGE_BACKEND")?,
			database_url: self.var("CINDER_SERVER_DATABASE_URL"),
			max_connections: self.parsed("CINDER_SERVER_DATABASE_MAX_CONNECTIONS")?,
			file_dir: self.var("CINDER_SERVER_STORAGE_DIR").map(PathBuf::from),
		})
	}

	fn load_policy(&self) -> Result<PolicyConfigLayer, ConfigError> {
		Ok(PolicyConfigLayer {
			max_secret_bytes: self.parsed("CINDER_SERVER_MAX_SECRET_BYTES")?,
			durations: self.list("CINDER_SERVER_DURATIONS"),
			require_burn: self.bool("CINDER_SERVER_REQUIRE_BURN"),
			require_password: self.bool("CINDER_SERVER_REQUIRE_PASSWORD"),
			deny_slow_burn: self.bool("CINDER_SERVER_DENY_SLOW_BURN"),
			max_slow_burn_reads: self.parsed("CINDER_SERVER_MAX_SLOW_BURN_READS")?,
			slow_burn_window_secs: self.parsed("CINDER_SERVER_SLOW_BURN_WINDOW_SECS")?,
		})
	}

	fn load_jobs(&self) -> Result<JobsConfigLayer, ConfigError> {
		Ok(JobsConfigLayer {
			sweep_enabled: self.bool("CINDER_SERVER_SWEEP_ENABLED"),
			sweep_interval_secs: self.parsed("CINDER_SERVER_SWEEP_INTERVAL_SECS")?,
		})
	}

	fn load_logging(&self) -> Result<LoggingConfigLayer, ConfigError> {
		Ok(LoggingConfigLayer {
			level: self.var("CINDER_SERVER_LOG_LEVEL"),
			json: self.bool("CINDER_SERVER_LOG_JSON"),
		})
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(self.load_http()?),
			storage: Some(self.load_storage()?),
			policy: Some(self.load_policy()?),
			jobs: Some(self.load_jobs()?),
			logging: Some(self.load_logging()?),
		})
	}
}
