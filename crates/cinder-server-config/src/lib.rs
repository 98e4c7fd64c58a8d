// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for the cinder server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`CINDER_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use cinder_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Server listening on {}", config.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, SYSTEM_CONFIG_PATH};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub storage: StorageConfig,
	pub policy: SecretPolicyConfig,
	pub jobs: JobsConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`CINDER_SERVER_*`)
/// 2. Config file (`/etc/cinder/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_config_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource::process()),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_config_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource::process()),
	])
}

/// Merge `sources` in precedence order, then finalize and validate.
pub fn load_config_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		http: layer.http.unwrap_or_default().finalize(),
		storage: layer.storage.unwrap_or_default().finalize(),
		policy: layer.policy.unwrap_or_default().finalize(),
		jobs: layer.jobs.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		host = %config.http.host,
		port = config.http.port,
		backend = %config.storage.backend,
		durations = ?config.policy.durations,
		require_burn = config.policy.require_burn,
		require_password = config.policy.require_password,
		deny_slow_burn = config.policy.deny_slow_burn,
		sweep_enabled = config.jobs.sweep_enabled,
		"Server configuration loaded"
	);

	Ok(config)
}

/// Validate cross-field configuration rules.
fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	config.policy.validate()?;

	if config.jobs.sweep_interval_secs == 0 {
		return Err(ConfigError::Validation(
			"jobs.sweep_interval_secs must be greater than zero".to_string(),
		));
	}
	if config.storage.backend == StorageBackend::Sqlite && config.storage.max_connections == 0 {
		return Err(ConfigError::Validation(
			"storage.max_connections must be greater than zero".to_string(),
		));
	}

	Ok(())
}
