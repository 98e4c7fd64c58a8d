// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret submission policy.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_MAX_SECRET_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_DURATIONS: [&str; 4] = ["1h", "1d", "1w", "2w"];
const DEFAULT_MAX_SLOW_BURN_READS: u32 = 10;
const DEFAULT_SLOW_BURN_WINDOW_SECS: u64 = 300;

/// Policy configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq)]
pub struct SecretPolicyConfig {
	pub max_secret_bytes: u64,
	/// Allow-listed lifetimes as submitted by clients, e.g. `"1d"`.
	pub durations: Vec<String>,
	pub require_burn: bool,
	pub require_password: bool,
	pub deny_slow_burn: bool,
	pub max_slow_burn_reads: u32,
	pub slow_burn_window_secs: u64,
}

impl Default for SecretPolicyConfig {
	fn default() -> Self {
		PolicyConfigLayer::default().finalize()
	}
}

impl SecretPolicyConfig {
	pub fn slow_burn_window(&self) -> Duration {
		Duration::from_secs(self.slow_burn_window_secs)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_secret_bytes == 0 {
			return Err(ConfigError::Validation(
				"policy.max_secret_bytes must be greater than zero".to_string(),
			));
		}
		if self.durations.is_empty() {
			return Err(ConfigError::Validation(
				"policy.durations must list at least one duration".to_string(),
			));
		}
		for key in &self.durations {
			let parsed = humantime::parse_duration(key).map_err(|e| ConfigError::InvalidValue {
				key: "policy.durations".to_string(),
				message: format!("'{key}': {e}"),
			})?;
			if parsed.is_zero() {
				return Err(ConfigError::InvalidValue {
					key: "policy.durations".to_string(),
					message: format!("'{key}' is zero"),
				});
			}
		}
		if self.max_slow_burn_reads < 2 {
			return Err(ConfigError::Validation(
				"policy.max_slow_burn_reads must be at least 2".to_string(),
			));
		}
		if self.slow_burn_window_secs == 0 {
			return Err(ConfigError::Validation(
				"policy.slow_burn_window_secs must be greater than zero".to_string(),
			));
		}
		Ok(())
	}
}

/// Policy configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfigLayer {
	#[serde(default)]
	pub max_secret_bytes: Option<u64>,
	#[serde(default)]
	pub durations: Option<Vec<String>>,
	#[serde(default)]
	pub require_burn: Option<bool>,
	#[serde(default)]
	pub require_password: Option<bool>,
	#[serde(default)]
	pub deny_slow_burn: Option<bool>,
	#[serde(default)]
	pub max_slow_burn_reads: Option<u32>,
	#[serde(default)]
	pub slow_burn_window_secs: Option<u64>,
}

impl PolicyConfigLayer {
	pub fn merge(&mut self, other: PolicyConfigLayer) {
		if other.max_secret_bytes.is_some() {
			self.max_secret_bytes = other.max_secret_bytes;
		}
		if other.durations.is_some() {
			self.durations = other.durations;
		}
		if other.require_burn.is_some() {
			self.require_burn = other.require_burn;
		}
		if other.require_password.is_some() {
			self.require_password = other.require_password;
		}
		if other.deny_slow_burn.is_some() {
			self.deny_slow_burn = other.deny_slow_burn;
		}
		if other.max_slow_burn_reads.is_some() {
			self.max_slow_burn_reads = other.max_slow_burn_reads;
		}
		if other.slow_burn_window_secs.is_some() {
			self.slow_burn_window_secs = other.slow_burn_window_secs;
		}
	}

	pub fn finalize(self) -> SecretPolicyConfig {
		SecretPolicyConfig {
			max_secret_bytes: self.max_secret_bytes.unwrap_or(DEFAULT_MAX_SECRET_BYTES),
			durations: self
				.durations
				.unwrap_or_else(|| DEFAULT_DURATIONS.iter().map(|d| d.to_string()).collect()),
			require_burn: self.require_burn.unwrap_or(false),
			require_password: self.require_password.unwrap_or(false),
			deny_slow_burn: self.deny_slow_burn.unwrap_or(false),
			max_slow_burn_reads: self
				.max_slow_burn_reads
				.unwrap_or(DEFAULT_MAX_SLOW_BURN_READS),
			slow_burn_window_secs: self
				.slow_burn_window_secs
				.unwrap_or(DEFAULT_SLOW_BURN_WINDOW_SECS),
		}
	}
}
