// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Jobs configuration section.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct JobsConfigLayer {
	pub sweep_enabled: Option<bool>,
	pub sweep_interval_secs: Option<u64>,
}

impl JobsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.sweep_enabled.is_some() {
			self.sweep_enabled = other.sweep_enabled;
		}
		if other.sweep_interval_secs.is_some() {
			self.sweep_interval_secs = other.sweep_interval_secs;
		}
	}

	pub fn finalize(self) -> JobsConfig {
		JobsConfig {
			sweep_enabled: self.sweep_enabled.unwrap_or(true),
			sweep_interval_secs: self.sweep_interval_secs.unwrap_or(60),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobsConfig {
	pub sweep_enabled: bool,
	pub sweep_interval_secs: u64,
}

impl Default for JobsConfig {
	fn default() -> Self {
		JobsConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = JobsConfig::default();
		assert!(config.sweep_enabled);
		assert_eq!(config.sweep_interval_secs, 60);
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = JobsConfigLayer {
			sweep_enabled: Some(true),
			sweep_interval_secs: Some(60),
		};
		base.merge(JobsConfigLayer {
			sweep_enabled: None,
			sweep_interval_secs: Some(10),
		});
		assert_eq!(base.sweep_enabled, Some(true));
		assert_eq!(base.sweep_interval_secs, Some(10));
	}

	#[test]
	fn test_deserialize_layer_empty() {
		let layer: JobsConfigLayer = toml::from_str("").unwrap();
		assert!(layer.sweep_enabled.is_none());
		assert!(layer.sweep_interval_secs.is_none());
	}
}
