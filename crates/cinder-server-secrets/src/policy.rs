// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server policy a submission must satisfy before it is stored.

use std::time::Duration;

use crate::error::{SecretsError, SecretsResult};
use crate::types::{BurnMode, Submission, ValidatedSubmission};

pub const DEFAULT_MAX_SECRET_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_DURATIONS: [&str; 4] = ["1h", "1d", "1w", "2w"];
pub const DEFAULT_MAX_SLOW_BURN_READS: u32 = 10;
pub const DEFAULT_SLOW_BURN_WINDOW: Duration = Duration::from_secs(300);

/// Allow-list of lifetimes a client may pick from, keyed by the exact string
/// the client sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationTable {
	entries: Vec<(String, Duration)>,
}

impl DurationTable {
	/// Builds a table from humantime strings such as `1h` or `2weeks`.
	pub fn parse<S: AsRef<str>>(keys: &[S]) -> Result<Self, String> {
		let mut entries = Vec::with_capacity(keys.len());
		for key in keys {
			let key = key.as_ref().trim();
			let duration =
				humantime::parse_duration(key).map_err(|e| format!("invalid duration '{key}': {e}"))?;
			if duration.is_zero() {
				return Err(format!("duration '{key}' must be greater than zero"));
			}
			if !entries.iter().any(|(k, _): &(String, Duration)| k == key) {
				entries.push((key.to_string(), duration));
			}
		}
		if entries.is_empty() {
			return Err("at least one duration must be allowed".to_string());
		}
		Ok(Self { entries })
	}

	pub fn lookup(&self, key: &str) -> Option<Duration> {
		self.entries
			.iter()
			.find(|(k, _)| k == key)
			.map(|(_, d)| *d)
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|(k, _)| k.as_str())
	}
}

impl Default for DurationTable {
	fn default() -> Self {
		Self {
			entries: DEFAULT_DURATIONS
				.iter()
				.filter_map(|k| humantime::parse_duration(k).ok().map(|d| (k.to_string(), d)))
				.collect(),
		}
	}
}

#[derive(Debug, Clone)]
pub struct PolicyConfig {
	pub max_secret_bytes: u64,
	pub durations: DurationTable,
	pub require_burn: bool,
	pub require_password: bool,
	pub deny_slow_burn: bool,
	pub max_slow_burn_reads: u32,
	/// After the first read of a slow-burn secret, the rest must happen
	/// within this window.
	pub slow_burn_window: Duration,
}

impl Default for PolicyConfig {
	fn default() -> Self {
		Self {
			max_secret_bytes: DEFAULT_MAX_SECRET_BYTES,
			durations: DurationTable::default(),
			require_burn: false,
			require_password: false,
			deny_slow_burn: false,
			max_slow_burn_reads: DEFAULT_MAX_SLOW_BURN_READS,
			slow_burn_window: DEFAULT_SLOW_BURN_WINDOW,
		}
	}
}

impl PolicyConfig {
	/// Checks a submission, stopping at the first violated rule.
	///
	/// Order: size, duration, slow-burn denial, burn requirement, password
	/// requirement, slow-burn bounds.
	pub fn validate_submission(&self, submission: Submission) -> SecretsResult<ValidatedSubmission> {
		let size = submission.total_bytes();
		if size > self.max_secret_bytes {
			return Err(SecretsError::SizeLimit {
				size,
				max: self.max_secret_bytes,
			});
		}

		let lifetime = self
			.durations
			.lookup(&submission.duration)
			.ok_or_else(|| SecretsError::InvalidDuration(submission.duration.clone()))?;

		if self.deny_slow_burn && matches!(submission.burn_mode, BurnMode::SlowBurn(_)) {
			return Err(SecretsError::PolicyViolation(
				"slow burn is disabled on this server".to_string(),
			));
		}

		if self.require_burn && submission.burn_mode == BurnMode::Unlimited {
			return Err(SecretsError::PolicyViolation(
				"secrets must burn after reading".to_string(),
			));
		}

		if self.require_password && !submission.password_protected {
			return Err(SecretsError::PolicyViolation(
				"secrets must be password protected".to_string(),
			));
		}

		if let BurnMode::SlowBurn(reads) = submission.burn_mode {
			if reads < 2 || reads > self.max_slow_burn_reads {
				return Err(SecretsError::PolicyViolation(format!(
					"slow burn must allow between 2 and {} reads",
					self.max_slow_burn_reads
				)));
			}
		}

		Ok(ValidatedSubmission {
			envelope: submission.envelope,
			attachments: submission.attachments,
			lifetime,
			remaining_reads: submission.burn_mode.initial_reads(),
			password_protected: submission.password_protected,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use cinder_common_envelope::{CipherAlgorithm, Envelope, KeyAlgorithm};
	use std::collections::BTreeMap;

	fn submission(bytes: usize, duration: &str, burn_mode: BurnMode, password: bool) -> Submission {
		let envelope = Envelope::new(
			CipherAlgorithm::Aes256Gcm,
			KeyAlgorithm::Pbkdf2,
			BTreeMap::new(),
			vec![0u8; bytes],
		)
		.unwrap();
		Submission {
			envelope,
			attachments: Vec::new(),
			duration: duration.to_string(),
			burn_mode,
			password_protected: password,
		}
	}

	#[test]
	fn default_table_has_expected_entries() {
		let table = DurationTable::default();
		assert_eq!(table.keys().collect::<Vec<_>>(), DEFAULT_DURATIONS);
		assert_eq!(table.lookup("1d"), Some(Duration::from_secs(86_400)));
		assert_eq!(table.lookup("3d"), None);
	}

	#[test]
	fn table_rejects_bad_entries() {
		assert!(DurationTable::parse(&["forever"]).is_err());
		assert!(DurationTable::parse(&["0s"]).is_err());
		assert!(DurationTable::parse::<&str>(&[]).is_err());
		let table = DurationTable::parse(&["10m", "10m", "1h"]).unwrap();
		assert_eq!(table.keys().count(), 2);
	}

	#[test]
	fn accepts_valid_submission() {
		let policy = PolicyConfig::default();
		let validated = policy
			.validate_submission(submission(16, "1w", BurnMode::SlowBurn(3), false))
			.unwrap();
		assert_eq!(validated.remaining_reads, 3);
		assert_eq!(validated.lifetime, Duration::from_secs(7 * 86_400));
	}

	#[test]
	fn size_checked_first() {
		let policy = PolicyConfig {
			max_secret_bytes: 8,
			require_password: true,
			..Default::default()
		};
		let err = policy
			.validate_submission(submission(9, "nope", BurnMode::Unlimited, false))
			.unwrap_err();
		assert!(matches!(err, SecretsError::SizeLimit { size: 9, max: 8 }));

		assert!(policy
			.validate_submission(submission(8, "1h", BurnMode::Burn, true))
			.is_ok());
	}

	#[test]
	fn unknown_duration_rejected() {
		let err = PolicyConfig::default()
			.validate_submission(submission(1, "1y", BurnMode::Burn, false))
			.unwrap_err();
		assert_eq!(err, SecretsError::InvalidDuration("1y".to_string()));
	}

	#[test]
	fn deny_slow_burn_applies_before_require_burn() {
		let policy = PolicyConfig {
			deny_slow_burn: true,
			require_burn: true,
			..Default::default()
		};
		let err = policy
			.validate_submission(submission(1, "1h", BurnMode::SlowBurn(3), false))
			.unwrap_err();
		assert!(matches!(err, SecretsError::PolicyViolation(ref m) if m.contains("slow burn")));
		assert!(policy
			.validate_submission(submission(1, "1h", BurnMode::Burn, false))
			.is_ok());
	}

	#[test]
	fn require_burn_rejects_unlimited() {
		let policy = PolicyConfig {
			require_burn: true,
			..Default::default()
		};
		let err = policy
			.validate_submission(submission(1, "1h", BurnMode::Unlimited, false))
			.unwrap_err();
		assert!(matches!(err, SecretsError::PolicyViolation(_)));
	}

	#[test]
	fn require_password_rejects_unprotected() {
		let policy = PolicyConfig {
			require_password: true,
			..Default::default()
		};
		let err = policy
			.validate_submission(submission(1, "1h", BurnMode::Burn, false))
			.unwrap_err();
		assert!(matches!(err, SecretsError::PolicyViolation(ref m) if m.contains("password")));
	}

	#[test]
	fn slow_burn_bounds_enforced() {
		let policy = PolicyConfig::default();
		for reads in [0, 1, DEFAULT_MAX_SLOW_BURN_READS + 1] {
			let err = policy
				.validate_submission(submission(1, "1h", BurnMode::SlowBurn(reads), false))
				.unwrap_err();
			assert!(matches!(err, SecretsError::PolicyViolation(_)));
		}
		assert!(policy
			.validate_submission(submission(
				1,
				"1h",
				BurnMode::SlowBurn(DEFAULT_MAX_SLOW_BURN_READS),
				false
			))
			.is_ok());
	}
}
