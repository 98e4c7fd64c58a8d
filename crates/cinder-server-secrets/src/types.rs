// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for the secret lifecycle.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cinder_common_envelope::Envelope;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SecretsError;

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Uuid::parse_str(s).map(Self)
			}
		}
	};
}

define_id_type!(SecretId, "Unique identifier for a stored secret.");

/// Sentinel stored in `remaining_reads` for secrets that only expire.
pub const UNLIMITED_READS: i64 = -1;

/// How many times a secret may be read before it is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurnMode {
	/// Readable until expiry.
	Unlimited,
	/// Destroyed by the first successful read.
	Burn,
	/// Destroyed by the `n`th read, all within a short window.
	SlowBurn(u32),
}

impl BurnMode {
	/// Initial value of the stored read counter.
	pub fn initial_reads(&self) -> i64 {
		match self {
			BurnMode::Unlimited => UNLIMITED_READS,
			BurnMode::Burn => 1,
			BurnMode::SlowBurn(n) => i64::from(*n),
		}
	}
}

/// A secret as held by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
	pub id: SecretId,
	pub envelope: Envelope,
	#[serde(default)]
	pub attachments: Vec<Envelope>,
	pub password_protected: bool,
	/// `-1` unlimited, otherwise reads left before deletion.
	pub remaining_reads: i64,
	pub created_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
}

impl Secret {
	pub fn metadata(&self) -> SecretMetadata {
		SecretMetadata {
			id: self.id,
			attachment_count: self.attachments.len(),
			password_protected: self.password_protected,
			remaining_reads: self.remaining_reads,
			created_at: self.created_at,
			expires_at: self.expires_at,
		}
	}

	pub fn is_readable(&self, now: DateTime<Utc>) -> bool {
		!is_collectable(self.expires_at, self.remaining_reads, now)
	}
}

/// Everything about a secret except its envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretMetadata {
	pub id: SecretId,
	pub attachment_count: usize,
	pub password_protected: bool,
	pub remaining_reads: i64,
	pub created_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
}

impl SecretMetadata {
	/// Expired or exhausted, and so due for deletion.
	pub fn is_collectable(&self, now: DateTime<Utc>) -> bool {
		is_collectable(self.expires_at, self.remaining_reads, now)
	}
}

fn is_collectable(expires_at: DateTime<Utc>, remaining_reads: i64, now: DateTime<Utc>) -> bool {
	now >= expires_at || remaining_reads == 0
}

/// A client submission whose envelopes have been structurally decoded but
/// not yet checked against policy.
#[derive(Debug, Clone)]
pub struct Submission {
	pub envelope: Envelope,
	pub attachments: Vec<Envelope>,
	pub duration: String,
	pub burn_mode: BurnMode,
	pub password_protected: bool,
}

impl Submission {
	/// Decode wire-form envelopes. Keys are never involved; only structure is
	/// checked.
	pub fn parse(
		envelope: &str,
		attachments: &[String],
		duration: impl Into<String>,
		burn_mode: BurnMode,
		password_protected: bool,
	) -> Result<Self, SecretsError> {
		let envelope = Envelope::decode(envelope)?;
		let attachments = attachments
			.iter()
			.map(|a| Envelope::decode(a))
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self {
			envelope,
			attachments,
			duration: duration.into(),
			burn_mode,
			password_protected,
		})
	}

	/// Ciphertext bytes across the message and every attachment.
	pub fn total_bytes(&self) -> u64 {
		std::iter::once(&self.envelope)
			.chain(self.attachments.iter())
			.map(|e| e.ciphertext().len() as u64)
			.sum()
	}
}

/// A submission that passed policy, ready to be stored.
#[derive(Debug, Clone)]
pub struct ValidatedSubmission {
	pub envelope: Envelope,
	pub attachments: Vec<Envelope>,
	pub lifetime: Duration,
	pub remaining_reads: i64,
	pub password_protected: bool,
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration as ChronoDuration;

	const ENVELOPE: &str = "cinder://?algorithm=aes-256-gcm&key-algorithm=pbkdf2&nonce=AAAAAAAAAAAAAAAA&salt=AAAAAAAAAAAAAAAAAAAAAA#AAAAAAAA";

	fn metadata(remaining_reads: i64, expires_in: ChronoDuration) -> SecretMetadata {
		let now = Utc::now();
		SecretMetadata {
			id: SecretId::generate(),
			attachment_count: 0,
			password_protected: false,
			remaining_reads,
			created_at: now,
			expires_at: now + expires_in,
		}
	}

	#[test]
	fn burn_modes_map_to_counters() {
		assert_eq!(BurnMode::Unlimited.initial_reads(), -1);
		assert_eq!(BurnMode::Burn.initial_reads(), 1);
		assert_eq!(BurnMode::SlowBurn(4).initial_reads(), 4);
	}

	#[test]
	fn collectable_when_expired_or_exhausted() {
		let now = Utc::now();
		assert!(!metadata(1, ChronoDuration::hours(1)).is_collectable(now));
		assert!(!metadata(-1, ChronoDuration::hours(1)).is_collectable(now));
		assert!(metadata(0, ChronoDuration::hours(1)).is_collectable(now));
		assert!(metadata(3, ChronoDuration::hours(-1)).is_collectable(now));
	}

	#[test]
	fn submission_counts_all_ciphertext() {
		let submission = Submission::parse(
			ENVELOPE,
			&[ENVELOPE.to_string(), ENVELOPE.to_string()],
			"1d",
			BurnMode::Burn,
			false,
		)
		.unwrap();
		assert_eq!(submission.total_bytes(), 18);
	}

	#[test]
	fn malformed_attachment_rejected() {
		let err = Submission::parse(ENVELOPE, &["garbage".to_string()], "1d", BurnMode::Burn, false)
			.unwrap_err();
		assert!(matches!(err, SecretsError::MalformedEnvelope(_)));
	}

	#[test]
	fn ids_parse_back() {
		let id = SecretId::generate();
		assert_eq!(id.to_string().parse::<SecretId>().unwrap(), id);
		assert!("not-a-uuid".parse::<SecretId>().is_err());
	}
}
