// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EnvelopeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
	/// The string could not be parsed as an envelope at all.
	#[error("malformed envelope: {0}")]
	Malformed(String),

	/// A parameter required by the selected algorithm was absent.
	#[error("missing parameter: {0}")]
	MissingParameter(String),

	#[error("invalid parameter {key}: {reason}")]
	InvalidParameter { key: String, reason: String },

	#[error("invalid key: {0}")]
	InvalidKey(String),

	#[error("encryption failed")]
	Encryption,

	/// Wrong key, wrong password or tampered ciphertext. Deliberately opaque.
	#[error("decryption failed")]
	Decryption,
}

impl EnvelopeError {
	pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
		EnvelopeError::InvalidParameter {
			key: key.into(),
			reason: reason.into(),
		}
	}
}
