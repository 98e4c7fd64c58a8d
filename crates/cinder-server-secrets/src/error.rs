// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the secret lifecycle.

use std::fmt;

use cinder_common_envelope::EnvelopeError;
use thiserror::Error;

/// Result type alias for secret operations.
pub type SecretsResult<T> = Result<T, SecretsError>;

/// Result type alias for storage backend operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures surfaced by a [`crate::SecretStore`].
///
/// Medium-specific errors (SQL, filesystem) are flattened into the message of
/// one of the medium variants and never cross the interface as their own type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
	#[error("secret not found: {0}")]
	NotFound(String),

	#[error("secret already exists: {0}")]
	AlreadyExists(String),

	/// A conditional update found the read counter changed underneath it.
	#[error("concurrent modification: {0}")]
	Conflict(String),

	#[error("read failed: {0}")]
	Read(String),

	#[error("write failed: {0}")]
	Write(String),

	#[error("delete failed: {0}")]
	Delete(String),

	#[error("list failed: {0}")]
	List(String),
}

/// Errors that can occur during secret operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretsError {
	// =========================================================================
	// Envelope Errors
	// =========================================================================
	#[error("malformed envelope: {0}")]
	MalformedEnvelope(String),

	#[error("missing envelope parameter: {0}")]
	MissingParameter(String),

	#[error("invalid envelope parameter: {0}")]
	InvalidParameter(String),

	#[error("decryption failed")]
	Decryption,

	#[error("encryption failed")]
	Encryption,

	// =========================================================================
	// Policy Errors
	// =========================================================================
	#[error("secret is {size} bytes, limit is {max}")]
	SizeLimit { size: u64, max: u64 },

	#[error("duration not allowed: {0}")]
	InvalidDuration(String),

	#[error("policy violation: {0}")]
	PolicyViolation(String),

	// =========================================================================
	// Lifecycle Errors
	// =========================================================================
	/// Never carries the id: expired, exhausted and unknown look the same.
	#[error("secret not found")]
	NotFound,

	#[error("secret already exists: {0}")]
	AlreadyExists(String),

	// =========================================================================
	// Storage Medium Errors
	// =========================================================================
	#[error("storage read failed: {0}")]
	Read(String),

	#[error("storage write failed: {0}")]
	Write(String),

	#[error("storage delete failed: {0}")]
	Delete(String),

	#[error("storage list failed: {0}")]
	List(String),
}

/// Stable identifier of each error variant, suitable for crossing a process
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	MalformedEnvelope,
	MissingParameter,
	InvalidParameter,
	DecryptionFailed,
	EncryptionFailed,
	SizeLimit,
	InvalidDuration,
	PolicyViolation,
	NotFound,
	AlreadyExists,
	ReadError,
	WriteError,
	DeleteError,
	ListError,
}

impl ErrorKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			ErrorKind::MalformedEnvelope => "malformed_envelope",
			ErrorKind::MissingParameter => "missing_parameter",
			ErrorKind::InvalidParameter => "invalid_parameter",
			ErrorKind::DecryptionFailed => "decryption_failed",
			ErrorKind::EncryptionFailed => "encryption_failed",
			ErrorKind::SizeLimit => "size_limit",
			ErrorKind::InvalidDuration => "invalid_duration",
			ErrorKind::PolicyViolation => "policy_violation",
			ErrorKind::NotFound => "not_found",
			ErrorKind::AlreadyExists => "already_exists",
			ErrorKind::ReadError => "read_error",
			ErrorKind::WriteError => "write_error",
			ErrorKind::DeleteError => "delete_error",
			ErrorKind::ListError => "list_error",
		}
	}

	pub fn parse(s: &str) -> Option<Self> {
		match s {
			"malformed_envelope" => Some(ErrorKind::MalformedEnvelope),
			"missing_parameter" => Some(ErrorKind::MissingParameter),
			"invalid_parameter" => Some(ErrorKind::InvalidParameter),
			"decryption_failed" => Some(ErrorKind::DecryptionFailed),
			"encryption_failed" => Some(ErrorKind::EncryptionFailed),
			"size_limit" => Some(ErrorKind::SizeLimit),
			"invalid_duration" => Some(ErrorKind::InvalidDuration),
			"policy_violation" => Some(ErrorKind::PolicyViolation),
			"not_found" => Some(ErrorKind::NotFound),
			"already_exists" => Some(ErrorKind::AlreadyExists),
			"read_error" => Some(ErrorKind::ReadError),
			"write_error" => Some(ErrorKind::WriteError),
			"delete_error" => Some(ErrorKind::DeleteError),
			"list_error" => Some(ErrorKind::ListError),
			_ => None,
		}
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl SecretsError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			SecretsError::MalformedEnvelope(_) => ErrorKind::MalformedEnvelope,
			SecretsError::MissingParameter(_) => ErrorKind::MissingParameter,
			SecretsError::InvalidParameter(_) => ErrorKind::InvalidParameter,
			SecretsError::Decryption => ErrorKind::DecryptionFailed,
			SecretsError::Encryption => ErrorKind::EncryptionFailed,
			SecretsError::SizeLimit { .. } => ErrorKind::SizeLimit,
			SecretsError::InvalidDuration(_) => ErrorKind::InvalidDuration,
			SecretsError::PolicyViolation(_) => ErrorKind::PolicyViolation,
			SecretsError::NotFound => ErrorKind::NotFound,
			SecretsError::AlreadyExists(_) => ErrorKind::AlreadyExists,
			SecretsError::Read(_) => ErrorKind::ReadError,
			SecretsError::Write(_) => ErrorKind::WriteError,
			SecretsError::Delete(_) => ErrorKind::DeleteError,
			SecretsError::List(_) => ErrorKind::ListError,
		}
	}

	/// Rebuild an error from its kind and message, as received from a remote
	/// peer. Structured fields that do not survive the trip are zeroed.
	pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
		let message = message.into();
		match kind {
			ErrorKind::MalformedEnvelope => SecretsError::MalformedEnvelope(message),
			ErrorKind::MissingParameter => SecretsError::MissingParameter(message),
			ErrorKind::InvalidParameter => SecretsError::InvalidParameter(message),
			ErrorKind::DecryptionFailed => SecretsError::Decryption,
			ErrorKind::EncryptionFailed => SecretsError::Encryption,
			ErrorKind::SizeLimit => SecretsError::SizeLimit { size: 0, max: 0 },
			ErrorKind::InvalidDuration => SecretsError::InvalidDuration(message),
			ErrorKind::PolicyViolation => SecretsError::PolicyViolation(message),
			ErrorKind::NotFound => SecretsError::NotFound,
			ErrorKind::AlreadyExists => SecretsError::AlreadyExists(message),
			ErrorKind::ReadError => SecretsError::Read(message),
			ErrorKind::WriteError => SecretsError::Write(message),
			ErrorKind::DeleteError => SecretsError::Delete(message),
			ErrorKind::ListError => SecretsError::List(message),
		}
	}

	/// Returns true if this error should be logged at error level and its
	/// detail withheld from clients.
	pub fn is_internal(&self) -> bool {
		matches!(
			self,
			SecretsError::Read(_)
				| SecretsError::Write(_)
				| SecretsError::Delete(_)
				| SecretsError::List(_)
				| SecretsError::Encryption
		)
	}

	/// Returns the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			// 400 Bad Request
			SecretsError::MalformedEnvelope(_)
			| SecretsError::MissingParameter(_)
			| SecretsError::InvalidParameter(_)
			| SecretsError::Decryption
			| SecretsError::InvalidDuration(_)
			| SecretsError::PolicyViolation(_) => 400,

			// 413 Payload Too Large
			SecretsError::SizeLimit { .. } => 413,

			// 404 Not Found
			SecretsError::NotFound => 404,

			// 409 Conflict
			SecretsError::AlreadyExists(_) => 409,

			// 500 Internal Server Error
			SecretsError::Encryption => 500,

			// 503 Service Unavailable - retryable medium failures
			SecretsError::Read(_)
			| SecretsError::Write(_)
			| SecretsError::Delete(_)
			| SecretsError::List(_) => 503,
		}
	}
}

impl From<StoreError> for SecretsError {
	fn from(err: StoreError) -> Self {
		match err {
			StoreError::NotFound(_) => SecretsError::NotFound,
			StoreError::AlreadyExists(id) => SecretsError::AlreadyExists(id),
			StoreError::Conflict(msg) => SecretsError::Write(format!("concurrent modification: {msg}")),
			StoreError::Read(msg) => SecretsError::Read(msg),
			StoreError::Write(msg) => SecretsError::Write(msg),
			StoreError::Delete(msg) => SecretsError::Delete(msg),
			StoreError::List(msg) => SecretsError::List(msg),
		}
	}
}

impl From<EnvelopeError> for SecretsError {
	fn from(err: EnvelopeError) -> Self {
		match err {
			EnvelopeError::Malformed(msg) => SecretsError::MalformedEnvelope(msg),
			EnvelopeError::MissingParameter(key) => SecretsError::MissingParameter(key),
			EnvelopeError::InvalidParameter { key, reason } => {
				SecretsError::InvalidParameter(format!("{key}: {reason}"))
			}
			EnvelopeError::InvalidKey(msg) => SecretsError::InvalidParameter(msg),
			EnvelopeError::Encryption => SecretsError::Encryption,
			EnvelopeError::Decryption => SecretsError::Decryption,
		}
	}
}
