// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Algorithm identifiers as they appear on the wire.

use std::fmt;
use std::str::FromStr;

use crate::error::EnvelopeError;

/// Authenticated cipher used to seal the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherAlgorithm {
	/// AES-256-GCM with a 96-bit nonce.
	Aes256Gcm,
	/// XChaCha20-Poly1305 with a 192-bit nonce.
	XChaCha20Poly1305,
}

impl CipherAlgorithm {
	pub const ALL: [CipherAlgorithm; 2] = [CipherAlgorithm::Aes256Gcm, CipherAlgorithm::XChaCha20Poly1305];

	pub fn as_str(&self) -> &'static str {
		match self {
			CipherAlgorithm::Aes256Gcm => "aes-256-gcm",
			CipherAlgorithm::XChaCha20Poly1305 => "xchacha20-poly1305",
		}
	}

	pub fn nonce_size(&self) -> usize {
		match self {
			CipherAlgorithm::Aes256Gcm => 12,
			CipherAlgorithm::XChaCha20Poly1305 => 24,
		}
	}
}

impl fmt::Display for CipherAlgorithm {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for CipherAlgorithm {
	type Err = EnvelopeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|a| a.as_str() == s)
			.ok_or_else(|| EnvelopeError::invalid("algorithm", format!("unknown cipher algorithm '{s}'")))
	}
}

/// Function used to derive the cipher key from base key and password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
	Pbkdf2,
	Scrypt,
}

impl KeyAlgorithm {
	pub const ALL: [KeyAlgorithm; 2] = [KeyAlgorithm::Pbkdf2, KeyAlgorithm::Scrypt];

	pub fn as_str(&self) -> &'static str {
		match self {
			KeyAlgorithm::Pbkdf2 => "pbkdf2",
			KeyAlgorithm::Scrypt => "scrypt",
		}
	}
}

impl fmt::Display for KeyAlgorithm {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for KeyAlgorithm {
	type Err = EnvelopeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|a| a.as_str() == s)
			.ok_or_else(|| EnvelopeError::invalid("key-algorithm", format!("unknown key algorithm '{s}'")))
	}
}

/// A supported pairing of key derivation and cipher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Suite {
	/// PBKDF2 feeding AES-256-GCM.
	#[default]
	Pbkdf2Aes256Gcm,
	/// scrypt feeding XChaCha20-Poly1305.
	ScryptXChaCha20Poly1305,
}

impl Suite {
	pub fn cipher_algorithm(&self) -> CipherAlgorithm {
		match self {
			Suite::Pbkdf2Aes256Gcm => CipherAlgorithm::Aes256Gcm,
			Suite::ScryptXChaCha20Poly1305 => CipherAlgorithm::XChaCha20Poly1305,
		}
	}

	pub fn key_algorithm(&self) -> KeyAlgorithm {
		match self {
			Suite::Pbkdf2Aes256Gcm => KeyAlgorithm::Pbkdf2,
			Suite::ScryptXChaCha20Poly1305 => KeyAlgorithm::Scrypt,
		}
	}
}
