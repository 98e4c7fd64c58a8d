// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key material. Every type here zeroizes on drop and redacts itself in
//! `Debug` so it cannot leak through logs.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{EnvelopeError, Result};

/// Size in bytes of generated base keys and of every derived cipher key.
pub const KEY_SIZE: usize = 32;

/// Random key generated by the client and shared only out of band, typically
/// in the fragment of the link handed to the recipient.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BaseKey {
	bytes: Vec<u8>,
}

impl BaseKey {
	pub fn generate() -> Self {
		let mut bytes = vec![0u8; KEY_SIZE];
		OsRng.fill_bytes(&mut bytes);
		Self { bytes }
	}

	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		if bytes.is_empty() {
			return Err(EnvelopeError::InvalidKey("base key is empty".to_string()));
		}
		Ok(Self {
			bytes: bytes.to_vec(),
		})
	}

	pub fn from_encoded(encoded: &str) -> Result<Self> {
		let bytes = Zeroizing::new(
			URL_SAFE_NO_PAD
				.decode(encoded.trim())
				.map_err(|e| EnvelopeError::InvalidKey(format!("not base64url: {e}")))?,
		);
		Self::from_bytes(&bytes)
	}

	/// Unpadded base64url form, suitable for a link fragment.
	pub fn encode(&self) -> String {
		URL_SAFE_NO_PAD.encode(&self.bytes)
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.bytes
	}
}

impl fmt::Debug for BaseKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BaseKey").field("bytes", &"[REDACTED]").finish()
	}
}

/// Optional password mixed into key derivation. An empty password means none.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct Password {
	value: String,
}

impl Password {
	pub fn new(value: impl Into<String>) -> Self {
		Self {
			value: value.into(),
		}
	}

	pub fn none() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.value.is_empty()
	}

	pub fn as_bytes(&self) -> &[u8] {
		self.value.as_bytes()
	}
}

impl fmt::Debug for Password {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.is_empty() {
			f.write_str("Password(none)")
		} else {
			f.write_str("Password([REDACTED])")
		}
	}
}

/// Output of a key derivation function, sized for the supported ciphers.
pub struct DerivedKey(Zeroizing<[u8; KEY_SIZE]>);

impl DerivedKey {
	pub(crate) fn new(bytes: Zeroizing<[u8; KEY_SIZE]>) -> Self {
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
		&self.0
	}
}

impl fmt::Debug for DerivedKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("DerivedKey([REDACTED])")
	}
}

/// Concatenation of base key and password bytes that feeds the KDF. With no
/// password the base key is used unchanged.
pub(crate) fn key_material(base_key: &BaseKey, password: &Password) -> Zeroizing<Vec<u8>> {
	let mut material = Zeroizing::new(Vec::with_capacity(base_key.bytes.len() + password.value.len()));
	material.extend_from_slice(base_key.as_bytes());
	if !password.is_empty() {
		material.extend_from_slice(password.as_bytes());
	}
	material
}
