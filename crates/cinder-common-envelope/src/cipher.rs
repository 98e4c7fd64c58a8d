// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authenticated encryption of envelope payloads.

use std::collections::BTreeMap;

use aes_gcm::{
	aead::{Aead, KeyInit},
	Aes256Gcm,
};
use chacha20poly1305::XChaCha20Poly1305;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::algorithm::CipherAlgorithm;
use crate::envelope::{encode_binary, ParameterReader};
use crate::error::{EnvelopeError, Result};
use crate::keys::DerivedKey;

pub const NONCE_PARAM: &str = "nonce";

/// Authentication tag appended to every ciphertext by both ciphers.
pub const TAG_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherParams {
	algorithm: CipherAlgorithm,
	nonce: Vec<u8>,
}

impl CipherParams {
	pub fn new(algorithm: CipherAlgorithm, nonce: Vec<u8>) -> Result<Self> {
		if nonce.len() != algorithm.nonce_size() {
			return Err(EnvelopeError::invalid(
				NONCE_PARAM,
				format!(
					"{} requires a {}-byte nonce, got {}",
					algorithm,
					algorithm.nonce_size(),
					nonce.len()
				),
			));
		}
		Ok(Self { algorithm, nonce })
	}

	/// Fresh random nonce. A nonce must never be reused under one key.
	pub fn generate(algorithm: CipherAlgorithm) -> Self {
		let mut nonce = vec![0u8; algorithm.nonce_size()];
		OsRng.fill_bytes(&mut nonce);
		Self { algorithm, nonce }
	}

	pub fn from_reader(algorithm: CipherAlgorithm, reader: &mut ParameterReader<'_>) -> Result<Self> {
		Self::new(algorithm, reader.get_binary(NONCE_PARAM)?)
	}

	pub fn algorithm(&self) -> CipherAlgorithm {
		self.algorithm
	}

	pub fn nonce(&self) -> &[u8] {
		&self.nonce
	}

	pub fn write_parameters(&self, parameters: &mut BTreeMap<String, String>) {
		parameters.insert(NONCE_PARAM.to_string(), encode_binary(&self.nonce));
	}

	pub fn encrypt(&self, key: &DerivedKey, plaintext: &[u8]) -> Result<Vec<u8>> {
		match self.algorithm {
			CipherAlgorithm::Aes256Gcm => {
				let cipher = Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(key.as_bytes()));
				cipher
					.encrypt(aes_gcm::Nonce::from_slice(&self.nonce), plaintext)
					.map_err(|_| EnvelopeError::Encryption)
			}
			CipherAlgorithm::XChaCha20Poly1305 => {
				let cipher = XChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key.as_bytes()));
				cipher
					.encrypt(chacha20poly1305::XNonce::from_slice(&self.nonce), plaintext)
					.map_err(|_| EnvelopeError::Encryption)
			}
		}
	}

	pub fn decrypt(&self, key: &DerivedKey, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
		if ciphertext.len() < TAG_SIZE {
			return Err(EnvelopeError::Decryption);
		}
		let plaintext = match self.algorithm {
			CipherAlgorithm::Aes256Gcm => {
				let cipher = Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(key.as_bytes()));
				cipher.decrypt(aes_gcm::Nonce::from_slice(&self.nonce), ciphertext)
			}
			CipherAlgorithm::XChaCha20Poly1305 => {
				let cipher = XChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key.as_bytes()));
				cipher.decrypt(chacha20poly1305::XNonce::from_slice(&self.nonce), ciphertext)
			}
		}
		.map_err(|_| EnvelopeError::Decryption)?;
		Ok(Zeroizing::new(plaintext))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::kdf::{HashFunction, KdfParams};
	use crate::keys::{BaseKey, Password};
	use proptest::prelude::*;

	fn derived(seed: u8) -> DerivedKey {
		let base = BaseKey::from_bytes(&[seed; 32]).unwrap();
		KdfParams::Pbkdf2 {
			salt: vec![0; 16],
			iterations: 1,
			hash: HashFunction::Sha256,
		}
		.derive(&base, &Password::none())
		.unwrap()
	}

	#[test]
	fn nonce_length_enforced() {
		assert!(CipherParams::new(CipherAlgorithm::Aes256Gcm, vec![0; 24]).is_err());
		assert!(CipherParams::new(CipherAlgorithm::XChaCha20Poly1305, vec![0; 12]).is_err());
		assert!(CipherParams::new(CipherAlgorithm::XChaCha20Poly1305, vec![0; 24]).is_ok());
	}

	#[test]
	fn generated_nonces_are_unique() {
		let a = CipherParams::generate(CipherAlgorithm::Aes256Gcm);
		let b = CipherParams::generate(CipherAlgorithm::Aes256Gcm);
		assert_ne!(a.nonce(), b.nonce());
		assert_eq!(a.nonce().len(), 12);
	}

	#[test]
	fn ciphertext_carries_tag() {
		for alg in CipherAlgorithm::ALL {
			let params = CipherParams::generate(alg);
			let ct = params.encrypt(&derived(1), b"hello").unwrap();
			assert_eq!(ct.len(), 5 + TAG_SIZE);
		}
	}

	#[test]
	fn wrong_key_fails() {
		for alg in CipherAlgorithm::ALL {
			let params = CipherParams::generate(alg);
			let ct = params.encrypt(&derived(1), b"hello").unwrap();
			assert_eq!(params.decrypt(&derived(2), &ct).unwrap_err(), EnvelopeError::Decryption);
		}
	}

	#[test]
	fn tampering_detected() {
		for alg in CipherAlgorithm::ALL {
			let params = CipherParams::generate(alg);
			let mut ct = params.encrypt(&derived(1), b"hello").unwrap();
			ct[0] ^= 0x01;
			assert_eq!(params.decrypt(&derived(1), &ct).unwrap_err(), EnvelopeError::Decryption);
		}
	}

	#[test]
	fn truncated_ciphertext_fails() {
		let params = CipherParams::generate(CipherAlgorithm::Aes256Gcm);
		assert_eq!(
			params.decrypt(&derived(1), &[0u8; 4]).unwrap_err(),
			EnvelopeError::Decryption
		);
	}

	proptest! {
		#[test]
		fn decrypt_inverts_encrypt(plaintext in proptest::collection::vec(any::<u8>(), 0..1024), xchacha in any::<bool>()) {
			let alg = if xchacha { CipherAlgorithm::XChaCha20Poly1305 } else { CipherAlgorithm::Aes256Gcm };
			let params = CipherParams::generate(alg);
			let key = derived(7);
			let ct = params.encrypt(&key, &plaintext).unwrap();
			let pt = params.decrypt(&key, &ct).unwrap();
			prop_assert_eq!(pt.as_slice(), plaintext.as_slice());
		}
	}
}
