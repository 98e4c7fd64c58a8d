// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client-side sealing and opening of envelopes.

use std::collections::BTreeMap;
use std::fmt;

use zeroize::Zeroizing;

use crate::algorithm::Suite;
use crate::cipher::CipherParams;
use crate::envelope::Envelope;
use crate::error::Result;
use crate::kdf::KdfParams;
use crate::keys::{BaseKey, Password};

/// Encrypts `plaintext` with default-cost parameters for `suite`.
pub fn seal(plaintext: &[u8], base_key: &BaseKey, password: &Password, suite: Suite) -> Result<Envelope> {
	seal_with(
		plaintext,
		base_key,
		password,
		KdfParams::generate(suite.key_algorithm()),
		CipherParams::generate(suite.cipher_algorithm()),
	)
}

/// Encrypts with explicit parameters. Every parameter is written to the
/// envelope, so nothing is left to defaults when it is opened.
pub fn seal_with(
	plaintext: &[u8],
	base_key: &BaseKey,
	password: &Password,
	kdf: KdfParams,
	cipher: CipherParams,
) -> Result<Envelope> {
	let key = kdf.derive(base_key, password)?;
	let ciphertext = cipher.encrypt(&key, plaintext)?;

	let mut parameters = BTreeMap::new();
	kdf.write_parameters(&mut parameters);
	cipher.write_parameters(&mut parameters);

	Envelope::new(cipher.algorithm(), kdf.algorithm(), parameters, ciphertext)
}

pub struct Opened {
	pub plaintext: Zeroizing<Vec<u8>>,
	/// Parameters that were absent and resolved to defaults while opening.
	pub defaulted: BTreeMap<String, String>,
}

impl fmt::Debug for Opened {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Opened")
			.field("plaintext", &format_args!("[{} bytes]", self.plaintext.len()))
			.field("defaulted", &self.defaulted)
			.finish()
	}
}

pub fn open(envelope: &Envelope, base_key: &BaseKey, password: &Password) -> Result<Opened> {
	let mut reader = envelope.reader();
	let kdf = KdfParams::from_reader(envelope.key_algorithm(), &mut reader)?;
	let cipher = CipherParams::from_reader(envelope.cipher_algorithm(), &mut reader)?;

	let key = kdf.derive(base_key, password)?;
	let plaintext = cipher.decrypt(&key, envelope.ciphertext())?;

	Ok(Opened {
		plaintext,
		defaulted: reader.into_defaulted(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::algorithm::{CipherAlgorithm, KeyAlgorithm};
	use crate::error::EnvelopeError;
	use crate::kdf::{HashFunction, ITERATIONS_PARAM};
	use proptest::prelude::*;

	fn cheap(suite: Suite) -> (KdfParams, CipherParams) {
		let kdf = match suite.key_algorithm() {
			KeyAlgorithm::Pbkdf2 => KdfParams::pbkdf2(1_000, HashFunction::Sha256),
			KeyAlgorithm::Scrypt => KdfParams::scrypt(8, 8, 1),
		};
		(kdf, CipherParams::generate(suite.cipher_algorithm()))
	}

	fn seal_cheap(plaintext: &[u8], key: &BaseKey, password: &Password, suite: Suite) -> Envelope {
		let (kdf, cipher) = cheap(suite);
		seal_with(plaintext, key, password, kdf, cipher).unwrap()
	}

	const SUITES: [Suite; 2] = [Suite::Pbkdf2Aes256Gcm, Suite::ScryptXChaCha20Poly1305];

	#[test]
	fn default_suite_opens_through_wire_form() {
		let key = BaseKey::generate();
		let envelope = seal(b"secret", &key, &Password::none(), Suite::default()).unwrap();
		let decoded = Envelope::decode(&envelope.encode()).unwrap();
		let opened = open(&decoded, &key, &Password::none()).unwrap();
		assert_eq!(opened.plaintext.as_slice(), b"secret");
		assert!(opened.defaulted.is_empty());
	}

	#[test]
	fn every_suite_opens_with_and_without_password() {
		for suite in SUITES {
			for password in [Password::none(), Password::new("p4ss")] {
				let key = BaseKey::generate();
				let envelope = seal_cheap(b"payload", &key, &password, suite);
				assert_eq!(envelope.cipher_algorithm(), suite.cipher_algorithm());
				let opened = open(&envelope, &key, &password).unwrap();
				assert_eq!(opened.plaintext.as_slice(), b"payload");
			}
		}
	}

	#[test]
	fn wrong_base_key_fails() {
		for suite in SUITES {
			let envelope = seal_cheap(b"payload", &BaseKey::generate(), &Password::none(), suite);
			let err = open(&envelope, &BaseKey::generate(), &Password::none()).unwrap_err();
			assert_eq!(err, EnvelopeError::Decryption);
		}
	}

	#[test]
	fn wrong_or_missing_password_fails() {
		for suite in SUITES {
			let key = BaseKey::generate();
			let envelope = seal_cheap(b"payload", &key, &Password::new("right"), suite);
			assert_eq!(
				open(&envelope, &key, &Password::new("wrong")).unwrap_err(),
				EnvelopeError::Decryption
			);
			assert_eq!(
				open(&envelope, &key, &Password::none()).unwrap_err(),
				EnvelopeError::Decryption
			);
		}
	}

	#[test]
	fn missing_nonce_reported_before_decrypting() {
		let key = BaseKey::generate();
		let envelope = seal_cheap(b"payload", &key, &Password::none(), Suite::default());
		let mut parameters = envelope.parameters().clone();
		parameters.remove("nonce");
		let stripped = Envelope::new(
			CipherAlgorithm::Aes256Gcm,
			KeyAlgorithm::Pbkdf2,
			parameters,
			envelope.ciphertext().to_vec(),
		)
		.unwrap();
		assert_eq!(
			open(&stripped, &key, &Password::none()).unwrap_err(),
			EnvelopeError::MissingParameter("nonce".to_string())
		);
	}

	#[test]
	fn defaulted_parameters_can_be_merged_back() {
		let key = BaseKey::generate();
		let kdf = KdfParams::pbkdf2(crate::kdf::PBKDF2_DEFAULT_ITERATIONS, HashFunction::Sha256);
		let envelope = seal_with(
			b"payload",
			&key,
			&Password::none(),
			kdf,
			CipherParams::generate(CipherAlgorithm::Aes256Gcm),
		)
		.unwrap();

		let mut parameters = envelope.parameters().clone();
		parameters.remove(ITERATIONS_PARAM);
		let sparse = Envelope::new(
			envelope.cipher_algorithm(),
			envelope.key_algorithm(),
			parameters,
			envelope.ciphertext().to_vec(),
		)
		.unwrap();

		let opened = open(&sparse, &key, &Password::none()).unwrap();
		assert_eq!(opened.plaintext.as_slice(), b"payload");
		assert!(opened.defaulted.contains_key(ITERATIONS_PARAM));
		assert_eq!(sparse.with_defaults(&opened.defaulted), envelope);
	}

	proptest! {
		#![proptest_config(ProptestConfig::with_cases(16))]

		#[test]
		fn open_inverts_seal(
			plaintext in proptest::collection::vec(any::<u8>(), 0..512),
			password in "[ -~]{0,16}",
			scrypt in any::<bool>(),
		) {
			let suite = if scrypt { Suite::ScryptXChaCha20Poly1305 } else { Suite::Pbkdf2Aes256Gcm };
			let key = BaseKey::generate();
			let password = Password::new(password);
			let envelope = seal_cheap(&plaintext, &key, &password, suite);
			let decoded = Envelope::decode(&envelope.encode()).unwrap();
			let opened = open(&decoded, &key, &password).unwrap();
			prop_assert_eq!(opened.plaintext.as_slice(), plaintext.as_slice());
		}
	}
}
