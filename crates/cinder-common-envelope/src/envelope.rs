// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The envelope wire format.
//!
//! ```text
//! cinder://?algorithm=<cipher>&key-algorithm=<kdf>&<param>=<value>...#<base64url ciphertext>
//! ```
//!
//! Parameters are percent-encoded form pairs emitted in sorted key order, so
//! encoding is deterministic. Binary parameters and the ciphertext use
//! unpadded base64url.

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::form_urlencoded;

use crate::algorithm::{CipherAlgorithm, KeyAlgorithm};
use crate::error::{EnvelopeError, Result};

pub const SCHEME: &str = "cinder";
pub const ALGORITHM_PARAM: &str = "algorithm";
pub const KEY_ALGORITHM_PARAM: &str = "key-algorithm";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
	cipher_algorithm: CipherAlgorithm,
	key_algorithm: KeyAlgorithm,
	parameters: BTreeMap<String, String>,
	ciphertext: Vec<u8>,
}

impl Envelope {
	/// Builds an envelope. `parameters` must not contain the algorithm keys,
	/// which are carried by the dedicated fields.
	pub fn new(
		cipher_algorithm: CipherAlgorithm,
		key_algorithm: KeyAlgorithm,
		parameters: BTreeMap<String, String>,
		ciphertext: Vec<u8>,
	) -> Result<Self> {
		for reserved in [ALGORITHM_PARAM, KEY_ALGORITHM_PARAM] {
			if parameters.contains_key(reserved) {
				return Err(EnvelopeError::invalid(reserved, "reserved parameter name"));
			}
		}
		if let Some(key) = parameters.keys().find(|k| k.is_empty()) {
			return Err(EnvelopeError::invalid(key.clone(), "empty parameter name"));
		}

		Ok(Self {
			cipher_algorithm,
			key_algorithm,
			parameters,
			ciphertext,
		})
	}

	pub fn cipher_algorithm(&self) -> CipherAlgorithm {
		self.cipher_algorithm
	}

	pub fn key_algorithm(&self) -> KeyAlgorithm {
		self.key_algorithm
	}

	pub fn parameters(&self) -> &BTreeMap<String, String> {
		&self.parameters
	}

	pub fn ciphertext(&self) -> &[u8] {
		&self.ciphertext
	}

	/// Starts a typed read over the parameters. Defaults handed out by the
	/// reader are recorded so a caller can choose to persist them with
	/// [`Envelope::with_defaults`].
	pub fn reader(&self) -> ParameterReader<'_> {
		ParameterReader {
			envelope: self,
			defaulted: BTreeMap::new(),
		}
	}

	/// Returns a copy with `defaults` filled in for every absent key. Keys the
	/// envelope already carries are never overwritten.
	pub fn with_defaults(&self, defaults: &BTreeMap<String, String>) -> Envelope {
		let mut merged = self.clone();
		for (key, value) in defaults {
			if key == ALGORITHM_PARAM || key == KEY_ALGORITHM_PARAM {
				continue;
			}
			merged
				.parameters
				.entry(key.clone())
				.or_insert_with(|| value.clone());
		}
		merged
	}

	pub fn encode(&self) -> String {
		let mut query = form_urlencoded::Serializer::new(String::new());
		let mut pairs: Vec<(&str, &str)> = self
			.parameters
			.iter()
			.map(|(k, v)| (k.as_str(), v.as_str()))
			.collect();
		pairs.push((ALGORITHM_PARAM, self.cipher_algorithm.as_str()));
		pairs.push((KEY_ALGORITHM_PARAM, self.key_algorithm.as_str()));
		pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));
		query.extend_pairs(pairs);

		format!(
			"{SCHEME}://?{}#{}",
			query.finish(),
			URL_SAFE_NO_PAD.encode(&self.ciphertext)
		)
	}

	pub fn decode(input: &str) -> Result<Self> {
		let (scheme, rest) = input
			.split_once("://")
			.ok_or_else(|| EnvelopeError::Malformed("missing scheme".to_string()))?;
		if scheme != SCHEME {
			return Err(EnvelopeError::Malformed(format!(
				"unrecognized scheme '{scheme}'"
			)));
		}

		let (head, fragment) = rest
			.split_once('#')
			.ok_or_else(|| EnvelopeError::Malformed("missing ciphertext".to_string()))?;
		let query = head
			.strip_prefix('?')
			.ok_or_else(|| EnvelopeError::Malformed("missing parameter section".to_string()))?;

		let mut parameters = BTreeMap::new();
		for segment in query.split('&').filter(|s| !s.is_empty()) {
			let (raw_key, _) = segment
				.split_once('=')
				.ok_or_else(|| EnvelopeError::Malformed(format!("parameter '{segment}' has no value")))?;
			if raw_key.is_empty() {
				return Err(EnvelopeError::Malformed("empty parameter name".to_string()));
			}
			for (key, value) in form_urlencoded::parse(segment.as_bytes()) {
				if parameters
					.insert(key.clone().into_owned(), value.into_owned())
					.is_some()
				{
					return Err(EnvelopeError::Malformed(format!(
						"duplicate parameter '{key}'"
					)));
				}
			}
		}

		let ciphertext = URL_SAFE_NO_PAD
			.decode(fragment)
			.map_err(|e| EnvelopeError::Malformed(format!("ciphertext is not base64url: {e}")))?;

		let cipher_algorithm = parameters
			.remove(ALGORITHM_PARAM)
			.ok_or_else(|| EnvelopeError::MissingParameter(ALGORITHM_PARAM.to_string()))?
			.parse::<CipherAlgorithm>()?;
		let key_algorithm = parameters
			.remove(KEY_ALGORITHM_PARAM)
			.ok_or_else(|| EnvelopeError::MissingParameter(KEY_ALGORITHM_PARAM.to_string()))?
			.parse::<KeyAlgorithm>()?;

		Ok(Self {
			cipher_algorithm,
			key_algorithm,
			parameters,
			ciphertext,
		})
	}
}

impl fmt::Display for Envelope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.encode())
	}
}

impl std::str::FromStr for Envelope {
	type Err = EnvelopeError;

	fn from_str(s: &str) -> Result<Self> {
		Envelope::decode(s)
	}
}

impl Serialize for Envelope {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.encode())
	}
}

impl<'de> Deserialize<'de> for Envelope {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		Envelope::decode(&s).map_err(serde::de::Error::custom)
	}
}

/// Typed, default-aware access to envelope parameters.
pub struct ParameterReader<'a> {
	envelope: &'a Envelope,
	defaulted: BTreeMap<String, String>,
}

impl<'a> ParameterReader<'a> {
	pub fn get(&self, key: &str) -> Result<&'a str> {
		self.envelope
			.parameters
			.get(key)
			.map(String::as_str)
			.ok_or_else(|| EnvelopeError::MissingParameter(key.to_string()))
	}

	pub fn get_or(&mut self, key: &str, default: &str) -> String {
		match self.envelope.parameters.get(key) {
			Some(value) => value.clone(),
			None => {
				self.defaulted.insert(key.to_string(), default.to_string());
				default.to_string()
			}
		}
	}

	/// Parses a parameter, falling back to `default` when absent. A present but
	/// unparseable value is an error, never silently defaulted.
	pub fn get_parsed_or<T>(&mut self, key: &str, default: T) -> Result<T>
	where
		T: std::str::FromStr + fmt::Display,
		T::Err: fmt::Display,
	{
		match self.envelope.parameters.get(key) {
			Some(value) => value
				.parse::<T>()
				.map_err(|e| EnvelopeError::invalid(key, e.to_string())),
			None => {
				self.defaulted.insert(key.to_string(), default.to_string());
				Ok(default)
			}
		}
	}

	pub fn get_binary(&self, key: &str) -> Result<Vec<u8>> {
		let value = self.get(key)?;
		decode_binary(key, value)
	}

	pub fn get_binary_or(&mut self, key: &str, default: &[u8]) -> Result<Vec<u8>> {
		match self.envelope.parameters.get(key) {
			Some(value) => decode_binary(key, value),
			None => {
				self.defaulted
					.insert(key.to_string(), encode_binary(default));
				Ok(default.to_vec())
			}
		}
	}

	/// Keys that were absent and answered with a default, with the default
	/// rendered in wire form.
	pub fn into_defaulted(self) -> BTreeMap<String, String> {
		self.defaulted
	}
}

pub(crate) fn encode_binary(bytes: &[u8]) -> String {
	URL_SAFE_NO_PAD.encode(bytes)
}

fn decode_binary(key: &str, value: &str) -> Result<Vec<u8>> {
	URL_SAFE_NO_PAD
		.decode(value)
		.map_err(|e| EnvelopeError::invalid(key, format!("not base64url: {e}")))
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn sample() -> Envelope {
		let mut parameters = BTreeMap::new();
		parameters.insert("salt".to_string(), encode_binary(b"0123456789abcdef"));
		parameters.insert("iterations".to_string(), "1000".to_string());
		parameters.insert("nonce".to_string(), encode_binary(&[7u8; 12]));
		Envelope::new(
			CipherAlgorithm::Aes256Gcm,
			KeyAlgorithm::Pbkdf2,
			parameters,
			b"not really ciphertext".to_vec(),
		)
		.unwrap()
	}

	#[test]
	fn encode_is_deterministic_and_sorted() {
		let encoded = sample().encode();
		assert!(encoded.starts_with("cinder://?algorithm=aes-256-gcm&iterations=1000&key-algorithm=pbkdf2&nonce="));
		assert_eq!(encoded, sample().encode());
	}

	#[test]
	fn decode_recovers_encoded_envelope() {
		let envelope = sample();
		assert_eq!(Envelope::decode(&envelope.encode()).unwrap(), envelope);
	}

	#[test]
	fn decode_rejects_wrong_scheme() {
		let err = Envelope::decode("https://?algorithm=aes-256-gcm#AAAA").unwrap_err();
		assert!(matches!(err, EnvelopeError::Malformed(_)));
	}

	#[test]
	fn decode_rejects_missing_fragment() {
		let err = Envelope::decode("cinder://?algorithm=aes-256-gcm&key-algorithm=pbkdf2").unwrap_err();
		assert!(matches!(err, EnvelopeError::Malformed(_)));
	}

	#[test]
	fn decode_rejects_bad_ciphertext_encoding() {
		let err = Envelope::decode("cinder://?algorithm=aes-256-gcm&key-algorithm=pbkdf2#***").unwrap_err();
		assert!(matches!(err, EnvelopeError::Malformed(_)));
	}

	#[test]
	fn decode_rejects_unparseable_parameters() {
		let err = Envelope::decode("cinder://?algorithm#AAAA").unwrap_err();
		assert!(matches!(err, EnvelopeError::Malformed(_)));

		let err = Envelope::decode("cinder://?salt=a&salt=b&algorithm=aes-256-gcm&key-algorithm=pbkdf2#AAAA")
			.unwrap_err();
		assert!(matches!(err, EnvelopeError::Malformed(_)));
	}

	#[test]
	fn decode_requires_algorithms() {
		let err = Envelope::decode("cinder://?key-algorithm=pbkdf2#AAAA").unwrap_err();
		assert_eq!(err, EnvelopeError::MissingParameter("algorithm".to_string()));

		let err = Envelope::decode("cinder://?algorithm=aes-256-gcm#AAAA").unwrap_err();
		assert_eq!(err, EnvelopeError::MissingParameter("key-algorithm".to_string()));
	}

	#[test]
	fn new_rejects_reserved_parameter_names() {
		let mut parameters = BTreeMap::new();
		parameters.insert("algorithm".to_string(), "x".to_string());
		let err = Envelope::new(CipherAlgorithm::Aes256Gcm, KeyAlgorithm::Pbkdf2, parameters, vec![])
			.unwrap_err();
		assert!(matches!(err, EnvelopeError::InvalidParameter { .. }));
	}

	#[test]
	fn reader_records_defaults_without_mutating() {
		let envelope = sample();
		let mut reader = envelope.reader();
		assert_eq!(reader.get_parsed_or("iterations", 5u32).unwrap(), 1000);
		assert_eq!(reader.get_or("hash", "SHA-256"), "SHA-256");
		assert!(matches!(
			reader.get("missing"),
			Err(EnvelopeError::MissingParameter(_))
		));
		let defaulted = reader.into_defaulted();

		assert_eq!(defaulted.len(), 1);
		assert!(!envelope.parameters().contains_key("hash"));

		let merged = envelope.with_defaults(&defaulted);
		assert_eq!(merged.parameters().get("hash").map(String::as_str), Some("SHA-256"));
		assert_eq!(merged.parameters().get("iterations").map(String::as_str), Some("1000"));
	}

	#[test]
	fn reader_rejects_unparseable_present_value() {
		let mut parameters = BTreeMap::new();
		parameters.insert("iterations".to_string(), "lots".to_string());
		let envelope =
			Envelope::new(CipherAlgorithm::Aes256Gcm, KeyAlgorithm::Pbkdf2, parameters, vec![]).unwrap();
		let err = envelope.reader().get_parsed_or("iterations", 10u32).unwrap_err();
		assert!(matches!(err, EnvelopeError::InvalidParameter { ref key, .. } if key == "iterations"));
	}

	#[test]
	fn serde_uses_wire_form() {
		let envelope = sample();
		let json = serde_json::to_string(&envelope).unwrap();
		assert_eq!(json, format!("\"{}\"", envelope.encode()));
		let back: Envelope = serde_json::from_str(&json).unwrap();
		assert_eq!(back, envelope);
	}

	proptest! {
		#[test]
		fn decode_inverts_encode(
			params in proptest::collection::btree_map("[a-z][a-z0-9-]{0,8}", ".{0,24}", 0..6),
			ciphertext in proptest::collection::vec(any::<u8>(), 0..256),
			xchacha in any::<bool>(),
		) {
			let params: BTreeMap<String, String> = params
				.into_iter()
				.filter(|(k, _)| k != ALGORITHM_PARAM && k != KEY_ALGORITHM_PARAM)
				.collect();
			let (cipher, kdf) = if xchacha {
				(CipherAlgorithm::XChaCha20Poly1305, KeyAlgorithm::Scrypt)
			} else {
				(CipherAlgorithm::Aes256Gcm, KeyAlgorithm::Pbkdf2)
			};
			let envelope = Envelope::new(cipher, kdf, params, ciphertext).unwrap();
			prop_assert_eq!(Envelope::decode(&envelope.encode()).unwrap(), envelope);
		}

		#[test]
		fn decode_never_panics(input in ".{0,128}") {
			let _ = Envelope::decode(&input);
		}
	}
}
