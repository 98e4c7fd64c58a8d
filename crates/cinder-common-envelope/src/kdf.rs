// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key derivation: base key + optional password -> 256-bit cipher key.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

use crate::algorithm::KeyAlgorithm;
use crate::envelope::{encode_binary, ParameterReader};
use crate::error::{EnvelopeError, Result};
use crate::keys::{key_material, BaseKey, DerivedKey, Password, KEY_SIZE};

pub const SALT_SIZE: usize = 16;

pub const PBKDF2_DEFAULT_ITERATIONS: u32 = 210_000;
pub const PBKDF2_MAX_ITERATIONS: u32 = 10_000_000;

pub const SCRYPT_DEFAULT_LOG_N: u8 = 15;
pub const SCRYPT_DEFAULT_R: u32 = 8;
pub const SCRYPT_DEFAULT_P: u32 = 1;
/// 2^20 * 128 * r bytes is already a gigabyte at r = 8.
pub const SCRYPT_MAX_LOG_N: u8 = 20;
pub const SCRYPT_MAX_R: u32 = 32;
pub const SCRYPT_MAX_P: u32 = 16;
/// Working memory of one lane, `128 * r * 2^log_n`.
pub const SCRYPT_MAX_MEMORY_BYTES: u64 = 1 << 30;

pub const SALT_PARAM: &str = "salt";
pub const ITERATIONS_PARAM: &str = "iterations";
pub const HASH_PARAM: &str = "hash";
pub const LOG_N_PARAM: &str = "log-n";
pub const R_PARAM: &str = "r";
pub const P_PARAM: &str = "p";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashFunction {
	#[default]
	Sha256,
	Sha512,
}

impl HashFunction {
	pub fn as_str(&self) -> &'static str {
		match self {
			HashFunction::Sha256 => "SHA-256",
			HashFunction::Sha512 => "SHA-512",
		}
	}
}

impl fmt::Display for HashFunction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for HashFunction {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"SHA-256" => Ok(HashFunction::Sha256),
			"SHA-512" => Ok(HashFunction::Sha512),
			other => Err(format!("unsupported hash '{other}'")),
		}
	}
}

/// A key derivation function together with every parameter it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KdfParams {
	Pbkdf2 {
		salt: Vec<u8>,
		iterations: u32,
		hash: HashFunction,
	},
	Scrypt {
		salt: Vec<u8>,
		log_n: u8,
		r: u32,
		p: u32,
	},
}

fn fresh_salt() -> Vec<u8> {
	let mut salt = vec![0u8; SALT_SIZE];
	OsRng.fill_bytes(&mut salt);
	salt
}

impl KdfParams {
	/// Default-cost parameters with a fresh random salt.
	pub fn generate(algorithm: KeyAlgorithm) -> Self {
		match algorithm {
			KeyAlgorithm::Pbkdf2 => Self::pbkdf2(PBKDF2_DEFAULT_ITERATIONS, HashFunction::default()),
			KeyAlgorithm::Scrypt => Self::scrypt(SCRYPT_DEFAULT_LOG_N, SCRYPT_DEFAULT_R, SCRYPT_DEFAULT_P),
		}
	}

	pub fn pbkdf2(iterations: u32, hash: HashFunction) -> Self {
		KdfParams::Pbkdf2 {
			salt: fresh_salt(),
			iterations,
			hash,
		}
	}

	pub fn scrypt(log_n: u8, r: u32, p: u32) -> Self {
		KdfParams::Scrypt {
			salt: fresh_salt(),
			log_n,
			r,
			p,
		}
	}

	pub fn algorithm(&self) -> KeyAlgorithm {
		match self {
			KdfParams::Pbkdf2 { .. } => KeyAlgorithm::Pbkdf2,
			KdfParams::Scrypt { .. } => KeyAlgorithm::Scrypt,
		}
	}

	/// Reads parameters for `algorithm`. The salt is mandatory; cost
	/// parameters fall back to their defaults.
	pub fn from_reader(algorithm: KeyAlgorithm, reader: &mut ParameterReader<'_>) -> Result<Self> {
		let salt = reader.get_binary(SALT_PARAM)?;
		if salt.is_empty() {
			return Err(EnvelopeError::invalid(SALT_PARAM, "salt is empty"));
		}

		let params = match algorithm {
			KeyAlgorithm::Pbkdf2 => KdfParams::Pbkdf2 {
				salt,
				iterations: reader.get_parsed_or(ITERATIONS_PARAM, PBKDF2_DEFAULT_ITERATIONS)?,
				hash: reader.get_parsed_or(HASH_PARAM, HashFunction::default())?,
			},
			KeyAlgorithm::Scrypt => KdfParams::Scrypt {
				salt,
				log_n: reader.get_parsed_or(LOG_N_PARAM, SCRYPT_DEFAULT_LOG_N)?,
				r: reader.get_parsed_or(R_PARAM, SCRYPT_DEFAULT_R)?,
				p: reader.get_parsed_or(P_PARAM, SCRYPT_DEFAULT_P)?,
			},
		};
		params.validate()?;
		Ok(params)
	}

	pub fn write_parameters(&self, parameters: &mut BTreeMap<String, String>) {
		match self {
			KdfParams::Pbkdf2 {
				salt,
				iterations,
				hash,
			} => {
				parameters.insert(SALT_PARAM.to_string(), encode_binary(salt));
				parameters.insert(ITERATIONS_PARAM.to_string(), iterations.to_string());
				parameters.insert(HASH_PARAM.to_string(), hash.to_string());
			}
			KdfParams::Scrypt { salt, log_n, r, p } => {
				parameters.insert(SALT_PARAM.to_string(), encode_binary(salt));
				parameters.insert(LOG_N_PARAM.to_string(), log_n.to_string());
				parameters.insert(R_PARAM.to_string(), r.to_string());
				parameters.insert(P_PARAM.to_string(), p.to_string());
			}
		}
	}

	fn validate(&self) -> Result<()> {
		match self {
			KdfParams::Pbkdf2 { iterations, .. } => {
				if *iterations == 0 || *iterations > PBKDF2_MAX_ITERATIONS {
					return Err(EnvelopeError::invalid(
						ITERATIONS_PARAM,
						format!("must be between 1 and {PBKDF2_MAX_ITERATIONS}"),
					));
				}
			}
			KdfParams::Scrypt { log_n, r, p, .. } => {
				if *log_n == 0 || *log_n > SCRYPT_MAX_LOG_N {
					return Err(EnvelopeError::invalid(
						LOG_N_PARAM,
						format!("must be between 1 and {SCRYPT_MAX_LOG_N}"),
					));
				}
				if *r == 0 || *r > SCRYPT_MAX_R {
					return Err(EnvelopeError::invalid(
						R_PARAM,
						format!("must be between 1 and {SCRYPT_MAX_R}"),
					));
				}
				if *p == 0 || *p > SCRYPT_MAX_P {
					return Err(EnvelopeError::invalid(
						P_PARAM,
						format!("must be between 1 and {SCRYPT_MAX_P}"),
					));
				}
				let memory = (128 * u64::from(*r)) << *log_n;
				if memory > SCRYPT_MAX_MEMORY_BYTES {
					return Err(EnvelopeError::invalid(
						R_PARAM,
						format!("log-n {log_n} with r {r} needs {memory} bytes, limit is {SCRYPT_MAX_MEMORY_BYTES}"),
					));
				}
				scrypt::Params::new(*log_n, *r, *p, KEY_SIZE)
					.map_err(|e| EnvelopeError::invalid(R_PARAM, e.to_string()))?;
			}
		}
		Ok(())
	}

	pub fn derive(&self, base_key: &BaseKey, password: &Password) -> Result<DerivedKey> {
		self.validate()?;
		let material = key_material(base_key, password);
		let mut output = Zeroizing::new([0u8; KEY_SIZE]);

		match self {
			KdfParams::Pbkdf2 {
				salt,
				iterations,
				hash,
			} => match hash {
				HashFunction::Sha256 => {
					pbkdf2::pbkdf2_hmac::<Sha256>(&material, salt, *iterations, output.as_mut())
				}
				HashFunction::Sha512 => {
					pbkdf2::pbkdf2_hmac::<Sha512>(&material, salt, *iterations, output.as_mut())
				}
			},
			KdfParams::Scrypt { salt, log_n, r, p } => {
				let params = scrypt::Params::new(*log_n, *r, *p, KEY_SIZE)
					.map_err(|e| EnvelopeError::invalid(LOG_N_PARAM, e.to_string()))?;
				scrypt::scrypt(&material, salt, &params, output.as_mut())
					.map_err(|e| EnvelopeError::invalid(LOG_N_PARAM, e.to_string()))?;
			}
		}

		Ok(DerivedKey::new(output))
	}
}
