// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Self-describing encrypted envelopes for cinder.
//!
//! An envelope is the only representation of a secret that ever leaves the
//! client. It carries the ciphertext together with every parameter needed to
//! decrypt it, encoded as a URI:
//!
//! ```text
//! cinder://?algorithm=aes-256-gcm&iterations=210000&key-algorithm=pbkdf2&nonce=..&salt=..#<ciphertext>
//! ```
//!
//! The server stores envelopes opaquely. Only [`seal`] and [`open`], run on the
//! client, ever see a [`BaseKey`] or a [`Password`].
//!
//! # Example
//!
//! ```
//! use cinder_common_envelope::{open, seal, BaseKey, Password, Suite};
//!
//! let base_key = BaseKey::generate();
//! let password = Password::new("hunter2");
//! let envelope = seal(b"launch codes", &base_key, &password, Suite::default()).unwrap();
//!
//! let wire = envelope.encode();
//! let decoded = cinder_common_envelope::Envelope::decode(&wire).unwrap();
//! let opened = open(&decoded, &base_key, &password).unwrap();
//! assert_eq!(opened.plaintext.as_slice(), b"launch codes");
//! ```

pub mod algorithm;
pub mod cipher;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod seal;

pub use algorithm::{CipherAlgorithm, KeyAlgorithm, Suite};
pub use cipher::CipherParams;
pub use envelope::{Envelope, ParameterReader, SCHEME};
pub use error::{EnvelopeError, Result};
pub use kdf::{HashFunction, KdfParams};
pub use keys::{BaseKey, DerivedKey, Password, KEY_SIZE};
pub use seal::{open, seal, seal_with, Opened};
