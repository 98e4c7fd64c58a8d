// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Burn-after-read secret lifecycle for the cinder server.
//!
//! The server only ever holds envelopes: ciphertext plus the parameters the
//! client needs to decrypt it. This crate decides whether a submission is
//! acceptable, persists it through a [`SecretStore`], hands it out for a
//! bounded number of reads and makes sure it disappears afterwards.
//!
//! # Lifecycle
//!
//! ```text
//! create ──▶ Active(remaining, expires_at) ──read──▶ Active(remaining - 1, ..)
//!                 │                              │
//!                 │ now >= expires_at             │ remaining reaches 0
//!                 ▼                              ▼
//!              Expired ──────────────▶ Deleted ◀── Exhausted
//! ```
//!
//! Expired and exhausted secrets are indistinguishable from ids that never
//! existed: every path reports [`SecretsError::NotFound`].
//!
//! # Modules
//!
//! - [`policy`]: submission validation against server policy
//! - [`store`]: storage contract and its SQLite, memory and file backends
//! - [`manager`]: create/read/delete with atomic read accounting
//! - [`gc`]: sweep that removes expired and exhausted secrets

pub mod clock;
pub mod error;
pub mod gc;
pub mod manager;
pub mod policy;
pub mod store;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorKind, SecretsError, SecretsResult, StoreError, StoreResult};
pub use gc::{GarbageCollector, SweepReport};
pub use manager::SecretManager;
pub use policy::{DurationTable, PolicyConfig};
pub use store::{
	FileSecretStore, MemorySecretStore, MetadataUpdate, SecretStore, SqliteSecretStore,
};
pub use types::{BurnMode, Secret, SecretId, SecretMetadata, Submission, ValidatedSubmission};
