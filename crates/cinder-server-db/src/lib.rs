// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database layer for the cinder server.
//!
//! Owns the SQLite pool, the embedded schema and the raw-SQL
//! [`SecretsRepository`]. Domain types live in `cinder-server-secrets`; rows
//! here are deliberately plain.

pub mod error;
pub mod pool;
pub mod secrets;
pub mod testing;

pub use error::{DbError, Result};
pub use pool::{create_pool, run_migrations};
pub use secrets::{MetadataPatch, SecretMetadataRow, SecretRow, SecretsRepository};
