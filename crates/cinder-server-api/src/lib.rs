// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire types for the cinder HTTP API.

pub mod health;
pub mod secrets;

pub use health::{aggregate_status, HealthResponse, HealthStatus, JobInfo, LastRunInfo, StorageHealth};
pub use secrets::{
	BurnModeApi, CreateSecretRequest, CreateSecretResponse, ErrorResponse, SecretMetadataResponse,
	SecretResponse,
};
